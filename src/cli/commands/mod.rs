//! CLI command implementations

pub mod index;
pub mod inspect;

pub use index::execute as index;
pub use inspect::execute as inspect;
