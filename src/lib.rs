//! debhub - APT repository for GitHub release assets
//!
//! Downloads `.deb` files attached to releases, reads their control data
//! once per asset and renders them as entries of a package index.

pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod package;

pub use error::{DebhubError, DebhubResult, LoadError, LoadErrorKind};
