//! Debian packages published as release assets
//!
//! Each asset gets a [`PackageCell`] that downloads it once, reads the
//! control block out of the `.deb` and renders it as an index entry.
//!
//! # Load Failures
//!
//! | Kind | Example | Retried |
//! |------|---------|---------|
//! | Transport | connection reset, HTTP 502 | after the retry delay |
//! | Parse | not an ar archive, two paragraphs | no |
//! | Validation | missing Architecture | no |

pub mod archive;
pub mod artifact;
pub mod cell;
pub mod control;
pub mod source;

pub use artifact::ArtifactRef;
pub use cell::{Package, PackageCell, RETRY_DELAY};
pub use control::{Descriptor, PackageIdentity};
pub use source::{ArchiveSource, FetchedArchive, FileSource, HttpSource};
