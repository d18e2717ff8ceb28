//! Package index assembly
//!
//! Renders a set of cells as a `Packages` stream. Cells that fail to load
//! are left out, and only the first cell for a given package identity is
//! written.

use crate::error::{DebhubError, DebhubResult};
use crate::package::{ArtifactRef, PackageCell, PackageIdentity};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::io::Write;
use tracing::{debug, warn};

/// Counts from one index run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Entries written
    pub written: usize,
    /// Cells left out because loading failed
    pub failed: usize,
    /// Cells left out because their identity was already written
    pub duplicates: usize,
}

/// Load every cell and write the loaded ones as index entries
///
/// Loads run concurrently; entries are written in input order.
pub async fn write_index<W: Write + ?Sized>(
    entries: &[(PackageCell, ArtifactRef)],
    w: &mut W,
    organization_wide: bool,
) -> DebhubResult<IndexSummary> {
    let results = join_all(entries.iter().map(|(cell, artifact)| cell.ensure(artifact))).await;

    let mut summary = IndexSummary::default();
    let mut seen: HashMap<PackageIdentity, String> = HashMap::new();

    for ((cell, artifact), result) in entries.iter().zip(results) {
        if let Err(e) = result {
            warn!("Omitting {}: {} ({})", artifact.download_url, e, e.kind());
            summary.failed += 1;
            continue;
        }

        let Some(package) = cell.package() else {
            // Reset between ensure and now; leave it for the next run
            summary.failed += 1;
            continue;
        };

        let identity = package.identity();
        if let Some(md5sum) = seen.get(&identity) {
            if *md5sum == package.md5sum {
                debug!("Skipping duplicate {} from {}", identity, artifact.download_url);
            } else {
                warn!(
                    "Conflicting metadata for {}: {} differs from first entry, omitting",
                    identity, artifact.download_url
                );
            }
            summary.duplicates += 1;
            continue;
        }

        package
            .write(w, organization_wide)
            .map_err(|e| DebhubError::io("writing index entry", e))?;
        seen.insert(identity, package.md5sum.clone());
        summary.written += 1;
    }

    debug!(
        "Index written: {} entries, {} failed, {} duplicates",
        summary.written, summary.failed, summary.duplicates
    );
    Ok(summary)
}
