//! Index command - render release assets as a Packages index

use crate::cli::args::IndexArgs;
use crate::config::Config;
use crate::error::{DebhubError, DebhubResult};
use crate::index::write_index;
use crate::package::{ArchiveSource, ArtifactRef, HttpSource, PackageCell};
use chrono::Utc;
use console::style;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;

/// Execute the index command
pub async fn execute(args: IndexArgs, config: &Config) -> DebhubResult<()> {
    let source: Arc<dyn ArchiveSource> = Arc::new(HttpSource::new(&config.fetch));
    let retry_delay = config.cache.retry_delay();

    let entries = args
        .urls
        .iter()
        .map(|url| {
            let artifact = ArtifactRef::from_download_url(url, 0, Utc::now())?;
            let cell = PackageCell::with_retry_delay(Arc::clone(&source), retry_delay);
            Ok((cell, artifact))
        })
        .collect::<DebhubResult<Vec<_>>>()?;

    let organization_wide = args.organization_wide || config.index.organization_wide;
    info!(
        "Indexing {} assets (organization-wide: {})",
        entries.len(),
        organization_wide
    );

    let mut buffer = Vec::new();
    let summary = write_index(&entries, &mut buffer, organization_wide).await?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&buffer)
        .and_then(|_| stdout.flush())
        .map_err(|e| DebhubError::io("writing index", e))?;

    if summary.failed > 0 || summary.duplicates > 0 {
        eprintln!(
            "{} {} written, {} failed, {} duplicate",
            style("Index:").yellow(),
            summary.written,
            summary.failed,
            summary.duplicates
        );
    }

    Ok(())
}
