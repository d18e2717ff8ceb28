//! Inspect command - parse one package and show its index entry

use crate::cli::args::{InspectArgs, OutputFormat};
use crate::config::Config;
use crate::error::{DebhubError, DebhubResult};
use crate::package::{ArchiveSource, ArtifactRef, FileSource, HttpSource, Package, PackageCell};
use chrono::{DateTime, Utc};
use console::style;
use std::io::{self, Write};
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::warn;

/// Execute the inspect command
pub async fn execute(args: InspectArgs, config: &Config) -> DebhubResult<()> {
    let (source, artifact): (Arc<dyn ArchiveSource>, ArtifactRef) = if is_url(&args.source) {
        (
            Arc::new(HttpSource::new(&config.fetch)),
            ArtifactRef::from_download_url(&args.source, 0, Utc::now())?,
        )
    } else {
        (Arc::new(FileSource::new()), local_artifact(Path::new(&args.source)).await?)
    };

    let cell = PackageCell::with_retry_delay(source, config.cache.retry_delay());
    if let Err(e) = cell.ensure(&artifact).await {
        if let Some(descriptor) = cell.descriptor() {
            warn!("Control fields found before the {} error:", e.kind());
            for (key, value) in descriptor.fields() {
                warn!("  {}: {}", key, value);
            }
        }
        return Err(e.into());
    }

    let package = cell
        .package()
        .ok_or_else(|| DebhubError::Internal("package not loaded after ensure".to_string()))?;

    match args.format {
        OutputFormat::Text => print_text(&package, config.index.organization_wide),
        OutputFormat::Json => print_json(&package, config.index.organization_wide),
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Describe a local file the way a release asset would be
///
/// The two parent directories stand in for repository and tag, matching
/// the `download/<repo>/<tag>/<file>` layout of a mirrored tree.
async fn local_artifact(path: &Path) -> DebhubResult<ArtifactRef> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| DebhubError::io(format!("reading {}", path.display()), e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DebhubError::InvalidArtifact(path.display().to_string()))?;

    let mut parents = path
        .parent()
        .into_iter()
        .flat_map(|p| p.components().rev())
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        });
    let tag_name = parents.next().unwrap_or("local");
    let repo_name = parents.next().unwrap_or("local");

    let updated_at: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| Utc::now());

    Ok(ArtifactRef {
        repo_name: repo_name.to_string(),
        tag_name: tag_name.to_string(),
        file_name: file_name.to_string(),
        download_url: path.display().to_string(),
        size: metadata.len(),
        updated_at,
    })
}

fn print_text(package: &Package, organization_wide: bool) -> DebhubResult<()> {
    eprintln!("{} {}", style("Package:").bold(), style(package.identity()).cyan());

    let mut stdout = io::stdout().lock();
    package
        .write(&mut stdout, organization_wide)
        .and_then(|_| stdout.flush())
        .map_err(|e| DebhubError::io("writing entry", e))
}

fn print_json(package: &Package, organization_wide: bool) -> DebhubResult<()> {
    let json = serde_json::json!({
        "identity": package.identity(),
        "fields": package.descriptor.fields().collect::<Vec<_>>(),
        "filename": package.filename(organization_wide),
        "size": package.artifact.size,
        "md5sum": package.md5sum,
        "updated_at": package.artifact.updated_at,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn url_detection() {
        assert!(is_url("https://github.com/a/b/releases/download/v1/x.deb"));
        assert!(is_url("http://localhost/x.deb"));
        assert!(!is_url("./x.deb"));
        assert!(!is_url("/srv/debs/x.deb"));
    }

    #[tokio::test]
    async fn local_artifact_uses_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("tools").join("v2.0");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tools_2.0_amd64.deb");
        std::fs::write(&path, b"0123456789").unwrap();

        let artifact = local_artifact(&path).await.unwrap();
        assert_eq!(artifact.repo_name, "tools");
        assert_eq!(artifact.tag_name, "v2.0");
        assert_eq!(artifact.file_name, "tools_2.0_amd64.deb");
        assert_eq!(artifact.size, 10);
    }

    #[tokio::test]
    async fn local_artifact_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = local_artifact(&temp.path().join("nope.deb")).await.unwrap_err();
        assert!(matches!(err, DebhubError::Io { .. }));
    }
}
