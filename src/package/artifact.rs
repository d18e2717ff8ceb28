//! Release asset references

use crate::error::{DebhubError, DebhubResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where to fetch one release asset, as reported by the release listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    /// Repository the release belongs to
    pub repo_name: String,

    /// Release tag
    pub tag_name: String,

    /// Asset file name
    pub file_name: String,

    /// Browser download URL of the asset
    pub download_url: String,

    /// Declared size in bytes; 0 when unknown
    pub size: u64,

    /// When the asset was last updated
    pub updated_at: DateTime<Utc>,
}

impl ArtifactRef {
    /// Derive repository, tag and file name from a release download URL
    ///
    /// Expects `<scheme>://<host>/<owner>/<repo>/releases/download/<tag>/<file>`.
    pub fn from_download_url(
        url: &str,
        size: u64,
        updated_at: DateTime<Utc>,
    ) -> DebhubResult<Self> {
        let invalid = || DebhubError::InvalidArtifact(url.to_string());

        let (_, rest) = url.split_once("://").ok_or_else(invalid)?;
        let segments: Vec<&str> = rest.split('/').collect();

        match segments.as_slice() {
            [_host, _owner, repo, "releases", "download", tag, file]
                if !repo.is_empty() && !tag.is_empty() && !file.is_empty() =>
            {
                Ok(Self {
                    repo_name: repo.to_string(),
                    tag_name: tag.to_string(),
                    file_name: file.to_string(),
                    download_url: url.to_string(),
                    size,
                    updated_at,
                })
            }
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_download_url() {
        let url = "https://github.com/acme/tools/releases/download/v1.0/tools_1.0_amd64.deb";
        let artifact = ArtifactRef::from_download_url(url, 42, Utc::now()).unwrap();

        assert_eq!(artifact.repo_name, "tools");
        assert_eq!(artifact.tag_name, "v1.0");
        assert_eq!(artifact.file_name, "tools_1.0_amd64.deb");
        assert_eq!(artifact.download_url, url);
        assert_eq!(artifact.size, 42);
    }

    #[test]
    fn rejects_other_layouts() {
        for url in [
            "https://github.com/acme/tools/archive/v1.0.tar.gz",
            "github.com/acme/tools/releases/download/v1.0/a.deb",
            "https://github.com/acme/tools/releases/download/v1.0/",
            "https://github.com/acme/tools/releases/download/v1.0/a.deb/extra",
        ] {
            assert!(
                matches!(
                    ArtifactRef::from_download_url(url, 0, Utc::now()),
                    Err(DebhubError::InvalidArtifact(_))
                ),
                "accepted {}",
                url
            );
        }
    }
}
