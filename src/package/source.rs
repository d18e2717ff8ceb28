//! Archive sources
//!
//! A source turns a download location into the raw control block and the
//! checksum of the whole package. Failures to obtain the bytes are
//! transport errors; failures to make sense of them are parse errors.

use crate::config::schema::FetchConfig;
use crate::error::{LoadError, LoadResult};
use crate::package::archive::{md5_hex, read_control};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Control block and checksum extracted from one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    /// Raw bytes of the `control` file
    pub control: Vec<u8>,

    /// Hex MD5 of the whole package
    pub md5sum: String,

    /// Number of bytes fetched
    pub size: u64,
}

impl FetchedArchive {
    /// Extract the control block from complete `.deb` bytes
    pub fn from_deb(deb: &[u8]) -> LoadResult<Self> {
        Ok(Self {
            control: read_control(deb)?,
            md5sum: md5_hex(deb),
            size: deb.len() as u64,
        })
    }
}

/// Something that can fetch a package and pull out its metadata
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetch the package at `location`
    async fn fetch(&self, location: &str) -> LoadResult<FetchedArchive>;
}

/// Fetches packages over HTTP(S)
pub struct HttpSource {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpSource {
    /// Create a source from fetch settings
    pub fn new(config: &FetchConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .user_agent(config.user_agent.as_str())
            .build()
            .into();

        Self {
            agent,
            max_bytes: config.max_download_mb.saturating_mul(1024 * 1024),
        }
    }

    fn download(agent: &ureq::Agent, url: &str, max_bytes: u64) -> LoadResult<Vec<u8>> {
        let mut response = agent
            .get(url)
            .call()
            .map_err(|e| LoadError::transport(url, e))?;

        response
            .body_mut()
            .with_config()
            .limit(max_bytes)
            .read_to_vec()
            .map_err(|e| LoadError::transport(url, e))
    }
}

#[async_trait]
impl ArchiveSource for HttpSource {
    async fn fetch(&self, location: &str) -> LoadResult<FetchedArchive> {
        let agent = self.agent.clone();
        let url = location.to_string();
        let max_bytes = self.max_bytes;

        debug!("Downloading {}", url);
        tokio::task::spawn_blocking(move || {
            let deb = Self::download(&agent, &url, max_bytes)?;
            debug!("Downloaded {} bytes from {}", deb.len(), url);
            FetchedArchive::from_deb(&deb)
        })
        .await
        .map_err(|e| LoadError::transport(location, format!("fetch task failed: {}", e)))?
    }
}

/// Reads packages from the local filesystem
///
/// Locations are paths, optionally relative to a base directory.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    base: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative locations against `base`
    pub fn with_base(base: PathBuf) -> Self {
        Self { base: Some(base) }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        match &self.base {
            Some(base) => base.join(location),
            None => PathBuf::from(location),
        }
    }
}

#[async_trait]
impl ArchiveSource for FileSource {
    async fn fetch(&self, location: &str) -> LoadResult<FetchedArchive> {
        let path = self.resolve(location);
        debug!("Reading {}", path.display());

        let deb = tokio::fs::read(&path)
            .await
            .map_err(|e| LoadError::transport(path.display().to_string(), e))?;

        FetchedArchive::from_deb(&deb)
    }
}
