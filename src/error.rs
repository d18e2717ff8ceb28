//! Error types for debhub
//!
//! Package loading has its own `LoadError`, which cells store and hand back
//! to every caller. Everything else uses `DebhubResult<T>`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for debhub operations
pub type DebhubResult<T> = Result<T, DebhubError>;

/// Result type alias for package loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Broad classification of a load failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// Fetching the artifact failed; may succeed later
    Transport,
    /// The archive or its control block could not be read
    Parse,
    /// The control block parsed but lacks a mandatory field
    Validation,
}

impl std::fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::Validation => "validation",
        };
        write!(f, "{}", name)
    }
}

/// Failure to load one package artifact
///
/// Cloned into every caller waiting on the same cell, so it only carries
/// owned strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("invalid archive: {0}")]
    Archive(String),

    #[error("malformed control: {0}")]
    Malformed(String),

    #[error("no paragraphs")]
    NoParagraphs,

    #[error("too many paragraphs")]
    TooManyParagraphs,

    #[error("missing {0} from control")]
    MissingField(&'static str),

    #[error("missing md5sum")]
    MissingChecksum,
}

impl LoadError {
    /// Create a transport error for a URL or path
    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::Transport { .. } => LoadErrorKind::Transport,
            Self::Archive(_) | Self::Malformed(_) | Self::NoParagraphs | Self::TooManyParagraphs => {
                LoadErrorKind::Parse
            }
            Self::MissingField(_) | Self::MissingChecksum => LoadErrorKind::Validation,
        }
    }

    /// Check if a later attempt could succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == LoadErrorKind::Transport
    }
}

/// All errors that can occur in debhub
#[derive(Error, Debug)]
pub enum DebhubError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Invalid artifact reference: {0}")]
    InvalidArtifact(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DebhubError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Load(e) => match e.kind() {
                LoadErrorKind::Transport => Some("Check the URL and network, then try again"),
                LoadErrorKind::Parse => Some("The asset does not look like a Debian package"),
                LoadErrorKind::Validation => {
                    Some("The package control file needs Package, Version and Architecture")
                }
            },
            Self::InvalidArtifact(_) => {
                Some("Expected https://<host>/<owner>/<repo>/releases/download/<tag>/<file>")
            }
            _ => None,
        }
    }
}
