//! Error types for every fallible stage of an import run.
//!
//! Recoverable conditions (unmatched challenges, failed listing pages,
//! malformed reward subtitles) are logged and never reach these types.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("author options `merge_multiple` and `structured` are mutually exclusive")]
    ConflictingAuthorModes,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} was not valid JSON: {message}")]
    Decode { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// Status codes worth another attempt; everything else fails fast.
    pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => Self::RETRYABLE_STATUSES.contains(status),
            FetchError::Decode { .. } | FetchError::Client(_) => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path} row {row}: proposal_id `{value}` is not an integer")]
    InvalidProposalId {
        path: PathBuf,
        row: usize,
        value: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("field `{field}` declared as {expected} cannot take value {value}")]
    Coercion {
        field: String,
        expected: String,
        value: String,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise {path}: {message}")]
    Serialise { path: PathBuf, message: String },
}

/// Umbrella error returned by the pipeline entrypoints.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Assessment(#[from] AssessmentError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
