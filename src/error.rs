use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::SourceName;

/// Remote service a request was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Source(SourceName),
    Chebi,
    Legacy,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Source(name) => write!(f, "source:{name}"),
            Upstream::Chebi => write!(f, "chebi"),
            Upstream::Legacy => write!(f, "legacy"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum BuilderError {
    #[error("invalid compound id: {0}")]
    InvalidCompoundId(String),

    #[error("unknown source: {0}")]
    InvalidSource(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load reference file {path}: {message}")]
    Reference { path: PathBuf, message: String },

    #[error("{upstream} request failed: {message}")]
    Http { upstream: Upstream, message: String },

    #[error("{upstream} returned status {status}: {message}")]
    Status {
        upstream: Upstream,
        status: u16,
        message: String,
    },

    #[error("{upstream} returned an unexpected payload: {message}")]
    Payload { upstream: Upstream, message: String },

    #[error("{provider} needs {key}, which this compound does not have")]
    MissingKey {
        provider: SourceName,
        key: &'static str,
    },

    #[error("{0} was cancelled")]
    Cancelled(SourceName),

    #[error("failed to build worker pool: {0}")]
    Pool(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to serialize compound record: {0}")]
    Serialize(String),
}

impl BuilderError {
    pub fn http(upstream: Upstream, err: impl fmt::Display) -> Self {
        BuilderError::Http {
            upstream,
            message: err.to_string(),
        }
    }

    pub fn payload(upstream: Upstream, message: impl Into<String>) -> Self {
        BuilderError::Payload {
            upstream,
            message: message.into(),
        }
    }
}
