use thiserror::Error;

use crate::sources::SourceKind;

/// SDK Error type
#[derive(Error, Debug)]
pub enum Error {
    /// A data source failed while fetching
    #[error("Source {source_kind} failed: {message}")]
    Source {
        source_kind: SourceKind,
        message: String,
    },

    /// A source was selected but nothing is registered to fetch it
    #[error("No fetcher registered for source {0}")]
    SourceUnavailable(SourceKind),

    /// Network or transport error reported by a collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The coordinator has been shut down
    #[error("Refresh coordinator is shut down")]
    ShutDown,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a collaborator failure as a failure of the given source
    pub fn source_failed(source_kind: SourceKind, message: impl Into<String>) -> Self {
        Self::Source {
            source_kind,
            message: message.into(),
        }
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
