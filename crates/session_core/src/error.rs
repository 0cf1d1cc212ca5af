use std::{io, path::PathBuf};

use shared::{domain::MessageId, error::ErrorCode};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("message id space exhausted after id {last}")]
    IdSpaceExhausted { last: MessageId },
}

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("query backend unreachable: {0}")]
    Unreachable(String),
    #[error("query backend rejected the request ({code:?}): {message}")]
    Backend { code: ErrorCode, message: String },
    #[error("query backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Transport,
    Backend,
    InvalidResponse,
}

impl FailureCategory {
    pub fn describe(self) -> &'static str {
        match self {
            FailureCategory::Transport => "data service unreachable",
            FailureCategory::Backend => "data service error",
            FailureCategory::InvalidResponse => "unexpected data service response",
        }
    }
}

impl ResolveError {
    pub fn category(&self) -> FailureCategory {
        match self {
            ResolveError::Unreachable(_) => FailureCategory::Transport,
            ResolveError::Backend { .. } => FailureCategory::Backend,
            ResolveError::InvalidResponse(_) => FailureCategory::InvalidResponse,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("session has been shut down")]
    Closed,
    #[error("quick queries are only offered before the first turn")]
    QuickQueriesHidden,
    #[error("no quick query at index {index} ({available} available)")]
    UnknownQuickQuery { index: usize, available: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("the http resolver requires a backend url")]
    MissingBackendUrl,
    #[error("invalid backend url '{url}': {source}")]
    InvalidBackendUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("backend url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}
