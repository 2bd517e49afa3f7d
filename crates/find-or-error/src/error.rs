//! Error types for find-or-error

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::ErrorCode;

/// Kind tag carried by the default not-found error.
pub const DOCUMENT_NOT_FOUND: &str = "DocumentNotFoundError";

/// Errors surfaced by the underlying record source.
///
/// These are passed through the find-or-error layer unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The source rejected the query
    #[error("Query failed: {0}")]
    Query(String),

    /// The predicate could not be interpreted by the source
    #[error("Invalid filter: {reason}")]
    InvalidFilter { reason: String },

    /// Backend-level failure (connection, lock, ...)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// The error raised when a lookup comes back empty while enforcement is on.
///
/// Built by an [`EmptyErrorBuilder`](crate::EmptyErrorBuilder); the default
/// builder sets `kind` to [`DOCUMENT_NOT_FOUND`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct NotFoundError {
    /// Error name, e.g. `DocumentNotFoundError`
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Discriminator copied from a non-boolean enforcement flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl NotFoundError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Attach a discriminating code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }
}

/// Errors delivered through a lookup's own error channel
/// (the rejected deferred value or the continuation's error slot).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FindError {
    /// Record absent and enforcement enabled
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Upstream failure from the record source
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An option bag value the enforcement layer cannot interpret
    #[error("Invalid value for option `{key}`: {reason}")]
    InvalidOption { key: String, reason: String },
}

impl FindError {
    /// The synthesized not-found error, if this is one.
    pub fn as_not_found(&self) -> Option<&NotFoundError> {
        match self {
            FindError::NotFound(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FindError::NotFound(_))
    }
}

/// Caller-side programming errors, raised synchronously at the call site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryPointError {
    /// No entry point is registered under this name
    #[error("No such method: {name}")]
    NoSuchMethod { name: String },

    /// No query helper is registered under this name
    #[error("No such query helper: {name}")]
    NoSuchQueryHelper { name: String },

    /// Continuation style was requested outside a tokio runtime
    #[error("Continuation style requires a running tokio runtime")]
    NoRuntime,
}

/// Errors from loading or validating a registration configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON config could not be parsed
    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config could not be parsed
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Unknown config file extension
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The option key is empty
    #[error("query.queryOption must not be empty")]
    EmptyOptionKey,

    /// Two static entry points share a name
    #[error("Duplicate entry point name: {0}")]
    DuplicateEntryPoint(String),
}
