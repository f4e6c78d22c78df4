//! Error types shared across the core library

use std::path::PathBuf;
use thiserror::Error;

use crate::models::CollectionKey;

/// Failures raised by a key-value backend
#[derive(Error, Debug)]
pub enum KvError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout waiting for store lock - another process may be writing: {0:?}")]
    LockTimeout(PathBuf),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store connection is poisoned")]
    Poisoned,

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Background storage task failed: {0}")]
    Task(String),
}

impl KvError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KvError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the login endpoint
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    /// HTTP 401; callers treat this as "send the user back to login"
    #[error("invalid credentials")]
    Unauthorized,

    #[error("network error: {0}")]
    Transport(String),

    #[error("timeout")]
    Timeout,

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("json error: {0}")]
    Serde(String),
}

/// Errors surfaced by collection, editor and session operations
#[derive(Error, Debug)]
pub enum FincaError {
    /// A required field was empty; nothing was changed or written
    #[error("Missing required field '{field}' for {collection}")]
    Validation {
        collection: CollectionKey,
        field: &'static str,
    },

    #[error("Index {index} is out of range for a collection of {len} records")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Stored value for '{key}' is not a valid record list: {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage error for '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: KvError,
    },

    #[error("Login failed: {0}")]
    Auth(#[from] AuthError),

    #[error("The email '{0}' is not registered")]
    NotRegistered(String),
}

impl FincaError {
    pub(crate) fn storage(key: &str, source: KvError) -> Self {
        FincaError::Storage {
            key: key.to_string(),
            source,
        }
    }
}
