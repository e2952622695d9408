//! Error types.
//!
//! Most engine operations are total and never fail. Errors exist only at the
//! edges: storage backends, keyed settings writes, and tool handlers. The
//! stores and the tool registry log and absorb these rather than surfacing
//! them to the host.

/// Failure reported by a [`crate::storage::Storage`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem read or write failed.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    /// Writing `len` bytes under `key` would exceed the backend quota.
    #[error("storage quota exceeded writing {len} bytes to {key} (quota {quota})")]
    QuotaExceeded { key: String, len: usize, quota: usize },
    /// Opaque failure from a host storage API.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Failure applying a keyed settings write.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The key does not name a setting.
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    /// The value has the wrong shape for the setting.
    #[error("invalid value for setting {key}: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure inside a tool handler.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The pointer position could not be mapped into chart space.
    #[error("pointer at ({x}, {y}) is outside the chart")]
    Projection { x: f64, y: f64 },
    /// The tool refused the event.
    #[error("tool rejected event: {0}")]
    Rejected(String),
}
