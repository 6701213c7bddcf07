/*!
Error types for the snapwire codec and snapshot store.
*/

use std::fmt;
use std::io;

use thiserror::Error;

use crate::value::ValueKind;

/// Result type used throughout snapwire.
pub type Result<T> = std::result::Result<T, SnapwireError>;

/// What a failed registry or handler lookup was keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKey {
    /// Runtime value kind (encode side)
    Kind(ValueKind),
    /// One-byte wire identifier (decode side)
    WireId(u8),
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKey::Kind(kind) => write!(f, "type {kind}"),
            BindingKey::WireId(id) => write!(f, "wire id {id}"),
        }
    }
}

/// Errors that can occur while encoding, decoding or storing snapshots.
#[derive(Error, Debug)]
pub enum SnapwireError {
    /// No handler bound for a runtime type (encode) or wire id (decode)
    #[error("Unknown type: no handler registered for {0}")]
    UnknownType(BindingKey),

    /// Registration conflict without the override flag
    #[error("Duplicate binding: a handler is already registered for {0}")]
    DuplicateBinding(BindingKey),

    /// Wire ids 192..=255 belong to control markers
    #[error("Wire id {0} is reserved for control markers (type ids must be below 192)")]
    ReservedWireId(u8),

    /// Length/marker bytes inconsistent with the stream
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON conversion errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested snapshot is not in the store
    #[error("Snapshot {0} doesn't exist")]
    SnapshotNotFound(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl SnapwireError {
    /// Create a new malformed frame error
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedFrame(msg.into())
    }

    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Map an I/O error hit while decoding; truncation becomes a malformed frame.
    pub(crate) fn from_read(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::malformed(format!("stream truncated while reading {what}"))
        } else {
            Self::Io(err)
        }
    }

    /// Whether a container decoder may rewind and stop instead of failing.
    ///
    /// `UnknownType` always aborts the whole read, as do I/O failures of the
    /// underlying source.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SnapwireError::MalformedFrame(_) | SnapwireError::Compression(_)
        )
    }
}
