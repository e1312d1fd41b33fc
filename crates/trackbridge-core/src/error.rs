//! Error types for the TrackBridge DIS-to-CoT bridge.
//!
//! Nothing in the bridge is fatal to the process: every failure is isolated to
//! the packet, send, or encode attempt that triggered it. These types describe
//! the failures that are surfaced to callers rather than logged and dropped.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type alias using TrackBridgeError as the error type.
pub type Result<T> = std::result::Result<T, TrackBridgeError>;

/// Top-level error type for all TrackBridge operations.
///
/// All variants are serializable so collaborators can report them.
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum TrackBridgeError {
    /// Socket, address, and history journal errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Errors raised by the UDP listener, the CoT sender, and the history journal.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum TransportError {
    /// IP address or port could not be parsed
    #[error("Invalid address: {value}")]
    InvalidAddress { value: String },

    /// Failed to bind a UDP socket
    #[error("Failed to bind {address}: {reason}")]
    Bind { address: String, reason: String },

    /// Failed to join a multicast group
    #[error("Failed to join multicast group {group}: {reason}")]
    Multicast { group: String, reason: String },

    /// Datagram could not be sent
    #[error("Failed to send to {target}: {reason}")]
    Send { target: String, reason: String },

    /// History journal could not be written or read
    #[error("History journal error for {path}: {reason}")]
    History { path: String, reason: String },

    /// Heartbeat interval must be positive
    #[error("Invalid heartbeat interval: {seconds}s")]
    InvalidInterval { seconds: u64 },
}

impl TransportError {
    /// Creates an invalid address error.
    pub fn invalid_address(value: impl Into<String>) -> Self {
        Self::InvalidAddress {
            value: value.into(),
        }
    }

    /// Creates a bind error.
    pub fn bind(address: impl ToString, reason: impl ToString) -> Self {
        Self::Bind {
            address: address.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a send error.
    pub fn send(target: impl ToString, reason: impl ToString) -> Self {
        Self::Send {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a history journal error.
    pub fn history(path: impl ToString, reason: impl ToString) -> Self {
        Self::History {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Wrapper for I/O errors to make them serializable.
#[derive(Debug, Error, Serialize, Deserialize)]
#[error("I/O error: {kind:?}: {message}")]
pub struct IoError {
    pub kind: IoErrorKind,
    pub message: String,
}

impl From<io::Error> for IoError {
    fn from(err: io::Error) -> Self {
        Self {
            kind: err.kind().into(),
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for TrackBridgeError {
    fn from(err: io::Error) -> Self {
        TrackBridgeError::Io(err.into())
    }
}

/// Serializable version of std::io::ErrorKind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoErrorKind {
    NotFound,
    PermissionDenied,
    ConnectionRefused,
    AddrInUse,
    AddrNotAvailable,
    BrokenPipe,
    AlreadyExists,
    WouldBlock,
    InvalidInput,
    InvalidData,
    TimedOut,
    Interrupted,
    UnexpectedEof,
    Other,
}

impl From<io::ErrorKind> for IoErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => IoErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            io::ErrorKind::ConnectionRefused => IoErrorKind::ConnectionRefused,
            io::ErrorKind::AddrInUse => IoErrorKind::AddrInUse,
            io::ErrorKind::AddrNotAvailable => IoErrorKind::AddrNotAvailable,
            io::ErrorKind::BrokenPipe => IoErrorKind::BrokenPipe,
            io::ErrorKind::AlreadyExists => IoErrorKind::AlreadyExists,
            io::ErrorKind::WouldBlock => IoErrorKind::WouldBlock,
            io::ErrorKind::InvalidInput => IoErrorKind::InvalidInput,
            io::ErrorKind::InvalidData => IoErrorKind::InvalidData,
            io::ErrorKind::TimedOut => IoErrorKind::TimedOut,
            io::ErrorKind::Interrupted => IoErrorKind::Interrupted,
            io::ErrorKind::UnexpectedEof => IoErrorKind::UnexpectedEof,
            _ => IoErrorKind::Other,
        }
    }
}
