//! Centralized error types for the LG TV adapter.
//!
//! Each concern has its own `thiserror` enum next to the code that raises it.
//! [`LgtvError`] is what crosses the public API: it carries a human-readable
//! message and a machine-readable [`code`](LgtvError::code), and serializes
//! as `{"type": ..., "details": ...}` for hosts that forward errors as JSON.

use serde::Serialize;
use thiserror::Error;

use crate::device::{ChannelError, DiscoveryError};
use crate::services::connection::ConnectionError;
use crate::store::StoreError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::NoInterfaces => "no_network_interfaces",
            Self::Timeout { .. } => "discovery_timeout",
            Self::SearchEnded => "search_ended",
        }
    }
}

impl ErrorCode for ConnectionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "connect_timeout",
            Self::Closed => "channel_closed",
            Self::Transport(_) => "transport_error",
            Self::NoAddress => "no_address",
        }
    }
}

impl ErrorCode for ChannelError {
    fn code(&self) -> &'static str {
        match self {
            Self::Closed => "channel_closed",
            Self::Transport(_) => "transport_error",
            Self::Device(_) => "device_error",
        }
    }
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "store_io_failed",
            Self::Encode(_) => "store_encode_failed",
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum LgtvError {
    /// The TV could not be located during initialization.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// A command's JSON payload did not parse.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A command was missing a required argument.
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// The adapter configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LgtvError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery_failed",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::MissingArgument(_) => "missing_argument",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

/// Convenient Result alias for adapter-wide operations.
pub type LgtvResult<T> = Result<T, LgtvError>;

impl From<DiscoveryError> for LgtvError {
    fn from(err: DiscoveryError) -> Self {
        Self::Discovery(err.to_string())
    }
}
