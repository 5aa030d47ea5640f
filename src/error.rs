//! Error types for the WebCard relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webcard_relay::{PageClient, Result};
//!
//! async fn example(client: &PageClient) -> Result<()> {
//!     let readers = client.readers().await?;
//!     let atr = readers[0].connect(ShareMode::Shared).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Availability | [`Error::ExtensionUnavailable`], [`Error::NativeUnavailable`], [`Error::ConnectionClosed`] |
//! | Command | [`Error::CommandFailed`], [`Error::RequestTimeout`], [`Error::TooManyPending`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidCompoundId`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::RequestId;
use crate::protocol::CommandCode;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when relay, host or client options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Availability Errors
    // ========================================================================
    /// The extension side of the page bus is not present.
    ///
    /// Returned immediately by the page client when its readiness gate is
    /// closed, so page code can tell "extension absent" apart from
    /// "native app absent or slow".
    #[error("WebCard extension is not available")]
    ExtensionUnavailable,

    /// The native host could not be reached.
    ///
    /// Returned when spawning or wiring up the native process fails.
    #[error("Native host unavailable: {message}")]
    NativeUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// A channel or connection closed while in use.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Command Errors
    // ========================================================================
    /// The native host answered with the `incomplete` marker, or the reply
    /// lacked the payload the command requires.
    #[error("Command {command} failed")]
    CommandFailed {
        /// The command that failed.
        command: CommandCode,
    },

    /// The caller-imposed deadline expired before a reply arrived.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Too many calls are awaiting replies.
    #[error("Too many pending requests: {pending}/{max}")]
    TooManyPending {
        /// Calls currently pending.
        pending: usize,
        /// Configured ceiling.
        max: usize,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// A compound identifier could not be split into channel and request.
    #[error("Invalid compound id: {value:?}")]
    InvalidCompoundId {
        /// The offending wire value.
        value: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a native-unavailable error.
    #[inline]
    pub fn native_unavailable(message: impl Into<String>) -> Self {
        Self::NativeUnavailable {
            message: message.into(),
        }
    }

    /// Creates a command failure error.
    #[inline]
    pub fn command_failed(command: CommandCode) -> Self {
        Self::CommandFailed { command }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a too-many-pending error.
    #[inline]
    pub fn too_many_pending(pending: usize, max: usize) -> Self {
        Self::TooManyPending { pending, max }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid compound id error.
    #[inline]
    pub fn invalid_compound_id(value: impl Into<String>) -> Self {
        Self::InvalidCompoundId {
            value: value.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if the extension or native host is unreachable.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ExtensionUnavailable
                | Self::NativeUnavailable { .. }
                | Self::ConnectionClosed
                | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry, e.g. after the user plugs
    /// a reader in or the native host restarts.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout { .. }
                | Self::TooManyPending { .. }
                | Self::CommandFailed { .. }
                | Self::NativeUnavailable { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
