//! Settled call results.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};
use crate::protocol::Message;

use super::reader::Reader;

// ============================================================================
// Reply
// ============================================================================

/// What a call resolves to, by command.
///
/// | Command | Reply |
/// |---------|-------|
/// | list readers (1) | [`Reply::Readers`] |
/// | connect (2), transceive (4) | [`Reply::Data`] |
/// | get version (10) | [`Reply::Message`] |
/// | anything else | [`Reply::Empty`] |
#[derive(Debug, Clone)]
pub enum Reply {
    /// Reader handles in list order.
    Readers(Vec<Reader>),
    /// Hex payload (ATR on connect, response APDU on transceive).
    Data(String),
    /// Plain acknowledgement.
    Empty,
    /// The whole reply envelope.
    Message(Message),
}

impl Reply {
    /// Returns the reply kind for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Readers(_) => "readers",
            Self::Data(_) => "data",
            Self::Empty => "empty",
            Self::Message(_) => "message",
        }
    }

    /// Unwraps a reader list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for any other reply.
    pub fn into_readers(self) -> Result<Vec<Reader>> {
        match self {
            Self::Readers(readers) => Ok(readers),
            other => Err(other.unexpected("readers")),
        }
    }

    /// Unwraps a data payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for any other reply.
    pub fn into_data(self) -> Result<String> {
        match self {
            Self::Data(data) => Ok(data),
            other => Err(other.unexpected("data")),
        }
    }

    /// Unwraps a full envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for any other reply.
    pub fn into_message(self) -> Result<Message> {
        match self {
            Self::Message(message) => Ok(message),
            other => Err(other.unexpected("message")),
        }
    }

    fn unexpected(&self, wanted: &str) -> Error {
        Error::protocol(format!("Expected {wanted} reply, got {}", self.kind()))
    }
}

// ============================================================================
// Version
// ============================================================================

/// Versions reported by the get version call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    /// Native host version (`verNat`).
    pub native: Option<String>,
    /// Extension version (`verExt`), stamped by the relay.
    pub extension: Option<String>,
}

impl From<&Message> for Version {
    fn from(message: &Message) -> Self {
        Self {
            native: message.native_version.clone(),
            extension: message.extension_version.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
