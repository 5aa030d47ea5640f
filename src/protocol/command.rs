//! Command codes and typed commands.
//!
//! Requests carry an integer command selector in the `c` field plus a few
//! command-specific parameters.
//!
//! | Code | Command | Params | Reply payload |
//! |------|---------|--------|---------------|
//! | 0 | ping | - | none |
//! | 1 | list readers | - | `d`: `[{n, a}, ...]` |
//! | 2 | connect | `r`, `p` | `d`: ATR hex |
//! | 3 | disconnect | `r` | none |
//! | 4 | transceive | `r`, `a` | `d`: response APDU hex |
//! | 5 | get attributes | `r` | none |
//! | 10 | get version | - | `verNat`, `verExt` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Map, Value};

// ============================================================================
// CommandCode
// ============================================================================

/// Integer command selector carried in the `c` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// Bare acknowledgement round trip.
    Ping,
    /// Enumerate readers.
    ListReaders,
    /// Connect to the card in a reader.
    Connect,
    /// Disconnect from a reader.
    Disconnect,
    /// Exchange one APDU.
    Transceive,
    /// Query reader attributes.
    GetAttributes,
    /// Query native host version.
    GetVersion,
    /// Any code this crate has no name for.
    Other(u32),
}

impl CommandCode {
    /// Returns the wire value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Ping => 0,
            Self::ListReaders => 1,
            Self::Connect => 2,
            Self::Disconnect => 3,
            Self::Transceive => 4,
            Self::GetAttributes => 5,
            Self::GetVersion => 10,
            Self::Other(code) => code,
        }
    }

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ListReaders => "listReaders",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Transceive => "transceive",
            Self::GetAttributes => "getAttributes",
            Self::GetVersion => "getVersion",
            Self::Other(_) => "other",
        }
    }
}

impl From<u32> for CommandCode {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Ping,
            1 => Self::ListReaders,
            2 => Self::Connect,
            3 => Self::Disconnect,
            4 => Self::Transceive,
            5 => Self::GetAttributes,
            10 => Self::GetVersion,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u32())
    }
}

// ============================================================================
// ShareMode
// ============================================================================

/// PC/SC share mode requested on connect (the `p` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareMode {
    /// No other application may use the reader.
    Exclusive,
    /// Other applications may share the card.
    #[default]
    Shared,
    /// Direct reader access without a card.
    Direct,
}

impl ShareMode {
    /// Returns the wire value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Exclusive => 1,
            Self::Shared => 2,
            Self::Direct => 3,
        }
    }
}

// ============================================================================
// Command
// ============================================================================

/// A typed command with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Code 0.
    Ping,
    /// Code 1.
    ListReaders,
    /// Code 2.
    Connect {
        /// Reader index in the last list.
        reader: usize,
        /// Requested share mode.
        share_mode: ShareMode,
    },
    /// Code 3.
    Disconnect {
        /// Reader index in the last list.
        reader: usize,
    },
    /// Code 4.
    Transceive {
        /// Reader index in the last list.
        reader: usize,
        /// Command APDU as a hex string.
        apdu: String,
    },
    /// Code 5.
    GetAttributes {
        /// Reader index in the last list.
        reader: usize,
    },
    /// Code 10.
    GetVersion,
    /// Arbitrary code with raw parameters.
    Raw {
        /// Command selector.
        code: u32,
        /// Extra top-level envelope fields.
        params: Map<String, Value>,
    },
}

impl Command {
    /// Returns the command selector.
    #[must_use]
    pub fn code(&self) -> CommandCode {
        match self {
            Self::Ping => CommandCode::Ping,
            Self::ListReaders => CommandCode::ListReaders,
            Self::Connect { .. } => CommandCode::Connect,
            Self::Disconnect { .. } => CommandCode::Disconnect,
            Self::Transceive { .. } => CommandCode::Transceive,
            Self::GetAttributes { .. } => CommandCode::GetAttributes,
            Self::GetVersion => CommandCode::GetVersion,
            Self::Raw { code, .. } => CommandCode::from(*code),
        }
    }

    /// Returns the reader index the command targets, if any.
    #[must_use]
    pub fn reader(&self) -> Option<usize> {
        match self {
            Self::Connect { reader, .. }
            | Self::Disconnect { reader }
            | Self::Transceive { reader, .. }
            | Self::GetAttributes { reader } => Some(*reader),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
