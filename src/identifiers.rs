//! Type-safe identifiers for relay entities.
//!
//! Newtype wrappers keep channel ids, request ids and link generations
//! from being mixed up at compile time.
//!
//! | Type | Wire form | Scope |
//! |------|-----------|-------|
//! | [`ChannelId`] | decimal `u32` (the tab id) | unique among open channels |
//! | [`RequestId`] | opaque string | unique among one channel's pending calls |
//! | [`CompoundId`] | `"<channel>.<request>"` | unique among all in-flight requests |
//! | [`LinkId`] | never serialized | one lifetime of the native connection |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Separator between channel and request parts of a compound id.
pub const COMPOUND_SEPARATOR: char = '.';

// ============================================================================
// ChannelId
// ============================================================================

/// Identifier of one page/tab channel registered with the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u32);

impl ChannelId {
    /// Creates a channel id from a raw tab id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ChannelId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    /// Parses a strictly decimal channel id (no sign, no whitespace).
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_compound_id(s));
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| Error::invalid_compound_id(s))
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Caller-assigned correlation token.
///
/// Page clients generate these; the relay treats them as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a fresh random request id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is the empty string.
    ///
    /// Empty ids never correlate with anything.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// CompoundId
// ============================================================================

/// A request id namespaced by the channel it came from.
///
/// Rendered on the native leg as `"<channel>.<request>"`. Parsing splits on
/// the first separator; since the channel part is purely numeric, any
/// request id (even one containing `.`) round-trips unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundId {
    /// Originating channel.
    pub channel: ChannelId,
    /// The channel-local request id.
    pub request: RequestId,
}

impl CompoundId {
    /// Creates a compound id.
    #[inline]
    #[must_use]
    pub fn new(channel: ChannelId, request: RequestId) -> Self {
        Self { channel, request }
    }

    /// Splits the compound id back into its parts.
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (ChannelId, RequestId) {
        (self.channel, self.request)
    }
}

impl fmt::Display for CompoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.channel, COMPOUND_SEPARATOR, self.request)
    }
}

impl FromStr for CompoundId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (channel, request) = s
            .split_once(COMPOUND_SEPARATOR)
            .ok_or_else(|| Error::invalid_compound_id(s))?;

        if request.is_empty() {
            return Err(Error::invalid_compound_id(s));
        }

        let channel = channel
            .parse::<ChannelId>()
            .map_err(|_| Error::invalid_compound_id(s))?;

        Ok(Self::new(channel, RequestId::from(request)))
    }
}

// ============================================================================
// LinkId
// ============================================================================

/// Generation number of a native connection.
///
/// Each connection the relay establishes gets the next generation, so
/// late events from a torn-down link can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(u64);

impl LinkId {
    /// The generation before any connection exists.
    #[inline]
    #[must_use]
    pub const fn initial() -> Self {
        Self(0)
    }

    /// Returns the following generation.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
