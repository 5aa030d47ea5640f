//! Reader event types.
//!
//! Events are unsolicited notifications from the native host. They carry
//! no request id and are broadcast by the relay to every channel.
//!
//! # Event Codes
//!
//! | Code | Event | Fields |
//! |------|-------|--------|
//! | 1 | card inserted | `r` reader index, `d` ATR hex |
//! | 2 | card removed | `r` reader index |
//! | 3 | readers increased | - |
//! | 4 | readers decreased | - |

// ============================================================================
// Imports
// ============================================================================

use super::Message;

// ============================================================================
// EventCode
// ============================================================================

/// Event selector carried in the `e` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCode {
    /// A card was inserted.
    CardInserted,
    /// A card was removed.
    CardRemoved,
    /// A reader was plugged in.
    ReadersIncreased,
    /// A reader was unplugged.
    ReadersDecreased,
}

impl EventCode {
    /// Maps a wire value to a known event code.
    #[must_use]
    pub const fn from_u32(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::CardInserted),
            2 => Some(Self::CardRemoved),
            3 => Some(Self::ReadersIncreased),
            4 => Some(Self::ReadersDecreased),
            _ => None,
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::CardInserted => 1,
            Self::CardRemoved => 2,
            Self::ReadersIncreased => 3,
            Self::ReadersDecreased => 4,
        }
    }
}

// ============================================================================
// ReaderEvent
// ============================================================================

/// Parsed event for type-safe handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A card was inserted into a reader.
    CardInserted {
        /// Reader index.
        reader: usize,
        /// Answer To Reset of the new card, hex encoded.
        atr: String,
    },

    /// A card was removed from a reader.
    CardRemoved {
        /// Reader index.
        reader: usize,
    },

    /// Set of readers changed.
    ReadersChanged {
        /// `true` when readers were plugged in, `false` when unplugged.
        increased: bool,
    },
}

impl ReaderEvent {
    /// Parses an event envelope.
    ///
    /// Returns `None` for messages without an event code or with a code
    /// this crate does not know.
    #[must_use]
    pub fn parse(message: &Message) -> Option<Self> {
        let code = EventCode::from_u32(message.event?)?;
        let reader = message.reader.unwrap_or_default() as usize;

        Some(match code {
            EventCode::CardInserted => Self::CardInserted {
                reader,
                atr: message.data_str().unwrap_or_default().to_string(),
            },
            EventCode::CardRemoved => Self::CardRemoved { reader },
            EventCode::ReadersIncreased => Self::ReadersChanged { increased: true },
            EventCode::ReadersDecreased => Self::ReadersChanged { increased: false },
        })
    }

    /// Returns the event code.
    #[must_use]
    pub fn code(&self) -> EventCode {
        match self {
            Self::CardInserted { .. } => EventCode::CardInserted,
            Self::CardRemoved { .. } => EventCode::CardRemoved,
            Self::ReadersChanged { increased: true } => EventCode::ReadersIncreased,
            Self::ReadersChanged { increased: false } => EventCode::ReadersDecreased,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_inserted_parsing() {
        let message: Message =
            serde_json::from_str(r#"{"e": 1, "r": 0, "d": "3B8A8001"}"#).expect("parse");

        assert_eq!(
            ReaderEvent::parse(&message),
            Some(ReaderEvent::CardInserted {
                reader: 0,
                atr: "3B8A8001".into()
            })
        );
    }

    #[test]
    fn test_card_removed_parsing() {
        let message: Message = serde_json::from_str(r#"{"e": 2, "r": 3}"#).expect("parse");
        let event = ReaderEvent::parse(&message).expect("known event");
        assert_eq!(event, ReaderEvent::CardRemoved { reader: 3 });
        assert_eq!(event.code(), EventCode::CardRemoved);
    }

    #[test]
    fn test_readers_changed_parsing() {
        let more: Message = serde_json::from_str(r#"{"e": 3}"#).expect("parse");
        let less: Message = serde_json::from_str(r#"{"e": 4}"#).expect("parse");

        assert_eq!(
            ReaderEvent::parse(&more),
            Some(ReaderEvent::ReadersChanged { increased: true })
        );
        assert_eq!(
            ReaderEvent::parse(&less).map(|e| e.code()),
            Some(EventCode::ReadersDecreased)
        );
    }

    #[test]
    fn test_unknown_event() {
        let message: Message = serde_json::from_str(r#"{"e": 9}"#).expect("parse");
        assert_eq!(ReaderEvent::parse(&message), None);

        let reply: Message = serde_json::from_str(r#"{"i": "x"}"#).expect("parse");
        assert_eq!(ReaderEvent::parse(&reply), None);
    }
}
