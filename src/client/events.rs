//! Callbacks for unsolicited native events and relay alerts.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::protocol::ReaderEvent;

// ============================================================================
// Types
// ============================================================================

/// Called with the reader index and the new card's ATR.
pub type CardInsertedHandler = Arc<dyn Fn(usize, &str) + Send + Sync>;

/// Called with the reader index.
pub type CardRemovedHandler = Arc<dyn Fn(usize) + Send + Sync>;

/// Called with `true` when readers were plugged in, `false` when unplugged.
pub type ReadersChangedHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// Called with the alert text.
pub type AlertHandler = Arc<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// EventHandlers
// ============================================================================

/// The page's callback table.
///
/// Every slot is optional; events without a handler are dropped.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) card_inserted: Option<CardInsertedHandler>,
    pub(crate) card_removed: Option<CardRemovedHandler>,
    pub(crate) readers_changed: Option<ReadersChangedHandler>,
    pub(crate) alert: Option<AlertHandler>,
}

impl EventHandlers {
    /// Invokes the handler matching `event`.
    ///
    /// Returns `true` if a handler ran.
    pub fn dispatch(&self, event: &ReaderEvent) -> bool {
        match event {
            ReaderEvent::CardInserted { reader, atr } => self
                .card_inserted
                .as_ref()
                .map(|handler| handler(*reader, atr))
                .is_some(),
            ReaderEvent::CardRemoved { reader } => self
                .card_removed
                .as_ref()
                .map(|handler| handler(*reader))
                .is_some(),
            ReaderEvent::ReadersChanged { increased } => self
                .readers_changed
                .as_ref()
                .map(|handler| handler(*increased))
                .is_some(),
        }
    }

    /// Invokes the alert handler.
    ///
    /// Returns `true` if a handler ran.
    pub fn alert(&self, info: &str) -> bool {
        self.alert.as_ref().map(|handler| handler(info)).is_some()
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("card_inserted", &self.card_inserted.is_some())
            .field("card_removed", &self.card_removed.is_some())
            .field("readers_changed", &self.readers_changed.is_some())
            .field("alert", &self.alert.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
