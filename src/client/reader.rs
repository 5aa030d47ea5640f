//! Handle on one smart card reader.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::Result;
use crate::protocol::{Command, ShareMode};

use super::page::PageClient;

// ============================================================================
// Reader
// ============================================================================

/// A reader from the last list readers reply.
///
/// The handle addresses the reader by its position in that list, so it goes
/// stale once the reader set changes. Fetch a fresh list after a
/// readers-changed event.
///
/// The display fields are a snapshot; `connected` starts out unknown and is
/// left for the caller to maintain.
#[derive(Clone)]
pub struct Reader {
    /// Position in the list.
    pub index: usize,
    /// Reader name.
    pub name: String,
    /// ATR of the inserted card, hex encoded. Empty without a card.
    pub atr: String,
    /// Caller-maintained connection flag.
    pub connected: Option<bool>,
    /// Client the commands go through.
    client: PageClient,
}

impl Reader {
    pub(crate) fn new(index: usize, name: String, atr: String, client: PageClient) -> Self {
        Self {
            index,
            name,
            atr,
            connected: None,
            client,
        }
    }

    /// Returns `true` if a card was present when the list was fetched.
    #[inline]
    #[must_use]
    pub fn has_card(&self) -> bool {
        !self.atr.is_empty()
    }

    /// Connects to the card.
    ///
    /// Resolves to the card's ATR.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CommandFailed`] if the host could not connect.
    pub async fn connect(&self, share_mode: ShareMode) -> Result<String> {
        self.client
            .call(Command::Connect {
                reader: self.index,
                share_mode,
            })
            .await?
            .into_data()
    }

    /// Disconnects from the card.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CommandFailed`] if the host reported a failure.
    pub async fn disconnect(&self) -> Result<()> {
        self.client
            .call(Command::Disconnect { reader: self.index })
            .await?;
        Ok(())
    }

    /// Sends a command APDU and resolves to the response APDU, both hex.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CommandFailed`] if the exchange failed.
    pub async fn transceive(&self, apdu: impl Into<String>) -> Result<String> {
        self.client
            .call(Command::Transceive {
                reader: self.index,
                apdu: apdu.into(),
            })
            .await?
            .into_data()
    }

    /// Asks the host for the reader's attributes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CommandFailed`] if the host reported a failure.
    pub async fn get_attributes(&self) -> Result<()> {
        self.client
            .call(Command::GetAttributes { reader: self.index })
            .await?;
        Ok(())
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("atr", &self.atr)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
