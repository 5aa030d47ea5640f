//! Channel registry keyed by channel id.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           ChannelRegistry               │
//! │  ┌─────────────────────────────────┐   │
//! │  │ ChannelId=3  → Channel (tab 3)  │   │
//! │  │ ChannelId=7  → Channel (tab 7)  │   │
//! │  │ ChannelId=12 → Channel (tab 12) │   │
//! │  └─────────────────────────────────┘   │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::identifiers::ChannelId;
use crate::protocol::PageMessage;

use super::channel::{Channel, RegistrationToken};

// ============================================================================
// ChannelRegistry
// ============================================================================

/// The relay's set of open page channels.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: FxHashMap<ChannelId, Channel>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel, replacing any channel registered under the same id.
    ///
    /// Returns the replaced channel.
    pub fn insert(&mut self, channel: Channel) -> Option<Channel> {
        let replaced = self.channels.insert(channel.id(), channel);
        if let Some(ref old) = replaced {
            debug!(channel = %old.id(), token = %old.token(), "Channel registration replaced");
        }
        replaced
    }

    /// Removes a channel if `token` still identifies its registration.
    ///
    /// Returns `true` if something was removed.
    pub fn remove(&mut self, id: ChannelId, token: RegistrationToken) -> bool {
        if self.is_current(id, token) {
            self.channels.remove(&id);
            return true;
        }
        false
    }

    /// Returns `true` if `token` is the live registration of `id`.
    #[inline]
    #[must_use]
    pub fn is_current(&self, id: ChannelId, token: RegistrationToken) -> bool {
        self.channels
            .get(&id)
            .is_some_and(|channel| channel.token() == token)
    }

    /// Returns `true` if a channel is registered under `id`.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ChannelId) -> bool {
        self.channels.contains_key(&id)
    }

    /// Returns the number of registered channels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if no channel is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Delivers a message to one channel, pruning it if the page is gone.
    ///
    /// Returns `true` if the page received the message.
    pub fn deliver(&mut self, id: ChannelId, message: PageMessage) -> bool {
        let Some(channel) = self.channels.get(&id) else {
            return false;
        };

        if channel.deliver(message) {
            return true;
        }

        debug!(channel = %id, "Page gone, pruning channel");
        self.channels.remove(&id);
        false
    }

    /// Delivers a message to every channel, pruning pages that are gone.
    ///
    /// Returns how many pages received it.
    pub fn broadcast(&mut self, message: &PageMessage) -> usize {
        let mut gone = Vec::new();
        let mut delivered = 0;

        for (id, channel) in &self.channels {
            if channel.deliver(message.clone()) {
                delivered += 1;
            } else {
                gone.push(*id);
            }
        }

        for id in gone {
            debug!(channel = %id, "Page gone, pruning channel");
            self.channels.remove(&id);
        }

        delivered
    }
}

// ============================================================================
// Tests
// ============================================================================
