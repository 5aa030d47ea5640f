//! Page channels as seen from the relay.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::mpsc;

use crate::identifiers::ChannelId;
use crate::protocol::PageMessage;

// ============================================================================
// RegistrationToken
// ============================================================================

/// Distinguishes successive registrations of the same channel id.
///
/// A page that reconnects under the same tab id gets a new token, so the
/// old port going away cannot unregister the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationToken(u64);

impl RegistrationToken {
    /// Wraps a raw token value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Channel
// ============================================================================

/// One connected page, owned by the relay's registry.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Tab id of the page.
    id: ChannelId,
    /// Registration this channel belongs to.
    token: RegistrationToken,
    /// Messages towards the page.
    sender: mpsc::UnboundedSender<PageMessage>,
}

impl Channel {
    /// Creates a channel delivering into `sender`.
    #[inline]
    #[must_use]
    pub fn new(
        id: ChannelId,
        token: RegistrationToken,
        sender: mpsc::UnboundedSender<PageMessage>,
    ) -> Self {
        Self { id, token, sender }
    }

    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Returns the registration token.
    #[inline]
    #[must_use]
    pub fn token(&self) -> RegistrationToken {
        self.token
    }

    /// Returns `true` while the page side is still listening.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Hands a message to the page.
    ///
    /// Returns `false` if the page side is gone.
    #[inline]
    pub fn deliver(&self, message: PageMessage) -> bool {
        self.sender.send(message).is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
