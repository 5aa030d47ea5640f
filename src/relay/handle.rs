//! Running a relay as a task and talking to it.
//!
//! [`Relay::spawn`] moves the relay into its own task. Pages reach it
//! through a cloneable [`RelayHandle`], which opens one [`ChannelPort`] per
//! page.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::ChannelId;
use crate::options::RelayOptions;
use crate::protocol::PageMessage;
use crate::transport::{NativeConnector, NativeEvent};

use super::channel::{Channel, RegistrationToken};
use super::core::Relay;

// ============================================================================
// RelayCommand
// ============================================================================

/// Internal commands for the relay task.
enum RelayCommand {
    /// A page opened its port.
    Register { channel: Channel },
    /// A page posted on the bus.
    Post {
        id: ChannelId,
        token: RegistrationToken,
        message: PageMessage,
    },
    /// A page closed its port.
    Unregister {
        id: ChannelId,
        token: RegistrationToken,
    },
    /// Stop the relay.
    Shutdown,
}

// ============================================================================
// Relay - Task
// ============================================================================

impl<C: NativeConnector> Relay<C> {
    /// Moves a new relay into a background task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(connector: C, options: RelayOptions) -> RelayHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let relay = Relay::new(connector, options, events_tx);
        tokio::spawn(relay.run(command_rx, events_rx));

        RelayHandle {
            command_tx,
            next_token: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Event loop owning the relay state.
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<RelayCommand>,
        mut events: mpsc::UnboundedReceiver<NativeEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(RelayCommand::Register { channel }) => {
                            self.register_channel(channel);
                        }

                        Some(RelayCommand::Post { id, token, message }) => {
                            if self.is_current(id, token) {
                                self.on_page_message(id, message);
                            } else {
                                debug!(channel = %id, %token, "Post from stale registration");
                            }
                        }

                        Some(RelayCommand::Unregister { id, token }) => {
                            self.remove_channel(id, token);
                        }

                        Some(RelayCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            break;
                        }

                        None => {
                            debug!("All relay handles dropped");
                            break;
                        }
                    }
                }

                // The relay holds a sender, so this never yields `None`.
                Some(event) = events.recv() => {
                    self.on_native_event(event);
                }
            }
        }

        self.close_native();
        debug!("Relay terminated");
    }
}

// ============================================================================
// RelayHandle
// ============================================================================

/// Cloneable handle on a running relay.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    /// Commands for the relay task.
    command_tx: mpsc::UnboundedSender<RelayCommand>,
    /// Source of registration tokens.
    next_token: Arc<AtomicU64>,
}

impl RelayHandle {
    /// Opens the port of the page living in tab `id`.
    ///
    /// A page that opens a second port under the same id replaces the first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExtensionUnavailable`] if the relay has stopped.
    pub fn open_channel(&self, id: ChannelId) -> Result<ChannelPort> {
        let token = RegistrationToken::new(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (tx, inbound) = mpsc::unbounded_channel();

        self.command_tx
            .send(RelayCommand::Register {
                channel: Channel::new(id, token, tx),
            })
            .map_err(|_| Error::ExtensionUnavailable)?;

        Ok(ChannelPort {
            sender: ChannelSender {
                id,
                token,
                command_tx: self.command_tx.clone(),
            },
            inbound,
        })
    }

    /// Returns `true` while the relay task is running.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Stops the relay task, closing the native link and every port.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(RelayCommand::Shutdown);
    }
}

// ============================================================================
// ChannelPort
// ============================================================================

/// A page's end of its channel.
///
/// Dropping the port (or its [`ChannelSender`] half) unregisters the page.
#[derive(Debug)]
pub struct ChannelPort {
    sender: ChannelSender,
    inbound: mpsc::UnboundedReceiver<PageMessage>,
}

impl ChannelPort {
    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.sender.id
    }

    /// Posts a message to the relay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExtensionUnavailable`] if the relay has stopped.
    pub fn post(&self, message: PageMessage) -> Result<()> {
        self.sender.post(message)
    }

    /// Waits for the next message from the relay.
    ///
    /// Returns `None` once the relay has dropped the channel.
    pub async fn recv(&mut self) -> Option<PageMessage> {
        self.inbound.recv().await
    }

    /// Splits the port into its sending and receiving halves.
    #[must_use]
    pub fn into_split(self) -> (ChannelSender, mpsc::UnboundedReceiver<PageMessage>) {
        (self.sender, self.inbound)
    }
}

/// Sending half of a [`ChannelPort`].
#[derive(Debug)]
pub struct ChannelSender {
    id: ChannelId,
    token: RegistrationToken,
    command_tx: mpsc::UnboundedSender<RelayCommand>,
}

impl ChannelSender {
    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Posts a message to the relay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExtensionUnavailable`] if the relay has stopped.
    pub fn post(&self, message: PageMessage) -> Result<()> {
        self.command_tx
            .send(RelayCommand::Post {
                id: self.id,
                token: self.token,
                message,
            })
            .map_err(|_| Error::ExtensionUnavailable)
    }
}

impl Drop for ChannelSender {
    fn drop(&mut self) {
        let _ = self.command_tx.send(RelayCommand::Unregister {
            id: self.id,
            token: self.token,
        });
    }
}

impl std::fmt::Debug for RelayCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register { channel } => write!(f, "Register({})", channel.id()),
            Self::Post { id, .. } => write!(f, "Post({id})"),
            Self::Unregister { id, token } => write!(f, "Unregister({id}, {token})"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
