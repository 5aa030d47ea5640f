//! Native link: the relay's handle on one native connection.
//!
//! A link owns an outbound queue drained by a pump task. The pump writes
//! queued envelopes to the host and forwards every inbound envelope to
//! the relay as a [`NativeEvent`], tagged with the link's [`LinkId`].
//!
//! # Event Loop
//!
//! ```text
//!   relay ──NativeLink::send──► outbound queue ──► pump ──frames──► host stdin
//!   relay ◄──NativeEvent──────────────────────── pump ◄──frames── host stdout
//! ```
//!
//! The pump ends when the host stream ends or fails (reported as a
//! disconnect carrying an error) or when the relay drops the link
//! (reported without an error).

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::identifiers::LinkId;
use crate::protocol::Message;

use super::NativeCodec;

// ============================================================================
// Constants
// ============================================================================

/// Reason reported when the host closes its stdout.
pub const HOST_EXITED: &str = "Native host has exited.";

// ============================================================================
// NativeEvent
// ============================================================================

/// Something that happened on a native link.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    /// The host sent an envelope.
    Message {
        /// Link the envelope arrived on.
        link: LinkId,
        /// The envelope.
        message: Message,
    },
    /// The link is gone.
    Disconnected {
        /// Link that closed.
        link: LinkId,
        /// Reason, when the close was not requested by the relay.
        error: Option<String>,
    },
}

/// Sender half the relay hands to connectors.
pub type NativeEventSender = mpsc::UnboundedSender<NativeEvent>;

// ============================================================================
// NativeLink
// ============================================================================

/// Relay-side handle on one native connection.
///
/// Dropping the handle closes the outbound queue, which stops the pump.
#[derive(Debug)]
pub struct NativeLink {
    /// Generation of this connection.
    id: LinkId,
    /// Outbound queue drained by the pump.
    outbound: mpsc::UnboundedSender<Message>,
}

impl NativeLink {
    /// Creates a link handle around an outbound queue.
    #[inline]
    #[must_use]
    pub fn new(id: LinkId, outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self { id, outbound }
    }

    /// Returns the link generation.
    #[inline]
    #[must_use]
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Returns `true` while the pump is still draining the queue.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queues an envelope for the host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the pump has stopped.
    pub fn send(&self, message: Message) -> Result<()> {
        self.outbound
            .send(message)
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Pump
// ============================================================================

/// Moves envelopes between the relay and a host byte stream until either
/// side goes away.
///
/// Returns the disconnect reason, or `None` if the relay closed the link.
pub async fn pump<R, W>(
    link: LinkId,
    reader: R,
    writer: W,
    max_frame_len: usize,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: NativeEventSender,
) -> Option<String>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames_in = FramedRead::new(reader, NativeCodec::new(max_frame_len));
    let mut frames_out = FramedWrite::new(writer, NativeCodec::outbound());

    loop {
        tokio::select! {
            frame = frames_in.next() => {
                match frame {
                    Some(Ok(message)) => {
                        trace!(%link, ?message, "<<");
                        if events.send(NativeEvent::Message { link, message }).is_err() {
                            debug!(%link, "Relay gone, stopping pump");
                            return None;
                        }
                    }

                    Some(Err(e)) => {
                        error!(%link, error = %e, "Native frame error");
                        return Some(e.to_string());
                    }

                    None => {
                        debug!(%link, "Native stream ended");
                        return Some(HOST_EXITED.to_string());
                    }
                }
            }

            message = outbound.recv() => {
                match message {
                    Some(message) => {
                        trace!(%link, ?message, ">>");
                        if let Err(e) = frames_out.send(message).await {
                            error!(%link, error = %e, "Native write failed");
                            return Some(e.to_string());
                        }
                    }

                    None => {
                        debug!(%link, "Link closed by relay");
                        return None;
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
