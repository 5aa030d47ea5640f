//! Ways of establishing a native link.
//!
//! The relay only knows the [`NativeConnector`] trait. Two implementations
//! ship with the crate:
//!
//! | Connector | Host |
//! |-----------|------|
//! | [`ProcessConnector`] | a child process speaking native messaging on stdin/stdout |
//! | [`DuplexConnector`] | an in-memory stream handed to the caller as a [`NativeEndpoint`] |

// ============================================================================
// Imports
// ============================================================================

use std::process::Stdio;

use tokio::io::{DuplexStream, duplex, split};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::LinkId;
use crate::options::{DEFAULT_MAX_FRAME_LEN, NativeHostOptions};

use super::NativeCodec;
use super::link::{NativeEvent, NativeEventSender, NativeLink, pump};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size of in-memory links.
const DUPLEX_BUFFER: usize = 64 * 1024;

// ============================================================================
// NativeConnector
// ============================================================================

/// Establishes native links on demand.
///
/// Called by the relay at most once per outbound command while no link is
/// alive. Implementations report inbound envelopes and the eventual
/// disconnect through `events`, tagged with `link`.
pub trait NativeConnector: Send + 'static {
    /// Opens a new link.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable connection could be made. The relay
    /// treats this like an immediate disconnect with that error.
    fn connect(&mut self, link: LinkId, events: NativeEventSender) -> Result<NativeLink>;
}

// ============================================================================
// ProcessConnector
// ============================================================================

/// Launches the native host as a child process.
///
/// The child is killed when its link closes.
#[derive(Debug, Clone)]
pub struct ProcessConnector {
    options: NativeHostOptions,
}

impl ProcessConnector {
    /// Creates a connector after validating the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn new(options: NativeHostOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Returns the host options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &NativeHostOptions {
        &self.options
    }
}

impl NativeConnector for ProcessConnector {
    fn connect(&mut self, link: LinkId, events: NativeEventSender) -> Result<NativeLink> {
        let mut child = Command::new(&self.options.program)
            .args(self.options.to_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::native_unavailable(format!(
                    "Failed to start {}: {e}",
                    self.options.program.display()
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::native_unavailable("Native host stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::native_unavailable("Native host stdout not captured"))?;

        let pid = child.id().unwrap_or(0);
        info!(%link, pid, host = %self.options.host_name, "Native host started");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let max_frame_len = self.options.max_frame_len;

        tokio::spawn(async move {
            let error = pump(link, stdout, stdin, max_frame_len, outbound_rx, events.clone()).await;

            if let Err(e) = child.start_kill() {
                debug!(pid, error = %e, "Native host already gone");
            }
            if let Err(e) = child.wait().await {
                warn!(pid, error = %e, "Failed to reap native host");
            }
            info!(%link, pid, "Native host terminated");

            let _ = events.send(NativeEvent::Disconnected { link, error });
        });

        Ok(NativeLink::new(link, outbound_tx))
    }
}

// ============================================================================
// DuplexConnector
// ============================================================================

/// Host side of an in-memory link.
///
/// Read requests from and write replies/events to [`NativeEndpoint::framed`].
/// Dropping the endpoint looks to the relay like the host exiting.
#[derive(Debug)]
pub struct NativeEndpoint {
    /// Generation of the link this endpoint serves.
    pub link: LinkId,
    /// Framed host-side stream.
    pub framed: Framed<DuplexStream, NativeCodec>,
}

/// Connects the relay to in-memory hosts.
///
/// Each successful connect yields a fresh [`NativeEndpoint`] on the
/// receiver returned by [`DuplexConnector::new`]. Connecting fails once that
/// receiver is dropped.
#[derive(Debug, Clone)]
pub struct DuplexConnector {
    endpoints: mpsc::UnboundedSender<NativeEndpoint>,
}

impl DuplexConnector {
    /// Creates a connector and the receiver of its host endpoints.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NativeEndpoint>) {
        let (endpoints, rx) = mpsc::unbounded_channel();
        (Self { endpoints }, rx)
    }
}

impl NativeConnector for DuplexConnector {
    fn connect(&mut self, link: LinkId, events: NativeEventSender) -> Result<NativeLink> {
        let (relay_side, host_side) = duplex(DUPLEX_BUFFER);

        let endpoint = NativeEndpoint {
            link,
            framed: Framed::new(host_side, NativeCodec::default()),
        };
        self.endpoints
            .send(endpoint)
            .map_err(|_| Error::native_unavailable("Specified native messaging host not found."))?;

        let (reader, writer) = split(relay_side);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let error = pump(
                link,
                reader,
                writer,
                DEFAULT_MAX_FRAME_LEN,
                outbound_rx,
                events.clone(),
            )
            .await;
            let _ = events.send(NativeEvent::Disconnected { link, error });
        });

        debug!(%link, "In-memory native link opened");
        Ok(NativeLink::new(link, outbound_tx))
    }
}

// ============================================================================
// Tests
// ============================================================================
