//! The page-side API.
//!
//! A [`PageClient`] lives in one page. It turns typed calls into request
//! envelopes, tracks each outstanding call by a fresh request id, and
//! settles it when the matching reply comes back through the relay.
//!
//! # Call Lifecycle
//!
//! ```text
//! call() ──► pending[id] = sink ──► post request ──► ... ──► on_response(id)
//!                                                               │
//!                                            remove pending[id] ◄┘
//!                                            resolve / reject sink
//! ```
//!
//! Replies are settled by command code:
//!
//! | Code | Reply | Rejects when |
//! |------|-------|--------------|
//! | 1 | reader list | `d` missing or not a list |
//! | 2, 4 | `d` string | `d` missing or empty |
//! | 3 | empty | |
//! | 10 | whole envelope | |
//! | other | empty | |
//!
//! Any reply flagged `incomplete` rejects.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, RequestId};
use crate::options::ClientOptions;
use crate::protocol::{Command, CommandCode, Message, PageMessage, ReaderEvent};
use crate::relay::{ChannelSender, RelayHandle};

use super::events::EventHandlers;
use super::reader::Reader;
use super::reply::{Reply, Version};

// ============================================================================
// Types
// ============================================================================

/// Sink settling one call.
type ReplySender = oneshot::Sender<Result<Reply>>;

/// One outstanding call.
struct PendingCall {
    /// Command the call was made with.
    command: CommandCode,
    /// Settles the caller's future.
    tx: ReplySender,
}

/// Map of request ids to outstanding calls.
type PendingMap = FxHashMap<RequestId, PendingCall>;

/// Forgets a pending call when the caller stops waiting for it.
///
/// Request ids are never reused, so removing an entry a reply already
/// settled is a no-op.
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingMap>,
    request_id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.pending.lock().remove(&self.request_id).is_some() {
            trace!(request_id = %self.request_id, "Abandoned call forgotten");
        }
    }
}

// ============================================================================
// PageClient
// ============================================================================

/// Page-side client of the relay.
///
/// Cheap to clone; clones share the pending calls and the channel.
///
/// # Example
///
/// ```no_run
/// use webcard_relay::{ChannelId, DuplexConnector, PageClient, Relay, RelayOptions, ShareMode};
///
/// # async fn example() -> webcard_relay::Result<()> {
/// let (connector, _hosts) = DuplexConnector::new();
/// let relay = Relay::spawn(connector, RelayOptions::new());
/// let client = PageClient::new(ChannelId::new(1), relay);
///
/// for reader in client.readers().await? {
///     if reader.has_card() {
///         let atr = reader.connect(ShareMode::Shared).await?;
///         println!("{}: {atr}", reader.name);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PageClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Tab the page lives in.
    channel: ChannelId,
    /// Relay to talk to; `None` when the extension is absent.
    relay: Option<RelayHandle>,
    /// Client options.
    options: ClientOptions,
    /// Outstanding calls.
    pending: Mutex<PendingMap>,
    /// Sending half of the channel, opened on first call.
    port: Mutex<Option<ChannelSender>>,
    /// Event callbacks.
    handlers: RwLock<EventHandlers>,
}

// ============================================================================
// PageClient - Constructors
// ============================================================================

impl PageClient {
    /// Creates a client for the page in tab `channel`.
    #[must_use]
    pub fn new(channel: ChannelId, relay: RelayHandle) -> Self {
        Self::build(channel, Some(relay), ClientOptions::new())
    }

    /// Creates a client with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn with_options(
        channel: ChannelId,
        relay: RelayHandle,
        options: ClientOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(channel, Some(relay), options))
    }

    /// Creates a client for a page without the extension.
    ///
    /// Every call fails with [`Error::ExtensionUnavailable`].
    #[must_use]
    pub fn detached(channel: ChannelId) -> Self {
        Self::build(channel, None, ClientOptions::new())
    }

    fn build(channel: ChannelId, relay: Option<RelayHandle>, options: ClientOptions) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                channel,
                relay,
                options,
                pending: Mutex::new(PendingMap::default()),
                port: Mutex::new(None),
                handlers: RwLock::new(EventHandlers::default()),
            }),
        }
    }
}

// ============================================================================
// PageClient - Accessors
// ============================================================================

impl PageClient {
    /// Returns the page's channel id.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> ChannelId {
        self.inner.channel
    }

    /// Returns `true` if calls can reach the relay.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner
            .relay
            .as_ref()
            .is_some_and(RelayHandle::is_alive)
    }

    /// Returns the number of outstanding calls.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

// ============================================================================
// PageClient - Event Handlers
// ============================================================================

impl PageClient {
    /// Sets the card inserted callback, called with reader index and ATR.
    pub fn on_card_inserted<F>(&self, handler: F)
    where
        F: Fn(usize, &str) + Send + Sync + 'static,
    {
        self.inner.handlers.write().card_inserted = Some(Arc::new(handler));
    }

    /// Sets the card removed callback, called with the reader index.
    pub fn on_card_removed<F>(&self, handler: F)
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.inner.handlers.write().card_removed = Some(Arc::new(handler));
    }

    /// Sets the readers changed callback.
    pub fn on_readers_changed<F>(&self, handler: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.handlers.write().readers_changed = Some(Arc::new(handler));
    }

    /// Sets the alert callback.
    pub fn on_alert<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.handlers.write().alert = Some(Arc::new(handler));
    }

    /// Removes every callback.
    pub fn clear_handlers(&self) {
        *self.inner.handlers.write() = EventHandlers::default();
    }

    fn handlers(&self) -> EventHandlers {
        self.inner.handlers.read().clone()
    }
}

// ============================================================================
// PageClient - Calls
// ============================================================================

impl PageClient {
    /// Sends a command and waits for its reply.
    ///
    /// Waits for as long as it takes; a host that never answers leaves the
    /// call pending. Use [`PageClient::call_with_timeout`] to bound it.
    ///
    /// # Errors
    ///
    /// - [`Error::ExtensionUnavailable`] if the relay is absent or stopped
    /// - [`Error::TooManyPending`] if too many calls are outstanding
    /// - [`Error::CommandFailed`] if the host rejected the command
    pub async fn call(&self, command: Command) -> Result<Reply> {
        let (_guard, rx) = self.dispatch(&command)?;
        rx.await?
    }

    /// Sends a command and waits at most `limit` for its reply.
    ///
    /// On expiry the call is forgotten; a late reply is dropped.
    ///
    /// # Errors
    ///
    /// As [`PageClient::call`], plus [`Error::RequestTimeout`].
    pub async fn call_with_timeout(&self, command: Command, limit: Duration) -> Result<Reply> {
        let (guard, rx) = self.dispatch(&command)?;

        match timeout(limit, rx).await {
            Ok(result) => result?,
            Err(_) => {
                let request_id = guard.request_id.clone();
                drop(guard);
                debug!(%request_id, "Call timed out");
                Err(Error::request_timeout(
                    request_id,
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }

    /// Lists the readers.
    ///
    /// # Errors
    ///
    /// See [`PageClient::call`].
    pub async fn readers(&self) -> Result<Vec<Reader>> {
        self.call(Command::ListReaders).await?.into_readers()
    }

    /// Fetches the native host and extension versions.
    ///
    /// # Errors
    ///
    /// See [`PageClient::call`].
    pub async fn version(&self) -> Result<Version> {
        let message = self.call(Command::GetVersion).await?.into_message()?;
        Ok(Version::from(&message))
    }

    /// Round-trips a no-op command.
    ///
    /// # Errors
    ///
    /// See [`PageClient::call`].
    pub async fn ping(&self) -> Result<()> {
        self.call(Command::Ping).await?;
        Ok(())
    }

    /// Records a pending call and posts its request.
    ///
    /// The pending entry lives as long as the returned guard.
    fn dispatch(
        &self,
        command: &Command,
    ) -> Result<(PendingGuard<'_>, oneshot::Receiver<Result<Reply>>)> {
        let relay = self
            .inner
            .relay
            .as_ref()
            .filter(|relay| relay.is_alive())
            .ok_or(Error::ExtensionUnavailable)?;

        let request_id = RequestId::generate();
        let message = PageMessage::Request(Message::request(&request_id, command)?);
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.inner.pending.lock();
            let max = self.inner.options.max_pending;
            if pending.len() >= max {
                warn!(pending = pending.len(), max, "Too many pending calls");
                return Err(Error::too_many_pending(pending.len(), max));
            }
            pending.insert(
                request_id.clone(),
                PendingCall {
                    command: command.code(),
                    tx,
                },
            );
        }

        let guard = PendingGuard {
            pending: &self.inner.pending,
            request_id,
        };
        self.post(relay, message)?;

        trace!(
            channel = %self.inner.channel,
            request_id = %guard.request_id,
            command = %command.code(),
            "Call sent"
        );
        Ok((guard, rx))
    }

    /// Posts on the channel, opening it first if needed.
    fn post(&self, relay: &RelayHandle, message: PageMessage) -> Result<()> {
        let mut port = self.inner.port.lock();

        let sender = match port.take() {
            Some(sender) => sender,
            None => {
                let (sender, inbound) = relay.open_channel(self.inner.channel)?.into_split();
                tokio::spawn(receive_loop(Arc::downgrade(&self.inner), inbound));
                debug!(channel = %self.inner.channel, "Channel opened");
                sender
            }
        };

        let result = sender.post(message);
        *port = Some(sender);
        result
    }
}

// ============================================================================
// PageClient - Responses
// ============================================================================

impl PageClient {
    /// Handles one envelope the relay delivered to this page.
    pub fn on_page_message(&self, message: PageMessage) {
        match message {
            PageMessage::Response(message) => self.on_response(message),
            PageMessage::Alert { info } => {
                warn!(channel = %self.inner.channel, %info, "Relay alert");
                self.handlers().alert(&info);
            }
            PageMessage::Request(_) => {
                trace!("Ignoring request echoed to page");
            }
        }
    }

    /// Settles the pending call a reply belongs to, or dispatches an event.
    pub fn on_response(&self, message: Message) {
        if let Some(code) = message.event_code() {
            match ReaderEvent::parse(&message) {
                Some(event) => {
                    debug!(?event, "Reader event");
                    self.handlers().dispatch(&event);
                }
                None => debug!(code, "Unknown event code"),
            }
            return;
        }

        let Some(id) = message.correlation_id() else {
            trace!("Reply without id dropped");
            return;
        };

        let Some(call) = self.inner.pending.lock().remove(&RequestId::from(id)) else {
            debug!(request_id = id, "Reply for unknown request");
            return;
        };

        let result = self.settle(call.command, message);
        if call.tx.send(result).is_err() {
            trace!("Caller gone before reply");
        }
    }

    fn settle(&self, command: CommandCode, message: Message) -> Result<Reply> {
        if message.incomplete {
            return Err(Error::command_failed(command));
        }

        match command {
            CommandCode::ListReaders => {
                let descriptors = message
                    .readers()
                    .ok_or_else(|| Error::command_failed(command))?;
                Ok(Reply::Readers(
                    descriptors
                        .into_iter()
                        .enumerate()
                        .map(|(index, d)| Reader::new(index, d.name, d.atr, self.clone()))
                        .collect(),
                ))
            }
            CommandCode::Connect | CommandCode::Transceive => message
                .data_str()
                .map(|data| Reply::Data(data.to_string()))
                .ok_or_else(|| Error::command_failed(command)),
            CommandCode::GetVersion => Ok(Reply::Message(message)),
            _ => Ok(Reply::Empty),
        }
    }
}

/// Feeds relay deliveries to the client until either side goes away.
async fn receive_loop(client: Weak<ClientInner>, mut inbound: mpsc::UnboundedReceiver<PageMessage>) {
    while let Some(message) = inbound.recv().await {
        let Some(inner) = client.upgrade() else {
            break;
        };
        PageClient { inner }.on_page_message(message);
    }
    trace!("Page receive loop ended");
}

impl fmt::Debug for PageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageClient")
            .field("channel", &self.inner.channel)
            .field("ready", &self.is_ready())
            .field("pending", &self.pending_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;

    use super::*;
    use crate::options::RelayOptions;
    use crate::relay::Relay;
    use crate::transport::{DuplexConnector, NativeEndpoint};

    const WAIT: Duration = Duration::from_secs(2);

    fn envelope(value: serde_json::Value) -> Message {
        serde_json::from_value(value).expect("valid envelope")
    }

    /// Registers a pending call by hand.
    fn pending(client: &PageClient, id: &str, command: CommandCode) -> oneshot::Receiver<Result<Reply>> {
        let (tx, rx) = oneshot::channel();
        client
            .inner
            .pending
            .lock()
            .insert(RequestId::from(id), PendingCall { command, tx });
        rx
    }

    fn settled(mut rx: oneshot::Receiver<Result<Reply>>) -> Result<Reply> {
        rx.try_recv().expect("settled")
    }

    async fn next_request(host: &mut NativeEndpoint) -> Message {
        timeout(WAIT, host.framed.next())
            .await
            .expect("request in time")
            .expect("frame")
            .expect("decode")
    }

    #[tokio::test]
    async fn test_detached_rejects_immediately() {
        let client = PageClient::detached(ChannelId::new(1));
        assert!(!client.is_ready());
        assert!(matches!(client.ping().await, Err(Error::ExtensionUnavailable)));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let (connector, _hosts) = DuplexConnector::new();
        let relay = Relay::spawn(connector, RelayOptions::new());

        let result = PageClient::with_options(
            ChannelId::new(1),
            relay,
            ClientOptions::new().with_max_pending(0),
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_list_readers_builds_handles() {
        let client = PageClient::detached(ChannelId::new(1));
        let rx = pending(&client, "a", CommandCode::ListReaders);

        client.on_response(envelope(json!({
            "i": "a",
            "d": [{"n": "ACS", "a": ""}, {"n": "Gemalto", "a": "3B8F"}]
        })));

        let readers = settled(rx).expect("ok").into_readers().expect("readers");
        assert_eq!(readers.len(), 2);
        assert_eq!(readers[1].index, 1);
        assert_eq!(readers[1].name, "Gemalto");
        assert!(!readers[0].has_card());
        assert!(readers[1].has_card());
        assert_eq!(client.pending_count(), 0);
    }

    #[test]
    fn test_empty_reader_list_resolves() {
        let client = PageClient::detached(ChannelId::new(1));
        let rx = pending(&client, "a", CommandCode::ListReaders);

        client.on_response(envelope(json!({"i": "a", "d": []})));

        assert!(settled(rx).expect("ok").into_readers().expect("readers").is_empty());
    }

    #[test]
    fn test_list_readers_without_data_rejects() {
        let client = PageClient::detached(ChannelId::new(1));
        let rx = pending(&client, "a", CommandCode::ListReaders);

        client.on_response(envelope(json!({"i": "a"})));

        assert!(matches!(
            settled(rx),
            Err(Error::CommandFailed {
                command: CommandCode::ListReaders
            })
        ));
    }

    #[test]
    fn test_incomplete_rejects() {
        let client = PageClient::detached(ChannelId::new(1));
        let rx = pending(&client, "q", CommandCode::Transceive);

        client.on_response(envelope(json!({"i": "q", "incomplete": true, "d": "9000"})));

        assert!(matches!(
            settled(rx),
            Err(Error::CommandFailed {
                command: CommandCode::Transceive
            })
        ));
        assert_eq!(client.pending_count(), 0);
    }

    #[test]
    fn test_connect_and_transceive_need_data() {
        let client = PageClient::detached(ChannelId::new(1));
        let ok = pending(&client, "c", CommandCode::Connect);
        let empty = pending(&client, "t", CommandCode::Transceive);

        client.on_response(envelope(json!({"i": "c", "d": "3B8F8001"})));
        client.on_response(envelope(json!({"i": "t", "d": ""})));

        assert_eq!(settled(ok).expect("ok").into_data().expect("data"), "3B8F8001");
        assert!(settled(empty).is_err());
    }

    #[test]
    fn test_other_codes_resolve() {
        let client = PageClient::detached(ChannelId::new(1));
        let disconnect = pending(&client, "d", CommandCode::Disconnect);
        let version = pending(&client, "v", CommandCode::GetVersion);
        let custom = pending(&client, "x", CommandCode::Other(42));

        client.on_response(envelope(json!({"i": "d"})));
        client.on_response(envelope(json!({"i": "v", "verNat": "0.3.1", "verExt": "0.3.1"})));
        client.on_response(envelope(json!({"i": "x", "d": "ignored"})));

        assert!(matches!(settled(disconnect), Ok(Reply::Empty)));
        let message = settled(version).expect("ok").into_message().expect("message");
        assert_eq!(message.native_version.as_deref(), Some("0.3.1"));
        assert!(matches!(settled(custom), Ok(Reply::Empty)));
    }

    #[test]
    fn test_unmatched_replies_dropped() {
        let client = PageClient::detached(ChannelId::new(1));
        let mut rx = pending(&client, "mine", CommandCode::Ping);

        client.on_response(envelope(json!({"i": "other"})));
        client.on_response(envelope(json!({"d": "no id"})));
        client.on_response(envelope(json!({"i": ""})));

        assert!(rx.try_recv().is_err());
        assert_eq!(client.pending_count(), 1);

        client.on_response(envelope(json!({"i": "mine"})));
        client.on_response(envelope(json!({"i": "mine"})));
        assert!(matches!(settled(rx), Ok(Reply::Empty)));
    }

    #[test]
    fn test_events_never_settle_calls() {
        let client = PageClient::detached(ChannelId::new(1));
        let inserted = Arc::new(Mutex::new(Vec::new()));
        let removed = Arc::new(AtomicUsize::new(0));
        {
            let inserted = Arc::clone(&inserted);
            client.on_card_inserted(move |reader, atr| inserted.lock().push((reader, atr.to_string())));
            let removed = Arc::clone(&removed);
            client.on_card_removed(move |_| {
                removed.fetch_add(1, Ordering::SeqCst);
            });
        }
        let mut rx = pending(&client, "a", CommandCode::Ping);

        client.on_response(envelope(json!({"e": 1, "r": 0, "d": "3B8A", "i": "a"})));
        client.on_response(envelope(json!({"e": 2, "r": 1})));
        client.on_response(envelope(json!({"e": 99})));

        assert_eq!(*inserted.lock(), vec![(0, "3B8A".to_string())]);
        assert_eq!(removed.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(client.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_too_many_pending() {
        let (connector, _hosts) = DuplexConnector::new();
        let relay = Relay::spawn(connector, RelayOptions::new());
        let client = PageClient::with_options(
            ChannelId::new(1),
            relay,
            ClientOptions::new().with_max_pending(1),
        )
        .expect("valid options");
        let _held = pending(&client, "held", CommandCode::Ping);

        assert!(matches!(
            client.ping().await,
            Err(Error::TooManyPending { pending: 1, max: 1 })
        ));
    }

    #[tokio::test]
    async fn test_timeout_forgets_call() {
        let (connector, mut hosts) = DuplexConnector::new();
        let relay = Relay::spawn(connector, RelayOptions::new());
        let client = PageClient::new(ChannelId::new(2), relay);

        let (plugged_tx, mut plugged_rx) = mpsc::unbounded_channel();
        client.on_readers_changed(move |increased| {
            let _ = plugged_tx.send(increased);
        });

        let result = client
            .call_with_timeout(Command::Ping, Duration::from_millis(50))
            .await;
        assert!(result.expect_err("timeout").is_timeout());
        assert_eq!(client.pending_count(), 0);

        let mut host = timeout(WAIT, hosts.recv()).await.expect("connect").expect("host");
        let stale = next_request(&mut host).await;

        let live = tokio::spawn({
            let client = client.clone();
            async move { client.call_with_timeout(Command::Ping, WAIT).await }
        });
        let fresh = next_request(&mut host).await;
        assert_ne!(stale.id, fresh.id);

        // The stale reply, then an event; the event arriving proves the
        // stale reply went through the client first.
        host.framed.send(stale).await.expect("late reply");
        host.framed
            .send(Message {
                event: Some(3),
                ..Message::default()
            })
            .await
            .expect("event");
        assert_eq!(timeout(WAIT, plugged_rx.recv()).await.expect("event"), Some(true));

        assert_eq!(client.pending_count(), 1);
        assert!(!live.is_finished());

        host.framed.send(fresh).await.expect("reply");
        timeout(WAIT, live)
            .await
            .expect("settled")
            .expect("join")
            .expect("reply");
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_calls_release_slots() {
        let (connector, _hosts) = DuplexConnector::new();
        let relay = Relay::spawn(connector, RelayOptions::new());
        let client = PageClient::with_options(
            ChannelId::new(4),
            relay,
            ClientOptions::new().with_max_pending(2),
        )
        .expect("valid options");

        for _ in 0..2 {
            let abandoned = timeout(Duration::from_millis(10), client.call(Command::Ping)).await;
            assert!(abandoned.is_err());
        }
        assert_eq!(client.pending_count(), 0);

        let result = client
            .call_with_timeout(Command::Ping, Duration::from_millis(10))
            .await;
        assert!(result.expect_err("no reply").is_timeout());
    }

    #[tokio::test]
    async fn test_invalid_request_leaves_no_pending() {
        let (connector, _hosts) = DuplexConnector::new();
        let relay = Relay::spawn(connector, RelayOptions::new());
        let client = PageClient::new(ChannelId::new(5), relay);

        let mut params = serde_json::Map::new();
        params.insert("a".into(), json!(42));
        let result = client.call(Command::Raw { code: 9, params }).await;

        assert!(matches!(result, Err(Error::Protocol { .. })));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_readers_through_relay() {
        let (connector, mut hosts) = DuplexConnector::new();
        let relay = Relay::spawn(connector, RelayOptions::new());
        let client = PageClient::new(ChannelId::new(7), relay);

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.readers().await }
        });

        let mut host = timeout(WAIT, hosts.recv()).await.expect("connect").expect("host");
        let request = next_request(&mut host).await;
        assert_eq!(request.command, Some(1));
        assert!(request.id.as_deref().is_some_and(|id| id.starts_with("7.")));

        host.framed
            .send(envelope(json!({
                "i": request.id,
                "d": [{"n": "ACS ACR122", "a": "3B8F8001"}]
            })))
            .await
            .expect("reply");

        let readers = timeout(WAIT, call)
            .await
            .expect("settled")
            .expect("join")
            .expect("readers");
        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].atr, "3B8F8001");
    }

    #[tokio::test]
    async fn test_alert_reaches_handler() {
        let (connector, mut hosts) = DuplexConnector::new();
        let relay = Relay::spawn(connector, RelayOptions::new());
        let client = PageClient::new(ChannelId::new(3), relay);

        let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();
        client.on_alert(move |info| {
            let _ = alert_tx.send(info.to_string());
        });

        let result = client
            .call_with_timeout(Command::Ping, Duration::from_millis(10))
            .await;
        assert!(result.is_err());

        let host = timeout(WAIT, hosts.recv()).await.expect("connect").expect("host");
        drop(host);

        assert_eq!(
            timeout(WAIT, alert_rx.recv()).await.expect("alert"),
            Some("NativeApp disconnected: Native host has exited.".to_string())
        );
    }
}
