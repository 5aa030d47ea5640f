//! The relay state machine.
//!
//! [`Relay`] owns the channel registry and the single native link. Every
//! state change happens in one of its `on_*` handlers, which are only ever
//! called from one task (see [`Relay::spawn`]), so none of the state needs
//! locking.
//!
//! # Routing
//!
//! | Direction | Request id | Action |
//! |-----------|------------|--------|
//! | page → native | `R` on channel `C` | rewrite to `C.R`, forward |
//! | native → page | `C.R` | restore `R`, deliver to `C` only |
//! | native → page | `C.R`, `C` unknown | drop |
//! | native → page | missing or empty | broadcast to every channel |

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::identifiers::{ChannelId, CompoundId, LinkId, RequestId};
use crate::options::RelayOptions;
use crate::protocol::{Message, PageMessage};
use crate::transport::{NativeConnector, NativeEvent, NativeEventSender, NativeLink};

use super::channel::{Channel, RegistrationToken};
use super::registry::ChannelRegistry;

// ============================================================================
// Relay
// ============================================================================

/// Multiplexes many page channels over one native link.
pub struct Relay<C> {
    /// Establishes native links.
    connector: C,
    /// Behavior options.
    options: RelayOptions,
    /// Open page channels.
    channels: ChannelRegistry,
    /// The live native link, if any.
    native: Option<NativeLink>,
    /// Channel that triggered the live link's establishment.
    initiator: Option<ChannelId>,
    /// Generation handed to the most recent connect attempt.
    last_link: LinkId,
    /// Where connectors report native events.
    events: NativeEventSender,
}

// ============================================================================
// Relay - Constructor
// ============================================================================

impl<C: NativeConnector> Relay<C> {
    /// Creates a relay with no channels and no native link.
    ///
    /// Native events produced by links this relay opens are sent to
    /// `events`; feed them back through [`Relay::on_native_event`].
    #[must_use]
    pub fn new(connector: C, options: RelayOptions, events: NativeEventSender) -> Self {
        Self {
            connector,
            options,
            channels: ChannelRegistry::new(),
            native: None,
            initiator: None,
            last_link: LinkId::initial(),
            events,
        }
    }
}

// ============================================================================
// Relay - Accessors
// ============================================================================

impl<C> Relay<C> {
    /// Returns the number of registered channels.
    #[inline]
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if `token` is the live registration of `id`.
    #[inline]
    #[must_use]
    pub fn is_current(&self, id: ChannelId, token: RegistrationToken) -> bool {
        self.channels.is_current(id, token)
    }

    /// Returns the live link generation, if connected.
    #[inline]
    #[must_use]
    pub fn native_link(&self) -> Option<LinkId> {
        self.native.as_ref().map(NativeLink::id)
    }

    /// Returns the channel that triggered the current link.
    #[inline]
    #[must_use]
    pub fn initiator(&self) -> Option<ChannelId> {
        self.initiator
    }

    /// Returns the connector.
    #[inline]
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }
}

// ============================================================================
// Relay - Page Side
// ============================================================================

impl<C: NativeConnector> Relay<C> {
    /// Registers a page channel and makes sure the native host is up.
    pub fn register_channel(&mut self, channel: Channel) {
        let id = channel.id();
        debug!(channel = %id, token = %channel.token(), "Channel registered");
        self.channels.insert(channel);
        self.ensure_native(id);
    }

    /// Unregisters a page channel if `token` is still its registration.
    pub fn remove_channel(&mut self, id: ChannelId, token: RegistrationToken) -> bool {
        let removed = self.channels.remove(id, token);
        if removed {
            debug!(channel = %id, "Channel removed");
        }
        removed
    }

    /// Handles a message a page posted on the bus.
    ///
    /// Only `request` messages are forwarded; anything else a page posts is
    /// ignored.
    pub fn on_page_message(&mut self, id: ChannelId, message: PageMessage) {
        match message {
            PageMessage::Request(message) => self.on_channel_message(id, message),
            other => debug!(channel = %id, kind = other.kind(), "Ignoring non-request page message"),
        }
    }

    /// Namespaces a page request and forwards it to the native host.
    ///
    /// Connects first if no link exists; the request is dropped if that
    /// single attempt does not produce a link.
    pub fn on_channel_message(&mut self, id: ChannelId, mut message: Message) {
        let request = RequestId::from(message.id.take().unwrap_or_default());
        message.id = Some(CompoundId::new(id, request).to_string());

        trace!(channel = %id, ?message, ">>");

        if !self.ensure_native(id) {
            debug!(channel = %id, "No native link, request dropped");
            return;
        }

        if let Some(native) = &self.native
            && let Err(e) = native.send(message)
        {
            warn!(channel = %id, link = %native.id(), error = %e, "Failed to queue request");
        }
    }

    /// Connects to the native host unless a link already exists.
    ///
    /// Returns `true` if a link exists afterwards.
    fn ensure_native(&mut self, initiator: ChannelId) -> bool {
        if self.native.is_some() {
            return true;
        }

        let link = self.last_link.next();
        self.last_link = link;
        self.initiator = Some(initiator);

        match self.connector.connect(link, self.events.clone()) {
            Ok(native) => {
                info!(%link, channel = %initiator, "Native link established");
                self.native = Some(native);
                true
            }
            Err(e) => {
                warn!(%link, channel = %initiator, error = %e, "Native connect failed");
                let reason = match e {
                    Error::NativeUnavailable { message } => message,
                    other => other.to_string(),
                };
                self.on_native_disconnect(Some(reason));
                false
            }
        }
    }
}

// ============================================================================
// Relay - Native Side
// ============================================================================

impl<C> Relay<C> {
    /// Handles an event reported by a link.
    ///
    /// Events from links other than the live one are ignored.
    pub fn on_native_event(&mut self, event: NativeEvent) {
        let current = self.native_link();

        match event {
            NativeEvent::Message { link, message } if current == Some(link) => {
                self.on_native_message(message);
            }
            NativeEvent::Disconnected { link, error } if current == Some(link) => {
                self.on_native_disconnect(error);
            }
            NativeEvent::Message { link, .. } | NativeEvent::Disconnected { link, .. } => {
                debug!(%link, "Ignoring event from stale link");
            }
        }
    }

    /// Routes one envelope from the native host.
    pub fn on_native_message(&mut self, mut message: Message) {
        trace!(?message, "<<");

        let target = message.correlation_id().map(str::parse::<CompoundId>);

        let compound = match target {
            None => {
                self.stamp_version(&mut message);
                let delivered = self.channels.broadcast(&PageMessage::Response(message));
                trace!(delivered, "Broadcast native event");
                return;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Dropping native message with malformed id");
                return;
            }
            Some(Ok(compound)) => compound,
        };

        let (channel, request) = compound.into_parts();
        if !self.channels.contains(channel) {
            debug!(%channel, %request, "No such channel, reply dropped");
            return;
        }

        message.id = Some(request.to_string());
        self.stamp_version(&mut message);
        self.channels
            .deliver(channel, PageMessage::Response(message));
    }

    /// Forgets the native link and alerts its initiator if it failed.
    ///
    /// Pending calls are left alone.
    pub fn on_native_disconnect(&mut self, error: Option<String>) {
        let link = self.native.take().map(|native| native.id());
        let initiator = self.initiator.take();

        info!(?link, error = ?error, "Native link closed");

        let (Some(reason), Some(initiator)) = (error, initiator) else {
            return;
        };

        let info = self.options.alert_text(&reason);
        warn!(channel = %initiator, %info, "Alerting initiator");
        self.channels.deliver(initiator, PageMessage::alert(info));
    }

    /// Adds the extension version next to the native one.
    fn stamp_version(&self, message: &mut Message) {
        if message.native_version.is_some() {
            message.extension_version = Some(self.options.extension_version.clone());
        }
    }

    /// Drops the native link without alerting anyone.
    pub fn close_native(&mut self) {
        if let Some(native) = self.native.take() {
            debug!(link = %native.id(), "Closing native link");
        }
        self.initiator = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::Result;

    /// Records connect attempts; outbound messages land in `sent`.
    struct MockConnector {
        attempts: usize,
        fail: bool,
        sent: Vec<mpsc::UnboundedReceiver<Message>>,
    }

    impl MockConnector {
        fn new() -> Self {
            Self {
                attempts: 0,
                fail: false,
                sent: Vec::new(),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn drain(&mut self) -> Vec<Message> {
            let mut out = Vec::new();
            for rx in &mut self.sent {
                while let Ok(message) = rx.try_recv() {
                    out.push(message);
                }
            }
            out
        }
    }

    impl NativeConnector for MockConnector {
        fn connect(&mut self, link: LinkId, _events: NativeEventSender) -> Result<NativeLink> {
            self.attempts += 1;
            if self.fail {
                return Err(Error::native_unavailable("Specified native messaging host not found."));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            self.sent.push(rx);
            Ok(NativeLink::new(link, tx))
        }
    }

    fn relay(connector: MockConnector) -> Relay<MockConnector> {
        let (events, _rx) = mpsc::unbounded_channel();
        Relay::new(connector, RelayOptions::new().with_extension_version("0.3.1"), events)
    }

    fn page(relay: &mut Relay<MockConnector>, id: u32) -> mpsc::UnboundedReceiver<PageMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        relay.register_channel(Channel::new(
            ChannelId::new(id),
            RegistrationToken::new(u64::from(id)),
            tx,
        ));
        rx
    }

    fn inbox(rx: &mut mpsc::UnboundedReceiver<PageMessage>) -> Vec<PageMessage> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    fn native(value: serde_json::Value) -> Message {
        serde_json::from_value(value).expect("valid envelope")
    }

    #[test]
    fn test_register_connects_once() {
        let mut relay = relay(MockConnector::new());
        let _a = page(&mut relay, 1);
        let _b = page(&mut relay, 2);

        assert_eq!(relay.connector().attempts, 1);
        assert_eq!(relay.initiator(), Some(ChannelId::new(1)));
        assert!(relay.native_link().is_some());
    }

    #[test]
    fn test_request_gets_compound_id() {
        let mut relay = relay(MockConnector::new());
        let _page = page(&mut relay, 7);

        relay.on_channel_message(ChannelId::new(7), native(json!({"i": "abc", "c": 1})));

        let sent = relay.connector.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id.as_deref(), Some("7.abc"));
        assert_eq!(sent[0].command, Some(1));
    }

    #[test]
    fn test_reply_routed_to_origin_only() {
        let mut relay = relay(MockConnector::new());
        let mut seven = page(&mut relay, 7);
        let mut eight = page(&mut relay, 8);

        relay.on_native_message(native(json!({
            "i": "7.abc",
            "d": [{"n": "ACS", "a": "3B8F8001"}]
        })));

        let got = inbox(&mut seven);
        assert_eq!(got.len(), 1);
        match &got[0] {
            PageMessage::Response(message) => {
                assert_eq!(message.id.as_deref(), Some("abc"));
                assert_eq!(message.readers().expect("readers")[0].name, "ACS");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(inbox(&mut eight).is_empty());
    }

    #[test]
    fn test_reply_to_unknown_channel_dropped() {
        let mut relay = relay(MockConnector::new());
        let mut seven = page(&mut relay, 7);

        relay.on_native_message(native(json!({"i": "9.abc"})));
        relay.on_native_message(native(json!({"i": "garbage"})));

        assert!(inbox(&mut seven).is_empty());
        assert_eq!(relay.channel_count(), 1);
    }

    #[test]
    fn test_event_broadcast() {
        let mut relay = relay(MockConnector::new());
        let mut a = page(&mut relay, 1);
        let mut b = page(&mut relay, 2);

        relay.on_native_message(native(json!({"e": 1, "r": 0, "d": "3B8A"})));

        for rx in [&mut a, &mut b] {
            let got = inbox(rx);
            assert_eq!(got.len(), 1);
            assert!(matches!(&got[0], PageMessage::Response(m) if m.event == Some(1)));
        }
    }

    #[test]
    fn test_empty_id_is_broadcast() {
        let mut relay = relay(MockConnector::new());
        let mut a = page(&mut relay, 1);
        let mut b = page(&mut relay, 2);

        relay.on_native_message(native(json!({"i": "", "d": "x"})));

        assert_eq!(inbox(&mut a).len(), 1);
        assert_eq!(inbox(&mut b).len(), 1);
    }

    #[test]
    fn test_version_reply_stamped() {
        let mut relay = relay(MockConnector::new());
        let mut page = page(&mut relay, 4);

        relay.on_native_message(native(json!({"i": "4.v", "verNat": "0.3.1"})));

        match inbox(&mut page).pop() {
            Some(PageMessage::Response(message)) => {
                assert_eq!(message.native_version.as_deref(), Some("0.3.1"));
                assert_eq!(message.extension_version.as_deref(), Some("0.3.1"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_disconnect_with_error_alerts_initiator_only() {
        let mut relay = relay(MockConnector::new());
        let mut first = page(&mut relay, 5);
        let mut second = page(&mut relay, 6);

        relay.on_native_disconnect(None);
        relay.on_channel_message(ChannelId::new(3), Message::default());
        let mut third = page(&mut relay, 3);
        assert_eq!(relay.initiator(), Some(ChannelId::new(3)));

        relay.on_native_disconnect(Some("Native host has exited.".into()));

        assert_eq!(
            inbox(&mut third),
            vec![PageMessage::alert(
                "NativeApp disconnected: Native host has exited."
            )]
        );
        assert!(inbox(&mut first).is_empty());
        assert!(inbox(&mut second).is_empty());
        assert!(relay.native_link().is_none());
    }

    #[test]
    fn test_clean_disconnect_no_alert() {
        let mut relay = relay(MockConnector::new());
        let mut page = page(&mut relay, 5);

        relay.on_native_disconnect(None);

        assert!(inbox(&mut page).is_empty());
        assert!(relay.native_link().is_none());
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let mut relay = relay(MockConnector::new());
        let _page = page(&mut relay, 2);
        let first = relay.native_link().expect("linked");

        relay.on_native_disconnect(None);
        relay.on_channel_message(ChannelId::new(2), native(json!({"i": "x", "c": 0})));

        let second = relay.native_link().expect("relinked");
        assert!(second > first);
        assert_eq!(relay.connector().attempts, 2);
        assert_eq!(relay.connector.drain().len(), 1);
    }

    #[test]
    fn test_failed_connect_not_forwarded() {
        let mut relay = relay(MockConnector::failing());
        let mut page = page(&mut relay, 3);
        let _ = inbox(&mut page);

        relay.on_channel_message(ChannelId::new(3), native(json!({"i": "x", "c": 1})));

        assert_eq!(relay.connector().attempts, 2);
        assert!(relay.native_link().is_none());
        assert_eq!(
            inbox(&mut page),
            vec![PageMessage::alert(
                "NativeApp disconnected: Specified native messaging host not found."
            )]
        );
    }

    #[test]
    fn test_stale_link_events_ignored() {
        let mut relay = relay(MockConnector::new());
        let mut page = page(&mut relay, 1);
        let stale = relay.native_link().expect("linked");

        relay.on_native_disconnect(None);
        relay.on_channel_message(ChannelId::new(1), native(json!({"i": "a", "c": 0})));

        relay.on_native_event(NativeEvent::Message {
            link: stale,
            message: native(json!({"e": 3})),
        });
        relay.on_native_event(NativeEvent::Disconnected {
            link: stale,
            error: Some("late".into()),
        });

        assert!(inbox(&mut page).is_empty());
        assert!(relay.native_link().is_some());
    }

    #[test]
    fn test_non_request_page_message_ignored() {
        let mut relay = relay(MockConnector::new());
        let _page = page(&mut relay, 1);

        relay.on_page_message(ChannelId::new(1), PageMessage::alert("spoof"));
        relay.on_page_message(
            ChannelId::new(1),
            PageMessage::Response(native(json!({"i": "a"}))),
        );

        assert!(relay.connector.drain().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Register(u32),
        Remove(u32),
        Broadcast,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..6).prop_map(Op::Register),
            (0u32..6).prop_map(Op::Remove),
            Just(Op::Broadcast),
        ]
    }

    proptest! {
        #[test]
        fn prop_broadcast_reaches_exactly_registered(ops in prop::collection::vec(op(), 1..40)) {
            let mut relay = relay(MockConnector::new());
            let mut pages: Vec<(u32, mpsc::UnboundedReceiver<PageMessage>)> = Vec::new();
            let mut registered = BTreeSet::new();

            for op in ops {
                match op {
                    Op::Register(id) => {
                        pages.retain(|(page_id, _)| *page_id != id);
                        pages.push((id, page(&mut relay, id)));
                        registered.insert(id);
                    }
                    Op::Remove(id) => {
                        relay.remove_channel(ChannelId::new(id), RegistrationToken::new(u64::from(id)));
                        registered.remove(&id);
                    }
                    Op::Broadcast => {
                        relay.on_native_message(native(json!({"e": 3})));
                        for (id, rx) in &mut pages {
                            let got = inbox(rx).len();
                            prop_assert_eq!(got, usize::from(registered.contains(id)));
                        }
                    }
                }
            }
        }

        #[test]
        fn prop_reply_reaches_only_its_channel(
            channels in prop::collection::btree_set(0u32..50, 2..6),
            request in "[a-z0-9]{1,8}",
        ) {
            let mut relay = relay(MockConnector::new());
            let ids: Vec<u32> = channels.into_iter().collect();
            let mut pages: Vec<_> = ids.iter().map(|&id| (id, page(&mut relay, id))).collect();
            let target = ids[0];

            for &id in &ids {
                relay.on_channel_message(
                    ChannelId::new(id),
                    native(json!({"i": request.clone(), "c": 0})),
                );
            }
            relay.on_native_message(native(json!({"i": format!("{target}.{request}")})));

            for (id, rx) in &mut pages {
                let got = inbox(rx);
                if *id == target {
                    prop_assert_eq!(got.len(), 1);
                    let is_match = matches!(&got[0], PageMessage::Response(m) if m.id.as_deref() == Some(request.as_str()));
                    prop_assert!(is_match);
                } else {
                    prop_assert!(got.is_empty());
                }
            }
        }
    }
}
