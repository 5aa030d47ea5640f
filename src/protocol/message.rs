//! Message envelope shared by both legs of the relay.
//!
//! # Format
//!
//! Request (page → native):
//! ```json
//! { "i": "k3x9", "c": 4, "r": 0, "a": "00A4040000" }
//! ```
//!
//! Reply (native → page):
//! ```json
//! { "i": "k3x9", "d": "9000" }
//! { "i": "k3x9", "incomplete": true }
//! ```
//!
//! Event (native → every page):
//! ```json
//! { "e": 1, "r": 0, "d": "3B8A8001..." }
//! ```
//!
//! On the page bus every envelope is additionally tagged with
//! `"webcard": "request" | "response" | "alert"`, see [`PageMessage`].

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::{Command, CommandCode};

// ============================================================================
// Constants
// ============================================================================

/// Keys raw params may not set: the request id, the command selector and
/// the page-bus tag.
const RESERVED_PARAMS: &[&str] = &["i", "c", "webcard"];

// ============================================================================
// Message
// ============================================================================

/// One envelope on either leg.
///
/// Fields this crate does not model are kept in [`Message::extra`] and
/// travel through the relay untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Correlation token; compound on the native leg.
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Command selector (requests).
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub command: Option<u32>,

    /// Event selector (native events).
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub event: Option<u32>,

    /// Reader index.
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub reader: Option<u32>,

    /// Share mode for connect.
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub share_mode: Option<u32>,

    /// Command APDU, hex encoded.
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub apdu: Option<String>,

    /// Command-specific payload.
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error marker set by the native host.
    #[serde(default, skip_serializing_if = "is_false")]
    pub incomplete: bool,

    /// Native host version (get version reply).
    #[serde(rename = "verNat", default, skip_serializing_if = "Option::is_none")]
    pub native_version: Option<String>,

    /// Extension version, stamped by the relay on get version replies.
    #[serde(rename = "verExt", default, skip_serializing_if = "Option::is_none")]
    pub extension_version: Option<String>,

    /// Unmodelled fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[inline]
fn is_false(value: &bool) -> bool {
    !*value
}

impl Message {
    /// Builds a request envelope for a command.
    ///
    /// Raw params fill the modelled fields they name (`r`, `a`, `d`, ...);
    /// the rest travel as extra fields. Params named `i`, `c` or `webcard`
    /// are dropped, since the client owns those keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the reader index does not fit the wire
    /// format or raw params carry a modelled field of the wrong type.
    pub fn request(id: &RequestId, command: &Command) -> Result<Self> {
        let mut message = match command {
            Command::Raw { params, .. } => Self::from_params(params)?,
            _ => Self::default(),
        };

        message.id = Some(id.to_string());
        message.command = Some(command.code().as_u32());

        if let Some(reader) = command.reader() {
            let index = u32::try_from(reader)
                .map_err(|_| Error::protocol(format!("Reader index {reader} out of range")))?;
            message.reader = Some(index);
        }

        match command {
            Command::Connect { share_mode, .. } => {
                message.share_mode = Some(share_mode.as_u32());
            }
            Command::Transceive { apdu, .. } => {
                message.apdu = Some(apdu.clone());
            }
            _ => {}
        }

        Ok(message)
    }

    /// Parses raw params into an envelope without the client-owned keys.
    fn from_params(params: &Map<String, Value>) -> Result<Self> {
        let params: Map<String, Value> = params
            .iter()
            .filter(|(key, _)| {
                let reserved = RESERVED_PARAMS.contains(&key.as_str());
                if reserved {
                    warn!(key = %key, "Dropping reserved raw param");
                }
                !reserved
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        serde_json::from_value(Value::Object(params))
            .map_err(|e| Error::protocol(format!("Invalid raw params: {e}")))
    }

    /// Returns the correlation id if present and non-empty.
    ///
    /// An empty id is treated exactly like a missing one.
    #[inline]
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns the event code if this message is a native event.
    ///
    /// A zero code counts as absent.
    #[inline]
    #[must_use]
    pub fn event_code(&self) -> Option<u32> {
        self.event.filter(|&code| code != 0)
    }

    /// Returns the command selector, if any.
    #[inline]
    #[must_use]
    pub fn command_code(&self) -> Option<CommandCode> {
        self.command.map(CommandCode::from)
    }

    /// Returns the payload as a non-empty string.
    #[inline]
    #[must_use]
    pub fn data_str(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Decodes the payload as a reader list.
    ///
    /// Returns `None` if the payload is missing or not a reader list.
    #[must_use]
    pub fn readers(&self) -> Option<Vec<ReaderDescriptor>> {
        let data = self.data.as_ref()?;
        if !data.is_array() {
            return None;
        }
        serde_json::from_value(data.clone()).ok()
    }
}

// ============================================================================
// ReaderDescriptor
// ============================================================================

/// One entry of the list readers reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderDescriptor {
    /// Reader name as reported by PC/SC.
    #[serde(rename = "n")]
    pub name: String,

    /// Answer To Reset of the inserted card, hex encoded; empty without a card.
    #[serde(rename = "a", default)]
    pub atr: String,
}

// ============================================================================
// PageMessage
// ============================================================================

/// An envelope on the page ↔ relay bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "webcard", rename_all = "lowercase")]
pub enum PageMessage {
    /// Page → relay command.
    Request(Message),
    /// Relay → page reply or event.
    Response(Message),
    /// Relay → page human-readable notice.
    Alert {
        /// Text to show the user.
        info: String,
    },
}

impl PageMessage {
    /// Creates an alert.
    #[inline]
    #[must_use]
    pub fn alert(info: impl Into<String>) -> Self {
        Self::Alert { info: info.into() }
    }

    /// Returns the bus kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Response(_) => "response",
            Self::Alert { .. } => "alert",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
