//! WebCard relay - Smart card access for web pages through a native host.
//!
//! This library multiplexes request/response traffic between many web pages
//! and a single native process that talks to PC/SC readers.
//!
//! # Architecture
//!
//! Three parties exchange JSON envelopes:
//!
//! - **Page (Rust: [`PageClient`])**: Issues commands, awaits replies,
//!   receives reader events
//! - **Relay ([`Relay`])**: Owns one channel per page and one native link,
//!   rewrites request ids so replies find their way back
//! - **Native host**: Speaks length-prefixed JSON on stdin/stdout
//!
//! Key design principles:
//!
//! - Request ids become `"<channel>.<request>"` on the native leg
//! - Envelopes without an id are events and go to every page
//! - The native host is started on demand, at most once at a time
//! - All relay state lives in one task (no locks on the routing path)
//!
//! # Quick Start
//!
//! ```no_run
//! use webcard_relay::{
//!     ChannelId, NativeHostOptions, PageClient, ProcessConnector, Relay, RelayOptions, Result,
//!     ShareMode,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Start the relay against the installed native host
//!     let connector = ProcessConnector::new(NativeHostOptions::new("/usr/bin/webcard"))?;
//!     let relay = Relay::spawn(connector, RelayOptions::new().with_extension_version("0.3.1"));
//!
//!     // One client per page
//!     let page = PageClient::new(ChannelId::new(1), relay);
//!     page.on_card_inserted(|reader, atr| println!("Card in reader {reader}: {atr}"));
//!
//!     for reader in page.readers().await? {
//!         if reader.has_card() {
//!             reader.connect(ShareMode::Shared).await?;
//!             let response = reader.transceive("00A4040000").await?;
//!             println!("{}: {response}", reader.name);
//!             reader.disconnect().await?;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Page side: [`PageClient`], [`Reader`] |
//! | [`relay`] | Background relay: [`Relay`], [`RelayHandle`] |
//! | [`transport`] | Native messaging framing and connectors |
//! | [`protocol`] | Envelope and command types |
//! | [`options`] | Relay, host and client options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Page-side client.
///
/// - [`PageClient`] - Calls, pending call tracking, event callbacks
/// - [`Reader`] - Reader handle from the last list
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for channels, requests and links.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Builder-style options.
pub mod options;

/// Envelope types shared by both legs.
pub mod protocol;

/// Background relay.
///
/// Routes page requests to the native host and replies back.
pub mod relay;

/// Native messaging transport.
///
/// Frame codec and the connectors that start native hosts.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{EventHandlers, PageClient, Reader, Reply, Version};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ChannelId, CompoundId, LinkId, RequestId};

// Options
pub use options::{ClientOptions, NativeHostOptions, RelayOptions};

// Protocol types
pub use protocol::{
    Command, CommandCode, EventCode, Message, PageMessage, ReaderDescriptor, ReaderEvent,
    ShareMode,
};

// Relay types
pub use relay::{ChannelPort, ChannelSender, Relay, RelayHandle};

// Transport types
pub use transport::{
    DuplexConnector, NativeCodec, NativeConnector, NativeEndpoint, NativeEvent, NativeLink,
    ProcessConnector,
};
