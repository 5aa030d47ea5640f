//! Native messaging transport.
//!
//! This module carries envelopes between the relay and the native host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Relay          │                              │  Native host    │
//! │                 │     stdin / stdout           │  (PC/SC)        │
//! │  NativeLink ────┼─────────────────────────────►│                 │
//! │  ◄── NativeEvent│◄─────────────────────────────┤                 │
//! └─────────────────┘  u32 length + JSON frames    └─────────────────┘
//! ```
//!
//! # Link Lifecycle
//!
//! 1. Relay needs the host and calls [`NativeConnector::connect`]
//! 2. Connector starts the host and spawns the pump task
//! 3. Relay queues envelopes through [`NativeLink::send`]
//! 4. Pump reports inbound envelopes as [`NativeEvent::Message`]
//! 5. Host exit or relay drop ends the pump with [`NativeEvent::Disconnected`]
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Length-prefixed JSON frame codec |
//! | `connector` | Connector trait, process and in-memory connectors |
//! | `link` | Link handle, events and the pump task |

// ============================================================================
// Submodules
// ============================================================================

/// Length-prefixed JSON frame codec.
pub mod codec;

/// Native connectors.
pub mod connector;

/// Link handle and pump task.
pub mod link;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::NativeCodec;
pub use connector::{DuplexConnector, NativeConnector, NativeEndpoint, ProcessConnector};
pub use link::{HOST_EXITED, NativeEvent, NativeEventSender, NativeLink};
