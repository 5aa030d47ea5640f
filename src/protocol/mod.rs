//! Message types for both legs of the relay.
//!
//! # Protocol Overview
//!
//! | Message | Leg | Direction | Purpose |
//! |---------|-----|-----------|---------|
//! | `PageMessage::Request` | page bus | Page → Relay | Command request |
//! | `PageMessage::Response` | page bus | Relay → Page | Reply or event |
//! | `PageMessage::Alert` | page bus | Relay → Page | Native host dropped |
//! | `Message` | native leg | both | Length-prefixed JSON envelope |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command codes and typed commands |
//! | `event` | Event codes and parsed reader events |
//! | `message` | Envelope, page-bus envelope, reader descriptors |

// ============================================================================
// Submodules
// ============================================================================

/// Command codes and typed commands.
pub mod command;

/// Reader event types.
pub mod event;

/// Envelope types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, CommandCode, ShareMode};
pub use event::{EventCode, ReaderEvent};
pub use message::{Message, PageMessage, ReaderDescriptor};
