//! The background relay.
//!
//! Sits between any number of pages and a single native host, the way a
//! browser extension's background context does.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  ChannelPort  ┌──────────────────────────┐  NativeLink  ┌─────────────┐
//! │ Page (3) ├──────────────►│          Relay           ├─────────────►│ Native host │
//! ├──────────┤               │  ChannelRegistry         │              │             │
//! │ Page (7) ├──────────────►│  "7" + "." + "abc"       │◄─────────────┤             │
//! └──────────┘               └──────────────────────────┘  NativeEvent └─────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | Relay-side view of a page, registration tokens |
//! | `registry` | Channel set with delivery and broadcast |
//! | `core` | Routing state machine |
//! | `handle` | Relay task, handle and page ports |

// ============================================================================
// Submodules
// ============================================================================

/// Page channels.
pub mod channel;

/// Channel registry.
pub mod registry;

/// Routing state machine.
pub mod core;

/// Relay task and handles.
pub mod handle;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{Channel, RegistrationToken};
pub use self::core::Relay;
pub use handle::{ChannelPort, ChannelSender, RelayHandle};
pub use registry::ChannelRegistry;
