//! Page-side client.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `page` | [`PageClient`]: calls, pending call tracking, reply dispatch |
//! | `reader` | [`Reader`] handle returned by list readers |
//! | `reply` | [`Reply`] and [`Version`] |
//! | `events` | [`EventHandlers`] callback table |

// ============================================================================
// Submodules
// ============================================================================

/// Event callbacks.
pub mod events;

/// The page client.
pub mod page;

/// Reader handles.
pub mod reader;

/// Call results.
pub mod reply;

// ============================================================================
// Re-exports
// ============================================================================

pub use events::{
    AlertHandler, CardInsertedHandler, CardRemovedHandler, EventHandlers, ReadersChangedHandler,
};
pub use page::PageClient;
pub use reader::Reader;
pub use reply::{Reply, Version};
