//! Client-side synchronization
//!
//! [`SyncSession`] connects one editing surface to the server through a
//! [`Transport`]. It keeps the buffer, the translator snapshot and the
//! undo history consistent while local and remote edits interleave.

pub mod clock;
pub mod config;
pub mod session;
pub mod undo;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use session::{OutboundOperation, QueuedTransport, SessionState, SyncSession, Transport};
pub use undo::{ActionStack, UndoManager};

use crate::ClientID;

/// Generate a fresh client identifier
///
/// Identifiers double as the tie-break for concurrent inserts, so they only
/// need to be unique, not ordered.
pub fn generate_client_id() -> ClientID {
    uuid::Uuid::new_v4().to_string()
}
