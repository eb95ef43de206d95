//! OTSync Core - Operational-transform sync engine for plain-text editors
//!
//! This crate keeps several editors of the same text document convergent.
//! Every client edits its own copy; a server serializes operations and
//! relays them; clients transform incoming operations past their own
//! unacknowledged work. It implements:
//! - `TextOperation` with `compose`, `transform` and `invert`
//! - A revisioned server `Document` that rebases stale operations
//! - A client `SyncSession` state machine with grouped undo/redo
//! - Translation between editor change batches and operations
//!
//! # Examples
//!
//! ```rust
//! use otsync_core::ot::TextOperation;
//!
//! let mut alice = TextOperation::new(Some("alice".to_string()));
//! alice.retain(5);
//! alice.insert(" world");
//!
//! let mut bob = TextOperation::new(Some("bob".to_string()));
//! bob.insert(">");
//! bob.retain(5);
//!
//! let (alice_prime, bob_prime) = alice.transform(&bob).unwrap();
//! let left = bob_prime.apply(&alice.apply("hello").unwrap()).unwrap();
//! let right = alice_prime.apply(&bob.apply("hello").unwrap()).unwrap();
//! assert_eq!(left, right);
//! assert_eq!(left, ">hello world");
//! ```

pub mod editor;
pub mod error;
pub mod ot;
pub mod protocol;
pub mod sync;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use editor::{ChangeBatch, ChangeOrigin, EditorChange, EditorSurface, Position, RopeBuffer};
pub use error::{Result, SyncError};
pub use ot::{Document, Step, TextOperation};
pub use protocol::{OperationData, StepData};
pub use sync::{generate_client_id, SessionConfig, SessionState, SyncSession, Transport};

/// Client identifier type
pub type ClientID = String;
