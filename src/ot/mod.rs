//! Operational transform over flat text
//!
//! This module contains the operation type and its algebra, plus the
//! revisioned server document that serializes concurrent edits.
//!
//! # Contents
//!
//! - **TextOperation:** retain/insert/delete steps with source and target lengths
//! - **Algebra:** `compose`, `transform`, `invert`, author-id tie-break
//! - **Document:** server-side history that rebases stale client operations
//!
//! # References
//!
//! - "Concurrency Control in Groupware Systems" (Ellis & Gibbs, 1989)
//! - "High-Latency, Low-Bandwidth Windowing in the Jupiter Collaboration System"

pub mod algebra;
pub mod document;
pub mod operation;

pub use algebra::{compose, got_priority, priority, transform};
pub use document::Document;
pub use operation::{Step, TextOperation};
