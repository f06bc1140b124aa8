//! Domain model for todo items.
//!
//! # Responsibility
//! - Define the canonical todo record and its write-side inputs.
//! - Own input validation shared by every store implementation.
//!
//! # Invariants
//! - Every todo is identified by a stable `TodoId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod todo;
