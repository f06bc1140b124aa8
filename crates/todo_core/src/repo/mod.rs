//! Record store abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the narrow data-access contract the todo service depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate records/patches before mutating storage.
//! - Order uniqueness is enforced by the store itself and reported as
//!   `RepoError::OrderTaken`, never silently overwritten.

pub mod memory_repo;
pub mod todo_repo;
