//! Core domain logic for the todo store.
//! This crate is the single source of truth for todo ordering invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::todo::{
    CompletionFilter, Todo, TodoId, TodoPatch, TodoUpdate, TodoValidationError,
};
pub use repo::memory_repo::InMemoryTodoRepository;
pub use repo::todo_repo::{RepoError, RepoResult, SqliteTodoRepository, TodoRepository};
pub use service::todo_service::{
    TodoErrorKind, TodoService, TodoServiceError, TodoServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
