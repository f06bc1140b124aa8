//! Todo use-case service.
//!
//! # Responsibility
//! - Provide create/read/update/delete entry points for todo callers.
//! - Assign display orders and keep them unique across the store.
//! - Surface failures as `NotFound` / `Conflict` / `Validation` / `Storage`.
//!
//! # Invariants
//! - A created todo gets `max(order) + 1`, or `1` on an empty store.
//! - No mutation leaves two todos with the same `order`. The pre-check on the
//!   order holder gives a fast answer; the store's unique constraint closes
//!   the check-then-write race, and its `OrderTaken` maps to `Conflict`.
//! - Keeping a todo's own order is never a conflict.

use crate::model::todo::{
    CompletionFilter, Todo, TodoId, TodoPatch, TodoUpdate, TodoValidationError,
};
use crate::repo::todo_repo::{RepoError, TodoRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TodoServiceResult<T> = Result<T, TodoServiceError>;

/// Domain-level failure returned by every service operation.
#[derive(Debug)]
pub enum TodoServiceError {
    /// Target todo does not exist.
    NotFound(TodoId),
    /// Requested order is held by a different todo.
    Conflict { order: i64 },
    /// Caller input was rejected before touching storage.
    Validation(TodoValidationError),
    /// Storage failure, propagated unchanged.
    Storage(RepoError),
}

/// Coarse classification used by boundary layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Storage,
}

impl TodoErrorKind {
    /// HTTP status a transport layer should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InvalidInput => 400,
            Self::Storage => 500,
        }
    }
}

impl TodoServiceError {
    pub fn kind(&self) -> TodoErrorKind {
        match self {
            Self::NotFound(_) => TodoErrorKind::NotFound,
            Self::Conflict { .. } => TodoErrorKind::Conflict,
            Self::Validation(_) => TodoErrorKind::InvalidInput,
            Self::Storage(_) => TodoErrorKind::Storage,
        }
    }
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::Conflict { order } => write!(f, "order {order} is already used by another todo"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TodoValidationError> for TodoServiceError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TodoServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::OrderTaken(order) => Self::Conflict { order },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Storage(other),
        }
    }
}

/// Todo service facade over a record store.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a todo at the end of the display order.
    ///
    /// # Errors
    /// - `Validation` for a blank title or when `order` would overflow.
    /// - `Conflict` when a concurrent writer took the computed order first.
    pub fn create(&self, title: &str) -> TodoServiceResult<Todo> {
        let order = match self.repo.max_order()? {
            Some(max) => max
                .checked_add(1)
                .ok_or(TodoValidationError::OrderOverflow)?,
            None => 1,
        };
        let todo = Todo::new(order, title)?;

        match self.repo.insert(&todo) {
            Ok(stored) => {
                info!(
                    "event=todo_create module=service status=ok order={}",
                    stored.order
                );
                Ok(stored)
            }
            Err(err) => Err(log_failure("todo_create", err.into())),
        }
    }

    /// Lists every todo, highest order first.
    pub fn find_all(&self) -> TodoServiceResult<Vec<Todo>> {
        Ok(self.repo.list_desc_by_order()?)
    }

    pub fn find_one(&self, id: TodoId) -> TodoServiceResult<Todo> {
        self.repo
            .find_by_id(id)?
            .ok_or(TodoServiceError::NotFound(id))
    }

    /// Applies a non-empty subset of `{title, completed, order}`.
    ///
    /// The order check only runs when the patch carries an order.
    pub fn update_partial(&self, id: TodoId, patch: &TodoPatch) -> TodoServiceResult<Todo> {
        let patch = patch.normalized()?;
        self.update_checked(id, &patch)
            .map_err(|err| log_failure("todo_update", err))
    }

    /// Replaces title, completion and order in one call.
    pub fn update_total(&self, id: TodoId, update: &TodoUpdate) -> TodoServiceResult<Todo> {
        let patch = TodoPatch::from(update.clone()).normalized()?;
        self.update_checked(id, &patch)
            .map_err(|err| log_failure("todo_update", err))
    }

    /// Deletes one todo.
    pub fn remove(&self, id: TodoId) -> TodoServiceResult<()> {
        if self.repo.delete_by_id(id)? == 0 {
            return Err(log_failure("todo_remove", TodoServiceError::NotFound(id)));
        }
        info!("event=todo_remove module=service status=ok");
        Ok(())
    }

    /// Bulk delete driven by the raw `completed` flag.
    ///
    /// `"true"` removes completed todos only. An absent flag or `"false"`
    /// removes *every* todo, completed or not; `false` is not a filter for
    /// incomplete items. Any other value is refused before deleting anything.
    ///
    /// Returns the number of removed todos.
    pub fn delete_by_completion_filter(&self, flag: Option<&str>) -> TodoServiceResult<usize> {
        let filter = match CompletionFilter::parse(flag) {
            Ok(filter) => filter,
            Err(err) => return Err(log_failure("todo_bulk_delete", err.into())),
        };

        let removed = match filter {
            CompletionFilter::All => {
                let all = self.repo.list_desc_by_order()?;
                self.repo.delete_many(&all)?
            }
            CompletionFilter::CompletedOnly => self.repo.delete_where_completed(true)?,
        };

        info!(
            "event=todo_bulk_delete module=service status=ok filter={:?} count={removed}",
            filter
        );
        Ok(removed)
    }

    fn update_checked(&self, id: TodoId, patch: &TodoPatch) -> TodoServiceResult<Todo> {
        if self.repo.find_by_id(id)?.is_none() {
            return Err(TodoServiceError::NotFound(id));
        }

        if let Some(order) = patch.order {
            if let Some(holder) = self.repo.find_by_order(order)? {
                if holder.id != id {
                    return Err(TodoServiceError::Conflict { order });
                }
            }
        }

        self.repo.update_fields(id, patch)?;

        let updated = self
            .repo
            .find_by_id(id)?
            .ok_or(TodoServiceError::NotFound(id))?;
        info!(
            "event=todo_update module=service status=ok order={} fields={}",
            updated.order,
            patch_field_names(patch)
        );
        Ok(updated)
    }
}

fn log_failure(event: &str, err: TodoServiceError) -> TodoServiceError {
    match err.kind() {
        TodoErrorKind::Storage => {
            warn!("event={event} module=service status=error error_code=storage error={err}")
        }
        kind => info!(
            "event={event} module=service status=rejected error_code={}",
            error_code(kind)
        ),
    }
    err
}

fn error_code(kind: TodoErrorKind) -> &'static str {
    match kind {
        TodoErrorKind::NotFound => "not_found",
        TodoErrorKind::Conflict => "conflict",
        TodoErrorKind::InvalidInput => "invalid_input",
        TodoErrorKind::Storage => "storage",
    }
}

fn patch_field_names(patch: &TodoPatch) -> String {
    let mut names = Vec::new();
    if patch.title.is_some() {
        names.push("title");
    }
    if patch.completed.is_some() {
        names.push("completed");
    }
    if patch.order.is_some() {
        names.push("order");
    }
    names.join(",")
}

#[cfg(test)]
mod tests {
    use super::{TodoErrorKind, TodoServiceError};
    use crate::model::todo::TodoValidationError;
    use crate::repo::todo_repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn repo_errors_map_onto_domain_kinds() {
        let id = Uuid::new_v4();
        let cases = [
            (RepoError::NotFound(id), TodoErrorKind::NotFound),
            (RepoError::OrderTaken(3), TodoErrorKind::Conflict),
            (
                RepoError::Validation(TodoValidationError::EmptyTitle),
                TodoErrorKind::InvalidInput,
            ),
            (RepoError::DuplicateId(id), TodoErrorKind::Storage),
            (
                RepoError::InvalidData("bad row".to_string()),
                TodoErrorKind::Storage,
            ),
        ];
        for (repo_err, expected) in cases {
            assert_eq!(TodoServiceError::from(repo_err).kind(), expected);
        }
    }

    #[test]
    fn error_kinds_carry_transport_statuses() {
        assert_eq!(TodoErrorKind::NotFound.http_status(), 404);
        assert_eq!(TodoErrorKind::Conflict.http_status(), 409);
        assert_eq!(TodoErrorKind::InvalidInput.http_status(), 400);
        assert_eq!(TodoErrorKind::Storage.http_status(), 500);
    }

    #[test]
    fn storage_errors_keep_their_source() {
        let err = TodoServiceError::from(RepoError::MissingRequiredTable("todos"));
        assert!(matches!(
            err,
            TodoServiceError::Storage(RepoError::MissingRequiredTable("todos"))
        ));
        assert!(std::error::Error::source(&err).is_some());
    }
}
