//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical todo record and its patch/replace inputs.
//! - Parse the bulk-delete completion filter.
//!
//! # Invariants
//! - `id` is stable and never reused for another todo.
//! - `title` is stored trimmed and is never empty.
//! - `order` uniqueness is a store-wide property, enforced by repositories.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a todo.
pub type TodoId = Uuid;

/// Validation failures for todo input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// Title is empty or whitespace-only.
    EmptyTitle,
    /// Partial update carries no field at all.
    EmptyPatch,
    /// No display position is left above the current maximum.
    OrderOverflow,
    /// Bulk-delete flag is neither `true` nor `false`.
    InvalidCompletionFilter(String),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::EmptyPatch => write!(f, "partial update must set at least one field"),
            Self::OrderOverflow => write!(f, "no display order available above current maximum"),
            Self::InvalidCompletionFilter(value) => {
                write!(f, "invalid completed filter `{value}`; expected true|false")
            }
        }
    }
}

impl Error for TodoValidationError {}

/// Canonical todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    /// User-visible display position, unique across the store.
    pub order: i64,
    pub title: String,
    pub completed: bool,
}

impl Todo {
    /// Creates a not-yet-completed todo with a generated id.
    ///
    /// The title is trimmed before validation.
    pub fn new(order: i64, title: &str) -> Result<Self, TodoValidationError> {
        Self::with_id(Uuid::new_v4(), order, title)
    }

    /// Creates a not-yet-completed todo with a caller-provided id.
    pub fn with_id(id: TodoId, order: i64, title: &str) -> Result<Self, TodoValidationError> {
        let todo = Self {
            id,
            order,
            title: normalize_title(title)?,
            completed: false,
        };
        Ok(todo)
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.title.trim().is_empty() {
            return Err(TodoValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// Applies the present fields of `patch` to this record.
    pub fn apply(&mut self, patch: &TodoPatch) {
        if let Some(title) = patch.title.as_ref() {
            self.title = title.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

/// Partial update: any non-empty subset of `{title, completed, order}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none() && self.order.is_none()
    }

    /// Returns a copy with a trimmed title, rejecting empty patches/titles.
    pub fn normalized(&self) -> Result<Self, TodoValidationError> {
        if self.is_empty() {
            return Err(TodoValidationError::EmptyPatch);
        }
        let title = self.title.as_deref().map(normalize_title).transpose()?;
        Ok(Self {
            title,
            completed: self.completed,
            order: self.order,
        })
    }
}

/// Full replacement of every mutable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoUpdate {
    pub title: String,
    pub completed: bool,
    pub order: i64,
}

impl From<TodoUpdate> for TodoPatch {
    fn from(value: TodoUpdate) -> Self {
        Self {
            title: Some(value.title),
            completed: Some(value.completed),
            order: Some(value.order),
        }
    }
}

/// Target set of a bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionFilter {
    /// Every todo, whatever its `completed` value.
    ///
    /// Selected by an absent flag *and* by `false`: a `false` flag clears the
    /// whole list rather than only the incomplete items. Callers relying on
    /// "delete incomplete only" semantics will lose completed items too.
    All,
    /// Only todos with `completed = true`.
    CompletedOnly,
}

impl CompletionFilter {
    /// Parses the raw flag; matching is ASCII case-insensitive, no trimming.
    pub fn parse(flag: Option<&str>) -> Result<Self, TodoValidationError> {
        match flag {
            None => Ok(Self::All),
            Some(value) if value.eq_ignore_ascii_case("false") => Ok(Self::All),
            Some(value) if value.eq_ignore_ascii_case("true") => Ok(Self::CompletedOnly),
            Some(other) => Err(TodoValidationError::InvalidCompletionFilter(
                other.to_string(),
            )),
        }
    }
}

fn normalize_title(title: &str) -> Result<String, TodoValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TodoValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{CompletionFilter, Todo, TodoPatch, TodoUpdate, TodoValidationError};

    #[test]
    fn new_trims_title_and_starts_incomplete() {
        let todo = Todo::new(3, "  Wash the car \n").unwrap();
        assert_eq!(todo.title, "Wash the car");
        assert_eq!(todo.order, 3);
        assert!(!todo.completed);
    }

    #[test]
    fn new_rejects_blank_title() {
        assert_eq!(Todo::new(1, "   ").unwrap_err(), TodoValidationError::EmptyTitle);
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = Todo::new(1, "a").unwrap();
        let b = Todo::new(2, "b").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn patch_normalization_rejects_empty_patch() {
        let err = TodoPatch::default().normalized().unwrap_err();
        assert_eq!(err, TodoValidationError::EmptyPatch);
    }

    #[test]
    fn patch_normalization_trims_title_and_keeps_other_fields() {
        let patch = TodoPatch {
            title: Some(" Go to gym ".to_string()),
            completed: Some(true),
            order: None,
        };
        let normalized = patch.normalized().unwrap();
        assert_eq!(normalized.title.as_deref(), Some("Go to gym"));
        assert_eq!(normalized.completed, Some(true));
        assert_eq!(normalized.order, None);
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut todo = Todo::new(1, "keep me").unwrap();
        todo.apply(&TodoPatch {
            order: Some(7),
            ..TodoPatch::default()
        });
        assert_eq!(todo.title, "keep me");
        assert_eq!(todo.order, 7);
        assert!(!todo.completed);
    }

    #[test]
    fn update_converts_to_full_patch() {
        let patch = TodoPatch::from(TodoUpdate {
            title: "t".to_string(),
            completed: true,
            order: 4,
        });
        assert_eq!(patch.title.as_deref(), Some("t"));
        assert_eq!(patch.completed, Some(true));
        assert_eq!(patch.order, Some(4));
    }

    #[test]
    fn completion_filter_treats_absent_and_false_as_all() {
        assert_eq!(CompletionFilter::parse(None).unwrap(), CompletionFilter::All);
        assert_eq!(
            CompletionFilter::parse(Some("FALSE")).unwrap(),
            CompletionFilter::All
        );
        assert_eq!(
            CompletionFilter::parse(Some("True")).unwrap(),
            CompletionFilter::CompletedOnly
        );
    }

    #[test]
    fn completion_filter_rejects_other_tokens() {
        for raw in ["yes", "", " true", "1"] {
            let err = CompletionFilter::parse(Some(raw)).unwrap_err();
            assert_eq!(
                err,
                TodoValidationError::InvalidCompletionFilter(raw.to_string())
            );
        }
    }
}
