//! In-memory todo repository.
//!
//! Mirrors the SQLite repository semantics (duplicate-id rejection, unique
//! display order, descending scans) without touching disk. Single-threaded:
//! interior mutability through `RefCell`.

use crate::model::todo::{Todo, TodoId, TodoPatch};
use crate::repo::todo_repo::{RepoError, RepoResult, TodoRepository};
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct InMemoryTodoRepository {
    todos: RefCell<BTreeMap<TodoId, Todo>>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.todos.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.borrow().is_empty()
    }
}

fn order_holder(todos: &BTreeMap<TodoId, Todo>, order: i64) -> Option<&Todo> {
    todos.values().find(|todo| todo.order == order)
}

impl TodoRepository for InMemoryTodoRepository {
    fn insert(&self, todo: &Todo) -> RepoResult<Todo> {
        todo.validate()?;

        let mut todos = self.todos.borrow_mut();
        if todos.contains_key(&todo.id) {
            return Err(RepoError::DuplicateId(todo.id));
        }
        if order_holder(&todos, todo.order).is_some() {
            return Err(RepoError::OrderTaken(todo.order));
        }
        todos.insert(todo.id, todo.clone());
        Ok(todo.clone())
    }

    fn find_by_id(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        Ok(self.todos.borrow().get(&id).cloned())
    }

    fn find_by_order(&self, order: i64) -> RepoResult<Option<Todo>> {
        Ok(order_holder(&self.todos.borrow(), order).cloned())
    }

    fn list_desc_by_order(&self) -> RepoResult<Vec<Todo>> {
        let mut todos: Vec<Todo> = self.todos.borrow().values().cloned().collect();
        todos.sort_by_key(|todo| Reverse(todo.order));
        Ok(todos)
    }

    fn update_fields(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<()> {
        let patch = patch.normalized()?;

        let mut todos = self.todos.borrow_mut();
        if !todos.contains_key(&id) {
            return Err(RepoError::NotFound(id));
        }
        if let Some(order) = patch.order {
            if order_holder(&todos, order).is_some_and(|holder| holder.id != id) {
                return Err(RepoError::OrderTaken(order));
            }
        }
        let todo = todos.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        todo.apply(&patch);
        Ok(())
    }

    fn delete_by_id(&self, id: TodoId) -> RepoResult<usize> {
        Ok(usize::from(self.todos.borrow_mut().remove(&id).is_some()))
    }

    fn delete_where_completed(&self, completed: bool) -> RepoResult<usize> {
        let mut todos = self.todos.borrow_mut();
        let before = todos.len();
        todos.retain(|_, todo| todo.completed != completed);
        Ok(before - todos.len())
    }

    fn delete_many(&self, targets: &[Todo]) -> RepoResult<usize> {
        let mut todos = self.todos.borrow_mut();
        let removed = targets
            .iter()
            .filter(|target| todos.remove(&target.id).is_some())
            .count();
        Ok(removed)
    }

    fn max_order(&self) -> RepoResult<Option<i64>> {
        Ok(self.todos.borrow().values().map(|todo| todo.order).max())
    }
}
