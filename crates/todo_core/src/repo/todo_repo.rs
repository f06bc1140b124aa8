//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide point lookups, ordered scans, partial updates and bulk deletes
//!   over the `todos` table.
//! - Translate storage constraint violations into semantic errors.
//!
//! # Invariants
//! - `display_order` is backed by a unique index; a write that would reuse an
//!   order fails with `OrderTaken` and leaves storage untouched.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::todo::{Todo, TodoId, TodoPatch, TodoValidationError};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, Params, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    id,
    display_order,
    title,
    completed
FROM todos";

const REQUIRED_TODO_COLUMNS: [&str; 4] = ["id", "display_order", "title", "completed"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Record or patch failed input validation.
    Validation(TodoValidationError),
    /// Target todo does not exist.
    NotFound(TodoId),
    /// Another record already uses this id.
    DuplicateId(TodoId),
    /// Another record already holds this display order.
    OrderTaken(i64),
    /// Persisted data cannot be converted to a valid todo.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::DuplicateId(id) => write!(f, "todo id already exists: {id}"),
            Self::OrderTaken(order) => write!(f, "todo order already taken: {order}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "todo repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "todo repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "todo repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store contract consumed by the todo service.
///
/// Each call is individually atomic; sequences of calls are not.
pub trait TodoRepository {
    /// Persists a new record and returns it as stored.
    fn insert(&self, todo: &Todo) -> RepoResult<Todo>;
    fn find_by_id(&self, id: TodoId) -> RepoResult<Option<Todo>>;
    fn find_by_order(&self, order: i64) -> RepoResult<Option<Todo>>;
    /// All records, highest `order` first.
    fn list_desc_by_order(&self) -> RepoResult<Vec<Todo>>;
    /// Merges the present patch fields into the stored record.
    fn update_fields(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<()>;
    /// Returns the number of deleted rows (0 or 1).
    fn delete_by_id(&self, id: TodoId) -> RepoResult<usize>;
    fn delete_where_completed(&self, completed: bool) -> RepoResult<usize>;
    /// Deletes the given records by id in one unit of work.
    fn delete_many(&self, todos: &[Todo]) -> RepoResult<usize>;
    /// Highest stored `order`, `None` when the store is empty.
    fn max_order(&self) -> RepoResult<Option<i64>>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Fails when the schema version or `todos` layout does not match this
    /// binary.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_todo_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_optional<P: Params>(&self, sql: &str, params: P) -> RepoResult<Option<Todo>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_todo_row(row)?));
        }
        Ok(None)
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn insert(&self, todo: &Todo) -> RepoResult<Todo> {
        todo.validate()?;

        self.conn
            .execute(
                "INSERT INTO todos (
                    id,
                    display_order,
                    title,
                    completed
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    todo.id.to_string(),
                    todo.order,
                    todo.title.as_str(),
                    bool_to_int(todo.completed),
                ],
            )
            .map_err(|err| map_write_error(err, todo.id, Some(todo.order)))?;

        Ok(todo.clone())
    }

    fn find_by_id(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        self.query_optional(
            &format!("{TODO_SELECT_SQL} WHERE id = ?1;"),
            [id.to_string()],
        )
    }

    fn find_by_order(&self, order: i64) -> RepoResult<Option<Todo>> {
        self.query_optional(
            &format!("{TODO_SELECT_SQL} WHERE display_order = ?1;"),
            [order],
        )
    }

    fn list_desc_by_order(&self) -> RepoResult<Vec<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} ORDER BY display_order DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn update_fields(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<()> {
        let patch = patch.normalized()?;

        let mut assignments: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(title) = patch.title.as_ref() {
            assignments.push("title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(completed) = patch.completed {
            assignments.push("completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }
        if let Some(order) = patch.order {
            assignments.push("display_order = ?");
            bind_values.push(Value::Integer(order));
        }
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE todos SET {} WHERE id = ?;", assignments.join(", "));
        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind_values))
            .map_err(|err| map_write_error(err, id, patch.order))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_by_id(&self, id: TodoId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1;", [id.to_string()])?;
        Ok(changed)
    }

    fn delete_where_completed(&self, completed: bool) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM todos WHERE completed = ?1;",
            [bool_to_int(completed)],
        )?;
        Ok(changed)
    }

    fn delete_many(&self, todos: &[Todo]) -> RepoResult<usize> {
        if todos.is_empty() {
            return Ok(0);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM todos WHERE id = ?1;")?;
            for todo in todos {
                removed += stmt.execute([todo.id.to_string()])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn max_order(&self) -> RepoResult<Option<i64>> {
        let max = self
            .conn
            .query_row("SELECT MAX(display_order) FROM todos;", [], |row| {
                row.get::<_, Option<i64>>(0)
            })?;
        Ok(max)
    }
}

fn map_write_error(err: rusqlite::Error, id: TodoId, order: Option<i64>) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if let Some(order) = order.filter(|_| message.contains("todos.display_order")) {
                return RepoError::OrderTaken(order);
            }
            if message.contains("todos.id") {
                return RepoError::DuplicateId(id);
            }
        }
    }
    err.into()
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in todos.id")))?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in todos.completed"
            )));
        }
    };

    let todo = Todo {
        id,
        order: row.get("display_order")?,
        title: row.get("title")?,
        completed,
    };
    todo.validate()
        .map_err(|err| RepoError::InvalidData(format!("todo {id}: {err}")))?;
    Ok(todo)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_todo_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "todos")? {
        return Err(RepoError::MissingRequiredTable("todos"));
    }

    for column in REQUIRED_TODO_COLUMNS {
        if !table_has_column(conn, "todos", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "todos",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
