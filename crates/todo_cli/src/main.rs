//! Command-line driver for the todo core.
//!
//! # Responsibility
//! - Map one subcommand to one `TodoService` operation.
//! - Print results as JSON and turn domain failures into exit codes.

use clap::{ArgAction, Args, Parser, Subcommand};
use log::error;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use todo_core::{
    CoreConfig, SqliteTodoRepository, TodoErrorKind, TodoId, TodoPatch, TodoService,
    TodoServiceError, TodoUpdate,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "todo")]
#[command(about = "Manage ordered todo items in a SQLite store")]
#[command(version = todo_core::core_version())]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Store and logging settings shared by every subcommand.
#[derive(Args)]
struct GlobalArgs {
    /// SQLite database file (defaults to TODO_DB_PATH, else in-memory).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error (defaults to TODO_LOG_LEVEL).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files (defaults to TODO_LOG_DIR).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Store(StoreCommand),
    /// Print the core version without opening a store
    Version,
}

/// Subcommands that run against an opened store.
#[derive(Subcommand)]
enum StoreCommand {
    /// Create a todo at the end of the list
    Create { title: String },
    /// List todos, highest order first
    List,
    /// Show one todo
    Get { id: String },
    /// Change some fields of a todo
    Update(UpdateArgs),
    /// Replace title, completion and order of a todo
    Replace(ReplaceArgs),
    /// Delete one todo
    Remove { id: String },
    /// Bulk delete: `--completed true` removes completed todos; `false` or no flag removes all
    Clear {
        #[arg(long)]
        completed: Option<String>,
    },
}

#[derive(Args)]
struct UpdateArgs {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    completed: Option<bool>,
    #[arg(long, allow_negative_numbers = true)]
    order: Option<i64>,
}

#[derive(Args)]
struct ReplaceArgs {
    id: String,
    #[arg(long)]
    title: String,
    #[arg(long, action = ArgAction::Set)]
    completed: bool,
    #[arg(long, allow_negative_numbers = true)]
    order: i64,
}

/// Failure surfaced to the process boundary.
enum CliError {
    Setup(String),
    /// Id argument is not a UUID, so no todo can carry it.
    UnknownId(String),
    Service(TodoServiceError),
}

impl From<TodoServiceError> for CliError {
    fn from(value: TodoServiceError) -> Self {
        Self::Service(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(CliError::Setup(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(1)
        }
        Err(CliError::UnknownId(raw)) => {
            eprintln!("error: todo not found: {raw}");
            ExitCode::from(exit_code(TodoErrorKind::NotFound))
        }
        Err(CliError::Service(err)) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code(err.kind()))
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let command = match cli.command {
        Commands::Version => {
            return Ok(serde_json::json!({ "version": todo_core::core_version() }).to_string())
        }
        Commands::Store(command) => command,
    };

    let config = resolve_config(&cli.global)?;
    config
        .init_logging()
        .map_err(|err| CliError::Setup(err.to_string()))?;

    let conn = config.open_db().map_err(|err| {
        error!("event=cli_start module=cli status=error error_code=db_open_failed");
        CliError::Setup(err.to_string())
    })?;
    let repo =
        SqliteTodoRepository::try_new(&conn).map_err(|err| CliError::Setup(err.to_string()))?;
    let service = TodoService::new(repo);

    let output = match command {
        StoreCommand::Create { title } => to_json(&service.create(&title)?)?,
        StoreCommand::List => to_json(&service.find_all()?)?,
        StoreCommand::Get { id } => to_json(&service.find_one(parse_id(&id)?)?)?,
        StoreCommand::Update(args) => {
            let patch = TodoPatch {
                title: args.title,
                completed: args.completed,
                order: args.order,
            };
            to_json(&service.update_partial(parse_id(&args.id)?, &patch)?)?
        }
        StoreCommand::Replace(args) => {
            let update = TodoUpdate {
                title: args.title,
                completed: args.completed,
                order: args.order,
            };
            to_json(&service.update_total(parse_id(&args.id)?, &update)?)?
        }
        StoreCommand::Remove { id } => {
            service.remove(parse_id(&id)?)?;
            serde_json::json!({ "removed": 1 }).to_string()
        }
        StoreCommand::Clear { completed } => {
            let removed = service.delete_by_completion_filter(completed.as_deref())?;
            serde_json::json!({ "removed": removed }).to_string()
        }
    };
    Ok(output)
}

fn resolve_config(global: &GlobalArgs) -> Result<CoreConfig, CliError> {
    let cli_vars = [
        (
            todo_core::config::DB_PATH_VAR,
            global.db.as_ref().map(|path| path.display().to_string()),
        ),
        (todo_core::config::LOG_LEVEL_VAR, global.log_level.clone()),
        (
            todo_core::config::LOG_DIR_VAR,
            global.log_dir.as_ref().map(|path| path.display().to_string()),
        ),
    ];

    // Flags win over environment variables.
    CoreConfig::from_lookup(|key| {
        cli_vars
            .iter()
            .find(|(name, _)| *name == key)
            .and_then(|(_, value)| value.clone())
            .or_else(|| std::env::var(key).ok())
    })
    .map_err(|err| CliError::Setup(err.to_string()))
}

fn parse_id(raw: &str) -> Result<TodoId, CliError> {
    Uuid::parse_str(raw.trim()).map_err(|_| CliError::UnknownId(raw.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|err| CliError::Setup(err.to_string()))
}

fn exit_code(kind: TodoErrorKind) -> u8 {
    match kind {
        TodoErrorKind::Storage => 1,
        TodoErrorKind::InvalidInput => 2,
        TodoErrorKind::NotFound => 4,
        TodoErrorKind::Conflict => 9,
    }
}
