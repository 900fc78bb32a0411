//! task-ledger entry point.
//!
//! Sets up logging, opens the database, injects the handle into the
//! repositories, and dispatches the parsed command. Output formatting
//! lives here; the repositories stay presentation-free.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use task_ledger::cli::{AddArgs, Cli, Command, EditArgs, ListArgs};
use task_ledger::db::Database;
use task_ledger::db::history::TaskHistoryRepository;
use task_ledger::db::labels::LabelRepository;
use task_ledger::db::lists::ListRepository;
use task_ledger::db::tasks::TaskRepository;
use task_ledger::types::{Priority, Task, TaskHistory};
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let db_path = resolve_db_path(cli.database.as_deref())?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    debug!(path = %db_path.display(), "opening database");
    let db = Database::open(&db_path)?;

    match cli.command {
        Some(Command::Add(args)) => run_add(&db, args)?,
        Some(Command::List(args)) => run_list(&db, args)?,
        Some(Command::Edit(args)) => run_edit(&db, args)?,
        Some(Command::Done { id }) => run_done(&db, &id)?,
        Some(Command::Reopen { id }) => run_reopen(&db, &id)?,
        Some(Command::Trash { id }) => run_trash(&db, &id)?,
        Some(Command::Restore { id }) => run_restore(&db, &id)?,
        Some(Command::Rm { id }) => run_rm(&db, &id)?,
        Some(Command::History { id }) => run_history(&db, &id)?,
        Some(Command::Lists) => run_lists(&db)?,
        Some(Command::AddList { name }) => run_add_list(&db, &name)?,
        None => run_list(&db, ListArgs::default())?,
    }

    Ok(())
}

/// Pick the database location: the --database flag wins, otherwise the
/// platform data directory.
fn resolve_db_path(flag: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(PathBuf::from(path));
    }
    let base = dirs::data_dir().context("no data directory on this platform")?;
    Ok(base.join("task-ledger").join("tasks.db"))
}

fn run_add(db: &Database, args: AddArgs) -> Result<()> {
    let lists = ListRepository::new(db.clone());
    let tasks = TaskRepository::new(db.clone());

    let list = match lists.find_by_name(&args.list)? {
        Some(list) => list,
        None => {
            info!(name = %args.list, "creating list on first use");
            lists.create(args.list.as_str())?
        }
    };

    let task = tasks.create(args.to_new_task(&list.id))?;
    println!("Added {} to {}", task.id, list.name);
    Ok(())
}

fn run_list(db: &Database, args: ListArgs) -> Result<()> {
    let tasks = TaskRepository::new(db.clone());

    let list_id = match &args.list {
        Some(name) => match ListRepository::new(db.clone()).find_by_name(name)? {
            Some(list) => Some(list.id),
            None => {
                println!("No list named {name:?}.");
                return Ok(());
            }
        },
        None => None,
    };
    let label_id = match &args.label {
        Some(name) => {
            let labels = LabelRepository::new(db.clone()).find_all()?;
            match labels.into_iter().find(|l| l.name == *name) {
                Some(label) => Some(label.id),
                None => {
                    println!("No label named {name:?}.");
                    return Ok(());
                }
            }
        }
        None => None,
    };

    let found = tasks.find_with_filters(&args.to_filter(list_id, label_id))?;
    if found.is_empty() {
        println!("No tasks match.");
        return Ok(());
    }
    for task in &found {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

fn run_edit(db: &Database, args: EditArgs) -> Result<()> {
    let list_id = match &args.list {
        Some(name) => match ListRepository::new(db.clone()).find_by_name(name)? {
            Some(list) => Some(list.id),
            None => {
                println!("No list named {name:?}.");
                return Ok(());
            }
        },
        None => None,
    };

    let changes = args.to_changes(list_id);
    if changes.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    match TaskRepository::new(db.clone()).update(&args.id, changes)? {
        Some(task) => println!("Updated {}", format_task_line(&task)),
        None => println!("No task with id {}.", args.id),
    }
    Ok(())
}

fn run_done(db: &Database, id: &str) -> Result<()> {
    match TaskRepository::new(db.clone()).mark_complete(id)? {
        Some(task) => println!("Completed {}", task.name),
        None => println!("No task with id {id}."),
    }
    Ok(())
}

fn run_reopen(db: &Database, id: &str) -> Result<()> {
    match TaskRepository::new(db.clone()).mark_incomplete(id)? {
        Some(task) => println!("Reopened {}", task.name),
        None => println!("No task with id {id}."),
    }
    Ok(())
}

fn run_trash(db: &Database, id: &str) -> Result<()> {
    if TaskRepository::new(db.clone()).soft_delete(id)? {
        println!("Trashed {id}.");
    } else {
        println!("No live task with id {id}.");
    }
    Ok(())
}

fn run_restore(db: &Database, id: &str) -> Result<()> {
    if TaskRepository::new(db.clone()).restore(id)? {
        println!("Restored {id}.");
    } else {
        println!("No trashed task with id {id}.");
    }
    Ok(())
}

fn run_rm(db: &Database, id: &str) -> Result<()> {
    if TaskRepository::new(db.clone()).delete(id)? {
        println!("Deleted {id}.");
    } else {
        println!("No task with id {id}.");
    }
    Ok(())
}

fn run_history(db: &Database, id: &str) -> Result<()> {
    let history = TaskHistoryRepository::new(db.clone()).find_by_task_id(id)?;
    if history.is_empty() {
        println!("No recorded changes.");
        return Ok(());
    }
    for entry in &history {
        println!("{}", format_history_line(entry)?);
    }
    Ok(())
}

fn run_lists(db: &Database) -> Result<()> {
    let lists = ListRepository::new(db.clone()).find_all()?;
    if lists.is_empty() {
        println!("No lists yet.");
        return Ok(());
    }
    for list in &lists {
        println!("{}  {}", list.name, list.id);
    }
    Ok(())
}

fn run_add_list(db: &Database, name: &str) -> Result<()> {
    let list = ListRepository::new(db.clone()).create(name)?;
    println!("Added list {} ({})", list.name, list.id);
    Ok(())
}

/// One task per line: checkbox, name, priority, schedule, id.
fn format_task_line(task: &Task) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{check} {}", task.name);
    if task.priority != Priority::None {
        line.push_str(&format!(" ({})", task.priority.as_str()));
    }
    if let Some(date) = task.date {
        line.push_str(&format!("  on {}", date.format("%Y-%m-%d")));
    }
    if let Some(deadline) = task.deadline {
        line.push_str(&format!("  due {}", deadline.format("%Y-%m-%d")));
    }
    line.push_str(&format!("  {}", task.id));
    line
}

/// Render one audit entry, decoding the canonical JSON values back to
/// something readable.
fn format_history_line(entry: &TaskHistory) -> Result<String> {
    let old = render_value(entry.old_value_json()?);
    let new = render_value(entry.new_value_json()?);
    Ok(format!(
        "{}  {}: {} -> {}",
        entry.changed_at.format("%Y-%m-%d %H:%M:%S"),
        entry.field.as_str(),
        old,
        new
    ))
}

fn render_value(value: Option<serde_json::Value>) -> String {
    match value {
        None => "(none)".to_string(),
        Some(serde_json::Value::String(text)) => text,
        Some(other) => other.to_string(),
    }
}
