use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use glasstodo::config::{AppConfig, Backend, default_config_path};
use glasstodo::models::{SETTINGS_KEY, TODOS_KEY};
use glasstodo::{
    CategoryStore, EDIT_DIALOG_MAX_TEXT_LEN, FileStorage, MemoryStorage, SettingsStore, SortOrder, SqliteStorage,
    Storage, StoreError, Todo, TodoFilter, TodoQuery, TodoStore, snapshot,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glasstodo")]
#[command(about = "glasstodo - Todo list with categories, settings and JSON backups")]
#[command(version)]
struct Cli {
    /// Path to the config file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the backing store (overrides config)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Backing store kind (overrides config)
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a todo
    Add {
        #[arg(required = true)]
        text: Vec<String>,

        /// Category id to file the todo under
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Replace a todo's text
    Edit {
        id: String,

        #[arg(required = true)]
        text: Vec<String>,

        /// Apply the shorter edit-dialog length limit
        #[arg(long)]
        dialog: bool,
    },

    /// Flip a todo between pending and completed
    Toggle { id: String },

    /// Move a todo to another category
    Assign {
        id: String,

        /// Category id; omit to reset to the fallback category
        category: Option<String>,
    },

    /// Remove a todo
    Rm { id: String },

    /// Remove all completed todos
    ClearCompleted,

    /// Remove all todos
    ClearAll,

    /// List todos
    List {
        /// all, completed or pending
        #[arg(short, long)]
        filter: Option<TodoFilter>,

        /// createdAt-desc, createdAt-asc, updatedAt-desc, alphabetical or completion
        #[arg(long)]
        sort: Option<SortOrder>,

        /// Case-insensitive text search
        #[arg(long)]
        search: Option<String>,

        /// Only todos in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show completion statistics
    Stats,

    /// Write a backup file with todos and settings
    Export {
        /// Output file (default: todo-backup-YYYY-MM-DD.json)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace todos (and settings, when present) from a backup file
    Import { file: PathBuf },

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },

    /// Manage settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Delete all todos and settings from the backing store
    Wipe,
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// List categories with their todo counts
    List,

    /// Add a category
    Add {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        color: Option<String>,
    },

    /// Rename a category
    Edit {
        id: String,
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a category, moving its todos to the fallback category
    Rm { id: String },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print current settings
    Show,

    /// Set one option, e.g. `set theme dark`
    Set { name: String, value: String },

    /// Restore defaults
    Reset,
}

fn main() -> Result<()> {
    // Setup tracing; keep stdout for command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load(&config_path)?;
    if let Some(path) = cli.store_path {
        config.store_path = Some(path);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let storage = open_storage(config.backend, &config.resolved_store_path());
    let mut todos = TodoStore::open(storage.clone(), config.store_config());
    report(todos.take_warning());

    match cli.command {
        Commands::Add { text, category } => {
            let todo = match category {
                Some(category) => {
                    let categories = CategoryStore::open(storage.clone());
                    categories.require(&category)?;
                    let todo = todos.add(&text.join(" "))?;
                    categories.assign(&mut todos, &todo.id, Some(&category))?
                }
                None => todos.add(&text.join(" "))?,
            };
            println!("{} {}", "Added".green(), format_todo(&todo));
        }
        Commands::Edit { id, text, dialog } => {
            let id = resolve_id(&todos, &id)?;
            let text = text.join(" ");
            let todo = if dialog {
                todos.update_with_limit(&id, &text, EDIT_DIALOG_MAX_TEXT_LEN)?
            } else {
                todos.update(&id, &text)?
            };
            println!("{} {}", "Updated".green(), format_todo(&todo));
        }
        Commands::Toggle { id } => {
            let id = resolve_id(&todos, &id)?;
            let todo = todos.toggle_completion(&id)?;
            println!("{}", format_todo(&todo));
        }
        Commands::Assign { id, category } => {
            let categories = CategoryStore::open(storage.clone());
            let id = resolve_id(&todos, &id)?;
            let todo = categories.assign(&mut todos, &id, category.as_deref())?;
            println!("{}", format_todo(&todo));
        }
        Commands::Rm { id } => {
            let id = resolve_id(&todos, &id)?;
            if let Some(todo) = todos.remove(&id) {
                println!("{} {}", "Removed".red(), todo.text);
            }
        }
        Commands::ClearCompleted => {
            let removed = todos.clear_completed();
            println!("Removed {} completed todo(s)", removed);
        }
        Commands::ClearAll => {
            let removed = todos.clear_all();
            println!("Removed {} todo(s)", removed);
        }
        Commands::List {
            filter,
            sort,
            search,
            category,
        } => {
            let settings = SettingsStore::open(storage.clone());
            // Hide completed todos unless asked for explicitly
            let filter = filter.unwrap_or(if settings.settings().show_completed {
                TodoFilter::All
            } else {
                TodoFilter::Pending
            });

            let query = TodoQuery {
                filter,
                sort: sort.unwrap_or_default(),
                search,
                category,
            };
            let results = todos.query(&query);
            if results.is_empty() {
                println!("{}", "No todos".dimmed());
            }
            for todo in results {
                println!("{}", format_todo(todo));
            }
        }
        Commands::Stats => {
            let stats = todos.stats();
            println!("Total:     {}", stats.total);
            println!("Completed: {}", stats.completed.to_string().green());
            println!("Pending:   {}", stats.pending.to_string().yellow());
            println!("Progress:  {}%", stats.completion_rate_percent);
        }
        Commands::Export { out } => {
            let settings = SettingsStore::open(storage.clone());
            let blob = todos.export_snapshot(Some(settings.settings()))?;
            let out = out.unwrap_or_else(|| PathBuf::from(snapshot::file_name(Local::now().date_naive())));
            fs::write(&out, blob).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Exported {} todo(s) to {}", todos.todos().len(), out.display());
        }
        Commands::Import { file } => {
            let blob = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let snapshot = todos.import_snapshot(&blob)?;
            if let Some(imported) = snapshot.settings {
                let mut settings = SettingsStore::open(storage.clone());
                settings.replace(imported);
                report(settings.take_warning());
            }
            println!("Imported {} todo(s)", snapshot.todos.len());
            if snapshot.dropped > 0 {
                println!("{} {} invalid record(s) skipped", "warning:".yellow(), snapshot.dropped);
            }
        }
        Commands::Category { command } => run_category(command, storage.clone(), &mut todos)?,
        Commands::Settings { command } => run_settings(command, storage.clone())?,
        Commands::Wipe => {
            storage.remove(TODOS_KEY)?;
            storage.remove(SETTINGS_KEY)?;
            println!("Removed all todos and settings");
        }
    }

    report(todos.take_warning());
    Ok(())
}

fn run_category(command: CategoryCommand, storage: Rc<dyn Storage>, todos: &mut TodoStore) -> Result<()> {
    let mut categories = CategoryStore::open(storage);
    report(categories.take_warning());

    match command {
        CategoryCommand::List => {
            for category in categories.categories() {
                println!(
                    "{:<12} {:<16} {:>3}  {}",
                    category.id.dimmed(),
                    category.name.cyan(),
                    categories.count_for(&category.id, todos),
                    category.description.as_deref().unwrap_or("")
                );
            }
        }
        CategoryCommand::Add {
            name,
            description,
            color,
        } => {
            let category = categories.add(&name, description.as_deref(), color.as_deref())?;
            println!("{} {} ({})", "Added".green(), category.name, category.id);
        }
        CategoryCommand::Edit { id, name, description } => {
            let category = categories.edit(&id, &name, description.as_deref())?;
            println!("{} {}", "Updated".green(), category.name);
        }
        CategoryCommand::Rm { id } => {
            let moved = categories.remove(&id, todos)?;
            println!("{} {}, moved {} todo(s)", "Removed".red(), id, moved);
        }
    }

    report(categories.take_warning());
    Ok(())
}

fn run_settings(command: SettingsCommand, storage: Rc<dyn Storage>) -> Result<()> {
    let mut settings = SettingsStore::open(storage);
    report(settings.take_warning());

    match command {
        SettingsCommand::Show => {
            println!("{}", serde_json::to_string_pretty(settings.settings())?);
        }
        SettingsCommand::Set { name, value } => {
            settings.set(&name, &value)?;
            println!("{} = {}", name, value);
        }
        SettingsCommand::Reset => {
            settings.reset();
            println!("Settings restored to defaults");
        }
    }

    report(settings.take_warning());
    Ok(())
}

/// Open the configured backing store, degrading to memory if it cannot be opened
fn open_storage(backend: Backend, path: &Path) -> Rc<dyn Storage> {
    let opened: glasstodo::Result<Rc<dyn Storage>> = match backend {
        Backend::File => FileStorage::open(path).map(|s| Rc::new(s) as Rc<dyn Storage>),
        Backend::Sqlite => fs::create_dir_all(path)
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))
            .and_then(|_| SqliteStorage::open(path.join("glasstodo.db")))
            .map(|s| Rc::new(s) as Rc<dyn Storage>),
    };

    match opened {
        Ok(storage) => storage,
        Err(err) => {
            warn!(error = %err, path = ?path, "Backing store unavailable, changes will not be saved");
            report(Some(err));
            Rc::new(MemoryStorage::new())
        }
    }
}

/// Match a full id, or a unique prefix or suffix of one
fn resolve_id(todos: &TodoStore, needle: &str) -> Result<String> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Err(eyre!("Todo id cannot be empty"));
    }
    if todos.get(needle).is_some() {
        return Ok(needle.to_string());
    }

    let matches: Vec<&Todo> = todos
        .todos()
        .iter()
        .filter(|t| t.id.starts_with(needle) || t.id.ends_with(needle))
        .collect();

    match matches.as_slice() {
        [todo] => Ok(todo.id.clone()),
        [] => Err(StoreError::NotFound(needle.to_string()).into()),
        _ => Err(eyre!("Ambiguous id {}: matches {} todos", needle, matches.len())),
    }
}

fn short_id(id: &str) -> &str {
    let start = id.len().saturating_sub(8);
    id.get(start..).unwrap_or(id)
}

fn format_todo(todo: &Todo) -> String {
    let check = if todo.completed { "[x]".green() } else { "[ ]".normal() };
    let text = if todo.completed {
        todo.text.strikethrough().dimmed()
    } else {
        todo.text.normal()
    };

    format!(
        "{} {} {} {}",
        check,
        short_id(&todo.id).dimmed(),
        text,
        format!("#{}", todo.category_id()).cyan()
    )
}

fn report(warning: Option<StoreError>) {
    if let Some(err) = warning {
        eprintln!("{} {}", "warning:".yellow(), err);
    }
}
