//! Resilience CLI - local-first habit tracker

use clap::{Parser, Subcommand};
use resilience_core::config::Config;
use resilience_core::habits::{
    Habit, HabitPatch, HabitRepository, HabitRepositoryTrait, HabitType, NewHabit,
};
use resilience_core::storage::{Database, DatabaseConfig};
use std::path::PathBuf;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "resilience")]
#[command(author, version, about = "Local-first habit tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (defaults to resilience.db in the private data directory)
    #[arg(long, global = true, env = "RESILIENCE_DATABASE")]
    database: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List habits
    List {
        /// Only archived habits
        #[arg(short, long)]
        archived: bool,
    },

    /// Create a habit
    Add {
        /// Habit name
        name: String,
        /// Habit type (build or quit)
        #[arg(short = 't', long = "type", default_value = "build")]
        habit_type: HabitType,
        /// Cloud account id
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Create a sample habit with a timestamped name
    Sample,

    /// Change a habit's name or type
    Update {
        /// Habit ID
        id: Uuid,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New type (build or quit)
        #[arg(short = 't', long = "type")]
        habit_type: Option<HabitType>,
    },

    /// Archive a habit
    Archive {
        /// Habit ID
        id: Uuid,
    },

    /// Restore an archived habit
    Unarchive {
        /// Habit ID
        id: Uuid,
    },

    /// Permanently delete an archived habit
    Delete {
        /// Habit ID
        id: Uuid,
    },

    /// Show database and configuration status
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.logging.filter.parse()?),
        )
        .init();

    // Config commands never touch the database
    if let Commands::Config { action } = cli.command {
        return cmd_config(action, cli.quiet);
    }

    let db_config = match &cli.database {
        Some(path) => DatabaseConfig::with_path(path).max_connections(config.storage.max_connections),
        None => config.database_config(),
    };
    let db = Database::new(db_config);

    // Nothing runs until the database is ready
    if let Err(e) = db.acquire().await {
        error!(error = %e, code = e.code(), "Error initializing database");
        if let Some(suggestion) = e.suggestion() {
            eprintln!("Hint: {}", suggestion);
        }
        return Err(e.into());
    }
    info!(path = %db.path().display(), "Database initialized");

    let repo: Box<dyn HabitRepositoryTrait> = Box::new(HabitRepository::new(db.clone()));
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::List { archived } => cmd_list(repo.as_ref(), archived, out).await,

        Commands::Add {
            name,
            habit_type,
            user,
        } => {
            let mut input = NewHabit::new(name, habit_type);
            if let Some(user) = user {
                input = input.with_user(user);
            }
            cmd_add(repo.as_ref(), input, out).await
        }

        Commands::Sample => {
            let name = format!("Sample Habit {}", chrono::Utc::now().timestamp_millis());
            cmd_add(repo.as_ref(), NewHabit::new(name, HabitType::Build), out).await
        }

        Commands::Update {
            id,
            name,
            habit_type,
        } => cmd_update(repo.as_ref(), id, HabitPatch { name, habit_type }, out).await,

        Commands::Archive { id } => cmd_archive(repo.as_ref(), id, true, out).await,

        Commands::Unarchive { id } => cmd_archive(repo.as_ref(), id, false, out).await,

        Commands::Delete { id } => cmd_delete(repo.as_ref(), id, out).await,

        Commands::Status => cmd_status(&db, repo.as_ref(), &config, out).await,

        Commands::Config { action } => cmd_config(action, cli.quiet),
    };

    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    db.close().await;
    result
}

// ============================================================================
// Output
// ============================================================================

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn message(&self, text: &str) {
        if !self.quiet && self.format == OutputFormat::Text {
            println!("{}", text);
        }
    }

    fn habits(&self, habits: &[Habit]) -> anyhow::Result<()> {
        if self.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(habits)?);
            return Ok(());
        }

        if habits.is_empty() {
            if !self.quiet {
                println!("No habits found");
            }
            return Ok(());
        }

        if !self.quiet {
            println!("Habits:");
        }
        for h in habits {
            let archived = if h.archived { " [archived]" } else { "" };
            println!("  {} - {} ({}){}", h.id, h.name, h.habit_type, archived);
        }
        Ok(())
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_list(repo: &dyn HabitRepositoryTrait, archived: bool, out: Output) -> anyhow::Result<()> {
    let habits = if archived {
        repo.read_archived().await?
    } else {
        repo.read_all().await?
    };
    out.habits(&habits)
}

async fn cmd_add(repo: &dyn HabitRepositoryTrait, input: NewHabit, out: Output) -> anyhow::Result<()> {
    let id = repo.create(input).await?;
    info!(habit_id = %id, "Habit created");
    out.message(&format!("Habit created with id: {}", id));
    refresh(repo, out).await
}

async fn cmd_update(
    repo: &dyn HabitRepositoryTrait,
    id: Uuid,
    patch: HabitPatch,
    out: Output,
) -> anyhow::Result<()> {
    if patch.is_empty() {
        out.message("Nothing to update. Pass --name and/or --type.");
        return Ok(());
    }
    repo.update(id, patch).await?;
    out.message(&format!("Habit {} updated.", id));
    refresh(repo, out).await
}

async fn cmd_archive(
    repo: &dyn HabitRepositoryTrait,
    id: Uuid,
    archived: bool,
    out: Output,
) -> anyhow::Result<()> {
    if archived {
        repo.archive(id).await?;
        out.message(&format!("Habit {} archived.", id));
    } else {
        repo.unarchive(id).await?;
        out.message(&format!("Habit {} restored.", id));
    }
    refresh(repo, out).await
}

async fn cmd_delete(repo: &dyn HabitRepositoryTrait, id: Uuid, out: Output) -> anyhow::Result<()> {
    repo.delete(id).await?;
    out.message(&format!("Habit {} deleted.", id));
    refresh(repo, out).await
}

/// Re-fetch the full list after a write
async fn refresh(repo: &dyn HabitRepositoryTrait, out: Output) -> anyhow::Result<()> {
    let habits = repo.read_all().await?;
    out.habits(&habits)
}

async fn cmd_status(
    db: &Database,
    repo: &dyn HabitRepositoryTrait,
    config: &Config,
    out: Output,
) -> anyhow::Result<()> {
    db.health_check().await?;
    let schema = db.schema_status().await?;
    let total = repo.read_all().await?.len();
    let archived = repo.read_archived().await?.len();

    if out.format == OutputFormat::Json {
        let settings: serde_json::Map<String, serde_json::Value> = config
            .list()?
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        let status = serde_json::json!({
            "database": db.path().display().to_string(),
            "ready": db.is_ready(),
            "schemaVersion": schema.current_version,
            "habits": total,
            "archived": archived,
            "config": settings,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Database: {}", db.path().display());
    println!("  Ready: {}", db.is_ready());
    println!(
        "  Schema: v{} (target v{})",
        schema.current_version, schema.target_version
    );
    println!("  Habits: {} ({} archived)", total, archived);
    if !out.quiet {
        println!("\nConfiguration:");
        for (key, value) in config.list()? {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            for (key, value) in Config::load()?.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}
