//! settingsdb CLI - inspect and edit settings databases from the shell

use clap::{Parser, Subcommand};
use serde_json::Value;
use settingsdb::config::{self, SettingsConfig};
use settingsdb::ui::{self, SettingRow};
use settingsdb::SettingsStore;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "settingsdb")]
#[command(version)]
#[command(about = "Typed key-value settings persisted in a single SQLite table")]
#[command(long_about = r#"
settingsdb reads and writes settings stored by applications in a SQLite
table of the shape (Id, Name, Value), with values encoded as JSON.

Example usage:
  settingsdb --database MyApp.db set Theme dark
  settingsdb --database MyApp.db set WindowSize '[1280, 720]'
  settingsdb --database MyApp.db get Theme
  settingsdb --database MyApp.db --table Machine list
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the database file (defaults to the config, then <processName>.db)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Settings table name
    #[arg(short, long, global = true)]
    table: Option<String>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a setting (value is parsed as JSON, otherwise kept as a string)
    Set {
        /// Setting name
        name: String,

        /// Setting value
        value: String,
    },

    /// Read a setting
    Get {
        /// Setting name
        name: String,

        /// Value to report when the setting is missing
        #[arg(long)]
        default: Option<String>,
    },

    /// Remove a setting
    Clear {
        /// Setting name
        name: String,
    },

    /// Remove every setting in the table
    ClearAll,

    /// Count stored settings
    Count,

    /// List every setting with its value
    List,

    /// Open the database and validate the settings table
    Check,

    /// Write a config file from the current options
    InitConfig {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

fn emit_success(output_mode: OutputMode, command: &str, data: Value) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string(&envelope)?);
    }
    Ok(())
}

fn emit_error(output_mode: OutputMode, err: &anyhow::Error) {
    if output_mode.is_human() {
        ui::error(&format!("{:#}", err));
    } else {
        let envelope = serde_json::json!({
            "ok": false,
            "error": format!("{:#}", err),
        });
        println!("{}", envelope);
    }
}

/// CLI value text: JSON when it parses, a plain string otherwise
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Config file settings overridden by command-line options
fn resolve_config(cli: &Cli) -> anyhow::Result<SettingsConfig> {
    let mut config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    if let Some(database) = &cli.database {
        config.database = Some(database.to_string_lossy().to_string());
    }
    if let Some(table) = &cli.table {
        config.table = Some(table.clone());
    }
    Ok(config)
}

fn open_store(config: &SettingsConfig) -> anyhow::Result<SettingsStore> {
    config::ensure_db_dir(&config.database_path()?)?;
    Ok(SettingsStore::from_config(config)?)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(err) = run(cli, output_mode).await {
        emit_error(output_mode, &err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Set { name, value } => {
            let store = open_store(&config)?;
            let value = parse_value(&value);
            tracing::debug!("Setting {} = {} in {}", name, value, store.path().display());

            store.store_async(&name, value.clone()).await?;

            if output_mode.is_human() {
                ui::success(&format!("{} = {}", name, ui::value_text(&value)));
            }
            emit_success(output_mode, "set", serde_json::json!({ "name": name, "value": value }))?;
        }

        Commands::Get { name, default } => {
            let store = open_store(&config)?;
            let default = default.as_deref().map(parse_value);
            let value: Option<Value> = store.read_async(&name, default).await?;

            if output_mode.is_human() {
                match &value {
                    Some(v) => println!("{}", ui::value_text(v)),
                    None => ui::warn(&format!("{} is not set", name)),
                }
            }
            emit_success(output_mode, "get", serde_json::json!({ "name": name, "value": value }))?;
        }

        Commands::Clear { name } => {
            let store = open_store(&config)?;
            store.clear_async(&name).await?;

            if output_mode.is_human() {
                ui::success(&format!("Cleared {}", name));
            }
            emit_success(output_mode, "clear", serde_json::json!({ "name": name }))?;
        }

        Commands::ClearAll => {
            let store = open_store(&config)?;
            let before = store.count_async().await?;
            store.clear_all_async().await?;

            if output_mode.is_human() {
                ui::success(&format!("Cleared {} setting(s) from {}", before, store.table()));
            }
            emit_success(output_mode, "clear-all", serde_json::json!({ "cleared": before }))?;
        }

        Commands::Count => {
            let store = open_store(&config)?;
            let count = store.count_async().await?;

            if output_mode.is_human() {
                println!("{}", count);
            }
            emit_success(output_mode, "count", serde_json::json!({ "count": count }))?;
        }

        Commands::List => {
            let store = open_store(&config)?;
            let mut rows = Vec::new();
            for name in store.names_async().await? {
                let value: Value = store.read_async(&name, Value::Null).await?;
                rows.push((name, value));
            }

            if output_mode.is_human() {
                if rows.is_empty() {
                    ui::warn(&format!("No settings in {}", store.table()));
                } else {
                    let table_rows: Vec<SettingRow> = rows
                        .iter()
                        .map(|(name, value)| SettingRow { name: name.clone(), value: ui::value_text(value) })
                        .collect();
                    println!("{}", ui::settings_table(&table_rows));
                }
            } else {
                let data: serde_json::Map<String, Value> = rows.into_iter().collect();
                emit_success(output_mode, "list", Value::Object(data))?;
            }
        }

        Commands::Check => {
            let store = open_store(&config)?;
            let count = store.count_async().await?;

            if output_mode.is_human() {
                ui::header("Settings database");
                ui::summary_row("Database:", &store.path().display().to_string());
                ui::summary_row("Table:", store.table().as_str());
                ui::summary_row("Settings:", &count.to_string());
                ui::success("Schema OK");
            }
            emit_success(
                output_mode,
                "check",
                serde_json::json!({
                    "database": store.path().display().to_string(),
                    "table": store.table().as_str(),
                    "count": count,
                }),
            )?;
        }

        Commands::InitConfig { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            config::write_config(&path, &config, force)?;

            if output_mode.is_human() {
                ui::success(&format!("Wrote {}", path.display()));
            }
            emit_success(output_mode, "init-config", serde_json::json!({ "path": path.display().to_string() }))?;
        }
    }

    Ok(())
}
