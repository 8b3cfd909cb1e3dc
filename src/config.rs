use crate::table::TableName;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extension given to every database file derived from a name
pub const DATABASE_EXTENSION: &str = "db";

/// How long a connection waits on SQLite's lock before giving up
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SettingsConfig {
    pub database: Option<String>,
    pub table: Option<String>,
    pub busy_timeout_ms: Option<u64>,
}

impl SettingsConfig {
    /// Database file to open: the configured path, or the process default
    pub fn database_path(&self) -> Result<PathBuf> {
        match self.database.as_deref() {
            Some("") => Err(Error::InvalidArgument("database path must not be empty".to_string())),
            Some(path) => Ok(PathBuf::from(path)),
            None => default_database_path(),
        }
    }

    pub fn table_name(&self) -> Result<TableName> {
        match self.table.as_deref() {
            Some(table) => TableName::parse(table),
            None => Ok(TableName::default()),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("settingsdb.toml")
}

/// `<processName>.db`, where the process name is the stem of the running executable
pub fn default_database_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let stem = exe.file_stem().ok_or_else(|| {
        Error::InvalidArgument(format!("cannot derive a process name from {}", exe.display()))
    })?;
    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(DATABASE_EXTENSION);
    Ok(PathBuf::from(file_name))
}

/// Database file for a caller-supplied name: any extension is replaced by `.db`
pub fn database_path_for(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.file_stem().is_none() {
        return Err(Error::InvalidArgument(format!(
            "database name {:?} has no file name",
            name
        )));
    }
    Ok(path.with_extension(DATABASE_EXTENSION))
}

pub fn load_config(path: Option<&Path>) -> Result<Option<SettingsConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SettingsConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SettingsConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
