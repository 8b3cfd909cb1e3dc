//! SQLite storage implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use super::schema;
use crate::codec::{JsonCodec, ValueCodec};
use crate::config::{self, SettingsConfig, DEFAULT_BUSY_TIMEOUT_MS};
use crate::table::TableName;
use crate::{Error, Result};

/// Settings persisted in one table of a SQLite file.
///
/// The store only remembers where its table lives. Every operation opens a
/// fresh connection, runs a single statement and drops the connection
/// before returning, so clones of a store are independent handles onto the
/// same table.
#[derive(Debug, Clone)]
pub struct SettingsStore<C: ValueCodec = JsonCodec> {
    path: PathBuf,
    table: TableName,
    codec: C,
    busy_timeout: Duration,
}

impl SettingsStore<JsonCodec> {
    /// Open `<processName>.db` with the default table
    pub fn open_default() -> Result<Self> {
        Self::open(config::default_database_path()?)
    }

    /// Open the database named `name` (extension replaced by `.db`) with the default table
    pub fn named(name: &str) -> Result<Self> {
        Self::open(config::database_path_for(name)?)
    }

    /// Open a database file (creates if doesn't exist) with the default table
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, TableName::default(), JsonCodec)
    }

    /// Open a database file using the given table
    pub fn open_table(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        Self::open_with(path, TableName::parse(table)?, JsonCodec)
    }

    /// Open the database and table described by a config
    pub fn from_config(config: &SettingsConfig) -> Result<Self> {
        let store = Self {
            path: config.database_path()?,
            table: config.table_name()?,
            codec: JsonCodec,
            busy_timeout: config.busy_timeout(),
        };
        store.check_path()?;
        store.initialize_schema()?;
        Ok(store)
    }
}

impl<C: ValueCodec> SettingsStore<C> {
    /// Open a database file with an explicit table and value codec
    pub fn open_with(path: impl AsRef<Path>, table: TableName, codec: C) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            table,
            codec,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        };
        store.check_path()?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Table holding the settings
    pub fn table(&self) -> &TableName {
        &self.table
    }

    fn check_path(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("database path must not be empty".to_string()));
        }
        Ok(())
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Create the settings table if needed and verify its shape
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(&schema::create_table(&self.table), [])?;

        let mut stmt = conn.prepare(schema::TABLE_COLUMNS)?;
        let columns = stmt
            .query_map([self.table.as_str()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        if !schema::columns_match(&columns) {
            return Err(Error::SchemaMismatch { table: self.table.to_string() });
        }

        tracing::debug!("Settings table {} ready in {}", self.table, self.path.display());
        Ok(())
    }

    // ========== Setting Operations ==========

    /// Insert a setting, or overwrite its value if the name already exists
    pub fn store<T>(&self, name: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        check_name(name)?;
        let text = self.codec.encode(value)?;

        let conn = self.connect()?;
        conn.execute(&schema::upsert(&self.table), params![name, text])?;

        tracing::debug!("Stored {} in {}", name, self.table);
        Ok(())
    }

    /// Read a setting, or return `default` if it was never stored
    pub fn read<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned,
    {
        check_name(name)?;

        let stored: Option<Option<String>> = {
            let conn = self.connect()?;
            conn.query_row(&schema::select_value(&self.table), [name], |row| row.get(0))
                .optional()?
        };

        match stored {
            // A NULL value reads as JSON null
            Some(text) => self.codec.decode(text.as_deref().unwrap_or("null")),
            None => {
                tracing::debug!("{} not found in {}, using default", name, self.table);
                Ok(default)
            }
        }
    }

    /// Read a setting, falling back to the type's default value
    pub fn read_or_default<T>(&self, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        self.read(name, T::default())
    }

    /// Check whether a setting exists
    pub fn contains(&self, name: &str) -> Result<bool> {
        check_name(name)?;
        let conn = self.connect()?;
        let exists: bool = conn.query_row(&schema::exists(&self.table), [name], |row| row.get(0))?;
        Ok(exists)
    }

    /// Names of all stored settings, oldest first
    pub fn names(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&schema::select_names(&self.table))?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Delete a setting; deleting a missing setting is a no-op
    pub fn clear(&self, name: &str) -> Result<()> {
        check_name(name)?;
        let conn = self.connect()?;
        let removed = conn.execute(&schema::delete_one(&self.table), [name])?;
        tracing::debug!("Cleared {} from {} ({} row(s))", name, self.table, removed);
        Ok(())
    }

    /// Delete every setting in the table
    pub fn clear_all(&self) -> Result<()> {
        let conn = self.connect()?;
        let removed = conn.execute(&schema::delete_all(&self.table), [])?;
        tracing::debug!("Cleared {} setting(s) from {}", removed, self.table);
        Ok(())
    }

    /// Count stored settings
    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(&schema::count(&self.table), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ========== Async Wrappers ==========
    //
    // Each wrapper runs the blocking call above on Tokio's blocking pool.

    async fn run_blocking<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&Self) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store)).await?
    }

    pub async fn store_async<T>(&self, name: &str, value: T) -> Result<()>
    where
        T: Serialize + Send + 'static,
    {
        let name = name.to_string();
        self.run_blocking(move |store| store.store(&name, &value)).await
    }

    pub async fn read_async<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let name = name.to_string();
        self.run_blocking(move |store| store.read(&name, default)).await
    }

    pub async fn read_or_default_async<T>(&self, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let name = name.to_string();
        self.run_blocking(move |store| store.read_or_default(&name)).await
    }

    pub async fn contains_async(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.run_blocking(move |store| store.contains(&name)).await
    }

    pub async fn names_async(&self) -> Result<Vec<String>> {
        self.run_blocking(|store| store.names()).await
    }

    pub async fn clear_async(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.run_blocking(move |store| store.clear(&name)).await
    }

    pub async fn clear_all_async(&self) -> Result<()> {
        self.run_blocking(|store| store.clear_all()).await
    }

    pub async fn count_async(&self) -> Result<u64> {
        self.run_blocking(|store| store.count()).await
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("setting name must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct WindowLayout {
        width: i32,
        panels: Vec<String>,
    }

    impl Default for WindowLayout {
        fn default() -> Self {
            Self { width: 1, panels: vec!["value1".to_string(), "value2".to_string()] }
        }
    }

    fn temp_store() -> (TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Test.db");

        let store = SettingsStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.table().as_str(), "Settings");
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_named_replaces_extension() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("Test.cfg");

        let store = SettingsStore::named(name.to_str().unwrap()).unwrap();
        assert_eq!(store.path(), dir.path().join("Test.db"));
        assert!(dir.path().join("Test.db").exists());
    }

    #[test]
    fn test_scalar_roundtrip() {
        let (_dir, store) = temp_store();

        store.store("String", "test value").unwrap();
        store.store("Boolean", &true).unwrap();
        store.store("Int32", &12345i32).unwrap();
        store.store("Int64", &12345i64).unwrap();
        store.store("Float", &0.5f64).unwrap();

        assert_eq!(store.read("String", String::new()).unwrap(), "test value");
        assert!(store.read("Boolean", false).unwrap());
        assert_eq!(store.read("Int32", 0i32).unwrap(), 12345);
        assert_eq!(store.read("Int64", 0i64).unwrap(), 12345);
        assert_eq!(store.read("Float", 0.0f64).unwrap(), 0.5);
    }

    #[test]
    fn test_sequence_and_object_roundtrip() {
        let (_dir, store) = temp_store();

        let bytes: Vec<u8> = vec![14, 34, 2, 54, 3];
        let ints: Vec<i32> = vec![14, 34, 2, 54, 3];
        let layout = WindowLayout::default();

        store.store("ByteArray", &bytes).unwrap();
        store.store("Int32Array", &ints).unwrap();
        store.store("ArbitraryObject", &layout).unwrap();

        assert_eq!(store.read::<Vec<u8>>("ByteArray", vec![]).unwrap(), bytes);
        assert_eq!(store.read::<Vec<i32>>("Int32Array", vec![]).unwrap(), ints);
        assert_eq!(store.read_or_default::<WindowLayout>("ArbitraryObject").unwrap(), layout);
    }

    #[test]
    fn test_missing_returns_default() {
        let (_dir, store) = temp_store();

        assert_eq!(store.read("Missing", "fallback".to_string()).unwrap(), "fallback");
        assert_eq!(store.read("Missing", 42u16).unwrap(), 42);
        assert_eq!(store.read_or_default::<Vec<u8>>("Missing").unwrap(), Vec::<u8>::new());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_store_overwrites() {
        let (_dir, store) = temp_store();

        store.store("Theme", "light").unwrap();
        store.store("Theme", "dark").unwrap();

        assert_eq!(store.read("Theme", String::new()).unwrap(), "dark");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_overwrite_with_different_type() {
        let (_dir, store) = temp_store();

        store.store("Mixed", &7).unwrap();
        store.store("Mixed", &vec!["a", "b"]).unwrap();

        assert_eq!(store.read::<Vec<String>>("Mixed", vec![]).unwrap(), vec!["a", "b"]);
        assert!(matches!(store.read("Mixed", 0i32), Err(Error::Deserialization(_))));
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let (_dir, store) = temp_store();

        store.store("Name", "not a number").unwrap();
        let err = store.read("Name", 0i32).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_clear() {
        let (_dir, store) = temp_store();

        store.store("Setting1", &1).unwrap();
        store.store("Setting2", &2).unwrap();

        store.clear("Setting1").unwrap();
        assert_eq!(store.read("Setting1", -1).unwrap(), -1);
        assert!(!store.contains("Setting1").unwrap());
        assert!(store.contains("Setting2").unwrap());

        // absent names are a no-op
        store.clear("Setting1").unwrap();
        store.clear("NeverStored").unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_count_and_clear_all() {
        let (_dir, store) = temp_store();

        store.clear_all().unwrap();
        store.store("Setting1", &1).unwrap();
        store.store("Setting2", &2).unwrap();
        store.store("Setting3", &3).unwrap();
        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(store.names().unwrap(), vec!["Setting1", "Setting2", "Setting3"]);

        store.clear_all().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.names().unwrap().is_empty());

        // already empty
        store.clear_all().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_empty_name_rejected() {
        let (_dir, store) = temp_store();

        assert!(matches!(store.store("", &1), Err(Error::InvalidArgument(_))));
        assert!(matches!(store.read("", 1), Err(Error::InvalidArgument(_))));
        assert!(matches!(store.clear(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(store.contains(""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_location_and_table() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(SettingsStore::open(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            SettingsStore::open_table(dir.path().join("s.db"), ""),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");

        {
            let store = SettingsStore::open(&path).unwrap();
            store.store("Volume", &11).unwrap();
        }

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.read("Volume", 0).unwrap(), 11);
    }

    #[test]
    fn test_tables_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");

        let user = SettingsStore::open_table(&path, "User").unwrap();
        let machine = SettingsStore::open_table(&path, "Machine \"local\"").unwrap();

        user.store("Theme", "dark").unwrap();
        machine.store("Theme", "light").unwrap();
        machine.store("Cores", &8).unwrap();

        assert_eq!(user.read("Theme", String::new()).unwrap(), "dark");
        assert_eq!(machine.read("Theme", String::new()).unwrap(), "light");
        assert_eq!(user.count().unwrap(), 1);
        assert_eq!(machine.count().unwrap(), 2);

        machine.clear_all().unwrap();
        assert_eq!(user.count().unwrap(), 1);
    }

    #[test]
    fn test_schema_mismatch_leaves_table_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE Settings (Id INTEGER PRIMARY KEY, Name TEXT UNIQUE NOT NULL);
                 INSERT INTO Settings (Name) VALUES ('kept');",
            )
            .unwrap();
        }

        let err = SettingsStore::open(&path).unwrap_err();
        match err {
            Error::SchemaMismatch { table } => assert_eq!(table, "Settings"),
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }

        let conn = Connection::open(&path).unwrap();
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM Settings", [], |row| row.get(0)).unwrap();
        assert_eq!(rows, 1);

        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('Settings')").unwrap();
        let columns: Vec<String> =
            stmt.query_map([], |row| row.get(0)).unwrap().filter_map(|r| r.ok()).collect();
        assert_eq!(columns, vec!["Id", "Name"]);
    }

    #[test]
    fn test_schema_mismatch_extra_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.db");

        Connection::open(&path)
            .unwrap()
            .execute(
                "CREATE TABLE Prefs (Id INTEGER PRIMARY KEY, Name TEXT, Value TEXT, Updated TEXT)",
                [],
            )
            .unwrap();

        assert!(matches!(
            SettingsStore::open_table(&path, "Prefs"),
            Err(Error::SchemaMismatch { .. })
        ));
        // a different table in the same file is fine
        assert!(SettingsStore::open_table(&path, "Settings").is_ok());
    }

    #[test]
    fn test_null_value_reads_as_json_null() {
        let (_dir, store) = temp_store();

        Connection::open(store.path())
            .unwrap()
            .execute("INSERT INTO Settings (Name, Value) VALUES ('Empty', NULL)", [])
            .unwrap();

        assert_eq!(store.read::<Option<i32>>("Empty", Some(5)).unwrap(), None);
        assert!(matches!(store.read("Empty", 5i32), Err(Error::Deserialization(_))));
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configured.db");

        let config = SettingsConfig {
            database: Some(path.to_string_lossy().to_string()),
            table: Some("AppPrefs".to_string()),
            busy_timeout_ms: Some(100),
        };
        let store = SettingsStore::from_config(&config).unwrap();
        assert_eq!(store.path(), path);
        assert_eq!(store.table().as_str(), "AppPrefs");

        store.store("Answer", &42).unwrap();
        let direct = SettingsStore::open_table(&path, "AppPrefs").unwrap();
        assert_eq!(direct.read("Answer", 0).unwrap(), 42);
    }

    #[test]
    fn test_custom_codec() {
        #[derive(Debug, Clone)]
        struct PrettyJson;

        impl ValueCodec for PrettyJson {
            fn encode<T>(&self, value: &T) -> Result<String>
            where
                T: Serialize + ?Sized,
            {
                serde_json::to_string_pretty(value).map_err(Error::Serialization)
            }

            fn decode<T>(&self, text: &str) -> Result<T>
            where
                T: DeserializeOwned,
            {
                serde_json::from_str(text).map_err(Error::Deserialization)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pretty.db");
        let store = SettingsStore::open_with(&path, TableName::default(), PrettyJson).unwrap();

        store.store("Layout", &WindowLayout::default()).unwrap();
        assert_eq!(store.read_or_default::<WindowLayout>("Layout").unwrap(), WindowLayout::default());

        let raw: String = Connection::open(&path)
            .unwrap()
            .query_row("SELECT Value FROM Settings WHERE Name = 'Layout'", [], |row| row.get(0))
            .unwrap();
        assert!(raw.contains('\n'));
    }

    #[test]
    fn test_concurrent_writers() {
        let (_dir, store) = temp_store();

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        store.store(&format!("w{}-{}", worker, i), &i).unwrap();
                        store.store("shared", &worker).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.count().unwrap(), 41);
        let last: i32 = store.read("shared", -1).unwrap();
        assert!((0..4).contains(&last));
    }

    // ========== Async ==========

    #[tokio::test]
    async fn test_async_roundtrip() {
        let (_dir, store) = temp_store();

        store.store_async("Int32", 12345).await.unwrap();
        store.store_async("ByteArray", vec![14u8, 34, 2, 54, 3]).await.unwrap();

        assert_eq!(store.read_async("Int32", 0i32).await.unwrap(), 12345);
        assert_eq!(
            store.read_async::<Vec<u8>>("ByteArray", vec![]).await.unwrap(),
            vec![14, 34, 2, 54, 3]
        );
        assert_eq!(
            store.read_async("Missing", "fallback".to_string()).await.unwrap(),
            "fallback"
        );
        assert_eq!(store.read_or_default_async::<u32>("Missing").await.unwrap(), 0);
        assert!(store.contains_async("Int32").await.unwrap());
    }

    #[tokio::test]
    async fn test_async_clear_and_count() {
        let (_dir, store) = temp_store();

        store.clear_all_async().await.unwrap();
        store.store_async("Setting1", 1).await.unwrap();
        store.store_async("Setting2", 2).await.unwrap();
        store.store_async("Setting3", 3).await.unwrap();
        assert_eq!(store.count_async().await.unwrap(), 3);
        assert_eq!(store.names_async().await.unwrap().len(), 3);

        store.clear_async("Setting2").await.unwrap();
        assert_eq!(store.count_async().await.unwrap(), 2);
        assert_eq!(store.read_async("Setting2", -1).await.unwrap(), -1);

        store.clear_all_async().await.unwrap();
        assert_eq!(store.count_async().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_async_errors_match_sync() {
        let (_dir, store) = temp_store();

        store.store_async("Text", "abc").await.unwrap();
        assert!(matches!(store.read_async("Text", 0i64).await, Err(Error::Deserialization(_))));
        assert!(matches!(store.store_async("", 1).await, Err(Error::InvalidArgument(_))));
        assert!(matches!(store.clear_async("").await, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_concurrent_stores() {
        let (_dir, store) = temp_store();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.store_async(&format!("k{}", i), i).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.count_async().await.unwrap(), 8);
    }
}
