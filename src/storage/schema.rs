//! Settings table schema and statement templates
//!
//! Statements that name the settings table are built from a
//! [`TableName`], which quotes the identifier. Everything else is bound
//! as a parameter.

use crate::table::TableName;

/// Columns a settings table must have, each exactly once
pub const EXPECTED_COLUMNS: [&str; 3] = ["Id", "Name", "Value"];

/// SQL to create a settings table
pub fn create_table(table: &TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (Id INTEGER, Name TEXT UNIQUE NOT NULL, Value TEXT, PRIMARY KEY(Id))",
        table.quoted()
    )
}

/// SQL listing the column names of a table; the table name is bound as `?1`
pub const TABLE_COLUMNS: &str = "SELECT name FROM pragma_table_info(?1)";

/// SQL to insert or overwrite a setting
pub fn upsert(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (Name, Value) VALUES (?1, ?2) ON CONFLICT(Name) DO UPDATE SET Value = excluded.Value",
        table.quoted()
    )
}

/// SQL to read a setting's value
pub fn select_value(table: &TableName) -> String {
    format!("SELECT Value FROM {} WHERE Name = ?1", table.quoted())
}

/// SQL to check whether a setting exists
pub fn exists(table: &TableName) -> String {
    format!("SELECT EXISTS(SELECT 1 FROM {} WHERE Name = ?1)", table.quoted())
}

/// SQL listing setting names in insertion order
pub fn select_names(table: &TableName) -> String {
    format!("SELECT Name FROM {} ORDER BY Id", table.quoted())
}

/// SQL to delete one setting
pub fn delete_one(table: &TableName) -> String {
    format!("DELETE FROM {} WHERE Name = ?1", table.quoted())
}

/// SQL to delete every setting
pub fn delete_all(table: &TableName) -> String {
    format!("DELETE FROM {}", table.quoted())
}

/// SQL to count settings
pub fn count(table: &TableName) -> String {
    format!("SELECT COUNT(*) FROM {}", table.quoted())
}

/// Check a table's column names against [`EXPECTED_COLUMNS`]
pub fn columns_match(columns: &[String]) -> bool {
    columns.len() == EXPECTED_COLUMNS.len()
        && EXPECTED_COLUMNS
            .iter()
            .all(|expected| columns.iter().filter(|c| c.as_str() == *expected).count() == 1)
}
