//! Table names - validated SQL identifiers for settings tables
//!
//! A table name is the only piece of configuration that ends up inside SQL
//! text. It is checked once when the store is built and always rendered
//! through [`TableName::quoted`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the table used when none is configured
pub const DEFAULT_TABLE: &str = "Settings";

/// Validated name of a settings table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Parse and validate a table name
    ///
    /// Rejects empty names, names containing NUL and names in the
    /// `sqlite_` namespace, which SQLite reserves for its own tables.
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("table name must not be empty".to_string()));
        }

        if name.contains('\0') {
            return Err(Error::InvalidArgument(format!(
                "table name {:?} contains a NUL character",
                name
            )));
        }

        if name
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"))
        {
            return Err(Error::InvalidArgument(format!(
                "table name {:?} uses the reserved sqlite_ prefix",
                name
            )));
        }

        Ok(Self(name.to_string()))
    }

    /// The raw, unquoted name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as a double-quoted SQL identifier
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for TableName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TableName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TableName::parse(&s).map_err(serde::de::Error::custom)
    }
}
