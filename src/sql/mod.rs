//! SQL rendering primitives shared by every backend adapter
//!
//! - [`Dialect`]: literal and identifier quoting
//! - [`TableRef`]: schema-qualified table names
//! - [`Statement`]: SQL text plus positional bindings handed to the executor
//! - [`builder`]: statement shapes that only differ by quoting between dialects

pub mod builder;
pub mod quote;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use quote::Dialect;

/// A possibly schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Schema (dataset on BigQuery); `None` for session-scoped temp tables
    pub schema: Option<String>,
    /// Table name
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Render the fully quoted name, `"schema"."table"`
    pub fn quoted(&self, dialect: Dialect) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{}.{}",
                dialect.quote_identifier(schema),
                dialect.quote_identifier(&self.name)
            ),
            None => dialect.quote_identifier(&self.name),
        }
    }

    /// Same schema, different table name
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self {
            schema: self.schema.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// SQL text ready for execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    /// Positional bindings for `?` placeholders
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<serde_json::Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }

    pub fn with_bindings(sql: impl Into<String>, bindings: Vec<serde_json::Value>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Statement::new(sql)
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Statement::new(sql)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ref_quoting() {
        let table = TableRef::new("schema", "table");
        assert_eq!(table.quoted(Dialect::Snowflake), "\"schema\".\"table\"");
        assert_eq!(table.quoted(Dialect::BigQuery), "`schema`.`table`");
        assert_eq!(table.quoted(Dialect::Synapse), "[schema].[table]");
        assert_eq!(table.to_string(), "schema.table");
    }

    #[test]
    fn test_unqualified_and_sibling() {
        let temp = TableRef::unqualified("#__temp_1");
        assert_eq!(temp.quoted(Dialect::Synapse), "[#__temp_1]");

        let sibling = TableRef::new("s", "t").sibling("u");
        assert_eq!(sibling, TableRef::new("s", "u"));
    }

    #[test]
    fn test_statement_serialization_skips_empty_bindings() {
        let json = serde_json::to_string(&Statement::new("SELECT 1")).unwrap();
        assert_eq!(json, r#"{"sql":"SELECT 1"}"#);
    }
}
