use serde::{Deserialize, Serialize};

use crate::sql::TableRef;

/// Column name with an optional backend type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Backend type such as `NUMBER(38,0)`; `None` means "string"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }

    pub fn typed(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
        }
    }
}

/// Shape of a table the engine creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub table: TableRef,
    /// Ordered columns; every type is resolved
    pub columns: Vec<(String, String)>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
}

impl TableDefinition {
    pub fn new(table: TableRef, columns: Vec<(String, String)>) -> Self {
        Self {
            table,
            columns,
            primary_keys: Vec::new(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }
}
