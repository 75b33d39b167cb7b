//! Execution seam between the engine and a warehouse connection
//!
//! The engine never talks to a driver directly. It renders [`Statement`]s
//! and hands them to a [`SqlExecutor`], which a caller implements on top of
//! whatever client library reaches the warehouse (ODBC, REST, a session
//! pool). Driver failures come back as [`ExecutorError`]s and are
//! classified into the engine's error taxonomy by the caller of the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod retry;

pub use config::EngineConfig;
pub use retry::{RetryPolicy, RetryingExecutor};

use crate::sql::Statement;

/// Failure reported by an executor
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    /// Failed to connect to the warehouse
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection attempt timed out
    #[error("Connection timed out: {0}")]
    ConnectionTimeout(String),

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Statement was rejected or failed while running
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Statement exceeded its time limit
    #[error("Query timed out: {0}")]
    QueryTimeout(String),
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Query result row as a JSON object keyed by column name
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Number of rows affected (for INSERT/UPDATE/DELETE)
    pub rows_affected: Option<u64>,
    /// Execution time in milliseconds
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: None,
            execution_time_ms: 0,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Result of a DML statement
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected: Some(rows_affected),
            ..Self::default()
        }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row as an integer
    ///
    /// Accepts numbers and numeric strings, since several drivers return
    /// `COUNT(*)` as a decimal string.
    pub fn scalar_u64(&self) -> Option<u64> {
        let row = self.rows.first()?;
        let value = match row {
            serde_json::Value::Object(map) => match self.columns.first() {
                Some(column) => map.get(column),
                None => map.values().next(),
            },
            serde_json::Value::Array(values) => values.first(),
            other => Some(other),
        }?;
        match value {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Executes SQL against one warehouse connection
///
/// Implementations must run statements in the order they are submitted on
/// the same session, since temporary staging tables are session-scoped on
/// several warehouses.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute a statement that returns no rows of interest
    async fn execute(&self, statement: &Statement) -> ExecutorResult<QueryResult>;

    /// Execute a query and return all of its rows
    ///
    /// # Arguments
    /// * `statement` - SQL text with positional bindings
    ///
    /// # Returns
    /// Query result with columns and rows
    async fn fetch_all(&self, statement: &Statement) -> ExecutorResult<QueryResult>;
}

#[async_trait]
impl<T: SqlExecutor + ?Sized> SqlExecutor for std::sync::Arc<T> {
    async fn execute(&self, statement: &Statement) -> ExecutorResult<QueryResult> {
        (**self).execute(statement).await
    }

    async fn fetch_all(&self, statement: &Statement) -> ExecutorResult<QueryResult> {
        (**self).fetch_all(statement).await
    }
}
