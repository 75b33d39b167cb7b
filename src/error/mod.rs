//! Error taxonomy for import and export operations
//!
//! Every failure surfaced by the engine is a single [`ImportExportError`]
//! value carrying a closed-set [`ErrorKind`]. The kind decides whether a
//! caller may retry the whole operation; the free-form context map carries
//! identifiers such as table names, the backend and offending columns.
//!
//! Backend-native driver errors are translated into this taxonomy by
//! [`classify`], which also scrubs credentials from the diagnostic text.

mod classify;
mod sanitize;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use classify::classify;
pub use sanitize::sanitize;

/// Kind of database object a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Database,
    Schema,
    Table,
    Column,
}

/// Exhausted resource reported by a warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Rate limiting or request throttling
    TooManyRequests,
    /// Warehouse ran out of spool, disk or queue slots
    NoRoomInWarehouse,
}

/// Closed set of semantic error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unknown,
    ConnectionTimeout,
    ConnectionFailed,
    Auth,
    ObjectNotFound(ObjectType),
    Validation,
    ColumnsCountMismatch,
    InvalidColumnName,
    DuplicateColumnNames,
    NoColumns,
    InvalidSourceData,
    MandatoryFileNotFound,
    DataTypeMismatch,
    InvalidFileParams,
    UnknownImport,
    UnknownExport,
    InvalidSql,
    QueryTimeout,
    RowTooLarge,
    ValueConversion,
    CommandNotSupported,
    /// No adapter exists for the requested source, destination and backend
    NoBackendAdapter,
    ResourceFull(ResourceKind),
}

impl ErrorKind {
    /// Whether an operation failing with this kind may be retried as a whole
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Unknown
                | ErrorKind::ConnectionTimeout
                | ErrorKind::ConnectionFailed
                | ErrorKind::QueryTimeout
                | ErrorKind::UnknownImport
                | ErrorKind::UnknownExport
                | ErrorKind::ResourceFull(_)
        )
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unknown => "unknown",
            ErrorKind::ConnectionTimeout => "connection_timeout",
            ErrorKind::ConnectionFailed => "connection_failed",
            ErrorKind::Auth => "auth",
            ErrorKind::ObjectNotFound(ObjectType::Database) => "database_not_found",
            ErrorKind::ObjectNotFound(ObjectType::Schema) => "schema_not_found",
            ErrorKind::ObjectNotFound(ObjectType::Table) => "table_not_found",
            ErrorKind::ObjectNotFound(ObjectType::Column) => "column_not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::ColumnsCountMismatch => "columns_count_mismatch",
            ErrorKind::InvalidColumnName => "invalid_column_name",
            ErrorKind::DuplicateColumnNames => "duplicate_column_names",
            ErrorKind::NoColumns => "no_columns",
            ErrorKind::InvalidSourceData => "invalid_source_data",
            ErrorKind::MandatoryFileNotFound => "mandatory_file_not_found",
            ErrorKind::DataTypeMismatch => "data_type_mismatch",
            ErrorKind::InvalidFileParams => "invalid_file_params",
            ErrorKind::UnknownImport => "unknown_import",
            ErrorKind::UnknownExport => "unknown_export",
            ErrorKind::InvalidSql => "invalid_sql",
            ErrorKind::QueryTimeout => "query_timeout",
            ErrorKind::RowTooLarge => "row_too_large",
            ErrorKind::ValueConversion => "value_conversion",
            ErrorKind::CommandNotSupported => "command_not_supported",
            ErrorKind::NoBackendAdapter => "no_backend_adapter",
            ErrorKind::ResourceFull(ResourceKind::TooManyRequests) => "too_many_requests",
            ErrorKind::ResourceFull(ResourceKind::NoRoomInWarehouse) => "no_room_in_warehouse",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error raised by every import/export operation
#[derive(Debug, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct ImportExportError {
    kind: ErrorKind,
    message: String,
    context: BTreeMap<String, String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

/// Result type for import/export operations
pub type ImportExportResult<T> = Result<T, ImportExportError>;

impl ImportExportError {
    /// Create a new error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
            source: None,
        }
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attach the underlying cause
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn no_columns(table: &str) -> Self {
        Self::new(
            ErrorKind::NoColumns,
            format!("No columns found in source for table {}", table),
        )
        .with_context("table", table)
    }

    /// Source columns that do not exist in the destination
    pub fn columns_mismatch(destination: &str, missing: &[String]) -> Self {
        Self::new(
            ErrorKind::ColumnsCountMismatch,
            format!(
                "Columns {} do not exist in destination table {}",
                missing.join(", "),
                destination
            ),
        )
        .with_context("table", destination)
        .with_context("columns", missing.join(","))
    }

    pub fn no_backend_adapter(backend: &str, source: &str, destination: &str) -> Self {
        Self::new(
            ErrorKind::NoBackendAdapter,
            format!(
                "No backend adapter for source \"{}\" and destination \"{}\" on backend \"{}\"",
                source, destination, backend
            ),
        )
        .with_context("backend", backend)
        .with_context("source", source)
        .with_context("destination", destination)
    }

    pub fn mandatory_file_not_found(url: &str) -> Self {
        Self::new(
            ErrorKind::MandatoryFileNotFound,
            format!("Load error: mandatory file \"{}\" was not found", url),
        )
        .with_context("url", url)
    }

    /// Narrow an [`ErrorKind::Unknown`] to a phase-specific kind
    pub(crate) fn narrow_unknown(mut self, kind: ErrorKind) -> Self {
        if self.kind == ErrorKind::Unknown {
            self.kind = kind;
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Structured code of the error kind
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<serde_json::Error> for ImportExportError {
    fn from(err: serde_json::Error) -> Self {
        ImportExportError::new(
            ErrorKind::InvalidSourceData,
            format!("Invalid JSON: {}", err),
        )
        .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::ConnectionTimeout.is_retryable());
        assert!(ErrorKind::ConnectionFailed.is_retryable());
        assert!(ErrorKind::QueryTimeout.is_retryable());
        assert!(ErrorKind::UnknownImport.is_retryable());
        assert!(ErrorKind::Unknown.is_retryable());
        assert!(ErrorKind::ResourceFull(ResourceKind::TooManyRequests).is_retryable());
        assert!(ErrorKind::ResourceFull(ResourceKind::NoRoomInWarehouse).is_retryable());
    }

    #[test]
    fn test_validation_shaped_kinds_are_fatal() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::ColumnsCountMismatch,
            ErrorKind::InvalidColumnName,
            ErrorKind::NoColumns,
            ErrorKind::ObjectNotFound(ObjectType::Table),
            ErrorKind::CommandNotSupported,
            ErrorKind::MandatoryFileNotFound,
            ErrorKind::NoBackendAdapter,
            ErrorKind::Auth,
        ] {
            assert!(!kind.is_retryable(), "{} should not be retryable", kind);
        }
    }

    #[test]
    fn test_columns_mismatch_names_columns() {
        let err = ImportExportError::columns_mismatch("\"s\".\"t\"", &["c".to_string()]);
        assert_eq!(err.kind(), ErrorKind::ColumnsCountMismatch);
        assert!(err.message().contains('c'));
        assert_eq!(err.context().get("columns").map(String::as_str), Some("c"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_display_includes_code() {
        let err = ImportExportError::new(ErrorKind::QueryTimeout, "took too long");
        assert_eq!(err.to_string(), "[query_timeout] took too long");
        assert_eq!(err.code(), "query_timeout");
    }
}
