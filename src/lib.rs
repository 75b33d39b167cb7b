//! Bulk import/export engine for cloud data warehouses
//!
//! Provides:
//! - Sources (tables, queries, CSV objects in S3, Azure Blob or GCS) and
//!   destinations
//! - Per-backend SQL adapters for Snowflake, Synapse, Exasol, Teradata and
//!   BigQuery
//! - The staging-table import workflow and the unload/export workflow
//! - Sliced-file manifests
//! - A closed error taxonomy with retry classification
//!
//! The engine renders SQL and drives it through the [`SqlExecutor`] and
//! [`CloudStorage`] capabilities a caller provides; it ships no drivers.

pub mod backend;
pub mod database;
pub mod error;
pub mod export;
pub mod import;
pub mod manifest;
pub mod models;
pub mod sql;
pub mod storage;
pub mod validation;

/// Tracing target of diagnostics meant for end users
pub const USER_LOG_TARGET: &str = "db_import_export::user";

pub use backend::Backend;
pub use database::{
    EngineConfig, ExecutorError, QueryResult, RetryPolicy, RetryingExecutor, SqlExecutor,
};
pub use error::{ErrorKind, ImportExportError, ImportExportResult};
pub use export::Exporter;
pub use import::{IdGenerator, Importer};
pub use manifest::{Manifest, ManifestEntry};
pub use models::{
    CloudCredentials, CloudFileDestination, CloudFileSource, CloudLocation, ColumnDefinition,
    CsvOptions, Destination, ExportOptions, ExportResult, ImportOptions, ImportResult,
    QuerySource, Source, TableSource,
};
pub use sql::{Dialect, Statement, TableRef};
pub use storage::{CloudStorage, MemoryStorage, StorageProvider};
