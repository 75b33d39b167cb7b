//! Adapter lookup by backend, source kind and destination kind

use super::bigquery::{BigQueryExportAdapter, BigQueryImportAdapter};
use super::exasol::{ExasolExportAdapter, ExasolImportAdapter};
use super::snowflake::{SnowflakeExportAdapter, SnowflakeImportAdapter};
use super::synapse::SynapseImportAdapter;
use super::teradata::TeradataImportAdapter;
use super::{Backend, ExportAdapter, ImportAdapter};
use crate::error::{ImportExportError, ImportExportResult};
use crate::models::{DestinationKind, SourceKind};

static SNOWFLAKE_IMPORT: SnowflakeImportAdapter = SnowflakeImportAdapter;
static SYNAPSE_IMPORT: SynapseImportAdapter = SynapseImportAdapter;
static EXASOL_IMPORT: ExasolImportAdapter = ExasolImportAdapter;
static TERADATA_IMPORT: TeradataImportAdapter = TeradataImportAdapter;
static BIGQUERY_IMPORT: BigQueryImportAdapter = BigQueryImportAdapter;

static SNOWFLAKE_EXPORT: SnowflakeExportAdapter = SnowflakeExportAdapter;
static EXASOL_EXPORT: ExasolExportAdapter = ExasolExportAdapter;
static BIGQUERY_EXPORT: BigQueryExportAdapter = BigQueryExportAdapter;

fn not_registered(backend: Backend, source: SourceKind, destination: DestinationKind) -> ImportExportError {
    ImportExportError::no_backend_adapter(
        &backend.to_string(),
        &source.to_string(),
        &destination.to_string(),
    )
}

/// Adapter loading `source` rows into a warehouse table
///
/// Every backend registers all source kinds; whether a cloud provider is
/// reachable is checked by [`ImportAdapter::is_supported`].
pub fn import_adapter(
    backend: Backend,
    source: SourceKind,
    destination: DestinationKind,
) -> ImportExportResult<&'static dyn ImportAdapter> {
    if destination != DestinationKind::Table {
        return Err(not_registered(backend, source, destination));
    }
    Ok(match backend {
        Backend::Snowflake => &SNOWFLAKE_IMPORT,
        Backend::Synapse => &SYNAPSE_IMPORT,
        Backend::Exasol => &EXASOL_IMPORT,
        Backend::Teradata => &TERADATA_IMPORT,
        Backend::BigQuery => &BIGQUERY_IMPORT,
    })
}

/// Adapter unloading a table or query into cloud files
pub fn export_adapter(
    backend: Backend,
    source: SourceKind,
    destination: DestinationKind,
) -> ImportExportResult<&'static dyn ExportAdapter> {
    let sql_source = matches!(source, SourceKind::Table | SourceKind::SelectQuery);
    if destination != DestinationKind::CloudFile || !sql_source {
        return Err(not_registered(backend, source, destination));
    }
    match backend {
        Backend::Snowflake => Ok(&SNOWFLAKE_EXPORT),
        Backend::Exasol => Ok(&EXASOL_EXPORT),
        Backend::BigQuery => Ok(&BIGQUERY_EXPORT),
        Backend::Synapse | Backend::Teradata => Err(not_registered(backend, source, destination)),
    }
}
