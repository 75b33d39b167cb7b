//! Backend adapters
//!
//! An adapter renders the SQL one warehouse needs for each phase of an
//! import or export. Adapters are stateless and never execute anything;
//! the [`Importer`](crate::import::Importer) and
//! [`Exporter`](crate::export::Exporter) run the statements they return.
//!
//! Most phases share a default rendering built from [`crate::sql::builder`];
//! each backend overrides the phases whose syntax differs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod bigquery;
pub mod copy_options;
pub mod exasol;
pub mod registry;
pub mod snowflake;
pub mod synapse;
pub mod teradata;

pub use copy_options::{CopyOptionsSyntax, build_copy_options};
pub(crate) use copy_options::option_literal;

use crate::database::QueryResult;
use crate::error::{ErrorKind, ImportExportError, ImportExportResult};
use crate::manifest::{ObjectUrl, UnloadedFile};
use crate::models::{
    CloudFileDestination, CloudFileSource, Destination, ExportOptions, ImportOptions, Source,
    TIMESTAMP_COLUMN, TableDefinition,
};
use crate::sql::{Dialect, Statement, TableRef, builder};
use crate::storage::StorageProvider;

/// Supported warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Snowflake,
    Synapse,
    Exasol,
    Teradata,
    BigQuery,
}

impl Backend {
    pub const ALL: [Backend; 5] = [
        Backend::Snowflake,
        Backend::Synapse,
        Backend::Exasol,
        Backend::Teradata,
        Backend::BigQuery,
    ];

    pub fn dialect(&self) -> Dialect {
        match self {
            Backend::Snowflake => Dialect::Snowflake,
            Backend::Synapse => Dialect::Synapse,
            Backend::Exasol => Dialect::Exasol,
            Backend::Teradata => Dialect::Teradata,
            Backend::BigQuery => Dialect::BigQuery,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Snowflake => write!(f, "snowflake"),
            Backend::Synapse => write!(f, "synapse"),
            Backend::Exasol => write!(f, "exasol"),
            Backend::Teradata => write!(f, "teradata"),
            Backend::BigQuery => write!(f, "bigquery"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snowflake" => Ok(Backend::Snowflake),
            "synapse" => Ok(Backend::Synapse),
            "exasol" => Ok(Backend::Exasol),
            "teradata" => Ok(Backend::Teradata),
            "bigquery" => Ok(Backend::BigQuery),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// Everything an adapter needs to render the statements of one import
pub struct ImportContext<'a> {
    pub source: &'a Source,
    pub destination: &'a Destination,
    pub options: &'a ImportOptions,
    /// Staging table of this call
    pub staging: &'a TableRef,
    /// Object URLs resolved for cloud sources, empty otherwise
    pub files: &'a [String],
    /// Objects referenced by one load statement
    pub max_files_per_copy: usize,
}

impl<'a> ImportContext<'a> {
    /// Source columns written to the destination
    ///
    /// When the engine writes the load timestamp itself, a `_timestamp`
    /// column carried by the source is dropped.
    pub fn loaded_columns(&self) -> Vec<String> {
        self.source
            .columns()
            .iter()
            .filter(|c| !(self.options.use_timestamp() && c.as_str() == TIMESTAMP_COLUMN))
            .cloned()
            .collect()
    }

    /// Destination primary keys
    pub fn primary_keys(&self) -> &[String] {
        self.destination.primary_keys()
    }

    pub(crate) fn cloud_source(&self) -> ImportExportResult<&'a CloudFileSource> {
        self.source.as_cloud_file().ok_or_else(|| {
            ImportExportError::new(
                ErrorKind::CommandNotSupported,
                "Source is not a cloud file",
            )
        })
    }

    /// Parse resolved file URLs, requiring them to live in the source container
    pub(crate) fn file_urls(&self, files: &[String]) -> ImportExportResult<Vec<ObjectUrl>> {
        let location = &self.cloud_source()?.location;
        files
            .iter()
            .map(|file| {
                let url: ObjectUrl = file.parse()?;
                if url.provider != location.provider
                    || url.container != location.container
                    || url.account != location.account
                {
                    return Err(ImportExportError::new(
                        ErrorKind::InvalidSourceData,
                        format!(
                            "File {} is outside of the source container {}",
                            file, location.container
                        ),
                    )
                    .with_context("url", file.as_str()));
                }
                Ok(url)
            })
            .collect()
    }
}

/// Renders the import phases for one backend
pub trait ImportAdapter: Send + Sync {
    fn backend(&self) -> Backend;

    fn dialect(&self) -> Dialect {
        self.backend().dialect()
    }

    /// Object stores the backend can load from
    fn supported_providers(&self) -> &'static [StorageProvider];

    fn is_supported(&self, source: &Source, _destination: &Destination) -> bool {
        match source.as_cloud_file() {
            Some(file) => self.supported_providers().contains(&file.location.provider),
            None => true,
        }
    }

    /// Type of untyped staging columns
    fn string_type(&self) -> &'static str;

    /// Expression for the current time
    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    fn staging_table(&self, destination: &Destination, _options: &ImportOptions, id: &str) -> TableRef {
        destination.table_ref().sibling(format!("__temp_{}", id))
    }

    fn dedup_table(&self, destination: &Destination, _options: &ImportOptions, id: &str) -> TableRef {
        destination.table_ref().sibling(format!("__temp_dedup_{}", id))
    }

    fn swap_table(&self, destination: &Destination, id: &str) -> TableRef {
        destination.table_ref().sibling(format!("__temp_swap_{}", id))
    }

    fn old_table(&self, destination: &Destination, id: &str) -> TableRef {
        destination.table_ref().sibling(format!("__temp_old_{}", id))
    }

    /// Type of a staging column
    ///
    /// Files are staged as strings; rows read from a warehouse table keep
    /// the declared destination type.
    fn staging_column_type(&self, source: &Source, destination: &Destination, _options: &ImportOptions, column: &str) -> String {
        if source.is_cloud_file() {
            return self.string_type().to_string();
        }
        destination
            .column(column)
            .and_then(|c| c.data_type.clone())
            .unwrap_or_else(|| self.string_type().to_string())
    }

    /// Type of the auto-numbered [`builder::LOAD_SEQUENCE_COLUMN`], `None`
    /// when the backend cannot number rows while loading them
    fn load_sequence_type(&self) -> Option<&'static str> {
        None
    }

    /// Whether staging records load order for deduplication
    fn tracks_load_order(&self, destination: &Destination, options: &ImportOptions) -> bool {
        options.is_incremental()
            && !destination.primary_keys().is_empty()
            && self.load_sequence_type().is_some()
    }

    /// Every source column in source order, typed for staging
    fn data_definition(
        &self,
        source: &Source,
        destination: &Destination,
        options: &ImportOptions,
        table: &TableRef,
    ) -> TableDefinition {
        let columns = source
            .columns()
            .iter()
            .map(|c| (c.clone(), self.staging_column_type(source, destination, options, c)))
            .collect();
        TableDefinition::new(table.clone(), columns)
    }

    /// Staging table shape: the data columns, then the load sequence when
    /// duplicates are resolved by load order
    fn staging_definition(
        &self,
        source: &Source,
        destination: &Destination,
        options: &ImportOptions,
        table: &TableRef,
    ) -> TableDefinition {
        let mut definition = self.data_definition(source, destination, options, table);
        if let Some(data_type) = self.load_sequence_type()
            && self.tracks_load_order(destination, options)
        {
            definition
                .columns
                .push((builder::LOAD_SEQUENCE_COLUMN.to_string(), data_type.to_string()));
        }
        definition
    }

    /// ` ("c1", "c2")` naming the staging columns a file load fills, empty
    /// when files fill every staging column
    fn loaded_column_clause(&self, ctx: &ImportContext<'_>) -> String {
        if self.tracks_load_order(ctx.destination, ctx.options) {
            format!(" ({})", self.dialect().quote_column_list(ctx.source.columns()))
        } else {
            String::new()
        }
    }

    fn create_staging_table(&self, definition: &TableDefinition) -> Statement {
        Statement::new(builder::create_table(
            self.dialect(),
            "CREATE TABLE",
            &definition.table,
            &definition.columns,
            "",
        ))
    }

    /// Statements filling the staging table
    ///
    /// SQL sources produce one `INSERT .. SELECT`; cloud sources produce one
    /// load statement per `max_files_per_copy` files, and none for an empty
    /// file list.
    fn copy_to_staging(&self, ctx: &ImportContext<'_>) -> ImportExportResult<Vec<Statement>> {
        let dialect = self.dialect();
        if let Some(from) = ctx.source.from_statement(dialect) {
            let columns = ctx.source.columns();
            let expressions: Vec<String> = columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .collect();
            let sql = builder::insert_select(dialect, ctx.staging, columns, &expressions, &from);
            return Ok(vec![Statement::with_bindings(sql, ctx.source.bindings().to_vec())]);
        }

        ctx.files
            .chunks(ctx.max_files_per_copy.max(1))
            .map(|chunk| self.copy_files(ctx, chunk))
            .collect()
    }

    /// One load statement for a chunk of files
    fn copy_files(&self, _ctx: &ImportContext<'_>, _files: &[String]) -> ImportExportResult<Statement> {
        Err(ImportExportError::new(
            ErrorKind::CommandNotSupported,
            format!("{} cannot load cloud files", self.backend()),
        ))
    }

    fn count_rows(&self, table: &TableRef) -> Statement {
        Statement::new(builder::count_rows(self.dialect(), table))
    }

    /// Value written into `column`, given a reference to the staged value
    fn value_expression(&self, ctx: &ImportContext<'_>, column: &str, reference: &str) -> String {
        if ctx.options.converts_to_null(column) {
            builder::null_conversion(self.dialect(), reference, ctx.options.import_as_null())
        } else {
            reference.to_string()
        }
    }

    /// Destination columns and the values written into them
    ///
    /// Staged values are referenced through `alias` when given.
    fn projection(&self, ctx: &ImportContext<'_>, alias: Option<&str>) -> Vec<(String, String)> {
        let dialect = self.dialect();
        let mut assignments: Vec<(String, String)> = ctx
            .loaded_columns()
            .into_iter()
            .map(|column| {
                let reference = match alias {
                    Some(alias) => format!(
                        "{}.{}",
                        dialect.quote_identifier(alias),
                        dialect.quote_identifier(&column)
                    ),
                    None => dialect.quote_identifier(&column),
                };
                let value = self.value_expression(ctx, &column, &reference);
                (column, value)
            })
            .collect();
        if ctx.options.use_timestamp() {
            assignments.push((
                TIMESTAMP_COLUMN.to_string(),
                self.current_timestamp().to_string(),
            ));
        }
        assignments
    }

    /// Copy one row per destination primary key from staging into `dedup`
    ///
    /// Rows are ranked by the caller's `dedup_order_by` columns, then by
    /// load order, so the row loaded last wins among equals.
    fn deduplicate(&self, ctx: &ImportContext<'_>, dedup: &TableRef) -> Statement {
        let dialect = self.dialect();
        let mut order_by: Vec<String> = ctx
            .options
            .dedup_order_by()
            .iter()
            .map(|c| format!("{} DESC", dialect.quote_identifier(c)))
            .collect();
        if self.tracks_load_order(ctx.destination, ctx.options) {
            order_by.push(format!(
                "{} DESC",
                dialect.quote_identifier(builder::LOAD_SEQUENCE_COLUMN)
            ));
        }
        Statement::new(builder::deduplicate(
            dialect,
            ctx.staging,
            dedup,
            ctx.source.columns(),
            ctx.primary_keys(),
            &order_by,
        ))
    }

    /// Upsert rows of `from` into the destination by primary key
    fn merge(&self, ctx: &ImportContext<'_>, from: &TableRef) -> Vec<Statement> {
        let target = ctx.destination.table_ref();
        let assignments = self.projection(ctx, Some(builder::SOURCE_ALIAS));
        vec![Statement::new(builder::merge(&builder::MergeSpec {
            dialect: self.dialect(),
            target: &target,
            source: from,
            primary_keys: ctx.primary_keys(),
            assignments: &assignments,
            alias_keyword: true,
        }))]
    }

    /// `INSERT INTO target .. SELECT .. FROM from` with value conversions
    fn insert_into(&self, ctx: &ImportContext<'_>, from: &TableRef, target: &TableRef) -> Statement {
        let dialect = self.dialect();
        let (columns, values): (Vec<String>, Vec<String>) =
            self.projection(ctx, None).into_iter().unzip();
        Statement::new(builder::insert_select(
            dialect,
            target,
            &columns,
            &values,
            &from.quoted(dialect),
        ))
    }

    /// Empty copy of `like`
    fn create_table_like(&self, _ctx: &ImportContext<'_>, table: &TableRef, like: &TableRef) -> Statement {
        let dialect = self.dialect();
        Statement::new(format!(
            "CREATE TABLE {} LIKE {}",
            table.quoted(dialect),
            like.quoted(dialect)
        ))
    }

    /// Rename `from` to `to_name`, keeping its schema
    fn rename_table(&self, from: &TableRef, to_name: &str) -> Statement;

    /// Replace the destination with `swap`
    ///
    /// Renames the destination to `old`, `swap` to the destination name
    /// and drops `old`.
    fn swap(&self, ctx: &ImportContext<'_>, swap: &TableRef, old: &TableRef) -> Vec<Statement> {
        let destination = ctx.destination.table_ref();
        vec![
            self.rename_table(&destination, &old.name),
            self.rename_table(swap, &destination.name),
            self.drop_table(old),
        ]
    }

    fn drop_table(&self, table: &TableRef) -> Statement {
        Statement::new(format!("DROP TABLE IF EXISTS {}", table.quoted(self.dialect())))
    }
}

/// How an export learns which objects it produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadResultKind {
    /// The unload statement returns one row per written object
    UnloadRows,
    /// Objects are discovered by listing the output prefix
    FolderListing,
}

/// Everything an adapter needs to render one export
pub struct ExportContext<'a> {
    pub source: &'a Source,
    pub destination: &'a CloudFileDestination,
    pub options: &'a ExportOptions,
}

/// Renders the unload statement for one backend
pub trait ExportAdapter: Send + Sync {
    fn backend(&self) -> Backend;

    fn dialect(&self) -> Dialect {
        self.backend().dialect()
    }

    /// Object stores the backend can unload into
    fn supported_providers(&self) -> &'static [StorageProvider];

    fn is_supported(&self, source: &Source, destination: &CloudFileDestination) -> bool {
        !source.is_cloud_file()
            && self
                .supported_providers()
                .contains(&destination.location.provider)
    }

    fn unload_result_kind(&self) -> UnloadResultKind;

    /// `SELECT` producing the exported rows
    fn select_statement(&self, ctx: &ExportContext<'_>) -> ImportExportResult<String> {
        if let Some(query) = &ctx.options.query {
            return Ok(query.clone());
        }
        let dialect = self.dialect();
        let from = ctx.source.from_statement(dialect).ok_or_else(|| {
            ImportExportError::new(
                ErrorKind::CommandNotSupported,
                "Cloud files cannot be exported",
            )
        })?;
        let columns = ctx.source.columns();
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            dialect.quote_column_list(columns)
        };
        Ok(format!("SELECT {} FROM {}", projection, from))
    }

    fn export_statement(&self, ctx: &ExportContext<'_>) -> ImportExportResult<Statement>;

    /// Prefix listed after a [`UnloadResultKind::FolderListing`] export,
    /// and whether a `/` is appended to it
    fn listing_prefix(&self, destination: &CloudFileDestination) -> (String, bool) {
        (destination.location.path.clone(), destination.sliced)
    }

    /// Objects reported by a [`UnloadResultKind::UnloadRows`] export
    fn parse_unload_rows(&self, _result: &QueryResult) -> ImportExportResult<Vec<UnloadedFile>> {
        Err(ImportExportError::new(
            ErrorKind::CommandNotSupported,
            format!("{} does not report unloaded files", self.backend()),
        ))
    }
}
