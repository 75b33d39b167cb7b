//! BigQuery: `LOAD DATA` from GCS, `EXPORT DATA` to GCS
//!
//! With a session id the staging tables become session temp tables and are
//! referenced without a dataset. BigQuery tables keep no load order, so
//! duplicate keys are ranked by `dedup_order_by` alone.

use super::{
    Backend, CopyOptionsSyntax, ExportAdapter, ExportContext, ImportAdapter, ImportContext,
    UnloadResultKind, build_copy_options,
};
use crate::error::ImportExportResult;
use crate::models::{
    BigQueryUsingTypes, CloudFileDestination, Destination, ImportOptions, Source,
    TableDefinition,
};
use crate::sql::{Dialect, Statement, TableRef, builder};
use crate::storage::StorageProvider;

pub const COPY_OPTIONS: CopyOptionsSyntax = CopyOptionsSyntax {
    dialect: Dialect::BigQuery,
    delimiter: "field_delimiter",
    skip_header: "skip_leading_rows",
    skip_is_first_row: false,
    enclosure: "quote",
    disable_unenclosed_escape: None,
    unenclosed_escape: None,
    assign: " = ",
};

const PROVIDERS: &[StorageProvider] = &[StorageProvider::Gcs];

const D: Dialect = Dialect::BigQuery;

pub struct BigQueryImportAdapter;

impl ImportAdapter for BigQueryImportAdapter {
    fn backend(&self) -> Backend {
        Backend::BigQuery
    }

    fn supported_providers(&self) -> &'static [StorageProvider] {
        PROVIDERS
    }

    fn string_type(&self) -> &'static str {
        "STRING"
    }

    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP()"
    }

    fn staging_table(&self, destination: &Destination, options: &ImportOptions, id: &str) -> TableRef {
        let name = format!("__temp_{}", id);
        match options.bigquery_session_id() {
            Some(_) => TableRef::unqualified(name),
            None => destination.table_ref().sibling(name),
        }
    }

    fn dedup_table(&self, destination: &Destination, options: &ImportOptions, id: &str) -> TableRef {
        let name = format!("__temp_dedup_{}", id);
        match options.bigquery_session_id() {
            Some(_) => TableRef::unqualified(name),
            None => destination.table_ref().sibling(name),
        }
    }

    fn staging_column_type(
        &self,
        source: &Source,
        destination: &Destination,
        options: &ImportOptions,
        column: &str,
    ) -> String {
        let declared = destination.column(column).and_then(|c| c.data_type.clone());
        match (options.bigquery_using_types(), declared) {
            (BigQueryUsingTypes::UserDefined, Some(data_type)) => data_type,
            (_, Some(data_type)) if !source.is_cloud_file() => data_type,
            _ => self.string_type().to_string(),
        }
    }

    fn create_staging_table(&self, definition: &TableDefinition) -> Statement {
        let prefix = if definition.table.schema.is_none() {
            "CREATE TEMP TABLE"
        } else {
            "CREATE TABLE"
        };
        Statement::new(builder::create_table(
            D,
            prefix,
            &definition.table,
            &definition.columns,
            "",
        ))
    }

    fn copy_files(&self, ctx: &ImportContext<'_>, files: &[String]) -> ImportExportResult<Statement> {
        let source = ctx.cloud_source()?;
        let uris = ctx
            .file_urls(files)?
            .iter()
            .map(|url| D.quote(&url.to_string()))
            .collect::<Vec<_>>()
            .join(", ");
        let mut options = vec!["format = 'CSV'".to_string()];
        options.extend(build_copy_options(
            &COPY_OPTIONS,
            &source.csv_options,
            ctx.options.number_of_ignored_lines(),
        )?);
        options.push("allow_quoted_newlines = true".to_string());
        options.push(format!("uris = [{}]", uris));

        Ok(Statement::new(format!(
            "LOAD DATA INTO {} FROM FILES ({})",
            ctx.staging.quoted(D),
            options.join(", ")
        )))
    }

    fn rename_table(&self, from: &TableRef, to_name: &str) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} RENAME TO {}",
            from.quoted(D),
            D.quote_identifier(to_name)
        ))
    }
}

pub struct BigQueryExportAdapter;

impl ExportAdapter for BigQueryExportAdapter {
    fn backend(&self) -> Backend {
        Backend::BigQuery
    }

    fn supported_providers(&self) -> &'static [StorageProvider] {
        PROVIDERS
    }

    fn unload_result_kind(&self) -> UnloadResultKind {
        UnloadResultKind::FolderListing
    }

    /// `EXPORT DATA` always shards its output, so every export writes
    /// `<path>*.csv` and is discovered by listing `<path>`
    fn export_statement(&self, ctx: &ExportContext<'_>) -> ImportExportResult<Statement> {
        let destination = ctx.destination;
        let csv = &destination.csv_options;
        let extension = if ctx.options.compression { ".csv.gz" } else { ".csv" };
        let uri = format!(
            "gs://{}/{}*{}",
            destination.location.container, destination.location.path, extension
        );

        let mut options = vec![
            format!("uri = {}", D.quote(&uri)),
            "format = 'CSV'".to_string(),
            "overwrite = true".to_string(),
            "header = false".to_string(),
            format!("field_delimiter = {}", D.quote(csv.delimiter())),
        ];
        if ctx.options.compression {
            options.push("compression = 'GZIP'".to_string());
        }

        Ok(Statement::with_bindings(
            format!(
                "EXPORT DATA OPTIONS ({}) AS {}",
                options.join(", "),
                self.select_statement(ctx)?
            ),
            ctx.source.bindings().to_vec(),
        ))
    }

    fn listing_prefix(&self, destination: &CloudFileDestination) -> (String, bool) {
        (destination.location.path.clone(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CloudCredentials, CloudFileSource, CloudLocation, ColumnDefinition, CsvOptions,
        ExportOptions, ImportOptionsExtension, TableSource,
    };

    fn destination() -> Destination {
        Destination::new(
            "ds",
            "t",
            vec![
                ColumnDefinition::typed("id", "INT64"),
                ColumnDefinition::new("name"),
            ],
            vec!["id".into()],
        )
        .unwrap()
    }

    fn gcs_source() -> Source {
        CloudFileSource::new(
            CloudLocation::gcs("bucket", "in/a.csv"),
            CloudCredentials::Gcs {
                storage_integration: None,
            },
            CsvOptions::default(),
            vec!["id".into(), "name".into()],
            vec![],
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_session_staging_is_temp_table() {
        let options = ImportOptions::builder()
            .extension(ImportOptionsExtension::BigQuery {
                using_types: BigQueryUsingTypes::UserDefined,
                session_id: Some("session-1".into()),
            })
            .build();
        let source = gcs_source();
        let destination = destination();
        let staging = BigQueryImportAdapter.staging_table(&destination, &options, "1");
        assert_eq!(staging, TableRef::unqualified("__temp_1"));

        let definition =
            BigQueryImportAdapter.staging_definition(&source, &destination, &options, &staging);
        assert_eq!(
            BigQueryImportAdapter.create_staging_table(&definition).sql,
            "CREATE TEMP TABLE `__temp_1` (`id` INT64, `name` STRING)"
        );
    }

    #[test]
    fn test_string_staging_by_default() {
        let options = ImportOptions::default();
        let source = gcs_source();
        let destination = destination();
        let staging = BigQueryImportAdapter.staging_table(&destination, &options, "1");
        assert_eq!(staging, TableRef::new("ds", "__temp_1"));
        let definition =
            BigQueryImportAdapter.staging_definition(&source, &destination, &options, &staging);
        assert_eq!(
            BigQueryImportAdapter.create_staging_table(&definition).sql,
            "CREATE TABLE `ds`.`__temp_1` (`id` STRING, `name` STRING)"
        );
    }

    #[test]
    fn test_load_data() {
        let source = gcs_source();
        let destination = destination();
        let options = ImportOptions::builder().number_of_ignored_lines(1).build();
        let staging = TableRef::new("ds", "__temp_1");
        let files = vec!["gs://bucket/in/a.csv".to_string()];
        let ctx = ImportContext {
            source: &source,
            destination: &destination,
            options: &options,
            staging: &staging,
            files: &files,
            max_files_per_copy: 1000,
        };
        let sql = &BigQueryImportAdapter.copy_to_staging(&ctx).unwrap()[0].sql;
        assert_eq!(
            sql,
            "LOAD DATA INTO `ds`.`__temp_1` FROM FILES (format = 'CSV', field_delimiter = ',', skip_leading_rows = 1, quote = '\"', allow_quoted_newlines = true, uris = ['gs://bucket/in/a.csv'])"
        );
    }

    #[test]
    fn test_export_data() {
        let source: Source = TableSource::new("ds", "t", vec!["id".into()], vec![])
            .unwrap()
            .into();
        let destination = CloudFileDestination::new(
            CloudLocation::gcs("bucket", "out/t_"),
            CloudCredentials::Gcs {
                storage_integration: None,
            },
            CsvOptions::default(),
            true,
        )
        .unwrap();
        let options = ExportOptions::default().with_compression(true);
        let ctx = ExportContext {
            source: &source,
            destination: &destination,
            options: &options,
        };
        let sql = BigQueryExportAdapter.export_statement(&ctx).unwrap().sql;
        assert!(sql.starts_with("EXPORT DATA OPTIONS (uri = 'gs://bucket/out/t_*.csv.gz'"));
        assert!(sql.contains("compression = 'GZIP'"));
        assert!(sql.ends_with("AS SELECT `id` FROM `ds`.`t`"));
    }
}
