//! Exasol: `IMPORT` / `EXPORT` over S3 and Azure Blob storage

use super::{
    Backend, CopyOptionsSyntax, ExportAdapter, ExportContext, ImportAdapter, ImportContext,
    UnloadResultKind, build_copy_options,
};
use crate::error::{ErrorKind, ImportExportError, ImportExportResult};
use crate::models::{CloudCredentials, CloudFileDestination, CloudLocation};
use crate::sql::{Dialect, Statement, TableRef, builder};
use crate::storage::StorageProvider;

pub const COPY_OPTIONS: CopyOptionsSyntax = CopyOptionsSyntax {
    dialect: Dialect::Exasol,
    delimiter: "COLUMN SEPARATOR",
    skip_header: "SKIP",
    skip_is_first_row: false,
    enclosure: "COLUMN DELIMITER",
    disable_unenclosed_escape: None,
    unenclosed_escape: None,
    assign: " = ",
};

const PROVIDERS: &[StorageProvider] = &[StorageProvider::S3, StorageProvider::Azure];

const D: Dialect = Dialect::Exasol;

/// Objects a sliced export spreads its rows over, written in parallel
const SLICED_FILE_COUNT: usize = 4;

/// `AT .. USER .. IDENTIFIED BY ..` connection clause and the object path
/// prefix FILE entries are relative to
fn connection_clause(
    location: &CloudLocation,
    credentials: &CloudCredentials,
) -> ImportExportResult<(String, String)> {
    match credentials {
        CloudCredentials::S3 {
            access_key_id,
            secret_access_key,
            region,
            ..
        } => Ok((
            format!(
                "AT {} USER {} IDENTIFIED BY {}",
                D.quote(&format!(
                    "https://{}.s3.{}.amazonaws.com",
                    location.container, region
                )),
                D.quote(access_key_id),
                D.quote(secret_access_key)
            ),
            String::new(),
        )),
        CloudCredentials::Azure {
            account_key: Some(account_key),
            ..
        } => {
            let account = location.account.as_deref().unwrap_or_default();
            Ok((
                format!(
                    "AT CLOUD AZURE BLOBSTORAGE {} USER {} IDENTIFIED BY {}",
                    D.quote(&format!(
                        "DefaultEndpointsProtocol=https;AccountName={};EndpointSuffix=core.windows.net",
                        account
                    )),
                    D.quote(account),
                    D.quote(account_key)
                ),
                format!("{}/", location.container),
            ))
        }
        CloudCredentials::Azure {
            account_key: None, ..
        } => Err(ImportExportError::new(
            ErrorKind::InvalidFileParams,
            "Exasol needs the storage account key to access Azure Blob storage",
        )),
        CloudCredentials::Gcs { .. } => Err(ImportExportError::new(
            ErrorKind::InvalidFileParams,
            "Exasol cannot access GCS",
        )),
    }
}

pub struct ExasolImportAdapter;

impl ImportAdapter for ExasolImportAdapter {
    fn backend(&self) -> Backend {
        Backend::Exasol
    }

    fn supported_providers(&self) -> &'static [StorageProvider] {
        PROVIDERS
    }

    fn string_type(&self) -> &'static str {
        "VARCHAR(2000000)"
    }

    fn load_sequence_type(&self) -> Option<&'static str> {
        Some("DECIMAL(18,0) IDENTITY")
    }

    fn copy_files(&self, ctx: &ImportContext<'_>, files: &[String]) -> ImportExportResult<Statement> {
        let source = ctx.cloud_source()?;
        let (connection, file_prefix) = connection_clause(&source.location, &source.credentials)?;
        let file_clauses = ctx
            .file_urls(files)?
            .iter()
            .map(|url| format!("FILE {}", D.quote(&format!("{}{}", file_prefix, url.key))))
            .collect::<Vec<_>>()
            .join(" ");
        let options = build_copy_options(
            &COPY_OPTIONS,
            &source.csv_options,
            ctx.options.number_of_ignored_lines(),
        )?;

        Ok(Statement::new(format!(
            "IMPORT INTO {}{} FROM CSV {} {} {}",
            ctx.staging.quoted(D),
            self.loaded_column_clause(ctx),
            connection,
            file_clauses,
            options.join(" ")
        )))
    }

    /// Wraps values in `CAST` to the declared destination type when the
    /// Exasol extension asks for it
    fn value_expression(&self, ctx: &ImportContext<'_>, column: &str, reference: &str) -> String {
        let value = if ctx.options.converts_to_null(column) {
            builder::null_conversion(D, reference, ctx.options.import_as_null())
        } else {
            reference.to_string()
        };
        match ctx.destination.column(column).and_then(|c| c.data_type.as_deref()) {
            Some(data_type) if ctx.options.exasol_cast_value_types() => {
                format!("CAST({} AS {})", value, data_type)
            }
            _ => value,
        }
    }

    fn merge(&self, ctx: &ImportContext<'_>, from: &TableRef) -> Vec<Statement> {
        let target = ctx.destination.table_ref();
        let assignments = self.projection(ctx, Some(builder::SOURCE_ALIAS));
        vec![Statement::new(builder::merge(&builder::MergeSpec {
            dialect: D,
            target: &target,
            source: from,
            primary_keys: ctx.primary_keys(),
            assignments: &assignments,
            alias_keyword: false,
        }))]
    }

    fn rename_table(&self, from: &TableRef, to_name: &str) -> Statement {
        Statement::new(format!(
            "RENAME TABLE {} TO {}",
            from.quoted(D),
            D.quote_identifier(to_name)
        ))
    }
}

pub struct ExasolExportAdapter;

impl ExportAdapter for ExasolExportAdapter {
    fn backend(&self) -> Backend {
        Backend::Exasol
    }

    fn supported_providers(&self) -> &'static [StorageProvider] {
        PROVIDERS
    }

    fn unload_result_kind(&self) -> UnloadResultKind {
        UnloadResultKind::FolderListing
    }

    fn export_statement(&self, ctx: &ExportContext<'_>) -> ImportExportResult<Statement> {
        let destination = ctx.destination;
        let (connection, file_prefix) =
            connection_clause(&destination.location, &destination.credentials)?;
        // Exasol compresses objects whose name ends in .gz
        let extension = if ctx.options.compression { ".gz" } else { "" };
        let paths: Vec<String> = if destination.sliced {
            let folder = destination.location.path.trim_end_matches('/');
            (0..SLICED_FILE_COUNT)
                .map(|slice| format!("{}/data_{}.csv{}", folder, slice, extension))
                .collect()
        } else {
            let path = &destination.location.path;
            if path.ends_with(extension) {
                vec![path.clone()]
            } else {
                vec![format!("{}{}", path, extension)]
            }
        };
        let file_clauses = paths
            .iter()
            .map(|path| format!("FILE {}", D.quote(&format!("{}{}", file_prefix, path))))
            .collect::<Vec<_>>()
            .join(" ");

        let csv = &destination.csv_options;
        let mut options = vec![format!("COLUMN SEPARATOR = {}", D.quote(csv.delimiter()))];
        if let Some(enclosure) = csv.enclosure() {
            options.push(format!("COLUMN DELIMITER = {}", D.quote(enclosure)));
        }

        Ok(Statement::with_bindings(
            format!(
                "EXPORT ({}) INTO CSV {} {} {}",
                self.select_statement(ctx)?,
                connection,
                file_clauses,
                options.join(" ")
            ),
            ctx.source.bindings().to_vec(),
        ))
    }

    fn listing_prefix(&self, destination: &CloudFileDestination) -> (String, bool) {
        if destination.sliced {
            (destination.location.path.trim_end_matches('/').to_string(), true)
        } else {
            (destination.location.path.clone(), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CloudFileSource, ColumnDefinition, CsvOptions, Destination, ExportOptions,
        ImportOptions, ImportOptionsExtension, Source, TableSource,
    };

    fn s3_credentials() -> CloudCredentials {
        CloudCredentials::S3 {
            access_key_id: "key".into(),
            secret_access_key: "secret".into(),
            region: "eu-central-1".into(),
            session_token: None,
        }
    }

    fn destination() -> Destination {
        Destination::new(
            "S",
            "T",
            vec![
                ColumnDefinition::typed("id", "DECIMAL(18,0)"),
                ColumnDefinition::new("name"),
            ],
            vec!["id".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_import_from_s3() {
        let source: Source = CloudFileSource::new(
            CloudLocation::s3("bucket", "in/a.csv"),
            s3_credentials(),
            CsvOptions::default(),
            vec!["id".into(), "name".into()],
            vec![],
        )
        .unwrap()
        .into();
        let destination = destination();
        let options = ImportOptions::builder().number_of_ignored_lines(1).build();
        let staging = TableRef::new("S", "__temp_1");
        let files = vec!["s3://bucket/in/a.csv".to_string(), "s3://bucket/in/b.csv".to_string()];
        let ctx = ImportContext {
            source: &source,
            destination: &destination,
            options: &options,
            staging: &staging,
            files: &files,
            max_files_per_copy: 1000,
        };
        let statements = ExasolImportAdapter.copy_to_staging(&ctx).unwrap();
        assert_eq!(
            statements[0].sql,
            "IMPORT INTO \"S\".\"__temp_1\" FROM CSV AT 'https://bucket.s3.eu-central-1.amazonaws.com' USER 'key' IDENTIFIED BY 'secret' FILE 'in/a.csv' FILE 'in/b.csv' COLUMN SEPARATOR = ',' SKIP = 1 COLUMN DELIMITER = '\"'"
        );
    }

    #[test]
    fn test_cast_value_types() {
        let source: Source = TableSource::new("S", "SRC", vec!["id".into(), "name".into()], vec![])
            .unwrap()
            .into();
        let destination = destination();
        let options = ImportOptions::builder()
            .incremental(true)
            .extension(ImportOptionsExtension::Exasol {
                cast_value_types: true,
            })
            .build();
        let staging = TableRef::new("S", "__temp_1");
        let ctx = ImportContext {
            source: &source,
            destination: &destination,
            options: &options,
            staging: &staging,
            files: &[],
            max_files_per_copy: 1000,
        };
        let merge = &ExasolImportAdapter.merge(&ctx, &TableRef::new("S", "__temp_dedup_1"))[0].sql;
        assert!(merge.starts_with("MERGE INTO \"S\".\"T\" \"dest\" USING \"S\".\"__temp_dedup_1\" \"src\""));
        assert!(merge.contains("VALUES (CAST(\"src\".\"id\" AS DECIMAL(18,0)), \"src\".\"name\")"));
    }

    #[test]
    fn test_sliced_export_path() {
        let source: Source = TableSource::new("S", "T", vec!["id".into()], vec![])
            .unwrap()
            .into();
        let destination = CloudFileDestination::new(
            CloudLocation::s3("bucket", "out/"),
            s3_credentials(),
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
        let sql = ExasolExportAdapter.export_statement(&ctx).unwrap().sql;
        assert!(sql.starts_with("EXPORT (SELECT \"id\" FROM \"S\".\"T\") INTO CSV AT"));
        assert!(sql.contains(
            "FILE 'out/data_0.csv.gz' FILE 'out/data_1.csv.gz' FILE 'out/data_2.csv.gz' FILE 'out/data_3.csv.gz' COLUMN SEPARATOR"
        ));
        assert_eq!(
            ExasolExportAdapter.listing_prefix(&destination),
            ("out".to_string(), true)
        );
    }

    #[test]
    fn test_single_file_export_is_compressed() {
        let source: Source = TableSource::new("S", "T", vec!["id".into()], vec![])
            .unwrap()
            .into();
        let export = |path: &str, compression: bool| {
            let destination = CloudFileDestination::new(
                CloudLocation::s3("bucket", path),
                s3_credentials(),
                CsvOptions::default(),
                false,
            )
            .unwrap();
            let options = ExportOptions::default().with_compression(compression);
            let ctx = ExportContext {
                source: &source,
                destination: &destination,
                options: &options,
            };
            ExasolExportAdapter.export_statement(&ctx).unwrap().sql
        };

        assert!(export("out/t.csv", true).contains(" FILE 'out/t.csv.gz' COLUMN SEPARATOR"));
        assert!(export("out/t.csv.gz", true).contains(" FILE 'out/t.csv.gz' COLUMN SEPARATOR"));
        assert!(export("out/t.csv", false).contains(" FILE 'out/t.csv' COLUMN SEPARATOR"));
    }

    #[test]
    fn test_azure_needs_account_key() {
        let err = connection_clause(
            &CloudLocation::azure("acc", "c", "p"),
            &CloudCredentials::Azure {
                sas_token: "sv=1".into(),
                account_key: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFileParams);
    }
}
