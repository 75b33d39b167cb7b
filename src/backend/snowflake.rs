//! Snowflake: `COPY INTO` loads from S3, Azure and GCS, `SWAP WITH` full
//! loads and unloads reporting their files

use std::collections::HashMap;

use super::{
    Backend, CopyOptionsSyntax, ExportAdapter, ExportContext, ImportAdapter, ImportContext,
    UnloadResultKind, build_copy_options, option_literal,
};
use crate::database::QueryResult;
use crate::error::{ErrorKind, ImportExportError, ImportExportResult};
use crate::manifest::UnloadedFile;
use crate::models::{CloudCredentials, CloudLocation, TableDefinition};
use crate::sql::{Dialect, Statement, TableRef, builder};
use crate::storage::StorageProvider;

pub const COPY_OPTIONS: CopyOptionsSyntax = CopyOptionsSyntax {
    dialect: Dialect::Snowflake,
    delimiter: "FIELD_DELIMITER",
    skip_header: "SKIP_HEADER",
    skip_is_first_row: false,
    enclosure: "FIELD_OPTIONALLY_ENCLOSED_BY",
    disable_unenclosed_escape: Some("ESCAPE_UNENCLOSED_FIELD = NONE"),
    unenclosed_escape: Some("ESCAPE_UNENCLOSED_FIELD"),
    assign: " = ",
};

const PROVIDERS: &[StorageProvider] = &[
    StorageProvider::S3,
    StorageProvider::Azure,
    StorageProvider::Gcs,
];

/// Largest single-file unload Snowflake allows, 5 GB
const MAX_SINGLE_FILE_SIZE: u64 = 5_368_709_120;

/// Container URL as Snowflake spells it
fn container_url(location: &CloudLocation) -> String {
    match location.provider {
        StorageProvider::S3 => format!("s3://{}/", location.container),
        StorageProvider::Gcs => format!("gcs://{}/", location.container),
        StorageProvider::Azure => format!(
            "azure://{}.blob.core.windows.net/{}/",
            location.account.as_deref().unwrap_or_default(),
            location.container
        ),
    }
}

/// Credential clause, e.g. `CREDENTIALS = (...) REGION = '...'`
fn credentials_clause(credentials: &CloudCredentials) -> ImportExportResult<String> {
    let quote = |value: &str| Dialect::Snowflake.quote(value);
    match credentials {
        CloudCredentials::S3 {
            access_key_id,
            secret_access_key,
            region,
            session_token,
        } => {
            let token = session_token
                .as_deref()
                .map(|t| format!(" AWS_TOKEN = {}", quote(t)))
                .unwrap_or_default();
            Ok(format!(
                "CREDENTIALS = (AWS_KEY_ID = {} AWS_SECRET_KEY = {}{}) REGION = {}",
                quote(access_key_id),
                quote(secret_access_key),
                token,
                quote(region)
            ))
        }
        CloudCredentials::Azure { sas_token, .. } => Ok(format!(
            "CREDENTIALS = (AZURE_SAS_TOKEN = {})",
            quote(sas_token.trim_start_matches('?'))
        )),
        CloudCredentials::Gcs {
            storage_integration: Some(integration),
        } => Ok(format!(
            "STORAGE_INTEGRATION = {}",
            Dialect::Snowflake.quote_identifier(integration)
        )),
        CloudCredentials::Gcs {
            storage_integration: None,
        } => Err(ImportExportError::new(
            ErrorKind::InvalidFileParams,
            "Snowflake needs a storage integration to access GCS",
        )),
    }
}

pub struct SnowflakeImportAdapter;

impl ImportAdapter for SnowflakeImportAdapter {
    fn backend(&self) -> Backend {
        Backend::Snowflake
    }

    fn supported_providers(&self) -> &'static [StorageProvider] {
        PROVIDERS
    }

    fn string_type(&self) -> &'static str {
        "VARCHAR"
    }

    fn load_sequence_type(&self) -> Option<&'static str> {
        Some("NUMBER AUTOINCREMENT START 1 INCREMENT 1 ORDER")
    }

    fn create_staging_table(&self, definition: &TableDefinition) -> Statement {
        Statement::new(builder::create_table(
            Dialect::Snowflake,
            "CREATE TEMPORARY TABLE",
            &definition.table,
            &definition.columns,
            "",
        ))
    }

    fn copy_files(&self, ctx: &ImportContext<'_>, files: &[String]) -> ImportExportResult<Statement> {
        let source = ctx.cloud_source()?;
        let urls = ctx.file_urls(files)?;
        let options = build_copy_options(
            &COPY_OPTIONS,
            &source.csv_options,
            ctx.options.number_of_ignored_lines(),
        )?;
        let keys = urls
            .iter()
            .map(|url| Dialect::Snowflake.quote(&url.key))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Statement::new(format!(
            "COPY INTO {}{} FROM {} {} FILE_FORMAT = (TYPE = CSV {}) FILES = ({})",
            ctx.staging.quoted(Dialect::Snowflake),
            self.loaded_column_clause(ctx),
            Dialect::Snowflake.quote(&container_url(&source.location)),
            credentials_clause(&source.credentials)?,
            options.join(" "),
            keys
        )))
    }

    /// `ALTER TABLE .. SWAP WITH ..` exchanges both tables atomically; the
    /// swap table then holds the previous rows and is dropped
    fn swap(&self, ctx: &ImportContext<'_>, swap: &TableRef, _old: &TableRef) -> Vec<Statement> {
        vec![
            Statement::new(format!(
                "ALTER TABLE {} SWAP WITH {}",
                ctx.destination.table_ref().quoted(Dialect::Snowflake),
                swap.quoted(Dialect::Snowflake)
            )),
            self.drop_table(swap),
        ]
    }

    fn rename_table(&self, from: &TableRef, to_name: &str) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} RENAME TO {}",
            from.quoted(Dialect::Snowflake),
            from.sibling(to_name).quoted(Dialect::Snowflake)
        ))
    }
}

pub struct SnowflakeExportAdapter;

impl ExportAdapter for SnowflakeExportAdapter {
    fn backend(&self) -> Backend {
        Backend::Snowflake
    }

    fn supported_providers(&self) -> &'static [StorageProvider] {
        PROVIDERS
    }

    fn unload_result_kind(&self) -> UnloadResultKind {
        UnloadResultKind::UnloadRows
    }

    fn export_statement(&self, ctx: &ExportContext<'_>) -> ImportExportResult<Statement> {
        let destination = ctx.destination;
        let csv = &destination.csv_options;
        let mut format = vec![format!(
            "FIELD_DELIMITER = {}",
            option_literal(Dialect::Snowflake, csv.delimiter())
        )];
        if let Some(enclosure) = csv.enclosure() {
            format.push(format!(
                "FIELD_OPTIONALLY_ENCLOSED_BY = {}",
                option_literal(Dialect::Snowflake, enclosure)
            ));
        }
        format.push(format!(
            "COMPRESSION = {}",
            if ctx.options.compression { "'GZIP'" } else { "'NONE'" }
        ));
        format.push("NULL_IF = ()".to_string());

        let target = format!(
            "{}{}",
            container_url(&destination.location),
            destination.location.path
        );
        let mut sql = format!(
            "COPY INTO {} FROM ({}) {} FILE_FORMAT = (TYPE = CSV {}) HEADER = FALSE OVERWRITE = TRUE DETAILED_OUTPUT = TRUE",
            Dialect::Snowflake.quote(&target),
            self.select_statement(ctx)?,
            credentials_clause(&destination.credentials)?,
            format.join(" ")
        );
        if !destination.sliced {
            sql.push_str(&format!(" SINGLE = TRUE MAX_FILE_SIZE = {}", MAX_SINGLE_FILE_SIZE));
        }
        Ok(Statement::with_bindings(sql, ctx.source.bindings().to_vec()))
    }

    fn parse_unload_rows(&self, result: &QueryResult) -> ImportExportResult<Vec<UnloadedFile>> {
        result
            .rows
            .iter()
            .map(|row| {
                let fields: HashMap<String, &serde_json::Value> = match row {
                    serde_json::Value::Object(map) => map
                        .iter()
                        .map(|(k, v)| (k.to_uppercase(), v))
                        .collect(),
                    _ => HashMap::new(),
                };
                let file_name = fields
                    .get("FILE_NAME")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        ImportExportError::new(
                            ErrorKind::InvalidSourceData,
                            "Unload result row has no FILE_NAME",
                        )
                    })?;
                let number = |name: &str| {
                    fields
                        .get(name)
                        .and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()))
                        .unwrap_or(0)
                };
                Ok(UnloadedFile {
                    file_name: file_name.to_string(),
                    file_size: number("FILE_SIZE"),
                    row_count: number("ROW_COUNT"),
                })
            })
            .collect()
    }
}
