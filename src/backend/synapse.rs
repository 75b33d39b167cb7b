//! Azure Synapse Analytics (dedicated SQL pool)
//!
//! Staging lives in session temp tables (`#__temp_..`). Synapse has no
//! `MERGE` on distributed tables here, so incremental loads run
//! UPDATE .. FROM, DELETE of matched rows, then INSERT.

use super::{
    Backend, CopyOptionsSyntax, ImportAdapter, ImportContext, build_copy_options,
};
use crate::error::{ErrorKind, ImportExportError, ImportExportResult};
use crate::models::{
    CloudCredentials, Destination, ImportOptions, SynapseDistribution, TableDefinition,
};
use crate::sql::{Dialect, Statement, TableRef, builder};
use crate::storage::StorageProvider;

pub const COPY_OPTIONS: CopyOptionsSyntax = CopyOptionsSyntax {
    dialect: Dialect::Synapse,
    delimiter: "FIELDTERMINATOR",
    skip_header: "FIRSTROW",
    skip_is_first_row: true,
    enclosure: "FIELDQUOTE",
    disable_unenclosed_escape: None,
    unenclosed_escape: None,
    assign: " = ",
};

const PROVIDERS: &[StorageProvider] = &[StorageProvider::Azure];

const D: Dialect = Dialect::Synapse;

pub struct SynapseImportAdapter;

impl ImportAdapter for SynapseImportAdapter {
    fn backend(&self) -> Backend {
        Backend::Synapse
    }

    fn supported_providers(&self) -> &'static [StorageProvider] {
        PROVIDERS
    }

    fn string_type(&self) -> &'static str {
        "NVARCHAR(4000)"
    }

    fn load_sequence_type(&self) -> Option<&'static str> {
        Some("BIGINT IDENTITY(1, 1)")
    }

    fn staging_table(&self, _destination: &Destination, _options: &ImportOptions, id: &str) -> TableRef {
        TableRef::unqualified(format!("#__temp_{}", id))
    }

    fn dedup_table(&self, _destination: &Destination, _options: &ImportOptions, id: &str) -> TableRef {
        TableRef::unqualified(format!("#__temp_dedup_{}", id))
    }

    fn create_staging_table(&self, definition: &TableDefinition) -> Statement {
        Statement::new(builder::create_table(
            D,
            "CREATE TABLE",
            &definition.table,
            &definition.columns,
            " WITH (DISTRIBUTION = ROUND_ROBIN, HEAP)",
        ))
    }

    fn copy_files(&self, ctx: &ImportContext<'_>, files: &[String]) -> ImportExportResult<Statement> {
        let source = ctx.cloud_source()?;
        let sas_token = match &source.credentials {
            CloudCredentials::Azure { sas_token, .. } => sas_token.trim_start_matches('?'),
            _ => {
                return Err(ImportExportError::new(
                    ErrorKind::InvalidFileParams,
                    "Synapse loads files with an Azure SAS token only",
                ));
            }
        };
        let urls = ctx
            .file_urls(files)?
            .iter()
            .filter_map(|url| url.azure_https())
            .map(|url| D.quote(&url))
            .collect::<Vec<_>>()
            .join(", ");

        let mut with = vec![
            "FILE_TYPE = 'CSV'".to_string(),
            format!(
                "CREDENTIAL = (IDENTITY = 'Shared Access Signature', SECRET = {})",
                D.quote(sas_token)
            ),
        ];
        with.extend(build_copy_options(
            &COPY_OPTIONS,
            &source.csv_options,
            ctx.options.number_of_ignored_lines(),
        )?);
        with.push("ENCODING = 'UTF8'".to_string());
        with.push("IDENTITY_INSERT = 'OFF'".to_string());

        Ok(Statement::new(format!(
            "COPY INTO {}{} FROM {} WITH ({})",
            ctx.staging.quoted(D),
            self.loaded_column_clause(ctx),
            urls,
            with.join(", ")
        )))
    }

    fn count_rows(&self, table: &TableRef) -> Statement {
        Statement::new(format!(
            "SELECT COUNT_BIG(*) AS {} FROM {}",
            D.quote_identifier("count"),
            table.quoted(D)
        ))
    }

    fn merge(&self, ctx: &ImportContext<'_>, from: &TableRef) -> Vec<Statement> {
        let target = ctx.destination.table_ref();
        let target_name = target.quoted(D);
        let source_alias = D.quote_identifier(builder::SOURCE_ALIAS);
        let keys_match = |left: &str| {
            ctx.primary_keys()
                .iter()
                .map(|pk| {
                    let pk = D.quote_identifier(pk);
                    format!("{}.{} = {}.{}", left, pk, source_alias, pk)
                })
                .collect::<Vec<_>>()
                .join(" AND ")
        };

        let mut statements = Vec::new();
        let updates: Vec<String> = self
            .projection(ctx, Some(builder::SOURCE_ALIAS))
            .into_iter()
            .filter(|(column, _)| !ctx.primary_keys().contains(column))
            .map(|(column, value)| format!("{} = {}", D.quote_identifier(&column), value))
            .collect();
        if !updates.is_empty() {
            statements.push(Statement::new(format!(
                "UPDATE {} SET {} FROM {} AS {} WHERE {}",
                target_name,
                updates.join(", "),
                from.quoted(D),
                source_alias,
                keys_match(&target_name)
            )));
        }

        statements.push(Statement::new(format!(
            "DELETE {} FROM {} AS {} WHERE EXISTS (SELECT * FROM {} WHERE {})",
            source_alias,
            from.quoted(D),
            source_alias,
            target_name,
            keys_match(&target_name)
        )));
        statements.push(self.insert_into(ctx, from, &target));
        statements
    }

    fn create_table_like(&self, ctx: &ImportContext<'_>, table: &TableRef, like: &TableRef) -> Statement {
        let distribution = match ctx.options.synapse_distribution() {
            SynapseDistribution::RoundRobin => "ROUND_ROBIN".to_string(),
            SynapseDistribution::Replicate => "REPLICATE".to_string(),
            SynapseDistribution::Hash(columns) => format!(
                "HASH({})",
                columns
                    .iter()
                    .map(|c| D.quote_identifier(c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        Statement::new(format!(
            "CREATE TABLE {} WITH (DISTRIBUTION = {}) AS SELECT * FROM {} WHERE 1 = 0",
            table.quoted(D),
            distribution,
            like.quoted(D)
        ))
    }

    fn rename_table(&self, from: &TableRef, to_name: &str) -> Statement {
        Statement::new(format!(
            "RENAME OBJECT {} TO {}",
            from.quoted(D),
            D.quote_identifier(to_name)
        ))
    }

    fn drop_table(&self, table: &TableRef) -> Statement {
        let object_name = if table.name.starts_with('#') {
            format!("tempdb..{}", table.quoted(D))
        } else {
            table.quoted(D)
        };
        Statement::new(format!(
            "IF OBJECT_ID({}) IS NOT NULL DROP TABLE {}",
            D.quote(&object_name),
            table.quoted(D)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CloudFileSource, CloudLocation, ColumnDefinition, CsvOptions, ImportOptionsExtension,
        Source,
    };

    fn destination() -> Destination {
        Destination::new(
            "dbo",
            "accounts",
            vec![ColumnDefinition::new("id"), ColumnDefinition::new("name")],
            vec!["id".into()],
        )
        .unwrap()
    }

    fn azure_source() -> Source {
        CloudFileSource::new(
            CloudLocation::azure("acc", "cont", "in/a.csv"),
            CloudCredentials::Azure {
                sas_token: "?sv=1&sig=abc".into(),
                account_key: None,
            },
            CsvOptions::default(),
            vec!["id".into(), "name".into()],
            vec![],
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_staging_is_session_temp_table() {
        let destination = destination();
        let staging = SynapseImportAdapter.staging_table(&destination, &ImportOptions::default(), "x1");
        assert_eq!(staging.quoted(D), "[#__temp_x1]");
        assert_eq!(
            SynapseImportAdapter.drop_table(&staging).sql,
            "IF OBJECT_ID('tempdb..[#__temp_x1]') IS NOT NULL DROP TABLE [#__temp_x1]"
        );
    }

    #[test]
    fn test_copy_from_azure() {
        let source = azure_source();
        let destination = destination();
        let options = ImportOptions::builder().number_of_ignored_lines(1).build();
        let staging = TableRef::unqualified("#__temp_x1");
        let files = vec!["azure://acc.blob.core.windows.net/cont/in/a.csv".to_string()];
        let ctx = ImportContext {
            source: &source,
            destination: &destination,
            options: &options,
            staging: &staging,
            files: &files,
            max_files_per_copy: 1000,
        };
        let statements = SynapseImportAdapter.copy_to_staging(&ctx).unwrap();
        assert_eq!(statements.len(), 1);
        let sql = &statements[0].sql;
        assert!(sql.starts_with(
            "COPY INTO [#__temp_x1] FROM 'https://acc.blob.core.windows.net/cont/in/a.csv' WITH (FILE_TYPE = 'CSV'"
        ));
        assert!(sql.contains("SECRET = 'sv=1&sig=abc'"));
        assert!(sql.contains("FIRSTROW = 2"));
        assert!(sql.contains("FIELDQUOTE = '\"'"));
    }

    #[test]
    fn test_merge_is_update_delete_insert() {
        let source = azure_source();
        let destination = destination();
        let options = ImportOptions::builder().incremental(true).build();
        let staging = TableRef::unqualified("#__temp_x1");
        let ctx = ImportContext {
            source: &source,
            destination: &destination,
            options: &options,
            staging: &staging,
            files: &[],
            max_files_per_copy: 1000,
        };
        let dedup = TableRef::unqualified("#__temp_dedup_x1");
        let statements = SynapseImportAdapter.merge(&ctx, &dedup);
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[0].sql,
            "UPDATE [dbo].[accounts] SET [name] = [src].[name] FROM [#__temp_dedup_x1] AS [src] WHERE [dbo].[accounts].[id] = [src].[id]"
        );
        assert!(statements[1].sql.starts_with("DELETE [src] FROM [#__temp_dedup_x1] AS [src] WHERE EXISTS"));
        assert_eq!(
            statements[2].sql,
            "INSERT INTO [dbo].[accounts] ([id], [name]) SELECT [id], [name] FROM [#__temp_dedup_x1]"
        );
    }

    fn swap_table_sql(options: &ImportOptions) -> String {
        let source = azure_source();
        let destination = destination();
        let staging = TableRef::unqualified("#__temp_x1");
        let ctx = ImportContext {
            source: &source,
            destination: &destination,
            options,
            staging: &staging,
            files: &[],
            max_files_per_copy: 1000,
        };
        SynapseImportAdapter
            .create_table_like(&ctx, &TableRef::new("dbo", "__temp_swap_1"), &destination.table_ref())
            .sql
    }

    #[test]
    fn test_rename_and_like() {
        let table = TableRef::new("dbo", "accounts");
        assert_eq!(
            SynapseImportAdapter.rename_table(&table, "__temp_old_1").sql,
            "RENAME OBJECT [dbo].[accounts] TO [__temp_old_1]"
        );
        assert_eq!(
            swap_table_sql(&ImportOptions::default()),
            "CREATE TABLE [dbo].[__temp_swap_1] WITH (DISTRIBUTION = ROUND_ROBIN) AS SELECT * FROM [dbo].[accounts] WHERE 1 = 0"
        );
    }

    #[test]
    fn test_swap_table_keeps_distribution() {
        let hashed = ImportOptions::builder()
            .extension(ImportOptionsExtension::Synapse {
                distribution: SynapseDistribution::Hash(vec!["id".into()]),
            })
            .build();
        assert_eq!(
            swap_table_sql(&hashed),
            "CREATE TABLE [dbo].[__temp_swap_1] WITH (DISTRIBUTION = HASH([id])) AS SELECT * FROM [dbo].[accounts] WHERE 1 = 0"
        );

        let replicated = ImportOptions::builder()
            .extension(ImportOptionsExtension::Synapse {
                distribution: SynapseDistribution::Replicate,
            })
            .build();
        assert!(swap_table_sql(&replicated).contains("WITH (DISTRIBUTION = REPLICATE)"));
    }
}
