//! Teradata: imports from tables and queries only

use super::{Backend, ImportAdapter, ImportContext};
use crate::models::TableDefinition;
use crate::sql::{Dialect, Statement, TableRef, builder};
use crate::storage::StorageProvider;

const D: Dialect = Dialect::Teradata;

pub struct TeradataImportAdapter;

impl ImportAdapter for TeradataImportAdapter {
    fn backend(&self) -> Backend {
        Backend::Teradata
    }

    fn supported_providers(&self) -> &'static [StorageProvider] {
        &[]
    }

    fn string_type(&self) -> &'static str {
        "VARCHAR(32000) CHARACTER SET UNICODE"
    }

    fn load_sequence_type(&self) -> Option<&'static str> {
        Some("BIGINT GENERATED ALWAYS AS IDENTITY (START WITH 1 INCREMENT BY 1 NO CYCLE)")
    }

    fn create_staging_table(&self, definition: &TableDefinition) -> Statement {
        Statement::new(builder::create_table(
            D,
            "CREATE MULTISET TABLE",
            &definition.table,
            &definition.columns,
            " NO PRIMARY INDEX",
        ))
    }

    fn create_table_like(&self, _ctx: &ImportContext<'_>, table: &TableRef, like: &TableRef) -> Statement {
        Statement::new(format!(
            "CREATE TABLE {} AS {} WITH NO DATA",
            table.quoted(D),
            like.quoted(D)
        ))
    }

    fn rename_table(&self, from: &TableRef, to_name: &str) -> Statement {
        Statement::new(format!(
            "RENAME TABLE {} TO {}",
            from.quoted(D),
            from.sibling(to_name).quoted(D)
        ))
    }

    /// Teradata has no `IF EXISTS`; only tables the call created are dropped
    fn drop_table(&self, table: &TableRef) -> Statement {
        Statement::new(format!("DROP TABLE {}", table.quoted(D)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CloudCredentials, CloudFileSource, CloudLocation, ColumnDefinition, CsvOptions,
        Destination, ImportOptions, Source, TableSource,
    };

    fn destination() -> Destination {
        Destination::new(
            "db",
            "t",
            vec![ColumnDefinition::new("id"), ColumnDefinition::new("v")],
            vec!["id".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_cloud_sources_are_unsupported() {
        let source: Source = CloudFileSource::new(
            CloudLocation::s3("b", "k"),
            CloudCredentials::S3 {
                access_key_id: "a".into(),
                secret_access_key: "s".into(),
                region: "r".into(),
                session_token: None,
            },
            CsvOptions::default(),
            vec!["id".into()],
            vec![],
        )
        .unwrap()
        .into();
        assert!(!TeradataImportAdapter.is_supported(&source, &destination()));
    }

    #[test]
    fn test_full_load_statements() {
        let source: Source = TableSource::new("db", "src", vec!["id".into(), "v".into()], vec![])
            .unwrap()
            .into();
        let destination = destination();
        let options = ImportOptions::default();
        let staging = TableRef::new("db", "__temp_1");
        let ctx = ImportContext {
            source: &source,
            destination: &destination,
            options: &options,
            staging: &staging,
            files: &[],
            max_files_per_copy: 1000,
        };
        let swap = TableRef::new("db", "__temp_swap_1");
        let old = TableRef::new("db", "__temp_old_1");
        assert_eq!(
            TeradataImportAdapter.create_table_like(&ctx, &swap, &destination.table_ref()).sql,
            "CREATE TABLE \"db\".\"__temp_swap_1\" AS \"db\".\"t\" WITH NO DATA"
        );
        let statements: Vec<String> = TeradataImportAdapter
            .swap(&ctx, &swap, &old)
            .into_iter()
            .map(|s| s.sql)
            .collect();
        assert_eq!(
            statements,
            vec![
                "RENAME TABLE \"db\".\"t\" TO \"db\".\"__temp_old_1\"",
                "RENAME TABLE \"db\".\"__temp_swap_1\" TO \"db\".\"t\"",
                "DROP TABLE \"db\".\"__temp_old_1\"",
            ]
        );
    }

    #[test]
    fn test_multiset_staging() {
        let definition = TableDefinition::new(
            TableRef::new("db", "__temp_1"),
            vec![("id".into(), TeradataImportAdapter.string_type().into())],
        );
        assert_eq!(
            TeradataImportAdapter.create_staging_table(&definition).sql,
            "CREATE MULTISET TABLE \"db\".\"__temp_1\" (\"id\" VARCHAR(32000) CHARACTER SET UNICODE) NO PRIMARY INDEX"
        );
    }
}
