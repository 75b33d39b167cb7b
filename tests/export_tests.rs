//! Export workflow tests

mod common;

use std::sync::Arc;

use common::MockExecutor;
use db_import_export::backend::Backend;
use db_import_export::database::{ExecutorError, QueryResult};
use db_import_export::error::ErrorKind;
use db_import_export::export::{Exporter, UNLOAD};
use db_import_export::manifest::resolve_manifest;
use db_import_export::models::{
    CloudCredentials, CloudFileDestination, CloudLocation, CsvOptions, ExportOptions,
    QuerySource, Source, TableSource,
};
use db_import_export::storage::{MemoryStorage, StorageProvider};
use serde_json::json;

fn table_source() -> Source {
    TableSource::new("s", "t", vec!["id".to_string(), "name".to_string()], vec![])
        .unwrap()
        .into()
}

fn s3_destination(path: &str, sliced: bool) -> CloudFileDestination {
    CloudFileDestination::new(
        CloudLocation::s3("bucket", path),
        CloudCredentials::S3 {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "topsecret".to_string(),
            region: "eu-west-1".to_string(),
            session_token: None,
        },
        CsvOptions::default(),
        sliced,
    )
    .unwrap()
}

fn unload_rows() -> QueryResult {
    QueryResult::new(
        vec!["FILE_NAME".into(), "FILE_SIZE".into(), "ROW_COUNT".into()],
        vec![
            json!({"FILE_NAME": "data_0_0_0.csv.gz", "FILE_SIZE": 100, "ROW_COUNT": 10}),
            json!({"FILE_NAME": "data_0_1_0.csv.gz", "FILE_SIZE": 50, "ROW_COUNT": 4}),
        ],
    )
}

mod snowflake_export_tests {
    use super::*;

    #[tokio::test]
    async fn test_unload_rows_become_manifest() {
        let storage = Arc::new(MemoryStorage::new(StorageProvider::S3));
        let executor = Arc::new(MockExecutor::new().respond_to("COPY INTO 's3://", unload_rows()));
        let destination = s3_destination("exports/data_", true);

        let result = Exporter::new(executor.clone())
            .with_storage(storage.clone())
            .export(
                Backend::Snowflake,
                &table_source(),
                &destination,
                &ExportOptions::default().with_compression(true),
            )
            .await
            .unwrap();

        assert_eq!(result.files.len(), 2);
        assert_eq!(result.files[0].url, "s3://bucket/exports/data_0_0_0.csv.gz");
        assert_eq!(result.row_count(), Some(14));
        assert_eq!(
            result.manifest_url.as_deref(),
            Some("s3://bucket/exports/data_manifest")
        );
        assert!(result.timers.contains_key(UNLOAD));

        let manifest = resolve_manifest(storage.as_ref(), &destination.location, true)
            .await
            .unwrap();
        assert_eq!(
            manifest.urls(),
            vec![
                "s3://bucket/exports/data_0_0_0.csv.gz",
                "s3://bucket/exports/data_0_1_0.csv.gz",
            ]
        );

        let statement = &executor.statements()[0];
        assert!(statement.starts_with(
            "COPY INTO 's3://bucket/exports/data_' FROM (SELECT \"id\", \"name\" FROM \"s\".\"t\")"
        ));
        assert!(statement.contains("COMPRESSION = 'GZIP'"));
        assert!(!statement.contains("SINGLE = TRUE"));
        assert!(!result.executed_statements[0].contains("topsecret"));
    }

    #[tokio::test]
    async fn test_query_source_without_manifest() {
        let executor = Arc::new(MockExecutor::new().respond_to("COPY INTO", unload_rows()));
        let source: Source = QuerySource::new(
            "SELECT id FROM s.t WHERE id > ?",
            vec![json!(5)],
            vec!["id".to_string()],
            vec![],
        )
        .unwrap()
        .into();

        let result = Exporter::new(executor.clone())
            .export(
                Backend::Snowflake,
                &source,
                &s3_destination("exports/single.csv", false),
                &ExportOptions::default().with_manifest(false),
            )
            .await
            .unwrap();

        assert!(result.manifest.is_none());
        assert!(result.manifest_url.is_none());
        assert_eq!(result.files.len(), 2);
        let statement = &executor.statements()[0];
        assert!(statement.contains("FROM (SELECT \"id\" FROM (SELECT id FROM s.t WHERE id > ?) AS \"_source\")"));
        assert!(statement.contains("SINGLE = TRUE"));
    }

    #[tokio::test]
    async fn test_unknown_unload_failure() {
        let executor = Arc::new(
            MockExecutor::new().fail_on("COPY INTO", ExecutorError::QueryFailed("kaput".into())),
        );
        let err = Exporter::new(executor)
            .export(
                Backend::Snowflake,
                &table_source(),
                &s3_destination("exports/data_", true),
                &ExportOptions::default().with_manifest(false),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownExport);
        assert!(err.is_retryable());
    }
}

mod folder_listing_tests {
    use super::*;

    #[tokio::test]
    async fn test_exasol_sliced_export_lists_folder() {
        let storage = Arc::new(MemoryStorage::new(StorageProvider::S3));
        storage.insert("bucket", "out/", "");
        storage.insert("bucket", "out/data_0.csv", "1,a\n2,b\n");

        let executor = Arc::new(MockExecutor::new());
        let result = Exporter::new(executor.clone())
            .with_storage(storage.clone())
            .export(
                Backend::Exasol,
                &table_source(),
                &s3_destination("out/", true),
                &ExportOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].url, "s3://bucket/out/data_0.csv");
        assert_eq!(result.files[0].size, Some(8));
        assert_eq!(result.files[0].row_count, None);
        assert_eq!(result.manifest_url.as_deref(), Some("s3://bucket/out/manifest"));
        assert!(storage.contains("bucket", "out/manifest"));
        assert!(executor.statements()[0].starts_with("EXPORT (SELECT \"id\", \"name\" FROM \"s\".\"t\") INTO CSV"));
    }

    #[tokio::test]
    async fn test_listing_needs_storage() {
        let executor = Arc::new(MockExecutor::new());
        let destination = CloudFileDestination::new(
            CloudLocation::gcs("bucket", "out/t_"),
            CloudCredentials::Gcs {
                storage_integration: None,
            },
            CsvOptions::default(),
            true,
        )
        .unwrap();

        let err = Exporter::new(executor.clone())
            .export(
                Backend::BigQuery,
                &table_source(),
                &destination,
                &ExportOptions::default().with_manifest(false),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFileParams);
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn test_backends_without_export() {
        let executor = Arc::new(MockExecutor::new());
        let err = Exporter::new(executor)
            .export(
                Backend::Synapse,
                &table_source(),
                &s3_destination("out/", true),
                &ExportOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoBackendAdapter);
    }
}
