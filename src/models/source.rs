//! Import sources

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CloudCredentials, CloudLocation, CsvOptions};
use crate::error::{ImportExportError, ImportExportResult};
use crate::manifest::resolve_manifest;
use crate::sql::{Dialect, TableRef, builder::QUERY_ALIAS};
use crate::storage::CloudStorage;

/// Kind of source, used as a registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Table,
    SelectQuery,
    CloudFile,
    /// Cloud file whose objects are listed in a manifest
    CloudFileManifest,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Table => write!(f, "table"),
            SourceKind::SelectQuery => write!(f, "select_query"),
            SourceKind::CloudFile => write!(f, "cloud_file"),
            SourceKind::CloudFileManifest => write!(f, "cloud_file_manifest"),
        }
    }
}

fn check_primary_keys(columns: &[String], primary_keys: &[String]) -> ImportExportResult<()> {
    let missing: Vec<&str> = primary_keys
        .iter()
        .filter(|pk| !columns.contains(pk))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportExportError::validation(format!(
            "Primary keys {} are not among the source columns",
            missing.join(", ")
        ))
        .with_context("columns", missing.join(",")))
    }
}

/// Existing table in the same warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSource {
    pub schema: String,
    pub table: String,
    columns: Vec<String>,
    primary_keys: Vec<String>,
}

impl TableSource {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        primary_keys: Vec<String>,
    ) -> ImportExportResult<Self> {
        check_primary_keys(&columns, &primary_keys)?;
        Ok(Self {
            schema: schema.into(),
            table: table.into(),
            columns,
            primary_keys,
        })
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.table.clone())
    }
}

/// `SELECT` statement evaluated in the same warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySource {
    pub query: String,
    /// Positional values for `?` placeholders in `query`
    #[serde(default)]
    pub bindings: Vec<serde_json::Value>,
    columns: Vec<String>,
    primary_keys: Vec<String>,
}

impl QuerySource {
    pub fn new(
        query: impl Into<String>,
        bindings: Vec<serde_json::Value>,
        columns: Vec<String>,
        primary_keys: Vec<String>,
    ) -> ImportExportResult<Self> {
        check_primary_keys(&columns, &primary_keys)?;
        Ok(Self {
            query: query.into(),
            bindings,
            columns,
            primary_keys,
        })
    }
}

/// CSV object, or set of objects listed by a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFileSource {
    pub location: CloudLocation,
    pub credentials: CloudCredentials,
    pub csv_options: CsvOptions,
    /// `location.path` names a manifest (or a prefix whose manifest lists the slices)
    pub sliced: bool,
    /// Whether a missing manifest is an error
    pub manifest_mandatory: bool,
    columns: Vec<String>,
    primary_keys: Vec<String>,
}

impl CloudFileSource {
    pub fn new(
        location: CloudLocation,
        credentials: CloudCredentials,
        csv_options: CsvOptions,
        columns: Vec<String>,
        primary_keys: Vec<String>,
    ) -> ImportExportResult<Self> {
        check_primary_keys(&columns, &primary_keys)?;
        credentials.ensure_matches(&location)?;
        Ok(Self {
            location,
            credentials,
            csv_options,
            sliced: false,
            manifest_mandatory: true,
            columns,
            primary_keys,
        })
    }

    /// Read the object list from a manifest
    pub fn sliced(mut self, manifest_mandatory: bool) -> Self {
        self.sliced = true;
        self.manifest_mandatory = manifest_mandatory;
        self
    }

    /// URLs of the objects to load
    ///
    /// A plain file yields its own URL; a sliced file yields the manifest
    /// entries verbatim, which may be empty.
    pub async fn manifest_entries(&self, storage: &dyn CloudStorage) -> ImportExportResult<Vec<String>> {
        if !self.sliced {
            return Ok(vec![self.location.url()]);
        }
        let manifest = resolve_manifest(storage, &self.location, self.manifest_mandatory).await?;
        Ok(manifest.urls())
    }
}

/// Where imported rows come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    Table(TableSource),
    SelectQuery(QuerySource),
    CloudFile(CloudFileSource),
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Table(_) => SourceKind::Table,
            Source::SelectQuery(_) => SourceKind::SelectQuery,
            Source::CloudFile(file) if file.sliced => SourceKind::CloudFileManifest,
            Source::CloudFile(_) => SourceKind::CloudFile,
        }
    }

    /// Column names in file or result-set order
    pub fn columns(&self) -> &[String] {
        match self {
            Source::Table(s) => &s.columns,
            Source::SelectQuery(s) => &s.columns,
            Source::CloudFile(s) => &s.columns,
        }
    }

    pub fn primary_keys(&self) -> &[String] {
        match self {
            Source::Table(s) => &s.primary_keys,
            Source::SelectQuery(s) => &s.primary_keys,
            Source::CloudFile(s) => &s.primary_keys,
        }
    }

    /// `FROM` target of SQL sources: `"schema"."table"` or `(query) AS "_source"`
    pub fn from_statement(&self, dialect: Dialect) -> Option<String> {
        match self {
            Source::Table(s) => Some(s.table_ref().quoted(dialect)),
            Source::SelectQuery(s) => Some(format!(
                "({}) AS {}",
                s.query,
                dialect.quote_identifier(QUERY_ALIAS)
            )),
            Source::CloudFile(_) => None,
        }
    }

    /// Bindings to send along with statements reading this source
    pub fn bindings(&self) -> &[serde_json::Value] {
        match self {
            Source::SelectQuery(s) => &s.bindings,
            _ => &[],
        }
    }

    pub fn as_cloud_file(&self) -> Option<&CloudFileSource> {
        match self {
            Source::CloudFile(file) => Some(file),
            _ => None,
        }
    }

    pub fn is_cloud_file(&self) -> bool {
        self.as_cloud_file().is_some()
    }

    /// Secret values carried by the source
    pub fn secrets(&self) -> Vec<&str> {
        self.as_cloud_file()
            .map(|file| file.credentials.secrets())
            .unwrap_or_default()
    }
}

impl From<TableSource> for Source {
    fn from(source: TableSource) -> Self {
        Source::Table(source)
    }
}

impl From<QuerySource> for Source {
    fn from(source: QuerySource) -> Self {
        Source::SelectQuery(source)
    }
}

impl From<CloudFileSource> for Source {
    fn from(source: CloudFileSource) -> Self {
        Source::CloudFile(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::manifest::{Manifest, ManifestEntry};
    use crate::storage::{MemoryStorage, StorageProvider};

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn gcs_source(path: &str) -> CloudFileSource {
        CloudFileSource::new(
            CloudLocation::gcs("bucket", path),
            CloudCredentials::Gcs {
                storage_integration: None,
            },
            CsvOptions::default(),
            cols(&["id", "name"]),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_primary_keys_must_be_columns() {
        let err = TableSource::new("s", "t", cols(&["a"]), cols(&["b"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains('b'));
    }

    #[test]
    fn test_kinds() {
        let table: Source = TableSource::new("s", "t", cols(&["a"]), vec![]).unwrap().into();
        assert_eq!(table.kind(), SourceKind::Table);

        let file: Source = gcs_source("f.csv").into();
        assert_eq!(file.kind(), SourceKind::CloudFile);

        let sliced: Source = gcs_source("f.csv").sliced(true).into();
        assert_eq!(sliced.kind(), SourceKind::CloudFileManifest);
    }

    #[test]
    fn test_from_statement() {
        let table: Source = TableSource::new("schema", "table", cols(&["a"]), vec![])
            .unwrap()
            .into();
        assert_eq!(
            table.from_statement(Dialect::Snowflake).as_deref(),
            Some("\"schema\".\"table\"")
        );

        let query: Source = QuerySource::new("SELECT 1 AS a", vec![], cols(&["a"]), vec![])
            .unwrap()
            .into();
        assert_eq!(
            query.from_statement(Dialect::Synapse).as_deref(),
            Some("(SELECT 1 AS a) AS [_source]")
        );
        assert_eq!(Source::from(gcs_source("f.csv")).from_statement(Dialect::BigQuery), None);
    }

    #[tokio::test]
    async fn test_manifest_entries() {
        let storage = MemoryStorage::new(StorageProvider::Gcs);
        assert_eq!(
            gcs_source("f.csv").manifest_entries(&storage).await.unwrap(),
            vec!["gs://bucket/f.csv"]
        );

        let manifest = Manifest::new(vec![
            ManifestEntry::mandatory("gs://bucket/s/part1.csv"),
            ManifestEntry::mandatory("gs://bucket/s/part2.csv"),
        ]);
        storage.insert("bucket", "s/data.csvmanifest", manifest.to_json().unwrap());
        let sliced = gcs_source("s/data.csv").sliced(true);
        assert_eq!(
            sliced.manifest_entries(&storage).await.unwrap(),
            vec!["gs://bucket/s/part1.csv", "gs://bucket/s/part2.csv"]
        );
    }
}
