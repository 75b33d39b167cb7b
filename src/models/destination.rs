//! Import and export targets

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CloudCredentials, CloudLocation, ColumnDefinition, CsvOptions, Source};
use crate::backend::{Backend, ExportAdapter, ImportAdapter, registry};
use crate::error::{ImportExportError, ImportExportResult};
use crate::sql::TableRef;

/// Kind of destination, used as a registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    Table,
    CloudFile,
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationKind::Table => write!(f, "table"),
            DestinationKind::CloudFile => write!(f, "cloud_file"),
        }
    }
}

/// Existing warehouse table receiving imported rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Schema, or dataset on BigQuery
    pub schema: String,
    pub table: String,
    columns: Vec<ColumnDefinition>,
    primary_keys: Vec<String>,
}

impl Destination {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        primary_keys: Vec<String>,
    ) -> ImportExportResult<Self> {
        let table = table.into();
        let missing: Vec<&str> = primary_keys
            .iter()
            .filter(|pk| !columns.iter().any(|c| &c.name == *pk))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ImportExportError::validation(format!(
                "Primary keys {} are not columns of destination table {}",
                missing.join(", "),
                table
            ))
            .with_context("table", table.as_str()));
        }
        Ok(Self {
            schema: schema.into(),
            table,
            columns,
            primary_keys,
        })
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.table.clone())
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Adapter loading `source` into this table on `backend`
    pub fn import_adapter(
        &self,
        backend: Backend,
        source: &Source,
    ) -> ImportExportResult<&'static dyn ImportAdapter> {
        let adapter = registry::import_adapter(backend, source.kind(), DestinationKind::Table)?;
        if !adapter.is_supported(source, self) {
            let source_name = match source.as_cloud_file() {
                Some(file) => format!("{} {}", source.kind(), file.location.provider),
                None => source.kind().to_string(),
            };
            return Err(ImportExportError::no_backend_adapter(
                &backend.to_string(),
                &source_name,
                &DestinationKind::Table.to_string(),
            ));
        }
        Ok(adapter)
    }
}

/// Object, or object prefix for sliced output, receiving exported rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFileDestination {
    pub location: CloudLocation,
    pub credentials: CloudCredentials,
    pub csv_options: CsvOptions,
    /// Let the warehouse split output into several objects
    pub sliced: bool,
}

impl CloudFileDestination {
    pub fn new(
        location: CloudLocation,
        credentials: CloudCredentials,
        csv_options: CsvOptions,
        sliced: bool,
    ) -> ImportExportResult<Self> {
        credentials.ensure_matches(&location)?;
        Ok(Self {
            location,
            credentials,
            csv_options,
            sliced,
        })
    }

    /// Adapter unloading `source` into this location on `backend`
    pub fn export_adapter(
        &self,
        backend: Backend,
        source: &Source,
    ) -> ImportExportResult<&'static dyn ExportAdapter> {
        let adapter = registry::export_adapter(backend, source.kind(), DestinationKind::CloudFile)?;
        if !adapter.is_supported(source, self) {
            return Err(ImportExportError::no_backend_adapter(
                &backend.to_string(),
                &source.kind().to_string(),
                &format!("{} {}", DestinationKind::CloudFile, self.location.provider),
            ));
        }
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_destination_primary_keys_must_exist() {
        let err = Destination::new(
            "s",
            "t",
            vec![ColumnDefinition::new("id")],
            vec!["missing".to_string()],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_destination_lookup() {
        let destination = Destination::new(
            "s",
            "t",
            vec![
                ColumnDefinition::typed("id", "INT"),
                ColumnDefinition::new("name"),
            ],
            vec!["id".to_string()],
        )
        .unwrap();
        assert_eq!(destination.column_names(), vec!["id", "name"]);
        assert_eq!(
            destination.column("id").and_then(|c| c.data_type.as_deref()),
            Some("INT")
        );
        assert!(!destination.has_column("other"));
        assert_eq!(destination.table_ref(), TableRef::new("s", "t"));
    }
}
