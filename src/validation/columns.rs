//! Column checks run before an import issues any SQL

use std::collections::BTreeSet;

use crate::error::{ErrorKind, ImportExportError, ImportExportResult};
use crate::models::{Destination, ImportOptions, Source, TIMESTAMP_COLUMN};

/// Validate a single column name
///
/// Names are quoted before use, so only blank names and names containing
/// control characters are rejected.
pub fn validate_column_name(name: &str) -> ImportExportResult<()> {
    if name.trim().is_empty() {
        return Err(ImportExportError::new(
            ErrorKind::InvalidColumnName,
            "Column name must not be empty",
        )
        .with_context("column", name));
    }

    if let Some(c) = name.chars().find(|c| c.is_control()) {
        return Err(ImportExportError::new(
            ErrorKind::InvalidColumnName,
            format!("Column name {:?} contains control character {:?}", name, c),
        )
        .with_context("column", name));
    }

    Ok(())
}

/// Checks a source against the destination it is imported into
#[derive(Default)]
pub struct ColumnValidator;

impl ColumnValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run every column check, failing on the first violation
    ///
    /// Order: presence, names, duplicates, membership in the destination,
    /// primary keys for incremental loads, dedup ranking columns, then the
    /// timestamp column.
    pub fn validate(
        &self,
        source: &Source,
        destination: &Destination,
        options: &ImportOptions,
    ) -> ImportExportResult<()> {
        let table = destination.table_ref().to_string();
        let columns = source.columns();

        if columns.is_empty() {
            return Err(ImportExportError::no_columns(&table));
        }

        for column in columns {
            validate_column_name(column)?;
        }

        self.check_duplicates(columns)?;

        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !destination.has_column(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ImportExportError::columns_mismatch(&table, &missing));
        }

        if options.is_incremental() {
            let missing_keys: Vec<&str> = destination
                .primary_keys()
                .iter()
                .filter(|pk| !columns.contains(pk))
                .map(String::as_str)
                .collect();
            if !missing_keys.is_empty() {
                return Err(ImportExportError::validation(format!(
                    "Incremental import into {} needs primary keys {} in the source",
                    table,
                    missing_keys.join(", ")
                ))
                .with_context("table", table.as_str())
                .with_context("columns", missing_keys.join(",")));
            }
        }

        let unknown_ranking: Vec<&str> = options
            .dedup_order_by()
            .iter()
            .filter(|c| !columns.contains(c))
            .map(String::as_str)
            .collect();
        if !unknown_ranking.is_empty() {
            return Err(ImportExportError::validation(format!(
                "Duplicates in {} cannot be ranked by columns missing from the source: {}",
                table,
                unknown_ranking.join(", ")
            ))
            .with_context("columns", unknown_ranking.join(",")));
        }

        if options.use_timestamp() && !destination.has_column(TIMESTAMP_COLUMN) {
            return Err(ImportExportError::validation(format!(
                "Destination table {} has no {} column",
                table, TIMESTAMP_COLUMN
            ))
            .with_context("table", table.as_str()));
        }

        Ok(())
    }

    fn check_duplicates(&self, columns: &[String]) -> ImportExportResult<()> {
        let mut seen = BTreeSet::new();
        let duplicates: BTreeSet<&str> = columns
            .iter()
            .filter(|c| !seen.insert(c.as_str()))
            .map(String::as_str)
            .collect();
        if duplicates.is_empty() {
            return Ok(());
        }
        let names = duplicates.into_iter().collect::<Vec<_>>().join(", ");
        Err(ImportExportError::new(
            ErrorKind::DuplicateColumnNames,
            format!("Duplicate column names: {}", names),
        )
        .with_context("columns", names))
    }
}
