use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;
use crate::sql::TableRef;

/// Outcome of a successful import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct ImportResult {
    /// Rows counted in staging, before deduplication
    pub imported_rows_count: u64,
    pub timers: BTreeMap<String, Duration>,
    pub staging_table: TableRef,
    /// Executed SQL with credentials scrubbed
    pub executed_statements: Vec<String>,
}

impl ImportResult {
    pub fn timer(&self, label: &str) -> Option<Duration> {
        self.timers.get(label).copied()
    }
}

/// One object written by an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct ExportResult {
    pub files: Vec<ExportedFile>,
    /// Manifest describing `files`, when one was generated
    pub manifest: Option<Manifest>,
    /// URL the manifest was written to
    pub manifest_url: Option<String>,
    pub timers: BTreeMap<String, Duration>,
    pub executed_statements: Vec<String>,
}

impl ExportResult {
    /// Total rows, when the backend reported per-file counts
    pub fn row_count(&self) -> Option<u64> {
        self.files.iter().map(|f| f.row_count).sum()
    }
}
