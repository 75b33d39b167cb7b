//! Import and export options

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Column written with the load time when `use_timestamp` is set
pub const TIMESTAMP_COLUMN: &str = "_timestamp";

/// How BigQuery staging columns are typed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BigQueryUsingTypes {
    /// Every staging column is `STRING`
    #[default]
    String,
    /// Staging columns take the declared destination types
    UserDefined,
}

/// Distribution of the table a Synapse full load swaps in
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynapseDistribution {
    #[default]
    RoundRobin,
    Replicate,
    /// Hash-distributed on these columns
    Hash(Vec<String>),
}

/// Backend-specific import options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ImportOptionsExtension {
    #[default]
    None,
    BigQuery {
        using_types: BigQueryUsingTypes,
        /// Session the caller's executor runs in; staging becomes a session temp table
        session_id: Option<String>,
    },
    Exasol {
        /// Cast values to the destination types when writing the destination
        cast_value_types: bool,
    },
    Synapse {
        /// Must match the destination's distribution, a swap cannot read it back
        #[serde(default)]
        distribution: SynapseDistribution,
    },
}

/// Options of one import call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    convert_empty_values_to_null: BTreeSet<String>,
    is_incremental: bool,
    use_timestamp: bool,
    number_of_ignored_lines: u32,
    import_as_null: Vec<String>,
    #[serde(default)]
    dedup_order_by: Vec<String>,
    extension: ImportOptionsExtension,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            convert_empty_values_to_null: BTreeSet::new(),
            is_incremental: false,
            use_timestamp: false,
            number_of_ignored_lines: 0,
            import_as_null: vec![String::new()],
            dedup_order_by: Vec::new(),
            extension: ImportOptionsExtension::None,
        }
    }
}

impl ImportOptions {
    pub fn builder() -> ImportOptionsBuilder {
        ImportOptionsBuilder::default()
    }

    /// Columns whose `import_as_null` values become SQL NULL
    pub fn convert_empty_values_to_null(&self) -> &BTreeSet<String> {
        &self.convert_empty_values_to_null
    }

    pub fn converts_to_null(&self, column: &str) -> bool {
        self.convert_empty_values_to_null.contains(column)
    }

    /// Merge into the destination instead of replacing it
    pub fn is_incremental(&self) -> bool {
        self.is_incremental
    }

    /// Write the load time into [`TIMESTAMP_COLUMN`]
    pub fn use_timestamp(&self) -> bool {
        self.use_timestamp
    }

    /// Leading file lines to skip, usually the header
    pub fn number_of_ignored_lines(&self) -> u32 {
        self.number_of_ignored_lines
    }

    pub fn import_as_null(&self) -> &[String] {
        &self.import_as_null
    }

    /// Source columns ranking rows that share a primary key, greatest first
    ///
    /// Ties, and imports without a ranking, keep the row loaded last where
    /// the backend records load order.
    pub fn dedup_order_by(&self) -> &[String] {
        &self.dedup_order_by
    }

    pub fn extension(&self) -> &ImportOptionsExtension {
        &self.extension
    }

    pub fn bigquery_using_types(&self) -> BigQueryUsingTypes {
        match &self.extension {
            ImportOptionsExtension::BigQuery { using_types, .. } => *using_types,
            _ => BigQueryUsingTypes::default(),
        }
    }

    pub fn bigquery_session_id(&self) -> Option<&str> {
        match &self.extension {
            ImportOptionsExtension::BigQuery { session_id, .. } => session_id.as_deref(),
            _ => None,
        }
    }

    pub fn synapse_distribution(&self) -> SynapseDistribution {
        match &self.extension {
            ImportOptionsExtension::Synapse { distribution } => distribution.clone(),
            _ => SynapseDistribution::default(),
        }
    }

    pub fn exasol_cast_value_types(&self) -> bool {
        matches!(
            self.extension,
            ImportOptionsExtension::Exasol {
                cast_value_types: true
            }
        )
    }
}

/// Builder for [`ImportOptions`]
#[derive(Debug, Clone, Default)]
pub struct ImportOptionsBuilder {
    options: ImportOptions,
}

impl ImportOptionsBuilder {
    pub fn convert_empty_values_to_null<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.convert_empty_values_to_null = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn incremental(mut self, is_incremental: bool) -> Self {
        self.options.is_incremental = is_incremental;
        self
    }

    pub fn use_timestamp(mut self, use_timestamp: bool) -> Self {
        self.options.use_timestamp = use_timestamp;
        self
    }

    pub fn number_of_ignored_lines(mut self, lines: u32) -> Self {
        self.options.number_of_ignored_lines = lines;
        self
    }

    pub fn import_as_null<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.import_as_null = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn dedup_order_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.dedup_order_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn extension(mut self, extension: ImportOptionsExtension) -> Self {
        self.options.extension = extension;
        self
    }

    pub fn build(self) -> ImportOptions {
        self.options
    }
}

/// Options of one export call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Replace the generated `SELECT` over the source
    #[serde(default)]
    pub query: Option<String>,
    /// Gzip the produced objects
    #[serde(default)]
    pub compression: bool,
    /// Write a manifest listing the produced objects
    #[serde(default = "default_generate_manifest")]
    pub generate_manifest: bool,
}

fn default_generate_manifest() -> bool {
    true
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            query: None,
            compression: false,
            generate_manifest: default_generate_manifest(),
        }
    }
}

impl ExportOptions {
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_manifest(mut self, generate_manifest: bool) -> Self {
        self.generate_manifest = generate_manifest;
        self
    }
}
