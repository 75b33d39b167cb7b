//! Staging-table import workflow
//!
//! One call runs, in order and each under its own timer:
//!
//! ```text
//! validateColumns -> resolveFiles -> createStagingTable -> copyToStaging
//!   -> countRows -> (incremental: dedup + merge | insertIntoDestination)
//!                   (full load:   insertIntoDestination + swap)
//!   -> cleanup
//! ```
//!
//! Cleanup runs whether or not the load succeeded and never replaces the
//! error of the failed phase.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::id::{IdGenerator, TimestampIdGenerator};
use crate::backend::{Backend, ImportAdapter, ImportContext};
use crate::database::config::DEFAULT_MAX_FILES_PER_COPY;
use crate::database::{EngineConfig, ExecutorError, QueryResult, RetryPolicy, SqlExecutor};
use crate::error::{ErrorKind, ImportExportError, ImportExportResult, classify, sanitize};
use crate::models::{Destination, ImportOptions, ImportResult, ImportState, Source};
use crate::sql::{Statement, TableRef};
use crate::storage::CloudStorage;
use crate::validation::ColumnValidator;

pub const VALIDATE_COLUMNS: &str = "validateColumns";
pub const RESOLVE_FILES: &str = "resolveFiles";
pub const CREATE_STAGING_TABLE: &str = "createStagingTable";
pub const COPY_TO_STAGING: &str = "copyToStaging";
pub const COUNT_ROWS: &str = "countRows";
pub const DEDUPLICATE: &str = "dedup";
pub const MERGE: &str = "merge";
pub const INSERT_INTO_DESTINATION: &str = "insertIntoDestination";
pub const SWAP: &str = "swap";
pub const CLEANUP: &str = "cleanup";

/// Loads sources into warehouse tables through a staging table
pub struct Importer {
    executor: Arc<dyn SqlExecutor>,
    storage: Option<Arc<dyn CloudStorage>>,
    id_generator: Arc<dyn IdGenerator>,
    retry_policy: RetryPolicy,
    max_files_per_copy: usize,
}

impl Importer {
    /// Importer running statements on `executor`
    ///
    /// Whole imports are not retried unless a retry policy is set.
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            executor,
            storage: None,
            id_generator: Arc::new(TimestampIdGenerator),
            retry_policy: RetryPolicy::none(),
            max_files_per_copy: DEFAULT_MAX_FILES_PER_COPY,
        }
    }

    /// Object store used to read manifests of sliced sources
    pub fn with_storage(mut self, storage: Arc<dyn CloudStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_max_files_per_copy(mut self, max_files_per_copy: usize) -> Self {
        self.max_files_per_copy = max_files_per_copy.max(1);
        self
    }

    /// Apply the retry policy and chunk size of `config`
    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_retry_policy(config.retry_policy())
            .with_max_files_per_copy(config.import.max_files_per_copy)
    }

    /// Import `source` into `destination` on `backend`
    ///
    /// # Errors
    ///
    /// - `NoBackendAdapter` when the backend cannot load this source
    /// - column validation kinds, raised before any SQL runs
    /// - classified driver errors of the failing phase; failures while
    ///   copying that match no known pattern are `UnknownImport`
    pub async fn import(
        &self,
        backend: Backend,
        source: &Source,
        destination: &Destination,
        options: &ImportOptions,
    ) -> ImportExportResult<ImportResult> {
        self.retry_policy
            .run(move || self.import_once(backend, source, destination, options))
            .await
    }

    async fn import_once(
        &self,
        backend: Backend,
        source: &Source,
        destination: &Destination,
        options: &ImportOptions,
    ) -> ImportExportResult<ImportResult> {
        let adapter = destination.import_adapter(backend, source)?;
        let id = self.id_generator.generate();
        info!(
            target: crate::USER_LOG_TARGET,
            "Importing {} source into {} on {}",
            source.kind(),
            destination.table_ref(),
            backend
        );

        let mut run = ImportRun {
            importer: self,
            adapter,
            source,
            destination,
            options,
            secrets: source.secrets(),
            state: ImportState::new(),
            executed: Vec::new(),
        };
        let outcome = run.load(&id).await;
        run.cleanup().await;
        let staging_table = outcome?;

        let imported_rows_count = run.state.imported_rows_count();
        info!(
            target: crate::USER_LOG_TARGET,
            "Imported {} rows into {}",
            imported_rows_count,
            destination.table_ref()
        );
        Ok(ImportResult {
            imported_rows_count,
            staging_table,
            executed_statements: run.executed,
            timers: run.state.into_timers(),
        })
    }
}

/// State of one import attempt
struct ImportRun<'a> {
    importer: &'a Importer,
    adapter: &'static dyn ImportAdapter,
    source: &'a Source,
    destination: &'a Destination,
    options: &'a ImportOptions,
    secrets: Vec<&'a str>,
    state: ImportState,
    executed: Vec<String>,
}

impl ImportRun<'_> {
    async fn load(&mut self, id: &str) -> ImportExportResult<TableRef> {
        let (source, destination, options, adapter) =
            (self.source, self.destination, self.options, self.adapter);

        self.state.start_timer(VALIDATE_COLUMNS)?;
        ColumnValidator::new().validate(source, destination, options)?;
        self.state.stop_timer(VALIDATE_COLUMNS)?;

        self.state.start_timer(RESOLVE_FILES)?;
        let files = self.resolve_files().await?;
        self.state.stop_timer(RESOLVE_FILES)?;

        let staging = adapter.staging_table(destination, options, id);
        self.state.set_staging_table(staging.clone());
        let ctx = ImportContext {
            source,
            destination,
            options,
            staging: &staging,
            files: &files,
            max_files_per_copy: self.importer.max_files_per_copy,
        };
        // Rendered up front so bad file parameters fail before any table exists
        let copy_statements = adapter.copy_to_staging(&ctx)?;

        self.state.start_timer(CREATE_STAGING_TABLE)?;
        let definition = adapter.staging_definition(source, destination, options, &staging);
        self.execute(CREATE_STAGING_TABLE, adapter.create_staging_table(&definition))
            .await?;
        self.state.register_table(staging.clone());
        self.state.stop_timer(CREATE_STAGING_TABLE)?;

        self.state.start_timer(COPY_TO_STAGING)?;
        for statement in copy_statements {
            self.execute(COPY_TO_STAGING, statement)
                .await
                .map_err(|err| err.narrow_unknown(ErrorKind::UnknownImport))?;
        }
        self.state.stop_timer(COPY_TO_STAGING)?;

        self.state.start_timer(COUNT_ROWS)?;
        let count = self
            .fetch(COUNT_ROWS, adapter.count_rows(&staging))
            .await?
            .scalar_u64()
            .ok_or_else(|| {
                ImportExportError::new(
                    ErrorKind::UnknownImport,
                    format!("Row count of staging table {} is not a number", staging),
                )
                .with_context("table", staging.to_string())
            })?;
        self.state.set_imported_rows_count(count);
        self.state.stop_timer(COUNT_ROWS)?;
        debug!(target: crate::USER_LOG_TARGET, "Staged {} rows in {}", count, staging);

        if options.is_incremental() {
            self.merge(&ctx, id).await?;
        } else {
            self.replace(&ctx, id).await?;
        }
        Ok(staging)
    }

    /// Object URLs of a cloud source, empty for SQL sources
    async fn resolve_files(&self) -> ImportExportResult<Vec<String>> {
        let Some(file) = self.source.as_cloud_file() else {
            return Ok(Vec::new());
        };
        if !file.sliced {
            return Ok(vec![file.location.url()]);
        }
        let storage = self.importer.storage.as_deref().ok_or_else(|| {
            ImportExportError::new(
                ErrorKind::InvalidFileParams,
                "Reading a sliced file needs access to cloud storage",
            )
            .with_context("url", file.location.url())
        })?;
        let files = file.manifest_entries(storage).await?;
        debug!(
            target: crate::USER_LOG_TARGET,
            "Manifest of {} lists {} files",
            file.location,
            files.len()
        );
        Ok(files)
    }

    async fn merge(&mut self, ctx: &ImportContext<'_>, id: &str) -> ImportExportResult<()> {
        let adapter = self.adapter;
        if ctx.primary_keys().is_empty() {
            self.state.start_timer(INSERT_INTO_DESTINATION)?;
            let target = ctx.destination.table_ref();
            self.execute(
                INSERT_INTO_DESTINATION,
                adapter.insert_into(ctx, ctx.staging, &target),
            )
            .await?;
            self.state.stop_timer(INSERT_INTO_DESTINATION)?;
            return Ok(());
        }

        self.state.start_timer(DEDUPLICATE)?;
        let dedup = adapter.dedup_table(ctx.destination, ctx.options, id);
        let definition = adapter.data_definition(ctx.source, ctx.destination, ctx.options, &dedup);
        self.execute(DEDUPLICATE, adapter.create_staging_table(&definition))
            .await?;
        self.state.register_table(dedup.clone());
        self.execute(DEDUPLICATE, adapter.deduplicate(ctx, &dedup)).await?;
        self.state.stop_timer(DEDUPLICATE)?;

        self.state.start_timer(MERGE)?;
        for statement in adapter.merge(ctx, &dedup) {
            self.execute(MERGE, statement).await?;
        }
        self.state.stop_timer(MERGE)?;
        Ok(())
    }

    /// Full load: fill a copy of the destination, then swap it in
    async fn replace(&mut self, ctx: &ImportContext<'_>, id: &str) -> ImportExportResult<()> {
        let adapter = self.adapter;
        let target = ctx.destination.table_ref();
        let swap = adapter.swap_table(ctx.destination, id);
        // Never registered for cleanup: after a failed swap it may hold the only copy
        let old = adapter.old_table(ctx.destination, id);

        self.state.start_timer(INSERT_INTO_DESTINATION)?;
        self.execute(INSERT_INTO_DESTINATION, adapter.create_table_like(ctx, &swap, &target))
            .await?;
        self.state.register_table(swap.clone());
        self.execute(INSERT_INTO_DESTINATION, adapter.insert_into(ctx, ctx.staging, &swap))
            .await?;
        self.state.stop_timer(INSERT_INTO_DESTINATION)?;

        self.state.start_timer(SWAP)?;
        for statement in adapter.swap(ctx, &swap, &old) {
            self.execute(SWAP, statement).await?;
        }
        self.state.forget_table(&swap);
        self.state.stop_timer(SWAP)?;
        Ok(())
    }

    /// Drop every table this attempt created, logging failures
    async fn cleanup(&mut self) {
        self.state.start_timer(CLEANUP).ok();
        for table in self.state.cleanup_tables() {
            let statement = self.adapter.drop_table(&table);
            match self.execute(CLEANUP, statement).await {
                Ok(_) => self.state.forget_table(&table),
                Err(err) => warn!(
                    target: crate::USER_LOG_TARGET,
                    "Failed to drop {} during cleanup: {}",
                    table,
                    err
                ),
            }
        }
        self.state.stop_timer(CLEANUP).ok();
    }

    fn record(&mut self, phase: &str, statement: &Statement) {
        let logged = sanitize(statement.as_str(), &self.secrets);
        debug!(phase = phase, "{}", logged);
        self.executed.push(logged);
    }

    fn classify(&self, phase: &str, err: &ExecutorError) -> ImportExportError {
        classify(self.adapter.backend(), err, &self.secrets)
            .with_context("phase", phase)
            .with_context("table", self.destination.table_ref().to_string())
    }

    async fn execute(&mut self, phase: &str, statement: Statement) -> ImportExportResult<QueryResult> {
        self.record(phase, &statement);
        self.importer
            .executor
            .execute(&statement)
            .await
            .map_err(|err| self.classify(phase, &err))
    }

    async fn fetch(&mut self, phase: &str, statement: Statement) -> ImportExportResult<QueryResult> {
        self.record(phase, &statement);
        self.importer
            .executor
            .fetch_all(&statement)
            .await
            .map_err(|err| self.classify(phase, &err))
    }
}
