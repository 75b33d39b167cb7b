//! Unload a table or query into cloud files

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{Backend, ExportAdapter, ExportContext, UnloadResultKind};
use crate::database::{EngineConfig, RetryPolicy, SqlExecutor};
use crate::error::{ErrorKind, ImportExportError, ImportExportResult, classify, sanitize};
use crate::manifest::{Manifest, list_data_objects};
use crate::models::{
    CloudFileDestination, ExportOptions, ExportResult, ExportedFile, ImportState, Source,
};
use crate::storage::CloudStorage;

pub const UNLOAD: &str = "unload";
pub const LIST_FILES: &str = "listFiles";
pub const WRITE_MANIFEST: &str = "writeManifest";

/// Runs unload statements and describes the objects they wrote
pub struct Exporter {
    executor: Arc<dyn SqlExecutor>,
    storage: Option<Arc<dyn CloudStorage>>,
    retry_policy: RetryPolicy,
}

impl Exporter {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            executor,
            storage: None,
            retry_policy: RetryPolicy::none(),
        }
    }

    /// Object store used to list written objects and store the manifest
    pub fn with_storage(mut self, storage: Arc<dyn CloudStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_retry_policy(config.retry_policy())
    }

    /// Export `source` into `destination` on `backend`
    ///
    /// Storage access is needed when the backend reports its output through
    /// a folder listing, or when a manifest is generated.
    pub async fn export(
        &self,
        backend: Backend,
        source: &Source,
        destination: &CloudFileDestination,
        options: &ExportOptions,
    ) -> ImportExportResult<ExportResult> {
        self.retry_policy
            .run(move || self.export_once(backend, source, destination, options))
            .await
    }

    async fn export_once(
        &self,
        backend: Backend,
        source: &Source,
        destination: &CloudFileDestination,
        options: &ExportOptions,
    ) -> ImportExportResult<ExportResult> {
        let adapter = destination.export_adapter(backend, source)?;
        let needs_storage =
            options.generate_manifest || adapter.unload_result_kind() == UnloadResultKind::FolderListing;
        let storage = match (needs_storage, self.storage.as_deref()) {
            (true, None) => {
                return Err(ImportExportError::new(
                    ErrorKind::InvalidFileParams,
                    "Exporting into cloud files needs access to cloud storage",
                )
                .with_context("url", destination.location.url()));
            }
            (_, storage) => storage,
        };

        let ctx = ExportContext {
            source,
            destination,
            options,
        };
        let statement = adapter.export_statement(&ctx)?;
        let secrets = destination.credentials.secrets();
        let logged = sanitize(statement.as_str(), &secrets);
        info!(
            target: crate::USER_LOG_TARGET,
            "Exporting {} source to {} on {}",
            source.kind(),
            destination.location,
            backend
        );
        debug!(phase = UNLOAD, "{}", logged);

        let mut state = ImportState::new();
        state.start_timer(UNLOAD)?;
        let result = self.executor.fetch_all(&statement).await.map_err(|err| {
            classify(backend, &err, &secrets)
                .narrow_unknown(ErrorKind::UnknownExport)
                .with_context("phase", UNLOAD)
                .with_context("url", destination.location.url())
        })?;
        state.stop_timer(UNLOAD)?;

        state.start_timer(LIST_FILES)?;
        let (files, manifest) = match adapter.unload_result_kind() {
            UnloadResultKind::UnloadRows => {
                let unloaded = adapter.parse_unload_rows(&result)?;
                let manifest = Manifest::from_unload_result(&destination.location, &unloaded);
                let files = manifest
                    .entries
                    .iter()
                    .zip(&unloaded)
                    .map(|(entry, file)| ExportedFile {
                        url: entry.url.clone(),
                        size: Some(file.file_size),
                        row_count: Some(file.row_count),
                    })
                    .collect::<Vec<_>>();
                (files, manifest)
            }
            UnloadResultKind::FolderListing => {
                let storage = storage.ok_or_else(|| {
                    ImportExportError::new(
                        ErrorKind::InvalidFileParams,
                        "Listing exported files needs access to cloud storage",
                    )
                })?;
                let (prefix, append_separator) = adapter.listing_prefix(destination);
                let location = destination.location.with_path(prefix);
                let objects = list_data_objects(storage, &location, append_separator)
                    .await
                    .map_err(|err| err.narrow_unknown(ErrorKind::UnknownExport))?;
                let files = objects
                    .iter()
                    .map(|object| ExportedFile {
                        url: location.with_path(object.key.as_str()).url(),
                        size: Some(object.size),
                        row_count: None,
                    })
                    .collect::<Vec<_>>();
                (files, Manifest::from_objects(&location, &objects))
            }
        };
        state.stop_timer(LIST_FILES)?;

        let mut manifest_url = None;
        if options.generate_manifest
            && let Some(storage) = storage
        {
            state.start_timer(WRITE_MANIFEST)?;
            let url = manifest
                .write(storage, &destination.location)
                .await
                .map_err(|err| err.narrow_unknown(ErrorKind::UnknownExport))?;
            state.stop_timer(WRITE_MANIFEST)?;
            debug!(target: crate::USER_LOG_TARGET, "Wrote manifest {}", url);
            manifest_url = Some(url);
        }

        info!(
            target: crate::USER_LOG_TARGET,
            "Exported {} files to {}",
            files.len(),
            destination.location
        );
        Ok(ExportResult {
            files,
            manifest: options.generate_manifest.then_some(manifest),
            manifest_url,
            timers: state.into_timers(),
            executed_statements: vec![logged],
        })
    }
}
