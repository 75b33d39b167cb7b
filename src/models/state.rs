use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::error::{ImportExportError, ImportExportResult};
use crate::sql::TableRef;

/// Per-call bookkeeping of a running import or export
///
/// Tracks named phase timers, the staging table and every table the call
/// created so cleanup knows what to drop.
#[derive(Debug, Default)]
pub struct ImportState {
    running: BTreeMap<String, Instant>,
    finished: BTreeMap<String, Duration>,
    staging_table: Option<TableRef>,
    created_tables: Vec<TableRef>,
    imported_rows_count: u64,
}

impl ImportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the timer `label`; starting a running timer is an error
    pub fn start_timer(&mut self, label: &str) -> ImportExportResult<()> {
        if self.running.contains_key(label) {
            return Err(ImportExportError::validation(format!(
                "Timer \"{}\" is already running",
                label
            ))
            .with_context("timer", label));
        }
        self.running.insert(label.to_string(), Instant::now());
        Ok(())
    }

    /// Stop the timer `label`, adding the elapsed time to its total
    pub fn stop_timer(&mut self, label: &str) -> ImportExportResult<Duration> {
        let started = self.running.remove(label).ok_or_else(|| {
            ImportExportError::validation(format!("Timer \"{}\" is not running", label))
                .with_context("timer", label)
        })?;
        let elapsed = started.elapsed();
        *self.finished.entry(label.to_string()).or_default() += elapsed;
        Ok(elapsed)
    }

    /// Finished timers
    pub fn timers(&self) -> &BTreeMap<String, Duration> {
        &self.finished
    }

    pub fn set_staging_table(&mut self, table: TableRef) {
        self.staging_table = Some(table);
    }

    pub fn staging_table(&self) -> Option<&TableRef> {
        self.staging_table.as_ref()
    }

    /// Remember a table this call created
    pub fn register_table(&mut self, table: TableRef) {
        if !self.created_tables.contains(&table) {
            self.created_tables.push(table);
        }
    }

    /// Forget a table that no longer exists under its name
    pub fn forget_table(&mut self, table: &TableRef) {
        self.created_tables.retain(|t| t != table);
    }

    /// Tables to drop during cleanup, most recent first
    pub fn cleanup_tables(&self) -> Vec<TableRef> {
        self.created_tables.iter().rev().cloned().collect()
    }

    pub fn set_imported_rows_count(&mut self, count: u64) {
        self.imported_rows_count = count;
    }

    pub fn imported_rows_count(&self) -> u64 {
        self.imported_rows_count
    }

    pub fn into_timers(self) -> BTreeMap<String, Duration> {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_timer_lifecycle() {
        let mut state = ImportState::new();
        state.start_timer("copyToStaging").unwrap();
        let err = state.start_timer("copyToStaging").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        state.stop_timer("copyToStaging").unwrap();
        assert!(state.timers().contains_key("copyToStaging"));
        assert!(state.stop_timer("copyToStaging").is_err());

        state.start_timer("copyToStaging").unwrap();
    }

    #[test]
    fn test_cleanup_order() {
        let mut state = ImportState::new();
        let staging = TableRef::new("s", "__temp_1");
        let swap = TableRef::new("s", "__temp_swap_1");
        state.register_table(staging.clone());
        state.register_table(swap.clone());
        state.register_table(staging.clone());
        assert_eq!(state.cleanup_tables(), vec![swap.clone(), staging.clone()]);

        state.forget_table(&swap);
        assert_eq!(state.cleanup_tables(), vec![staging]);
    }
}
