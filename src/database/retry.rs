//! Exponential backoff for retryable failures
//!
//! Two levels are covered:
//! - [`RetryPolicy::run`] reruns a whole import or export when it fails
//!   with a retryable [`ErrorKind`](crate::error::ErrorKind)
//! - [`RetryingExecutor`] resubmits a single statement when the driver could
//!   not reach the warehouse at all, so the statement never ran

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ExecutorError, ExecutorResult, QueryResult, SqlExecutor};
use crate::error::ImportExportResult;
use crate::sql::Statement;

/// Backoff schedule for retryable failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt number `attempt + 1`, for `attempt >= 1`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable kind
    /// or exhausts `max_attempts`
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> ImportExportResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ImportExportResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        target: crate::USER_LOG_TARGET,
                        "Attempt {} of {} failed ({}), retrying in {:?}",
                        attempt,
                        max_attempts,
                        err.code(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_statement<F, Fut>(&self, mut operation: F) -> ExecutorResult<QueryResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ExecutorResult<QueryResult>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Err(
                    err @ (ExecutorError::ConnectionFailed(_)
                    | ExecutorError::ConnectionTimeout(_)),
                ) if attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    debug!("Statement not delivered ({}), retrying in {:?}", err, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// [`SqlExecutor`] that resubmits statements the driver failed to deliver
pub struct RetryingExecutor<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: SqlExecutor> RetryingExecutor<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

#[async_trait]
impl<E: SqlExecutor> SqlExecutor for RetryingExecutor<E> {
    async fn execute(&self, statement: &Statement) -> ExecutorResult<QueryResult> {
        self.policy
            .run_statement(|| self.inner.execute(statement))
            .await
    }

    async fn fetch_all(&self, statement: &Statement) -> ExecutorResult<QueryResult> {
        self.policy
            .run_statement(|| self.inner.fetch_all(statement))
            .await
    }
}
