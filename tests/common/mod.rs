//! Shared test doubles

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use db_import_export::database::{ExecutorError, ExecutorResult, QueryResult, SqlExecutor};
use db_import_export::sql::Statement;
use serde_json::json;

/// Records every statement and answers from a script
///
/// - `COUNT` queries return the configured row count
/// - statements containing a registered pattern fail with its error
/// - statements containing a registered result pattern return that result
pub struct MockExecutor {
    statements: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, ExecutorError)>>,
    results: Mutex<Vec<(String, QueryResult)>>,
    count: u64,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::with_count(0)
    }

    pub fn with_count(count: u64) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            results: Mutex::new(Vec::new()),
            count,
        }
    }

    pub fn fail_on(self, pattern: &str, error: ExecutorError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((pattern.to_string(), error));
        self
    }

    pub fn respond_to(self, pattern: &str, result: QueryResult) -> Self {
        self.results
            .lock()
            .unwrap()
            .push((pattern.to_string(), result));
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn count_matching(&self, prefix: &str) -> usize {
        self.statements()
            .iter()
            .filter(|s| s.starts_with(prefix))
            .count()
    }

    fn answer(&self, statement: &Statement) -> ExecutorResult<QueryResult> {
        let sql = statement.as_str().to_string();
        self.statements.lock().unwrap().push(sql.clone());

        if let Some((_, error)) = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            return Err(error.clone());
        }
        if let Some((_, result)) = self
            .results
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            return Ok(result.clone());
        }
        if sql.contains("COUNT(") || sql.contains("COUNT_BIG(") {
            return Ok(QueryResult::new(
                vec!["count".to_string()],
                vec![json!({ "count": self.count })],
            ));
        }
        Ok(QueryResult::affected(0))
    }
}

#[async_trait]
impl SqlExecutor for MockExecutor {
    async fn execute(&self, statement: &Statement) -> ExecutorResult<QueryResult> {
        self.answer(statement)
    }

    async fn fetch_all(&self, statement: &Statement) -> ExecutorResult<QueryResult> {
        self.answer(statement)
    }
}
