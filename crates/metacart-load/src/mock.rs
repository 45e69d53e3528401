//! Mock SQL executor for testing
//!
//! Keeps an in-memory set of "existing" tables, answers the loader's
//! existence checks from it, and records every statement it is handed so
//! tests can assert on exact provisioning order. No real connection is
//! involved.
//!
//! The mock understands just enough SQL to play the warehouse side of the
//! loader's contract: it registers `CREATE TABLE`/`DROP TABLE` statements
//! against its table set, answers information-schema lookups by row
//! presence and `SHOW TABLES` by name listing, and treats everything else
//! as a statement with no result rows.

use crate::executor::{ExecutorError, SqlExecutor, SqlValue};
use async_trait::async_trait;
use std::collections::HashSet;

/// Scriptable in-memory executor
#[derive(Debug, Default)]
pub struct MockExecutor {
    /// Lowercased names of tables that currently exist
    existing: HashSet<String>,

    /// Every statement passed to `execute`, in order
    statements: Vec<String>,

    /// Every `(sql, rows)` passed to `execute_batch`, in order
    batches: Vec<(String, Vec<Vec<SqlValue>>)>,

    /// Fail any statement containing this fragment
    fail_on: Option<String>,

    commits: usize,
}

impl MockExecutor {
    /// Create an executor with no existing tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the named table already exists
    pub fn with_existing_table(mut self, name: &str) -> Self {
        self.existing.insert(name.to_lowercase());
        self
    }

    /// Fail any statement containing the given fragment
    pub fn with_failure_on(mut self, fragment: &str) -> Self {
        self.fail_on = Some(fragment.to_string());
        self
    }

    /// Statements seen by `execute`, in order
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Batches seen by `execute_batch`, in order
    pub fn batches(&self) -> &[(String, Vec<Vec<SqlValue>>)] {
        &self.batches
    }

    /// Number of commits issued
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Whether a table currently exists in the mock catalog
    pub fn has_table(&self, name: &str) -> bool {
        self.existing.contains(&name.to_lowercase())
    }

    fn check_failure(&self, sql: &str) -> Result<(), ExecutorError> {
        if let Some(fragment) = &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(ExecutorError::StatementFailed(format!(
                    "simulated failure on: {}",
                    fragment
                )));
            }
        }
        Ok(())
    }

    fn answer(&mut self, sql: &str) -> Vec<Vec<SqlValue>> {
        let trimmed = sql.trim_start();
        if trimmed.starts_with("SHOW TABLES") {
            return self
                .existing
                .iter()
                .map(|name| {
                    vec![
                        SqlValue::Text(String::new()),
                        SqlValue::Text(name.clone()),
                        SqlValue::Bool(false),
                    ]
                })
                .collect();
        }
        if trimmed.starts_with("CREATE TABLE") {
            if let Some(name) = created_table_name(trimmed) {
                self.existing.insert(name.to_lowercase());
            }
            return Vec::new();
        }
        if trimmed.starts_with("DROP TABLE") {
            if let Some(name) = last_quoted_ident(trimmed) {
                self.existing.remove(&name.to_lowercase());
            }
            return Vec::new();
        }
        if let Some(name) = table_name_literal(trimmed) {
            if self.existing.contains(&name.to_lowercase()) {
                return vec![vec![SqlValue::Int(1)]];
            }
            return Vec::new();
        }
        Vec::new()
    }
}

/// Table identifier of a CREATE TABLE statement: the last double-quoted
/// identifier before the column list opens.
fn created_table_name(sql: &str) -> Option<String> {
    let head = sql.split('(').next()?;
    last_quoted_ident(head)
}

/// Last `"..."` quoted identifier in a fragment
fn last_quoted_ident(fragment: &str) -> Option<String> {
    let mut last = None;
    let mut rest = fragment;
    while let Some(start) = rest.find('"') {
        let tail = &rest[start + 1..];
        let end = tail.find('"')?;
        last = Some(tail[..end].to_string());
        rest = &tail[end + 1..];
    }
    last
}

/// The single-quoted literal compared against TABLE_NAME, when present
fn table_name_literal(sql: &str) -> Option<String> {
    let position = sql
        .find("TABLE_NAME = '")
        .or_else(|| sql.find("table_name = '"))?;
    let tail = &sql[position + "TABLE_NAME = '".len()..];
    let end = tail.find('\'')?;
    Some(tail[..end].to_string())
}

#[async_trait]
impl SqlExecutor for MockExecutor {
    async fn execute(&mut self, sql: &str) -> Result<Vec<Vec<SqlValue>>, ExecutorError> {
        self.check_failure(sql)?;
        self.statements.push(sql.to_string());
        Ok(self.answer(sql))
    }

    async fn execute_batch(
        &mut self,
        sql: &str,
        rows: &[Vec<SqlValue>],
    ) -> Result<(), ExecutorError> {
        self.check_failure(sql)?;
        self.batches.push((sql.to_string(), rows.to_vec()));
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), ExecutorError> {
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_registers_and_drop_unregisters() {
        let mut executor = MockExecutor::new();
        executor
            .execute("CREATE TABLE \"dw\".\"terms\" (\"id\" BIGINT)")
            .await
            .unwrap();
        assert!(executor.has_table("terms"));

        executor.execute("DROP TABLE \"dw\".\"terms\"").await.unwrap();
        assert!(!executor.has_table("terms"));
    }

    #[tokio::test]
    async fn answers_information_schema_lookups() {
        let mut executor = MockExecutor::new().with_existing_table("terms");
        let rows = executor
            .execute(
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_SCHEMA = 'dw' AND TABLE_NAME = 'terms'",
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let rows = executor
            .execute(
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_SCHEMA = 'dw' AND TABLE_NAME = 'missing'",
            )
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn answers_show_tables_listing() {
        let mut executor = MockExecutor::new()
            .with_existing_table("terms")
            .with_existing_table("owners");
        let rows = executor.execute("SHOW TABLES IN dw").await.unwrap();
        assert_eq!(rows.len(), 2);
        let mut names: Vec<_> = rows
            .iter()
            .filter_map(|row| row[1].as_text().map(str::to_string))
            .collect();
        names.sort();
        assert_eq!(names, vec!["owners", "terms"]);
    }

    #[tokio::test]
    async fn failure_injection_targets_fragments() {
        let mut executor = MockExecutor::new().with_failure_on("DROP TABLE");
        assert!(executor.execute("CREATE TABLE \"t\" (\"a\" TEXT)").await.is_ok());
        let err = executor.execute("DROP TABLE \"t\"").await.unwrap_err();
        assert!(matches!(err, ExecutorError::StatementFailed(_)));
    }

    #[tokio::test]
    async fn batches_record_statement_and_rows() {
        let mut executor = MockExecutor::new();
        let rows = vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]];
        executor
            .execute_batch("INSERT INTO \"t\" (\"a\") VALUES (?)", &rows)
            .await
            .unwrap();
        assert_eq!(executor.batches().len(), 1);
        assert_eq!(executor.batches()[0].0, "INSERT INTO \"t\" (\"a\") VALUES (?)");
        assert_eq!(executor.batches()[0].1, rows);
    }
}
