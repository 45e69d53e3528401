//! SQL execution seam
//!
//! The loader depends on three operations only: execute a statement and
//! get rows back, execute one parameterized statement over many rows, and
//! commit. Every statement is committed immediately after execution; there
//! are no multi-statement transactions anywhere in the pipeline.

use async_trait::async_trait;

/// A SQL parameter or result value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,

    /// 64-bit integer
    Int(i64),

    /// 64-bit float
    Float(f64),

    /// Text
    Text(String),

    /// Boolean
    Bool(bool),
}

impl SqlValue {
    /// Text content, when this value carries any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Errors surfaced by an executor implementation
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Statement failed: {0}")]
    StatementFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Driver-backed SQL connection.
///
/// One executor instance is held for the lifetime of a load run and used
/// sequentially; implementations do not need to support concurrent calls.
#[async_trait]
pub trait SqlExecutor: Send {
    /// Execute a statement and return its result rows (empty for DDL)
    async fn execute(&mut self, sql: &str) -> Result<Vec<Vec<SqlValue>>, ExecutorError>;

    /// Execute one parameterized statement once per row
    async fn execute_batch(
        &mut self,
        sql: &str,
        rows: &[Vec<SqlValue>],
    ) -> Result<(), ExecutorError>;

    /// Commit any pending work; a no-op for autocommit connections
    async fn commit(&mut self) -> Result<(), ExecutorError>;
}
