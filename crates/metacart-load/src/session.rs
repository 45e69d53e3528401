//! Load session: table provisioning and row loading
//!
//! One session spans one run. The provisioning decision for a table is
//! made on its first encounter and recorded in a run-scoped set, so a
//! sheet name that appears again (another sheet, another file) only
//! appends. Every statement commits immediately; a failure aborts the run
//! and leaves whatever has already been loaded in place.

use crate::dialect::{self, ExistsCheck};
use crate::error::LoadError;
use crate::executor::{SqlExecutor, SqlValue};
use crate::workbook::read_workbook;
use metacart_core::{parse_timestamp, CellValue, Dialect, SheetTable, ValueKind};
use std::collections::HashSet;
use std::path::PathBuf;

/// Per-run loader configuration
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Target dialect
    pub dialect: Dialect,

    /// Target schema; unqualified names when absent
    pub schema: Option<String>,

    /// Drop and recreate each existing table on first encounter
    pub drop_tables: bool,

    /// Truncate each existing table on first encounter; ignored when
    /// `drop_tables` is set
    pub truncate_tables: bool,

    /// Echo generated SQL at debug level
    pub debug: bool,
}

/// A single load run over one executor
pub struct LoadSession<E: SqlExecutor> {
    executor: E,
    options: LoadOptions,
    processed: HashSet<String>,
}

impl<E: SqlExecutor> LoadSession<E> {
    /// Create a session; the processed-table set starts empty
    pub fn new(executor: E, options: LoadOptions) -> Self {
        Self {
            executor,
            options,
            processed: HashSet::new(),
        }
    }

    /// Take the executor back, e.g. to inspect a mock after a run
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Load every sheet of every file, in order. Missing files are
    /// skipped with a warning, matching the tolerant batch behavior of
    /// the surrounding tooling.
    pub async fn load_files(&mut self, files: &[PathBuf]) -> Result<(), LoadError> {
        for file in files {
            if !file.is_file() {
                tracing::warn!(file = %file.display(), "file not found, skipping");
                continue;
            }
            for sheet in read_workbook(file)? {
                self.load_sheet(&sheet).await?;
            }
        }
        Ok(())
    }

    /// Provision the target table for one sheet and insert its rows
    pub async fn load_sheet(&mut self, sheet: &SheetTable) -> Result<(), LoadError> {
        if sheet.columns.is_empty() {
            tracing::warn!(table = %sheet.name, "skipping sheet with no columns");
            return Ok(());
        }

        let table = sheet.name.clone();
        let qualified = dialect::qualified_table(self.options.schema.as_deref(), &table);

        if self.table_exists(&table).await? {
            if self.options.drop_tables {
                if !self.processed.contains(&table) {
                    self.drop_table(&qualified).await?;
                    self.create_table(&qualified, sheet).await?;
                    self.processed.insert(table.clone());
                } else {
                    tracing::info!(table = %qualified, "appending to table recreated earlier this run");
                }
            } else if self.options.truncate_tables {
                if !self.processed.contains(&table) {
                    self.truncate_table(&qualified).await?;
                    self.processed.insert(table.clone());
                }
                tracing::info!(table = %qualified, "appending to existing table");
            } else {
                tracing::info!(table = %qualified, "appending to existing table");
            }
        } else {
            self.create_table(&qualified, sheet).await?;
            self.processed.insert(table.clone());
        }

        self.insert_rows(&qualified, sheet).await
    }

    /// Dialect-specific existence check
    async fn table_exists(&mut self, table: &str) -> Result<bool, LoadError> {
        match dialect::exists_check(self.options.dialect, self.options.schema.as_deref(), table) {
            ExistsCheck::RowPresence(query) => {
                self.debug_sql(&query);
                let rows = self
                    .executor
                    .execute(&query)
                    .await
                    .map_err(|e| LoadError::Provisioning(e.to_string()))?;
                Ok(!rows.is_empty())
            }
            ExistsCheck::NameListing(statement) => {
                self.debug_sql(&statement);
                let rows = self
                    .executor
                    .execute(&statement)
                    .await
                    .map_err(|e| LoadError::Provisioning(e.to_string()))?;
                let target = table.to_lowercase();
                Ok(rows.iter().any(|row| {
                    row.get(1)
                        .and_then(SqlValue::as_text)
                        .map(|name| name.to_lowercase() == target)
                        .unwrap_or(false)
                }))
            }
        }
    }

    async fn create_table(&mut self, qualified: &str, sheet: &SheetTable) -> Result<(), LoadError> {
        let columns: Vec<(String, &'static str)> = sheet
            .columns
            .iter()
            .enumerate()
            .map(|(index, name)| {
                (
                    name.clone(),
                    dialect::infer_sql_type(self.options.dialect, sheet.column_values(index)),
                )
            })
            .collect();

        let sql = dialect::create_table_sql(qualified, &columns);
        self.debug_sql(&sql);
        tracing::info!(table = %qualified, "creating table");
        self.executor
            .execute(&sql)
            .await
            .map_err(|e| LoadError::Provisioning(e.to_string()))?;
        self.commit_provisioning().await
    }

    async fn drop_table(&mut self, qualified: &str) -> Result<(), LoadError> {
        let sql = dialect::drop_table_sql(qualified);
        self.debug_sql(&sql);
        tracing::info!(table = %qualified, "dropping table");
        self.executor
            .execute(&sql)
            .await
            .map_err(|e| LoadError::Provisioning(e.to_string()))?;
        self.commit_provisioning().await
    }

    async fn truncate_table(&mut self, qualified: &str) -> Result<(), LoadError> {
        let sql = dialect::truncate_table_sql(qualified);
        self.debug_sql(&sql);
        tracing::info!(table = %qualified, "truncating table");
        self.executor
            .execute(&sql)
            .await
            .map_err(|e| LoadError::Provisioning(e.to_string()))?;
        self.commit_provisioning().await
    }

    async fn commit_provisioning(&mut self) -> Result<(), LoadError> {
        self.executor
            .commit()
            .await
            .map_err(|e| LoadError::Provisioning(e.to_string()))
    }

    /// One parameterized multi-row insert per sheet
    async fn insert_rows(&mut self, qualified: &str, sheet: &SheetTable) -> Result<(), LoadError> {
        let kinds: Vec<ValueKind> = (0..sheet.columns.len())
            .map(|index| dialect::effective_kind(sheet.column_values(index)))
            .collect();

        let sql = dialect::insert_sql(self.options.dialect, qualified, &sheet.columns);
        self.debug_sql(&sql);

        let rows: Vec<Vec<SqlValue>> = sheet
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| coerce(cell, *kind))
                    .collect()
            })
            .collect();

        tracing::info!(table = %qualified, rows = rows.len(), "inserting rows");
        self.executor
            .execute_batch(&sql, &rows)
            .await
            .map_err(|e| LoadError::Insert(e.to_string()))?;
        self.executor
            .commit()
            .await
            .map_err(|e| LoadError::Insert(e.to_string()))
    }

    fn debug_sql(&self, sql: &str) {
        if self.options.debug {
            tracing::debug!(sql = %sql, "executing SQL");
        }
    }
}

/// Coerce one cell for insertion, based on the column's effective kind:
/// text columns stringify, timestamp columns re-emit ISO-8601 strings
/// (coercion failures become null), everything else passes through.
/// Nulls always map to SQL null.
fn coerce(cell: &CellValue, kind: ValueKind) -> SqlValue {
    match kind {
        ValueKind::Text => match cell.render_text() {
            Some(text) => SqlValue::Text(text),
            None => SqlValue::Null,
        },
        ValueKind::Timestamp => match cell {
            CellValue::Timestamp(datetime) => {
                SqlValue::Text(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            CellValue::Text(raw) => match parse_timestamp(raw) {
                Some(datetime) => SqlValue::Text(datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
                None => SqlValue::Null,
            },
            _ => SqlValue::Null,
        },
        _ => match cell {
            CellValue::Null => SqlValue::Null,
            CellValue::Int(value) => SqlValue::Int(*value),
            CellValue::Float(value) => SqlValue::Float(*value),
            CellValue::Bool(value) => SqlValue::Bool(*value),
            CellValue::Text(value) => SqlValue::Text(value.clone()),
            CellValue::Timestamp(datetime) => {
                SqlValue::Text(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
        },
    }
}
