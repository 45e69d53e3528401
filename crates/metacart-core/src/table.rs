//! Sheet-derived table model

use crate::value::CellValue;

/// Normalize a sheet name into a table name: trim, then collapse each
/// whitespace run into a single underscore.
pub fn normalize_table_name(raw: &str) -> String {
    raw.trim().split_whitespace().collect::<Vec<_>>().join("_")
}

/// One sheet of one workbook, shaped as a candidate database table.
///
/// Several sheets (across files) may normalize to the same name; each one
/// becomes a separate `SheetTable` and the loader appends them into the
/// same target table.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    /// Normalized table name
    pub name: String,

    /// Column names in sheet order
    pub columns: Vec<String>,

    /// Data rows; each row has exactly `columns.len()` cells
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    /// Create a table from a raw sheet name, normalizing it
    pub fn new(raw_name: &str, columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: normalize_table_name(raw_name),
            columns,
            rows,
        }
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the values of one column, top to bottom
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + Clone {
        self.rows.iter().map(move |row| &row[index])
    }
}
