//! Workbook reading
//!
//! Each sheet becomes one [`SheetTable`]: the first row is the header, the
//! rest are data. After reading, text columns are speculatively reparsed
//! as timestamps; the column converts only when every non-null cell
//! parses, and a parse failure anywhere leaves it as text, silently.

use crate::error::LoadError;
use calamine::{open_workbook_auto, Data, Reader};
use metacart_core::{parse_timestamp, CellValue, SheetTable};
use std::path::Path;

/// Read every sheet of a workbook. Sheets without a header row are
/// skipped; a sheet with a header but no data rows still yields a table.
pub fn read_workbook(path: &Path) -> Result<Vec<SheetTable>, LoadError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| LoadError::Workbook(format!("{}: {}", path.display(), e)))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut tables = Vec::new();

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| LoadError::Workbook(format!("{}: {}", path.display(), e)))?;

        let mut raw_rows = range.rows();
        let Some(header) = raw_rows.next() else {
            tracing::warn!(sheet = %sheet_name, "skipping sheet with no header row");
            continue;
        };

        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(index, cell)| header_name(cell, index))
            .collect();

        let mut rows: Vec<Vec<CellValue>> = raw_rows
            .map(|raw| {
                let mut row: Vec<CellValue> = raw.iter().map(cell_value).collect();
                row.resize(columns.len(), CellValue::Null);
                row
            })
            .collect();

        promote_text_columns(columns.len(), &mut rows);

        tracing::info!(
            sheet = %sheet_name,
            columns = columns.len(),
            rows = rows.len(),
            "read sheet"
        );
        tables.push(SheetTable::new(&sheet_name, columns, rows));
    }

    Ok(tables)
}

fn header_name(cell: &Data, index: usize) -> String {
    match cell {
        Data::Empty => format!("column_{}", index),
        Data::String(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                format!("column_{}", index)
            } else {
                trimmed.to_string()
            }
        }
        other => other.to_string(),
    }
}

/// Convert one spreadsheet cell.
///
/// Integral floats become integers: spreadsheet engines store all numbers
/// as floats, so a column of whole numbers would otherwise never infer as
/// integer.
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::Int(value) => CellValue::Int(*value),
        Data::Float(value) => {
            if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                CellValue::Int(*value as i64)
            } else {
                CellValue::Float(*value)
            }
        }
        Data::String(value) => CellValue::Text(value.clone()),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => CellValue::Timestamp(datetime),
            None => CellValue::Null,
        },
        Data::DateTimeIso(value) => match parse_timestamp(value) {
            Some(datetime) => CellValue::Timestamp(datetime),
            None => CellValue::Text(value.clone()),
        },
        Data::DurationIso(value) => CellValue::Text(value.clone()),
        Data::Error(_) => CellValue::Null,
    }
}

/// Speculative timestamp promotion for text columns.
///
/// A column qualifies when it has at least one non-null cell, every
/// non-null cell is text and every one of them parses with the accepted
/// datetime formats. Nulls stay null.
pub(crate) fn promote_text_columns(column_count: usize, rows: &mut [Vec<CellValue>]) {
    for index in 0..column_count {
        let mut parsed = Vec::new();
        let mut eligible = false;

        for row in rows.iter() {
            match &row[index] {
                CellValue::Null => parsed.push(None),
                CellValue::Text(raw) => match parse_timestamp(raw) {
                    Some(datetime) => {
                        eligible = true;
                        parsed.push(Some(datetime));
                    }
                    None => {
                        eligible = false;
                        break;
                    }
                },
                _ => {
                    eligible = false;
                    break;
                }
            }
        }

        if !eligible {
            continue;
        }

        for (row, datetime) in rows.iter_mut().zip(parsed) {
            row[index] = match datetime {
                Some(datetime) => CellValue::Timestamp(datetime),
                None => CellValue::Null,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_map_to_the_value_model() {
        assert_eq!(cell_value(&Data::Empty), CellValue::Null);
        assert_eq!(cell_value(&Data::Int(7)), CellValue::Int(7));
        assert_eq!(cell_value(&Data::Float(2.5)), CellValue::Float(2.5));
        assert_eq!(
            cell_value(&Data::String("x".to_string())),
            CellValue::Text("x".to_string())
        );
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::Bool(true));
    }

    #[test]
    fn integral_floats_become_integers() {
        assert_eq!(cell_value(&Data::Float(3.0)), CellValue::Int(3));
        assert_eq!(cell_value(&Data::Float(-10.0)), CellValue::Int(-10));
        assert_eq!(cell_value(&Data::Float(3.25)), CellValue::Float(3.25));
    }

    #[test]
    fn iso_datetime_cells_parse() {
        let cell = Data::DateTimeIso("2024-06-01T08:30:00".to_string());
        assert!(matches!(cell_value(&cell), CellValue::Timestamp(_)));
    }

    #[test]
    fn header_names_fill_gaps() {
        assert_eq!(header_name(&Data::String(" Name ".to_string()), 0), "Name");
        assert_eq!(header_name(&Data::Empty, 2), "column_2");
        assert_eq!(header_name(&Data::Int(5), 1), "5");
    }

    #[test]
    fn text_column_promotes_when_every_cell_parses() {
        let mut rows = vec![
            vec![CellValue::Text("2024-06-01".to_string())],
            vec![CellValue::Null],
            vec![CellValue::Text("2024-06-02 10:00:00".to_string())],
        ];
        promote_text_columns(1, &mut rows);
        assert!(matches!(rows[0][0], CellValue::Timestamp(_)));
        assert!(rows[1][0].is_null());
        assert!(matches!(rows[2][0], CellValue::Timestamp(_)));
    }

    #[test]
    fn one_bad_cell_blocks_promotion() {
        let mut rows = vec![
            vec![CellValue::Text("2024-06-01".to_string())],
            vec![CellValue::Text("n/a".to_string())],
        ];
        promote_text_columns(1, &mut rows);
        assert_eq!(rows[0][0], CellValue::Text("2024-06-01".to_string()));
        assert_eq!(rows[1][0], CellValue::Text("n/a".to_string()));
    }

    #[test]
    fn non_text_columns_are_left_alone() {
        let mut rows = vec![vec![CellValue::Int(20240601)], vec![CellValue::Int(2)]];
        promote_text_columns(1, &mut rows);
        assert_eq!(rows[0][0], CellValue::Int(20240601));
    }

    #[test]
    fn all_null_column_stays_null() {
        let mut rows = vec![vec![CellValue::Null], vec![CellValue::Null]];
        promote_text_columns(1, &mut rows);
        assert!(rows[0][0].is_null());
    }
}
