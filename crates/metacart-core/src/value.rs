//! Cell value model and per-column kind inference

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A single spreadsheet cell after reading
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing or empty cell
    Null,

    /// Integer value
    Int(i64),

    /// Floating point value
    Float(f64),

    /// Text value
    Text(String),

    /// Boolean value
    Bool(bool),

    /// Datetime value (no timezone)
    Timestamp(NaiveDateTime),
}

impl CellValue {
    /// Whether this cell is null/missing
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The value kind of a non-null cell
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            CellValue::Null => None,
            CellValue::Int(_) => Some(ValueKind::Integer),
            CellValue::Float(_) => Some(ValueKind::Float),
            CellValue::Text(_) => Some(ValueKind::Text),
            CellValue::Bool(_) => Some(ValueKind::Boolean),
            CellValue::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    /// Render the value as text, the way a text-typed column stores it
    pub fn render_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Int(v) => Some(v.to_string()),
            CellValue::Float(v) => Some(v.to_string()),
            CellValue::Text(v) => Some(v.clone()),
            CellValue::Bool(v) => Some(v.to_string()),
            CellValue::Timestamp(v) => Some(v.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

/// The kind of value observed in a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Float,
    Text,
    Timestamp,
    Boolean,
}

/// Infer the kind of a column from its non-null cells.
///
/// A uniformly typed column keeps its kind; a numeric column mixing
/// integers and floats widens to `Float`; any other mixture collapses to
/// `Text`. Returns `None` for a column with no non-null cells.
pub fn column_kind<'a, I>(values: I) -> Option<ValueKind>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let mut kind: Option<ValueKind> = None;
    for value in values {
        let Some(current) = value.kind() else {
            continue;
        };
        kind = Some(match kind {
            None => current,
            Some(prev) if prev == current => prev,
            Some(ValueKind::Integer) if current == ValueKind::Float => ValueKind::Float,
            Some(ValueKind::Float) if current == ValueKind::Integer => ValueKind::Float,
            Some(_) => return Some(ValueKind::Text),
        });
    }
    kind
}

/// Datetime formats accepted when reparsing text cells as timestamps
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Date-only formats, parsed as midnight
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Best-effort datetime parse over a fixed format list.
///
/// RFC 3339 values with an offset are normalized to UTC and the offset
/// dropped.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_columns_keep_their_kind() {
        let ints = [CellValue::Int(1), CellValue::Int(2)];
        assert_eq!(column_kind(&ints), Some(ValueKind::Integer));

        let bools = [CellValue::Bool(true), CellValue::Bool(false)];
        assert_eq!(column_kind(&bools), Some(ValueKind::Boolean));
    }

    #[test]
    fn mixed_numeric_widens_to_float() {
        let values = [CellValue::Int(1), CellValue::Float(2.5), CellValue::Int(3)];
        assert_eq!(column_kind(&values), Some(ValueKind::Float));
    }

    #[test]
    fn mixed_kinds_collapse_to_text() {
        let values = [CellValue::Int(1), CellValue::Text("x".to_string())];
        assert_eq!(column_kind(&values), Some(ValueKind::Text));

        let values = [CellValue::Bool(true), CellValue::Int(0)];
        assert_eq!(column_kind(&values), Some(ValueKind::Text));
    }

    #[test]
    fn nulls_are_skipped_for_kind() {
        let values = [CellValue::Null, CellValue::Int(7), CellValue::Null];
        assert_eq!(column_kind(&values), Some(ValueKind::Integer));
    }

    #[test]
    fn empty_column_has_no_kind() {
        let values: [CellValue; 2] = [CellValue::Null, CellValue::Null];
        assert_eq!(column_kind(&values), None);
    }

    #[test]
    fn parse_timestamp_formats() {
        assert!(parse_timestamp("2024-06-01T08:30:00").is_some());
        assert!(parse_timestamp("2024-06-01 08:30:00.123").is_some());
        assert!(parse_timestamp("2024-06-01").is_some());
        assert!(parse_timestamp("06/01/2024").is_some());
        assert!(parse_timestamp("2024-06-01T08:30:00+02:00").is_some());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn date_only_parses_to_midnight() {
        let parsed = parse_timestamp("2024-06-01").unwrap();
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn render_text_values() {
        assert_eq!(CellValue::Int(42).render_text().unwrap(), "42");
        assert_eq!(CellValue::Bool(true).render_text().unwrap(), "true");
        assert_eq!(CellValue::Null.render_text(), None);
        let ts = CellValue::Timestamp(parse_timestamp("2024-06-01 08:30:00").unwrap());
        assert_eq!(ts.render_text().unwrap(), "2024-06-01T08:30:00");
    }
}
