//! Per-dialect SQL text generation
//!
//! Everything dialect-specific funnels through this module: the column
//! type mapping, identifier quoting, parameter placeholders, the table
//! existence check and the DDL/DML builders. Adding a dialect means
//! extending the [`Dialect`] enum and letting the exhaustive matches here
//! point out every spot that needs a decision.

use metacart_core::{column_kind, CellValue, Dialect, ValueKind};

/// Map a value kind to the dialect's column type
pub fn sql_type(dialect: Dialect, kind: ValueKind) -> &'static str {
    match dialect {
        Dialect::SqlServer => match kind {
            ValueKind::Integer => "BIGINT",
            ValueKind::Float => "FLOAT",
            ValueKind::Text => "VARCHAR(4000)",
            ValueKind::Timestamp => "DATETIME",
            ValueKind::Boolean => "BIT",
        },
        Dialect::Oracle => match kind {
            ValueKind::Integer => "NUMBER",
            ValueKind::Float => "FLOAT",
            ValueKind::Text => "VARCHAR2(4000)",
            ValueKind::Timestamp => "DATE",
            ValueKind::Boolean => "NUMBER(1)",
        },
        Dialect::Snowflake => match kind {
            ValueKind::Integer => "NUMBER",
            ValueKind::Float => "FLOAT",
            ValueKind::Text => "VARCHAR",
            ValueKind::Timestamp => "TIMESTAMP_NTZ",
            ValueKind::Boolean => "BOOLEAN",
        },
        // Spark SQL data types
        Dialect::Databricks => match kind {
            ValueKind::Integer => "BIGINT",
            ValueKind::Float => "DOUBLE",
            ValueKind::Text => "STRING",
            ValueKind::Timestamp => "TIMESTAMP",
            ValueKind::Boolean => "BOOLEAN",
        },
        Dialect::Mysql => match kind {
            ValueKind::Integer => "BIGINT",
            ValueKind::Float => "DOUBLE",
            ValueKind::Text => "VARCHAR(255)",
            ValueKind::Timestamp => "DATETIME",
            ValueKind::Boolean => "TINYINT(1)",
        },
        Dialect::Postgres => match kind {
            ValueKind::Integer => "BIGINT",
            ValueKind::Float => "DOUBLE PRECISION",
            ValueKind::Text => "TEXT",
            ValueKind::Timestamp => "TIMESTAMP",
            ValueKind::Boolean => "BOOLEAN",
        },
    }
}

/// The dialect's text type, used as the inference fallback
pub fn text_type(dialect: Dialect) -> &'static str {
    sql_type(dialect, ValueKind::Text)
}

/// Infer the column type for a set of observed cell values.
///
/// A column containing any null maps to the dialect's text type no matter
/// what the non-null values look like; sparse columns therefore lose
/// numeric/temporal typing. This mirrors the known limitation of the
/// original inference rule and is covered by tests, so it stays.
pub fn infer_sql_type<'a, I>(dialect: Dialect, values: I) -> &'static str
where
    I: IntoIterator<Item = &'a CellValue> + Clone,
{
    let any_null = values.clone().into_iter().any(CellValue::is_null);
    if any_null {
        return text_type(dialect);
    }
    match column_kind(values) {
        Some(kind) => sql_type(dialect, kind),
        None => text_type(dialect),
    }
}

/// The effective kind a column is loaded as, aligned with
/// [`infer_sql_type`]: nulls force text, an unknowable column is text.
pub fn effective_kind<'a, I>(values: I) -> ValueKind
where
    I: IntoIterator<Item = &'a CellValue> + Clone,
{
    let any_null = values.clone().into_iter().any(CellValue::is_null);
    if any_null {
        return ValueKind::Text;
    }
    column_kind(values).unwrap_or(ValueKind::Text)
}

/// Double-quote an identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Schema-qualified, quoted table name
pub fn qualified_table(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(table),
    }
}

/// Parameter placeholder for position `index` (1-based)
pub fn placeholder(dialect: Dialect, index: usize) -> String {
    match dialect {
        Dialect::Postgres => format!("${}", index),
        _ => "?".to_string(),
    }
}

/// How to decide whether a table exists
#[derive(Debug, Clone, PartialEq)]
pub enum ExistsCheck {
    /// Run the query; the table exists when any row comes back
    RowPresence(String),

    /// Run the listing; the table exists when its name appears in the
    /// second column, compared case-insensitively
    NameListing(String),
}

/// Build the dialect's existence check for a table.
///
/// Five dialects answer through an information-schema style query;
/// Databricks has no such view over its catalog, so it lists the schema's
/// tables and the caller checks membership.
pub fn exists_check(dialect: Dialect, schema: Option<&str>, table: &str) -> ExistsCheck {
    match dialect {
        Dialect::SqlServer | Dialect::Mysql | Dialect::Postgres => {
            let query = match schema {
                Some(schema) => format!(
                    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                     WHERE TABLE_SCHEMA = '{}' AND TABLE_NAME = '{}'",
                    schema, table
                ),
                None => format!(
                    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = '{}'",
                    table
                ),
            };
            ExistsCheck::RowPresence(query)
        }
        // Oracle folds unquoted identifiers to uppercase.
        Dialect::Oracle => {
            let query = match schema {
                Some(schema) => format!(
                    "SELECT table_name FROM all_tables \
                     WHERE OWNER = '{}' AND table_name = '{}'",
                    schema.to_uppercase(),
                    table.to_uppercase()
                ),
                None => format!(
                    "SELECT table_name FROM user_tables WHERE table_name = '{}'",
                    table.to_uppercase()
                ),
            };
            ExistsCheck::RowPresence(query)
        }
        Dialect::Snowflake => {
            let query = match schema {
                Some(schema) => format!(
                    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                     WHERE TABLE_SCHEMA = '{}' AND TABLE_NAME = '{}'",
                    schema.to_uppercase(),
                    table
                ),
                None => format!(
                    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = '{}'",
                    table
                ),
            };
            ExistsCheck::RowPresence(query)
        }
        Dialect::Databricks => {
            let statement = match schema {
                Some(schema) => format!("SHOW TABLES IN {}", schema),
                None => "SHOW TABLES".to_string(),
            };
            ExistsCheck::NameListing(statement)
        }
    }
}

/// CREATE TABLE statement from inferred column types
pub fn create_table_sql(qualified: &str, columns: &[(String, &'static str)]) -> String {
    let column_list = columns
        .iter()
        .map(|(name, sql_type)| format!("{} {}", quote_ident(name), sql_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", qualified, column_list)
}

/// DROP TABLE statement
pub fn drop_table_sql(qualified: &str) -> String {
    format!("DROP TABLE {}", qualified)
}

/// TRUNCATE TABLE statement; all six dialects accept this form
pub fn truncate_table_sql(qualified: &str) -> String {
    format!("TRUNCATE TABLE {}", qualified)
}

/// Parameterized single-row INSERT, executed once per data row
pub fn insert_sql(dialect: Dialect, qualified: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|index| placeholder(dialect, index))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified, column_list, placeholders
    )
}
