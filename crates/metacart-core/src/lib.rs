//! Metacart Core
//!
//! Shared domain model for both pipelines: the configuration file schema,
//! the closed set of supported warehouse dialects, and the cell/sheet value
//! model that schema inference and loading agree on.

pub mod config;
pub mod table;
pub mod value;

pub use config::{AppSection, Config, ConfigError, DatabaseSection, Dialect, IdmcSection};
pub use table::{normalize_table_name, SheetTable};
pub use value::{column_kind, parse_timestamp, CellValue, ValueKind};
