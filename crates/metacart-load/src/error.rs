//! Load pipeline errors

/// Errors raised by the spreadsheet load pipeline.
///
/// All of them are fatal at their point of origin; a DDL or insert failure
/// aborts the run rather than papering over partial schema state.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Input resolution failed: {0}")]
    InputResolution(String),

    #[error("Cannot read workbook: {0}")]
    Workbook(String),

    #[error("Table provisioning failed: {0}")]
    Provisioning(String),

    #[error("Insert failed: {0}")]
    Insert(String),
}
