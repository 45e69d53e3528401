//! Export pipeline errors

/// Errors raised by the catalog export pipeline.
///
/// Each variant marks the stage that failed; all of them abort the run at
/// the point of origin.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Export job start failed: {0}")]
    JobStart(String),

    #[error("Export job ended with status: {0}")]
    JobFailed(String),

    #[error("Download failed: {0}")]
    Download(String),
}
