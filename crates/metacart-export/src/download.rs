//! Streamed artifact download
//!
//! The finished export can be arbitrarily large, so the body is written to
//! disk chunk by chunk instead of being buffered. The local filename comes
//! from the `Content-Disposition` header when the service provides one.

use crate::client::{api_base, IdmcClient};
use crate::error::ExportError;
use regex::Regex;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Extract the suggested filename from a `Content-Disposition` value,
/// e.g. `attachment; filename="Export_1.xlsx"`.
fn filename_from_disposition(header: &str) -> Option<String> {
    let pattern = Regex::new(r#"filename="([^"]+)""#).ok()?;
    pattern
        .captures(header)
        .map(|captures| captures[1].to_string())
}

/// Resolve the local filename: the header's suggestion when present,
/// otherwise `{fallback_base}.bin`.
pub fn resolve_filename(disposition: Option<&str>, fallback_base: &str) -> String {
    disposition
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| format!("{}.bin", fallback_base))
}

impl IdmcClient {
    /// Download the finished export artifact into the working directory.
    ///
    /// Returns the path written. Fails with [`ExportError::Download`] on a
    /// non-success status or any I/O failure.
    pub async fn download_export(
        &self,
        org_id: &str,
        token: &str,
        output_uri: &str,
        fallback_base: &str,
    ) -> Result<PathBuf, ExportError> {
        let url = if output_uri.starts_with("http") {
            output_uri.to_string()
        } else {
            format!("{}{}", api_base(&self.pod), output_uri)
        };

        let mut response = self
            .http
            .get(&url)
            .header("X-INFA-ORG-ID", org_id)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ExportError::Download(format!("download request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Download(format!(
                "download returned status {}: {}",
                status, body
            )));
        }

        let disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let filename = resolve_filename(disposition.as_deref(), fallback_base);
        let path = PathBuf::from(&filename);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ExportError::Download(format!("cannot create {}: {}", filename, e)))?;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ExportError::Download(format!("download stream failed: {}", e)))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| ExportError::Download(format!("cannot write {}: {}", filename, e)))?;
        }

        file.flush()
            .await
            .map_err(|e| ExportError::Download(format!("cannot flush {}: {}", filename, e)))?;

        tracing::info!(file = %filename, "downloaded export artifact");
        Ok(path)
    }
}
