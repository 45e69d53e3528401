//! Input discovery and zip expansion
//!
//! The loader accepts either an explicit spreadsheet/zip path or a base
//! path without extension; for a base path the newer of `{base}.zip` and
//! `{base}.xlsx` wins. Zip archives are expanded into a temporary
//! directory that lives as long as the returned [`ResolvedInput`].

use crate::error::LoadError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Spreadsheet files ready to load
#[derive(Debug)]
pub struct ResolvedInput {
    /// Discovered spreadsheet paths, in stable order
    pub files: Vec<PathBuf>,

    /// Extraction directory backing the paths, when the input was a zip
    _extract_dir: Option<TempDir>,
}

fn is_spreadsheet(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("xls") || ext.eq_ignore_ascii_case("xlsx")
    )
}

fn is_zip(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("zip")
    )
}

/// Pick the input for a base path without extension: the newer of
/// `{base}.zip` and `{base}.xlsx` by modification time, or whichever one
/// exists. Neither existing is an error.
pub fn find_input_file(base_path: &str) -> Result<PathBuf, LoadError> {
    let zip_path = PathBuf::from(format!("{}.zip", base_path));
    let xlsx_path = PathBuf::from(format!("{}.xlsx", base_path));

    let zip_exists = zip_path.is_file();
    let xlsx_exists = xlsx_path.is_file();

    match (zip_exists, xlsx_exists) {
        (true, true) => {
            let zip_mtime = modified(&zip_path)?;
            let xlsx_mtime = modified(&xlsx_path)?;
            if zip_mtime > xlsx_mtime {
                Ok(zip_path)
            } else {
                Ok(xlsx_path)
            }
        }
        (true, false) => Ok(zip_path),
        (false, true) => Ok(xlsx_path),
        (false, false) => Err(LoadError::InputResolution(format!(
            "neither '{}' nor '{}' found",
            zip_path.display(),
            xlsx_path.display()
        ))),
    }
}

fn modified(path: &Path) -> Result<std::time::SystemTime, LoadError> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| {
            LoadError::InputResolution(format!("cannot stat {}: {}", path.display(), e))
        })
}

/// Expand an input path into the set of spreadsheet files it denotes.
///
/// A zip archive is extracted and scanned recursively; an archive with no
/// spreadsheet entries yields an empty set, which is not an error. A bare
/// spreadsheet path passes through. Anything else fails.
pub fn resolve_inputs(input_path: &Path) -> Result<ResolvedInput, LoadError> {
    if is_zip(input_path) {
        let extract_dir = tempfile::tempdir().map_err(|e| {
            LoadError::InputResolution(format!("cannot create extraction dir: {}", e))
        })?;

        let file = fs::File::open(input_path).map_err(|e| {
            LoadError::InputResolution(format!("cannot open {}: {}", input_path.display(), e))
        })?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            LoadError::InputResolution(format!("cannot read {}: {}", input_path.display(), e))
        })?;
        archive.extract(extract_dir.path()).map_err(|e| {
            LoadError::InputResolution(format!("cannot extract {}: {}", input_path.display(), e))
        })?;

        let mut files: Vec<PathBuf> = WalkDir::new(extract_dir.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_spreadsheet(path))
            .collect();
        files.sort();

        if files.is_empty() {
            tracing::warn!(
                archive = %input_path.display(),
                "no spreadsheet files found in archive"
            );
        }

        return Ok(ResolvedInput {
            files,
            _extract_dir: Some(extract_dir),
        });
    }

    if input_path.is_file() && is_spreadsheet(input_path) {
        return Ok(ResolvedInput {
            files: vec![input_path.to_path_buf()],
            _extract_dir: None,
        });
    }

    Err(LoadError::InputResolution(format!(
        "input path {} is not a spreadsheet file or zip archive",
        input_path.display()
    )))
}
