//! Chart files under the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;

/// `<dir>/<key>.<extension>`
pub fn chart_path(dir: &Path, key: &str, extension: &str) -> PathBuf {
    dir.join(format!("{key}.{extension}"))
}

/// Write an SVG document to `<dir>/<key>.svg`, creating `dir` if needed.
pub fn write_svg(dir: &Path, key: &str, svg: &str) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create output directory '{}': {e}", dir.display())))?;
    let path = chart_path(dir, key, "svg");
    fs::write(&path, svg).map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))?;
    debug!(path = %path.display(), bytes = svg.len(), "wrote chart");
    Ok(path)
}
