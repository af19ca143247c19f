//! Read/write chart-book JSON files.
//!
//! A chart book is a JSON array of `ChartSpec` recipes. `mc book export`
//! writes the built-in book so it can be edited and passed back via `--book`.

use std::fs::File;
use std::path::Path;

use crate::chart::ChartSpec;
use crate::error::AppError;

/// Write a chart book as pretty-printed JSON.
pub fn write_book_json(path: &Path, book: &[ChartSpec]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create chart book '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, book)
        .map_err(|e| AppError::io(format!("Failed to write chart book: {e}")))?;
    Ok(())
}

/// Read a chart book and validate every recipe.
pub fn read_book_json(path: &Path) -> Result<Vec<ChartSpec>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open chart book '{}': {e}", path.display())))?;
    let book: Vec<ChartSpec> = serde_json::from_reader(file)
        .map_err(|e| AppError::usage(format!("Invalid chart book '{}': {e}", path.display())))?;
    for chart in &book {
        chart.validate()?;
    }
    for (i, chart) in book.iter().enumerate() {
        if book[..i].iter().any(|c| c.key == chart.key) {
            return Err(AppError::usage(format!("Chart key '{}' appears more than once.", chart.key)));
        }
    }
    Ok(book)
}
