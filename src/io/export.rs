//! Export chart tables to CSV.
//!
//! One row per date, one column per table column; absent values are empty
//! cells so spreadsheets see gaps rather than zeros.

use std::path::Path;

use crate::domain::Table;
use crate::error::AppError;

/// Write `table` to a CSV file.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_rows(&mut writer, table)?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV '{}': {e}", path.display())))
}

fn write_rows<W: std::io::Write>(writer: &mut csv::Writer<W>, table: &Table) -> Result<(), AppError> {
    let header = std::iter::once("date").chain(table.columns().iter().map(|c| c.name.as_str()));
    writer
        .write_record(header)
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for (row, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(table.columns().len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(
            table
                .columns()
                .iter()
                .map(|c| c.values[row].map(|v| v.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(&record)
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }
    Ok(())
}
