//! Date-indexed table of aligned series.
//!
//! The date column is stored separately from value columns so that every value
//! column is guaranteed to line up with it. Absent values are `None`; they are
//! never replaced by zero or NaN.

use chrono::NaiveDate;

use crate::domain::Series;
use crate::error::AppError;
use crate::transform::Derivation;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl Table {
    /// An empty table over the given (ascending) dates.
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: Vec::new(),
        }
    }

    /// Single-column table holding a series' raw observations, row for row.
    pub fn from_series(series: &Series, column: &str) -> Self {
        let dates = series.observations.iter().map(|o| o.date).collect();
        let values = series.observations.iter().map(|o| o.value).collect();
        Self {
            dates,
            columns: vec![Column {
                name: column.to_string(),
                values,
            }],
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn values(&self, name: &str) -> Result<&[Option<f64>], AppError> {
        self.column(name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| AppError::usage(format!("Unknown column '{name}'.")))
    }

    /// Append a column; the row set is left untouched.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<(), AppError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(AppError::usage(format!(
                "Column '{name}' has {} values but the table has {} rows.",
                values.len(),
                self.dates.len()
            )));
        }
        if self.column(&name).is_some() {
            return Err(AppError::usage(format!("Column '{name}' already exists.")));
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Append the column produced by `derivation`.
    pub fn derive(&mut self, derivation: &Derivation) -> Result<(), AppError> {
        derivation.apply(self)
    }

    /// Rename value columns positionally (request order).
    pub fn rename_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), AppError> {
        if names.len() != self.columns.len() {
            return Err(AppError::usage(format!(
                "Expected {} column names, got {}.",
                self.columns.len(),
                names.len()
            )));
        }
        for (i, name) in names.iter().enumerate() {
            let name = name.as_ref();
            if names[..i].iter().any(|n| n.as_ref() == name) {
                return Err(AppError::usage(format!("Duplicate column name '{name}'.")));
            }
        }
        for (column, name) in self.columns.iter_mut().zip(names) {
            column.name = name.as_ref().to_string();
        }
        Ok(())
    }

    /// Keep rows whose date satisfies `keep`, preserving order.
    pub fn retain_rows(&self, mut keep: impl FnMut(NaiveDate) -> bool) -> Table {
        let mask: Vec<bool> = self.dates.iter().map(|&d| keep(d)).collect();
        Table {
            dates: masked(&self.dates, &mask),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: masked(&c.values, &mask),
                })
                .collect(),
        }
    }
}

fn masked<T: Copy>(items: &[T], mask: &[bool]) -> Vec<T> {
    items
        .iter()
        .zip(mask)
        .filter_map(|(item, &k)| k.then_some(*item))
        .collect()
}
