//! Presentation-window filter.

use crate::domain::Table;
use crate::transform::year_of;

/// Keep rows whose year is strictly after `year`, in their original order.
pub fn filter_after_year(table: &Table, year: i32) -> Table {
    table.retain_rows(|date| year_of(date) > year)
}
