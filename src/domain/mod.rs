//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - provider request enums (`SeriesFrequency`, `CalendarMergeMode`, ...)
//! - raw series and metadata (`Series`, `SeriesMetadata`, `Observation`)
//! - the aligned, date-indexed `Table`

pub mod table;
pub mod types;

pub use table::*;
pub use types::*;
