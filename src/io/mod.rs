//! Input/output helpers.
//!
//! - chart-book JSON read/write (`book`)
//! - CSV export of chart tables (`export`)
//! - SVG files under the output directory (`output`)

pub mod book;
pub mod export;
pub mod output;

pub use book::*;
pub use export::*;
pub use output::*;
