//! Chart recipes and rendering.
//!
//! A `ChartSpec` carries every per-chart constant: what to fetch, which
//! columns to derive, the presentation window, and how each line is drawn.
//! Recipes are plain data so a chart book can live in JSON.

use plotters::prelude::{RGBColor, SeriesLabelPosition};
use serde::{Deserialize, Serialize};

use crate::domain::UnifiedRequest;
use crate::error::AppError;
use crate::transform::Derivation;

pub mod render;

pub use render::{RenderOptions, render_svg};

/// What to fetch for a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SeriesQuery {
    /// One series, raw; the table has a single column named `column`.
    Single {
        name: String,
        #[serde(default = "default_column")]
        column: String,
    },
    /// Several series aligned by the provider; `columns` names them in request order.
    Unified { request: UnifiedRequest, columns: Vec<String> },
}

fn default_column() -> String {
    "value".to_string()
}

impl SeriesQuery {
    pub fn series_names(&self) -> Vec<&str> {
        match self {
            SeriesQuery::Single { name, .. } => vec![name.as_str()],
            SeriesQuery::Unified { request, .. } => request.entries.iter().map(|e| e.name.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineColor {
    Red,
    Blue,
    Green,
    Black,
    Orange,
    Purple,
    Gray,
}

impl LineColor {
    pub fn rgb(self) -> RGBColor {
        match self {
            LineColor::Red => RGBColor(255, 0, 0),
            LineColor::Blue => RGBColor(0, 0, 255),
            LineColor::Green => RGBColor(0, 128, 0),
            LineColor::Black => RGBColor(0, 0, 0),
            LineColor::Orange => RGBColor(255, 165, 0),
            LineColor::Purple => RGBColor(128, 0, 128),
            LineColor::Gray => RGBColor(128, 128, 128),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendPosition {
    #[default]
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

impl LegendPosition {
    fn series_label_position(self) -> SeriesLabelPosition {
        match self {
            LegendPosition::UpperLeft => SeriesLabelPosition::UpperLeft,
            LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
            LegendPosition::LowerLeft => SeriesLabelPosition::LowerLeft,
            LegendPosition::LowerRight => SeriesLabelPosition::LowerRight,
        }
    }
}

/// One plotted line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    pub column: String,
    pub color: LineColor,
    /// Legend text; falls back to the column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl LineSpec {
    pub fn new(column: impl Into<String>, color: LineColor) -> Self {
        Self {
            column: column.into(),
            color,
            label: None,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn legend_text(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Short identifier, also the output file stem.
    pub key: String,
    pub title: String,
    pub y_label: String,
    pub query: SeriesQuery,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derive: Vec<Derivation>,
    /// Keep only rows whose year is strictly greater than this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_year: Option<i32>,
    pub lines: Vec<LineSpec>,
    #[serde(default)]
    pub legend: LegendPosition,
}

impl ChartSpec {
    /// Structural checks that do not need any data.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.key.trim().is_empty() {
            return Err(AppError::usage("Chart key must not be empty."));
        }
        if self.lines.is_empty() {
            return Err(AppError::usage(format!("Chart '{}' plots no lines.", self.key)));
        }
        if let SeriesQuery::Unified { request, columns } = &self.query {
            if request.entries.is_empty() {
                return Err(AppError::usage(format!("Chart '{}' requests no series.", self.key)));
            }
            if columns.len() != request.entries.len() {
                return Err(AppError::usage(format!(
                    "Chart '{}' names {} columns for {} requested series.",
                    self.key,
                    columns.len(),
                    request.entries.len()
                )));
            }
        }
        Ok(())
    }
}
