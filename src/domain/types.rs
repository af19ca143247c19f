//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - sent to the data provider as request payloads
//! - loaded from offline fixture files
//! - embedded in chart-book JSON

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Native reporting periodicity of a series.
///
/// Variants are declared from lowest to highest frequency so the derived
/// ordering answers "which series is reported more often".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesFrequency {
    Annual,
    SemiAnnual,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl SeriesFrequency {
    pub fn label(self) -> &'static str {
        match self {
            SeriesFrequency::Annual => "annual",
            SeriesFrequency::SemiAnnual => "semi-annual",
            SeriesFrequency::Quarterly => "quarterly",
            SeriesFrequency::Monthly => "monthly",
            SeriesFrequency::Weekly => "weekly",
            SeriesFrequency::Daily => "daily",
        }
    }
}

impl fmt::Display for SeriesFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SeriesFrequency {
    type Err = AppError;

    /// Accepts both the provider's spelling (`semiannual`) and ours (`semi-annual`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "annual" | "yearly" => Ok(SeriesFrequency::Annual),
            "semiannual" => Ok(SeriesFrequency::SemiAnnual),
            "quarterly" => Ok(SeriesFrequency::Quarterly),
            "monthly" => Ok(SeriesFrequency::Monthly),
            "weekly" => Ok(SeriesFrequency::Weekly),
            "daily" => Ok(SeriesFrequency::Daily),
            _ => Err(AppError::retrieval(format!("Unrecognized series frequency '{s}'."))),
        }
    }
}

/// How gaps inside a series are treated during retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingValueMethod {
    /// Leave gaps as absent values.
    #[default]
    None,
    PreviousValue,
    Zero,
    LinearInterpolation,
}

/// How a lower-frequency series is re-expressed at a higher frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToHigherFrequencyMethod {
    LinearInterpolation,
    /// Repeat the latest reported value.
    Same,
}

/// Which dates survive when several series are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalendarMergeMode {
    #[default]
    AvailableInAll,
    AvailableInAny,
}

/// Start or end selector for a unified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartOrEndPoint {
    /// The earliest/latest date for which every series has data.
    #[default]
    DataInAllSeries,
    /// The earliest/latest date for which any series has data.
    DataInAnySeries,
    Date(NaiveDate),
}

/// One series in a unified request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub name: String,
    #[serde(default)]
    pub missing_value_method: MissingValueMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_higher_frequency: Option<ToHigherFrequencyMethod>,
}

impl SeriesEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            missing_value_method: MissingValueMethod::None,
            to_higher_frequency: None,
        }
    }

    pub fn to_higher(mut self, method: ToHigherFrequencyMethod) -> Self {
        self.to_higher_frequency = Some(method);
        self
    }
}

/// A multi-series request aligned on one calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRequest {
    pub entries: Vec<SeriesEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default)]
    pub calendar_merge_mode: CalendarMergeMode,
    #[serde(default)]
    pub start_point: StartOrEndPoint,
    #[serde(default)]
    pub end_point: StartOrEndPoint,
}

impl UnifiedRequest {
    pub fn new(entries: Vec<SeriesEntry>) -> Self {
        Self {
            entries,
            currency: None,
            calendar_merge_mode: CalendarMergeMode::AvailableInAll,
            start_point: StartOrEndPoint::DataInAllSeries,
            end_point: StartOrEndPoint::DataInAllSeries,
        }
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// A single dated value; `None` marks a gap reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Descriptive attributes of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub name: String,
    pub frequency: SeriesFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Raw observations for one series, ascending by date.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metadata: SeriesMetadata,
    pub observations: Vec<Observation>,
}

impl Series {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn frequency(&self) -> SeriesFrequency {
        self.metadata.frequency
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// First and last dates carrying an actual value.
    pub fn value_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut with_values = self.observations.iter().filter(|o| o.value.is_some());
        let first = with_values.next()?.date;
        let last = with_values.last().map(|o| o.date).unwrap_or(first);
        Some((first, last))
    }
}
