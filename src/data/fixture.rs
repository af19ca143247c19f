//! Offline provider backed by series held in memory.
//!
//! Fixture files are JSON:
//!
//! ```json
//! {"series": [{"name": "brnaac1005", "frequency": "monthly", "currency": "USD",
//!              "observations": [{"date": "2020-01-01", "value": 1.0e11}]}]}
//! ```
//!
//! Unified requests are aligned locally with `data::align`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::data::{SeriesProvider, align};
use crate::domain::{Observation, Series, SeriesFrequency, SeriesMetadata, Table, UnifiedRequest};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct FixtureFile {
    series: Vec<FixtureSeries>,
}

#[derive(Debug, Deserialize)]
struct FixtureSeries {
    name: String,
    frequency: SeriesFrequency,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    description: Option<String>,
    observations: Vec<Observation>,
}

pub struct FixtureProvider {
    // Keyed by lowercase name; provider identifiers are case-insensitive.
    series: BTreeMap<String, Series>,
}

impl FixtureProvider {
    pub fn new(series: Vec<Series>) -> Self {
        let series = series
            .into_iter()
            .map(|mut s| {
                s.observations.sort_by_key(|o| o.date);
                (s.metadata.name.to_ascii_lowercase(), s)
            })
            .collect();
        Self { series }
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::io(format!("Failed to open fixtures '{}': {e}", path.display())))?;
        let parsed: FixtureFile = serde_json::from_reader(file)
            .map_err(|e| AppError::usage(format!("Invalid fixtures file '{}': {e}", path.display())))?;
        Ok(Self::from_file(parsed))
    }

    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        let parsed: FixtureFile =
            serde_json::from_str(json).map_err(|e| AppError::usage(format!("Invalid fixtures JSON: {e}")))?;
        Ok(Self::from_file(parsed))
    }

    fn from_file(file: FixtureFile) -> Self {
        Self::new(
            file.series
                .into_iter()
                .map(|s| Series {
                    metadata: SeriesMetadata {
                        name: s.name,
                        frequency: s.frequency,
                        currency: s.currency,
                        description: s.description,
                    },
                    observations: s.observations,
                })
                .collect(),
        )
    }

    fn lookup(&self, name: &str) -> Result<&Series, AppError> {
        self.series
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| AppError::retrieval(format!("Series '{name}' not found.")))
    }
}

impl SeriesProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixtures"
    }

    fn fetch_series(&self, name: &str) -> Result<Series, AppError> {
        self.lookup(name).cloned()
    }

    fn fetch_metadata(&self, name: &str) -> Result<SeriesMetadata, AppError> {
        Ok(self.lookup(name)?.metadata.clone())
    }

    fn fetch_unified(&self, request: &UnifiedRequest) -> Result<Table, AppError> {
        let series = request
            .entries
            .iter()
            .map(|entry| self.fetch_series(&entry.name))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(series = series.len(), "aligning fixture series locally");
        align::unify(request, &series)
    }
}
