//! Shared chart pipeline: fetch -> derive -> filter -> render.
//!
//! Every chart in a book goes through the same four steps; only the recipe
//! (`ChartSpec`) differs. The provider is passed in so tests and the
//! `--fixtures` mode can run offline.

use tracing::{debug, info, warn};

use crate::chart::{ChartSpec, RenderOptions, SeriesQuery, render_svg};
use crate::data::{SeriesProvider, check_frequencies};
use crate::domain::Table;
use crate::error::AppError;
use crate::filter::filter_after_year;

/// Outputs of one chart pipeline.
#[derive(Debug, Clone)]
pub struct ChartRun {
    pub key: String,
    /// The filtered table the chart was drawn from.
    pub table: Table,
    pub svg: String,
}

/// Result of a batch: which charts rendered and which failed, in order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub rendered: Vec<String>,
    pub failed: Vec<(String, AppError)>,
}

impl BatchSummary {
    /// The last failure, if any; its exit code becomes the process exit code.
    pub fn last_error(&self) -> Option<&AppError> {
        self.failed.last().map(|(_, err)| err)
    }
}

/// Fetch the raw table for a query.
///
/// Single series keep the provider's row count. Unified requests are
/// frequency-checked first and their columns renamed in request order.
pub fn fetch_table(provider: &dyn SeriesProvider, query: &SeriesQuery) -> Result<Table, AppError> {
    match query {
        SeriesQuery::Single { name, column } => {
            let series = provider.fetch_series(name)?;
            debug!(series = %name, rows = series.len(), "fetched series");
            Ok(Table::from_series(&series, column))
        }
        SeriesQuery::Unified { request, columns } => {
            check_frequencies(provider, request)?;
            let mut table = provider.fetch_unified(request)?;
            table.rename_columns(columns)?;
            debug!(series = request.entries.len(), rows = table.len(), "fetched unified series");
            Ok(table)
        }
    }
}

/// Fetch, derive and filter: the table a chart is drawn from.
pub fn prepare_table(provider: &dyn SeriesProvider, chart: &ChartSpec) -> Result<Table, AppError> {
    chart.validate()?;
    let mut table = fetch_table(provider, &chart.query)?;
    for derivation in &chart.derive {
        table.derive(derivation)?;
    }
    Ok(match chart.after_year {
        Some(year) => filter_after_year(&table, year),
        None => table,
    })
}

/// Run one chart end to end.
pub fn run_chart(
    provider: &dyn SeriesProvider,
    chart: &ChartSpec,
    options: &RenderOptions,
) -> Result<ChartRun, AppError> {
    let table = prepare_table(provider, chart)?;
    let svg = render_svg(&table, chart, options)?;
    info!(chart = %chart.key, rows = table.len(), "rendered chart");
    Ok(ChartRun {
        key: chart.key.clone(),
        table,
        svg,
    })
}

/// Run charts one after another; a failure is logged and the batch moves on.
///
/// `sink` receives each successful run (e.g. to write it to disk). A sink
/// error counts as that chart's failure.
pub fn run_batch<'a>(
    provider: &dyn SeriesProvider,
    charts: impl IntoIterator<Item = &'a ChartSpec>,
    options: &RenderOptions,
    mut sink: impl FnMut(&ChartRun) -> Result<(), AppError>,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for chart in charts {
        match run_chart(provider, chart, options).and_then(|run| sink(&run)) {
            Ok(()) => summary.rendered.push(chart.key.clone()),
            Err(err) => {
                warn!(chart = %chart.key, code = err.exit_code(), "chart failed: {err}");
                summary.failed.push((chart.key.clone(), err));
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{LegendPosition, LineColor, LineSpec};
    use crate::data::FixtureProvider;
    use crate::domain::{
        Observation, Series, SeriesEntry, SeriesFrequency, SeriesMetadata, ToHigherFrequencyMethod, UnifiedRequest,
    };
    use crate::error::ErrorKind;
    use crate::transform::Derivation;
    use chrono::{Datelike, NaiveDate};

    fn monthly(name: &str, from_year: i32, years: i32, f: impl Fn(usize) -> f64) -> Series {
        let observations = (0..years * 12)
            .map(|i| Observation {
                date: NaiveDate::from_ymd_opt(from_year + i / 12, (i % 12) as u32 + 1, 1).unwrap(),
                value: Some(f(i as usize)),
            })
            .collect();
        Series {
            metadata: SeriesMetadata {
                name: name.to_string(),
                frequency: SeriesFrequency::Monthly,
                currency: Some("USD".into()),
                description: None,
            },
            observations,
        }
    }

    fn quarterly(name: &str, from_year: i32, years: i32) -> Series {
        let observations = (0..years * 4)
            .map(|i| Observation {
                date: NaiveDate::from_ymd_opt(from_year + i / 4, (i % 4) as u32 * 3 + 1, 1).unwrap(),
                value: Some(50.0),
            })
            .collect();
        Series {
            metadata: SeriesMetadata {
                name: name.to_string(),
                frequency: SeriesFrequency::Quarterly,
                currency: Some("USD".into()),
                description: None,
            },
            observations,
        }
    }

    fn provider() -> FixtureProvider {
        FixtureProvider::new(vec![
            monthly("brnaac1005", 2018, 4, |i| 100.0 * 1e9 * (1.0 + i as f64 / 100.0)),
            monthly("brbopa1000", 2018, 4, |_| -2.0 * 1e9),
            quarterly("brfofi1043", 2018, 4),
        ])
    }

    fn gdp_chart() -> ChartSpec {
        ChartSpec {
            key: "nominal-gdp".into(),
            title: "Brazil, Nominal GDP in USD".into(),
            y_label: "USD, billion".into(),
            query: SeriesQuery::Single {
                name: "brnaac1005".into(),
                column: "value".into(),
            },
            derive: vec![Derivation::Rescale {
                source: "value".into(),
                divisor: 1e9,
                output: "value_bn".into(),
            }],
            after_year: Some(2019),
            lines: vec![LineSpec::new("value_bn", LineColor::Red)],
            legend: LegendPosition::UpperLeft,
        }
    }

    fn ratio_chart(debt_method: Option<ToHigherFrequencyMethod>) -> ChartSpec {
        let mut debt = SeriesEntry::new("brfofi1043");
        debt.to_higher_frequency = debt_method;
        ChartSpec {
            key: "gov-debt-gdp".into(),
            title: "Brazil, General Government Debt as % of GDP".into(),
            y_label: "Percent".into(),
            query: SeriesQuery::Unified {
                request: UnifiedRequest::new(vec![debt, SeriesEntry::new("brnaac1005")]).currency("USD"),
                columns: vec!["series".into(), "GDP".into()],
            },
            derive: vec![Derivation::RatioPct {
                numerator: "series".into(),
                subtract: None,
                denominator: "GDP".into(),
                output: "pct_gdp".into(),
            }],
            after_year: None,
            lines: vec![LineSpec::new("pct_gdp", LineColor::Red)],
            legend: LegendPosition::UpperLeft,
        }
    }

    #[test]
    fn single_series_keeps_provider_row_count() {
        let query = SeriesQuery::Single {
            name: "brnaac1005".into(),
            column: "value".into(),
        };
        let table = fetch_table(&provider(), &query).unwrap();
        assert_eq!(table.len(), 48);
        assert_eq!(table.columns()[0].name, "value");
    }

    #[test]
    fn chart_runs_end_to_end() {
        let run = run_chart(&provider(), &gdp_chart(), &RenderOptions::default()).unwrap();
        assert_eq!(run.key, "nominal-gdp");
        assert_eq!(run.table.len(), 24);
        assert!(run.table.dates().iter().all(|d| d.year() > 2019));
        let first = run.table.values("value_bn").unwrap()[0].unwrap();
        assert!((first - 124.0).abs() < 1e-9);
        assert!(run.svg.contains("Brazil, Nominal GDP in USD"));
    }

    #[test]
    fn unified_columns_are_renamed_in_request_order() {
        let chart = ratio_chart(Some(ToHigherFrequencyMethod::Same));
        let table = prepare_table(&provider(), &chart).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["series", "GDP", "pct_gdp"]);
        assert!(!table.is_empty());
    }

    #[test]
    fn mixed_frequencies_without_method_fail_with_code_3() {
        let err = run_chart(&provider(), &ratio_chart(None), &RenderOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FrequencyMismatch);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn failing_chart_does_not_block_the_batch() {
        let mut missing = gdp_chart();
        missing.key = "missing".into();
        missing.query = SeriesQuery::Single {
            name: "nope".into(),
            column: "value".into(),
        };
        let charts = vec![missing, gdp_chart()];

        let mut written = Vec::new();
        let summary = run_batch(&provider(), &charts, &RenderOptions::default(), |run| {
            written.push(run.key.clone());
            Ok(())
        });

        assert_eq!(summary.rendered, vec!["nominal-gdp"]);
        assert_eq!(written, vec!["nominal-gdp"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.last_error().map(|e| e.exit_code()), Some(4));
    }

    #[test]
    fn sink_errors_count_as_failures() {
        let charts = vec![gdp_chart()];
        let summary = run_batch(&provider(), &charts, &RenderOptions::default(), |_| {
            Err(AppError::io("disk full"))
        });
        assert!(summary.rendered.is_empty());
        assert_eq!(summary.last_error().map(|e| e.kind()), Some(ErrorKind::Io));
    }
}
