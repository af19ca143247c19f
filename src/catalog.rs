//! Built-in chart book for Brazil.
//!
//! Presentation windows and colours reproduce the reference chart sheet.
//! Percent-change columns are scaled to percent (x100) wherever the axis says
//! "Percent".

use crate::chart::{ChartSpec, LegendPosition, LineColor, LineSpec, SeriesQuery};
use crate::domain::{SeriesEntry, ToHigherFrequencyMethod, UnifiedRequest};
use crate::error::AppError;
use crate::transform::Derivation;

const NOMINAL_GDP: &str = "brnaac1005";
const RESERVE_ASSETS: &str = "brfofi1030";
const IMPORTS: &str = "brtrad1153";
const EXPORTS: &str = "brtrad1015";
const CPI: &str = "brpric1011";
const CURRENT_ACCOUNT: &str = "brbopa1000";
const CB_INFLATION_FORECAST: &str = "brrate0102";
const PRIMARY_BUDGET: &str = "brgpfi1066";
const BUDGET: &str = "brgpfi1098";
const GOV_DEBT: &str = "brfofi1043";

const BILLION: f64 = 1e9;
const USD: &str = "USD";

/// The Brazil chart book, in presentation order.
pub fn brazil() -> Vec<ChartSpec> {
    vec![
        ChartSpec {
            key: "nominal-gdp".into(),
            title: "Brazil, Nominal GDP in USD".into(),
            y_label: "USD, billion".into(),
            query: single(NOMINAL_GDP),
            derive: vec![rescale("value", BILLION, "value_bn")],
            after_year: Some(2007),
            lines: vec![LineSpec::new("value_bn", LineColor::Red)],
            legend: LegendPosition::UpperLeft,
        },
        ChartSpec {
            key: "nominal-gdp-yoy".into(),
            title: "Brazil, Nominal GDP y/y % change".into(),
            y_label: "Percent".into(),
            query: single(NOMINAL_GDP),
            derive: percent_change("value", 12, "y/y"),
            after_year: Some(2008),
            lines: vec![LineSpec::new("y/y", LineColor::Red)],
            legend: LegendPosition::UpperLeft,
        },
        ChartSpec {
            key: "reserve-assets".into(),
            title: "Brazil: Reserve Assets".into(),
            y_label: "USD, billion".into(),
            query: single(RESERVE_ASSETS),
            derive: vec![rescale("value", BILLION, "value_bn")],
            after_year: Some(2009),
            lines: vec![LineSpec::new("value_bn", LineColor::Red)],
            legend: LegendPosition::UpperLeft,
        },
        ChartSpec {
            key: "imports-exports".into(),
            title: "Brazil: Imports and Exports".into(),
            y_label: "USD, billion".into(),
            query: unified_usd(&[(IMPORTS, "Imports"), (EXPORTS, "Exports")]),
            derive: vec![
                rescale("Imports", BILLION, "imports bil"),
                rescale("Exports", BILLION, "exports bil"),
            ],
            after_year: Some(2011),
            lines: vec![
                LineSpec::new("imports bil", LineColor::Blue).labelled("Imports"),
                LineSpec::new("exports bil", LineColor::Red).labelled("Exports"),
            ],
            legend: LegendPosition::UpperLeft,
        },
        ChartSpec {
            key: "trade-balance-gdp".into(),
            title: "Brazil, Trade Balance in USD as % of GDP".into(),
            y_label: "Percent".into(),
            query: unified_usd(&[(IMPORTS, "Imports"), (EXPORTS, "Exports"), (NOMINAL_GDP, "GDP")]),
            derive: vec![Derivation::RatioPct {
                numerator: "Exports".into(),
                subtract: Some("Imports".into()),
                denominator: "GDP".into(),
                output: "trade balance".into(),
            }],
            after_year: Some(2011),
            lines: vec![LineSpec::new("trade balance", LineColor::Red)],
            legend: LegendPosition::UpperLeft,
        },
        ChartSpec {
            key: "inflation".into(),
            title: "Brazil, Inflation: y/y, 3m/3m, 1m/1m".into(),
            y_label: "Percent".into(),
            query: single(CPI),
            derive: [
                percent_change("value", 12, "y/y"),
                percent_change("value", 3, "3m/3m"),
                percent_change("value", 1, "1m/1m"),
            ]
            .concat(),
            after_year: None,
            lines: vec![
                LineSpec::new("y/y", LineColor::Blue).labelled("Y/Y pct change"),
                LineSpec::new("3m/3m", LineColor::Red).labelled("3m/3m pct change"),
                LineSpec::new("1m/1m", LineColor::Green).labelled("1m/1m pct change"),
            ],
            legend: LegendPosition::UpperLeft,
        },
        gdp_ratio(
            "current-account-gdp",
            "Brazil, Current Account as % of GDP",
            SeriesEntry::new(CURRENT_ACCOUNT),
            None,
        ),
        ChartSpec {
            key: "cb-inflation-forecast".into(),
            title: "Brazil, Central Bank Inflation Forecast".into(),
            y_label: "Percent".into(),
            query: single(CB_INFLATION_FORECAST),
            derive: Vec::new(),
            after_year: Some(1999),
            lines: vec![LineSpec::new("value", LineColor::Red)],
            legend: LegendPosition::UpperLeft,
        },
        gdp_ratio(
            "primary-budget-gdp",
            "Brazil, Primary Budget Deficit in USD as % of GDP",
            SeriesEntry::new(PRIMARY_BUDGET),
            Some(2015),
        ),
        gdp_ratio(
            "budget-gdp",
            "Brazil, Budget Deficit in USD as % of GDP",
            SeriesEntry::new(BUDGET),
            Some(2014),
        ),
        // Government debt is reported less often than GDP.
        gdp_ratio(
            "gov-debt-gdp",
            "Brazil, General Government Debt as % of GDP",
            SeriesEntry::new(GOV_DEBT).to_higher(ToHigherFrequencyMethod::LinearInterpolation),
            Some(2006),
        ),
    ]
}

/// Look up one chart by key.
pub fn find<'a>(book: &'a [ChartSpec], key: &str) -> Result<&'a ChartSpec, AppError> {
    book.iter().find(|c| c.key == key).ok_or_else(|| {
        let known: Vec<&str> = book.iter().map(|c| c.key.as_str()).collect();
        AppError::usage(format!("Unknown chart '{key}'. Known charts: {}.", known.join(", ")))
    })
}

fn single(name: &str) -> SeriesQuery {
    SeriesQuery::Single {
        name: name.to_string(),
        column: "value".to_string(),
    }
}

fn unified_usd(series: &[(&str, &str)]) -> SeriesQuery {
    SeriesQuery::Unified {
        request: UnifiedRequest::new(series.iter().map(|(name, _)| SeriesEntry::new(*name)).collect())
            .currency(USD),
        columns: series.iter().map(|(_, column)| column.to_string()).collect(),
    }
}

fn rescale(source: &str, divisor: f64, output: &str) -> Derivation {
    Derivation::Rescale {
        source: source.into(),
        divisor,
        output: output.into(),
    }
}

/// Percent change over `lag` rows, expressed in percent.
fn percent_change(source: &str, lag: usize, output: &str) -> Vec<Derivation> {
    let fraction = format!("{output} (fraction)");
    vec![
        Derivation::PctChange {
            source: source.into(),
            lag,
            output: fraction.clone(),
        },
        rescale(&fraction, 0.01, output),
    ]
}

/// `series / GDP * 100`, both in USD.
fn gdp_ratio(key: &str, title: &str, entry: SeriesEntry, after_year: Option<i32>) -> ChartSpec {
    let request = UnifiedRequest::new(vec![entry, SeriesEntry::new(NOMINAL_GDP)]).currency(USD);
    ChartSpec {
        key: key.into(),
        title: title.into(),
        y_label: "Percent".into(),
        query: SeriesQuery::Unified {
            request,
            columns: vec!["series".into(), "GDP".into()],
        },
        derive: vec![Derivation::RatioPct {
            numerator: "series".into(),
            subtract: None,
            denominator: "GDP".into(),
            output: "pct_gdp".into(),
        }],
        after_year,
        lines: vec![LineSpec::new("pct_gdp", LineColor::Red)],
        legend: LegendPosition::UpperLeft,
    }
}
