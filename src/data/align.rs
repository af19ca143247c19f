//! In-process calendar unification for providers without a server-side one.
//!
//! Steps, in order:
//! 1. the target calendar is the union of dates of the highest-frequency series
//! 2. each series has its missing-value method applied to its own observations
//! 3. lower-frequency series are projected onto the calendar with their
//!    to-higher-frequency method (required; otherwise a frequency mismatch)
//! 4. start/end points trim the calendar
//! 5. the merge mode decides which of the remaining dates are kept

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, Months, NaiveDate};

use crate::domain::{
    CalendarMergeMode, MissingValueMethod, Series, SeriesEntry, SeriesFrequency, SeriesMetadata, StartOrEndPoint,
    Table, ToHigherFrequencyMethod, UnifiedRequest,
};
use crate::error::AppError;

/// Fail when a lower-frequency entry carries no conversion method.
pub fn ensure_convertible(entries: &[SeriesEntry], metadata: &[SeriesMetadata]) -> Result<(), AppError> {
    let Some(target) = metadata.iter().map(|m| m.frequency).max() else {
        return Ok(());
    };

    let offenders: Vec<String> = entries
        .iter()
        .zip(metadata)
        .filter(|(entry, meta)| meta.frequency < target && entry.to_higher_frequency.is_none())
        .map(|(entry, meta)| format!("{} ({})", entry.name, meta.frequency))
        .collect();

    if offenders.is_empty() {
        return Ok(());
    }
    Err(AppError::frequency_mismatch(format!(
        "Series frequencies differ (target {target}); supply a to-higher-frequency method for: {}.",
        offenders.join(", ")
    )))
}

/// Align `series` (in request order) into one table per `request`.
pub fn unify(request: &UnifiedRequest, series: &[Series]) -> Result<Table, AppError> {
    if request.entries.is_empty() {
        return Err(AppError::usage("A unified request needs at least one series."));
    }
    if series.len() != request.entries.len() {
        return Err(AppError::usage(format!(
            "Expected {} series for the unified request, got {}.",
            request.entries.len(),
            series.len()
        )));
    }

    if let Some(currency) = &request.currency {
        for s in series {
            if let Some(own) = &s.metadata.currency
                && !own.eq_ignore_ascii_case(currency)
            {
                return Err(AppError::retrieval(format!(
                    "Series '{}' is in {own}; conversion to {currency} is not available from this provider.",
                    s.name()
                )));
            }
        }
    }

    let metadata: Vec<SeriesMetadata> = series.iter().map(|s| s.metadata.clone()).collect();
    ensure_convertible(&request.entries, &metadata)?;

    let target = series
        .iter()
        .map(|s| s.frequency())
        .max()
        .unwrap_or(SeriesFrequency::Monthly);
    let calendar: Vec<NaiveDate> = series
        .iter()
        .filter(|s| s.frequency() == target)
        .flat_map(|s| s.observations.iter().map(|o| o.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut columns = Vec::with_capacity(series.len());
    for (entry, s) in request.entries.iter().zip(series) {
        let filled = fill_missing(s, entry.missing_value_method);
        let values = match entry.to_higher_frequency {
            Some(method) if s.frequency() < target => project(&filled, s.frequency(), method, &calendar),
            _ => {
                let lookup: BTreeMap<NaiveDate, Option<f64>> = filled.into_iter().collect();
                calendar
                    .iter()
                    .map(|d| lookup.get(d).copied().flatten())
                    .collect()
            }
        };
        columns.push(values);
    }

    let start = resolve_bound(request.start_point, &calendar, &columns, Bound::Start);
    let end = resolve_bound(request.end_point, &calendar, &columns, Bound::End);

    let keep: Vec<bool> = (0..calendar.len())
        .map(|row| {
            let date = calendar[row];
            let in_window = start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e);
            let mut present = columns.iter().map(|c| c[row].is_some());
            let merged = match request.calendar_merge_mode {
                CalendarMergeMode::AvailableInAll => present.all(|p| p),
                CalendarMergeMode::AvailableInAny => present.any(|p| p),
            };
            in_window && merged
        })
        .collect();

    let dates = calendar
        .iter()
        .zip(&keep)
        .filter_map(|(d, &k)| k.then_some(*d))
        .collect();
    let mut table = Table::new(dates);
    for (entry, values) in request.entries.iter().zip(columns) {
        let kept = values
            .into_iter()
            .zip(&keep)
            .filter_map(|(v, &k)| k.then_some(v))
            .collect();
        table.push_column(entry.name.clone(), kept).map_err(|_| {
            AppError::usage(format!("Series '{}' is requested more than once.", entry.name))
        })?;
    }
    Ok(table)
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn resolve_bound(
    point: StartOrEndPoint,
    calendar: &[NaiveDate],
    columns: &[Vec<Option<f64>>],
    bound: Bound,
) -> Option<NaiveDate> {
    let spans = columns.iter().map(|values| {
        let mut dated = calendar.iter().zip(values).filter(|(_, v)| v.is_some()).map(|(d, _)| *d);
        match bound {
            Bound::Start => dated.next(),
            Bound::End => dated.last(),
        }
    });

    match (point, bound) {
        (StartOrEndPoint::Date(date), _) => Some(date),
        // A series with no data at all leaves no common window.
        (StartOrEndPoint::DataInAllSeries, Bound::Start) => spans
            .collect::<Option<Vec<_>>>()
            .and_then(|v| v.into_iter().max())
            .or(Some(NaiveDate::MAX)),
        (StartOrEndPoint::DataInAllSeries, Bound::End) => spans
            .collect::<Option<Vec<_>>>()
            .and_then(|v| v.into_iter().min())
            .or(Some(NaiveDate::MIN)),
        (StartOrEndPoint::DataInAnySeries, Bound::Start) => spans.flatten().min(),
        (StartOrEndPoint::DataInAnySeries, Bound::End) => spans.flatten().max(),
    }
}

fn fill_missing(series: &Series, method: MissingValueMethod) -> Vec<(NaiveDate, Option<f64>)> {
    let mut out: Vec<(NaiveDate, Option<f64>)> =
        series.observations.iter().map(|o| (o.date, o.value)).collect();

    match method {
        MissingValueMethod::None => {}
        MissingValueMethod::Zero => {
            for (_, v) in &mut out {
                v.get_or_insert(0.0);
            }
        }
        MissingValueMethod::PreviousValue => {
            let mut last = None;
            for (_, v) in &mut out {
                match v {
                    Some(x) => last = Some(*x),
                    None => *v = last,
                }
            }
        }
        MissingValueMethod::LinearInterpolation => {
            let known: Vec<(NaiveDate, f64)> = out.iter().filter_map(|(d, v)| v.map(|x| (*d, x))).collect();
            for (d, v) in &mut out {
                if v.is_none() {
                    *v = interpolate_at(&known, *d);
                }
            }
        }
    }
    out
}

fn project(
    observations: &[(NaiveDate, Option<f64>)],
    frequency: SeriesFrequency,
    method: ToHigherFrequencyMethod,
    calendar: &[NaiveDate],
) -> Vec<Option<f64>> {
    let known: Vec<(NaiveDate, f64)> = observations
        .iter()
        .filter_map(|(d, v)| v.map(|x| (*d, x)))
        .collect();

    calendar
        .iter()
        .map(|&date| match method {
            ToHigherFrequencyMethod::LinearInterpolation => interpolate_at(&known, date),
            ToHigherFrequencyMethod::Same => {
                let idx = known.partition_point(|(d, _)| *d <= date);
                let (start, value) = *known.get(idx.checked_sub(1)?)?;
                (date < period_end(start, frequency)).then_some(value)
            }
        })
        .collect()
}

/// Value at `date` on the straight line between the surrounding points; `None` outside them.
fn interpolate_at(known: &[(NaiveDate, f64)], date: NaiveDate) -> Option<f64> {
    let idx = known.partition_point(|(d, _)| *d < date);
    let (d1, v1) = *known.get(idx)?;
    if d1 == date {
        return Some(v1);
    }
    let (d0, v0) = *known.get(idx.checked_sub(1)?)?;
    let span = (d1 - d0).num_days() as f64;
    let offset = (date - d0).num_days() as f64;
    Some(v0 + (v1 - v0) * offset / span)
}

/// First day after the period that starts at `start`.
fn period_end(start: NaiveDate, frequency: SeriesFrequency) -> NaiveDate {
    let next = match frequency {
        SeriesFrequency::Annual => start.checked_add_months(Months::new(12)),
        SeriesFrequency::SemiAnnual => start.checked_add_months(Months::new(6)),
        SeriesFrequency::Quarterly => start.checked_add_months(Months::new(3)),
        SeriesFrequency::Monthly => start.checked_add_months(Months::new(1)),
        SeriesFrequency::Weekly => start.checked_add_days(Days::new(7)),
        SeriesFrequency::Daily => start.checked_add_days(Days::new(1)),
    };
    next.unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn series(name: &str, frequency: SeriesFrequency, points: &[(NaiveDate, Option<f64>)]) -> Series {
        Series {
            metadata: SeriesMetadata {
                name: name.to_string(),
                frequency,
                currency: Some("USD".into()),
                description: None,
            },
            observations: points
                .iter()
                .map(|&(date, value)| Observation { date, value })
                .collect(),
        }
    }

    fn monthly(name: &str, start_month: u32, values: &[Option<f64>]) -> Series {
        let points: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (d(2020, start_month + i as u32), v))
            .collect();
        series(name, SeriesFrequency::Monthly, &points)
    }

    #[test]
    fn available_in_all_keeps_exactly_the_common_dates() {
        let a = monthly("a", 1, &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        let b = monthly("b", 2, &[Some(20.0), None, Some(40.0), Some(50.0)]);
        let request = UnifiedRequest::new(vec![SeriesEntry::new("a"), SeriesEntry::new("b")]);

        let table = unify(&request, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(table.dates(), &[d(2020, 2), d(2020, 4)]);
        assert_eq!(table.values("a").unwrap(), &[Some(2.0), Some(4.0)]);
        assert_eq!(table.values("b").unwrap(), &[Some(20.0), Some(40.0)]);

        for date in table.dates() {
            for s in [&a, &b] {
                assert!(s.observations.iter().any(|o| o.date == *date && o.value.is_some()));
            }
        }
        assert!(table.len() <= a.len().min(b.len()));
    }

    #[test]
    fn available_in_any_keeps_partial_rows() {
        let a = monthly("a", 1, &[Some(1.0), Some(2.0)]);
        let b = monthly("b", 2, &[Some(20.0), Some(30.0)]);
        let mut request = UnifiedRequest::new(vec![SeriesEntry::new("a"), SeriesEntry::new("b")]);
        request.calendar_merge_mode = CalendarMergeMode::AvailableInAny;
        request.start_point = StartOrEndPoint::DataInAnySeries;
        request.end_point = StartOrEndPoint::DataInAnySeries;

        let table = unify(&request, &[a, b]).unwrap();
        assert_eq!(table.dates(), &[d(2020, 1), d(2020, 2), d(2020, 3)]);
        assert_eq!(table.values("b").unwrap(), &[None, Some(20.0), Some(30.0)]);
    }

    #[test]
    fn lower_frequency_without_method_is_a_mismatch() {
        let gdp = monthly("gdp", 1, &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        let debt = series(
            "debt",
            SeriesFrequency::Quarterly,
            &[(d(2020, 1), Some(10.0)), (d(2020, 4), Some(40.0))],
        );
        let request = UnifiedRequest::new(vec![SeriesEntry::new("debt"), SeriesEntry::new("gdp")]);

        let err = unify(&request, &[debt, gdp]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::FrequencyMismatch);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn linear_interpolation_fills_the_monthly_calendar() {
        let gdp = monthly("gdp", 1, &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
        let debt = series(
            "debt",
            SeriesFrequency::Quarterly,
            &[(d(2020, 1), Some(10.0)), (d(2020, 4), Some(40.0))],
        );
        let request = UnifiedRequest::new(vec![
            SeriesEntry::new("debt").to_higher(ToHigherFrequencyMethod::LinearInterpolation),
            SeriesEntry::new("gdp"),
        ]);

        let table = unify(&request, &[debt, gdp]).unwrap();
        // May lies after the last quarterly point, so the common window ends in April.
        assert_eq!(table.dates(), &[d(2020, 1), d(2020, 2), d(2020, 3), d(2020, 4)]);

        let debt = table.values("debt").unwrap();
        assert_eq!(debt[0], Some(10.0));
        assert_eq!(debt[3], Some(40.0));
        // Jan 1 -> Feb 1 is 31 of the 91 days to Apr 1.
        let feb = debt[1].unwrap();
        assert!((feb - (10.0 + 30.0 * 31.0 / 91.0)).abs() < 1e-9);
    }

    #[test]
    fn same_method_repeats_within_the_period() {
        let gdp = monthly("gdp", 1, &[Some(1.0); 7]);
        let debt = series(
            "debt",
            SeriesFrequency::Quarterly,
            &[(d(2020, 1), Some(10.0)), (d(2020, 4), Some(40.0))],
        );
        let mut request = UnifiedRequest::new(vec![
            SeriesEntry::new("debt").to_higher(ToHigherFrequencyMethod::Same),
            SeriesEntry::new("gdp"),
        ]);
        request.calendar_merge_mode = CalendarMergeMode::AvailableInAny;
        request.end_point = StartOrEndPoint::DataInAnySeries;

        let table = unify(&request, &[debt, gdp]).unwrap();
        let debt = table.values("debt").unwrap();
        assert_eq!(
            debt,
            &[Some(10.0), Some(10.0), Some(10.0), Some(40.0), Some(40.0), Some(40.0), None]
        );
    }

    #[test]
    fn missing_value_methods_fill_gaps() {
        let s = monthly("s", 1, &[Some(1.0), None, Some(3.0), None]);
        let at = |method| -> Vec<Option<f64>> {
            fill_missing(&s, method).into_iter().map(|(_, v)| v).collect()
        };

        assert_eq!(at(MissingValueMethod::None), vec![Some(1.0), None, Some(3.0), None]);
        assert_eq!(at(MissingValueMethod::Zero), vec![Some(1.0), Some(0.0), Some(3.0), Some(0.0)]);
        assert_eq!(
            at(MissingValueMethod::PreviousValue),
            vec![Some(1.0), Some(1.0), Some(3.0), Some(3.0)]
        );

        let interp = at(MissingValueMethod::LinearInterpolation);
        assert!(interp[1].is_some_and(|v| v > 1.0 && v < 3.0));
        assert_eq!(interp[3], None);
    }

    #[test]
    fn currency_mismatch_is_a_retrieval_error() {
        let mut brl = monthly("brl", 1, &[Some(1.0)]);
        brl.metadata.currency = Some("BRL".into());
        let request = UnifiedRequest::new(vec![SeriesEntry::new("brl")]).currency("USD");
        let err = unify(&request, &[brl]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Retrieval);
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let a = monthly("a", 1, &[Some(1.0)]);
        let request = UnifiedRequest::new(vec![SeriesEntry::new("a"), SeriesEntry::new("a")]);
        assert!(unify(&request, &[a.clone(), a]).is_err());
    }
}
