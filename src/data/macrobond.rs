//! Macrobond Web API integration.
//!
//! Credentials come from the environment (optionally a `.env` file):
//! `MACROBOND_CLIENT_ID`, `MACROBOND_CLIENT_SECRET`, and the optional
//! `MACROBOND_API_URL` / `MACROBOND_AUTH_URL` overrides.

use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::data::SeriesProvider;
use crate::domain::{
    CalendarMergeMode, MissingValueMethod, Observation, Series, SeriesFrequency, SeriesMetadata, StartOrEndPoint,
    Table, ToHigherFrequencyMethod, UnifiedRequest,
};
use crate::error::AppError;

const DEFAULT_API_URL: &str = "https://api.macrobondfinancial.com";
const DEFAULT_AUTH_URL: &str = "https://apiauth.macrobondfinancial.com/mbauth/connect/token";
const SCOPE: &str = "macrobond_web_api.read_mb macrobond_web_api.search_mb";

pub struct MacrobondClient {
    client: Client,
    api_url: String,
    token: String,
}

impl MacrobondClient {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let client_id = std::env::var("MACROBOND_CLIENT_ID")
            .map_err(|_| AppError::usage("Missing MACROBOND_CLIENT_ID in environment (.env)."))?;
        let client_secret = std::env::var("MACROBOND_CLIENT_SECRET")
            .map_err(|_| AppError::usage("Missing MACROBOND_CLIENT_SECRET in environment (.env)."))?;
        let api_url = std::env::var("MACROBOND_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let auth_url = std::env::var("MACROBOND_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string());

        Self::connect(&api_url, &auth_url, &client_id, &client_secret)
    }

    /// Authenticate with the client-credentials flow and keep the bearer token.
    pub fn connect(api_url: &str, auth_url: &str, client_id: &str, client_secret: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("macro-charts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::retrieval(format!("Failed to build HTTP client: {e}")))?;

        let resp = client
            .post(auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("scope", SCOPE),
            ])
            .send()
            .map_err(|e| AppError::retrieval(format!("Macrobond authentication request failed: {e}")))?;

        let token: TokenResponse = decode(check_status(resp)?)?;
        info!(api = api_url, "authenticated with Macrobond");

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.access_token,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, AppError> {
        debug!(path, "GET");
        let resp = self
            .client
            .get(format!("{}/{path}", self.api_url))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .map_err(|e| AppError::retrieval(format!("Macrobond request failed: {e}")))?;
        decode(check_status(resp)?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, AppError> {
        debug!(path, "POST");
        let resp = self
            .client
            .post(format!("{}/{path}", self.api_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(|e| AppError::retrieval(format!("Macrobond request failed: {e}")))?;
        decode(check_status(resp)?)
    }
}

impl SeriesProvider for MacrobondClient {
    fn name(&self) -> &str {
        "macrobond"
    }

    fn fetch_series(&self, name: &str) -> Result<Series, AppError> {
        let body: Vec<WebSeries> = self.get("v1/series/fetch-series", &[("n", name)])?;
        let web = body
            .into_iter()
            .next()
            .ok_or_else(|| AppError::retrieval(format!("No data returned for series '{name}'.")))?;
        series_from_web(name, web)
    }

    fn fetch_metadata(&self, name: &str) -> Result<SeriesMetadata, AppError> {
        let body: Vec<WebEntity> = self.get("v1/entities/fetch-entities", &[("n", name)])?;
        let entity = body
            .into_iter()
            .next()
            .ok_or_else(|| AppError::retrieval(format!("No metadata returned for '{name}'.")))?;
        if let Some(text) = entity.error_text {
            return Err(AppError::retrieval(format!("Entity '{name}': {text}")));
        }
        metadata_from_web(name, &entity.metadata.unwrap_or_default())
    }

    fn fetch_unified(&self, request: &UnifiedRequest) -> Result<Table, AppError> {
        let body = WebUnifiedRequest::from_request(request);
        let resp: WebUnifiedResponse = self.post("v1/series/fetch-unified-series", &body)?;
        table_from_unified(request, resp)
    }
}

fn check_status(resp: Response) -> Result<Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::retrieval(format!("Macrobond authentication failed ({status})."))
        }
        StatusCode::NOT_FOUND => AppError::retrieval("Macrobond resource not found (404)."),
        _ => AppError::retrieval(format!("Macrobond request failed with status {status}.")),
    })
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, AppError> {
    resp.json()
        .map_err(|e| AppError::retrieval(format!("Failed to parse Macrobond response: {e}")))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebSeries {
    #[serde(default)]
    error_text: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
    #[serde(default)]
    values: Vec<Option<f64>>,
    #[serde(default)]
    dates: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebEntity {
    #[serde(default)]
    error_text: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebUnifiedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    calendar_merge_mode: &'static str,
    start_date_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    end_date_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    series_entries: Vec<WebSeriesEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebSeriesEntry {
    name: String,
    missing_value_method: &'static str,
    to_higher_frequency_method: &'static str,
}

impl WebUnifiedRequest {
    fn from_request(request: &UnifiedRequest) -> Self {
        let (start_date_mode, start_date) = point_to_web(request.start_point);
        let (end_date_mode, end_date) = point_to_web(request.end_point);
        Self {
            currency: request.currency.clone(),
            calendar_merge_mode: match request.calendar_merge_mode {
                CalendarMergeMode::AvailableInAll => "AvailableInAll",
                CalendarMergeMode::AvailableInAny => "AvailableInAny",
            },
            start_date_mode,
            start_date,
            end_date_mode,
            end_date,
            series_entries: request
                .entries
                .iter()
                .map(|entry| WebSeriesEntry {
                    name: entry.name.clone(),
                    missing_value_method: match entry.missing_value_method {
                        MissingValueMethod::None => "None",
                        MissingValueMethod::PreviousValue => "PreviousValue",
                        MissingValueMethod::Zero => "Zero",
                        MissingValueMethod::LinearInterpolation => "LinearInterpolation",
                    },
                    to_higher_frequency_method: match entry.to_higher_frequency {
                        None => "Auto",
                        Some(ToHigherFrequencyMethod::LinearInterpolation) => "LinearInterpolation",
                        Some(ToHigherFrequencyMethod::Same) => "Same",
                    },
                })
                .collect(),
        }
    }
}

fn point_to_web(point: StartOrEndPoint) -> (&'static str, Option<String>) {
    match point {
        StartOrEndPoint::DataInAllSeries => ("DataInAllSeries", None),
        StartOrEndPoint::DataInAnySeries => ("DataInAnySeries", None),
        StartOrEndPoint::Date(date) => ("Specific", Some(date.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct WebUnifiedResponse {
    #[serde(default)]
    dates: Vec<String>,
    #[serde(default)]
    series: Vec<WebSeries>,
}

fn series_from_web(name: &str, web: WebSeries) -> Result<Series, AppError> {
    if let Some(text) = web.error_text {
        return Err(AppError::retrieval(format!("Series '{name}': {text}")));
    }
    if web.dates.len() != web.values.len() {
        return Err(AppError::retrieval(format!(
            "Series '{name}' returned {} dates but {} values.",
            web.dates.len(),
            web.values.len()
        )));
    }

    let metadata = metadata_from_web(name, &web.metadata.unwrap_or_default())?;
    let observations = web
        .dates
        .iter()
        .zip(web.values)
        .map(|(raw, value)| {
            Ok(Observation {
                date: parse_date(raw)?,
                value: value.filter(|v| v.is_finite()),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Series { metadata, observations })
}

fn metadata_from_web(name: &str, map: &Map<String, Value>) -> Result<SeriesMetadata, AppError> {
    let frequency = meta_str(map, "Frequency")
        .ok_or_else(|| AppError::retrieval(format!("Series '{name}' has no Frequency attribute.")))?
        .parse::<SeriesFrequency>()?;
    Ok(SeriesMetadata {
        name: meta_str(map, "PrimName").unwrap_or_else(|| name.to_string()),
        frequency,
        currency: meta_str(map, "Currency").map(|c| c.to_ascii_uppercase()),
        description: meta_str(map, "FullDescription"),
    })
}

/// Metadata attributes are either scalars or lists; take the first string.
fn meta_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

fn table_from_unified(request: &UnifiedRequest, resp: WebUnifiedResponse) -> Result<Table, AppError> {
    if resp.series.len() != request.entries.len() {
        return Err(AppError::retrieval(format!(
            "Unified response has {} series, expected {}.",
            resp.series.len(),
            request.entries.len()
        )));
    }

    let dates = resp
        .dates
        .iter()
        .map(|raw| parse_date(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let mut table = Table::new(dates);

    for (entry, web) in request.entries.iter().zip(resp.series) {
        if let Some(text) = web.error_text {
            return Err(AppError::retrieval(format!("Series '{}': {text}", entry.name)));
        }
        let values = web.values.into_iter().map(|v| v.filter(|x| x.is_finite())).collect();
        table
            .push_column(entry.name.clone(), values)
            .map_err(|e| AppError::retrieval(format!("Malformed unified response: {e}")))?;
    }
    Ok(table)
}

/// Accepts `YYYY-MM-DD` optionally followed by a time component.
fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let day = raw.trim().get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| AppError::retrieval(format!("Invalid Macrobond date '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesEntry;
    use crate::error::ErrorKind;

    #[test]
    fn parses_dates_with_and_without_time() {
        let d = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert_eq!(parse_date("2020-03-01T00:00:00").unwrap(), d);
        assert_eq!(parse_date("2020-03-01").unwrap(), d);
        assert!(parse_date("March 2020").is_err());
    }

    #[test]
    fn series_payload_converts_nulls_to_gaps() {
        let json = r#"{
            "metadata": {"PrimName": "brpric1011", "Frequency": "monthly", "Currency": ["brl"]},
            "dates": ["2020-01-01T00:00:00", "2020-02-01T00:00:00", "2020-03-01T00:00:00"],
            "values": [100.0, null, 121.0]
        }"#;
        let web: WebSeries = serde_json::from_str(json).unwrap();
        let series = series_from_web("brpric1011", web).unwrap();

        assert_eq!(series.frequency(), SeriesFrequency::Monthly);
        assert_eq!(series.metadata.currency.as_deref(), Some("BRL"));
        assert_eq!(series.len(), 3);
        assert_eq!(series.observations[1].value, None);
    }

    #[test]
    fn series_error_text_is_a_retrieval_error() {
        let web: WebSeries = serde_json::from_str(r#"{"errorText": "Not found"}"#).unwrap();
        let err = series_from_web("xx", web).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Retrieval);
        assert!(err.to_string().contains("Not found"));
    }

    #[test]
    fn mismatched_dates_and_values_are_rejected() {
        let json = r#"{"metadata": {"Frequency": "monthly"}, "dates": ["2020-01-01"], "values": [1.0, 2.0]}"#;
        let web: WebSeries = serde_json::from_str(json).unwrap();
        assert!(series_from_web("xx", web).is_err());
    }

    #[test]
    fn unified_request_body_uses_web_names() {
        let request = UnifiedRequest::new(vec![
            SeriesEntry::new("brfofi1043").to_higher(ToHigherFrequencyMethod::LinearInterpolation),
            SeriesEntry::new("brnaac1005"),
        ])
        .currency("USD");

        let body = serde_json::to_value(WebUnifiedRequest::from_request(&request)).unwrap();
        assert_eq!(body["currency"], "USD");
        assert_eq!(body["calendarMergeMode"], "AvailableInAll");
        assert_eq!(body["startDateMode"], "DataInAllSeries");
        assert!(body.get("startDate").is_none());
        assert_eq!(body["seriesEntries"][0]["toHigherFrequencyMethod"], "LinearInterpolation");
        assert_eq!(body["seriesEntries"][1]["toHigherFrequencyMethod"], "Auto");
        assert_eq!(body["seriesEntries"][1]["missingValueMethod"], "None");
    }

    #[test]
    fn unified_response_becomes_named_columns() {
        let request = UnifiedRequest::new(vec![SeriesEntry::new("brtrad1153"), SeriesEntry::new("brtrad1015")]);
        let resp: WebUnifiedResponse = serde_json::from_str(
            r#"{
                "dates": ["2020-01-01T00:00:00", "2020-02-01T00:00:00"],
                "series": [
                    {"metadata": {"Frequency": "monthly"}, "values": [1.0, 2.0]},
                    {"metadata": {"Frequency": "monthly"}, "values": [10.0, 20.0]}
                ]
            }"#,
        )
        .unwrap();

        let table = table_from_unified(&request, resp).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns()[1].name, "brtrad1015");
        assert_eq!(table.values("brtrad1153").unwrap(), &[Some(1.0), Some(2.0)]);
    }

    fn response(status: u16) -> Response {
        Response::from(http::Response::builder().status(status).body("").unwrap())
    }

    #[test]
    fn auth_statuses_map_to_authentication_failed() {
        for status in [401, 403] {
            let err = check_status(response(status)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Retrieval);
            assert!(err.to_string().contains("authentication failed"), "{err}");
            assert!(err.to_string().contains(&status.to_string()), "{err}");
        }
    }

    #[test]
    fn other_failures_carry_the_status() {
        let err = check_status(response(404)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Retrieval);
        assert!(err.to_string().contains("404"), "{err}");

        let err = check_status(response(500)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Retrieval);
        assert!(err.to_string().contains("500 Internal Server Error"), "{err}");
    }

    #[test]
    fn success_passes_through() {
        assert!(check_status(response(200)).is_ok());
    }

    #[test]
    fn unified_series_error_aborts() {
        let request = UnifiedRequest::new(vec![SeriesEntry::new("bad")]);
        let resp: WebUnifiedResponse =
            serde_json::from_str(r#"{"dates": [], "series": [{"errorText": "Unknown series"}]}"#).unwrap();
        let err = table_from_unified(&request, resp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Retrieval);
    }
}
