//! Series retrieval.
//!
//! - `SeriesProvider`: the seam between the pipeline and a data source
//! - `macrobond`: Macrobond Web API client
//! - `fixture`: offline, in-memory provider
//! - `align`: local calendar unification used by providers without one

pub mod align;
pub mod fixture;
pub mod macrobond;

pub use fixture::FixtureProvider;
pub use macrobond::MacrobondClient;

use tracing::debug;

use crate::domain::{Series, SeriesMetadata, Table, UnifiedRequest};
use crate::error::AppError;

/// A source of macroeconomic series.
///
/// Providers own frequency conversion, currency conversion and calendar
/// merging; callers only describe what they want in a `UnifiedRequest`.
pub trait SeriesProvider {
    fn name(&self) -> &str;

    /// Raw observations for one series, ascending by date.
    fn fetch_series(&self, name: &str) -> Result<Series, AppError>;

    /// Descriptive attributes (notably the native frequency).
    fn fetch_metadata(&self, name: &str) -> Result<SeriesMetadata, AppError>;

    /// Several series aligned on one calendar; columns follow request order
    /// and are named after the requested series.
    fn fetch_unified(&self, request: &UnifiedRequest) -> Result<Table, AppError>;
}

/// Look up every entry's native frequency and reject requests that mix
/// frequencies without a conversion method.
pub fn check_frequencies(
    provider: &dyn SeriesProvider,
    request: &UnifiedRequest,
) -> Result<Vec<SeriesMetadata>, AppError> {
    let metadata = request
        .entries
        .iter()
        .map(|entry| provider.fetch_metadata(&entry.name))
        .collect::<Result<Vec<_>, _>>()?;

    for meta in &metadata {
        debug!(series = %meta.name, frequency = %meta.frequency, "native frequency");
    }

    align::ensure_convertible(&request.entries, &metadata)?;
    Ok(metadata)
}
