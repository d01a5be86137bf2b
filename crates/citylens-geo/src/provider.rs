//! Seam to the geocoding and weather data source.

use async_trait::async_trait;
use citylens_core::{ProviderError, UnitSystem};

use crate::types::{Coordinate, LocationCandidate, WeatherReport};

/// Forward/reverse geocoding and current weather, as one external service.
///
/// Implementations perform exactly one request per call; retry policy is
/// the caller's business.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Text query to at most `limit` candidates, in provider order.
    async fn geocode_forward(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LocationCandidate>, ProviderError>;

    /// Coordinate to at most `limit` named places.
    async fn geocode_reverse(
        &self,
        coordinate: Coordinate,
        limit: usize,
    ) -> Result<Vec<LocationCandidate>, ProviderError>;

    /// Current conditions at `coordinate`, reported in `units`.
    async fn weather(
        &self,
        coordinate: Coordinate,
        units: UnitSystem,
    ) -> Result<WeatherReport, ProviderError>;
}
