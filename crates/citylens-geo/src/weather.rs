//! Binds a resolved coordinate to a weather snapshot.

use chrono::Utc;
use citylens_core::{ProviderError, UnitSystem};
use std::sync::Arc;

use crate::provider::GeoProvider;
use crate::types::{Coordinate, WeatherReport, WeatherSnapshot};

/// Fetches current conditions. One request per call, never retried.
#[derive(Clone)]
pub struct WeatherBinder {
    provider: Arc<dyn GeoProvider>,
    units: UnitSystem,
}

impl WeatherBinder {
    pub fn new(provider: Arc<dyn GeoProvider>, units: UnitSystem) -> Self {
        Self { provider, units }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, ProviderError> {
        let report = self.provider.weather(coordinate, self.units).await?;
        let snapshot = normalize(report, self.units)?;

        tracing::info!(
            "Weather at {}: {} ({})",
            snapshot.coordinate.label(),
            snapshot.display_temperature(),
            snapshot.description
        );
        Ok(snapshot)
    }
}

fn normalize(report: WeatherReport, units: UnitSystem) -> Result<WeatherSnapshot, ProviderError> {
    let coordinate = Coordinate::from_provider(report.coord.lat, report.coord.lon)?;

    let condition = report
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::malformed("weather report has no conditions"))?;

    if !(0.0..=100.0).contains(&report.main.humidity) {
        return Err(ProviderError::malformed(format!(
            "humidity {} is not a percentage",
            report.main.humidity
        )));
    }

    Ok(WeatherSnapshot {
        coordinate,
        temperature: report.main.temp,
        feels_like: report.main.feels_like,
        humidity: report.main.humidity.round() as u8,
        wind_speed: report.wind.speed,
        description: condition.description,
        icon_code: condition.icon,
        units,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(json: serde_json::Value) -> WeatherReport {
        serde_json::from_value(json).unwrap()
    }

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lat": 48.8534, "lon": 2.3488},
            "main": {"temp": 64.38, "humidity": 72, "feels_like": 63.9},
            "wind": {"speed": 8.05},
            "weather": [{"description": "light rain", "icon": "10d"}],
            "name": "Paris",
            "sys": {"country": "FR"}
        })
    }

    #[test]
    fn test_normalize_keeps_full_precision() {
        let snapshot = normalize(report(sample_json()), UnitSystem::Imperial).unwrap();
        assert_eq!(snapshot.temperature, 64.38);
        assert_eq!(snapshot.feels_like, 63.9);
        assert_eq!(snapshot.humidity, 72);
        assert_eq!(snapshot.description, "light rain");
        assert_eq!(snapshot.icon_code, "10d");
        assert_eq!(snapshot.display_temperature(), "64°F");
    }

    #[test]
    fn test_normalize_uses_report_coordinate() {
        let snapshot = normalize(report(sample_json()), UnitSystem::Metric).unwrap();
        assert_eq!(snapshot.coordinate.lat(), 48.8534);
        assert_eq!(snapshot.units, UnitSystem::Metric);
    }

    #[test]
    fn test_missing_conditions_is_malformed() {
        let mut json = sample_json();
        json["weather"] = serde_json::json!([]);
        let err = normalize(report(json), UnitSystem::Imperial).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn test_out_of_range_humidity_is_malformed() {
        let mut json = sample_json();
        json["main"]["humidity"] = serde_json::json!(140);
        assert!(normalize(report(json), UnitSystem::Imperial).is_err());
    }
}
