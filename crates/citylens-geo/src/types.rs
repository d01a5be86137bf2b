use chrono::{DateTime, Utc};
use citylens_core::{AppError, ProviderError, UnitSystem};
use serde::{Deserialize, Serialize};

/// Base URL for provider weather icons
const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// A validated WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Result<Self, AppError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::invalid_input(format!(
                "latitude {} is outside [-90, 90]",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::invalid_input(format!(
                "longitude {} is outside [-180, 180]",
                lon
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Same as [`Coordinate::new`] but classifies bad values as a provider
    /// payload problem.
    pub fn from_provider(lat: f64, lon: f64) -> Result<Self, ProviderError> {
        Self::new(lat, lon).map_err(|e| ProviderError::malformed(e.to_string()))
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Raw coordinate label used when no place name is known
    pub fn label(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }

    /// True when both axes differ by less than `tolerance` degrees
    pub fn approx_eq(&self, other: &Coordinate, tolerance: f64) -> bool {
        (self.lat - other.lat).abs() < tolerance && (self.lon - other.lon).abs() < tolerance
    }
}

/// One geocoding answer. Never mutated after the provider returns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCandidate {
    pub name: String,
    pub state: Option<String>,
    pub country: String,
    pub coordinate: Coordinate,
}

impl LocationCandidate {
    /// "name, state, country" with absent or empty parts skipped
    pub fn label(&self) -> String {
        [
            Some(self.name.as_str()),
            self.state.as_deref(),
            Some(self.country.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// The session's single current location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub display_name: String,
    pub coordinate: Coordinate,
}

impl ResolvedLocation {
    /// Location known only by position
    pub fn unnamed(coordinate: Coordinate) -> Self {
        Self {
            display_name: coordinate.label(),
            coordinate,
        }
    }
}

impl From<LocationCandidate> for ResolvedLocation {
    fn from(candidate: LocationCandidate) -> Self {
        Self {
            display_name: candidate.label(),
            coordinate: candidate.coordinate,
        }
    }
}

/// Current conditions bound to one coordinate, stored at full precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub coordinate: Coordinate,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub description: String,
    pub icon_code: String,
    pub units: UnitSystem,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Temperature rounded to a whole degree, e.g. "72°F"
    pub fn display_temperature(&self) -> String {
        format!(
            "{}{}",
            self.temperature.round() as i64,
            self.units.temperature_suffix()
        )
    }

    pub fn display_feels_like(&self) -> String {
        format!(
            "{}{}",
            self.feels_like.round() as i64,
            self.units.temperature_suffix()
        )
    }

    pub fn display_wind(&self) -> String {
        format!("{} {}", self.wind_speed, self.units.speed_suffix())
    }

    pub fn icon_url(&self) -> String {
        format!("{}/{}@2x.png", ICON_BASE_URL, self.icon_code)
    }
}

/// Geocoding entry as returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct GeoEntry {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl TryFrom<GeoEntry> for LocationCandidate {
    type Error = ProviderError;

    fn try_from(entry: GeoEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            coordinate: Coordinate::from_provider(entry.lat, entry.lon)?,
            name: entry.name,
            state: entry.state,
            country: entry.country,
        })
    }
}

/// Current-weather payload as returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherReport {
    pub coord: ReportCoord,
    pub main: ReportMain,
    pub wind: ReportWind,
    #[serde(default)]
    pub weather: Vec<ReportCondition>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sys: Option<ReportSys>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportWind {
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportCondition {
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSys {
    #[serde(default)]
    pub country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, state: Option<&str>, country: &str) -> LocationCandidate {
        LocationCandidate {
            name: name.to_string(),
            state: state.map(str::to_string),
            country: country.to_string(),
            coordinate: Coordinate::new(48.8566, 2.3522).unwrap(),
        }
    }

    #[test]
    fn test_coordinate_range_checks() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_provider_coordinate_is_malformed() {
        let err = Coordinate::from_provider(123.0, 0.0).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn test_coordinate_label() {
        let coord = Coordinate::new(40.712776, -74.005974).unwrap();
        assert_eq!(coord.label(), "40.7128, -74.0060");
    }

    #[test]
    fn test_candidate_label_with_state() {
        assert_eq!(
            candidate("Paris", Some("Texas"), "US").label(),
            "Paris, Texas, US"
        );
    }

    #[test]
    fn test_candidate_label_skips_missing_parts() {
        assert_eq!(candidate("Paris", None, "FR").label(), "Paris, FR");
        assert_eq!(candidate("Paris", Some(""), "FR").label(), "Paris, FR");
    }

    #[test]
    fn test_resolved_from_candidate() {
        let resolved = ResolvedLocation::from(candidate("Paris", None, "FR"));
        assert_eq!(resolved.display_name, "Paris, FR");
        assert_eq!(resolved.coordinate.lat(), 48.8566);
    }

    #[test]
    fn test_geo_entry_without_state() {
        let json = r#"{"name":"Springfield","country":"US","lat":39.8,"lon":-89.64}"#;
        let entry: GeoEntry = serde_json::from_str(json).unwrap();
        let candidate = LocationCandidate::try_from(entry).unwrap();
        assert_eq!(candidate.state, None);
        assert_eq!(candidate.label(), "Springfield, US");
    }

    #[test]
    fn test_snapshot_rounds_only_for_display() {
        let snapshot = WeatherSnapshot {
            coordinate: Coordinate::new(0.0, 0.0).unwrap(),
            temperature: 71.6,
            feels_like: 69.4,
            humidity: 40,
            wind_speed: 5.75,
            description: "clear sky".to_string(),
            icon_code: "01d".to_string(),
            units: UnitSystem::Imperial,
            fetched_at: Utc::now(),
        };
        assert_eq!(snapshot.temperature, 71.6);
        assert_eq!(snapshot.display_temperature(), "72°F");
        assert_eq!(snapshot.display_feels_like(), "69°F");
        assert_eq!(snapshot.display_wind(), "5.75 mph");
        assert_eq!(
            snapshot.icon_url(),
            "https://openweathermap.org/img/wn/01d@2x.png"
        );
    }
}
