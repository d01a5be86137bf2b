use crate::error::{AppError, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable holding the OpenWeatherMap API key.
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// External data providers
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Points-of-interest search settings
    #[serde(default)]
    pub poi: PoiConfig,
}

/// How the geocoding/weather endpoints are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Talk to OpenWeatherMap directly, appending the API key.
    #[default]
    Direct,
    /// Talk to a key-injecting proxy exposing `/api/...` pass-through routes.
    Proxy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub mode: ProviderMode,

    /// Base URL for geocoding and weather
    #[serde(default = "default_openweather_url")]
    pub openweather_url: String,

    /// OpenWeatherMap API key (falls back to `OPENWEATHERMAP_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the Overpass API
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_openweather_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_overpass_url() -> String {
    "https://overpass-api.de".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Direct,
            openweather_url: default_openweather_url(),
            api_key: None,
            overpass_url: default_overpass_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Unit system weather readings are requested and displayed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    /// Value of the provider's `units` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Imperial => "imperial",
            Self::Metric => "metric",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Self::Imperial => "°F",
            Self::Metric => "°C",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Self::Imperial => "mph",
            Self::Metric => "m/s",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub units: UnitSystem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiConfig {
    /// Total attempts per search, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_radius_m")]
    pub radius_m: u32,
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_radius_m() -> u32 {
    2000
}

fn default_result_limit() -> u32 {
    20
}

impl Default for PoiConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            radius_m: default_radius_m(),
            result_limit: default_result_limit(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("citylens");

        Self {
            config_dir,
            providers: ProviderConfig::default(),
            weather: WeatherConfig::default(),
            poi: PoiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if it doesn't exist, then apply environment overrides.
    pub fn load() -> Result<Self, AppError> {
        let config = Self::load_from(&Self::config_path()?)?;
        Ok(config.with_env_overrides())
    }

    /// Load configuration from an explicit path, creating a default file if
    /// it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::info!("Writing default config to {}", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult), AppError> {
        Ok(Self::load()?.into_validated()?)
    }

    /// Validate, turning blocking errors into a `ConfigError` and logging
    /// warnings.
    pub fn into_validated(self) -> Result<(Self, ValidationResult), ConfigError> {
        let validation = self.validate();

        if !validation.is_valid() {
            let missing_key = validation
                .errors
                .iter()
                .any(|e| e.field == "providers.api_key");
            if missing_key && validation.errors.len() == 1 {
                return Err(ConfigError::MissingSetting(API_KEY_ENV.to_string()));
            }
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Apply `OPENWEATHERMAP_API_KEY` on top of the file settings
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        self
    }

    fn apply_api_key_override(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            self.providers.api_key = Some(key);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.providers.openweather_url,
            "providers.openweather_url",
            &mut result,
        );
        self.validate_url(
            &self.providers.overpass_url,
            "providers.overpass_url",
            &mut result,
        );

        let has_key = self
            .providers
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        match self.providers.mode {
            ProviderMode::Direct if !has_key => {
                result.add_error(
                    "providers.api_key",
                    format!("API key is required in direct mode; set {}", API_KEY_ENV),
                );
            }
            ProviderMode::Proxy if has_key => {
                result.add_warning(
                    "providers.api_key",
                    "API key is ignored in proxy mode; the proxy injects it",
                );
            }
            _ => {}
        }

        if self.providers.mode == ProviderMode::Proxy && self.weather.units != UnitSystem::Imperial {
            result.add_warning(
                "weather.units",
                "The proxy requests imperial units regardless of this setting",
            );
        }

        if self.providers.timeout_seconds == 0 {
            result.add_error("providers.timeout_seconds", "Timeout must be greater than 0");
        }

        if self.poi.max_attempts == 0 {
            result.add_error("poi.max_attempts", "At least one attempt is required");
        } else if self.poi.max_attempts > 10 {
            result.add_warning("poi.max_attempts", "More than 10 attempts per search");
        }

        if self.poi.radius_m == 0 {
            result.add_error("poi.radius_m", "Search radius must be greater than 0");
        }

        if self.poi.result_limit == 0 {
            result.add_error("poi.result_limit", "Result limit must be greater than 0");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the given path
    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("user configuration directory".to_string()))?
            .join("citylens");

        Ok(config_dir.join("config.toml"))
    }
}
