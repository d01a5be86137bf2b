//! Centralized error types for CityLens.
//!
//! `NoMatch` and ambiguous geocoding answers are outcomes, not errors, and
//! are modelled by the resolver instead of living here.
//!
//! Every variant carries a `user_message()` suitable for display so the
//! session can always surface a failure to the user.

use thiserror::Error;

/// Top-level error for pipeline operations.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A disambiguation index that does not address the current candidate list.
    #[error("Invalid selection {index}: {available} candidate(s) pending")]
    InvalidSelection { index: usize, available: usize },

    #[error("Precondition unmet: {0}")]
    PreconditionUnmet(String),

    #[error("All {attempts} attempts failed; last error: {last}")]
    RetriesExhausted { attempts: u32, last: ProviderError },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn precondition(message: impl Into<String>) -> Self {
        AppError::PreconditionUnmet(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Provider(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::InvalidInput(_) => "Please enter a city name.",
            AppError::InvalidSelection { .. } => {
                "That choice is no longer available. Please search again."
            }
            AppError::PreconditionUnmet(_) => "Please search for a city first.",
            AppError::RetriesExhausted { .. } => "Failed to load places. Please try again.",
            AppError::Io(_) => "Could not read or write the configuration file.",
        }
    }
}

/// Failures raised by an external data provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure or a non-success HTTP status.
    #[error("Provider unavailable: {message}")]
    Unavailable { status: Option<u16>, message: String },

    /// The payload did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ProviderError::Malformed(message.into())
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ProviderError::Unavailable {
                status: Some(status),
                ..
            } if *status >= 500 => "The service is experiencing issues. Please try again later.",
            ProviderError::Unavailable { status: Some(_), .. } => {
                "The request failed. Please try again."
            }
            ProviderError::Unavailable { status: None, .. } => {
                "Unable to connect. Check your internet connection."
            }
            ProviderError::Malformed(_) => "Received an unexpected response. Please try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "No configuration directory is available on this system.",
            ConfigError::Invalid(_) => "Invalid configuration. Check config.toml.",
            ConfigError::ParseError(_) => "The configuration file is malformed. Check config.toml.",
            ConfigError::MissingSetting(_) => {
                "No API key configured. Set OPENWEATHERMAP_API_KEY or use proxy mode."
            }
        }
    }
}

/// Extension trait for converting reqwest errors to provider errors.
pub trait ReqwestErrorExt {
    fn into_provider_error(self) -> ProviderError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_provider_error(self) -> ProviderError {
        if self.is_decode() {
            ProviderError::Malformed(self.to_string())
        } else if let Some(status) = self.status() {
            ProviderError::status(status.as_u16(), self.to_string())
        } else if self.is_timeout() {
            ProviderError::unavailable(format!("request timed out: {}", self))
        } else {
            ProviderError::unavailable(self.to_string())
        }
    }
}
