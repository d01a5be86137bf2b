//! OpenWeatherMap client: geocoding and current weather.
//!
//! Talks either to the public API (appending `appid`) or to a key-injecting
//! proxy that exposes the same data under `/api/...`.

use async_trait::async_trait;
use citylens_core::{ProviderConfig, ProviderError, ProviderMode, ReqwestErrorExt, UnitSystem};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::provider::GeoProvider;
use crate::types::{Coordinate, GeoEntry, LocationCandidate, WeatherReport};

const USER_AGENT: &str = "CityLens/0.1.0";

/// Which route serves which call
#[derive(Debug, Clone, Copy)]
struct Routes {
    direct: &'static str,
    reverse: &'static str,
    weather: &'static str,
}

const DIRECT_ROUTES: Routes = Routes {
    direct: "geo/1.0/direct",
    reverse: "geo/1.0/reverse",
    weather: "data/2.5/weather",
};

const PROXY_ROUTES: Routes = Routes {
    direct: "api/geo/direct",
    reverse: "api/geo/reverse",
    weather: "api/weather",
};

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Arc<Client>,
    base_url: String,
    api_key: Option<String>,
    routes: Routes,
}

impl OpenWeatherClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| e.into_provider_error())?;

        let (routes, api_key) = match config.mode {
            ProviderMode::Direct => (DIRECT_ROUTES, config.api_key.clone()),
            ProviderMode::Proxy => (PROXY_ROUTES, None),
        };

        Ok(Self {
            client: Arc::new(client),
            base_url: config.openweather_url.trim_end_matches('/').to_string(),
            api_key,
            routes,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        route: &str,
        mut query: Vec<(&str, String)>,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, route);
        tracing::debug!("GET {} {:?}", url, query);

        if let Some(key) = &self.api_key {
            query.push(("appid", key.clone()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| e.into_provider_error())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("{} returned status {}: {}", route, status, body);
            return Err(ProviderError::status(
                status.as_u16(),
                format!("{} returned {}", route, status),
            ));
        }

        let body = response.text().await.map_err(|e| e.into_provider_error())?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::malformed(format!("{}: {}", route, e)))
    }

    fn into_candidates(entries: Vec<GeoEntry>) -> Result<Vec<LocationCandidate>, ProviderError> {
        entries.into_iter().map(LocationCandidate::try_from).collect()
    }
}

#[async_trait]
impl GeoProvider for OpenWeatherClient {
    async fn geocode_forward(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LocationCandidate>, ProviderError> {
        let entries: Vec<GeoEntry> = self
            .get_json(
                self.routes.direct,
                vec![("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        tracing::info!("Geocoded '{}' to {} candidate(s)", query, entries.len());
        Self::into_candidates(entries)
    }

    async fn geocode_reverse(
        &self,
        coordinate: Coordinate,
        limit: usize,
    ) -> Result<Vec<LocationCandidate>, ProviderError> {
        let entries: Vec<GeoEntry> = self
            .get_json(
                self.routes.reverse,
                vec![
                    ("lat", coordinate.lat().to_string()),
                    ("lon", coordinate.lon().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Self::into_candidates(entries)
    }

    async fn weather(
        &self,
        coordinate: Coordinate,
        units: UnitSystem,
    ) -> Result<WeatherReport, ProviderError> {
        let query = vec![
            ("lat", coordinate.lat().to_string()),
            ("lon", coordinate.lon().to_string()),
            ("units", units.as_param().to_string()),
        ];

        self.get_json(self.routes.weather, query).await
    }
}
