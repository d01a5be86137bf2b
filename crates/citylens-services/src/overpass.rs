//! Overpass API client.

use async_trait::async_trait;
use citylens_core::{ProviderConfig, ProviderError, ReqwestErrorExt};
use reqwest::{header, Client};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::poi::{PoiQuery, RawElement};
use crate::provider::PoiProvider;

const INTERPRETER_PATH: &str = "api/interpreter";
const USER_AGENT: &str = "CityLens/0.1.0";

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<RawElement>,
}

#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Arc<Client>,
    endpoint: String,
}

impl OverpassClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| e.into_provider_error())?;

        Ok(Self {
            client: Arc::new(client),
            endpoint: format!(
                "{}/{}",
                config.overpass_url.trim_end_matches('/'),
                INTERPRETER_PATH
            ),
        })
    }
}

#[async_trait]
impl PoiProvider for OverpassClient {
    async fn query(&self, query: &PoiQuery) -> Result<Vec<RawElement>, ProviderError> {
        let body = query.to_overpass_ql();
        tracing::debug!("POST {}\n{}", self.endpoint, body);

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| e.into_provider_error())?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::status(
                status.as_u16(),
                format!("Overpass returned {}", status),
            ));
        }

        let text = response.text().await.map_err(|e| e.into_provider_error())?;
        let parsed: OverpassResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::malformed(format!("Overpass payload: {}", e)))?;

        Ok(parsed.elements)
    }
}
