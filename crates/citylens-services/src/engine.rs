//! POI search with bounded retry.

use citylens_core::{AppError, PoiConfig};
use citylens_geo::Coordinate;
use std::sync::Arc;

use crate::poi::{PoiCategory, PoiQuery, PoiRecord, RESULT_LIMIT, SEARCH_RADIUS_M};
use crate::provider::PoiProvider;
use crate::retry::{with_retry, RetryPolicy, RetryProgress};

/// Stateless search engine; every call is an independent search.
#[derive(Clone)]
pub struct PoiSearchEngine {
    provider: Arc<dyn PoiProvider>,
    policy: RetryPolicy,
    radius_m: u32,
    limit: u32,
}

impl PoiSearchEngine {
    pub fn new(provider: Arc<dyn PoiProvider>) -> Self {
        Self {
            provider,
            policy: RetryPolicy::default(),
            radius_m: SEARCH_RADIUS_M,
            limit: RESULT_LIMIT,
        }
    }

    pub fn from_config(provider: Arc<dyn PoiProvider>, config: &PoiConfig) -> Self {
        Self {
            provider,
            policy: RetryPolicy::from_config(config),
            radius_m: config.radius_m,
            limit: config.result_limit,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn search(
        &self,
        center: Coordinate,
        category: PoiCategory,
    ) -> Result<Vec<PoiRecord>, AppError> {
        self.search_with_progress(center, category, |_| {}).await
    }

    /// Search, calling `on_retry` before each retry attempt.
    ///
    /// Records keep provider order. Elements without a usable position are
    /// dropped; an empty answer is a success and is not retried.
    pub async fn search_with_progress<P>(
        &self,
        center: Coordinate,
        category: PoiCategory,
        on_retry: P,
    ) -> Result<Vec<PoiRecord>, AppError>
    where
        P: FnMut(&RetryProgress),
    {
        let query = PoiQuery {
            category,
            center,
            radius_m: self.radius_m,
            limit: self.limit,
        };
        tracing::info!(
            "Searching {} within {}m of {}",
            category,
            query.radius_m,
            center.label()
        );

        let provider = &self.provider;
        let request = &query;
        let elements = with_retry(
            &self.policy,
            move |attempt| {
                tracing::debug!("POI query attempt {}", attempt);
                provider.query(request)
            },
            on_retry,
        )
        .await?;

        let total = elements.len();
        let records: Vec<PoiRecord> = elements
            .into_iter()
            .enumerate()
            .filter_map(|(index, element)| element.into_record(index, category))
            .collect();

        if records.len() < total {
            tracing::debug!(
                "Dropped {} element(s) without coordinates",
                total - records.len()
            );
        }
        tracing::info!("Found {} {}(s)", records.len(), category);
        Ok(records)
    }
}
