use async_trait::async_trait;
use citylens_core::ProviderError;

use crate::poi::{PoiQuery, RawElement};

/// Spatial search over an external place database.
///
/// One request per call. Element order is the provider's and must be kept.
#[async_trait]
pub trait PoiProvider: Send + Sync {
    async fn query(&self, query: &PoiQuery) -> Result<Vec<RawElement>, ProviderError>;
}
