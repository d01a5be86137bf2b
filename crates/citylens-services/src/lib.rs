//! Points-of-interest search for CityLens: Overpass client, retry policy
//! and the search engine tying them together.

pub mod engine;
pub mod overpass;
pub mod poi;
pub mod provider;
pub mod retry;

pub use engine::PoiSearchEngine;
pub use overpass::OverpassClient;
pub use poi::{PoiCategory, PoiQuery, PoiRecord, RawElement};
pub use provider::PoiProvider;
pub use retry::{with_retry, RetryPolicy, RetryProgress, RetryStep};
