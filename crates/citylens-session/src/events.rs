//! Messages a session emits to its host.

use citylens_geo::{CandidateOffer, Coordinate, ResolvedLocation, WeatherSnapshot};
use citylens_services::{PoiCategory, RetryProgress};

/// Sent on the session's event channel as operations progress
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new current location with its weather
    LocationResolved {
        location: ResolvedLocation,
        weather: WeatherSnapshot,
    },
    /// The query matched several places; waiting for a choice
    CandidatesOffered(CandidateOffer),
    NoMatch { query: String },
    SelectionCancelled,
    PoiSearchStarted { category: PoiCategory, token: u64 },
    /// About to retry a failed POI search
    PoiRetry {
        category: PoiCategory,
        progress: RetryProgress,
    },
    PoisLoaded { category: PoiCategory, count: usize },
    /// A POI result arrived for a superseded search and was dropped
    PoiSearchDiscarded { category: PoiCategory, token: u64 },
    PoiFocused { id: String, coordinate: Coordinate },
    /// An operation failed; `message` is fit for display
    Failed {
        message: &'static str,
        detail: String,
    },
}
