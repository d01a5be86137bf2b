//! CityLens session layer
//!
//! Ties resolution, weather and place search to one user's state and map.

pub mod events;
pub mod map;
pub mod session;

pub use events::SessionEvent;
pub use map::{MapMarkerSet, MapStateManager, MapView, Marker, MarkerKind};
pub use session::{
    FocusedPoi, PoiSearchApplied, PoiSearchTicket, SearchOutcome, SessionController,
};
