//! Geocoding and weather for CityLens
//!
//! Resolves city names and device positions to coordinates through an
//! OpenWeatherMap-compatible provider and binds coordinates to current
//! weather.

pub mod client;
pub mod location;
pub mod provider;
pub mod types;
pub mod weather;

pub use client::OpenWeatherClient;
pub use location::{
    CandidateOffer, LocationQuery, LocationResolver, ResolutionOutcome, ResolverState,
};
pub use provider::GeoProvider;
pub use types::*;
pub use weather::WeatherBinder;
