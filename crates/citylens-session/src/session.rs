//! The session controller: one user's current location, weather, places and
//! map, driven one action at a time.

use std::sync::Arc;

use citylens_core::{AppError, Config};
use citylens_geo::{
    CandidateOffer, Coordinate, GeoProvider, LocationQuery, LocationResolver, ResolutionOutcome,
    ResolvedLocation, ResolverState, WeatherBinder, WeatherSnapshot,
};
use citylens_services::{PoiCategory, PoiProvider, PoiRecord, PoiSearchEngine};
use tokio::sync::{mpsc, watch};

use crate::events::SessionEvent;
use crate::map::{MapStateManager, MapView};

const MAP_LINK_BASE: &str = "https://www.google.com/maps/@";
/// Zoom used by `map_link` for a focused place
pub const LINK_POI_ZOOM: u8 = 17;
/// Zoom used by `map_link` for the current location
pub const LINK_CITY_ZOOM: u8 = 13;

/// Result of a text search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Resolved(ResolvedLocation),
    AwaitingSelection(CandidateOffer),
    NoMatch,
}

/// Claim on the current POI search slot. Only the ticket with the latest
/// token may change markers.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiSearchTicket {
    pub token: u64,
    pub category: PoiCategory,
    pub center: Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiSearchApplied {
    Applied { category: PoiCategory, count: usize },
    /// A newer search or location superseded this one
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FocusedPoi {
    pub id: String,
    pub coordinate: Coordinate,
}

pub struct SessionController {
    resolver: LocationResolver,
    weather: WeatherBinder,
    engine: PoiSearchEngine,
    map: MapStateManager,
    events: mpsc::UnboundedSender<SessionEvent>,

    location: Option<ResolvedLocation>,
    current_weather: Option<WeatherSnapshot>,
    pois: Vec<PoiRecord>,
    focused: Option<FocusedPoi>,
    active_category: Option<PoiCategory>,
    resolver_state: ResolverState,
    next_offer_id: u64,
    poi_token: u64,
}

impl SessionController {
    /// Build a session and the receiving end of its event channel.
    pub fn new(
        resolver: LocationResolver,
        weather: WeatherBinder,
        engine: PoiSearchEngine,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), AppError> {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            resolver,
            weather,
            engine,
            map: MapStateManager::new()?,
            events,
            location: None,
            current_weather: None,
            pois: Vec::new(),
            focused: None,
            active_category: None,
            resolver_state: ResolverState::default(),
            next_offer_id: 0,
            poi_token: 0,
        };
        Ok((session, rx))
    }

    /// Wire a session from provider implementations and loaded settings.
    pub fn from_config(
        geo: Arc<dyn GeoProvider>,
        places: Arc<dyn PoiProvider>,
        config: &Config,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), AppError> {
        Self::new(
            LocationResolver::new(geo.clone()),
            WeatherBinder::new(geo, config.weather.units),
            PoiSearchEngine::from_config(places, &config.poi),
        )
    }

    pub fn location(&self) -> Option<&ResolvedLocation> {
        self.location.as_ref()
    }

    pub fn weather(&self) -> Option<&WeatherSnapshot> {
        self.current_weather.as_ref()
    }

    pub fn pois(&self) -> &[PoiRecord] {
        &self.pois
    }

    pub fn focused_poi(&self) -> Option<&FocusedPoi> {
        self.focused.as_ref()
    }

    pub fn active_category(&self) -> Option<PoiCategory> {
        self.active_category
    }

    pub fn pending_candidates(&self) -> Option<&CandidateOffer> {
        self.resolver_state.pending()
    }

    pub fn map_view(&self) -> MapView {
        self.map.view()
    }

    pub fn subscribe_map(&self) -> watch::Receiver<MapView> {
        self.map.subscribe()
    }

    /// The engine this session searches with, for hosts running the
    /// two-phase POI protocol themselves.
    pub fn poi_engine(&self) -> &PoiSearchEngine {
        &self.engine
    }

    /// Resolve a city name.
    ///
    /// A single match becomes the current location. Several matches are
    /// offered for selection without touching the map or weather.
    ///
    /// # Errors
    /// Blank input, provider failures and weather failures. State is left as
    /// it was on every error.
    pub async fn search_text(&mut self, query: &str) -> Result<SearchOutcome, AppError> {
        self.resolver_state.begin_search();
        let outcome = self
            .resolver
            .resolve(LocationQuery::Text(query.to_string()))
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.resolver_state.settle();
                return Err(self.report(e));
            }
        };

        match outcome {
            ResolutionOutcome::SingleMatch(candidate) => {
                self.resolver_state.settle();
                self.apply_location(candidate.into())
                    .await
                    .map(SearchOutcome::Resolved)
            }
            ResolutionOutcome::Unnamed(coordinate) => {
                self.resolver_state.settle();
                self.apply_location(ResolvedLocation::unnamed(coordinate))
                    .await
                    .map(SearchOutcome::Resolved)
            }
            ResolutionOutcome::Ambiguous(candidates) => {
                self.next_offer_id += 1;
                let offer = CandidateOffer {
                    id: self.next_offer_id,
                    candidates,
                };
                self.resolver_state.await_selection(offer.clone());
                self.emit(SessionEvent::CandidatesOffered(offer.clone()));
                Ok(SearchOutcome::AwaitingSelection(offer))
            }
            ResolutionOutcome::NoMatch => {
                self.resolver_state.settle();
                self.emit(SessionEvent::NoMatch {
                    query: query.trim().to_string(),
                });
                Ok(SearchOutcome::NoMatch)
            }
        }
    }

    /// Pick candidate `index` from the most recent offer.
    ///
    /// # Errors
    /// `InvalidSelection` when nothing is pending or `index` is out of range.
    pub async fn select_candidate(&mut self, index: usize) -> Result<ResolvedLocation, AppError> {
        self.select(None, index).await
    }

    /// Like [`select_candidate`](Self::select_candidate) but also checks that
    /// `offer_id` names the pending offer.
    ///
    /// # Errors
    /// `InvalidSelection` for a stale offer or an out-of-range index.
    pub async fn select_offered(
        &mut self,
        offer_id: u64,
        index: usize,
    ) -> Result<ResolvedLocation, AppError> {
        self.select(Some(offer_id), index).await
    }

    async fn select(
        &mut self,
        offer_id: Option<u64>,
        index: usize,
    ) -> Result<ResolvedLocation, AppError> {
        let candidate = match self.resolver_state.select(offer_id, index) {
            Ok(candidate) => candidate,
            Err(e) => return Err(self.report(e)),
        };
        tracing::info!("Selected candidate {}: {}", index, candidate.label());
        self.apply_location(candidate.into()).await
    }

    /// Drop the pending offer. Returns false when nothing was pending.
    pub fn cancel_selection(&mut self) -> bool {
        if self.resolver_state.pending().is_none() {
            return false;
        }
        self.resolver_state.settle();
        self.emit(SessionEvent::SelectionCancelled);
        true
    }

    /// Use the device position as the current location, named by reverse
    /// geocoding when possible. Weather, the city marker and `map_link` all
    /// use `coordinate`, not the named place's center.
    ///
    /// # Errors
    /// Provider and weather failures; state is left untouched.
    pub async fn use_device_location(
        &mut self,
        coordinate: Coordinate,
    ) -> Result<ResolvedLocation, AppError> {
        self.resolver_state.begin_search();
        let outcome = self
            .resolver
            .resolve(LocationQuery::Device(coordinate))
            .await;
        self.resolver_state.settle();

        // Reverse geocoding only names the place; the device position stays
        // the location.
        let name = match outcome {
            Ok(ResolutionOutcome::SingleMatch(candidate)) => Some(candidate.label()),
            Ok(ResolutionOutcome::Ambiguous(candidates)) => {
                candidates.first().map(|candidate| candidate.label())
            }
            Ok(ResolutionOutcome::Unnamed(_) | ResolutionOutcome::NoMatch) => None,
            Err(e) => return Err(self.report(e)),
        };
        let location = match name {
            Some(display_name) => ResolvedLocation {
                display_name,
                coordinate,
            },
            None => ResolvedLocation::unnamed(coordinate),
        };
        self.apply_location(location).await
    }

    async fn apply_location(
        &mut self,
        location: ResolvedLocation,
    ) -> Result<ResolvedLocation, AppError> {
        let weather = match self.weather.fetch(location.coordinate).await {
            Ok(weather) => weather,
            Err(e) => return Err(self.report(e.into())),
        };

        self.map
            .relocate(location.coordinate, &location.display_name);
        self.pois.clear();
        self.focused = None;
        self.active_category = None;
        self.poi_token += 1;

        tracing::info!(
            "Location set to {} ({}, {})",
            location.display_name,
            weather.display_temperature(),
            weather.description
        );
        self.location = Some(location.clone());
        self.current_weather = Some(weather.clone());
        self.emit(SessionEvent::LocationResolved {
            location: location.clone(),
            weather,
        });
        Ok(location)
    }

    /// Search places of `category` around the current location and show them.
    ///
    /// # Errors
    /// `PreconditionUnmet` without a location (no request is made);
    /// `RetriesExhausted` when every attempt failed. Markers are kept on
    /// failure.
    pub async fn select_category(
        &mut self,
        category: PoiCategory,
    ) -> Result<PoiSearchApplied, AppError> {
        let ticket = self.begin_poi_search(category)?;
        let events = self.events.clone();
        let result = self
            .engine
            .search_with_progress(ticket.center, category, |progress| {
                let _ = events.send(SessionEvent::PoiRetry {
                    category,
                    progress: progress.clone(),
                });
            })
            .await;
        self.complete_poi_search(ticket, result)
    }

    /// First half of a POI search: claim a fresh token, superseding any
    /// search still in flight.
    ///
    /// # Errors
    /// `PreconditionUnmet` when no location is resolved.
    pub fn begin_poi_search(&mut self, category: PoiCategory) -> Result<PoiSearchTicket, AppError> {
        let center = match &self.location {
            Some(location) => location.coordinate,
            None => {
                return Err(self.report(AppError::precondition(format!(
                    "no location to search {} around",
                    category
                ))))
            }
        };

        self.poi_token += 1;
        let ticket = PoiSearchTicket {
            token: self.poi_token,
            category,
            center,
        };
        self.emit(SessionEvent::PoiSearchStarted {
            category,
            token: ticket.token,
        });
        Ok(ticket)
    }

    /// Second half of a POI search. A superseded ticket is discarded,
    /// whatever its result, without touching markers.
    ///
    /// # Errors
    /// The search error for a current ticket; markers stay as they were.
    pub fn complete_poi_search(
        &mut self,
        ticket: PoiSearchTicket,
        result: Result<Vec<PoiRecord>, AppError>,
    ) -> Result<PoiSearchApplied, AppError> {
        if ticket.token != self.poi_token {
            tracing::debug!(
                "Discarding {} results for token {} (current {})",
                ticket.category,
                ticket.token,
                self.poi_token
            );
            self.emit(SessionEvent::PoiSearchDiscarded {
                category: ticket.category,
                token: ticket.token,
            });
            return Ok(PoiSearchApplied::Discarded);
        }

        let records = result.map_err(|e| self.report(e))?;
        let count = records.len();
        self.map.replace_poi_markers(&records);
        self.pois = records;
        self.focused = None;
        self.active_category = Some(ticket.category);

        self.emit(SessionEvent::PoisLoaded {
            category: ticket.category,
            count,
        });
        Ok(PoiSearchApplied::Applied {
            category: ticket.category,
            count,
        })
    }

    /// Focus the place with `id` from the current results.
    ///
    /// # Errors
    /// `InvalidInput` when no current place has that id.
    pub fn focus_poi(&mut self, id: &str) -> Result<Coordinate, AppError> {
        let coordinate = match self.pois.iter().find(|p| p.id == id) {
            Some(record) => record.coordinate,
            None => {
                return Err(self.report(AppError::invalid_input(format!(
                    "no place with id '{}'",
                    id
                ))))
            }
        };
        if let Err(e) = self.map.focus(coordinate) {
            return Err(self.report(e));
        }

        self.focused = Some(FocusedPoi {
            id: id.to_string(),
            coordinate,
        });
        self.emit(SessionEvent::PoiFocused {
            id: id.to_string(),
            coordinate,
        });
        Ok(coordinate)
    }

    /// Link to the focused place, else the current location, in an external
    /// map application.
    ///
    /// # Errors
    /// `PreconditionUnmet` when no location is resolved.
    pub fn map_link(&self) -> Result<String, AppError> {
        let (coordinate, zoom) = match (&self.focused, &self.location) {
            (Some(focused), _) => (focused.coordinate, LINK_POI_ZOOM),
            (None, Some(location)) => (location.coordinate, LINK_CITY_ZOOM),
            (None, None) => return Err(AppError::precondition("no location to link to")),
        };
        Ok(format!(
            "{}{},{},{}z",
            MAP_LINK_BASE,
            coordinate.lat(),
            coordinate.lon(),
            zoom
        ))
    }

    fn emit(&self, event: SessionEvent) {
        // The host may have dropped the receiver; events are best effort.
        let _ = self.events.send(event);
    }

    fn report(&self, error: AppError) -> AppError {
        tracing::warn!("{}", error);
        self.emit(SessionEvent::Failed {
            message: error.user_message(),
            detail: error.to_string(),
        });
        error
    }
}
