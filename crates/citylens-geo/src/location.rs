//! Location resolution: text or device position to candidates, plus the
//! disambiguation state a session holds while waiting for the user.

use citylens_core::AppError;
use std::sync::Arc;

use crate::provider::GeoProvider;
use crate::types::{Coordinate, LocationCandidate};

/// Result limit for forward geocoding
pub const FORWARD_LIMIT: usize = 5;
/// Result limit for reverse geocoding
pub const REVERSE_LIMIT: usize = 1;

/// What the user asked to resolve
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Text(String),
    Device(Coordinate),
}

/// Answer to a resolve call. `NoMatch` is a valid empty answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    NoMatch,
    SingleMatch(LocationCandidate),
    Ambiguous(Vec<LocationCandidate>),
    /// Device position with no known place name
    Unnamed(Coordinate),
}

/// Stateless resolver; each call is one provider request.
#[derive(Clone)]
pub struct LocationResolver {
    provider: Arc<dyn GeoProvider>,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn GeoProvider>) -> Self {
        Self { provider }
    }

    /// Resolve a query. Provider failures come back as `Err`, never as
    /// `NoMatch`.
    pub async fn resolve(&self, query: LocationQuery) -> Result<ResolutionOutcome, AppError> {
        match query {
            LocationQuery::Text(text) => self.resolve_text(&text).await,
            LocationQuery::Device(coordinate) => self.resolve_device(coordinate).await,
        }
    }

    async fn resolve_text(&self, text: &str) -> Result<ResolutionOutcome, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::invalid_input("city name is empty"));
        }

        tracing::debug!("Geocoding '{}'", text);
        let mut candidates = self.provider.geocode_forward(text, FORWARD_LIMIT).await?;
        candidates.truncate(FORWARD_LIMIT);

        let outcome = match candidates.len() {
            0 => {
                tracing::info!("No match for '{}'", text);
                ResolutionOutcome::NoMatch
            }
            1 => ResolutionOutcome::SingleMatch(candidates.remove(0)),
            n => {
                tracing::info!("'{}' is ambiguous ({} candidates)", text, n);
                ResolutionOutcome::Ambiguous(candidates)
            }
        };
        Ok(outcome)
    }

    async fn resolve_device(&self, coordinate: Coordinate) -> Result<ResolutionOutcome, AppError> {
        tracing::debug!("Reverse geocoding {}", coordinate.label());
        let candidates = self
            .provider
            .geocode_reverse(coordinate, REVERSE_LIMIT)
            .await?;

        match candidates.into_iter().next() {
            Some(candidate) => Ok(ResolutionOutcome::SingleMatch(candidate)),
            None => {
                tracing::warn!(
                    "No place name for {}, using coordinates as label",
                    coordinate.label()
                );
                Ok(ResolutionOutcome::Unnamed(coordinate))
            }
        }
    }
}

/// A candidate list offered to the user. Each offer has an id so a choice
/// made against an older list can be told apart from one against the
/// current list.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOffer {
    pub id: u64,
    pub candidates: Vec<LocationCandidate>,
}

/// Disambiguation state machine.
///
/// `Idle -> Searching -> {Idle, AwaitingSelection}`; a new search from any
/// state drops a pending offer, and a selection consumes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResolverState {
    #[default]
    Idle,
    Searching,
    AwaitingSelection(CandidateOffer),
}

impl ResolverState {
    /// Enter `Searching`, invalidating any pending offer.
    pub fn begin_search(&mut self) {
        if let ResolverState::AwaitingSelection(offer) = self {
            tracing::debug!("Dropping pending offer {}", offer.id);
        }
        *self = ResolverState::Searching;
    }

    /// Park an ambiguous answer and wait for a choice.
    pub fn await_selection(&mut self, offer: CandidateOffer) {
        *self = ResolverState::AwaitingSelection(offer);
    }

    /// Return to `Idle` (terminal outcome or cancelled selection).
    pub fn settle(&mut self) {
        *self = ResolverState::Idle;
    }

    pub fn pending(&self) -> Option<&CandidateOffer> {
        match self {
            ResolverState::AwaitingSelection(offer) => Some(offer),
            _ => None,
        }
    }

    /// Take candidate `index` from the pending offer.
    ///
    /// When `offer_id` is given it must match the pending offer. Rejected
    /// selections leave the state untouched.
    pub fn select(
        &mut self,
        offer_id: Option<u64>,
        index: usize,
    ) -> Result<LocationCandidate, AppError> {
        let available = match self.pending() {
            Some(offer) if offer_id.map_or(true, |id| id == offer.id) => offer.candidates.len(),
            _ => return Err(AppError::InvalidSelection { index, available: 0 }),
        };
        if index >= available {
            return Err(AppError::InvalidSelection { index, available });
        }

        match std::mem::take(self) {
            ResolverState::AwaitingSelection(mut offer) => Ok(offer.candidates.swap_remove(index)),
            other => {
                *self = other;
                Err(AppError::InvalidSelection { index, available: 0 })
            }
        }
    }
}
