//! Marker state for the map view.
//!
//! The manager owns one [`MapView`] and publishes every mutation as a whole
//! snapshot on a `watch` channel, so an observer never sees a half-replaced
//! marker set.

use citylens_core::AppError;
use citylens_geo::Coordinate;
use citylens_services::{PoiCategory, PoiRecord};
use tokio::sync::watch;

/// Initial center (New York City)
pub const INITIAL_CENTER: (f64, f64) = (40.7128, -74.0060);
pub const INITIAL_ZOOM: u8 = 12;
pub const CITY_ZOOM: u8 = 13;
pub const POI_ZOOM: u8 = 16;

/// Degrees within which a focus target matches a POI marker
const FOCUS_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    City,
    Poi(PoiCategory),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub label: String,
    pub kind: MarkerKind,
}

impl Marker {
    fn for_record(record: &PoiRecord) -> Self {
        Self {
            coordinate: record.coordinate,
            label: record.name.clone(),
            kind: MarkerKind::Poi(record.category),
        }
    }
}

/// At most one city marker plus the markers of the last applied POI search,
/// in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapMarkerSet {
    pub city: Option<Marker>,
    pub pois: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub markers: MapMarkerSet,
    pub center: Coordinate,
    pub zoom: u8,
}

impl MapView {
    fn initial() -> Result<Self, AppError> {
        Ok(Self {
            markers: MapMarkerSet::default(),
            center: Coordinate::new(INITIAL_CENTER.0, INITIAL_CENTER.1)?,
            zoom: INITIAL_ZOOM,
        })
    }
}

pub struct MapStateManager {
    tx: watch::Sender<MapView>,
}

impl MapStateManager {
    pub fn new() -> Result<Self, AppError> {
        let (tx, _rx) = watch::channel(MapView::initial()?);
        Ok(Self { tx })
    }

    /// Receiver that always holds the latest view
    pub fn subscribe(&self) -> watch::Receiver<MapView> {
        self.tx.subscribe()
    }

    pub fn view(&self) -> MapView {
        self.tx.borrow().clone()
    }

    /// Replace the city marker and center on it. POI markers are left alone.
    pub fn set_city_marker(&self, coordinate: Coordinate, label: &str) {
        self.tx.send_modify(|view| {
            view.markers.city = Some(city_marker(coordinate, label));
            view.center = coordinate;
            view.zoom = CITY_ZOOM;
        });
    }

    /// Move to a newly resolved city: new city marker, no POI markers, one
    /// snapshot.
    pub fn relocate(&self, coordinate: Coordinate, label: &str) {
        tracing::debug!("Map relocated to {}", label);
        self.tx.send_modify(|view| {
            view.markers = MapMarkerSet {
                city: Some(city_marker(coordinate, label)),
                pois: Vec::new(),
            };
            view.center = coordinate;
            view.zoom = CITY_ZOOM;
        });
    }

    pub fn replace_poi_markers(&self, records: &[PoiRecord]) {
        let pois: Vec<Marker> = records.iter().map(Marker::for_record).collect();
        tracing::debug!("Showing {} POI marker(s)", pois.len());
        self.tx.send_modify(|view| view.markers.pois = pois);
    }

    pub fn clear_poi_markers(&self) {
        self.replace_poi_markers(&[]);
    }

    /// Center on an existing POI marker at street zoom.
    ///
    /// # Errors
    /// `InvalidInput` when no POI marker sits at `coordinate`.
    pub fn focus(&self, coordinate: Coordinate) -> Result<(), AppError> {
        let known = self
            .tx
            .borrow()
            .markers
            .pois
            .iter()
            .any(|m| m.coordinate.approx_eq(&coordinate, FOCUS_TOLERANCE));
        if !known {
            return Err(AppError::invalid_input(format!(
                "no place marker at {}",
                coordinate.label()
            )));
        }

        self.tx.send_modify(|view| {
            view.center = coordinate;
            view.zoom = POI_ZOOM;
        });
        Ok(())
    }
}

fn city_marker(coordinate: Coordinate, label: &str) -> Marker {
    Marker {
        coordinate,
        label: label.to_string(),
        kind: MarkerKind::City,
    }
}
