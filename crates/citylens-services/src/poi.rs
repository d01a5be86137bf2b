//! Points-of-interest model: categories, raw provider elements and the
//! records built from them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use citylens_core::AppError;
use citylens_geo::Coordinate;
use serde::{Deserialize, Serialize};

/// Search radius shared by every category
pub const SEARCH_RADIUS_M: u32 = 2000;
/// Maximum elements requested per search
pub const RESULT_LIMIT: u32 = 20;

const UNNAMED: &str = "Unnamed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiCategory {
    Restaurant,
    Park,
    Shop,
    Hotel,
}

impl PoiCategory {
    pub const ALL: [PoiCategory; 4] = [
        PoiCategory::Restaurant,
        PoiCategory::Park,
        PoiCategory::Shop,
        PoiCategory::Hotel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Park => "park",
            Self::Shop => "shop",
            Self::Hotel => "hotel",
        }
    }

    /// Overpass tag filter selecting this category
    pub fn predicate(&self) -> &'static str {
        match self {
            Self::Restaurant => r#"["amenity"="restaurant"]"#,
            Self::Park => r#"["leisure"="park"]"#,
            Self::Shop => r#"["shop"]"#,
            Self::Hotel => r#"["tourism"="hotel"]"#,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Restaurant => "🍽️",
            Self::Park => "🌳",
            Self::Shop => "🛍️",
            Self::Hotel => "🏨",
        }
    }
}

impl fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoiCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| AppError::invalid_input(format!("unknown category '{}'", s.trim())))
    }
}

/// One spatial query, rendered to Overpass QL by [`PoiQuery::to_overpass_ql`]
#[derive(Debug, Clone, PartialEq)]
pub struct PoiQuery {
    pub category: PoiCategory,
    pub center: Coordinate,
    pub radius_m: u32,
    pub limit: u32,
}

impl PoiQuery {
    pub fn new(category: PoiCategory, center: Coordinate) -> Self {
        Self {
            category,
            center,
            radius_m: SEARCH_RADIUS_M,
            limit: RESULT_LIMIT,
        }
    }

    /// Nodes and ways matching the category around the center, with
    /// center points computed for ways.
    pub fn to_overpass_ql(&self) -> String {
        let around = format!(
            "(around:{},{},{})",
            self.radius_m,
            self.center.lat(),
            self.center.lon()
        );
        let predicate = self.category.predicate();
        format!(
            "[out:json][timeout:25];\n(\n    node{predicate}{around};\n    way{predicate}{around};\n);\nout center {};\n",
            self.limit
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ElementCenter {
    pub lat: f64,
    pub lon: f64,
}

/// Element as the Overpass API returns it
#[derive(Debug, Clone, Deserialize)]
pub struct RawElement {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<ElementCenter>,
}

impl RawElement {
    /// Direct position, else the computed center; `None` if neither is a
    /// valid coordinate.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let direct = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon).ok(),
            _ => None,
        };
        direct.or_else(|| {
            self.center
                .and_then(|c| Coordinate::new(c.lat, c.lon).ok())
        })
    }

    /// Build a record, or `None` when the element has no usable position.
    /// `index` is the element's position in the response, used for ids when
    /// the provider sent none.
    pub fn into_record(self, index: usize, category: PoiCategory) -> Option<PoiRecord> {
        let coordinate = self.coordinate()?;
        let id = match (self.kind.as_deref(), self.id) {
            (Some(kind), Some(id)) => format!("{}/{}", kind, id),
            (None, Some(id)) => id.to_string(),
            _ => format!("#{}", index),
        };
        let tags = self.tags.unwrap_or_default();
        let name = tags
            .get("name")
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| UNNAMED.to_string());

        Some(PoiRecord {
            id,
            name,
            coordinate,
            category,
            tags,
        })
    }
}

/// A place found by one search. Lives exactly as long as that search's
/// result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiRecord {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    pub category: PoiCategory,
    pub tags: BTreeMap<String, String>,
}

impl PoiRecord {
    pub fn cuisine(&self) -> Option<&str> {
        self.tags.get("cuisine").map(String::as_str)
    }

    pub fn street(&self) -> Option<&str> {
        self.tags.get("addr:street").map(String::as_str)
    }
}
