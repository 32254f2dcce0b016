use std::collections::BTreeMap;
use std::fmt;

use foundation::GeoPoint;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{GeometryProblem, InvalidGeometryError};

/// Opaque listing identity.
///
/// Upstream feeds use both integer and string ids; both decode to the same
/// string form so lookups never depend on the wire type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawListingId", into = "String")]
pub struct ListingId(String);

impl ListingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ListingId> for String {
    fn from(id: ListingId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawListingId {
    Int(i64),
    Text(String),
}

impl From<RawListingId> for ListingId {
    fn from(raw: RawListingId) -> Self {
        match raw {
            RawListingId::Int(n) => ListingId(n.to_string()),
            RawListingId::Text(s) => ListingId(s),
        }
    }
}

/// Room count as published. Not every unit has a number ("studio").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawRooms")]
pub enum Rooms {
    Count(u32),
    Label(String),
}

impl Rooms {
    /// Numeric strings become `Count`, anything else is kept verbatim.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u32>() {
            Ok(n) => Rooms::Count(n),
            Err(_) => Rooms::Label(trimmed.to_string()),
        }
    }

    pub fn count(&self) -> Option<u32> {
        match self {
            Rooms::Count(n) => Some(*n),
            Rooms::Label(_) => None,
        }
    }
}

impl fmt::Display for Rooms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rooms::Count(n) => write!(f, "{n}"),
            Rooms::Label(s) => f.write_str(s),
        }
    }
}

impl Serialize for Rooms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rooms::Count(n) => serializer.serialize_u32(*n),
            Rooms::Label(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRooms {
    Int(u32),
    Text(String),
}

impl From<RawRooms> for Rooms {
    fn from(raw: RawRooms) -> Self {
        match raw {
            RawRooms::Int(n) => Rooms::Count(n),
            RawRooms::Text(s) => Rooms::parse(&s),
        }
    }
}

/// A single priced, geo-located unit.
///
/// Coordinates are kept exactly as received; [`Listing::position`] is the
/// only way to get a point for spatial use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    pub price: u64,
    #[serde(default)]
    pub area_sqm: f64,
    #[serde(default)]
    pub rooms: Option<Rooms>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub complex_id: Option<String>,
    #[serde(default)]
    pub complex_name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub features: BTreeMap<String, serde_json::Value>,
}

impl Listing {
    pub fn new(id: impl Into<String>, price: u64, area_sqm: f64) -> Self {
        Self {
            id: ListingId::new(id),
            title: String::new(),
            address: String::new(),
            price,
            area_sqm,
            rooms: None,
            latitude: None,
            longitude: None,
            district: None,
            complex_id: None,
            complex_name: None,
            source: None,
            features: BTreeMap::new(),
        }
    }

    pub fn with_position(mut self, lat: f64, lng: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lng);
        self
    }

    pub fn with_rooms(mut self, rooms: Rooms) -> Self {
        self.rooms = Some(rooms);
        self
    }

    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    pub fn with_complex(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.complex_id = Some(id.into());
        self.complex_name = Some(name.into());
        self
    }

    /// Validated map position.
    pub fn position(&self) -> Result<GeoPoint, InvalidGeometryError> {
        let err = |problem| InvalidGeometryError {
            id: self.id.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            problem,
        };
        let (Some(lat), Some(lng)) = (self.latitude, self.longitude) else {
            return Err(err(GeometryProblem::MissingCoordinate));
        };
        if !lat.is_finite() || !lng.is_finite() {
            return Err(err(GeometryProblem::NonFinite));
        }
        GeoPoint::checked(lat, lng).ok_or_else(|| err(GeometryProblem::OutOfRange))
    }

    pub fn price_per_sqm(&self) -> Option<f64> {
        (self.area_sqm > 0.0).then(|| self.price as f64 / self.area_sqm)
    }
}
