//! Listing feed decoding.
//!
//! The upstream API has served several envelopes over time: a GeoJSON-like
//! `FeatureCollection`, a bare array of listings and a `{ "items": [...] }`
//! page. All of them are normalised here, once, into a [`Dataset`].
//! Individual malformed records are dropped with a warning; only an
//! unreadable document is an error.

use std::collections::BTreeMap;

use compute::FeedSummary;
use listings::{Dataset, Listing, ListingId, Rooms};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataFetchError;

pub const FEATURE_COLLECTION_TYPE: &str = "FeatureCollection";
pub const FEATURE_TYPE: &str = "Feature";
pub const POINT_TYPE: &str = "Point";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FeedMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<PointGeometry>,
    /// Kept untyped so one bad record cannot fail the whole collection.
    #[serde(default)]
    pub properties: Value,
}

/// `coordinates` are `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedMetadata {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub avg_price_per_sqm: f64,
}

impl From<FeedSummary> for FeedMetadata {
    fn from(summary: FeedSummary) -> Self {
        Self {
            total: summary.total,
            avg_price: summary.avg_price,
            avg_price_per_sqm: summary.avg_price_per_sqm,
        }
    }
}

fn feature_type() -> String {
    FEATURE_TYPE.to_string()
}

impl FeatureCollection {
    /// Encodes listings back into the feed envelope. Listings without a valid
    /// position are emitted with a null geometry.
    pub fn from_listings(listings: &[Listing], metadata: Option<FeedMetadata>) -> Self {
        let features = listings
            .iter()
            .map(|listing| Feature {
                kind: feature_type(),
                geometry: listing.position().ok().map(|p| PointGeometry {
                    kind: POINT_TYPE.to_string(),
                    coordinates: vec![p.lng, p.lat],
                }),
                properties: listing_properties(listing),
            })
            .collect();
        Self {
            kind: FEATURE_COLLECTION_TYPE.to_string(),
            features,
            metadata,
        }
    }
}

/// Extra attributes travel flat next to the known fields, as the feed
/// publishes them.
fn listing_properties(listing: &Listing) -> Value {
    let mut value = serde_json::to_value(listing).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        if let Some(Value::Object(extra)) = map.remove("features") {
            for (key, v) in extra {
                map.entry(key).or_insert(v);
            }
        }
    }
    value
}

/// A record that could not become a [`Listing`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct NormalizedFeed {
    pub dataset: Dataset,
    pub metadata: Option<FeedMetadata>,
    pub rejected: Vec<RejectedRecord>,
}

/// Wire form of one listing's properties. Tolerates both id types, `lat`/
/// `lng` shorthands and fractional or string prices.
#[derive(Debug, Deserialize)]
struct ListingRecord {
    id: ListingId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    address: Option<String>,
    price: Option<RawNumber>,
    #[serde(default, alias = "area")]
    area_sqm: Option<RawNumber>,
    #[serde(default)]
    rooms: Option<Rooms>,
    #[serde(default, alias = "lat")]
    latitude: Option<f64>,
    #[serde(default, alias = "lng", alias = "lon")]
    longitude: Option<f64>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    complex_id: Option<ListingId>,
    #[serde(default)]
    complex_name: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    fn value(&self) -> Option<f64> {
        match self {
            RawNumber::Number(n) => Some(*n),
            RawNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl ListingRecord {
    fn into_listing(self, position: Option<(f64, f64)>) -> Result<Listing, String> {
        let price = self
            .price
            .as_ref()
            .ok_or_else(|| "missing price".to_string())?
            .value()
            .ok_or_else(|| "price is not a number".to_string())?;
        if !price.is_finite() || price < 0.0 {
            return Err(format!("invalid price {price}"));
        }
        let area_sqm = self
            .area_sqm
            .as_ref()
            .and_then(RawNumber::value)
            .filter(|a| a.is_finite())
            .unwrap_or(0.0);
        let (latitude, longitude) = match position {
            Some((lat, lng)) => (Some(lat), Some(lng)),
            None => (self.latitude, self.longitude),
        };

        Ok(Listing {
            id: self.id,
            title: self.title.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            price: price.round() as u64,
            area_sqm,
            rooms: self.rooms,
            latitude,
            longitude,
            district: self.district.filter(|d| !d.trim().is_empty()),
            complex_id: self.complex_id.map(String::from),
            complex_name: self.complex_name,
            source: self.source,
            features: self.extra,
        })
    }
}

/// Decodes any supported feed envelope.
pub fn decode_listings(payload: &str) -> Result<NormalizedFeed, DataFetchError> {
    let document: Value = serde_json::from_str(payload).map_err(DataFetchError::Parse)?;
    normalize_feed(document)
}

pub fn normalize_feed(document: Value) -> Result<NormalizedFeed, DataFetchError> {
    let (records, metadata) = match document {
        Value::Array(items) => (items, None),
        Value::Object(mut object) => {
            let metadata = object
                .remove("metadata")
                .and_then(|m| serde_json::from_value::<FeedMetadata>(m).ok());
            match (object.remove("features"), object.remove("items")) {
                (Some(Value::Array(features)), _) => (features, metadata),
                (_, Some(Value::Array(items))) => (items, metadata),
                _ => return Err(DataFetchError::UnsupportedShape),
            }
        }
        _ => return Err(DataFetchError::UnsupportedShape),
    };

    let mut listings = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for (index, record) in records.into_iter().enumerate() {
        match decode_record(record) {
            Ok(listing) => listings.push(listing),
            Err((id, reason)) => {
                tracing::warn!(index, id = ?id, %reason, "dropping malformed feed record");
                rejected.push(RejectedRecord { index, id, reason });
            }
        }
    }

    tracing::debug!(
        accepted = listings.len(),
        rejected = rejected.len(),
        "normalized listing feed"
    );
    Ok(NormalizedFeed {
        dataset: Dataset::new(listings),
        metadata,
        rejected,
    })
}

/// A record is a feature when it carries `properties`, otherwise a bare
/// listing object.
fn decode_record(record: Value) -> Result<Listing, (Option<String>, String)> {
    let (properties, position) = match record {
        Value::Object(mut object) if object.contains_key("properties") => {
            let position = object
                .remove("geometry")
                .and_then(|g| serde_json::from_value::<PointGeometry>(g).ok())
                .and_then(|g| match g.coordinates.as_slice() {
                    [lng, lat, ..] => Some((*lat, *lng)),
                    _ => None,
                });
            (object.remove("properties").unwrap_or(Value::Null), position)
        }
        other => (other, None),
    };

    let id = properties.get("id").map(|id| match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let record: ListingRecord =
        serde_json::from_value(properties).map_err(|err| (id.clone(), err.to_string()))?;
    record.into_listing(position).map_err(|reason| (id, reason))
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, FeedMetadata, decode_listings};
    use crate::error::DataFetchError;
    use listings::{Listing, ListingId, Rooms};
    use pretty_assertions::assert_eq;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [39.72, 43.585] },
                "properties": {
                    "id": 17, "title": "Sea view", "price": 12500000,
                    "area": 42.5, "rooms": "2", "district": "Центральный",
                    "complex_id": 3, "complex_name": "Sun", "floor": 7
                }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [39.73, 43.59] },
                "properties": { "id": "x-2", "price": -5 }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": { "id": "x-3", "price": "31000000", "rooms": "studio" }
            }
        ],
        "metadata": { "total": 3, "avg_price": 21750000, "avg_price_per_sqm": 294117 }
    }"#;

    #[test]
    fn decodes_feature_collection() {
        let feed = decode_listings(COLLECTION).unwrap();
        assert_eq!(feed.dataset.len(), 2);
        assert_eq!(feed.rejected.len(), 1);
        assert_eq!(feed.rejected[0].id.as_deref(), Some("x-2"));
        assert_eq!(feed.metadata.map(|m| m.total), Some(3));

        let first = feed.dataset.get(&ListingId::from("17")).unwrap();
        assert_eq!(first.price, 12_500_000);
        assert_eq!(first.area_sqm, 42.5);
        assert_eq!(first.rooms, Some(Rooms::Count(2)));
        assert_eq!(first.latitude, Some(43.585));
        assert_eq!(first.longitude, Some(39.72));
        assert_eq!(first.complex_id.as_deref(), Some("3"));
        assert_eq!(first.features.get("floor"), Some(&serde_json::json!(7)));

        let third = feed.dataset.get(&ListingId::from("x-3")).unwrap();
        assert_eq!(third.price, 31_000_000);
        assert_eq!(third.rooms, Some(Rooms::Label("studio".to_string())));
        assert!(third.position().is_err());
        assert_eq!(feed.dataset.spatial_len(), 1);
    }

    #[test]
    fn accepts_bare_arrays_and_item_pages() {
        let array = r#"[{ "id": 1, "price": 100, "lat": 43.5, "lng": 39.7 }]"#;
        let page = r#"{ "items": [{ "id": 1, "price": 100, "latitude": 43.5, "longitude": 39.7 }] }"#;
        let a = decode_listings(array).unwrap();
        let b = decode_listings(page).unwrap();
        assert_eq!(a.dataset.listings(), b.dataset.listings());
        assert_eq!(a.dataset.spatial_len(), 1);
        assert!(b.metadata.is_none());
    }

    #[test]
    fn out_of_range_geometry_is_kept_but_not_spatial() {
        let payload = r#"[{ "id": "far", "price": 100, "lat": 200.0, "lng": 39.7 }]"#;
        let feed = decode_listings(payload).unwrap();
        assert_eq!(feed.dataset.len(), 1);
        assert_eq!(feed.dataset.spatial_len(), 0);
        assert_eq!(feed.dataset.invalid_geometry().len(), 1);
    }

    #[test]
    fn rejects_unreadable_documents() {
        assert!(matches!(
            decode_listings("not json"),
            Err(DataFetchError::Parse(_))
        ));
        assert!(matches!(
            decode_listings(r#"{ "rows": [] }"#),
            Err(DataFetchError::UnsupportedShape)
        ));
        assert!(matches!(
            decode_listings("42"),
            Err(DataFetchError::UnsupportedShape)
        ));
    }

    #[test]
    fn encodes_positions_as_lng_lat() {
        let listing = Listing::new("a", 100, 20.0).with_position(43.5, 39.7);
        let collection = FeatureCollection::from_listings(
            std::slice::from_ref(&listing),
            Some(FeedMetadata::default()),
        );
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        assert_eq!(geometry.coordinates, vec![39.7, 43.5]);

        let text = serde_json::to_string(&collection).unwrap();
        let back = decode_listings(&text).unwrap();
        assert_eq!(back.dataset.listings(), std::slice::from_ref(&listing));
    }
}
