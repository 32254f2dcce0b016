use serde::{Deserialize, Serialize};

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

/// Geographic position in decimal degrees (WGS84).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a point only when both coordinates are finite and in range.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let p = Self::new(lat, lng);
        p.is_valid().then_some(p)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (MIN_LAT..=MAX_LAT).contains(&self.lat)
            && (MIN_LNG..=MAX_LNG).contains(&self.lng)
    }

    /// Arithmetic mean of `points`. `None` for an empty slice.
    pub fn mean(points: &[GeoPoint]) -> Option<GeoPoint> {
        if points.is_empty() {
            return None;
        }
        let mut lat = 0.0;
        let mut lng = 0.0;
        for p in points {
            lat += p.lat;
            lng += p.lng;
        }
        let n = points.len() as f64;
        Some(GeoPoint::new(lat / n, lng / n))
    }
}

#[cfg(test)]
mod tests {
    use super::GeoPoint;

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(GeoPoint::checked(43.585, 39.72).is_some());
        assert!(GeoPoint::checked(90.0, -180.0).is_some());
        assert!(GeoPoint::checked(200.0, 39.72).is_none());
        assert!(GeoPoint::checked(43.0, 180.5).is_none());
        assert!(GeoPoint::checked(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::checked(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn mean_of_points() {
        let m = GeoPoint::mean(&[GeoPoint::new(43.0, 39.0), GeoPoint::new(44.0, 40.0)]).unwrap();
        assert_eq!(m, GeoPoint::new(43.5, 39.5));
        assert!(GeoPoint::mean(&[]).is_none());
    }

    #[test]
    fn serializes_as_lat_lng_object() {
        let json = serde_json::to_string(&GeoPoint::new(1.5, 2.5)).unwrap();
        assert_eq!(json, r#"{"lat":1.5,"lng":2.5}"#);
    }
}
