use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Geographic bounding box, `south_west` to `north_east` inclusive.
///
/// Boxes crossing the antimeridian are not represented; callers clamp to
/// `[-180, 180]` before building one.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl BoundingBox {
    pub fn new(south_west: GeoPoint, north_east: GeoPoint) -> Self {
        BoundingBox {
            south_west,
            north_east,
        }
    }

    /// Smallest box containing every point. `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut sw = *first;
        let mut ne = *first;
        for p in points.iter().skip(1) {
            sw.lat = sw.lat.min(p.lat);
            sw.lng = sw.lng.min(p.lng);
            ne.lat = ne.lat.max(p.lat);
            ne.lng = ne.lng.max(p.lng);
        }
        Some(Self::new(sw, ne))
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south_west.lat + self.north_east.lat) * 0.5,
            (self.south_west.lng + self.north_east.lng) * 0.5,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::BoundingBox;
    use crate::geo::GeoPoint;

    #[test]
    fn from_points_and_contains() {
        let b = BoundingBox::from_points(&[
            GeoPoint::new(43.5, 39.9),
            GeoPoint::new(43.7, 39.6),
            GeoPoint::new(43.6, 39.7),
        ])
        .unwrap();
        assert_eq!(b.south_west, GeoPoint::new(43.5, 39.6));
        assert_eq!(b.north_east, GeoPoint::new(43.7, 39.9));
        assert!(b.contains(GeoPoint::new(43.6, 39.75)));
        assert!(b.contains(b.north_east));
        assert!(!b.contains(GeoPoint::new(43.8, 39.75)));
        assert_eq!(b.center(), GeoPoint::new(43.6, 39.75));
    }

    #[test]
    fn empty_slice_has_no_bounds() {
        assert!(BoundingBox::from_points(&[]).is_none());
    }
}
