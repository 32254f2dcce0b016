use foundation::math::viewport_bounds;
use foundation::{BoundingBox, GeoPoint};
use providers::CameraState;
use serde::{Deserialize, Serialize};

/// Pixel size of the map container.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ContainerSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Where the camera looks. Bounds are always derived, never set directly.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    pub center: GeoPoint,
    pub zoom: f64,
    pub bounds: BoundingBox,
}

impl MapViewport {
    pub fn new(center: GeoPoint, zoom: f64, size: ContainerSize, tile_size: f64) -> Self {
        let bounds = viewport_bounds(
            center,
            zoom,
            f64::from(size.width),
            f64::from(size.height),
            tile_size,
        );
        Self {
            center,
            zoom,
            bounds,
        }
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        self.bounds.contains(p)
    }

    pub fn camera(&self) -> CameraState {
        CameraState::new(self.center, self.zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::{ContainerSize, MapViewport};
    use foundation::GeoPoint;

    #[test]
    fn bounds_surround_center() {
        let center = GeoPoint::new(43.585, 39.72);
        let v = MapViewport::new(center, 14.0, ContainerSize::default(), 256.0);
        assert!(v.contains(center));
        assert!(!v.contains(GeoPoint::new(43.7, 39.72)));
        assert!(v.bounds.south_west.lat < center.lat && center.lat < v.bounds.north_east.lat);
    }

    #[test]
    fn zooming_in_shrinks_bounds() {
        let center = GeoPoint::new(43.585, 39.72);
        let wide = MapViewport::new(center, 12.0, ContainerSize::default(), 256.0);
        let close = MapViewport::new(center, 16.0, ContainerSize::default(), 256.0);
        let span = |v: &MapViewport| v.bounds.north_east.lng - v.bounds.south_west.lng;
        assert!(span(&close) < span(&wide));
    }
}
