//! Spherical Web-Mercator ("slippy map") projection.
//!
//! World pixel space spans `[0, tile_size * 2^zoom)` on both axes with the
//! origin at the north-west corner. Every raster and vector backend we drive
//! uses this projection, so pixel-based grids computed here line up with what
//! the user sees regardless of which backend is mounted.

use crate::bounds::BoundingBox;
use crate::geo::GeoPoint;
use crate::math::vec::Vec2;

/// Latitude limit of the square Web-Mercator world.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

pub const DEFAULT_TILE_SIZE: f64 = 256.0;

/// Width (and height) of the world in pixels at `zoom`.
pub fn world_size_px(zoom: f64, tile_size: f64) -> f64 {
    tile_size * 2f64.powf(zoom)
}

/// Projects a geographic point to world pixels at `zoom`.
///
/// Latitudes beyond the Mercator limit are clamped.
pub fn project(p: GeoPoint, zoom: f64, tile_size: f64) -> Vec2 {
    let size = world_size_px(zoom, tile_size);
    let lat = p.lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    let x = (p.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * size;
    Vec2::new(x, y)
}

/// Inverse of [`project`].
pub fn unproject(px: Vec2, zoom: f64, tile_size: f64) -> GeoPoint {
    let size = world_size_px(zoom, tile_size);
    let lng = px.x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * px.y / size;
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lat, lng)
}

/// Geographic bounds of a `width_px` x `height_px` viewport centred on
/// `center` at `zoom`, clamped to the projectable world.
pub fn viewport_bounds(
    center: GeoPoint,
    zoom: f64,
    width_px: f64,
    height_px: f64,
    tile_size: f64,
) -> BoundingBox {
    let c = project(center, zoom, tile_size);
    let half = Vec2::new(width_px * 0.5, height_px * 0.5);
    let nw = unproject(c - half, zoom, tile_size);
    let se = unproject(c + half, zoom, tile_size);
    BoundingBox::new(
        GeoPoint::new(
            se.lat.max(-MERCATOR_MAX_LAT),
            nw.lng.clamp(-180.0, 180.0),
        ),
        GeoPoint::new(
            nw.lat.min(MERCATOR_MAX_LAT),
            se.lng.clamp(-180.0, 180.0),
        ),
    )
}
