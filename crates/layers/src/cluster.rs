//! Grid clustering of listing markers.
//!
//! Listings are projected to Web-Mercator world pixels at the integer zoom
//! level and bucketed into square cells of `cell_size_px`. The grid is
//! anchored at the world origin, so a given `(dataset, zoom, cell size)` always
//! yields the same clusters no matter where the camera is or in which order
//! listings arrive.

use std::collections::BTreeMap;

use foundation::GeoPoint;
use foundation::math::{DEFAULT_TILE_SIZE, project};
use listings::Listing;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub cell_size_px: f64,
    /// At or above this zoom every listing is drawn on its own.
    pub expand_zoom: f64,
    pub tile_size_px: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            cell_size_px: 64.0,
            expand_zoom: 17.0,
            tile_size_px: DEFAULT_TILE_SIZE,
        }
    }
}

impl ClusterParams {
    pub fn clusters_at(&self, zoom: f64) -> bool {
        zoom < self.expand_zoom
    }
}

/// Grid cell identity at one zoom level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterKey {
    pub zoom_level: u32,
    pub cell_x: i64,
    pub cell_y: i64,
}

impl std::fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom_level, self.cell_x, self.cell_y)
    }
}

/// Two or more listings sharing one grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCluster<'a> {
    pub key: ClusterKey,
    /// Mean of member coordinates.
    pub centroid: GeoPoint,
    /// Mean member price.
    pub mean_price: f64,
    /// Middle member price; the two middle prices averaged for even counts.
    pub median_price: f64,
    members: Vec<(&'a Listing, GeoPoint)>,
}

impl<'a> ListingCluster<'a> {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[(&'a Listing, GeoPoint)] {
        &self.members
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterNode<'a> {
    Single {
        listing: &'a Listing,
        position: GeoPoint,
    },
    Aggregate(ListingCluster<'a>),
}

impl<'a> ClusterNode<'a> {
    pub fn count(&self) -> usize {
        match self {
            ClusterNode::Single { .. } => 1,
            ClusterNode::Aggregate(c) => c.count(),
        }
    }

    pub fn position(&self) -> GeoPoint {
        match self {
            ClusterNode::Single { position, .. } => *position,
            ClusterNode::Aggregate(c) => c.centroid,
        }
    }

    /// Decomposes the node into one `Single` per member, in member order.
    pub fn expand(&self) -> Vec<ClusterNode<'a>> {
        match self {
            ClusterNode::Single { .. } => vec![self.clone()],
            ClusterNode::Aggregate(c) => c
                .members
                .iter()
                .map(|&(listing, position)| ClusterNode::Single { listing, position })
                .collect(),
        }
    }
}

pub fn cell_for(position: GeoPoint, zoom_level: u32, params: &ClusterParams) -> ClusterKey {
    let px = project(position, zoom_level as f64, params.tile_size_px);
    let cell = params.cell_size_px.max(1.0);
    ClusterKey {
        zoom_level,
        cell_x: (px.x / cell).floor() as i64,
        cell_y: (px.y / cell).floor() as i64,
    }
}

/// Clusters positioned listings for display at `zoom`.
///
/// Output order follows the first member of each node in the input, and the
/// sum of node counts always equals `points.len()`.
pub fn clusterize<'a>(
    points: &[(&'a Listing, GeoPoint)],
    zoom: f64,
    params: &ClusterParams,
) -> Vec<ClusterNode<'a>> {
    if !params.clusters_at(zoom) {
        return points
            .iter()
            .map(|&(listing, position)| ClusterNode::Single { listing, position })
            .collect();
    }

    let zoom_level = zoom.max(0.0).floor() as u32;
    let mut slots: BTreeMap<ClusterKey, usize> = BTreeMap::new();
    let mut cells: Vec<(ClusterKey, Vec<(&'a Listing, GeoPoint)>)> = Vec::new();

    for &(listing, position) in points {
        let key = cell_for(position, zoom_level, params);
        match slots.get(&key) {
            Some(&slot) => cells[slot].1.push((listing, position)),
            None => {
                slots.insert(key, cells.len());
                cells.push((key, vec![(listing, position)]));
            }
        }
    }

    cells
        .into_iter()
        .map(|(key, members)| {
            if let [(listing, position)] = members.as_slice() {
                return ClusterNode::Single {
                    listing: *listing,
                    position: *position,
                };
            }
            let positions: Vec<GeoPoint> = members.iter().map(|(_, p)| *p).collect();
            let centroid = GeoPoint::mean(&positions).unwrap_or(positions[0]);
            let mean_price =
                members.iter().map(|(l, _)| l.price as f64).sum::<f64>() / members.len() as f64;
            let median_price = median_price(&members);
            ClusterNode::Aggregate(ListingCluster {
                key,
                centroid,
                mean_price,
                median_price,
                members,
            })
        })
        .collect()
}

fn median_price(members: &[(&Listing, GeoPoint)]) -> f64 {
    let mut prices: Vec<u64> = members.iter().map(|(l, _)| l.price).collect();
    prices.sort_unstable();
    let mid = prices.len() / 2;
    match prices.len() {
        0 => 0.0,
        n if n % 2 == 0 => (prices[mid - 1] as f64 + prices[mid] as f64) / 2.0,
        _ => prices[mid] as f64,
    }
}
