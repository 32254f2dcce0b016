use std::fmt;

use foundation::GeoPoint;
use listings::ListingId;
use serde::{Deserialize, Serialize};

use crate::cluster::{ClusterKey, ClusterNode};
use crate::symbology::{ColorToken, InvalidPriceError, PriceScale, RadiusToken, format_price};

/// Stable identity of a rendered marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FeatureKey {
    Listing(ListingId),
    Cluster(ClusterKey),
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKey::Listing(id) => write!(f, "listing:{id}"),
            FeatureKey::Cluster(key) => write!(f, "cluster:{key}"),
        }
    }
}

/// A marker ready for any backend: position plus the shared price encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoratedFeature {
    pub key: FeatureKey,
    pub position: GeoPoint,
    pub count: usize,
    /// Listing price, or mean member price for clusters.
    pub price: f64,
    pub band: String,
    pub color: ColorToken,
    pub radius: RadiusToken,
    pub label: String,
    /// Popup body, one line per fact.
    pub popup: String,
}

impl DecoratedFeature {
    pub fn listing_id(&self) -> Option<&ListingId> {
        match &self.key {
            FeatureKey::Listing(id) => Some(id),
            FeatureKey::Cluster(_) => None,
        }
    }
}

/// Applies the price encoding to clustered nodes.
///
/// Runs strictly after filtering and clustering; the nodes still carry raw
/// prices and positions.
pub fn decorate(
    nodes: &[ClusterNode<'_>],
    scale: &PriceScale,
) -> Result<Vec<DecoratedFeature>, InvalidPriceError> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let feature = match node {
            ClusterNode::Single { listing, position } => {
                let price = listing.price as f64;
                let enc = scale.encode(price)?;
                DecoratedFeature {
                    key: FeatureKey::Listing(listing.id.clone()),
                    position: *position,
                    count: 1,
                    price,
                    band: enc.band,
                    color: enc.color,
                    radius: enc.radius,
                    label: format_price(price),
                    popup: listing_popup(listing.title.as_str(), listing.address.as_str(), price),
                }
            }
            ClusterNode::Aggregate(cluster) => {
                let enc = scale.encode(cluster.mean_price)?;
                DecoratedFeature {
                    key: FeatureKey::Cluster(cluster.key),
                    position: cluster.centroid,
                    count: cluster.count(),
                    price: cluster.mean_price,
                    band: enc.band,
                    color: enc.color,
                    radius: enc.radius,
                    label: cluster.count().to_string(),
                    popup: format!(
                        "{} listings\nmedian {}",
                        cluster.count(),
                        format_price(cluster.median_price)
                    ),
                }
            }
        };
        out.push(feature);
    }
    Ok(out)
}

fn listing_popup(title: &str, address: &str, price: f64) -> String {
    [title.trim(), address.trim(), format_price(price).as_str()]
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{FeatureKey, decorate};
    use crate::cluster::{ClusterParams, clusterize};
    use crate::symbology::PriceScale;
    use listings::{Listing, ListingId, spatial_subset};
    use pretty_assertions::assert_eq;

    #[test]
    fn decorates_singles_with_band_tokens() {
        let listings = vec![
            Listing::new("a", 16_000_000, 40.0).with_position(43.585, 39.72),
            Listing::new("b", 120_000_000, 40.0).with_position(55.75, 37.62),
        ];
        let points = spatial_subset(&listings);
        let nodes = clusterize(&points, 18.0, &ClusterParams::default());
        let features = decorate(&nodes, &PriceScale::default()).unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].key, FeatureKey::Listing(ListingId::new("a")));
        assert_eq!(features[0].band, "mid");
        assert_eq!(features[0].color.0, "#22c55e");
        assert_eq!(features[0].label, "16.0M ₽");
        assert_eq!(features[1].band, "ultra");
        assert!(features[0].radius < features[1].radius);
    }

    #[test]
    fn clusters_carry_count_and_mean_price_band() {
        let listings = vec![
            Listing::new("a", 10_000_000, 40.0).with_position(43.58500, 39.72000),
            Listing::new("b", 30_000_000, 40.0).with_position(43.58502, 39.72004),
        ];
        let points = spatial_subset(&listings);
        let nodes = clusterize(&points, 12.0, &ClusterParams::default());
        let features = decorate(&nodes, &PriceScale::default()).unwrap();

        assert_eq!(features.len(), 1);
        assert!(matches!(features[0].key, FeatureKey::Cluster(_)));
        assert_eq!(features[0].count, 2);
        assert_eq!(features[0].band, "mid");
        assert_eq!(features[0].label, "2");
        assert_eq!(features[0].popup, "2 listings\nmedian 20.0M ₽");
        assert!(features[0].listing_id().is_none());
    }

    #[test]
    fn feature_key_serializes_tagged() {
        let key = FeatureKey::Listing(ListingId::new("42"));
        assert_eq!(
            serde_json::to_string(&key).unwrap(),
            r#"{"kind":"listing","id":"42"}"#
        );
    }

    #[test]
    fn listing_popup_lists_title_address_and_price() {
        let mut listing = Listing::new("a", 12_500_000, 40.0).with_position(43.585, 39.72);
        listing.title = "2-room flat".to_string();
        listing.address = "Kurortny pr., 10".to_string();
        let bare = Listing::new("b", 850_000, 20.0).with_position(55.75, 37.62);
        let listings = vec![listing, bare];
        let points = spatial_subset(&listings);
        let nodes = clusterize(&points, 18.0, &ClusterParams::default());
        let features = decorate(&nodes, &PriceScale::default()).unwrap();

        assert_eq!(features[0].popup, "2-room flat\nKurortny pr., 10\n12.5M ₽");
        assert_eq!(features[1].popup, "850K ₽");
    }
}
