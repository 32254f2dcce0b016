//! Filter, cluster and decorate, in that order.
//!
//! Every stage reads its input and returns fresh output; nothing here keeps
//! state between passes.

use compute::{DistrictAggregate, district_aggregates};
use foundation::GeoPoint;
use layers::{
    ClusterParams, DecoratedFeature, FilterState, InvalidPriceError, PriceScale, clusterize,
    decorate,
};
use listings::{Dataset, Listing, ListingId, spatial_subset};

#[derive(Debug, Clone)]
pub struct Pipeline {
    params: ClusterParams,
    scale: PriceScale,
}

impl Pipeline {
    pub fn new(params: ClusterParams, scale: PriceScale) -> Self {
        Self { params, scale }
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    pub fn scale(&self) -> &PriceScale {
        &self.scale
    }

    pub fn filter(&self, dataset: &Dataset, filter: &FilterState) -> Vec<Listing> {
        let filtered = layers::apply(dataset.listings(), filter);
        tracing::debug!(input = dataset.len(), output = filtered.len(), "filter pass");
        filtered
    }

    /// Markers for `filtered` at `zoom`. Listings without a valid position
    /// never reach the clusterer.
    pub fn render(
        &self,
        filtered: &[Listing],
        zoom: f64,
    ) -> Result<Vec<DecoratedFeature>, InvalidPriceError> {
        let points = spatial_subset(filtered);
        let nodes = clusterize(&points, zoom, &self.params);
        let features = decorate(&nodes, &self.scale)?;
        tracing::debug!(
            listings = filtered.len(),
            mappable = points.len(),
            features = features.len(),
            zoom,
            "render pass"
        );
        Ok(features)
    }

    pub fn aggregates(&self, filtered: &[Listing]) -> Vec<DistrictAggregate> {
        district_aggregates(filtered)
    }
}

/// Mappable listings in list order, used for next/previous stepping.
pub fn navigation_order(filtered: &[Listing]) -> Vec<(ListingId, GeoPoint)> {
    spatial_subset(filtered)
        .into_iter()
        .map(|(l, p)| (l.id.clone(), p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, navigation_order};
    use layers::{ClusterParams, FilterState, PriceScale};
    use listings::{Dataset, Listing, ListingId};
    use pretty_assertions::assert_eq;

    fn scenario() -> Dataset {
        let prices = [10_000_000u64, 16_000_000, 32_000_000, 60_000_000, 120_000_000];
        let listings = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                Listing::new(format!("l{i}"), p, 50.0)
                    .with_position(43.50 + i as f64 * 0.05, 39.70)
                    .with_district("Центральный")
            })
            .collect();
        Dataset::new(listings)
    }

    #[test]
    fn min_price_filter_keeps_order() {
        let pipeline = Pipeline::new(ClusterParams::default(), PriceScale::default());
        let filter = FilterState {
            min_price: Some(20_000_000),
            ..FilterState::default()
        };
        let ids: Vec<String> = pipeline
            .filter(&scenario(), &filter)
            .iter()
            .map(|l| l.id.to_string())
            .collect();
        assert_eq!(ids, vec!["l2", "l3", "l4"]);
    }

    #[test]
    fn far_apart_listings_get_one_band_each() {
        let pipeline = Pipeline::new(ClusterParams::default(), PriceScale::default());
        let dataset = scenario();
        let filtered = pipeline.filter(&dataset, &FilterState::default());
        let features = pipeline.render(&filtered, 14.0).unwrap();
        let bands: Vec<&str> = features.iter().map(|f| f.band.as_str()).collect();
        assert_eq!(bands, vec!["entry", "mid", "premium", "luxury", "ultra"]);
    }

    #[test]
    fn out_of_range_latitude_is_not_rendered() {
        let pipeline = Pipeline::new(ClusterParams::default(), PriceScale::default());
        let dataset = Dataset::new(vec![
            Listing::new("ok", 10_000_000, 40.0).with_position(43.58, 39.72),
            Listing::new("bad", 10_000_000, 40.0).with_position(200.0, 39.72),
        ]);
        let filtered = pipeline.filter(&dataset, &FilterState::default());
        let features = pipeline.render(&filtered, 18.0).unwrap();

        let rendered: Vec<Option<&ListingId>> = features.iter().map(|f| f.listing_id()).collect();
        assert_eq!(rendered, vec![Some(&ListingId::from("ok"))]);
        assert!(dataset.get(&ListingId::from("bad")).is_some());
        assert_eq!(filtered.len(), 2);
        assert_eq!(navigation_order(&filtered).len(), 1);
    }

    #[test]
    fn rendered_counts_cover_every_mappable_listing() {
        let pipeline = Pipeline::new(ClusterParams::default(), PriceScale::default());
        let listings: Vec<Listing> = (0..40)
            .map(|i| {
                Listing::new(format!("n{i}"), 1_000_000 * (i + 1), 30.0)
                    .with_position(43.58 + (i % 7) as f64 * 0.001, 39.72 + (i / 7) as f64 * 0.001)
            })
            .collect();
        let dataset = Dataset::new(listings);
        let filtered = pipeline.filter(&dataset, &FilterState::default());
        for zoom in [10.0, 13.0, 15.5, 17.0] {
            let features = pipeline.render(&filtered, zoom).unwrap();
            let total: usize = features.iter().map(|f| f.count).sum();
            assert_eq!(total, 40, "zoom {zoom}");
        }
    }

    #[test]
    fn aggregates_follow_the_filter() {
        let pipeline = Pipeline::new(ClusterParams::default(), PriceScale::default());
        let filter = FilterState {
            max_price: Some(20_000_000),
            ..FilterState::default()
        };
        let filtered = pipeline.filter(&scenario(), &filter);
        let aggregates = pipeline.aggregates(&filtered);
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].count, 2);
        assert_eq!(aggregates[0].median_price, 13_000_000.0);
    }

    #[test]
    fn repeated_ids_render_once() {
        let pipeline = Pipeline::new(ClusterParams::default(), PriceScale::default());
        let dataset = Dataset::new(vec![
            Listing::new("x", 10_000_000, 40.0).with_position(43.58, 39.72),
            Listing::new("x", 12_000_000, 40.0).with_position(43.70, 39.90),
            Listing::new("y", 20_000_000, 40.0).with_position(43.60, 39.80),
        ]);
        let filtered = pipeline.filter(&dataset, &FilterState::default());
        let features = pipeline.render(&filtered, 18.0).unwrap();
        let total: usize = features.iter().map(|f| f.count).sum();
        assert_eq!(total, dataset.spatial_len());
        assert_eq!(total, 2);
    }
}
