//! Per-group rollups for the district and complex panels.
//!
//! Aggregates are always derived from the listing slice passed in; nothing
//! here caches or mutates results, so they cannot drift from the data.

use std::collections::BTreeMap;

use foundation::GeoPoint;
use listings::Listing;
use serde::{Deserialize, Serialize};

use crate::analysis::statistics::Statistics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub key: String,
    pub count: usize,
    pub avg_price: f64,
    pub min_price: u64,
    pub max_price: u64,
    pub median_price: f64,
    /// Over members with a positive area; 0 when none have one.
    pub avg_price_per_sqm: f64,
    /// Over members with a positive area; 0 when none have one.
    pub avg_area: f64,
    /// Mean of the members' valid positions.
    pub center: Option<GeoPoint>,
}

pub type DistrictAggregate = GroupAggregate;
pub type ComplexAggregate = GroupAggregate;

impl GroupAggregate {
    /// Statistics over a non-empty member set. `None` when `members` is empty.
    pub fn from_members(key: impl Into<String>, members: &[&Listing]) -> Option<Self> {
        if members.is_empty() {
            return None;
        }
        let prices: Vec<f64> = members.iter().map(|l| l.price as f64).collect();
        let per_sqm: Vec<f64> = members.iter().filter_map(|l| l.price_per_sqm()).collect();
        let areas: Vec<f64> = members
            .iter()
            .filter(|l| l.area_sqm > 0.0)
            .map(|l| l.area_sqm)
            .collect();
        let positions: Vec<GeoPoint> = members.iter().filter_map(|l| l.position().ok()).collect();

        Some(Self {
            key: key.into(),
            count: members.len(),
            avg_price: Statistics::mean(&prices)?,
            min_price: members.iter().map(|l| l.price).min()?,
            max_price: members.iter().map(|l| l.price).max()?,
            median_price: Statistics::median(&prices)?,
            avg_price_per_sqm: Statistics::mean(&per_sqm).unwrap_or(0.0),
            avg_area: Statistics::mean(&areas).unwrap_or(0.0),
            center: GeoPoint::mean(&positions),
        })
    }
}

/// Groups `listings` by `key_fn` and aggregates each non-empty group.
///
/// Listings whose key is `None` or blank are left out of this aggregation
/// only. Ordering: `count` descending, then key ascending.
pub fn aggregate_by<F>(listings: &[Listing], key_fn: F) -> Vec<GroupAggregate>
where
    F: Fn(&Listing) -> Option<&str>,
{
    let mut groups: BTreeMap<&str, Vec<&Listing>> = BTreeMap::new();
    for listing in listings {
        let Some(key) = key_fn(listing).map(str::trim).filter(|k| !k.is_empty()) else {
            continue;
        };
        groups.entry(key).or_default().push(listing);
    }

    let mut out: Vec<GroupAggregate> = groups
        .into_iter()
        .filter_map(|(key, members)| GroupAggregate::from_members(key, &members))
        .collect();
    // BTreeMap iteration already gave key order; a stable sort keeps it for ties.
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

pub fn district_aggregates(listings: &[Listing]) -> Vec<DistrictAggregate> {
    aggregate_by(listings, |l| l.district.as_deref())
}

pub fn complex_aggregates(listings: &[Listing]) -> Vec<ComplexAggregate> {
    aggregate_by(listings, |l| l.complex_id.as_deref())
}

#[cfg(test)]
mod tests {
    use super::{aggregate_by, complex_aggregates, district_aggregates};
    use listings::Listing;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Listing> {
        vec![
            Listing::new("a", 10_000_000, 50.0)
                .with_district("Central")
                .with_position(43.58, 39.72),
            Listing::new("b", 20_000_000, 100.0)
                .with_district("Central")
                .with_position(43.60, 39.74),
            Listing::new("c", 40_000_000, 0.0).with_district("Central"),
            Listing::new("d", 30_000_000, 60.0).with_district("Adler"),
            Listing::new("e", 99_000_000, 90.0),
            Listing::new("f", 5_000_000, 30.0).with_district("  "),
        ]
    }

    #[test]
    fn district_rollup_statistics() {
        let aggs = district_aggregates(&sample());
        assert_eq!(aggs.len(), 2);

        let central = &aggs[0];
        assert_eq!(central.key, "Central");
        assert_eq!(central.count, 3);
        assert_eq!(central.min_price, 10_000_000);
        assert_eq!(central.max_price, 40_000_000);
        assert_eq!(central.median_price, 20_000_000.0);
        assert!((central.avg_price - 70_000_000.0 / 3.0).abs() < 1e-6);
        // Zero-area listing is ignored for per-m² and area means.
        assert_eq!(central.avg_price_per_sqm, 200_000.0);
        assert_eq!(central.avg_area, 75.0);
        let center = central.center.expect("central has positioned members");
        assert!((center.lat - 43.59).abs() < 1e-9);
        assert!((center.lng - 39.73).abs() < 1e-9);

        assert_eq!(aggs[1].key, "Adler");
        assert_eq!(aggs[1].center, None);
    }

    #[test]
    fn groups_are_never_empty_and_median_is_bounded() {
        let aggs = district_aggregates(&sample());
        for g in &aggs {
            assert!(g.count >= 1);
            assert!(g.min_price as f64 <= g.median_price);
            assert!(g.median_price <= g.max_price as f64);
        }
    }

    #[test]
    fn even_group_median_averages_central_pair() {
        let listings = vec![
            Listing::new("a", 10, 1.0).with_district("x"),
            Listing::new("b", 40, 1.0).with_district("x"),
            Listing::new("c", 20, 1.0).with_district("x"),
            Listing::new("d", 30, 1.0).with_district("x"),
        ];
        let aggs = district_aggregates(&listings);
        assert_eq!(aggs[0].median_price, 25.0);
    }

    #[test]
    fn missing_key_excluded_only_from_that_grouping() {
        let data = sample();
        let by_district: usize = district_aggregates(&data).iter().map(|g| g.count).sum();
        assert_eq!(by_district, 4);

        let all = aggregate_by(&data, |_| Some("all"));
        assert_eq!(all[0].count, data.len());
    }

    #[test]
    fn ties_sort_by_key() {
        let listings = vec![
            Listing::new("a", 1, 1.0).with_complex("2", "B"),
            Listing::new("b", 1, 1.0).with_complex("1", "A"),
        ];
        let keys: Vec<String> = complex_aggregates(&listings)
            .into_iter()
            .map(|g| g.key)
            .collect();
        assert_eq!(keys, vec!["1", "2"]);
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(district_aggregates(&[]).is_empty());
    }
}
