use std::collections::BTreeMap;

use layers::PriceScale;
use listings::Listing;
use serde::{Deserialize, Serialize};

use crate::analysis::aggregate::GroupAggregate;
use crate::analysis::statistics::{Statistics, round1};

/// Label used for listings without a room value.
pub const UNSPECIFIED_ROOMS: &str = "unspecified";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandCount {
    pub band: String,
    pub count: usize,
    /// Share of all listings, one decimal place.
    pub percentage: f64,
}

/// Listing count per price band. Every band of `scale` appears, in scale
/// order, including empty ones, so legends keep a fixed layout.
pub fn price_distribution(listings: &[Listing], scale: &PriceScale) -> Vec<BandCount> {
    let mut counts = vec![0usize; scale.bands().len()];
    for l in listings {
        counts[scale.band_index(l.price)] += 1;
    }
    let total = listings.len();
    scale
        .bands()
        .iter()
        .zip(counts)
        .map(|(band, count)| BandCount {
            band: band.name.clone(),
            count,
            percentage: if total == 0 {
                0.0
            } else {
                round1(count as f64 / total as f64 * 100.0)
            },
        })
        .collect()
}

pub fn room_distribution(listings: &[Listing]) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for l in listings {
        let key = l
            .rooms
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| UNSPECIFIED_ROOMS.to_string());
        *out.entry(key).or_insert(0) += 1;
    }
    out
}

/// Side-by-side comparison of two groups, relative to `b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupComparison {
    pub a: String,
    pub b: String,
    pub price_diff_percent: f64,
    pub price_per_sqm_diff_percent: f64,
    pub count_diff: i64,
}

pub fn compare(a: &GroupAggregate, b: &GroupAggregate) -> GroupComparison {
    let pct = |x: f64, base: f64| {
        if base == 0.0 {
            0.0
        } else {
            round1((x - base) / base * 100.0)
        }
    };
    GroupComparison {
        a: a.key.clone(),
        b: b.key.clone(),
        price_diff_percent: pct(a.avg_price, b.avg_price),
        price_per_sqm_diff_percent: pct(a.avg_price_per_sqm, b.avg_price_per_sqm),
        count_diff: a.count as i64 - b.count as i64,
    }
}

/// Header statistics of a feed, recomputed from the listings themselves.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedSummary {
    pub total: usize,
    pub avg_price: f64,
    pub avg_price_per_sqm: f64,
}

pub fn summarize(listings: &[Listing]) -> FeedSummary {
    let prices: Vec<f64> = listings.iter().map(|l| l.price as f64).collect();
    let per_sqm: Vec<f64> = listings.iter().filter_map(|l| l.price_per_sqm()).collect();
    FeedSummary {
        total: listings.len(),
        avg_price: Statistics::mean(&prices).unwrap_or(0.0),
        avg_price_per_sqm: Statistics::mean(&per_sqm).unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::{UNSPECIFIED_ROOMS, compare, price_distribution, room_distribution, summarize};
    use crate::analysis::aggregate::district_aggregates;
    use layers::PriceScale;
    use listings::{Listing, Rooms};
    use pretty_assertions::assert_eq;

    fn five() -> Vec<Listing> {
        [10_000_000u64, 16_000_000, 32_000_000, 60_000_000, 120_000_000]
            .iter()
            .enumerate()
            .map(|(i, &p)| Listing::new(format!("l{i}"), p, 50.0))
            .collect()
    }

    #[test]
    fn one_listing_per_band() {
        let dist = price_distribution(&five(), &PriceScale::default());
        let counts: Vec<usize> = dist.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 1, 1]);
        assert!(dist.iter().all(|b| b.percentage == 20.0));
    }

    #[test]
    fn empty_bands_are_listed() {
        let dist = price_distribution(&[], &PriceScale::default());
        assert_eq!(dist.len(), 5);
        assert!(dist.iter().all(|b| b.count == 0 && b.percentage == 0.0));
    }

    #[test]
    fn rooms_histogram() {
        let data = vec![
            Listing::new("a", 1, 1.0).with_rooms(Rooms::Count(2)),
            Listing::new("b", 1, 1.0).with_rooms(Rooms::Count(2)),
            Listing::new("c", 1, 1.0).with_rooms(Rooms::Label("studio".into())),
            Listing::new("d", 1, 1.0),
        ];
        let hist = room_distribution(&data);
        assert_eq!(hist.get("2"), Some(&2));
        assert_eq!(hist.get("studio"), Some(&1));
        assert_eq!(hist.get(UNSPECIFIED_ROOMS), Some(&1));
    }

    #[test]
    fn compares_groups_relative_to_second() {
        let data = vec![
            Listing::new("a", 30_000_000, 100.0).with_district("A"),
            Listing::new("b", 20_000_000, 100.0).with_district("B"),
            Listing::new("c", 20_000_000, 100.0).with_district("B"),
        ];
        let aggs = district_aggregates(&data);
        let b = aggs.iter().find(|g| g.key == "B").unwrap();
        let a = aggs.iter().find(|g| g.key == "A").unwrap();
        let cmp = compare(a, b);
        assert_eq!(cmp.price_diff_percent, 50.0);
        assert_eq!(cmp.price_per_sqm_diff_percent, 50.0);
        assert_eq!(cmp.count_diff, -1);
    }

    #[test]
    fn summary_matches_listings() {
        let s = summarize(&five());
        assert_eq!(s.total, 5);
        assert_eq!(s.avg_price, 47_600_000.0);
        assert_eq!(summarize(&[]).avg_price, 0.0);
    }
}
