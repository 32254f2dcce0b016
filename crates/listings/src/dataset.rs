use std::collections::{BTreeMap, BTreeSet};

use foundation::GeoPoint;
use tracing::warn;

use crate::error::InvalidGeometryError;
use crate::listing::{Listing, ListingId};

/// Validated, immutable listing collection for one render cycle.
///
/// Ordering contract:
/// - `iter()` and `spatial()` yield listings in feed order.
/// - Ids are unique: a repeated id is dropped, the first occurrence kept.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    listings: Vec<Listing>,
    by_id: BTreeMap<ListingId, usize>,
    spatial: Vec<(usize, GeoPoint)>,
    invalid_geometry: Vec<InvalidGeometryError>,
    duplicates: Vec<ListingId>,
}

impl Dataset {
    pub fn new(listings: Vec<Listing>) -> Self {
        let mut kept = Vec::with_capacity(listings.len());
        let mut by_id = BTreeMap::new();
        let mut spatial = Vec::with_capacity(listings.len());
        let mut invalid_geometry = Vec::new();
        let mut duplicates: Vec<ListingId> = Vec::new();
        let mut warned: BTreeSet<ListingId> = BTreeSet::new();

        for listing in listings {
            if by_id.contains_key(&listing.id) {
                if warned.insert(listing.id.clone()) {
                    warn!(id = %listing.id, "duplicate listing id; keeping first occurrence");
                }
                duplicates.push(listing.id);
                continue;
            }

            let idx = kept.len();
            by_id.insert(listing.id.clone(), idx);
            match listing.position() {
                Ok(p) => spatial.push((idx, p)),
                Err(err) => {
                    warn!("{err}; excluded from spatial views");
                    invalid_geometry.push(err);
                }
            }
            kept.push(listing);
        }

        Self {
            listings: kept,
            by_id,
            spatial,
            invalid_geometry,
            duplicates,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> + '_ {
        self.listings.iter()
    }

    pub fn get(&self, id: &ListingId) -> Option<&Listing> {
        self.by_id.get(id).map(|&idx| &self.listings[idx])
    }

    /// Listings that may be placed on the map, with their validated position.
    pub fn spatial(&self) -> impl Iterator<Item = (&Listing, GeoPoint)> + '_ {
        self.spatial
            .iter()
            .map(|&(idx, p)| (&self.listings[idx], p))
    }

    pub fn spatial_len(&self) -> usize {
        self.spatial.len()
    }

    pub fn invalid_geometry(&self) -> &[InvalidGeometryError] {
        &self.invalid_geometry
    }

    /// Ids of dropped repeats, one entry per dropped listing.
    pub fn duplicates(&self) -> &[ListingId] {
        &self.duplicates
    }
}

/// Pairs each listing that has a valid position with that position,
/// preserving order. Invalid ones are skipped silently; [`Dataset::new`]
/// already reported them.
pub fn spatial_subset(listings: &[Listing]) -> Vec<(&Listing, GeoPoint)> {
    listings
        .iter()
        .filter_map(|l| l.position().ok().map(|p| (l, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Dataset, spatial_subset};
    use crate::listing::{Listing, ListingId};
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Listing> {
        vec![
            Listing::new("a", 10_000_000, 40.0).with_position(43.58, 39.72),
            Listing::new("bad", 16_000_000, 50.0).with_position(200.0, 39.72),
            Listing::new("nopos", 20_000_000, 60.0),
            Listing::new("b", 32_000_000, 70.0).with_position(43.60, 39.75),
        ]
    }

    #[test]
    fn out_of_range_listing_stays_retrievable_but_not_spatial() {
        let ds = Dataset::new(sample());
        assert_eq!(ds.len(), 4);
        assert!(ds.get(&ListingId::new("bad")).is_some());

        let spatial: Vec<&str> = ds.spatial().map(|(l, _)| l.id.as_str()).collect();
        assert_eq!(spatial, vec!["a", "b"]);

        let invalid: Vec<&str> = ds
            .invalid_geometry()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(invalid, vec!["bad", "nopos"]);
    }

    #[test]
    fn duplicate_ids_keep_first_and_drop_the_rest() {
        let ds = Dataset::new(vec![
            Listing::new("a", 1, 10.0).with_position(43.58, 39.72),
            Listing::new("a", 2, 10.0).with_position(43.59, 39.73),
            Listing::new("b", 3, 10.0).with_position(43.60, 39.74),
            Listing::new("a", 4, 10.0).with_position(200.0, 39.72),
        ]);
        assert_eq!(ds.get(&ListingId::new("a")).map(|l| l.price), Some(1));
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.spatial_len(), 2);
        assert!(ds.invalid_geometry().is_empty());
        assert_eq!(ds.duplicates(), &[ListingId::new("a"), ListingId::new("a")]);
    }

    #[test]
    fn spatial_subset_preserves_order() {
        let listings = sample();
        let ids: Vec<&str> = spatial_subset(&listings)
            .into_iter()
            .map(|(l, _)| l.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
