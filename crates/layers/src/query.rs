use std::fmt;

use listings::{Listing, Rooms};
use serde::{Deserialize, Serialize};

use crate::symbology::PriceScale;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomsParseError {
    pub input: String,
}

impl fmt::Display for RoomsParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse rooms filter '{}'", self.input)
    }
}

impl std::error::Error for RoomsParseError {}

/// Room-count predicate.
///
/// `Label` matches non-numeric room values ("studio") by exact string
/// comparison; `Range` is an inclusive numeric range over counted rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomsFilter {
    Label(String),
    Range { min: u32, max: Option<u32> },
}

impl RoomsFilter {
    pub fn exactly(n: u32) -> Self {
        RoomsFilter::Range {
            min: n,
            max: Some(n),
        }
    }

    /// Accepts "studio", "2", "2-3" and "4+".
    pub fn parse(raw: &str) -> Result<Self, RoomsParseError> {
        let s = raw.trim();
        let err = || RoomsParseError {
            input: raw.to_string(),
        };
        if s.is_empty() {
            return Err(err());
        }
        let numeric_shape = s
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '+' || c.is_whitespace());
        if !numeric_shape {
            return Ok(RoomsFilter::Label(s.to_string()));
        }

        if let Some(min) = s.strip_suffix('+') {
            let min = min.trim().parse().map_err(|_| err())?;
            return Ok(RoomsFilter::Range { min, max: None });
        }
        if let Some((lo, hi)) = s.split_once('-') {
            let min: u32 = lo.trim().parse().map_err(|_| err())?;
            let max: u32 = hi.trim().parse().map_err(|_| err())?;
            if min > max {
                return Err(err());
            }
            return Ok(RoomsFilter::Range {
                min,
                max: Some(max),
            });
        }
        s.parse().map(RoomsFilter::exactly).map_err(|_| err())
    }

    pub fn matches(&self, rooms: Option<&Rooms>) -> bool {
        let Some(rooms) = rooms else {
            return false;
        };
        match (self, rooms) {
            (RoomsFilter::Label(want), have) => have.to_string() == *want,
            (RoomsFilter::Range { min, max }, Rooms::Count(n)) => {
                *n >= *min && max.is_none_or(|m| *n <= m)
            }
            (RoomsFilter::Range { .. }, Rooms::Label(_)) => false,
        }
    }
}

impl fmt::Display for RoomsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomsFilter::Label(s) => f.write_str(s),
            RoomsFilter::Range { min, max: None } => write!(f, "{min}+"),
            RoomsFilter::Range {
                min,
                max: Some(max),
            } if min == max => write!(f, "{min}"),
            RoomsFilter::Range {
                min,
                max: Some(max),
            } => write!(f, "{min}-{max}"),
        }
    }
}

impl TryFrom<String> for RoomsFilter {
    type Error = RoomsParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        RoomsFilter::parse(&s)
    }
}

impl From<RoomsFilter> for String {
    fn from(f: RoomsFilter) -> Self {
        f.to_string()
    }
}

/// Immutable filter snapshot. Every field is optional; each set field adds
/// one inclusive predicate and predicates are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub rooms: Option<RoomsFilter>,
    pub district: Option<String>,
    pub complex_id: Option<String>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        *self == FilterState::default()
    }

    /// Price range of one band of `scale`, `None` for an unknown band name.
    pub fn for_band(scale: &PriceScale, band: &str) -> Option<Self> {
        let (min, max) = scale.band_range(band)?;
        Some(FilterState {
            min_price: Some(min),
            // Bands are closed-open over integer prices.
            max_price: max.map(|m| m.saturating_sub(1)),
            ..Default::default()
        })
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        if self.min_price.is_some_and(|min| listing.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| listing.price > max) {
            return false;
        }
        if self.min_area.is_some_and(|min| !(listing.area_sqm >= min)) {
            return false;
        }
        if self.max_area.is_some_and(|max| !(listing.area_sqm <= max)) {
            return false;
        }
        if let Some(rooms) = &self.rooms {
            if !rooms.matches(listing.rooms.as_ref()) {
                return false;
            }
        }
        if let Some(district) = &self.district {
            if listing.district.as_deref() != Some(district.as_str()) {
                return false;
            }
        }
        if let Some(complex) = &self.complex_id {
            if listing.complex_id.as_deref() != Some(complex.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Single pass over `dataset`, keeping the listings `filter` accepts in
/// their original order. An empty filter returns the input unchanged.
pub fn apply(dataset: &[Listing], filter: &FilterState) -> Vec<Listing> {
    if filter.is_empty() {
        return dataset.to_vec();
    }
    dataset
        .iter()
        .filter(|l| filter.matches(l))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FilterState, RoomsFilter, apply};
    use crate::symbology::PriceScale;
    use listings::{Listing, Rooms};
    use pretty_assertions::assert_eq;

    fn five() -> Vec<Listing> {
        [10_000_000u64, 16_000_000, 32_000_000, 60_000_000, 120_000_000]
            .iter()
            .enumerate()
            .map(|(i, &p)| Listing::new(format!("l{i}"), p, 40.0 + i as f64 * 10.0))
            .collect()
    }

    fn prices(v: &[Listing]) -> Vec<u64> {
        v.iter().map(|l| l.price).collect()
    }

    #[test]
    fn min_price_keeps_order() {
        let f = FilterState {
            min_price: Some(20_000_000),
            ..Default::default()
        };
        let out = apply(&five(), &f);
        assert_eq!(prices(&out), vec![32_000_000, 60_000_000, 120_000_000]);
    }

    #[test]
    fn empty_filter_is_identity() {
        let data = five();
        assert_eq!(apply(&data, &FilterState::default()), data);
    }

    #[test]
    fn filtering_is_idempotent() {
        let data = five();
        let filters = [
            FilterState {
                min_price: Some(15_000_000),
                max_price: Some(60_000_000),
                ..Default::default()
            },
            FilterState {
                min_area: Some(55.0),
                ..Default::default()
            },
            FilterState {
                rooms: Some(RoomsFilter::exactly(2)),
                ..Default::default()
            },
        ];
        for f in &filters {
            let once = apply(&data, f);
            assert_eq!(apply(&once, f), once);
        }
    }

    #[test]
    fn ranges_are_inclusive() {
        let f = FilterState {
            min_price: Some(16_000_000),
            max_price: Some(60_000_000),
            min_area: Some(50.0),
            max_area: Some(70.0),
            ..Default::default()
        };
        let out = apply(&five(), &f);
        assert_eq!(prices(&out), vec![16_000_000, 32_000_000, 60_000_000]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let f = FilterState {
            min_price: Some(50_000_000),
            max_price: Some(10_000_000),
            ..Default::default()
        };
        assert!(apply(&five(), &f).is_empty());
    }

    #[test]
    fn rooms_label_and_numeric() {
        let data = vec![
            Listing::new("s", 1, 20.0).with_rooms(Rooms::Label("studio".into())),
            Listing::new("one", 1, 30.0).with_rooms(Rooms::Count(1)),
            Listing::new("three", 1, 80.0).with_rooms(Rooms::Count(3)),
            Listing::new("none", 1, 80.0),
        ];
        let ids = |f: &FilterState| -> Vec<String> {
            apply(&data, f).iter().map(|l| l.id.to_string()).collect()
        };

        let studio = FilterState {
            rooms: Some(RoomsFilter::parse("studio").unwrap()),
            ..Default::default()
        };
        assert_eq!(ids(&studio), vec!["s"]);

        let one_to_three = FilterState {
            rooms: Some(RoomsFilter::parse("1-3").unwrap()),
            ..Default::default()
        };
        assert_eq!(ids(&one_to_three), vec!["one", "three"]);

        let three_plus = FilterState {
            rooms: Some(RoomsFilter::parse("3+").unwrap()),
            ..Default::default()
        };
        assert_eq!(ids(&three_plus), vec!["three"]);
    }

    #[test]
    fn rooms_filter_parsing() {
        assert_eq!(RoomsFilter::parse("2").unwrap(), RoomsFilter::exactly(2));
        assert_eq!(
            RoomsFilter::parse(" 4+ ").unwrap(),
            RoomsFilter::Range { min: 4, max: None }
        );
        assert!(RoomsFilter::parse("3-1").is_err());
        assert!(RoomsFilter::parse("").is_err());
        assert!(RoomsFilter::parse("-").is_err());
        assert_eq!(RoomsFilter::parse("2-3").unwrap().to_string(), "2-3");
    }

    #[test]
    fn district_and_complex_predicates() {
        let data = vec![
            Listing::new("a", 1, 1.0).with_district("Central"),
            Listing::new("b", 1, 1.0).with_district("Adler").with_complex("7", "Corum"),
            Listing::new("c", 1, 1.0),
        ];
        let f = FilterState {
            district: Some("Adler".into()),
            ..Default::default()
        };
        assert_eq!(apply(&data, &f).len(), 1);
        let f = FilterState {
            complex_id: Some("7".into()),
            ..Default::default()
        };
        assert_eq!(apply(&data, &f)[0].id.as_str(), "b");
    }

    #[test]
    fn band_filter_matches_band_exactly() {
        let scale = PriceScale::default();
        let f = FilterState::for_band(&scale, "mid").unwrap();
        let out = apply(&five(), &f);
        assert_eq!(prices(&out), vec![16_000_000]);
        let edge = vec![Listing::new("edge", 30_000_000, 1.0)];
        assert!(apply(&edge, &f).is_empty());
    }

    #[test]
    fn filter_state_deserializes_from_partial_json() {
        let f: FilterState = serde_json::from_str(r#"{"min_price":20000000,"rooms":"studio"}"#).unwrap();
        assert_eq!(f.min_price, Some(20_000_000));
        assert_eq!(f.rooms, Some(RoomsFilter::Label("studio".into())));
        assert_eq!(f.max_price, None);
    }
}
