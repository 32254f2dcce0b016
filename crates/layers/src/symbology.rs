//! Price encoding scale: one shared price -> {color, radius} mapping.
//!
//! Bands are configuration data. Every renderer decorates through the same
//! [`PriceScale`], so a listing never shows two colors in two views.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorToken(pub String);

impl ColorToken {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }
}

/// Marker radius in CSS pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RadiusToken(pub u32);

/// One bucket of the price axis: `[min_price, next band's min_price)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub name: String,
    pub min_price: u64,
    pub color: ColorToken,
    pub radius: RadiusToken,
}

impl PriceBand {
    pub fn new(name: &str, min_price: u64, color: &str, radius: u32) -> Self {
        Self {
            name: name.to_string(),
            min_price,
            color: ColorToken::new(color),
            radius: RadiusToken(radius),
        }
    }
}

/// Visual encoding of one price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEncoding {
    pub band_index: usize,
    pub band: String,
    pub color: ColorToken,
    pub radius: RadiusToken,
}

/// Negative or NaN price reached the encoder.
///
/// This means upstream data corruption, so it is reported instead of being
/// mapped to some default band.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InvalidPriceError {
    pub price: f64,
}

impl fmt::Display for InvalidPriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid price {}: must be a finite, non-negative number",
            self.price
        )
    }
}

impl std::error::Error for InvalidPriceError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceScaleError {
    Empty,
    FirstBandNotZero { min_price: u64 },
    UnorderedThreshold { band: String },
    ShrinkingRadius { band: String },
}

impl fmt::Display for PriceScaleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceScaleError::Empty => write!(f, "price scale has no bands"),
            PriceScaleError::FirstBandNotZero { min_price } => {
                write!(f, "first price band must start at 0, found {min_price}")
            }
            PriceScaleError::UnorderedThreshold { band } => {
                write!(f, "band '{band}' threshold is not above the previous band")
            }
            PriceScaleError::ShrinkingRadius { band } => {
                write!(f, "band '{band}' radius is smaller than the previous band")
            }
        }
    }
}

impl std::error::Error for PriceScaleError {}

/// Ordered, exhaustive partition of the non-negative price axis.
///
/// Invariants (checked by [`PriceScale::new`]):
/// - the first band starts at 0, so every non-negative price has a band;
/// - thresholds strictly increase;
/// - radii never decrease, so radius is monotonic in price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceBand>", into = "Vec<PriceBand>")]
pub struct PriceScale {
    bands: Vec<PriceBand>,
}

impl PriceScale {
    pub fn new(bands: Vec<PriceBand>) -> Result<Self, PriceScaleError> {
        let first = bands.first().ok_or(PriceScaleError::Empty)?;
        if first.min_price != 0 {
            return Err(PriceScaleError::FirstBandNotZero {
                min_price: first.min_price,
            });
        }
        for pair in bands.windows(2) {
            if pair[1].min_price <= pair[0].min_price {
                return Err(PriceScaleError::UnorderedThreshold {
                    band: pair[1].name.clone(),
                });
            }
            if pair[1].radius < pair[0].radius {
                return Err(PriceScaleError::ShrinkingRadius {
                    band: pair[1].name.clone(),
                });
            }
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[PriceBand] {
        &self.bands
    }

    /// Index of the band containing an integer price.
    ///
    /// A price exactly on a threshold belongs to the higher band.
    pub fn band_index(&self, price: u64) -> usize {
        // `partition_point` returns the count of bands whose threshold is <= price;
        // the first band starts at 0 so that count is always >= 1.
        self.bands.partition_point(|b| b.min_price <= price) - 1
    }

    pub fn band(&self, price: u64) -> &PriceBand {
        &self.bands[self.band_index(price)]
    }

    /// Encodes any numeric price. Total over finite non-negative input.
    pub fn encode(&self, price: f64) -> Result<PriceEncoding, InvalidPriceError> {
        if !price.is_finite() || price < 0.0 {
            return Err(InvalidPriceError { price });
        }
        let idx = self.bands.partition_point(|b| b.min_price as f64 <= price) - 1;
        let band = &self.bands[idx];
        Ok(PriceEncoding {
            band_index: idx,
            band: band.name.clone(),
            color: band.color.clone(),
            radius: band.radius,
        })
    }

    /// `[min, max)` price interval of the named band; `max` is `None` for the
    /// open-ended top band.
    pub fn band_range(&self, name: &str) -> Option<(u64, Option<u64>)> {
        let idx = self.bands.iter().position(|b| b.name == name)?;
        let max = self.bands.get(idx + 1).map(|b| b.min_price);
        Some((self.bands[idx].min_price, max))
    }
}

impl Default for PriceScale {
    fn default() -> Self {
        Self {
            bands: vec![
                PriceBand::new("entry", 0, "#3b82f6", 6),
                PriceBand::new("mid", 15_000_000, "#22c55e", 8),
                PriceBand::new("premium", 30_000_000, "#eab308", 10),
                PriceBand::new("luxury", 50_000_000, "#f97316", 12),
                PriceBand::new("ultra", 100_000_000, "#ef4444", 14),
            ],
        }
    }
}

impl TryFrom<Vec<PriceBand>> for PriceScale {
    type Error = PriceScaleError;

    fn try_from(bands: Vec<PriceBand>) -> Result<Self, Self::Error> {
        PriceScale::new(bands)
    }
}

impl From<PriceScale> for Vec<PriceBand> {
    fn from(scale: PriceScale) -> Self {
        scale.bands
    }
}

/// Short marker label: "12.5M ₽", "850K ₽", "900 ₽".
pub fn format_price(price: f64) -> String {
    if price >= 1_000_000.0 {
        format!("{:.1}M ₽", price / 1_000_000.0)
    } else if price >= 1_000.0 {
        format!("{:.0}K ₽", price / 1_000.0)
    } else {
        format!("{price:.0} ₽")
    }
}
