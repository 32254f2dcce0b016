use std::fmt;

use crate::listing::ListingId;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeometryProblem {
    MissingCoordinate,
    NonFinite,
    OutOfRange,
}

/// A listing cannot be placed on the map.
///
/// Recovered by excluding the listing from spatial views only; it stays in
/// the dataset for tabular use.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidGeometryError {
    pub id: ListingId,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub problem: GeometryProblem,
}

impl fmt::Display for InvalidGeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.problem {
            GeometryProblem::MissingCoordinate => "missing coordinate",
            GeometryProblem::NonFinite => "non-finite coordinate",
            GeometryProblem::OutOfRange => "coordinate out of range",
        };
        write!(
            f,
            "listing {} has invalid geometry ({what}): lat={:?} lng={:?}",
            self.id, self.latitude, self.longitude
        )
    }
}

impl std::error::Error for InvalidGeometryError {}
