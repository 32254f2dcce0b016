use std::fmt;

use listings::ListingId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    UnknownListing(ListingId),
    /// The listing exists but has no valid position or is filtered out.
    NotOnMap(ListingId),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::UnknownListing(id) => write!(f, "no listing with id {id}"),
            SelectionError::NotOnMap(id) => write!(f, "listing {id} is not shown on the map"),
        }
    }
}

impl std::error::Error for SelectionError {}
