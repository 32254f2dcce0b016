use std::fmt;

/// The listing feed could not be obtained or understood.
///
/// Recovered by the caller: fall back to an empty dataset and show a
/// non-blocking notice.
#[derive(Debug)]
pub enum DataFetchError {
    Network(String),
    Status { code: u16, url: String },
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnsupportedShape,
}

impl fmt::Display for DataFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFetchError::Network(msg) => write!(f, "feed request failed: {msg}"),
            DataFetchError::Status { code, url } => {
                write!(f, "feed request to {url} returned HTTP {code}")
            }
            DataFetchError::Io(err) => write!(f, "I/O error: {err}"),
            DataFetchError::Parse(err) => write!(f, "feed parse error: {err}"),
            DataFetchError::UnsupportedShape => write!(
                f,
                "feed is neither a FeatureCollection, a listing array nor a page of items"
            ),
        }
    }
}

impl std::error::Error for DataFetchError {}
