use crate::aggregate_feed::{AggregateRow, decode_aggregate_rows};
use crate::error::DataFetchError;
use crate::feed::{NormalizedFeed, decode_listings};

pub const LISTINGS_PATH: &str = "/api/v1/heatmap";
pub const DISTRICTS_PATH: &str = "/api/v1/heatmap/districts";

/// Server-side narrowing supported by the feed endpoint. Everything else is
/// filtered locally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedQuery {
    pub district: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
}

impl FeedQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(district) = &self.district {
            pairs.push(("district", district.clone()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.to_string()));
        }
        pairs
    }
}

/// Reads the listing and district feeds from the CRUD API.
pub struct HttpFeedSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn fetch_listings(&self, query: &FeedQuery) -> Result<NormalizedFeed, DataFetchError> {
        let text = self.get_text(LISTINGS_PATH, &query.pairs()).await?;
        decode_listings(&text)
    }

    pub async fn fetch_district_rows(&self, days: u32) -> Result<Vec<AggregateRow>, DataFetchError> {
        let text = self
            .get_text(DISTRICTS_PATH, &[("days", days.to_string())])
            .await?;
        decode_aggregate_rows(&text)
    }

    async fn get_text(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<String, DataFetchError> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "fetching feed");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| DataFetchError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DataFetchError::Status {
                code: resp.status().as_u16(),
                url,
            });
        }

        resp.text()
            .await
            .map_err(|e| DataFetchError::Network(format!("failed to read response: {e}")))
    }
}
