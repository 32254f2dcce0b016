use compute::GroupAggregate;
use foundation::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::error::DataFetchError;

/// One row of the district/complex aggregation feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    #[serde(alias = "district", alias = "key")]
    pub name: String,
    pub count: usize,
    #[serde(default)]
    pub avg_price: f64,
    #[serde(default)]
    pub min_price: f64,
    #[serde(default)]
    pub max_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_price: Option<f64>,
    #[serde(default)]
    pub avg_price_per_sqm: f64,
    #[serde(default)]
    pub avg_area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<GeoPoint>,
}

impl From<&GroupAggregate> for AggregateRow {
    fn from(aggregate: &GroupAggregate) -> Self {
        Self {
            name: aggregate.key.clone(),
            count: aggregate.count,
            avg_price: aggregate.avg_price,
            min_price: aggregate.min_price as f64,
            max_price: aggregate.max_price as f64,
            median_price: Some(aggregate.median_price),
            avg_price_per_sqm: aggregate.avg_price_per_sqm,
            avg_area: aggregate.avg_area,
            center: aggregate.center,
        }
    }
}

pub fn encode_aggregate_rows(aggregates: &[GroupAggregate]) -> Result<String, DataFetchError> {
    let rows: Vec<AggregateRow> = aggregates.iter().map(AggregateRow::from).collect();
    serde_json::to_string(&rows).map_err(DataFetchError::Parse)
}

/// Rows may arrive bare or wrapped as `{ "districts": [...] }`.
pub fn decode_aggregate_rows(payload: &str) -> Result<Vec<AggregateRow>, DataFetchError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Envelope {
        Rows(Vec<AggregateRow>),
        Districts { districts: Vec<AggregateRow> },
        Complexes { complexes: Vec<AggregateRow> },
    }

    let value: serde_json::Value = serde_json::from_str(payload).map_err(DataFetchError::Parse)?;
    match serde_json::from_value(value) {
        Ok(Envelope::Rows(rows))
        | Ok(Envelope::Districts { districts: rows })
        | Ok(Envelope::Complexes { complexes: rows }) => Ok(rows),
        Err(_) => Err(DataFetchError::UnsupportedShape),
    }
}

#[cfg(test)]
mod tests {
    use super::{AggregateRow, decode_aggregate_rows, encode_aggregate_rows};
    use compute::district_aggregates;
    use foundation::GeoPoint;
    use listings::Listing;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_district_rows() {
        let payload = r#"{ "districts": [
            { "district": "Адлер", "count": 2, "avg_price": 10.0, "min_price": 5,
              "max_price": 15, "avg_price_per_sqm": 1.5, "avg_area": 40,
              "center": { "lat": 43.43, "lng": 39.92 } }
        ] }"#;
        let rows = decode_aggregate_rows(payload).unwrap();
        assert_eq!(
            rows,
            vec![AggregateRow {
                name: "Адлер".to_string(),
                count: 2,
                avg_price: 10.0,
                min_price: 5.0,
                max_price: 15.0,
                median_price: None,
                avg_price_per_sqm: 1.5,
                avg_area: 40.0,
                center: Some(GeoPoint::new(43.43, 39.92)),
            }]
        );
    }

    #[test]
    fn encodes_computed_aggregates() {
        let listings = vec![
            Listing::new("a", 100, 10.0).with_district("Хоста"),
            Listing::new("b", 300, 10.0).with_district("Хоста"),
        ];
        let text = encode_aggregate_rows(&district_aggregates(&listings)).unwrap();
        let rows = decode_aggregate_rows(&text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Хоста");
        assert_eq!(rows[0].median_price, Some(200.0));
        assert_eq!(rows[0].center, None);
    }

    #[test]
    fn unknown_envelope_is_rejected() {
        assert!(decode_aggregate_rows(r#"{ "rows": 1 }"#).is_err());
    }
}
