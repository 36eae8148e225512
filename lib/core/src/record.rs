use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar attribute value carried in product metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Int(i) => write!(f, "{}", i),
            ScalarValue::Float(x) => write!(f, "{}", x),
            ScalarValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Int(i)
    }
}

impl From<f64> for ScalarValue {
    fn from(x: f64) -> Self {
        ScalarValue::Float(x)
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Text(s)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Text(s.to_string())
    }
}

/// Metadata stored alongside a product vector.
///
/// Known display/filter fields are explicit; everything else a producer
/// attaches rides in `extra` as string-keyed scalars. Not consulted for
/// similarity scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Set by the store at upsert time when the producer left it empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, ScalarValue>,
}

impl ProductMetadata {
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// One entry of a similarity query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub product_id: String,
    pub score: f32,
    pub metadata: ProductMetadata,
}

/// Observability snapshot of a store backend.
///
/// `fill_ratio` is the fraction of index slots holding live records; a
/// plain record map reports 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreStats {
    pub count: usize,
    pub dimension: usize,
    pub fill_ratio: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_value_untagged_serde() {
        let json = serde_json::json!({"size": "xl", "stock": 3, "weight": 1.5, "active": true});
        let extra: BTreeMap<String, ScalarValue> = serde_json::from_value(json).unwrap();
        assert_eq!(extra["size"], ScalarValue::Text("xl".to_string()));
        assert_eq!(extra["stock"], ScalarValue::Int(3));
        assert_eq!(extra["weight"], ScalarValue::Float(1.5));
        assert_eq!(extra["active"], ScalarValue::Bool(true));
    }

    #[test]
    fn test_metadata_roundtrip() {
        let meta = ProductMetadata::default()
            .with_name("Trail runner")
            .with_category("shoes")
            .with_price(89.9)
            .with_extra("brand", "acme");
        let json = serde_json::to_string(&meta).unwrap();
        let back: ProductMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
