use crate::{ProductMetadata, ScalarValue};

/// Filter over the typed metadata carried by each record.
#[derive(Debug, Clone)]
pub enum MetadataFilter {
    Category(String),
    PriceUnder(f64),
    PriceAtLeast(f64),
    Extra { key: String, value: ScalarValue },
    And(Vec<MetadataFilter>),
    Or(Vec<MetadataFilter>),
    Not(Box<MetadataFilter>),
}

impl MetadataFilter {
    pub fn matches(&self, metadata: &ProductMetadata) -> bool {
        match self {
            MetadataFilter::Category(category) => {
                metadata.category.as_deref() == Some(category.as_str())
            }
            MetadataFilter::PriceUnder(bound) => {
                metadata.price.map(|p| p < *bound).unwrap_or(false)
            }
            MetadataFilter::PriceAtLeast(bound) => {
                metadata.price.map(|p| p >= *bound).unwrap_or(false)
            }
            MetadataFilter::Extra { key, value } => metadata.extra.get(key) == Some(value),
            MetadataFilter::And(filters) => filters.iter().all(|f| f.matches(metadata)),
            MetadataFilter::Or(filters) => filters.iter().any(|f| f.matches(metadata)),
            MetadataFilter::Not(filter) => !filter.matches(metadata),
        }
    }
}
