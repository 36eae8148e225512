use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use simdex_core::{ProductMetadata, ScalarValue, Vector};

use crate::vectorizer::{TfIdfVectorizer, SEED_CORPUS};

/// Product document carried in create/update event payloads. Update
/// events may be partial; absent fields simply contribute nothing to the
/// embedding text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDoc {
    /// May be absent in partial update payloads; the indexer fills it from
    /// the event envelope.
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, ScalarValue>,
}

impl ProductDoc {
    /// Store metadata derived from this document. `updated_at` is left for
    /// the store to stamp.
    pub fn metadata(&self) -> ProductMetadata {
        ProductMetadata {
            name: self.name.clone(),
            category: self.category.clone(),
            price: self.price,
            updated_at: None,
            extra: self.attributes.clone(),
        }
    }
}

/// Deterministic text embedder: TF-IDF features over a vocabulary fitted
/// once at construction, reconciled to the configured dimension and
/// L2-normalized.
///
/// `embed` never fails; empty or fully out-of-vocabulary input yields the
/// zero vector.
pub struct TextEmbedder {
    vectorizer: TfIdfVectorizer,
    dimension: usize,
}

impl TextEmbedder {
    pub fn new(dimension: usize) -> Self {
        let vectorizer = TfIdfVectorizer::fit(SEED_CORPUS, dimension);
        debug!(
            dimension,
            vocabulary = vectorizer.vocabulary_size(),
            "embedding model initialized"
        );
        Self {
            vectorizer,
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed arbitrary text into a unit vector of exactly `dimension`
    /// floats. Padding/truncation to the dimension happens before
    /// normalization.
    pub fn embed(&self, text: &str) -> Vector {
        let mut features = self.vectorizer.transform(text);
        features.resize(self.dimension, 0.0);
        let mut vector = Vector::new(features);
        vector.normalize();
        vector
    }

    pub fn embed_all(&self, texts: &[&str]) -> Vec<Vector> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Embed a product document via its composite text.
    pub fn embed_product(&self, doc: &ProductDoc) -> Vector {
        self.embed(&Self::product_text(doc))
    }

    /// Composite text: name, description, labeled category, then sorted
    /// `key: value` attribute pairs, space-joined.
    pub fn product_text(doc: &ProductDoc) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(name) = &doc.name {
            parts.push(name.clone());
        }
        if let Some(description) = &doc.description {
            parts.push(description.clone());
        }
        if let Some(category) = &doc.category {
            parts.push(format!("Category: {}", category));
        }
        for (key, value) in &doc.attributes {
            parts.push(format!("{}: {}", key, value));
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, category: &str) -> ProductDoc {
        ProductDoc {
            id: "p1".to_string(),
            name: Some(name.to_string()),
            category: Some(category.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_embed_dimension_and_norm() {
        let embedder = TextEmbedder::new(384);
        let vector = embedder.embed("red running shoes");
        assert_eq!(vector.dim(), 384);
        assert!((vector.l2_norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_embed_empty_is_zero_vector() {
        let embedder = TextEmbedder::new(64);
        let vector = embedder.embed("");
        assert_eq!(vector.dim(), 64);
        assert_eq!(vector.l2_norm(), 0.0);
    }

    #[test]
    fn test_embed_deterministic() {
        let embedder = TextEmbedder::new(384);
        assert_eq!(
            embedder.embed("blue cotton jacket"),
            embedder.embed("blue cotton jacket")
        );
    }

    #[test]
    fn test_small_dimension_truncates_before_normalizing() {
        let embedder = TextEmbedder::new(8);
        let vector = embedder.embed("red running shoes sneakers jacket");
        assert_eq!(vector.dim(), 8);
        let norm = vector.l2_norm();
        assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_product_text_field_order() {
        let mut product = doc("Trail runner", "shoes");
        product.description = Some("lightweight mesh".to_string());
        product
            .attributes
            .insert("color".to_string(), ScalarValue::Text("red".to_string()));
        product
            .attributes
            .insert("brand".to_string(), ScalarValue::Text("acme".to_string()));

        let text = TextEmbedder::product_text(&product);
        assert_eq!(
            text,
            "Trail runner lightweight mesh Category: shoes brand: acme color: red"
        );
    }

    #[test]
    fn test_similar_products_score_higher() {
        let embedder = TextEmbedder::new(384);
        let query = embedder.embed("red running shoes");
        let close = embedder.embed_product(&doc("red sneakers", "shoes"));
        let far = embedder.embed_product(&doc("blue jacket", "clothing"));

        let close_score = query.cosine_similarity(&close);
        let far_score = query.cosine_similarity(&far);
        assert!(
            close_score > far_score,
            "expected {} > {}",
            close_score,
            far_score
        );
        assert!(close_score >= 0.3);
    }
}
