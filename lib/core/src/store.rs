use std::cmp::Ordering;

use crate::{MetadataFilter, ProductMetadata, Result, SearchHit, StoreStats, Vector};

/// Backend-agnostic contract for the product vector store.
///
/// Implementations must be safe for concurrent upsert/query/delete; an
/// upsert is visible to queries issued after it returns.
pub trait VectorStore: Send + Sync {
    /// Replace any existing record for `product_id` with the given vector
    /// and metadata, as one unit. A vector whose length differs from the
    /// store dimension is rejected, never padded. Fills
    /// `metadata.updated_at` when the producer left it empty.
    fn upsert(&self, product_id: &str, vector: Vector, metadata: ProductMetadata) -> Result<()>;

    /// Top-`limit` records by cosine similarity to `query`, each scoring
    /// at least `min_score`, ordered by score descending with ties broken
    /// by id ascending.
    fn query(&self, query: &Vector, limit: usize, min_score: f32) -> Result<Vec<SearchHit>>;

    /// `query` restricted to records whose metadata matches `filter`.
    ///
    /// The default filters after the fact, so a heavily filtered query may
    /// return fewer than `limit` hits; backends that can push the filter
    /// below the candidate cut should override this.
    fn query_filtered(
        &self,
        query: &Vector,
        limit: usize,
        min_score: f32,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchHit>> {
        let hits = self.query(query, limit, min_score)?;
        Ok(hits
            .into_iter()
            .filter(|hit| filter.matches(&hit.metadata))
            .collect())
    }

    /// Stored vector for `product_id`, or `None` when absent.
    fn fetch(&self, product_id: &str) -> Result<Option<Vector>>;

    /// Remove the record for `product_id`. Deleting an absent id is a
    /// no-op success.
    fn delete(&self, product_id: &str) -> Result<()>;

    /// Optional capability; backends without cheap counts return `None`.
    fn stats(&self) -> Option<StoreStats> {
        None
    }
}

/// Sort by descending score, ties broken by ascending id, then cut to
/// `limit`. Every ranked surface in the engine routes through this so
/// result order is deterministic.
pub fn rank_hits(hits: &mut Vec<SearchHit>, limit: usize) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    hits.truncate(limit);
}
