use ahash::AHashMap;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use crate::store::rank_hits;
use crate::{
    AnnIndex, Error, MetadataFilter, ProductMetadata, Result, SearchHit, StoreStats, Vector,
    VectorStore,
};

/// Configuration for a local store instance.
#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    pub name: String,
    pub dimension: usize,
    /// Disabled means exact linear scan, the reference for correctness.
    pub use_ann: bool,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            name: "products".to_string(),
            dimension: 384,
            use_ann: true,
        }
    }
}

struct StoredRecord {
    vector: Vector,
    normalized: Vector,
    metadata: ProductMetadata,
}

/// In-process vector store: a record map plus an optional incremental ANN
/// graph over the normalized vectors.
///
/// The write lock serializes mutations, so racing upserts for one id
/// cannot interleave; readers see the most recent committed snapshot.
pub struct LocalVectorStore {
    config: LocalStoreConfig,
    records: RwLock<AHashMap<String, StoredRecord>>,
    index: Option<RwLock<AnnIndex>>,
}

impl LocalVectorStore {
    pub fn new(config: LocalStoreConfig) -> Self {
        let index = config
            .use_ann
            .then(|| RwLock::new(AnnIndex::new(config.dimension, 16, 4)));
        Self {
            config,
            records: RwLock::new(AHashMap::default()),
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn count(&self) -> usize {
        self.records.read().len()
    }

    /// Exact scan over every record. Also the query path when ANN is off.
    fn scan(
        &self,
        query_norm: &Vector,
        limit: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> Vec<SearchHit> {
        let records = self.records.read();
        let mut hits: Vec<SearchHit> = records
            .iter()
            .filter(|(_, record)| {
                filter
                    .map(|f| f.matches(&record.metadata))
                    .unwrap_or(true)
            })
            .map(|(id, record)| SearchHit {
                product_id: id.clone(),
                score: record.normalized.dot(query_norm),
                metadata: record.metadata.clone(),
            })
            .filter(|hit| hit.score >= min_score)
            .collect();
        rank_hits(&mut hits, limit);
        hits
    }

    /// ANN candidates joined back against the record map. Ids the graph
    /// still remembers but the map no longer holds are dropped, so a hit
    /// always has a stored vector behind it.
    fn search_ann(
        &self,
        index: &RwLock<AnnIndex>,
        query_norm: &Vector,
        candidates: usize,
        limit: usize,
        min_score: f32,
        filter: Option<&MetadataFilter>,
    ) -> Vec<SearchHit> {
        let found = index.read().search(query_norm, candidates);
        let records = self.records.read();
        let mut hits: Vec<SearchHit> = found
            .into_iter()
            .filter_map(|(id, score)| {
                let record = records.get(&id)?;
                if score < min_score {
                    return None;
                }
                if let Some(f) = filter {
                    if !f.matches(&record.metadata) {
                        return None;
                    }
                }
                Some(SearchHit {
                    product_id: id,
                    score,
                    metadata: record.metadata.clone(),
                })
            })
            .collect();
        rank_hits(&mut hits, limit);
        hits
    }
}

impl VectorStore for LocalVectorStore {
    fn upsert(&self, product_id: &str, vector: Vector, mut metadata: ProductMetadata) -> Result<()> {
        if vector.dim() != self.config.dimension {
            return Err(Error::InvalidDimension {
                expected: self.config.dimension,
                actual: vector.dim(),
            });
        }
        if metadata.updated_at.is_none() {
            metadata.updated_at = Some(Utc::now());
        }
        let normalized = vector.normalized();
        if let Some(index) = &self.index {
            index.write().insert(product_id, &normalized);
        }
        self.records.write().insert(
            product_id.to_string(),
            StoredRecord {
                vector,
                normalized,
                metadata,
            },
        );
        debug!(product_id, store = %self.config.name, "upserted embedding record");
        Ok(())
    }

    fn query(&self, query: &Vector, limit: usize, min_score: f32) -> Result<Vec<SearchHit>> {
        let query_norm = query.normalized();
        let hits = match &self.index {
            Some(index) => self.search_ann(index, &query_norm, limit, limit, min_score, None),
            None => self.scan(&query_norm, limit, min_score, None),
        };
        Ok(hits)
    }

    fn query_filtered(
        &self,
        query: &Vector,
        limit: usize,
        min_score: f32,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchHit>> {
        let query_norm = query.normalized();
        let hits = match &self.index {
            // Over-fetch so the filter has candidates to discard.
            Some(index) => self.search_ann(
                index,
                &query_norm,
                (limit * 4).max(32),
                limit,
                min_score,
                Some(filter),
            ),
            None => self.scan(&query_norm, limit, min_score, Some(filter)),
        };
        Ok(hits)
    }

    fn fetch(&self, product_id: &str) -> Result<Option<Vector>> {
        Ok(self
            .records
            .read()
            .get(product_id)
            .map(|record| record.vector.clone()))
    }

    fn delete(&self, product_id: &str) -> Result<()> {
        if let Some(index) = &self.index {
            index.write().remove(product_id);
        }
        let removed = self.records.write().remove(product_id).is_some();
        debug!(product_id, removed, "delete embedding record");
        Ok(())
    }

    fn stats(&self) -> Option<StoreStats> {
        let fill_ratio = match &self.index {
            Some(index) => {
                let index = index.read();
                if index.slots() == 0 {
                    1.0
                } else {
                    index.len() as f32 / index.slots() as f32
                }
            }
            None => 1.0,
        };
        Some(StoreStats {
            count: self.count(),
            dimension: self.config.dimension,
            fill_ratio,
        })
    }
}
