use std::cmp::Ordering;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use simdex_core::{MetadataFilter, Result, VectorStore};
use simdex_embed::{ProductDoc, TextEmbedder};

use crate::{PopularityCounter, ProductCatalog, RecentViews};

/// How many recent views seed personalization.
const RECENT_VIEW_WINDOW: usize = 5;
/// How many views the per-user history keeps.
const RECENT_VIEW_CAP: usize = 20;
/// Similarity fan-out per viewed item when personalizing.
const PER_SEED_LIMIT: usize = 3;

/// Where a recommendation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Similar,
    Search,
    PopularInCategory,
    Personalized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: String,
    pub score: f32,
    pub kind: RecommendationKind,
}

fn rank(recommendations: &mut Vec<Recommendation>, limit: usize) {
    recommendations.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    recommendations.truncate(limit);
}

/// Serving facade composing vector store queries with self-exclusion,
/// category filters and personalization signals. Failures surface as
/// `Err` with a readable cause; absence is an empty result, never an
/// error.
pub struct Recommender {
    store: Arc<dyn VectorStore>,
    embedder: Arc<TextEmbedder>,
    popularity: Arc<dyn PopularityCounter>,
    views: Arc<dyn RecentViews>,
    catalog: Option<Arc<dyn ProductCatalog>>,
    default_min_score: f32,
}

impl Recommender {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<TextEmbedder>,
        popularity: Arc<dyn PopularityCounter>,
        views: Arc<dyn RecentViews>,
        default_min_score: f32,
    ) -> Self {
        Self {
            store,
            embedder,
            popularity,
            views,
            catalog: None,
            default_min_score,
        }
    }

    /// Attach a catalog for hydration and view-to-category resolution.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn min_score(&self, min_score: Option<f32>) -> f32 {
        min_score.unwrap_or(self.default_min_score)
    }

    /// Products similar to a stored one. Absent id yields an empty list;
    /// the product itself is never part of its own result.
    pub fn similar_to(
        &self,
        product_id: &str,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<Recommendation>> {
        let Some(vector) = self.store.fetch(product_id)? else {
            debug!(product_id, "no stored embedding, returning empty result");
            return Ok(Vec::new());
        };
        // One extra to absorb the self-match.
        let hits = self
            .store
            .query(&vector, limit + 1, self.min_score(min_score))?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.product_id != product_id)
            .take(limit)
            .map(|hit| Recommendation {
                product_id: hit.product_id,
                score: hit.score,
                kind: RecommendationKind::Similar,
            })
            .collect())
    }

    /// `similar_to` constrained to one category.
    pub fn similar_to_in_category(
        &self,
        product_id: &str,
        category: &str,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<Recommendation>> {
        let Some(vector) = self.store.fetch(product_id)? else {
            return Ok(Vec::new());
        };
        let filter = MetadataFilter::Category(category.to_string());
        let hits =
            self.store
                .query_filtered(&vector, limit + 1, self.min_score(min_score), &filter)?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.product_id != product_id)
            .take(limit)
            .map(|hit| Recommendation {
                product_id: hit.product_id,
                score: hit.score,
                kind: RecommendationKind::Similar,
            })
            .collect())
    }

    /// Free-text similarity search. No self to exclude.
    pub fn similar_to_text(
        &self,
        query_text: &str,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<Recommendation>> {
        let vector = self.embedder.embed(query_text);
        let hits = self.store.query(&vector, limit, self.min_score(min_score))?;
        Ok(hits
            .into_iter()
            .map(|hit| Recommendation {
                product_id: hit.product_id,
                score: hit.score,
                kind: RecommendationKind::Search,
            })
            .collect())
    }

    /// Ids ranked by category view count.
    pub fn popular_in_category(&self, category: &str, limit: usize) -> Vec<Recommendation> {
        self.popularity
            .top_n(category, limit)
            .into_iter()
            .map(|(product_id, count)| Recommendation {
                product_id,
                score: count as f32 / 100.0,
                kind: RecommendationKind::PopularInCategory,
            })
            .collect()
    }

    /// Recommendations seeded by the user's recent views: similar items
    /// per seed, merged keeping the best score per product, already-viewed
    /// ids excluded.
    pub fn personalized(&self, user_id: &str, limit: usize) -> Result<Vec<Recommendation>> {
        let recent = self.views.get(user_id, RECENT_VIEW_WINDOW);
        if recent.is_empty() {
            debug!(user_id, "no recent views, returning empty result");
            return Ok(Vec::new());
        }

        let mut best: AHashMap<String, f32> = AHashMap::default();
        for viewed in &recent {
            for rec in self.similar_to(viewed, PER_SEED_LIMIT, None)? {
                best.entry(rec.product_id)
                    .and_modify(|score| *score = score.max(rec.score))
                    .or_insert(rec.score);
            }
        }
        for viewed in &recent {
            best.remove(viewed);
        }

        let mut merged: Vec<Recommendation> = best
            .into_iter()
            .map(|(product_id, score)| Recommendation {
                product_id,
                score,
                kind: RecommendationKind::Personalized,
            })
            .collect();
        rank(&mut merged, limit);
        Ok(merged)
    }

    /// Record a view for personalization and category popularity. The
    /// category comes from the catalog when one is attached.
    pub fn track_view(&self, user_id: &str, product_id: &str) {
        if user_id.is_empty() || product_id.is_empty() {
            return;
        }
        self.views.push_front(user_id, product_id, RECENT_VIEW_CAP);
        if let Some(catalog) = &self.catalog {
            if let Some(category) = catalog.get(product_id).and_then(|doc| doc.category) {
                self.popularity.increment(&category, product_id);
            }
        }
        debug!(user_id, product_id, "tracked product view");
    }

    /// Attach full catalog records where available.
    pub fn hydrate(
        &self,
        recommendations: &[Recommendation],
    ) -> Vec<(Recommendation, Option<ProductDoc>)> {
        recommendations
            .iter()
            .map(|rec| {
                let doc = self
                    .catalog
                    .as_ref()
                    .and_then(|catalog| catalog.get(&rec.product_id));
                (rec.clone(), doc)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryPopularityCounter, MemoryProductCatalog, MemoryRecentViews};
    use simdex_core::{LocalStoreConfig, LocalVectorStore};

    const DIM: usize = 64;

    struct Harness {
        store: Arc<LocalVectorStore>,
        embedder: Arc<TextEmbedder>,
        views: Arc<MemoryRecentViews>,
        catalog: Arc<MemoryProductCatalog>,
        recommender: Recommender,
    }

    fn harness() -> Harness {
        let store = Arc::new(LocalVectorStore::new(LocalStoreConfig {
            name: "test".to_string(),
            dimension: DIM,
            use_ann: false,
        }));
        let embedder = Arc::new(TextEmbedder::new(DIM));
        let popularity = Arc::new(MemoryPopularityCounter::new());
        let views = Arc::new(MemoryRecentViews::new());
        let catalog = Arc::new(MemoryProductCatalog::new());
        let recommender = Recommender::new(
            Arc::clone(&store) as Arc<dyn VectorStore>,
            Arc::clone(&embedder),
            Arc::clone(&popularity) as Arc<dyn PopularityCounter>,
            Arc::clone(&views) as Arc<dyn RecentViews>,
            0.1,
        )
        .with_catalog(Arc::clone(&catalog) as Arc<dyn ProductCatalog>);
        Harness {
            store,
            embedder,
            views,
            catalog,
            recommender,
        }
    }

    fn index(h: &Harness, id: &str, name: &str, category: &str) {
        let doc = ProductDoc {
            id: id.to_string(),
            name: Some(name.to_string()),
            category: Some(category.to_string()),
            ..Default::default()
        };
        h.store
            .upsert(id, h.embedder.embed_product(&doc), doc.metadata())
            .unwrap();
        h.catalog.put(doc);
    }

    #[test]
    fn test_similar_to_excludes_self() {
        let h = harness();
        index(&h, "a", "red sneakers", "shoes");
        index(&h, "b", "red running shoes", "shoes");
        index(&h, "c", "red trail shoes", "shoes");

        let recs = h.recommender.similar_to("a", 5, Some(0.0)).unwrap();
        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| r.product_id != "a"));
    }

    #[test]
    fn test_similar_to_absent_id_is_empty() {
        let h = harness();
        assert!(h.recommender.similar_to("ghost", 5, None).unwrap().is_empty());
    }

    #[test]
    fn test_similar_to_text_ranks_by_similarity() {
        let h = harness();
        index(&h, "a", "red sneakers", "shoes");
        index(&h, "b", "blue jacket", "clothing");

        let recs = h
            .recommender
            .similar_to_text("red running shoes", 5, Some(0.3))
            .unwrap();
        assert_eq!(recs[0].product_id, "a");
        assert!(recs.iter().all(|r| r.product_id != "b"));
        assert!(recs.iter().all(|r| r.kind == RecommendationKind::Search));
    }

    #[test]
    fn test_similar_to_in_category_filters() {
        let h = harness();
        index(&h, "a", "red sneakers", "shoes");
        index(&h, "b", "red running shoes", "shoes");
        index(&h, "c", "red shirt", "clothing");

        let recs = h
            .recommender
            .similar_to_in_category("a", "shoes", 5, Some(0.0))
            .unwrap();
        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| r.product_id == "b"));
    }

    #[test]
    fn test_popular_in_category() {
        let h = harness();
        index(&h, "a", "red sneakers", "shoes");
        index(&h, "b", "trail boots", "shoes");
        h.recommender.track_view("u1", "a");
        h.recommender.track_view("u2", "a");
        h.recommender.track_view("u1", "b");

        let recs = h.recommender.popular_in_category("shoes", 5);
        assert_eq!(recs[0].product_id, "a");
        assert_eq!(recs[1].product_id, "b");
        assert!(recs[0].score > recs[1].score);
    }

    #[test]
    fn test_personalized_excludes_viewed_and_dedupes() {
        let h = harness();
        index(&h, "a", "red sneakers", "shoes");
        index(&h, "b", "red running shoes", "shoes");
        index(&h, "c", "red trail shoes", "shoes");
        index(&h, "d", "red walking shoes", "shoes");

        h.recommender.track_view("u1", "a");
        h.recommender.track_view("u1", "b");

        let recs = h.recommender.personalized("u1", 10).unwrap();
        assert!(!recs.is_empty());
        // Viewed products never come back.
        assert!(recs.iter().all(|r| r.product_id != "a" && r.product_id != "b"));
        // Each product appears once.
        let mut ids: Vec<&str> = recs.iter().map(|r| r.product_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), recs.len());
        for pair in recs.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_personalized_without_history_is_empty() {
        let h = harness();
        index(&h, "a", "red sneakers", "shoes");
        assert!(h.recommender.personalized("nobody", 5).unwrap().is_empty());
    }

    #[test]
    fn test_hydrate_attaches_catalog_records() {
        let h = harness();
        index(&h, "a", "red sneakers", "shoes");
        let recs = vec![Recommendation {
            product_id: "a".to_string(),
            score: 0.9,
            kind: RecommendationKind::Similar,
        }];
        let hydrated = h.recommender.hydrate(&recs);
        assert_eq!(hydrated[0].1.as_ref().unwrap().name.as_deref(), Some("red sneakers"));
    }

    #[test]
    fn test_track_view_trims_history() {
        let h = harness();
        for i in 0..30 {
            h.recommender.track_view("u1", &format!("p{}", i));
        }
        assert_eq!(h.views.get("u1", 100).len(), RECENT_VIEW_CAP);
    }
}
