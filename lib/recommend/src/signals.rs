use std::collections::VecDeque;

use ahash::AHashMap;
use parking_lot::Mutex;

use simdex_embed::ProductDoc;

/// View-count popularity, keyed by category.
pub trait PopularityCounter: Send + Sync {
    /// Atomically bump the view count for a product within a category.
    fn increment(&self, category: &str, product_id: &str);

    /// Top `n` products of a category by count descending, count ties
    /// broken by ascending id.
    fn top_n(&self, category: &str, n: usize) -> Vec<(String, u64)>;
}

/// Bounded most-recent-first view history per user.
pub trait RecentViews: Send + Sync {
    fn push_front(&self, user_id: &str, product_id: &str, max_len: usize);
    fn get(&self, user_id: &str, n: usize) -> Vec<String>;
}

/// Full product records for hydration at the serving edge. The indexing
/// path never consults this.
pub trait ProductCatalog: Send + Sync {
    fn get(&self, product_id: &str) -> Option<ProductDoc>;
    fn put(&self, doc: ProductDoc);
    fn delete(&self, product_id: &str);
    fn list(&self, category: Option<&str>, limit: usize, offset: usize) -> Vec<ProductDoc>;
}

/// In-memory counter. The lock makes each increment a single atomic
/// read-modify-write.
#[derive(Default)]
pub struct MemoryPopularityCounter {
    counts: Mutex<AHashMap<String, AHashMap<String, u64>>>,
}

impl MemoryPopularityCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PopularityCounter for MemoryPopularityCounter {
    fn increment(&self, category: &str, product_id: &str) {
        let mut counts = self.counts.lock();
        *counts
            .entry(category.to_string())
            .or_default()
            .entry(product_id.to_string())
            .or_insert(0) += 1;
    }

    fn top_n(&self, category: &str, n: usize) -> Vec<(String, u64)> {
        let counts = self.counts.lock();
        let Some(per_product) = counts.get(category) else {
            return Vec::new();
        };
        let mut ranked: Vec<(String, u64)> = per_product
            .iter()
            .map(|(id, count)| (id.clone(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

/// In-memory recent-view lists.
#[derive(Default)]
pub struct MemoryRecentViews {
    views: Mutex<AHashMap<String, VecDeque<String>>>,
}

impl MemoryRecentViews {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecentViews for MemoryRecentViews {
    fn push_front(&self, user_id: &str, product_id: &str, max_len: usize) {
        let mut views = self.views.lock();
        let list = views.entry(user_id.to_string()).or_default();
        list.push_front(product_id.to_string());
        list.truncate(max_len);
    }

    fn get(&self, user_id: &str, n: usize) -> Vec<String> {
        let views = self.views.lock();
        views
            .get(user_id)
            .map(|list| list.iter().take(n).cloned().collect())
            .unwrap_or_default()
    }
}

/// In-memory product catalog.
#[derive(Default)]
pub struct MemoryProductCatalog {
    products: Mutex<AHashMap<String, ProductDoc>>,
}

impl MemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductCatalog for MemoryProductCatalog {
    fn get(&self, product_id: &str) -> Option<ProductDoc> {
        self.products.lock().get(product_id).cloned()
    }

    fn put(&self, doc: ProductDoc) {
        self.products.lock().insert(doc.id.clone(), doc);
    }

    fn delete(&self, product_id: &str) {
        self.products.lock().remove(product_id);
    }

    fn list(&self, category: Option<&str>, limit: usize, offset: usize) -> Vec<ProductDoc> {
        let products = self.products.lock();
        let mut matched: Vec<ProductDoc> = products
            .values()
            .filter(|doc| match category {
                Some(category) => doc.category.as_deref() == Some(category),
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        matched.into_iter().skip(offset).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popularity_ranking_and_ties() {
        let counter = MemoryPopularityCounter::new();
        counter.increment("shoes", "b");
        counter.increment("shoes", "b");
        counter.increment("shoes", "a");
        counter.increment("shoes", "c");

        let top = counter.top_n("shoes", 2);
        assert_eq!(top, vec![("b".to_string(), 2), ("a".to_string(), 1)]);
        assert!(counter.top_n("jackets", 5).is_empty());
    }

    #[test]
    fn test_recent_views_bounded_most_recent_first() {
        let views = MemoryRecentViews::new();
        for i in 0..6 {
            views.push_front("u1", &format!("p{}", i), 4);
        }
        let recent = views.get("u1", 10);
        assert_eq!(recent, vec!["p5", "p4", "p3", "p2"]);
        assert_eq!(views.get("u1", 2), vec!["p5", "p4"]);
        assert!(views.get("nobody", 5).is_empty());
    }

    #[test]
    fn test_catalog_list_filters_and_pages() {
        let catalog = MemoryProductCatalog::new();
        for (id, category) in [("a", "shoes"), ("b", "jackets"), ("c", "shoes")] {
            catalog.put(ProductDoc {
                id: id.to_string(),
                category: Some(category.to_string()),
                ..Default::default()
            });
        }
        let shoes = catalog.list(Some("shoes"), 10, 0);
        let ids: Vec<&str> = shoes.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let paged = catalog.list(None, 1, 1);
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, "b");

        catalog.delete("a");
        assert!(catalog.get("a").is_none());
    }
}
