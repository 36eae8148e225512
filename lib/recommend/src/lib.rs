//! # simdex Recommend
//!
//! Recommendation facade for the simdex similarity engine: similarity
//! lookups with self-exclusion, category-filtered search, category
//! popularity and recent-view personalization, composed over the vector
//! store and the embedding generator.

pub mod recommender;
pub mod signals;

pub use recommender::{Recommendation, RecommendationKind, Recommender};
pub use signals::{
    MemoryPopularityCounter, MemoryProductCatalog, MemoryRecentViews, PopularityCounter,
    ProductCatalog, RecentViews,
};
