//! # simdex
//!
//! A product similarity engine with event-driven index maintenance.
//!
//! simdex ingests product create/update/delete events from an append-only
//! log, regenerates embeddings, keeps an approximate-nearest-neighbor
//! index consistent with the stream, and serves top-K cosine similarity
//! queries and recommendations above a score floor. Vector store and
//! event log backends are picked once at startup.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use simdex::prelude::*;
//!
//! let context = ServiceContext::from_config(AppConfig::default()).unwrap();
//! let producer = context.producer();
//! let indexers = context.spawn_indexers().unwrap();
//!
//! let doc = ProductDoc {
//!     id: "p1".to_string(),
//!     name: Some("red sneakers".to_string()),
//!     category: Some("shoes".to_string()),
//!     ..Default::default()
//! };
//! producer.publish_created(&doc).unwrap();
//!
//! // ... later, once the indexers have drained the log:
//! let similar = context.recommender.similar_to("p1", 5, None).unwrap();
//! for indexer in &indexers {
//!     indexer.stop();
//! }
//! # drop(similar);
//! ```
//!
//! ## Crate Structure
//!
//! - `simdex-core` - Vector store contract, local ANN backend, remote backend
//! - `simdex-embed` - Deterministic TF-IDF embedding generator
//! - `simdex-stream` - Event log, consumer groups, idempotent indexer
//! - `simdex-recommend` - Similarity/popularity/personalization facade

pub mod config;
pub mod context;

// Re-export core types
pub use simdex_core::{
    AnnIndex, Error, LocalStoreConfig, LocalVectorStore, MetadataFilter, ProductMetadata,
    RemoteVectorStore, Result, ScalarValue, SearchHit, StoreStats, Vector, VectorStore,
};

// Re-export embedding
pub use simdex_embed::{ProductDoc, TextEmbedder, TfIdfVectorizer};

// Re-export streaming
pub use simdex_stream::{
    ClaimedEvent, ConsumerState, DeliveryId, EventIndexer, EventKind, EventLog, IndexerConfig,
    MemoryEventLog, MemoryLogConfig, ProductEvent, ProductEventProducer, StreamError,
    TableEventLog, TableLogConfig,
};

// Re-export recommendation surfaces
pub use simdex_recommend::{
    MemoryPopularityCounter, MemoryProductCatalog, MemoryRecentViews, PopularityCounter,
    ProductCatalog, Recommendation, RecommendationKind, RecentViews, Recommender,
};

pub use config::{AppConfig, EventBackend, VectorBackend};
pub use context::ServiceContext;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AppConfig, Error, EventBackend, EventIndexer, EventKind, EventLog, LocalStoreConfig,
        LocalVectorStore, MetadataFilter, ProductDoc, ProductEvent, ProductEventProducer,
        ProductMetadata, Recommendation, Recommender, Result, ScalarValue, SearchHit,
        ServiceContext, TextEmbedder, Vector, VectorBackend, VectorStore,
    };
}
