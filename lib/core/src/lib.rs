//! # simdex Core
//!
//! Core library for the simdex similarity engine.
//!
//! This crate provides the store-side building blocks:
//!
//! - [`Vector`] - Dense vector with cosine operations
//! - [`ProductMetadata`] / [`ScalarValue`] - Typed record metadata
//! - [`VectorStore`] - Backend-agnostic store contract
//! - [`LocalVectorStore`] - In-process backend with an incremental ANN graph
//! - [`RemoteVectorStore`] - Managed vector database over a JSON contract
//! - [`MetadataFilter`] - Category/price/attribute filtering
//!
//! ## Example
//!
//! ```rust
//! use simdex_core::{LocalStoreConfig, LocalVectorStore, ProductMetadata, Vector, VectorStore};
//!
//! let store = LocalVectorStore::new(LocalStoreConfig {
//!     name: "products".to_string(),
//!     dimension: 3,
//!     use_ann: false,
//! });
//!
//! let metadata = ProductMetadata::default().with_category("shoes");
//! store.upsert("p1", Vector::new(vec![1.0, 0.0, 0.0]), metadata).unwrap();
//!
//! let hits = store.query(&Vector::new(vec![1.0, 0.0, 0.0]), 10, 0.5).unwrap();
//! assert_eq!(hits[0].product_id, "p1");
//! ```

pub mod ann;
pub mod error;
pub mod filter;
pub mod local;
pub mod record;
pub mod remote;
pub mod store;
pub mod vector;

pub use ann::AnnIndex;
pub use error::{Error, Result};
pub use filter::MetadataFilter;
pub use local::{LocalStoreConfig, LocalVectorStore};
pub use record::{ProductMetadata, ScalarValue, SearchHit, StoreStats};
pub use remote::RemoteVectorStore;
pub use store::{rank_hits, VectorStore};
pub use vector::Vector;
