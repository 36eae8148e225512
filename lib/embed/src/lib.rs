//! # simdex Embed
//!
//! Embedding generator for the simdex similarity engine: deterministic
//! TF-IDF features over a fixed retail vocabulary, reconciled to the
//! configured dimension and L2-normalized.
//!
//! ## Example
//!
//! ```rust
//! use simdex_embed::TextEmbedder;
//!
//! let embedder = TextEmbedder::new(384);
//! let a = embedder.embed("red running shoes");
//! let b = embedder.embed("red sneakers");
//! assert!(a.cosine_similarity(&b) > 0.0);
//! ```

pub mod product;
pub mod vectorizer;

pub use product::{ProductDoc, TextEmbedder};
pub use vectorizer::TfIdfVectorizer;
