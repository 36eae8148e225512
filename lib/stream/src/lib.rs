//! # simdex Stream
//!
//! Event log and indexer for the simdex similarity engine.
//!
//! This crate provides the event-driven index maintenance path:
//!
//! - [`ProductEvent`] / [`EventKind`] / [`DeliveryId`] - Event model
//! - [`EventLog`] - Append-only log with consumer-group semantics
//! - [`MemoryEventLog`] - Partitioned in-memory backend (ordered per product)
//! - [`TableEventLog`] - Polling-table backend (global ordering, higher latency)
//! - [`ProductEventProducer`] - Publish helpers for lifecycle events
//! - [`EventIndexer`] - Consumer state machine applying events idempotently
//!
//! Delivery is at-least-once: entries claimed but never acknowledged are
//! redelivered after a visibility timeout, so the indexer's store
//! mutations are idempotent by construction.

pub mod consumer;
pub mod error;
pub mod event;
pub mod log;
pub mod memory;
pub mod producer;
pub mod table;

pub use consumer::{ConsumerState, EventIndexer, IndexerConfig};
pub use error::{Result, StreamError};
pub use event::{ClaimedEvent, DeliveryId, EventKind, ProductEvent};
pub use log::EventLog;
pub use memory::{MemoryEventLog, MemoryLogConfig};
pub use producer::ProductEventProducer;
pub use table::{TableEventLog, TableLogConfig};
