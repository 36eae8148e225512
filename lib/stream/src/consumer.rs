use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use simdex_core::VectorStore;
use simdex_embed::{ProductDoc, TextEmbedder};

use crate::{ClaimedEvent, EventKind, EventLog, Result, StreamError};

/// Consumer lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Stopped,
    Running,
    Stopping,
}

/// Tunables for one indexer instance.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub group: String,
    /// Consumer identity within the group; unique per instance.
    pub consumer: String,
    pub batch_size: usize,
    pub claim_block: Duration,
    /// Sleep after an empty batch or a failed claim.
    pub idle_backoff: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            group: "product-indexers".to_string(),
            consumer: format!("worker-{}", Uuid::new_v4()),
            batch_size: 10,
            claim_block: Duration::from_secs(2),
            idle_backoff: Duration::from_millis(500),
        }
    }
}

/// Warn-level throttle so a persistently failing backend does not storm
/// the log while entries cycle through redelivery.
struct WarnThrottle {
    every: Duration,
    last: Mutex<Option<Instant>>,
}

impl WarnThrottle {
    fn new(every: Duration) -> Self {
        Self {
            every,
            last: Mutex::new(None),
        }
    }

    fn allow(&self) -> bool {
        let mut last = self.last.lock();
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < self.every => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

/// Drains the event log and applies events idempotently to the vector
/// store.
///
/// Per-entry dispatch: create/update regenerates the embedding and
/// upserts, acking only on success so transient failures redeliver;
/// delete acks whether or not the record existed; malformed payloads and
/// unknown event types are logged and acked - retrying them never
/// succeeds and poison messages must not stall the partition.
pub struct EventIndexer {
    config: IndexerConfig,
    log: Arc<dyn EventLog>,
    store: Arc<dyn VectorStore>,
    embedder: Arc<TextEmbedder>,
    state: Mutex<ConsumerState>,
    stop: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
    throttle: WarnThrottle,
}

impl EventIndexer {
    pub fn new(
        config: IndexerConfig,
        log: Arc<dyn EventLog>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<TextEmbedder>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            log,
            store,
            embedder,
            state: Mutex::new(ConsumerState::Stopped),
            stop: AtomicBool::new(false),
            handle: Mutex::new(None),
            throttle: WarnThrottle::new(Duration::from_secs(5)),
        })
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.lock()
    }

    pub fn consumer_name(&self) -> &str {
        &self.config.consumer
    }

    /// Spawn the processing loop. Starting a running consumer is a warned
    /// no-op.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ConsumerState::Stopped {
                warn!(consumer = %self.config.consumer, "consumer is already running");
                return Ok(());
            }
            *state = ConsumerState::Running;
        }
        self.stop.store(false, Ordering::Release);

        let me = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("indexer-{}", self.config.consumer))
            .spawn(move || me.run_loop())
            .map_err(|e| StreamError::Backend(e.to_string()))?;
        *self.handle.lock() = Some(handle);
        info!(consumer = %self.config.consumer, group = %self.config.group, "event indexer started");
        Ok(())
    }

    /// Signal the loop to exit after the current batch, then join.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if *state != ConsumerState::Running {
                warn!(consumer = %self.config.consumer, "consumer is not running");
                return;
            }
            *state = ConsumerState::Stopping;
        }
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
        *self.state.lock() = ConsumerState::Stopped;
        info!(consumer = %self.config.consumer, "event indexer stopped");
    }

    fn run_loop(&self) {
        while !self.stop.load(Ordering::Acquire) {
            match self.process_batch() {
                Ok(0) => thread::sleep(self.config.idle_backoff),
                Ok(n) => debug!(consumer = %self.config.consumer, entries = n, "batch processed"),
                Err(e) => {
                    if self.throttle.allow() {
                        warn!(consumer = %self.config.consumer, error = %e, "claim failed, backing off");
                    }
                    thread::sleep(self.config.idle_backoff);
                }
            }
        }
    }

    /// Claim and work through one batch, returning the number of entries
    /// claimed. Public so tests and embedding callers can drain the log
    /// synchronously.
    pub fn process_batch(&self) -> Result<usize> {
        let batch = self.log.claim(
            &self.config.group,
            &self.config.consumer,
            self.config.batch_size,
            self.config.claim_block,
        )?;
        let claimed = batch.len();
        for entry in batch {
            self.apply(&entry);
        }
        Ok(claimed)
    }

    fn apply(&self, entry: &ClaimedEvent) {
        let event = &entry.event;
        match event.kind() {
            Some(EventKind::Create) | Some(EventKind::Update) => self.apply_upsert(entry),
            Some(EventKind::Delete) => match self.store.delete(&event.product_id) {
                Ok(()) => {
                    self.ack(entry);
                    info!(product_id = %event.product_id, "removed embedding record");
                }
                Err(e) if e.is_retryable() => {
                    if self.throttle.allow() {
                        warn!(product_id = %event.product_id, error = %e, "delete failed, leaving for redelivery");
                    }
                }
                Err(e) => {
                    warn!(product_id = %event.product_id, error = %e, "dropping delete event");
                    self.ack(entry);
                }
            },
            None => {
                warn!(event_type = %event.event_type, product_id = %event.product_id, "dropping event of unknown type");
                self.ack(entry);
            }
        }
    }

    fn apply_upsert(&self, entry: &ClaimedEvent) {
        let event = &entry.event;
        let doc = match serde_json::from_str::<ProductDoc>(&event.payload) {
            Ok(mut doc) => {
                if doc.id.is_empty() {
                    doc.id = event.product_id.clone();
                }
                doc
            }
            Err(e) => {
                warn!(product_id = %event.product_id, error = %e, "dropping event with malformed payload");
                self.ack(entry);
                return;
            }
        };

        let vector = self.embedder.embed_product(&doc);
        match self.store.upsert(&event.product_id, vector, doc.metadata()) {
            Ok(()) => {
                self.ack(entry);
                debug!(product_id = %event.product_id, event_type = %event.event_type, "indexed product");
            }
            Err(e) if e.is_retryable() => {
                if self.throttle.allow() {
                    warn!(product_id = %event.product_id, error = %e, "upsert failed, leaving for redelivery");
                }
            }
            Err(e) => {
                warn!(product_id = %event.product_id, error = %e, "dropping event after non-retryable store error");
                self.ack(entry);
            }
        }
    }

    fn ack(&self, entry: &ClaimedEvent) {
        if let Err(e) = self.log.ack(&self.config.group, entry.delivery_id) {
            warn!(delivery_id = %entry.delivery_id, error = %e, "ack failed");
        }
    }
}
