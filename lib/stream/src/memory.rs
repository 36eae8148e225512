use std::hash::BuildHasher;
use std::time::{Duration, Instant};

use ahash::{AHashMap, RandomState};
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::{ClaimedEvent, DeliveryId, EventLog, ProductEvent, Result, StreamError};

/// Tunables for the in-memory log backend.
#[derive(Debug, Clone)]
pub struct MemoryLogConfig {
    pub partitions: usize,
    /// How long a claimed entry stays invisible before a crashlike
    /// no-ack makes it claimable again. Must exceed worst-case batch
    /// processing time or entries get reprocessed while still in flight.
    pub visibility_timeout: Duration,
}

impl Default for MemoryLogConfig {
    fn default() -> Self {
        Self {
            partitions: 8,
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

struct InFlight {
    consumer: String,
    claimed_at: Instant,
}

struct GroupState {
    /// Next undelivered offset per partition.
    cursors: Vec<u64>,
    in_flight: AHashMap<DeliveryId, InFlight>,
}

impl GroupState {
    fn new(partitions: usize) -> Self {
        Self {
            cursors: vec![0; partitions],
            in_flight: AHashMap::default(),
        }
    }
}

struct LogInner {
    partitions: Vec<Vec<ProductEvent>>,
    groups: AHashMap<String, GroupState>,
}

/// Partitioned in-memory event log with consumer groups.
///
/// Events are routed by `hash(product_id) % partitions`, so every event
/// for one product is strictly ordered. Groups are created implicitly on
/// first claim. Publishing wakes blocked claimers.
pub struct MemoryEventLog {
    config: MemoryLogConfig,
    hasher: RandomState,
    inner: Mutex<LogInner>,
    available: Condvar,
}

impl MemoryEventLog {
    pub fn new(config: MemoryLogConfig) -> Self {
        let partitions = config.partitions.max(1);
        Self {
            config: MemoryLogConfig {
                partitions,
                ..config
            },
            hasher: RandomState::new(),
            inner: Mutex::new(LogInner {
                partitions: (0..partitions).map(|_| Vec::new()).collect(),
                groups: AHashMap::default(),
            }),
            available: Condvar::new(),
        }
    }

    pub fn partition_for(&self, product_id: &str) -> u32 {
        (self.hasher.hash_one(product_id) % self.config.partitions as u64) as u32
    }

    /// Total appended entries across partitions.
    pub fn len(&self) -> usize {
        self.inner.lock().partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect(
        &self,
        inner: &mut LogInner,
        group: &str,
        consumer: &str,
        count: usize,
        now: Instant,
    ) -> Vec<ClaimedEvent> {
        let partitions = &inner.partitions;
        let state = inner
            .groups
            .entry(group.to_string())
            .or_insert_with(|| GroupState::new(partitions.len()));

        let mut batch = Vec::new();

        // Expired claims first: they are the oldest outstanding work.
        let mut expired: Vec<DeliveryId> = state
            .in_flight
            .iter()
            .filter(|(_, flight)| {
                now.duration_since(flight.claimed_at) >= self.config.visibility_timeout
            })
            .map(|(id, _)| *id)
            .collect();
        expired.sort_by_key(|id| (id.partition, id.offset));
        for delivery_id in expired {
            if batch.len() >= count {
                break;
            }
            let event =
                partitions[delivery_id.partition as usize][delivery_id.offset as usize].clone();
            state.in_flight.insert(
                delivery_id,
                InFlight {
                    consumer: consumer.to_string(),
                    claimed_at: now,
                },
            );
            debug!(%delivery_id, consumer, "redelivering expired claim");
            batch.push(ClaimedEvent { delivery_id, event });
        }

        // Then fresh entries, append order within each partition.
        for (partition, entries) in partitions.iter().enumerate() {
            while batch.len() < count {
                let offset = state.cursors[partition];
                if offset as usize >= entries.len() {
                    break;
                }
                state.cursors[partition] = offset + 1;
                let delivery_id = DeliveryId {
                    partition: partition as u32,
                    offset,
                };
                state.in_flight.insert(
                    delivery_id,
                    InFlight {
                        consumer: consumer.to_string(),
                        claimed_at: now,
                    },
                );
                batch.push(ClaimedEvent {
                    delivery_id,
                    event: entries[offset as usize].clone(),
                });
            }
        }
        batch
    }
}

impl EventLog for MemoryEventLog {
    fn publish(&self, event: ProductEvent) -> Result<DeliveryId> {
        let partition = self.partition_for(&event.product_id);
        let mut inner = self.inner.lock();
        let entries = &mut inner.partitions[partition as usize];
        let offset = entries.len() as u64;
        entries.push(event);
        self.available.notify_all();
        Ok(DeliveryId { partition, offset })
    }

    fn claim(
        &self,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<ClaimedEvent>> {
        let deadline = Instant::now() + block;
        let mut inner = self.inner.lock();
        loop {
            let now = Instant::now();
            let batch = self.collect(&mut inner, group, consumer, count, now);
            if !batch.is_empty() || now >= deadline {
                return Ok(batch);
            }
            // Wake early on publish; cap the wait so expiring claims are
            // rechecked without a publish.
            let wait = (deadline - now).min(Duration::from_millis(100));
            let _ = self.available.wait_for(&mut inner, wait);
        }
    }

    fn ack(&self, group: &str, delivery_id: DeliveryId) -> Result<()> {
        let mut inner = self.inner.lock();
        let state = inner
            .groups
            .get_mut(group)
            .ok_or_else(|| StreamError::UnknownGroup(group.to_string()))?;

        if let Some(flight) = state.in_flight.remove(&delivery_id) {
            debug!(%delivery_id, consumer = %flight.consumer, "acked");
            return Ok(());
        }
        let already_acked = (delivery_id.partition as usize) < state.cursors.len()
            && delivery_id.offset < state.cursors[delivery_id.partition as usize];
        if already_acked {
            // Late ack after redelivery completed elsewhere.
            return Ok(());
        }
        Err(StreamError::NotClaimed {
            group: group.to_string(),
            delivery_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;
    use std::sync::Arc;

    fn log_with(visibility: Duration) -> MemoryEventLog {
        MemoryEventLog::new(MemoryLogConfig {
            partitions: 4,
            visibility_timeout: visibility,
        })
    }

    fn event(kind: EventKind, product_id: &str) -> ProductEvent {
        ProductEvent::new(kind, product_id, "{}")
    }

    #[test]
    fn test_same_product_same_partition() {
        let log = log_with(Duration::from_secs(30));
        let a = log.publish(event(EventKind::Create, "p1")).unwrap();
        let b = log.publish(event(EventKind::Update, "p1")).unwrap();
        assert_eq!(a.partition, b.partition);
        assert_eq!(a.offset + 1, b.offset);
    }

    #[test]
    fn test_claim_ack_cycle() {
        let log = log_with(Duration::from_secs(30));
        log.publish(event(EventKind::Create, "p1")).unwrap();

        let batch = log.claim("g", "c1", 10, Duration::ZERO).unwrap();
        assert_eq!(batch.len(), 1);
        log.ack("g", batch[0].delivery_id).unwrap();

        // Acked entries are gone for good.
        assert!(log.claim("g", "c1", 10, Duration::ZERO).unwrap().is_empty());
        // Re-ack is a no-op.
        log.ack("g", batch[0].delivery_id).unwrap();
    }

    #[test]
    fn test_per_product_order_preserved() {
        let log = log_with(Duration::from_secs(30));
        for i in 0..5 {
            let mut e = event(EventKind::Update, "p1");
            e.payload = format!("{{\"seq\":{}}}", i);
            log.publish(e).unwrap();
        }
        let batch = log.claim("g", "c1", 10, Duration::ZERO).unwrap();
        let payloads: Vec<&str> = batch.iter().map(|c| c.event.payload.as_str()).collect();
        let expected: Vec<String> = (0..5).map(|i| format!("{{\"seq\":{}}}", i)).collect();
        assert_eq!(payloads, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_unacked_claim_redelivered_to_other_consumer() {
        let log = log_with(Duration::from_millis(20));
        log.publish(event(EventKind::Create, "p1")).unwrap();

        let first = log.claim("g", "c1", 10, Duration::ZERO).unwrap();
        assert_eq!(first.len(), 1);
        // Invisible while the claim is fresh.
        assert!(log.claim("g", "c2", 10, Duration::ZERO).unwrap().is_empty());

        std::thread::sleep(Duration::from_millis(30));
        let second = log.claim("g", "c2", 10, Duration::ZERO).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].delivery_id, first[0].delivery_id);

        // The late ack from the original claimer still lands.
        log.ack("g", first[0].delivery_id).unwrap();
    }

    #[test]
    fn test_ack_outside_claimed_set_is_error() {
        let log = log_with(Duration::from_secs(30));
        let id = log.publish(event(EventKind::Create, "p1")).unwrap();

        let err = log.ack("nope", id).unwrap_err();
        assert!(matches!(err, StreamError::UnknownGroup(_)));

        // Group exists but the entry was never claimed.
        log.claim("g", "c1", 0, Duration::ZERO).unwrap();
        let err = log.ack("g", id).unwrap_err();
        assert!(matches!(err, StreamError::NotClaimed { .. }));
    }

    #[test]
    fn test_blocking_claim_times_out_empty() {
        let log = log_with(Duration::from_secs(30));
        let batch = log.claim("g", "c1", 10, Duration::from_millis(30)).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_publish_wakes_blocked_claim() {
        let log = Arc::new(log_with(Duration::from_secs(30)));
        let claimer = {
            let log = Arc::clone(&log);
            std::thread::spawn(move || log.claim("g", "c1", 10, Duration::from_secs(5)).unwrap())
        };
        std::thread::sleep(Duration::from_millis(20));
        log.publish(event(EventKind::Create, "p1")).unwrap();

        let batch = claimer.join().unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_competing_consumers_split_entries() {
        let log = log_with(Duration::from_secs(30));
        for i in 0..6 {
            log.publish(event(EventKind::Create, &format!("p{}", i)))
                .unwrap();
        }
        let first = log.claim("g", "c1", 3, Duration::ZERO).unwrap();
        let second = log.claim("g", "c2", 10, Duration::ZERO).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        for a in &first {
            assert!(second.iter().all(|b| b.delivery_id != a.delivery_id));
        }
    }
}
