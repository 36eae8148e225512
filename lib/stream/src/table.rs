use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::{ClaimedEvent, DeliveryId, EventLog, ProductEvent, Result, StreamError};

/// Tunables for the polling-table log backend.
#[derive(Debug, Clone)]
pub struct TableLogConfig {
    /// How often a blocked claim re-reads the table.
    pub poll_interval: Duration,
    pub visibility_timeout: Duration,
}

impl Default for TableLogConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

struct EventRow {
    event: ProductEvent,
    processed: bool,
    claimed_by: Option<String>,
    claimed_at: Option<Instant>,
}

/// Event log over a single ordered table of rows with a processed flag,
/// consumed by polling - the managed-table variant.
///
/// Ordering is global insertion order rather than per-product partitions,
/// and delivery latency is bounded below by the poll interval. The
/// indexer treats it exactly like any other [`EventLog`].
pub struct TableEventLog {
    config: TableLogConfig,
    rows: Mutex<Vec<EventRow>>,
}

impl TableEventLog {
    pub fn new(config: TableLogConfig) -> Self {
        Self {
            config,
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows not yet marked processed.
    pub fn backlog(&self) -> usize {
        self.rows.lock().iter().filter(|r| !r.processed).count()
    }

    fn collect(&self, consumer: &str, count: usize, now: Instant) -> Vec<ClaimedEvent> {
        let mut rows = self.rows.lock();
        let mut batch = Vec::new();
        for (offset, row) in rows.iter_mut().enumerate() {
            if batch.len() >= count {
                break;
            }
            if row.processed {
                continue;
            }
            let claim_expired = match row.claimed_at {
                Some(at) => now.duration_since(at) >= self.config.visibility_timeout,
                None => true,
            };
            if !claim_expired {
                continue;
            }
            row.claimed_by = Some(consumer.to_string());
            row.claimed_at = Some(now);
            batch.push(ClaimedEvent {
                delivery_id: DeliveryId {
                    partition: 0,
                    offset: offset as u64,
                },
                event: row.event.clone(),
            });
        }
        batch
    }
}

impl EventLog for TableEventLog {
    fn publish(&self, event: ProductEvent) -> Result<DeliveryId> {
        let mut rows = self.rows.lock();
        let offset = rows.len() as u64;
        rows.push(EventRow {
            event,
            processed: false,
            claimed_by: None,
            claimed_at: None,
        });
        Ok(DeliveryId {
            partition: 0,
            offset,
        })
    }

    fn claim(
        &self,
        _group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<ClaimedEvent>> {
        let deadline = Instant::now() + block;
        loop {
            let now = Instant::now();
            let batch = self.collect(consumer, count, now);
            if !batch.is_empty() {
                debug!(consumer, claimed = batch.len(), "claimed rows from table");
                return Ok(batch);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            std::thread::sleep(self.config.poll_interval.min(deadline - now));
        }
    }

    fn ack(&self, group: &str, delivery_id: DeliveryId) -> Result<()> {
        let mut rows = self.rows.lock();
        let row = rows.get_mut(delivery_id.offset as usize).ok_or_else(|| {
            StreamError::NotClaimed {
                group: group.to_string(),
                delivery_id,
            }
        })?;
        if row.processed {
            return Ok(());
        }
        if row.claimed_at.is_none() {
            return Err(StreamError::NotClaimed {
                group: group.to_string(),
                delivery_id,
            });
        }
        row.processed = true;
        debug!(
            %delivery_id,
            consumer = row.claimed_by.as_deref().unwrap_or("unknown"),
            "row marked processed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;

    fn log_with(visibility: Duration) -> TableEventLog {
        TableEventLog::new(TableLogConfig {
            poll_interval: Duration::from_millis(5),
            visibility_timeout: visibility,
        })
    }

    #[test]
    fn test_publish_claim_ack() {
        let log = log_with(Duration::from_secs(30));
        log.publish(ProductEvent::new(EventKind::Create, "p1", "{}"))
            .unwrap();
        assert_eq!(log.backlog(), 1);

        let batch = log.claim("g", "c1", 10, Duration::ZERO).unwrap();
        assert_eq!(batch.len(), 1);
        log.ack("g", batch[0].delivery_id).unwrap();
        assert_eq!(log.backlog(), 0);

        assert!(log.claim("g", "c1", 10, Duration::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_rows_delivered_in_insertion_order() {
        let log = log_with(Duration::from_secs(30));
        for i in 0..4 {
            log.publish(ProductEvent::new(
                EventKind::Create,
                format!("p{}", i),
                "{}",
            ))
            .unwrap();
        }
        let batch = log.claim("g", "c1", 10, Duration::ZERO).unwrap();
        let ids: Vec<&str> = batch.iter().map(|c| c.event.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2", "p3"]);
    }

    #[test]
    fn test_expired_claim_repolled() {
        let log = log_with(Duration::from_millis(20));
        log.publish(ProductEvent::new(EventKind::Create, "p1", "{}"))
            .unwrap();

        let first = log.claim("g", "c1", 10, Duration::ZERO).unwrap();
        assert_eq!(first.len(), 1);
        assert!(log.claim("g", "c2", 10, Duration::ZERO).unwrap().is_empty());

        std::thread::sleep(Duration::from_millis(30));
        let second = log.claim("g", "c2", 10, Duration::ZERO).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].delivery_id, first[0].delivery_id);
    }

    #[test]
    fn test_ack_unclaimed_row_is_error() {
        let log = log_with(Duration::from_secs(30));
        let id = log
            .publish(ProductEvent::new(EventKind::Create, "p1", "{}"))
            .unwrap();
        assert!(matches!(
            log.ack("g", id).unwrap_err(),
            StreamError::NotClaimed { .. }
        ));
    }
}
