use std::time::Duration;

use crate::{ClaimedEvent, DeliveryId, ProductEvent, Result};

/// Append-only product event log with consumer-group semantics.
///
/// Entries for one product land in one partition and are delivered to a
/// group in append order within it; partitions give no cross-partition
/// ordering. A claimed entry that is never acknowledged becomes eligible
/// for redelivery after the backend's visibility timeout, so consumers
/// MUST process idempotently.
pub trait EventLog: Send + Sync {
    /// Append an event and return its durable delivery id.
    fn publish(&self, event: ProductEvent) -> Result<DeliveryId>;

    /// Claim up to `count` unacknowledged entries for `consumer` within
    /// `group`, blocking up to `block` when none are available. Expired
    /// claims of crashed consumers are handed out before fresh entries.
    /// An empty batch after the timeout is not an error.
    fn claim(
        &self,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<ClaimedEvent>>;

    /// Acknowledge a claimed entry. Re-acknowledging an already acked
    /// entry is a no-op; acknowledging an entry the group never claimed is
    /// an error.
    fn ack(&self, group: &str, delivery_id: DeliveryId) -> Result<()>;
}
