use std::sync::Arc;

use tracing::info;

use simdex_embed::ProductDoc;

use crate::{DeliveryId, EventKind, EventLog, ProductEvent, Result, StreamError};

/// Publishes product lifecycle events to the configured log.
pub struct ProductEventProducer {
    log: Arc<dyn EventLog>,
}

impl ProductEventProducer {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }

    /// Raw publish for callers that already hold a serialized payload.
    pub fn publish(
        &self,
        kind: EventKind,
        product_id: &str,
        payload: String,
    ) -> Result<DeliveryId> {
        let delivery_id = self.log.publish(ProductEvent::new(kind, product_id, payload))?;
        info!(%kind, product_id, %delivery_id, "published product event");
        Ok(delivery_id)
    }

    pub fn publish_created(&self, doc: &ProductDoc) -> Result<DeliveryId> {
        let payload = serde_json::to_string(doc).map_err(|e| StreamError::Payload(e.to_string()))?;
        self.publish(EventKind::Create, &doc.id, payload)
    }

    /// `patch` may be partial; the indexer fills the id from the event
    /// envelope when the payload leaves it out.
    pub fn publish_updated(&self, product_id: &str, patch: &ProductDoc) -> Result<DeliveryId> {
        let payload =
            serde_json::to_string(patch).map_err(|e| StreamError::Payload(e.to_string()))?;
        self.publish(EventKind::Update, product_id, payload)
    }

    pub fn publish_deleted(&self, product_id: &str) -> Result<DeliveryId> {
        self.publish(EventKind::Delete, product_id, String::new())
    }
}
