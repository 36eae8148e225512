use thiserror::Error;

use crate::DeliveryId;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("unknown consumer group: {0}")]
    UnknownGroup(String),

    #[error("delivery {delivery_id} is not claimed in group {group}")]
    NotClaimed {
        group: String,
        delivery_id: DeliveryId,
    },

    #[error("event payload error: {0}")]
    Payload(String),

    #[error("event log backend error: {0}")]
    Backend(String),
}
