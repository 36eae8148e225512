use std::str::FromStr;
use std::time::Duration;

use simdex_core::{Error, Result};

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    Local,
    Remote,
}

impl FromStr for VectorBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(VectorBackend::Local),
            "remote" => Ok(VectorBackend::Remote),
            other => Err(Error::InvalidConfig(format!(
                "unknown vector backend: {}",
                other
            ))),
        }
    }
}

/// Event log backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBackend {
    /// Partitioned log with consumer groups, ordered per product.
    Log,
    /// Polling table, globally ordered, higher latency.
    Table,
}

impl FromStr for EventBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(EventBackend::Log),
            "table" => Ok(EventBackend::Table),
            other => Err(Error::InvalidConfig(format!(
                "unknown event backend: {}",
                other
            ))),
        }
    }
}

/// Process configuration, read once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dimension: usize,
    /// Default similarity score floor for recommendation queries.
    pub min_score: f32,
    pub collection: String,
    pub vector_backend: VectorBackend,
    pub event_backend: EventBackend,
    /// Required when `vector_backend` is remote.
    pub remote_endpoint: Option<String>,
    pub use_ann: bool,
    pub partitions: usize,
    /// Must exceed worst-case batch processing time, or entries are
    /// redelivered while still in flight.
    pub visibility_timeout: Duration,
    pub batch_size: usize,
    pub claim_block: Duration,
    pub idle_backoff: Duration,
    pub consumers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            min_score: 0.75,
            collection: "products".to_string(),
            vector_backend: VectorBackend::Local,
            event_backend: EventBackend::Log,
            remote_endpoint: None,
            use_ann: true,
            partitions: 8,
            visibility_timeout: Duration::from_secs(30),
            batch_size: 10,
            claim_block: Duration::from_secs(2),
            idle_backoff: Duration::from_millis(500),
            consumers: 2,
        }
    }
}

impl AppConfig {
    /// Fatal at startup; the process must not run half-configured.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidConfig(
                "embedding dimension must be positive".to_string(),
            ));
        }
        if !self.min_score.is_finite() || !(-1.0..=1.0).contains(&self.min_score) {
            return Err(Error::InvalidConfig(
                "similarity threshold must be within [-1, 1]".to_string(),
            ));
        }
        if self.collection.is_empty() {
            return Err(Error::InvalidConfig(
                "collection name must not be empty".to_string(),
            ));
        }
        if self.vector_backend == VectorBackend::Remote && self.remote_endpoint.is_none() {
            return Err(Error::InvalidConfig(
                "remote vector backend requires an endpoint".to_string(),
            ));
        }
        if self.partitions == 0 {
            return Err(Error::InvalidConfig(
                "partition count must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "batch size must be positive".to_string(),
            ));
        }
        if self.consumers == 0 {
            return Err(Error::InvalidConfig(
                "consumer count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("local".parse::<VectorBackend>().unwrap(), VectorBackend::Local);
        assert_eq!("Remote".parse::<VectorBackend>().unwrap(), VectorBackend::Remote);
        assert!("pinecone".parse::<VectorBackend>().is_err());

        assert_eq!("log".parse::<EventBackend>().unwrap(), EventBackend::Log);
        assert_eq!("table".parse::<EventBackend>().unwrap(), EventBackend::Table);
        assert!("kafka".parse::<EventBackend>().is_err());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = AppConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = AppConfig {
            min_score: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = AppConfig {
            vector_backend: VectorBackend::Remote,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.remote_endpoint = Some("http://localhost:6333".to_string());
        config.validate().unwrap();
    }
}
