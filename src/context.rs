use std::sync::Arc;

use tracing::info;

use simdex_core::{
    Error, LocalStoreConfig, LocalVectorStore, RemoteVectorStore, Result, VectorStore,
};
use simdex_embed::TextEmbedder;
use simdex_recommend::{
    MemoryPopularityCounter, MemoryProductCatalog, MemoryRecentViews, PopularityCounter,
    ProductCatalog, RecentViews, Recommender,
};
use simdex_stream::{
    EventIndexer, EventLog, IndexerConfig, MemoryEventLog, MemoryLogConfig, ProductEventProducer,
    TableEventLog, TableLogConfig,
};

use crate::config::{AppConfig, EventBackend, VectorBackend};

/// Shared service objects, constructed once at process start and passed
/// to every component that needs them.
pub struct ServiceContext {
    pub config: AppConfig,
    pub store: Arc<dyn VectorStore>,
    pub log: Arc<dyn EventLog>,
    pub embedder: Arc<TextEmbedder>,
    pub popularity: Arc<dyn PopularityCounter>,
    pub views: Arc<dyn RecentViews>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub recommender: Arc<Recommender>,
}

impl ServiceContext {
    /// Resolve the configured backends and wire the service graph.
    /// Configuration errors are fatal here, before any worker starts.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let embedder = Arc::new(TextEmbedder::new(config.dimension));
        let store = build_vector_store(&config)?;
        let log = build_event_log(&config);
        let popularity: Arc<dyn PopularityCounter> = Arc::new(MemoryPopularityCounter::new());
        let views: Arc<dyn RecentViews> = Arc::new(MemoryRecentViews::new());
        let catalog: Arc<dyn ProductCatalog> = Arc::new(MemoryProductCatalog::new());

        let recommender = Arc::new(
            Recommender::new(
                Arc::clone(&store),
                Arc::clone(&embedder),
                Arc::clone(&popularity),
                Arc::clone(&views),
                config.min_score,
            )
            .with_catalog(Arc::clone(&catalog)),
        );

        Ok(Self {
            config,
            store,
            log,
            embedder,
            popularity,
            views,
            catalog,
            recommender,
        })
    }

    pub fn producer(&self) -> ProductEventProducer {
        ProductEventProducer::new(Arc::clone(&self.log))
    }

    /// Start one indexer per configured consumer slot, each with its own
    /// identity in the shared group.
    pub fn spawn_indexers(&self) -> simdex_stream::Result<Vec<Arc<EventIndexer>>> {
        let mut indexers = Vec::with_capacity(self.config.consumers);
        for i in 0..self.config.consumers {
            let config = IndexerConfig {
                consumer: format!("worker-{}", i),
                batch_size: self.config.batch_size,
                claim_block: self.config.claim_block,
                idle_backoff: self.config.idle_backoff,
                ..Default::default()
            };
            let indexer = EventIndexer::new(
                config,
                Arc::clone(&self.log),
                Arc::clone(&self.store),
                Arc::clone(&self.embedder),
            );
            indexer.start()?;
            indexers.push(indexer);
        }
        Ok(indexers)
    }
}

fn build_vector_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    match config.vector_backend {
        VectorBackend::Local => {
            info!(collection = %config.collection, use_ann = config.use_ann, "using local vector store");
            Ok(Arc::new(LocalVectorStore::new(LocalStoreConfig {
                name: config.collection.clone(),
                dimension: config.dimension,
                use_ann: config.use_ann,
            })))
        }
        VectorBackend::Remote => {
            let endpoint = config.remote_endpoint.as_deref().ok_or_else(|| {
                Error::InvalidConfig("remote vector backend requires an endpoint".to_string())
            })?;
            info!(endpoint, collection = %config.collection, "using remote vector store");
            Ok(Arc::new(RemoteVectorStore::connect(
                endpoint,
                &config.collection,
                config.dimension,
            )?))
        }
    }
}

fn build_event_log(config: &AppConfig) -> Arc<dyn EventLog> {
    match config.event_backend {
        EventBackend::Log => {
            info!(partitions = config.partitions, "using partitioned event log");
            Arc::new(MemoryEventLog::new(MemoryLogConfig {
                partitions: config.partitions,
                visibility_timeout: config.visibility_timeout,
            }))
        }
        EventBackend::Table => {
            info!("using polling-table event log");
            Arc::new(TableEventLog::new(TableLogConfig {
                visibility_timeout: config.visibility_timeout,
                ..Default::default()
            }))
        }
    }
}
