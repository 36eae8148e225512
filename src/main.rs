use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use simdex::config::{AppConfig, EventBackend, VectorBackend};
use simdex::context::ServiceContext;

/// Product similarity engine with event-driven index maintenance
#[derive(Parser, Debug)]
#[command(name = "simdex")]
#[command(about = "Product similarity engine with event-driven index maintenance", long_about = None)]
struct Args {
    /// Embedding dimension
    #[arg(long, env = "SIMDEX_DIMENSION", default_value_t = 384)]
    dimension: usize,

    /// Default similarity score floor
    #[arg(long, env = "SIMDEX_MIN_SCORE", default_value_t = 0.75)]
    min_score: f32,

    /// Vector collection name
    #[arg(long, env = "SIMDEX_COLLECTION", default_value = "products")]
    collection: String,

    /// Vector store backend: local or remote
    #[arg(long, env = "SIMDEX_VECTOR_BACKEND", default_value = "local")]
    vector_backend: String,

    /// Event log backend: log or table
    #[arg(long, env = "SIMDEX_EVENT_BACKEND", default_value = "log")]
    event_backend: String,

    /// Remote vector store endpoint, required with --vector-backend remote
    #[arg(long, env = "SIMDEX_REMOTE_ENDPOINT")]
    remote_endpoint: Option<String>,

    /// Event log partition count
    #[arg(long, default_value_t = 8)]
    partitions: usize,

    /// Visibility timeout for claimed entries, in seconds
    #[arg(long, default_value_t = 30)]
    visibility_timeout: u64,

    /// Claim batch size
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Number of consumer workers
    #[arg(long, default_value_t = 2)]
    consumers: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig {
        dimension: args.dimension,
        min_score: args.min_score,
        collection: args.collection,
        vector_backend: args.vector_backend.parse::<VectorBackend>()?,
        event_backend: args.event_backend.parse::<EventBackend>()?,
        remote_endpoint: args.remote_endpoint,
        partitions: args.partitions,
        visibility_timeout: Duration::from_secs(args.visibility_timeout),
        batch_size: args.batch_size,
        consumers: args.consumers,
        ..Default::default()
    };

    info!("Starting simdex v{}", env!("CARGO_PKG_VERSION"));
    let context = ServiceContext::from_config(config)?;
    let indexers = context.spawn_indexers()?;
    info!(workers = indexers.len(), "simdex started");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    for indexer in &indexers {
        indexer.stop();
    }
    info!("Shutting down...");
    Ok(())
}
