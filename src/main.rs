use std::sync::Arc;

use actix_web::web;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_service::api::{self, AppState};
use order_service::cache::{InMemoryOrderCache, OrderCache, RedisOrderCache};
use order_service::change_feed::{ChangeFeed, KafkaFeedSource};
use order_service::config::Config;
use order_service::health::Readiness;
use order_service::messaging::{EventPublisher, NoopPublisher, RedpandaPublisher};
use order_service::metrics::{self, Metrics};
use order_service::orchestrator::OrderOrchestrator;
use order_service::persistence::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,order_service=debug")))
        .init();

    let config = Config::from_env();
    tracing::info!(version = %config.app_version, "🚀 Starting order service");

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    let metrics_registry = Arc::new(metrics.registry().clone());

    let mut readiness = Readiness::new(config.app_version.clone());

    // === 2. Persistence ===
    let repo: Arc<dyn OrderRepository> = match &config.database_url {
        Some(url) => {
            let repo = PostgresOrderRepository::connect(url, config.database_max_connections).await?;
            repo.ensure_schema().await?;
            Arc::new(repo)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory only");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    // === 3. Cache ===
    let cache: Arc<dyn OrderCache> = match &config.redis_url {
        Some(url) => {
            let cache = Arc::new(RedisOrderCache::connect(url).await?);
            readiness = readiness.with_probe(cache.clone());
            cache
        }
        None => {
            tracing::info!("REDIS_URL not set, using in-process cache");
            Arc::new(InMemoryOrderCache::new())
        }
    };

    // === 4. Event publisher and change feed ===
    let (publisher, change_feed): (Arc<dyn EventPublisher>, ChangeFeed) = match &config.kafka_brokers {
        Some(brokers) => {
            let publisher = Arc::new(RedpandaPublisher::new(brokers, config.kafka_topic.clone())?);
            readiness = readiness.with_probe(publisher.clone());

            let source = KafkaFeedSource::new(brokers.clone(), config.kafka_topic.clone(), config.kafka_group_id.clone());
            (publisher as Arc<dyn EventPublisher>, ChangeFeed::new(Arc::new(source), metrics.clone()))
        }
        None => {
            tracing::warn!("KAFKA_BROKERS not set, events are discarded and watching is disabled");
            (Arc::new(NoopPublisher) as Arc<dyn EventPublisher>, ChangeFeed::disabled(metrics.clone()))
        }
    };

    // === 5. Orchestrator ===
    let orchestrator = OrderOrchestrator::new(repo, cache, publisher, metrics.clone(), config.orchestrator());
    readiness = readiness.with_probe(Arc::new(orchestrator.clone()));

    let state = web::Data::new(AppState {
        orchestrator,
        change_feed: Arc::new(change_feed),
        readiness,
    });

    // === 6. Serve ===
    tokio::try_join!(
        api::start_api_server(state, config.http_port),
        metrics::start_metrics_server(metrics_registry, config.metrics_port),
    )?;

    tracing::info!("👋 Order service stopped");
    Ok(())
}
