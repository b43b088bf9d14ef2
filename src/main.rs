//! Artisan Marketplace - order and inventory service

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artisan_marketplace::api::{router, AppState};
use artisan_marketplace::config::Config;
use artisan_marketplace::infrastructure::{EventPublisher, InMemoryStore, MarketplaceStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let store: Arc<dyn MarketplaceStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url, config.max_connections).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };
    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let app = router(AppState::new(store, events, config.orders.clone()));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Artisan marketplace listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
