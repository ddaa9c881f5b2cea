use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticket_sales::config::{AppConfig, StoreBackend};
use ticket_sales::db::connect_to_mongo;
use ticket_sales::store::{MemoryStore, MongoStore, TicketStore, UserStore};
use ticket_sales::{AppState, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let (users, tickets): (Arc<dyn UserStore>, Arc<dyn TicketStore>) = match config.store_backend {
        StoreBackend::Mongo => {
            let uri = config
                .database_url
                .as_deref()
                .context("DB_CONNECTION must be set for the mongo backend")?;
            let db = connect_to_mongo(uri, &config.database_name).await?;
            let store = Arc::new(MongoStore::new(db));
            store.ensure_indexes().await?;
            let users: Arc<dyn UserStore> = store.clone();
            let tickets: Arc<dyn TicketStore> = store;
            (users, tickets)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            let users: Arc<dyn UserStore> = store.clone();
            let tickets: Arc<dyn TicketStore> = store;
            (users, tickets)
        }
    };

    let state = AppState::new(&config, users, tickets)?;

    let address = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, "App running");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
