use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::{AppConfig, StorageConfig};
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::{CartStore, ProductStore};

use crate::errors::StartupError;
use crate::realtime::Broadcaster;
use crate::routes;
use crate::state::AppState;

/// Events buffered per realtime listener before it starts skipping.
const EVENT_CAPACITY: usize = 64;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open both stores as configured and wire the catalog to the realtime hub.
pub async fn build_state(storage: &StorageConfig) -> Result<AppState, StartupError> {
    storage.validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let events = Broadcaster::new(EVENT_CAPACITY);
    let products = ProductStore::with_options(
        &storage.products_file,
        storage.products_on_missing,
        storage.product_ids,
        Arc::new(events.clone()),
    )
    .await?;
    let carts = CartStore::with_options(&storage.carts_file, storage.carts_on_missing, products.clone()).await?;
    Ok(AppState { products, carts, events })
}

/// Build the router for an already opened state.
pub fn build_app(state: AppState, storage: &StorageConfig) -> Router {
    routes::build_router(state, build_cors(), &storage.public_dir)
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = AppConfig::load_or_env()?;
    common::env::ensure_env(&cfg.storage.public_dir, &cfg.storage.data_dir).await?;

    let state = build_state(&cfg.storage).await?;
    let app = build_app(state, &cfg.storage);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(
        %addr,
        products = %cfg.storage.products_file,
        carts = %cfg.storage.carts_file,
        "starting cart service"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
