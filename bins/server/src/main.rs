//! Claimflow API Server
//!
//! Main entry point for the Claimflow backend service.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claimflow_api::{AppState, create_router};
use claimflow_core::currency::{HttpRateOracle, Normalizer};
use claimflow_core::receipt::ReceiptStore;
use claimflow_db::connect_with_pool;
use claimflow_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claimflow=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Connect to database
    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    // Bearer token validation
    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        ..JwtConfig::default()
    });

    // Currency normalizer over the exchange-rate oracle
    let oracle = HttpRateOracle::new(
        config.exchange.base_url.clone(),
        Duration::from_secs(config.exchange.timeout_secs),
    )
    .map_err(|e| anyhow::anyhow!("failed to build oracle client: {e}"))?;
    let normalizer = Normalizer::new(Arc::new(oracle));
    info!(
        oracle = %config.exchange.base_url,
        timeout_secs = config.exchange.timeout_secs,
        "Exchange-rate oracle configured"
    );

    // Receipt store
    let receipts = ReceiptStore::new(&config.uploads.dir, config.uploads.max_receipt_bytes)
        .map_err(|e| anyhow::anyhow!("failed to initialize receipt storage: {e}"))?;
    info!(dir = %config.uploads.dir, "Receipt storage configured");

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        normalizer: Arc::new(normalizer),
        receipts: Arc::new(receipts),
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        max_receipt_bytes: config.uploads.max_receipt_bytes,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
