//! services/capture_api/src/bin/capture_api.rs

use capture_api_lib::{
    adapters::{DbAdapter, MemorySnapshotStore, SnapshotWriter},
    build_router,
    config::Config,
    error::ApiError,
    web::{spawn_completion_timer, state::AppState},
};
use course_capture_core::ports::SnapshotStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Choose the Snapshot Store ---
    let snapshots: Arc<dyn SnapshotStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL not set; snapshots are kept in memory only");
            Arc::new(MemorySnapshotStore::new())
        }
    };

    // --- 3. Build the Shared AppState & Seed the Session ---
    let app_state = Arc::new(AppState::new(config.clone(), snapshots.clone()));
    let writer = SnapshotWriter::new(snapshots, config.snapshot_namespace.clone());
    match writer.load_snapshot().await {
        Ok(snapshot) => app_state.seed(snapshot).await,
        Err(e) => warn!("Could not load the previous snapshot; starting empty: {:?}", e),
    }

    // --- 4. Start Background Workers ---
    let _writer_handle = writer.spawn(app_state.events.subscribe());
    let _timer_handle = spawn_completion_timer(app_state.clone());

    // --- 5. Create the Web Router ---
    let app = build_router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
