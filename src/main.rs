// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use phase_telemetry::application::alarm_service::AlarmService;
use phase_telemetry::application::dashboard_service::DashboardService;
use phase_telemetry::application::data_hub::DataHub;
use phase_telemetry::application::fixture_service::FixtureService;
use phase_telemetry::application::history_service::HistoryService;
use phase_telemetry::application::streaming_service::StreamingService;
use phase_telemetry::application::subscriber::{RefreshPolicy, SeriesSubscriber};
use phase_telemetry::application::telemetry_repository::TelemetryRepository;
use phase_telemetry::infrastructure::config::{load_app_config, AppConfig, StoreBackend};
use phase_telemetry::infrastructure::firestore_repository::FirestoreRepository;
use phase_telemetry::infrastructure::fixtures::{replay_at, FixtureStore};
use phase_telemetry::infrastructure::memory_repository::InMemoryRepository;
use phase_telemetry::presentation::app_state::AppState;
use phase_telemetry::presentation::handlers::router;

const DEFAULT_LOG_FILTER: &str = "phase_telemetry=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    // Load configuration
    let config = load_app_config().context("Failed to load configuration")?;
    let fixtures = FixtureStore::new(&config.fixtures.dir);

    // Create repository (infrastructure layer)
    let repository = build_repository(&config, &fixtures).await;

    // Create services (application layer)
    let hub = Arc::new(DataHub::new(
        repository.clone(),
        config.refresh.snapshot_interval(),
        config.refresh.fetch_timeout(),
    ));
    hub.start();

    let subscriber = SeriesSubscriber::new(
        repository,
        RefreshPolicy {
            interval: config.refresh.history_interval(),
            fetch_timeout: config.refresh.fetch_timeout(),
        },
    );
    let offset = config
        .display
        .offset()
        .context("display.utc_offset_minutes out of range")?;

    let state = Arc::new(AppState {
        dashboard_service: DashboardService::new(hub.clone()),
        streaming_service: StreamingService::new(subscriber, hub.clone(), offset),
        fixture_service: FixtureService::new(fixtures.clone()),
        alarm_service: AlarmService::new(fixtures.clone()),
        history_service: HistoryService::new(fixtures, offset),
        charts: config.charts.clone(),
        max_points: config.refresh.max_points,
    });

    // Build router (presentation layer)
    // Responses are compressed per body or per chunk, so no CompressionLayer
    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid server.bind_addr '{}'", config.server.bind_addr))?;
    tracing::info!("Starting phase-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    hub.stop();
    Ok(())
}

async fn build_repository(config: &AppConfig, fixtures: &FixtureStore) -> Arc<dyn TelemetryRepository> {
    match config.store.backend {
        StoreBackend::Firestore => {
            let store = &config.store;
            tracing::info!(
                "Using Firestore collection '{}' ordered by '{}'",
                store.collection,
                store.timestamp_field
            );
            Arc::new(FirestoreRepository::new(
                store.base_url.clone(),
                // Presence checked by config validation
                store.project_id.clone().unwrap_or_default(),
                store.api_key.clone(),
                store.collection.clone(),
                store.timestamp_field.clone(),
            ))
        }
        StoreBackend::Memory => {
            let mut documents = fixtures
                .demo_snapshots(&config.store.timestamp_field)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(
                        "No demo snapshots in {}: {}",
                        fixtures.dir().display(),
                        e
                    );
                    Vec::new()
                });
            // Recorded demo data is replayed as if it had just arrived
            replay_at(&mut documents, chrono::Utc::now().timestamp_millis());
            tracing::info!("Using in-memory store with {} documents", documents.len());
            Arc::new(InMemoryRepository::with_documents(documents))
        }
    }
}
