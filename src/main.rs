//! Storefront binary entry point

use storefront::{AppState, api::ApiMounts, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from the `logging` section
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start HTTP server
/// 6. Start background tasks (session reaper)
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    init_tracing(&config.logging);

    tracing::info!("Starting Storefront...");
    storefront::metrics::init_metrics();
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        session_store = ?config.session.store,
        "Configuration loaded"
    );

    // 3. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 4. Build Axum router
    let app = storefront::build_router(state.clone(), ApiMounts::default());

    // 5. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    // 6. Start background tasks
    spawn_session_reaper(state);

    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` wins over the configured level when set
fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.default_filter().into());

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Spawn background task purging expired session records
fn spawn_session_reaper(state: AppState) {
    tokio::spawn(async move {
        let configured_interval_secs = state.config.session.reap_interval_seconds;
        let interval_secs = configured_interval_secs.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        if configured_interval_secs == 0 {
            tracing::warn!("session.reap_interval_seconds=0 is invalid; clamped to 1 second");
        }

        // Consume the immediate first tick so the first purge waits one interval.
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.sessions.purge_expired().await {
                Ok(0) => tracing::debug!("No expired sessions to purge"),
                Ok(purged) => tracing::info!(purged, "Expired sessions purged"),
                Err(error) => {
                    storefront::metrics::SESSION_STORE_ERRORS_TOTAL
                        .with_label_values(&["purge"])
                        .inc();
                    tracing::warn!(%error, operation = "purge", "Session purge failed");
                }
            }
        }
    });

    tracing::info!("Session reaper spawned");
}
