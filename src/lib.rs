//! Storefront - a small e-commerce server with Twitter login
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Session middleware (Axum)                   │
//! │  - Signed cookie → session record                           │
//! │  - Touch + save after every request                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Route mount table                        │
//! │  - Pages and login endpoints (auth)                         │
//! │  - /api/productos, /api/carrito, /api/usuario               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Components                            │
//! │  - Authentication gate + Twitter OAuth 2.0 client           │
//! │  - Page renderer                                            │
//! │  - Session store (SQLite or in-memory)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: Mount points for catalog, cart and user routers, plus metrics
//! - `auth`: Twitter login, verified profiles and the authentication gate
//! - `session`: Session records, stores and middleware
//! - `render`: Server-side pages
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod render;
pub mod session;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; every component sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session persistence
    pub sessions: Arc<dyn session::SessionStore>,

    /// Login lifecycle
    pub gate: Arc<auth::AuthGate>,

    /// Page renderer
    pub renderer: Arc<render::PageRenderer>,

    /// Signs the session and pending-login cookies
    pub cookie_key: Key,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Open the configured session store
    /// 2. Build the Twitter client
    /// 3. Wire the gate, renderer and cookie key
    ///
    /// # Errors
    /// Returns error if the store cannot be opened or the Twitter
    /// endpoints are malformed
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let sessions: Arc<dyn session::SessionStore> = match config.session.store {
            config::SessionStoreKind::Sqlite => {
                let store = session::SqliteSessionStore::connect(&config.session.store_url).await?;
                tracing::info!("SQLite session store connected");
                Arc::new(store)
            }
            config::SessionStoreKind::Memory => {
                let ttl = std::time::Duration::from_secs(
                    u64::try_from(config.session.max_age_seconds).unwrap_or_default(),
                );
                tracing::info!("In-memory session store initialized");
                Arc::new(session::MemorySessionStore::new(ttl))
            }
        };

        let provider =
            auth::TwitterProvider::new(config.twitter.clone(), config.twitter_redirect_uri())?;
        tracing::info!(redirect_uri = %config.twitter_redirect_uri(), "Twitter client initialized");

        let state = Self::with_components(config, sessions, Arc::new(provider));
        tracing::info!("Application state initialized successfully");
        Ok(state)
    }

    /// Assemble state from already-built components
    pub fn with_components(
        config: config::AppConfig,
        sessions: Arc<dyn session::SessionStore>,
        provider: Arc<dyn auth::IdentityProvider>,
    ) -> Self {
        let gate = auth::AuthGate::new(provider, auth::AuthRedirects::from(&config.pages));
        let renderer = render::PageRenderer::new(config.pages.site_title.clone());
        let cookie_key = derive_cookie_key(&config.session.secret);

        Self {
            config: Arc::new(config),
            sessions,
            gate: Arc::new(gate),
            renderer: Arc::new(renderer),
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Stretch the configured secret to the 64 bytes `Key` requires
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
///
/// Session-bearing routes sit behind the session middleware; `/health` and
/// `/metrics` do not, so health checks and scrapes never create session records.
pub fn build_router(state: AppState, mounts: api::ApiMounts) -> axum::Router {
    use axum::{Router, middleware, routing::get};
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    let storefront = Router::new()
        .merge(auth::auth_router(&state.config))
        .nest("/api", api::api_router(mounts))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(storefront)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
