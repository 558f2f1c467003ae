//! API layer
//!
//! Route mounts for:
//! - /api/productos (catalog)
//! - /api/carrito (cart)
//! - /api/usuario (user area)
//! - Metrics (Prometheus)
//!
//! The catalog, cart and user routers live outside this crate. Until one is
//! supplied its prefix answers 501 Not Implemented.

pub mod metrics;

pub use metrics::metrics_router;

use axum::{Router, routing::any};

use crate::AppState;
use crate::error::AppError;

/// Routers mounted under `/api`
#[derive(Clone)]
pub struct ApiMounts {
    pub productos: Router<AppState>,
    pub carrito: Router<AppState>,
    pub usuario: Router<AppState>,
}

impl Default for ApiMounts {
    fn default() -> Self {
        Self {
            productos: not_implemented_router("productos"),
            carrito: not_implemented_router("carrito"),
            usuario: not_implemented_router("usuario"),
        }
    }
}

impl ApiMounts {
    pub fn with_productos(mut self, router: Router<AppState>) -> Self {
        self.productos = router;
        self
    }

    pub fn with_carrito(mut self, router: Router<AppState>) -> Self {
        self.carrito = router;
        self
    }

    pub fn with_usuario(mut self, router: Router<AppState>) -> Self {
        self.usuario = router;
        self
    }
}

/// Create the `/api` router
///
/// Mount paths are fixed; only the routers behind them vary.
pub fn api_router(mounts: ApiMounts) -> Router<AppState> {
    Router::new()
        .nest("/productos", mounts.productos)
        .nest("/carrito", mounts.carrito)
        .nest("/usuario", mounts.usuario)
}

/// Placeholder answering every method and sub-path with 501
fn not_implemented_router(mount: &'static str) -> Router<AppState> {
    let handler = move || async move {
        AppError::NotImplemented(format!("/api/{mount} has no router mounted"))
    };

    Router::new()
        .route("/", any(handler.clone()))
        .route("/*rest", any(handler))
}
