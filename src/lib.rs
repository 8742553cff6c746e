//! fotolab-api library
//!
//! Order management backend for a photo printing shop: accounts, shipping
//! addresses, a package catalog, Stripe checkout and webhook-driven order
//! confirmation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use axum::{routing::get, Router};
use serde::Serialize;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/usuarios", handlers::users::usuarios_routes())
        .nest("/direcciones", handlers::addresses::direcciones_routes())
        .nest("/paquetes", handlers::packages::paquetes_routes())
        .nest("/pedidos", handlers::orders::pedidos_routes())
        .nest("/checkout", handlers::checkout::checkout_routes())
        .nest("/webhooks", handlers::webhooks::webhooks_routes())
}

/// Builds the full application router: `/api` plus liveness endpoints, with
/// the auth service injected into request extensions for the extractor.
pub fn build_router(state: AppState, auth_service: Arc<auth::AuthService>) -> Router {
    Router::new()
        .route("/", get(|| async { "fotolab-api up" }))
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes())
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            |axum::extract::State(auth): axum::extract::State<Arc<auth::AuthService>>,
             mut req: axum::http::Request<axum::body::Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        .layer(axum::middleware::from_fn(request_logging_middleware))
        .with_state(state)
}

// Request logging middleware
async fn request_logging_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
