//! API module
//!
//! HTTP surface: router assembly, middleware, and route handlers.

pub mod middleware;
pub mod routes;

use axum::{middleware as axum_middleware, routing::get, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::ledger::LedgerEngine;
use crate::notifier::Notifier;
use crate::rates::RateProvider;

/// Everything the HTTP layer hands to handlers: the pool plus the external
/// collaborators, passed in explicitly at startup (no ambient globals).
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rates: RateProvider,
    pub notifier: Notifier,
    pub lock_timeout_ms: u64,
    pub rate_limit_per_minute: i32,
    pub session_ttl_hours: i64,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config, rates: RateProvider, notifier: Notifier) -> Self {
        Self {
            pool,
            rates,
            notifier,
            lock_timeout_ms: config.lock_timeout_ms,
            rate_limit_per_minute: config.rate_limit_per_minute,
            session_ttl_hours: config.session_ttl_hours,
        }
    }

    /// A ledger engine bound to this state's pool and lock budget.
    pub fn engine(&self) -> LedgerEngine {
        LedgerEngine::new(self.pool.clone(), self.lock_timeout_ms)
    }
}

/// Build the application router.
///
/// Axum layers are applied in reverse order (last added = first executed):
/// logging -> auth -> rate_limit -> handler. Registration, login and the
/// health check stay outside the authenticated stack.
pub fn build_router(state: AppState) -> Router {
    let protected = routes::protected_router()
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    Router::new()
        // Health check (no auth)
        .route("/health", get(health_check))
        .nest("/api/v1", routes::public_router().merge(protected))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
