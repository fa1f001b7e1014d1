//! Usermeta Server
//!
//! HTTP API for signup, login and per-user metadata. Metadata writes are
//! serialized per user and per field through lock records in Redis.

pub mod commands;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod storage;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use usermeta_core::{LockCoordinator, TokenService, UserStore};

use services::{AuthService, MetaService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub metas: Arc<MetaService>,
    pub tokens: Arc<TokenService>,
    pub locks: LockCoordinator,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenService>, locks: LockCoordinator) -> Self {
        Self {
            auth_service: Arc::new(AuthService::new(users.clone(), tokens.clone())),
            metas: Arc::new(MetaService::new(users)),
            tokens,
            locks,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Lock layer sits inside auth: it needs the caller
    let metas = Router::new()
        .route(
            "/metas",
            put(handlers::metas::update)
                .layer(from_fn_with_state(
                    state.clone(),
                    middleware::lock_dimensions,
                ))
                .get(handlers::metas::get),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/signup", post(handlers::users::signup))
        .route("/login", post(handlers::users::login))
        .merge(metas)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
