//! # tiller_api
//!
//! HTTP and queue-RPC surface for Tiller.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rpc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::SqlitePool;
use tiller_core::manager::UserManager;
use tiller_core::token::TokenIssuer;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, health, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool.
    pub pool: SqlitePool,
    /// API configuration.
    pub config: ApiConfig,
    /// Domain operations.
    pub manager: UserManager,
    /// Token issuing and verification.
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Assemble the state from a pool and configuration.
    pub fn new(pool: SqlitePool, config: ApiConfig) -> Result<Self, tiller_core::Error> {
        let manager = UserManager::new(pool.clone(), config.bcrypt_cost);
        let tokens = TokenIssuer::new(&config.jwt)?;
        Ok(Self {
            pool,
            config,
            manager,
            tokens,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `tiller_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    tiller_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/", post(auth::admin_login_handler))
        .route("/auth/user/registration", post(users::registration_handler))
        .route("/auth/user/authorization", post(users::authorization_handler));

    // Protected routes (require a valid bearer token)
    let protected = Router::new()
        .route("/auth/upgrade", post(auth::upgrade_handler))
        .route("/auth/downgrade", post(auth::downgrade_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
