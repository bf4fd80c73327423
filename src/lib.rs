// src/lib.rs
use anyhow::Result;
use app_state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use handlers::health_check;
use handlers::metrics_handler;
use handlers::root_handler;
use std::env;

// Public exports (visible outside this module)
pub mod domain;

// Internal-only exports (sibling access within this module)
mod app_state;
mod config;
mod cookies;
mod credential;
mod handlers;
mod infrastructure;
mod session;

// Hoist up only the public symbol(s)
pub use credential::{code_digest, normalize_email};

pub use config::*;

// Publicly expose the infrastructure creation functions
pub use infrastructure::{
    create_mailer, // ---
    create_noop_metrics,
    create_postgres_repository,
    create_prom_metrics,
    init_database,
};

/// Build the HTTP router with metrics implementation determined by environment variables.
///
/// Async because the database pool is initialized (with bounded retries and
/// schema bootstrap) before the router exists: a service that cannot reach
/// its store should fail at startup, not on the first request.
pub async fn create_router() -> Result<Router> {
    // ---
    // Load all configuration from environment
    let config = AppConfig::from_env()?;

    // Determine metrics implementation from environment
    let metrics_type = env::var("READY_METRICS_TYPE").unwrap_or_else(|_| "noop".to_string());
    let metrics = if metrics_type == "prom" {
        create_prom_metrics()?
    } else {
        create_noop_metrics()?
    };

    tracing_subscriber::fmt::try_init().ok(); // Ignores if already initialized

    // Create infrastructure dependencies
    let pool = init_database(&config.database).await?;
    let repository = create_postgres_repository(pool)?;
    let mailer = create_mailer(&config.email)?;

    // Build application state with all dependencies
    let app_state = AppState::new(repository, mailer, metrics, config.auth, config.scoring);

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest(
            "/auth",
            Router::new()
                .route("/request", post(handlers::request_code))
                .route("/verify", post(handlers::verify_code))
                .route("/logout", post(handlers::logout))
                .route("/me", get(handlers::me)),
        )
        .nest(
            "/checks",
            Router::new()
                .route("/start", post(handlers::start_check))
                .route("/complete", post(handlers::complete_check))
                .route("/{id}", get(handlers::get_check)),
        )
        .with_state(app_state);

    Ok(router)
}
