use anyhow::Result;
use readycheck::create_router;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load a local .env if present, then initialize tracing to stdout.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::try_init().ok();

    info!("Starting Readiness Check API v{}...", env!("CARGO_PKG_VERSION"));

    let app = create_router().await?;

    // Get optional bind endpoint from environment
    let endpoint = env::var("READY_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Starting at endpoint:{}", endpoint);

    let listener = tokio::net::TcpListener::bind(&endpoint).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
