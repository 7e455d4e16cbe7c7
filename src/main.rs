// Web UI for AI-generated image descriptions, backed by Google Gemini.

mod error;
mod gemini;
mod image_input;
mod server;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::gemini::GeminiClient;
use crate::server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Fail fast on a missing credential instead of letting the first
    // upload discover it.
    let client = GeminiClient::from_env()?;

    let state = Arc::new(AppState { client });
    let app = server::app(state);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("server running on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
