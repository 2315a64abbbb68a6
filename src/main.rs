use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod anthropic;
mod api;
mod markup;
mod prompts;

use anthropic::AnthropicClient;
use api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("🚀 Starting LLM site generator API...");

    // -----------------------------
    // Shared state / Dependencies
    // -----------------------------
    // A missing key is not rejected here; it surfaces as an auth failure on
    // the first upstream call.
    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    let model = std::env::var("ANTHROPIC_MODEL")
        .unwrap_or_else(|_| anthropic::DEFAULT_MODEL.to_string());
    let base_url = std::env::var("ANTHROPIC_BASE_URL")
        .unwrap_or_else(|_| anthropic::DEFAULT_BASE_URL.to_string());

    let state = AppState {
        anthropic: Arc::new(AnthropicClient::new(api_key, base_url, model)),
    };

    // -----------------------------
    // Router
    // -----------------------------
    let app = Router::new()
        .merge(api::router())
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());

    println!("🌐 HTTP listening on http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
