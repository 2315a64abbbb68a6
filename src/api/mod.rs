use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::anthropic::AnthropicClient;

pub mod handlers;

#[derive(Clone)]
pub struct AppState {
    pub anthropic: Arc<AnthropicClient>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/generate", post(handlers::generate))
        .route("/generate/stream", post(handlers::generate_stream))
        .route("/refine", post(handlers::refine))
}
