use std::convert::Infallible;

use axum::{
    extract::State,
    http::{header::CACHE_CONTROL, HeaderName, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    Json,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::anthropic::AnthropicError;
use crate::api::AppState;
use crate::markup::normalize_document;
use crate::prompts;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_style() -> String {
    "modern".into()
}

fn default_language() -> String {
    "en-US".into()
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    pub current_html: String,
    pub instructions: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub html: String,
    pub tokens_used: u64,
    pub model: String,
}

// Unlike generate, refine does not report the model id.
#[derive(Debug, Serialize)]
pub struct RefineResponse {
    pub html: String,
    pub tokens_used: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorDetail>);

fn bad_request(detail: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorDetail {
            detail: detail.to_string(),
        }),
    )
}

fn upstream_error(err: &AnthropicError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorDetail {
            detail: format!("Anthropic API error: {err}"),
        }),
    )
}

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: "LLM Site Generator API is running!",
    })
}

/// Generate a complete website from a prompt.
pub async fn generate(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err(bad_request("prompt is required"));
    }

    let request_id = Uuid::new_v4().to_string();
    info!(
        %request_id,
        style = %payload.style,
        language = %payload.language,
        "generating site"
    );

    let user_message =
        prompts::build_site_prompt(&payload.prompt, &payload.style, &payload.language);

    let completion = state
        .anthropic
        .complete(prompts::SYSTEM_PROMPT, &user_message)
        .await
        .map_err(|e| {
            error!(%request_id, %e, "generation failed");
            upstream_error(&e)
        })?;

    let tokens_used = completion.usage.total();
    info!(%request_id, tokens_used, model = %completion.model, "site generated");

    Ok(Json(GenerateResponse {
        html: normalize_document(&completion.text),
        tokens_used,
        model: completion.model,
    }))
}

/// Generate a website with streaming; fragments are relayed to the client
/// as they arrive from upstream.
pub async fn generate_stream(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err(bad_request("prompt is required"));
    }

    let request_id = Uuid::new_v4().to_string();
    info!(
        %request_id,
        style = %payload.style,
        language = %payload.language,
        "streaming site generation"
    );

    let user_message =
        prompts::build_site_prompt(&payload.prompt, &payload.style, &payload.language);

    let chunks = state
        .anthropic
        .stream_message(prompts::SYSTEM_PROMPT, &user_message)
        .await
        .map_err(|e| {
            error!(%request_id, %e, "failed to open upstream stream");
            upstream_error(&e)
        })?;

    let events =
        relay_events(chunks).map(|data| Ok::<_, Infallible>(Event::default().data(data)));

    // no-cache plus X-Accel-Buffering keep proxies from holding fragments back
    Ok((
        [
            (CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events),
    ))
}

/// Refine previously generated markup with new instructions.
pub async fn refine(
    State(state): State<AppState>,
    Json(payload): Json<RefineRequest>,
) -> Result<Json<RefineResponse>, ApiError> {
    if payload.current_html.trim().is_empty() {
        return Err(bad_request("current_html is required"));
    }
    if payload.instructions.trim().is_empty() {
        return Err(bad_request("instructions is required"));
    }

    let request_id = Uuid::new_v4().to_string();
    info!(%request_id, "refining site");

    let user_message =
        prompts::build_refine_prompt(&payload.current_html, &payload.instructions);

    let completion = state
        .anthropic
        .complete(prompts::SYSTEM_PROMPT, &user_message)
        .await
        .map_err(|e| {
            error!(%request_id, %e, "refine failed");
            upstream_error(&e)
        })?;

    let tokens_used = completion.usage.total();
    info!(%request_id, tokens_used, "site refined");

    Ok(Json(RefineResponse {
        html: normalize_document(&completion.text),
        tokens_used,
    }))
}

/// Serialize upstream fragments into event payloads: one `chunk` per
/// fragment in arrival order, then a single `done`. An upstream failure
/// becomes a final `error` payload and ends the sequence.
fn relay_events(
    mut chunks: mpsc::Receiver<Result<String, AnthropicError>>,
) -> impl Stream<Item = String> {
    async_stream::stream! {
        while let Some(item) = chunks.recv().await {
            match item {
                Ok(text) => yield json!({ "chunk": text }).to_string(),
                Err(e) => {
                    error!(%e, "upstream stream failed");
                    yield json!({ "error": format!("Anthropic API error: {e}") }).to_string();
                    return;
                }
            }
        }
        yield json!({ "done": true }).to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn relay_forwards_chunks_in_order_then_done() {
        let (tx, rx) = mpsc::channel(8);
        for fragment in ["<!DOC", "TYPE html>...", "</html>"] {
            tx.send(Ok(fragment.to_string())).await.unwrap();
        }
        drop(tx);

        let events: Vec<String> = relay_events(rx).collect().await;
        assert_eq!(
            events,
            vec![
                r#"{"chunk":"<!DOC"}"#,
                r#"{"chunk":"TYPE html>..."}"#,
                r#"{"chunk":"</html>"}"#,
                r#"{"done":true}"#,
            ]
        );
    }

    #[tokio::test]
    async fn relay_ends_with_error_payload_on_upstream_failure() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(Ok("<!DOCTYPE html>".to_string())).await.unwrap();
        tx.send(Err(AnthropicError::Interrupted("Overloaded".into())))
            .await
            .unwrap();
        drop(tx);

        let events: Vec<String> = relay_events(rx).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], r#"{"chunk":"<!DOCTYPE html>"}"#);
        assert!(events[1].contains(r#""error""#));
        assert!(events[1].contains("Overloaded"));
    }

    #[test]
    fn upstream_errors_become_500_with_detail_text() {
        let err = AnthropicError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        let (status, Json(body)) = upstream_error(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.detail.starts_with("Anthropic API error:"));
        assert!(body.detail.contains("rate limited"));
    }

    #[test]
    fn generate_request_fills_style_and_language_defaults() {
        let parsed: GenerateRequest =
            serde_json::from_str(r#"{"prompt":"A portfolio site"}"#).unwrap();
        assert_eq!(parsed.style, "modern");
        assert_eq!(parsed.language, "en-US");
    }

    #[test]
    fn generate_request_requires_prompt_field() {
        assert!(serde_json::from_str::<GenerateRequest>(r#"{"style":"dark"}"#).is_err());
        assert!(serde_json::from_str::<RefineRequest>(r#"{"instructions":"x"}"#).is_err());
    }
}
