use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "claude-opus-4-6";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 8096;
const STREAM_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum AnthropicError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("{0}")]
    Interrupted(String),
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Result of a synchronous generation call.
#[derive(Debug)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Messages API client. Configuration is fixed at startup and the client is
/// shared read-only across requests.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
            model,
            max_tokens: MAX_OUTPUT_TOKENS,
        }
    }

    fn messages_body(&self, system: &str, user_message: &str, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [{"role": "user", "content": user_message}],
        });
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send_messages_request(
        &self,
        body: &Value,
    ) -> Result<reqwest::Response, AnthropicError> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| AnthropicError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AnthropicError::Api { status, message });
        }

        Ok(response)
    }

    /// Single-shot generation; resolves once the full message is available.
    pub async fn complete(
        &self,
        system: &str,
        user_message: &str,
    ) -> Result<Completion, AnthropicError> {
        let body = self.messages_body(system, user_message, false);
        let response = self.send_messages_request(&body).await?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AnthropicError::Malformed(e.to_string()))?;

        let text = parsed
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.clone())
            .ok_or_else(|| AnthropicError::Malformed("no text content in response".into()))?;

        Ok(Completion {
            text,
            model: parsed.model,
            usage: parsed.usage,
        })
    }

    /// Streaming generation. Text fragments arrive over the returned channel
    /// in upstream order; the channel closes after the final fragment. A
    /// failure mid-stream is delivered as the last item. The sequence is not
    /// restartable; regenerating requires a new call.
    pub async fn stream_message(
        &self,
        system: &str,
        user_message: &str,
    ) -> Result<mpsc::Receiver<Result<String, AnthropicError>>, AnthropicError> {
        let body = self.messages_body(system, user_message, true);
        let response = self.send_messages_request(&body).await?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(read_event_stream(response, tx));

        Ok(rx)
    }
}

enum StreamEvent {
    Delta(String),
    Done,
    Error(String),
}

/// Drain the upstream SSE body, forwarding text deltas as they arrive.
/// Dropping the receiver makes the next send fail, which stops the read and
/// releases the upstream connection.
async fn read_event_stream(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<String, AnthropicError>>,
) {
    let mut body = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(Err(AnthropicError::Network(e.to_string()))).await;
                return;
            }
        };

        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(split_idx) = buffer.find("\n\n") {
            let event = buffer[..split_idx].to_string();
            buffer.drain(..split_idx + 2);

            for line in event.lines() {
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() {
                    continue;
                }

                match decode_stream_event(data) {
                    Some(StreamEvent::Delta(text)) => {
                        if tx.send(Ok(text)).await.is_err() {
                            debug!("stream consumer went away, aborting upstream read");
                            return;
                        }
                    }
                    Some(StreamEvent::Done) => return,
                    Some(StreamEvent::Error(message)) => {
                        let _ = tx.send(Err(AnthropicError::Interrupted(message))).await;
                        return;
                    }
                    None => {}
                }
            }
        }
    }
}

fn decode_stream_event(data: &str) -> Option<StreamEvent> {
    let value: Value = serde_json::from_str(data).ok()?;

    match value.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => value
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .map(|text| StreamEvent::Delta(text.to_string())),
        Some("message_stop") => Some(StreamEvent::Done),
        Some("error") => {
            let message = value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("upstream stream error")
                .to_string();
            Some(StreamEvent::Error(message))
        }
        _ => None,
    }
}
