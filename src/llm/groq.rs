//! Streaming client for Groq's OpenAI-compatible chat completions endpoint.
//!
//! Behaviour:
//! - `POST {base}/chat/completions` with bearer auth and `stream: true`.
//! - The reply is read as Server-Sent Events; each `choices[0].delta.content`
//!   is forwarded as one fragment.
//! - `[DONE]` or the end of the event stream ends the fragment stream.
//! - Transport errors, error statuses and undecodable chunks end the stream
//!   with a single `Err`. No retries.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, retry::Never};
use serde::Deserialize;
use url::Url;

use super::{CompletionClient, CompletionError, CompletionRequest, FragmentStream};
use crate::config::ChatConfig;

/// Marker sent by OpenAI-compatible APIs after the last chunk.
const DONE_MARKER: &str = "[DONE]";

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamErrorBody>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamErrorBody {
    message: String,
}

/// HTTP client for the remote completion API.
pub struct GroqClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl GroqClient {
    /// Build a client from the service configuration.
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ChatConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.completions_url()?,
            api_key: config.api_key.clone(),
        })
    }

    /// Endpoint the client posts to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn stream_chat(
        &self,
        request: CompletionRequest,
    ) -> Result<FragmentStream, CompletionError> {
        let builder = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request);

        let mut source =
            EventSource::new(builder).map_err(|e| CompletionError::Stream(e.to_string()))?;
        source.set_retry_policy(Box::new(Never));

        tracing::debug!(model = %request.model, messages = request.messages.len(), "completion stream opened");

        let stream = async_stream::stream! {
            while let Some(event) = source.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(message)) => {
                        if message.data.trim() == DONE_MARKER {
                            break;
                        }
                        match parse_chunk(&message.data) {
                            Ok(Some(fragment)) => {
                                yield Ok(fragment);
                            }
                            Ok(None) => {}
                            Err(err) => {
                                yield Err(err);
                                break;
                            }
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(err) => {
                        yield Err(map_event_error(err).await);
                        break;
                    }
                }
            }
            source.close();
        };

        Ok(Box::pin(stream))
    }
}

/// Extract the text delta from one event payload.
fn parse_chunk(data: &str) -> Result<Option<String>, CompletionError> {
    let chunk: StreamChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(CompletionError::Api(error.message));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

async fn map_event_error(err: reqwest_eventsource::Error) -> CompletionError {
    match err {
        reqwest_eventsource::Error::Transport(err) => CompletionError::Http(err),
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!(status = status.as_u16(), error = %err, "failed to read error response body");
                    String::new()
                }
            };
            CompletionError::Status {
                status: status.as_u16(),
                body,
            }
        }
        other => CompletionError::Stream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::Message;

    use axum::Router;
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::post;

    fn sse_body(events: &[&str]) -> String {
        events.iter().map(|data| format!("data: {data}\n\n")).collect()
    }

    fn delta(content: &str) -> String {
        serde_json::json!({"choices": [{"delta": {"content": content}}]}).to_string()
    }

    async fn serve(router: Router) -> Result<ChatConfig, std::io::Error> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let mut config = ChatConfig::new("test-key");
        config.api_base_url = format!("http://{addr}/openai/v1");
        Ok(config)
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("llama3-70b-8192", "You are a helpful assistant.", &[Message::user("hi")])
    }

    #[test]
    fn test_parse_chunk() {
        assert_eq!(parse_chunk(&delta("Hel")).ok().flatten(), Some("Hel".to_string()));
        assert_eq!(parse_chunk(&delta("")).ok().flatten(), None);
        assert_eq!(
            parse_chunk(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).ok().flatten(),
            None
        );
        assert_eq!(parse_chunk(r#"{"choices":[]}"#).ok().flatten(), None);
        assert!(matches!(
            parse_chunk("not json"),
            Err(CompletionError::MalformedChunk(_))
        ));
        assert!(matches!(
            parse_chunk(r#"{"error":{"message":"rate limited"}}"#),
            Err(CompletionError::Api(message)) if message == "rate limited"
        ));
    }

    #[test]
    fn test_endpoint_from_config() -> Result<(), CompletionError> {
        let client = GroqClient::new(&ChatConfig::new("key"))?;
        assert_eq!(
            client.endpoint().as_str(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_streams_fragments_until_done() -> Result<(), Box<dyn std::error::Error>> {
        let body = sse_body(&[&delta("Hel"), &delta("lo\nWor"), &delta("ld"), DONE_MARKER]);
        let router = Router::new().route(
            "/openai/v1/chat/completions",
            post(move || {
                let body = body.clone();
                async move { ([(header::CONTENT_TYPE, "text/event-stream")], body) }
            }),
        );
        let config = serve(router).await?;
        let client = GroqClient::new(&config)?;

        let fragments: Vec<_> = client.stream_chat(request()).await?.collect().await;
        let fragments: Result<Vec<String>, _> = fragments.into_iter().collect();
        assert_eq!(fragments?, vec!["Hel", "lo\nWor", "ld"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_ends_stream() -> Result<(), Box<dyn std::error::Error>> {
        let router = Router::new().route(
            "/openai/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key").into_response() }),
        );
        let config = serve(router).await?;
        let client = GroqClient::new(&config)?;

        let items: Vec<_> = client.stream_chat(request()).await?.collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(CompletionError::Status { status: 401, body }) if body == "invalid api key"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_error_body_keeps_status() -> Result<(), Box<dyn std::error::Error>> {
        let router = Router::new().route(
            "/openai/v1/chat/completions",
            post(|| async {
                let body = async_stream::stream! {
                    yield Ok::<_, std::io::Error>("upstream went".to_string());
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    yield Err(std::io::Error::other("connection dropped"));
                };
                (StatusCode::BAD_GATEWAY, axum::body::Body::from_stream(body)).into_response()
            }),
        );
        let config = serve(router).await?;
        let client = GroqClient::new(&config)?;

        let items: Vec<_> = client.stream_chat(request()).await?.collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(CompletionError::Status { status: 502, body }) if body.is_empty()
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_chunk_ends_stream() -> Result<(), Box<dyn std::error::Error>> {
        let body = sse_body(&[&delta("Hello, "), "{broken", &delta("never")]);
        let router = Router::new().route(
            "/openai/v1/chat/completions",
            post(move || {
                let body = body.clone();
                async move { ([(header::CONTENT_TYPE, "text/event-stream")], body) }
            }),
        );
        let config = serve(router).await?;
        let client = GroqClient::new(&config)?;

        let items: Vec<_> = client.stream_chat(request()).await?.collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(text) if text == "Hello, "));
        assert!(matches!(&items[1], Err(CompletionError::MalformedChunk(_))));
        Ok(())
    }
}
