//! HTTP route handlers for the chat API.

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tower_http::services::ServeDir;

use crate::chat::Message;

use super::state::AppState;

const TURN_IN_PROGRESS: &str = "A reply is still being generated. Please wait.";

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_turn))
        .route("/api/transcript", get(transcript))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "calmline",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.model_name,
    }))
}

/// Chat turn request, sent by both the send button and the input field.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
}

/// Run one turn and stream its snapshots as SSE `data:` events.
async fn chat_turn(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let mut conversation = Arc::clone(&state.conversation)
        .try_lock_owned()
        .map_err(|_| (StatusCode::CONFLICT, TURN_IN_PROGRESS.to_string()))?;

    let events = async_stream::stream! {
        let mut turn = conversation.submit(request.message);
        while let Some(update) = turn.next().await {
            match Event::default().json_data(&update) {
                Ok(event) => {
                    yield Ok::<Event, Infallible>(event);
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode turn update");
                }
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Return the committed transcript.
async fn transcript(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Message>>, (StatusCode, String)> {
    let conversation = state
        .conversation
        .try_lock()
        .map_err(|_| (StatusCode::CONFLICT, TURN_IN_PROGRESS.to_string()))?;
    Ok(Json(conversation.transcript().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Conversation, MemorySink};
    use crate::config::ChatConfig;
    use crate::llm::{CompletionClient, CompletionError, CompletionRequest, FragmentStream};
    use crate::sentiment::{LexiconScorer, SentimentAdvisor};

    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use futures::stream;
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl CompletionClient for Echo {
        async fn stream_chat(
            &self,
            request: CompletionRequest,
        ) -> Result<FragmentStream, CompletionError> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(stream::iter(vec![Ok("You said:\n".to_string()), Ok(last)]).boxed())
        }
    }

    fn test_state() -> Result<Arc<AppState>, Box<dyn std::error::Error>> {
        let config = Arc::new(ChatConfig::new("key").with_pacing(Duration::ZERO));
        let conversation = Conversation::new(
            config,
            Arc::new(Echo),
            SentimentAdvisor::new(Arc::new(LexiconScorer::new()?)),
            Arc::new(MemorySink::new()),
            Arc::new(MemorySink::new()),
        );
        Ok(AppState::with_conversation(conversation, "test-model".to_string()))
    }

    fn router(state: Arc<AppState>) -> Router {
        create_router(state, Path::new("static"))
    }

    fn chat_request(message: &str) -> Result<Request<Body>, axum::http::Error> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "message": message }).to_string()))
    }

    async fn body_text(response: axum::response::Response) -> Result<String, Box<dyn std::error::Error>> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    #[tokio::test]
    async fn test_health() -> Result<(), Box<dyn std::error::Error>> {
        let response = router(test_state()?)
            .oneshot(Request::builder().uri("/health").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await?;
        assert!(body.contains("\"status\":\"ok\""));
        assert!(body.contains("test-model"));
        Ok(())
    }

    #[tokio::test]
    async fn test_chat_streams_snapshots() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state()?;
        let response = router(Arc::clone(&state))
            .oneshot(chat_request("I feel great")?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(b"text/event-stream".as_slice())
        );

        let body = body_text(response).await?;
        let events: Vec<&str> = body.lines().filter(|l| l.starts_with("data:")).collect();
        assert_eq!(events.len(), 4);
        assert!(events[0].contains("\"state\":\"typing\""));
        assert!(events[0].contains("Typing..."));
        assert!(events[3].contains("\"state\":\"finalized\""));
        assert!(events[3].contains("You said:\\nI feel great"));
        assert!(events[3].contains("Sentiment: Very Positive 😊"));

        let transcript = router(state)
            .oneshot(Request::builder().uri("/api/transcript").body(Body::empty())?)
            .await?;
        assert_eq!(transcript.status(), StatusCode::OK);
        let messages: Vec<Message> = serde_json::from_str(&body_text(transcript).await?)?;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "You said:\nI feel great");
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_turn() -> Result<(), Box<dyn std::error::Error>> {
        let response = router(test_state()?).oneshot(chat_request("   ")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await?;
        assert!(body.contains("\"state\":\"rejected\""));
        assert!(body.contains("Please enter a message."));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_turn_conflicts() -> Result<(), Box<dyn std::error::Error>> {
        let state = test_state()?;
        let _busy = state.conversation.lock().await;

        let response = router(Arc::clone(&state)).oneshot(chat_request("hello")?).await?;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let transcript = router(Arc::clone(&state))
            .oneshot(Request::builder().uri("/api/transcript").body(Body::empty())?)
            .await?;
        assert_eq!(transcript.status(), StatusCode::CONFLICT);
        Ok(())
    }
}
