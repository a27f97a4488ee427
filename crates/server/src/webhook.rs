//! The inbound webhook. Each request is processed to completion — state
//! read, decision, state write, reply — before the response goes out, which
//! is what keeps per-conversation handling effectively sequential.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router as AxumRouter};
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use concierge_channel::{normalize, WebhookPayload};
use concierge_core::Router;

#[derive(Clone)]
pub struct WebhookState {
    pub router: Arc<Router>,
}

pub fn router(state: WebhookState) -> AxumRouter {
    AxumRouter::new().route("/webhook", post(handle_webhook)).with_state(state)
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    state: WebhookState,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(event_name = "system.webhook.start", bind_address = %address, "webhook listener started");

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.webhook.error",
                error = %err,
                "webhook server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn handle_webhook(
    State(state): State<WebhookState>,
    Json(payload): Json<WebhookPayload>,
) -> (StatusCode, Json<Value>) {
    let correlation_id = Uuid::new_v4().to_string();

    let event = match normalize(payload) {
        Ok(Some(event)) => event,
        Ok(None) => {
            return (StatusCode::OK, Json(json!({ "outcome": "ignored" })));
        }
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": error.to_string(), "correlation_id": correlation_id })),
            );
        }
    };

    match state.router.handle(&event).await {
        Ok(outcome) => {
            let body = serde_json::to_value(&outcome).unwrap_or_else(|_| json!({}));
            (StatusCode::OK, Json(body))
        }
        Err(app_error) => {
            let interface = app_error.into_interface(&correlation_id);
            error!(
                event_name = "webhook.handling_failed",
                correlation_id = correlation_id.as_str(),
                error = %interface,
                "inbound event could not be processed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": interface.user_message(),
                    "correlation_id": correlation_id,
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use chrono::Utc;

    use concierge_core::collab::memory::{
        CannedSmalltalk, FixedSettings, InMemoryStore, NoopExtractor, RecordingNotifier,
        RecordingPlatform, RecordingReplySender, StaticFaq,
    };
    use concierge_core::{Collaborators, DialogEngine, Router};

    use super::*;

    fn state() -> WebhookState {
        let collab = Collaborators {
            store: Arc::new(InMemoryStore::new()),
            replies: Arc::new(RecordingReplySender::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            platform: Arc::new(RecordingPlatform::default()),
            faq: Arc::new(StaticFaq::default()),
            settings: Arc::new(FixedSettings::default()),
            smalltalk: Arc::new(CannedSmalltalk),
            extractor: Arc::new(NoopExtractor),
        };
        WebhookState { router: Arc::new(Router::new(collab, DialogEngine::default())) }
    }

    fn payload(text: &str, author: Option<&str>) -> WebhookPayload {
        serde_json::from_value(serde_json::json!({
            "property_id": "p1",
            "conversation_id": "c1",
            "channel": "webchat",
            "text": text,
            "language": "en",
            "timestamp": Utc::now(),
            "author": author,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn guest_message_returns_routing_outcome() {
        let (status, Json(body)) =
            handle_webhook(State(state()), Json(payload("hello there", None))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "replied");
    }

    #[tokio::test]
    async fn bot_echo_is_ignored() {
        let (status, Json(body)) =
            handle_webhook(State(state()), Json(payload("echo", Some("bot")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "ignored");
    }

    #[tokio::test]
    async fn paused_conversation_reports_the_skip() {
        let s = state();
        handle_webhook(State(s.clone()), Json(payload("@botoff 15", Some("staff")))).await;

        let (status, Json(body)) =
            handle_webhook(State(s), Json(payload("anyone?", None))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "skipped");
        assert_eq!(body["reason"], "paused");
    }

    #[tokio::test]
    async fn unknown_channel_is_a_bad_request() {
        let raw = serde_json::json!({
            "property_id": "p1",
            "conversation_id": "c1",
            "channel": "pigeon",
            "text": "hi",
        });
        let payload: WebhookPayload = serde_json::from_value(raw).unwrap();
        let (status, Json(body)) = handle_webhook(State(state()), Json(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("pigeon"));
    }
}
