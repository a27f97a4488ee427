//! HTTP client for the messaging platform's REST API. Implements the core
//! collaborator traits so the router never sees HTTP.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use concierge_core::collab::{
    CollabError, ConversationPlatform, ConversationStatus, FaqAnswer, FaqSearch, ReplySender,
    StaffNotifier,
};
use concierge_core::domain::{ConversationKey, Language, Priority, Reply};

#[derive(Clone)]
pub struct PlatformClientConfig {
    pub base_url: String,
    pub api_token: SecretString,
    /// Marker appended to outbound bot messages so the webhook can recognize
    /// and drop its own echoes.
    pub bot_tag: String,
    pub timeout_secs: u64,
}

pub struct PlatformClient {
    http: reqwest::Client,
    config: PlatformClientConfig,
}

impl PlatformClient {
    pub fn new(config: PlatformClientConfig) -> Result<Self, CollabError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| CollabError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn conversation_url(&self, key: &ConversationKey, leaf: &str) -> String {
        format!(
            "{}/properties/{}/conversations/{}/{leaf}",
            self.config.base_url.trim_end_matches('/'),
            key.property_id.0,
            key.conversation_id.0,
        )
    }

    async fn post(&self, url: &str, body: serde_json::Value) -> Result<(), CollabError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(self.config.api_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CollabError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CollabError::Api(format!("{url} returned {status}: {detail}")));
        }

        debug!(event_name = "platform.request_ok", url, "platform call succeeded");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReplySender for PlatformClient {
    async fn send_reply(&self, key: &ConversationKey, reply: &Reply) -> Result<(), CollabError> {
        let url = self.conversation_url(key, "messages");
        let text = format!("{} {}", reply.text, self.config.bot_tag);
        self.post(
            &url,
            json!({
                "text": text.trim(),
                "quick_replies": reply.quick_replies,
                "private": reply.private,
            }),
        )
        .await
    }
}

#[async_trait::async_trait]
impl StaffNotifier for PlatformClient {
    async fn notify_staff(
        &self,
        key: &ConversationKey,
        message: &str,
        priority: Priority,
    ) -> Result<(), CollabError> {
        let url = self.conversation_url(key, "notes");
        self.post(&url, json!({ "text": message, "priority": priority.as_str() })).await
    }
}

#[async_trait::async_trait]
impl ConversationPlatform for PlatformClient {
    async fn add_label(&self, key: &ConversationKey, label: &str) -> Result<(), CollabError> {
        let url = self.conversation_url(key, "labels");
        self.post(&url, json!({ "label": label })).await
    }

    async fn set_priority(
        &self,
        key: &ConversationKey,
        priority: Priority,
    ) -> Result<(), CollabError> {
        let url = self.conversation_url(key, "priority");
        self.post(&url, json!({ "priority": priority.as_str() })).await
    }

    async fn assign(&self, key: &ConversationKey, assignee: &str) -> Result<(), CollabError> {
        let url = self.conversation_url(key, "assignee");
        self.post(&url, json!({ "assignee": assignee })).await
    }

    async fn set_status(
        &self,
        key: &ConversationKey,
        status: ConversationStatus,
    ) -> Result<(), CollabError> {
        // `ConversationStatus` is a closed enum, so nothing outside
        // open/resolved can reach the wire.
        let url = self.conversation_url(key, "status");
        self.post(&url, json!({ "status": status.as_str() })).await
    }
}

#[derive(serde::Deserialize)]
struct FaqSearchResponse {
    answer: Option<String>,
    #[serde(default)]
    score: f64,
}

#[async_trait::async_trait]
impl FaqSearch for PlatformClient {
    async fn search(
        &self,
        property_id: &str,
        query: &str,
        lang: Language,
    ) -> Result<Option<FaqAnswer>, CollabError> {
        let url = format!(
            "{}/properties/{property_id}/faq/search",
            self.config.base_url.trim_end_matches('/'),
        );
        let lang_tag = match lang {
            Language::En => "en",
            Language::Vi => "vi",
            Language::Nl => "nl",
        };

        let response = self
            .http
            .get(&url)
            .bearer_auth(self.config.api_token.expose_secret())
            .query(&[("q", query), ("lang", lang_tag)])
            .send()
            .await
            .map_err(|e| CollabError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollabError::Api(format!("{url} returned {status}")));
        }

        let body: FaqSearchResponse =
            response.json().await.map_err(|e| CollabError::Api(e.to_string()))?;
        Ok(body.answer.map(|answer| FaqAnswer { answer, score: body.score }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PlatformClient {
        PlatformClient::new(PlatformClientConfig {
            base_url: "https://platform.example/api/v1/".to_owned(),
            api_token: SecretString::from("test-token"),
            bot_tag: "⦿".to_owned(),
            timeout_secs: 5,
        })
        .expect("client")
    }

    #[test]
    fn conversation_urls_strip_trailing_slash() {
        let url = client()
            .conversation_url(&ConversationKey::new("villa-aurora", "conv-9"), "messages");
        assert_eq!(
            url,
            "https://platform.example/api/v1/properties/villa-aurora/conversations/conv-9/messages"
        );
    }
}
