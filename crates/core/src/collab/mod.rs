//! Seams to everything outside the decision core: persistence, the chat
//! platform, FAQ search, smalltalk, settings, and the optional extraction
//! service. The router and state machines only ever talk to these traits.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::{
    ConversationKey, ConversationState, Language, NormalizedBooking, Priority, PropertySettings,
    Reply,
};
use crate::errors::DomainError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("platform api error: {0}")]
    Api(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Persistent conversation state. Writes that record a state transition must
/// succeed before a reply is considered final; everything else in this module
/// is best-effort.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, key: &ConversationKey) -> Result<Option<ConversationState>, StoreError>;

    /// Idempotent create-or-replace keyed on (property, conversation).
    async fn upsert(&self, state: &ConversationState) -> Result<(), StoreError>;

    /// Atomically flip `escalated` false -> true. Returns whether this call
    /// performed the flip; concurrent retries see `false` and must skip the
    /// staff notification.
    async fn mark_escalated_once(&self, key: &ConversationKey) -> Result<bool, StoreError>;

    /// Paused conversations whose resume deadline has elapsed, oldest first,
    /// bounded by `limit`.
    async fn list_expired_paused(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ConversationState>, StoreError>;
}

#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Deliver a reply to the guest channel (or as a private staff mirror).
    /// Safe to call more than once per turn.
    async fn send_reply(&self, key: &ConversationKey, reply: &Reply) -> Result<(), CollabError>;
}

#[async_trait]
pub trait StaffNotifier: Send + Sync {
    async fn notify_staff(
        &self,
        key: &ConversationKey,
        message: &str,
        priority: Priority,
    ) -> Result<(), CollabError>;
}

/// The only two statuses the platform is ever asked to set. Anything else
/// coming from configuration or callers is rejected before it leaves the
/// process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Resolved,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            other => Err(DomainError::UnsupportedStatus(other.to_owned())),
        }
    }
}

#[async_trait]
pub trait ConversationPlatform: Send + Sync {
    async fn add_label(&self, key: &ConversationKey, label: &str) -> Result<(), CollabError>;
    async fn set_priority(&self, key: &ConversationKey, priority: Priority)
        -> Result<(), CollabError>;
    async fn assign(&self, key: &ConversationKey, assignee: &str) -> Result<(), CollabError>;
    async fn set_status(
        &self,
        key: &ConversationKey,
        status: ConversationStatus,
    ) -> Result<(), CollabError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaqAnswer {
    pub answer: String,
    pub score: f64,
}

#[async_trait]
pub trait FaqSearch: Send + Sync {
    async fn search(
        &self,
        property_id: &str,
        query: &str,
        lang: Language,
    ) -> Result<Option<FaqAnswer>, CollabError>;
}

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Settings resolution is infallible: a missing property falls back to
    /// the configured defaults.
    async fn settings_for(&self, property_id: &str) -> PropertySettings;
}

pub trait SmalltalkResponder: Send + Sync {
    fn reply_to(&self, text: &str, lang: Language) -> Option<String>;
}

/// Optional LLM slot pre-extraction. Implementations own their timeout and
/// validation; a `None` simply means "no usable hint".
#[async_trait]
pub trait SlotExtractor: Send + Sync {
    async fn extract(&self, text: &str, today: chrono::NaiveDate) -> Option<NormalizedBooking>;
}

/// Run a best-effort side effect: bounded attempts, failures logged and
/// swallowed. Labeling or notification problems must never stall the
/// conversational reply.
pub async fn collateral<F, Fut>(name: &str, attempts: u32, operation: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<(), CollabError>>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match operation().await {
            Ok(()) => return,
            Err(error) => {
                warn!(
                    event_name = "collab.collateral_failed",
                    operation = name,
                    attempt,
                    attempts,
                    error = %error,
                    "collateral side effect failed"
                );
            }
        }
    }
}
