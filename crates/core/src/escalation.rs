//! Escalation and pause state machine: the transitions that decide whether
//! staff gets pulled in and whether the bot is allowed to keep talking.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::collab::{
    collateral, ConversationPlatform, ConversationStatus, ConversationStore, StaffNotifier,
    StoreError,
};
use crate::domain::{ConversationState, Priority, PropertySettings};

pub const ESCALATED_LABEL: &str = "escalated";

/// Everything priority derivation looks at for one inbound message.
#[derive(Clone, Copy, Debug, Default)]
pub struct EscalationSignal {
    pub emergency: bool,
    pub negative: bool,
    pub negative_count: u32,
    pub service_intent: bool,
}

/// Emergency > strong negative signal > service request > everything else.
pub fn derive_priority(signal: EscalationSignal, settings: &PropertySettings) -> Priority {
    if signal.emergency {
        Priority::Urgent
    } else if signal.negative || signal.negative_count >= settings.negative_repeat_threshold {
        Priority::High
    } else if signal.service_intent {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Property-specific phrases ("fire", "flood", ...) that force an urgent page.
pub fn is_emergency(text: &str, settings: &PropertySettings) -> bool {
    let lower = text.to_lowercase();
    settings
        .escalate_keywords
        .iter()
        .any(|kw| !kw.is_empty() && lower.contains(&kw.to_lowercase()))
}

pub struct EscalationEngine {
    store: Arc<dyn ConversationStore>,
    notifier: Arc<dyn StaffNotifier>,
    platform: Arc<dyn ConversationPlatform>,
}

impl EscalationEngine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        notifier: Arc<dyn StaffNotifier>,
        platform: Arc<dyn ConversationPlatform>,
    ) -> Self {
        Self { store, notifier, platform }
    }

    /// Soft escalation: staff is asked to look, the bot keeps talking. The
    /// staff notification fires at most once per episode; the atomic flip in
    /// the store is what makes delivery retries safe. Labels, priority and
    /// the watch flag are refreshed on every call.
    pub async fn soft_escalate(
        &self,
        state: &mut ConversationState,
        reason: &str,
        priority: Priority,
    ) -> Result<(), StoreError> {
        let key = state.key.clone();
        let flipped = self.store.mark_escalated_once(&key).await?;
        state.escalated = true;
        state.watch_mode = true;
        state.updated_at = Utc::now();
        self.store.upsert(state).await?;

        if flipped {
            let message = format!("Guest conversation needs attention: {reason}");
            collateral("notify_staff", 2, || {
                self.notifier.notify_staff(&key, &message, priority)
            })
            .await;
        }

        collateral("add_label", 1, || self.platform.add_label(&key, ESCALATED_LABEL)).await;
        collateral("set_priority", 1, || self.platform.set_priority(&key, priority)).await;

        info!(
            event_name = "escalation.soft",
            property_id = %key.property_id.0,
            conversation_id = %key.conversation_id.0,
            first_notification = flipped,
            priority = priority.as_str(),
            reason,
            "conversation escalated to watch mode"
        );
        Ok(())
    }

    /// Hard pause: the bot goes silent until the deadline elapses or staff
    /// resumes manually. A repeated pause refreshes the deadline without
    /// posting a second staff note.
    pub async fn hard_pause(
        &self,
        state: &mut ConversationState,
        minutes: Option<i64>,
        settings: &PropertySettings,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let already_paused = state.paused;
        let minutes = minutes.unwrap_or(settings.auto_resume_minutes).max(1);

        state.paused = true;
        state.resume_at = Some(now + Duration::minutes(minutes));
        state.updated_at = now;
        self.store.upsert(state).await?;

        if !already_paused {
            let key = state.key.clone();
            let message = format!("Bot paused for {minutes} minutes; staff has the conversation.");
            collateral("notify_staff", 1, || {
                self.notifier.notify_staff(&key, &message, Priority::Medium)
            })
            .await;
        }

        info!(
            event_name = "escalation.hard_pause",
            property_id = %state.key.property_id.0,
            conversation_id = %state.key.conversation_id.0,
            minutes,
            refreshed = already_paused,
            "conversation hard-paused"
        );
        Ok(())
    }

    /// Manual resume. Posting a "resumed" note only when the conversation was
    /// actually paused keeps repeated `@boton` harmless.
    pub async fn resume(
        &self,
        state: &mut ConversationState,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let was_paused = state.paused;

        state.paused = false;
        state.resume_at = None;
        state.negative_count = 0;
        state.clarify_attempts = 0;
        state.updated_at = now;
        self.store.upsert(state).await?;

        if was_paused {
            let key = state.key.clone();
            collateral("notify_staff", 1, || {
                self.notifier.notify_staff(&key, "Bot resumed on this conversation.", Priority::Low)
            })
            .await;
            collateral("set_status", 1, || {
                self.platform.set_status(&key, ConversationStatus::Open)
            })
            .await;
        }

        info!(
            event_name = "escalation.resume",
            property_id = %state.key.property_id.0,
            conversation_id = %state.key.conversation_id.0,
            was_paused,
            "conversation resumed"
        );
        Ok(was_paused)
    }

    /// Resolve: close the conversation out and wipe every flag, counter and
    /// in-progress flow.
    pub async fn resolve(
        &self,
        state: &mut ConversationState,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        *state = state.clone().cleared(now);
        self.store.upsert(state).await?;

        let key = state.key.clone();
        collateral("set_status", 1, || {
            self.platform.set_status(&key, ConversationStatus::Resolved)
        })
        .await;
        collateral("notify_staff", 1, || {
            self.notifier.notify_staff(&key, "Conversation resolved; bot state cleared.", Priority::Low)
        })
        .await;

        info!(
            event_name = "escalation.resolve",
            property_id = %key.property_id.0,
            conversation_id = %key.conversation_id.0,
            "conversation resolved"
        );
        Ok(())
    }

    /// One sweep tick: resume every paused conversation whose deadline has
    /// elapsed, up to `batch_size` rows. Returns how many were resumed. Safe
    /// to run concurrently with live traffic because the resume write is
    /// idempotent.
    pub async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
        batch_size: u32,
    ) -> Result<u32, StoreError> {
        let expired = self.store.list_expired_paused(now, batch_size).await?;
        let mut resumed = 0u32;

        for mut state in expired {
            state.paused = false;
            state.resume_at = None;
            state.negative_count = 0;
            state.clarify_attempts = 0;
            state.updated_at = now;
            self.store.upsert(&state).await?;

            let key = state.key.clone();
            collateral("notify_staff", 1, || {
                self.notifier.notify_staff(
                    &key,
                    "Pause timer elapsed; bot auto-resumed.",
                    Priority::Low,
                )
            })
            .await;
            collateral("set_status", 1, || {
                self.platform.set_status(&key, ConversationStatus::Open)
            })
            .await;
            resumed += 1;
        }

        if resumed > 0 {
            info!(event_name = "escalation.sweep", resumed, "auto-resume sweep tick");
        }
        Ok(resumed)
    }
}
