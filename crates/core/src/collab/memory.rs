//! In-memory collaborators. Used by the simulation CLI and by tests that
//! exercise the router without a database or a platform connection.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{
    CollabError, ConversationPlatform, ConversationStatus, ConversationStore, FaqAnswer,
    FaqSearch, ReplySender, SettingsProvider, SlotExtractor, SmalltalkResponder, StoreError,
};
use crate::domain::{
    ConversationKey, ConversationState, Language, NormalizedBooking, Priority, PropertySettings,
    Reply,
};

#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<HashMap<ConversationKey, ConversationState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, state: ConversationState) {
        self.rows.lock().unwrap().insert(state.key.clone(), state);
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn load(&self, key: &ConversationKey) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.rows.lock().unwrap().get(key).cloned())
    }

    async fn upsert(&self, state: &ConversationState) -> Result<(), StoreError> {
        self.rows.lock().unwrap().insert(state.key.clone(), state.clone());
        Ok(())
    }

    async fn mark_escalated_once(&self, key: &ConversationKey) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(key) {
            Some(state) if !state.escalated => {
                state.escalated = true;
                state.updated_at = Utc::now();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                let mut state = ConversationState::new(key.clone(), Utc::now());
                state.escalated = true;
                rows.insert(key.clone(), state);
                Ok(true)
            }
        }
    }

    async fn list_expired_paused(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ConversationState>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut expired: Vec<ConversationState> = rows
            .values()
            .filter(|s| s.paused && s.resume_at.is_some_and(|at| at <= now))
            .cloned()
            .collect();
        expired.sort_by_key(|s| s.resume_at);
        expired.truncate(limit as usize);
        Ok(expired)
    }
}

/// Records every outbound reply instead of sending it.
#[derive(Default)]
pub struct RecordingReplySender {
    pub sent: Mutex<Vec<(ConversationKey, Reply)>>,
}

impl RecordingReplySender {
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, r)| r.text.clone()).collect()
    }
}

#[async_trait]
impl ReplySender for RecordingReplySender {
    async fn send_reply(&self, key: &ConversationKey, reply: &Reply) -> Result<(), CollabError> {
        self.sent.lock().unwrap().push((key.clone(), reply.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<(ConversationKey, String, Priority)>>,
}

#[async_trait]
impl super::StaffNotifier for RecordingNotifier {
    async fn notify_staff(
        &self,
        key: &ConversationKey,
        message: &str,
        priority: Priority,
    ) -> Result<(), CollabError> {
        self.notifications.lock().unwrap().push((key.clone(), message.to_owned(), priority));
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlatformCall {
    Label(String),
    Priority(Priority),
    Assign(String),
    Status(ConversationStatus),
}

#[derive(Default)]
pub struct RecordingPlatform {
    pub calls: Mutex<Vec<(ConversationKey, PlatformCall)>>,
}

impl RecordingPlatform {
    fn record(&self, key: &ConversationKey, call: PlatformCall) {
        self.calls.lock().unwrap().push((key.clone(), call));
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, c)| match c {
                PlatformCall::Label(l) => Some(l.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ConversationPlatform for RecordingPlatform {
    async fn add_label(&self, key: &ConversationKey, label: &str) -> Result<(), CollabError> {
        self.record(key, PlatformCall::Label(label.to_owned()));
        Ok(())
    }

    async fn set_priority(
        &self,
        key: &ConversationKey,
        priority: Priority,
    ) -> Result<(), CollabError> {
        self.record(key, PlatformCall::Priority(priority));
        Ok(())
    }

    async fn assign(&self, key: &ConversationKey, assignee: &str) -> Result<(), CollabError> {
        self.record(key, PlatformCall::Assign(assignee.to_owned()));
        Ok(())
    }

    async fn set_status(
        &self,
        key: &ConversationKey,
        status: ConversationStatus,
    ) -> Result<(), CollabError> {
        self.record(key, PlatformCall::Status(status));
        Ok(())
    }
}

/// Keyword-substring FAQ table with a fixed score per entry.
#[derive(Default)]
pub struct StaticFaq {
    entries: Vec<(String, String, f64)>,
}

impl StaticFaq {
    pub fn with_entry(mut self, trigger: &str, answer: &str, score: f64) -> Self {
        self.entries.push((trigger.to_lowercase(), answer.to_owned(), score));
        self
    }
}

#[async_trait]
impl FaqSearch for StaticFaq {
    async fn search(
        &self,
        _property_id: &str,
        query: &str,
        _lang: Language,
    ) -> Result<Option<FaqAnswer>, CollabError> {
        let lower = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|(trigger, _, _)| lower.contains(trigger.as_str()))
            .max_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(_, answer, score)| FaqAnswer { answer: answer.clone(), score: *score }))
    }
}

pub struct FixedSettings {
    pub settings: PropertySettings,
}

impl Default for FixedSettings {
    fn default() -> Self {
        Self { settings: PropertySettings::default() }
    }
}

#[async_trait]
impl SettingsProvider for FixedSettings {
    async fn settings_for(&self, _property_id: &str) -> PropertySettings {
        self.settings.clone()
    }
}

/// Greeting/thanks/farewell canned lines, per language.
#[derive(Default)]
pub struct CannedSmalltalk;

impl SmalltalkResponder for CannedSmalltalk {
    fn reply_to(&self, text: &str, lang: Language) -> Option<String> {
        let lower = text.to_lowercase();
        let greeting = ["hi", "hello", "hey", "good morning", "good evening", "xin chao", "hallo"]
            .iter()
            .any(|g| lower.contains(g));
        let thanks = ["thank", "thanks", "cam on", "cảm ơn", "bedankt", "dank"]
            .iter()
            .any(|t| lower.contains(t));

        if thanks {
            return Some(
                match lang {
                    Language::En => "You're very welcome! Anything else I can help with?",
                    Language::Vi => "Dạ không có gì ạ! Anh/chị cần hỗ trợ gì thêm không ạ?",
                    Language::Nl => "Graag gedaan! Kan ik nog ergens mee helpen?",
                }
                .to_owned(),
            );
        }
        if greeting {
            return Some(
                match lang {
                    Language::En => "Hello! How can I help you today?",
                    Language::Vi => "Xin chào! Em có thể giúp gì cho anh/chị ạ?",
                    Language::Nl => "Hallo! Waarmee kan ik u helpen?",
                }
                .to_owned(),
            );
        }
        None
    }
}

/// Extraction disabled: every message yields no hints.
#[derive(Default)]
pub struct NoopExtractor;

#[async_trait]
impl SlotExtractor for NoopExtractor {
    async fn extract(&self, _text: &str, _today: NaiveDate) -> Option<NormalizedBooking> {
        None
    }
}
