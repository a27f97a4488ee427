use serde::{Deserialize, Serialize};

/// Per-property behaviour knobs, resolved once per inbound event through the
/// `SettingsProvider` collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertySettings {
    /// Minimum FAQ search score for answering directly instead of clarifying.
    pub faq_conf_threshold: f64,
    pub chitchat_enabled: bool,
    /// Accumulated negative messages that upgrade escalation priority to high.
    pub negative_repeat_threshold: u32,
    /// Default hard-pause duration when staff omit the minutes argument.
    pub auto_resume_minutes: i64,
    /// Property-specific phrases that force an urgent escalation.
    pub escalate_keywords: Vec<String>,
    /// Clarify attempts tolerated before escalating to staff.
    pub max_clarify_attempts: u32,
}

impl Default for PropertySettings {
    fn default() -> Self {
        Self {
            faq_conf_threshold: 0.75,
            chitchat_enabled: true,
            negative_repeat_threshold: 2,
            auto_resume_minutes: 60,
            escalate_keywords: Vec::new(),
            max_clarify_attempts: 2,
        }
    }
}
