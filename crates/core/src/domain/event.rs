use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversation::ConversationKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceChannel {
    Whatsapp,
    Webchat,
    Sms,
}

impl SourceChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Webchat => "webchat",
            Self::Sms => "sms",
        }
    }
}

/// Who authored the inbound message, as reported by the channel adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    Guest,
    Staff,
    Bot,
}

/// The normalized envelope every channel adapter produces. The core never
/// inspects raw channel payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub key: ConversationKey,
    pub text: String,
    pub lang: Language,
    pub timestamp: DateTime<Utc>,
    pub source_channel: SourceChannel,
    pub author: Author,
    /// Set when the guest tapped a welcome-menu button instead of typing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut_payload: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Vi,
    Nl,
}

impl Language {
    pub fn from_tag(tag: &str) -> Self {
        match tag.split(['-', '_']).next().unwrap_or("").to_ascii_lowercase().as_str() {
            "vi" => Self::Vi,
            "nl" => Self::Nl,
            _ => Self::En,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<String>,
    /// Private replies mirror to staff only and never reach the guest.
    #[serde(default)]
    pub private: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), quick_replies: Vec::new(), private: false }
    }

    pub fn with_quick_replies(text: impl Into<String>, quick_replies: Vec<String>) -> Self {
        Self { text: text.into(), quick_replies, private: false }
    }

    pub fn private_note(text: impl Into<String>) -> Self {
        Self { text: text.into(), quick_replies: Vec::new(), private: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tag_parsing_falls_back_to_english() {
        assert_eq!(Language::from_tag("vi-VN"), Language::Vi);
        assert_eq!(Language::from_tag("nl"), Language::Nl);
        assert_eq!(Language::from_tag("de"), Language::En);
        assert_eq!(Language::from_tag(""), Language::En);
    }
}
