//! Webhook payload normalization. Every channel posts the same envelope to
//! the webhook; one function per channel turns it into the core
//! `InboundEvent` and drops the traffic the core should never see (bot
//! echoes, empty messages).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use concierge_core::domain::{
    Author, ConversationKey, InboundEvent, Language, SourceChannel,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("unsupported channel `{0}`")]
    UnknownChannel(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// The raw webhook body as the messaging platform delivers it.
#[derive(Clone, Debug, Deserialize)]
pub struct WebhookPayload {
    pub property_id: String,
    pub conversation_id: String,
    pub channel: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<String>,
    /// Button payload when the guest tapped a quick reply or menu entry.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Channel-independent fields, parsed once before per-channel handling.
struct Envelope {
    key: ConversationKey,
    text: String,
    lang: Language,
    timestamp: DateTime<Utc>,
    author: Author,
    button_payload: Option<String>,
}

/// Turn a webhook body into a core event. `Ok(None)` means the payload is
/// valid but not worth routing: a bot echo or an empty message with no
/// button payload.
pub fn normalize(payload: WebhookPayload) -> Result<Option<InboundEvent>, NormalizeError> {
    if payload.property_id.is_empty() {
        return Err(NormalizeError::MissingField("property_id"));
    }
    if payload.conversation_id.is_empty() {
        return Err(NormalizeError::MissingField("conversation_id"));
    }

    let channel = payload.channel.to_ascii_lowercase();

    let author = match payload.author.as_deref() {
        Some("staff") => Author::Staff,
        Some("bot") => return Ok(None),
        _ => Author::Guest,
    };

    let envelope = Envelope {
        key: ConversationKey::new(payload.property_id, payload.conversation_id),
        text: payload.text.unwrap_or_default().trim().to_owned(),
        lang: payload.language.as_deref().map(Language::from_tag).unwrap_or_default(),
        timestamp: payload.timestamp.unwrap_or_else(Utc::now),
        author,
        button_payload: payload.payload,
    };

    match channel.as_str() {
        "whatsapp" => Ok(normalize_whatsapp(envelope)),
        "webchat" => Ok(normalize_webchat(envelope)),
        "sms" => Ok(normalize_sms(envelope)),
        other => Err(NormalizeError::UnknownChannel(other.to_owned())),
    }
}

fn normalize_whatsapp(envelope: Envelope) -> Option<InboundEvent> {
    interactive_event(envelope, SourceChannel::Whatsapp)
}

fn normalize_webchat(envelope: Envelope) -> Option<InboundEvent> {
    interactive_event(envelope, SourceChannel::Webchat)
}

/// SMS has no buttons; a `payload` field on an sms body is platform noise
/// and never reaches the router.
fn normalize_sms(envelope: Envelope) -> Option<InboundEvent> {
    if envelope.text.is_empty() {
        return None;
    }
    Some(into_event(envelope, SourceChannel::Sms, None))
}

/// Button-capable channels: a tapped button with no typed text still routes.
fn interactive_event(mut envelope: Envelope, channel: SourceChannel) -> Option<InboundEvent> {
    if envelope.text.is_empty() && envelope.button_payload.is_none() {
        return None;
    }
    let shortcut = envelope.button_payload.take();
    Some(into_event(envelope, channel, shortcut))
}

fn into_event(
    envelope: Envelope,
    source_channel: SourceChannel,
    shortcut_payload: Option<String>,
) -> InboundEvent {
    InboundEvent {
        key: envelope.key,
        text: envelope.text,
        lang: envelope.lang,
        timestamp: envelope.timestamp,
        source_channel,
        author: envelope.author,
        shortcut_payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(text: &str) -> WebhookPayload {
        WebhookPayload {
            property_id: "p1".to_owned(),
            conversation_id: "c1".to_owned(),
            channel: "whatsapp".to_owned(),
            text: Some(text.to_owned()),
            language: Some("vi-VN".to_owned()),
            timestamp: None,
            author: None,
            payload: None,
        }
    }

    #[test]
    fn guest_message_normalizes_with_language_tag() {
        let event = normalize(payload("xin chào")).unwrap().unwrap();
        assert_eq!(event.lang, Language::Vi);
        assert_eq!(event.author, Author::Guest);
        assert_eq!(event.source_channel, SourceChannel::Whatsapp);
        assert_eq!(event.text, "xin chào");
    }

    #[test]
    fn bot_echoes_are_dropped() {
        let mut p = payload("Wonderful, that's confirmed!");
        p.author = Some("bot".to_owned());
        assert_eq!(normalize(p).unwrap(), None);
    }

    #[test]
    fn empty_text_without_button_payload_is_dropped() {
        let p = payload("   ");
        assert_eq!(normalize(p).unwrap(), None);

        let mut with_button = payload("");
        with_button.payload = Some("welcome:taxi".to_owned());
        let event = normalize(with_button).unwrap().unwrap();
        assert_eq!(event.shortcut_payload.as_deref(), Some("welcome:taxi"));
    }

    #[test]
    fn sms_never_carries_a_button_payload() {
        let mut p = payload("book a taxi");
        p.channel = "sms".to_owned();
        p.payload = Some("welcome:taxi".to_owned());
        let event = normalize(p).unwrap().unwrap();
        assert_eq!(event.source_channel, SourceChannel::Sms);
        assert_eq!(event.shortcut_payload, None);

        let mut empty = payload("");
        empty.channel = "sms".to_owned();
        empty.payload = Some("welcome:taxi".to_owned());
        assert_eq!(normalize(empty).unwrap(), None);
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let mut p = payload("hi");
        p.channel = "carrier-pigeon".to_owned();
        assert_eq!(
            normalize(p).unwrap_err(),
            NormalizeError::UnknownChannel("carrier-pigeon".to_owned())
        );
    }

    #[test]
    fn staff_author_is_preserved() {
        let mut p = payload("@botoff 15");
        p.author = Some("staff".to_owned());
        let event = normalize(p).unwrap().unwrap();
        assert_eq!(event.author, Author::Staff);
    }
}
