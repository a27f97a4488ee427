use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::PropertySettings;
use crate::parsers::fuzzy::tokens;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Faq,
    Service,
    Chitchat,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "FAQ",
            Self::Service => "SERVICE",
            Self::Chitchat => "CHITCHAT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub intent: Intent,
    pub confidence: f64,
    /// Independent sentiment signal; surfaced even when the intent is not
    /// SERVICE so the router can escalate complaints wherever they appear.
    pub negative: bool,
}

const SERVICE_KEYWORDS: &[&str] = &[
    "book",
    "booking",
    "reserve",
    "reservation",
    "table",
    "spa",
    "massage",
    "taxi",
    "transfer",
    "housekeeping",
    "towel",
    "towels",
    "cleaning",
    "laundry",
    "checkout",
    "check-out",
    "late checkout",
    "room service",
    "wake up call",
    "wake-up call",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "broken",
    "not working",
    "doesn't work",
    "dirty",
    "filthy",
    "smell",
    "smells",
    "stink",
    "leak",
    "leaking",
    "flooded",
    "noisy",
    "noise",
    "too loud",
    "cold shower",
    "no hot water",
    "complaint",
    "complain",
    "disappointed",
    "unacceptable",
    "terrible",
    "awful",
    "horrible",
    "worst",
    "angry",
    "furious",
    "upset",
    "refund",
    "overcharged",
    "charged twice",
    "double charged",
    "wrong charge",
    "billing",
    "scam",
    "ridiculous",
    "damage",
    "damaged",
];

const GREETING_KEYWORDS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "thanks",
    "thank you",
    "thankyou",
    "cheers",
    "great",
    "awesome",
    "perfect",
];

const QUESTION_LEADS: &[&str] = &[
    "what", "when", "where", "who", "which", "how", "why", "is", "are", "do", "does", "can",
    "could", "would", "will",
];

const FAQ_HINTS: &[&str] = &["price", "prices", "cost", "time", "open", "opening", "hours", "close"];

const HUMAN_PHRASES: &[&str] = &[
    "talk to a human",
    "speak to a human",
    "talk to a person",
    "speak to a person",
    "real person",
    "talk to staff",
    "speak to staff",
    "talk to someone",
    "speak to someone",
    "talk to the manager",
    "speak to the manager",
    "human please",
    "agent please",
];

/// Classify one guest message.
///
/// Priority order: operational signals (service or complaint keywords) beat
/// chit-chat, chit-chat beats question shapes, and anything else is UNKNOWN.
/// A complaint always classifies as SERVICE because operational risk outranks
/// informational intent.
pub fn decide(text: &str, settings: &PropertySettings) -> Decision {
    let lower = text.to_lowercase();
    let negative = is_negative(&lower);

    let decision = if negative || matches_any(&lower, SERVICE_KEYWORDS) {
        Decision { intent: Intent::Service, confidence: 0.9, negative }
    } else if settings.chitchat_enabled && is_greeting(&lower) {
        Decision { intent: Intent::Chitchat, confidence: 0.99, negative }
    } else if looks_like_question(&lower) {
        Decision { intent: Intent::Faq, confidence: 0.85, negative }
    } else {
        Decision { intent: Intent::Unknown, confidence: 0.5, negative }
    };

    debug!(
        event_name = "intent.decided",
        intent = decision.intent.as_str(),
        confidence = decision.confidence,
        negative = decision.negative,
        "classified inbound message"
    );

    decision
}

/// Explicit "get me a human" phrasing, which overrides whatever the
/// classifier said.
pub fn wants_human(text: &str) -> bool {
    let lower = text.to_lowercase();
    matches_any(&lower, HUMAN_PHRASES)
}

fn is_negative(lower: &str) -> bool {
    matches_any(lower, NEGATIVE_KEYWORDS)
}

fn is_greeting(lower: &str) -> bool {
    let words = tokens(lower);
    if words.is_empty() || words.len() > 6 {
        return false;
    }
    GREETING_KEYWORDS.iter().any(|kw| {
        if kw.contains(' ') {
            lower.contains(kw)
        } else {
            words.iter().any(|w| w == kw)
        }
    })
}

fn looks_like_question(lower: &str) -> bool {
    if lower.trim_end().ends_with('?') {
        return true;
    }
    let words = tokens(lower);
    if let Some(first) = words.first() {
        if QUESTION_LEADS.contains(&first.as_str()) {
            return true;
        }
    }
    words.iter().any(|w| FAQ_HINTS.contains(&w.as_str()))
}

fn matches_any(lower: &str, keywords: &[&str]) -> bool {
    let words = tokens(lower);
    keywords.iter().any(|kw| {
        if kw.contains(' ') || kw.contains('-') {
            lower.contains(kw)
        } else {
            words.iter().any(|w| w == kw)
        }
    })
}
