use std::sync::OnceLock;

use regex::Regex;

use super::date::contains_date_phrase;
use super::time::contains_time_pattern;

fn under_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bunder\s+(?:the\s+name\s+(?:of\s+)?)?([a-zA-Z][a-zA-Z '-]{0,40})").unwrap()
    })
}

fn name_is_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:my\s+name\s+is|the\s+name\s+is|name\s+is|name's)\s+([a-zA-Z][a-zA-Z '-]{0,40})")
            .unwrap()
    })
}

fn for_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bfor\s+([a-zA-Z][a-zA-Z'-]*(?:\s+[a-zA-Z][a-zA-Z'-]*)?)\b").unwrap()
    })
}

// Words that disqualify a candidate from being somebody's name.
const NOT_A_NAME: &[&str] = &[
    "book", "booking", "reserve", "reservation", "table", "room", "spa", "taxi", "dinner",
    "lunch", "breakfast", "brunch", "drinks", "people", "person", "persons", "pax", "guest",
    "guests", "adults", "kids", "children", "today", "tonight", "tomorrow", "noon", "midnight",
    "morning", "evening", "afternoon", "night", "next", "week", "am", "pm", "yes", "no", "ok",
    "okay", "sure", "hi", "hello", "hey", "thanks", "thank", "please", "cancel", "change", "the",
    "a", "an", "us", "me", "them", "him", "her", "one", "two", "three", "four", "five", "six",
    "seven", "eight", "nine", "ten",
];

const POLITE_TAILS: &[&str] = &["please", "thanks", "thank you", "thx", "pls"];

/// Extract a booking name.
///
/// Requires an explicit cue ("under X", "name is X"), a guarded "for X" that
/// does not look like a date/time/guest-count phrase, or a polite short
/// message that is nothing but a name. Conservative by design: `None` means
/// the dialog engine asks again.
pub fn parse_name(text: &str) -> Option<String> {
    if let Some(caps) = under_re().captures(text) {
        return clean_candidate(&caps[1]);
    }
    if let Some(caps) = name_is_re().captures(text) {
        return clean_candidate(&caps[1]);
    }

    // "for X" only counts when X cannot be read as any other slot.
    if !contains_time_pattern(text) && !contains_date_phrase(text) {
        for caps in for_re().captures_iter(text) {
            if let Some(name) = clean_candidate(&caps[1]) {
                return Some(name);
            }
        }
    }

    bare_name(text)
}

/// A short purely-alphabetic message with no booking vocabulary is accepted
/// as a name; this is the common reply to "what name should I put it under?".
fn bare_name(text: &str) -> Option<String> {
    let mut trimmed = text.trim().trim_end_matches(['.', '!']).to_owned();
    let lower = trimmed.to_lowercase();
    for tail in POLITE_TAILS {
        if let Some(stripped) = lower.strip_suffix(tail) {
            trimmed.truncate(stripped.trim_end().trim_end_matches(',').len());
            break;
        }
    }
    let trimmed = trimmed.trim().trim_end_matches(',');

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.is_empty() || words.len() > 3 {
        return None;
    }
    if !words.iter().all(|w| w.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-')) {
        return None;
    }
    if words.iter().any(|w| NOT_A_NAME.contains(&w.to_lowercase().as_str())) {
        return None;
    }
    Some(title_case(&words.join(" ")))
}

fn clean_candidate(raw: &str) -> Option<String> {
    let mut candidate = raw.trim().to_owned();
    let lower = candidate.to_lowercase();
    for tail in POLITE_TAILS {
        if let Some(stripped) = lower.strip_suffix(tail) {
            candidate.truncate(stripped.trim_end().trim_end_matches(',').len());
            break;
        }
    }
    let candidate = candidate.trim();

    let words: Vec<&str> = candidate.split_whitespace().collect();
    if words.is_empty() || words.len() > 3 {
        return None;
    }
    if words.iter().any(|w| NOT_A_NAME.contains(&w.to_lowercase().as_str())) {
        return None;
    }
    Some(title_case(candidate))
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.as_str().chars()).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
