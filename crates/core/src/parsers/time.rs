use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Daypart {
    Am,
    Pm,
}

/// Result of time extraction. `Ambiguous` carries the raw fragment (e.g. "7"
/// or "8.30") that still needs an am/pm decision from the guest; the dialog
/// engine must clarify, never guess.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeParse {
    Exact(String),
    Ambiguous(String),
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(?:\s*[:.h]\s*(\d{2}))?\s*(am|pm|a\.m\.?|p\.m\.?)?\b").unwrap()
    })
}

fn oclock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})\s*o'?clock\b").unwrap())
}

fn bare_reply_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A message that is nothing but a (possibly "at"-prefixed) clock value.
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:at\s+)?(\d{1,2})(?:\s*[:.h]\s*(\d{2}))?\s*$").unwrap()
    })
}

/// English daypart words elsewhere in the message, used to resolve a bare
/// 1-12 hour without asking.
pub fn daypart_hint(text: &str) -> Option<Daypart> {
    let lower = text.to_lowercase();
    const AM_WORDS: &[&str] = &["morning", "breakfast", "brunch", "sunrise"];
    const PM_WORDS: &[&str] =
        &["evening", "dinner", "tonight", "supper", "afternoon", "night", "sunset"];

    if AM_WORDS.iter().any(|w| lower.contains(w)) {
        return Some(Daypart::Am);
    }
    if PM_WORDS.iter().any(|w| lower.contains(w)) {
        return Some(Daypart::Pm);
    }
    None
}

/// Extract a time of day from free text.
///
/// Accepted shapes: `8pm`, `8:30am`, `19:30`, `19h30`, `19.30`, `8 o'clock`,
/// `noon`, `midnight`, and whole-message bare values like `7` or `at 7:30`.
/// A 1-12 hour with no meridiem and no daypart hint comes back `Ambiguous`.
pub fn parse_time(text: &str) -> Option<TimeParse> {
    let lower = text.to_lowercase();

    if lower.contains("noon") && !lower.contains("afternoon") {
        return Some(TimeParse::Exact(format_display(12, 0)));
    }
    if lower.contains("midnight") {
        return Some(TimeParse::Exact(format_display(0, 0)));
    }

    // Explicit meridiem beats everything else in the message.
    for caps in time_re().captures_iter(&lower) {
        let Some(meridiem) = caps.get(3) else { continue };
        let hour: u32 = caps[1].parse().ok()?;
        if !(1..=12).contains(&hour) {
            continue;
        }
        let minute: u32 = caps.get(2).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
        if minute > 59 {
            continue;
        }
        let pm = meridiem.as_str().starts_with('p');
        let hour24 = to_hour24(hour, pm);
        return Some(TimeParse::Exact(format_display(hour24, minute)));
    }

    if let Some(caps) = oclock_re().captures(&lower) {
        let hour: u32 = caps[1].parse().ok()?;
        if (1..=12).contains(&hour) {
            return Some(match daypart_hint(&lower) {
                Some(part) => TimeParse::Exact(format_display(with_daypart(hour, part), 0)),
                None => TimeParse::Ambiguous(hour.to_string()),
            });
        }
    }

    // Separator forms without meridiem: 24h values are unambiguous, 12h
    // values lean on a daypart hint.
    for caps in time_re().captures_iter(&lower) {
        let Some(minute_match) = caps.get(2) else { continue };
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = minute_match.as_str().parse().ok()?;
        if minute > 59 || hour > 23 {
            continue;
        }
        if hour == 0 || hour >= 13 {
            return Some(TimeParse::Exact(format_display(hour, minute)));
        }
        return Some(match daypart_hint(&lower) {
            Some(part) => TimeParse::Exact(format_display(with_daypart(hour, part), minute)),
            None => TimeParse::Ambiguous(format!("{hour}:{minute:02}")),
        });
    }

    // Bare numbers are only read as times when the message is essentially
    // just the number; anywhere else a lone digit is more likely a count.
    if let Some(caps) = bare_reply_re().captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps.get(2).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
        if minute > 59 {
            return None;
        }
        if hour == 0 || (13..=23).contains(&hour) {
            return Some(TimeParse::Exact(format_display(hour, minute)));
        }
        if (1..=12).contains(&hour) {
            return Some(match daypart_hint(text) {
                Some(part) => TimeParse::Exact(format_display(with_daypart(hour, part), minute)),
                None => TimeParse::Ambiguous(if minute == 0 {
                    hour.to_string()
                } else {
                    format!("{hour}:{minute:02}")
                }),
            });
        }
        return None;
    }

    // A 1-12 hour embedded in a longer message resolves through a daypart
    // word ("dinner at 8" / "8 tonight"); without one it is not a time.
    if let Some(part) = daypart_hint(&lower) {
        for caps in time_re().captures_iter(&lower) {
            if caps.get(2).is_some() || caps.get(3).is_some() {
                continue;
            }
            let hour: u32 = caps[1].parse().ok()?;
            if (1..=12).contains(&hour) {
                return Some(TimeParse::Exact(format_display(with_daypart(hour, part), 0)));
            }
        }
    }

    None
}

/// Combine a pending raw fragment (captured during clarification) with the
/// guest's am/pm answer.
pub fn resolve_pending(raw: &str, part: Daypart) -> Option<String> {
    let caps = bare_reply_re().captures(raw)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps.get(2).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
    if !(1..=12).contains(&hour) || minute > 59 {
        return None;
    }
    Some(format_display(with_daypart(hour, part), minute))
}

/// Whether the text contains an unmistakable clock pattern (meridiem,
/// separator minutes, o'clock, noon/midnight). Used by the guest-count and
/// name parsers to avoid stealing digits that belong to a time.
pub fn contains_time_pattern(text: &str) -> bool {
    let lower = text.to_lowercase();
    if (lower.contains("noon") && !lower.contains("afternoon")) || lower.contains("midnight") {
        return true;
    }
    if oclock_re().is_match(&lower) {
        return true;
    }
    time_re()
        .captures_iter(&lower)
        .any(|caps| caps.get(2).is_some() || caps.get(3).is_some())
}

/// Byte ranges of clock patterns, so sibling parsers can skip digits that sit
/// inside them.
pub fn time_pattern_spans(text: &str) -> Vec<(usize, usize)> {
    let lower = text.to_lowercase();
    let mut spans = Vec::new();
    for caps in time_re().captures_iter(&lower) {
        if caps.get(2).is_some() || caps.get(3).is_some() {
            let whole = caps.get(0).unwrap();
            spans.push((whole.start(), whole.end()));
        }
    }
    for m in oclock_re().find_iter(&lower) {
        spans.push((m.start(), m.end()));
    }
    spans
}

fn to_hour24(hour12: u32, pm: bool) -> u32 {
    match (hour12 % 12, pm) {
        (h, true) => h + 12,
        (h, false) => h,
    }
}

fn with_daypart(hour12: u32, part: Daypart) -> u32 {
    to_hour24(hour12, matches!(part, Daypart::Pm))
}

fn format_display(hour24: u32, minute: u32) -> String {
    let (hour12, suffix) = match hour24 {
        0 => (12, "am"),
        1..=11 => (hour24, "am"),
        12 => (12, "pm"),
        _ => (hour24 - 12, "pm"),
    };
    format!("{hour12}:{minute:02} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_meridiem_forms() {
        assert_eq!(parse_time("see you at 8pm"), Some(TimeParse::Exact("8:00 pm".to_owned())));
        assert_eq!(parse_time("8:30 AM works"), Some(TimeParse::Exact("8:30 am".to_owned())));
        assert_eq!(parse_time("12 pm"), Some(TimeParse::Exact("12:00 pm".to_owned())));
        assert_eq!(parse_time("12am"), Some(TimeParse::Exact("12:00 am".to_owned())));
    }

    #[test]
    fn twenty_four_hour_forms() {
        assert_eq!(parse_time("19:30"), Some(TimeParse::Exact("7:30 pm".to_owned())));
        assert_eq!(parse_time("19h30 please"), Some(TimeParse::Exact("7:30 pm".to_owned())));
        assert_eq!(parse_time("19.30"), Some(TimeParse::Exact("7:30 pm".to_owned())));
        assert_eq!(parse_time("at 19"), Some(TimeParse::Exact("7:00 pm".to_owned())));
    }

    #[test]
    fn noon_and_midnight() {
        assert_eq!(parse_time("around noon"), Some(TimeParse::Exact("12:00 pm".to_owned())));
        assert_eq!(parse_time("midnight snack"), Some(TimeParse::Exact("12:00 am".to_owned())));
    }

    #[test]
    fn daypart_words_resolve_bare_hours() {
        assert_eq!(parse_time("8 tonight"), Some(TimeParse::Exact("8:00 pm".to_owned())));
        assert_eq!(parse_time("dinner at 7"), Some(TimeParse::Exact("7:00 pm".to_owned())));
        assert_eq!(parse_time("9 in the morning"), Some(TimeParse::Exact("9:00 am".to_owned())));
    }

    #[test]
    fn bare_hours_one_to_twelve_are_ambiguous() {
        assert_eq!(parse_time("7"), Some(TimeParse::Ambiguous("7".to_owned())));
        assert_eq!(parse_time("at 7"), Some(TimeParse::Ambiguous("7".to_owned())));
        assert_eq!(parse_time("8:30"), Some(TimeParse::Ambiguous("8:30".to_owned())));
        assert_eq!(parse_time("11 o'clock"), Some(TimeParse::Ambiguous("11".to_owned())));
    }

    #[test]
    fn embedded_bare_digits_are_not_times() {
        assert_eq!(parse_time("a table for 4 please"), None);
        assert_eq!(parse_time("we are 6"), None);
    }

    #[test]
    fn pending_fragments_combine_with_the_answer() {
        assert_eq!(resolve_pending("7", Daypart::Pm), Some("7:00 pm".to_owned()));
        assert_eq!(resolve_pending("8:30", Daypart::Am), Some("8:30 am".to_owned()));
        assert_eq!(resolve_pending("12", Daypart::Pm), Some("12:00 pm".to_owned()));
        assert_eq!(resolve_pending("25", Daypart::Pm), None);
    }

    #[test]
    fn time_pattern_detection_flags_clock_shapes_only() {
        assert!(contains_time_pattern("8pm for 2"));
        assert!(contains_time_pattern("19:30"));
        assert!(contains_time_pattern("8 o'clock"));
        assert!(!contains_time_pattern("party of 8"));
    }
}
