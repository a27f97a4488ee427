use std::sync::OnceLock;

use regex::Regex;

use super::time::time_pattern_spans;

const MIN_GUESTS: u32 = 1;
const MAX_GUESTS: u32 = 50;

fn bare_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d{1,2})\s*$").unwrap())
}

fn qualified_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "party of 4", "4 people", "4 pax", "table for 4", "for 4"
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:party\s+of\s+(\d{1,2})|(\d{1,2})\s*(?:people|persons?|pax|guests?|ppl)\b|(?:table\s+)?for\s+(\d{1,2})\b)",
        )
        .unwrap()
    })
}

fn category_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "4 adults and 2 kids" style category counts, summed.
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})\s*(?:adults?|grown[- ]?ups?|kids?|children|childs?|child|babies|baby|infants?|seniors?)\b")
            .unwrap()
    })
}

fn in_range(n: u32) -> Option<u32> {
    (MIN_GUESTS..=MAX_GUESTS).contains(&n).then_some(n)
}

fn overlaps_time(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    spans.iter().any(|(s, e)| start < *e && end > *s)
}

/// Extract a guest count.
///
/// A bare number is only accepted when it is the entire message; anywhere
/// else a qualifying phrase is required, and digits that belong to a clock
/// pattern are never counted. Category phrases ("2 adults and 1 kid") sum.
pub fn parse_guests(text: &str) -> Option<u32> {
    if let Some(caps) = bare_number_re().captures(text) {
        return in_range(caps[1].parse().ok()?);
    }

    let spans = time_pattern_spans(text);

    let category_total: u32 = category_re()
        .captures_iter(text)
        .filter(|caps| {
            let m = caps.get(1).unwrap();
            !overlaps_time(&spans, m.start(), m.end())
        })
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .sum();
    if category_total > 0 {
        return in_range(category_total);
    }

    for caps in qualified_re().captures_iter(text) {
        let m = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
        if overlaps_time(&spans, m.start(), m.end()) {
            continue;
        }
        return in_range(m.as_str().parse().ok()?);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_message_bare_number_is_accepted() {
        assert_eq!(parse_guests("4"), Some(4));
        assert_eq!(parse_guests(" 12 "), Some(12));
    }

    #[test]
    fn bare_number_outside_range_is_rejected() {
        assert_eq!(parse_guests("0"), None);
        assert_eq!(parse_guests("99"), None);
    }

    #[test]
    fn qualified_phrases_are_accepted_in_longer_text() {
        assert_eq!(parse_guests("a party of 6 tonight"), Some(6));
        assert_eq!(parse_guests("we are 4 people"), Some(4));
        assert_eq!(parse_guests("3 pax"), Some(3));
        assert_eq!(parse_guests("table for 2 please"), Some(2));
    }

    #[test]
    fn category_counts_are_summed() {
        assert_eq!(parse_guests("4 adults and 2 kids"), Some(6));
        assert_eq!(parse_guests("2 adults, 1 child and 1 baby"), Some(4));
    }

    #[test]
    fn unqualified_numbers_in_longer_text_are_ignored() {
        assert_eq!(parse_guests("maybe around 5 I think"), None);
        assert_eq!(parse_guests("room 12 has no towels"), None);
    }

    #[test]
    fn digits_inside_time_patterns_are_never_counted() {
        assert_eq!(parse_guests("dinner at 8pm"), None);
        assert_eq!(parse_guests("book for 2 people at 7:30"), Some(2));
    }
}
