use std::sync::OnceLock;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use regex::Regex;

use super::fuzzy::{fuzzy_match, tokens};

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

const WEEKDAY_ABBREVS: &[(&str, Weekday)] = &[
    ("mon", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("tues", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("thur", Weekday::Thu),
    ("thurs", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("sat", Weekday::Sat),
    ("sun", Weekday::Sun),
];

const MONTHS: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const MONTH_ABBREVS: &[&str] =
    &["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec"];

// Common mangled spellings seen in guest messages, checked before the
// general edit-distance pass.
const TOMORROW_WORDS: &[&str] = &[
    "tomorrow", "tommorow", "tomorow", "tommorrow", "tomoro", "tmr", "tmrw", "tmrrw", "2moro",
    "2morrow", "morrow",
];

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})(?:[/-](\d{2,4}))?\b").unwrap())
}

fn day_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]{3,})\b").unwrap()
    })
}

/// A resolved calendar date with the display string the confirm summary uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedDate {
    pub display: String,
    pub date: NaiveDate,
}

impl ParsedDate {
    pub fn iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Extract a date from free text, relative to `today`.
///
/// Recognizes today/tonight, a wide tomorrow synonym set, weekday names
/// (exact, abbreviated, and within 2 edits), "next <weekday>" (forced at
/// least 7 days out), numeric `D/M[/Y]`, and "D <month>" with fuzzy months.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<ParsedDate> {
    let words = tokens(text);

    if words.iter().any(|w| w == "today" || w == "tonight") {
        return Some(ParsedDate { display: "today".to_owned(), date: today });
    }

    if words.iter().any(|w| is_tomorrow_word(w)) {
        let date = today.checked_add_days(Days::new(1))?;
        return Some(ParsedDate { display: "tomorrow".to_owned(), date });
    }

    if let Some(caps) = numeric_re().captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let date = match caps.get(3) {
            Some(year) => {
                let mut year: i32 = year.as_str().parse().ok()?;
                if year < 100 {
                    year += 2000;
                }
                NaiveDate::from_ymd_opt(year, month, day)?
            }
            None => upcoming_ymd(today, month, day)?,
        };
        return Some(ParsedDate { display: date.format("%d/%m/%Y").to_string(), date });
    }

    if let Some(parsed) = parse_day_month(text, today) {
        return Some(parsed);
    }

    if let Some((weekday, forced_next)) = find_weekday(&words) {
        let mut ahead = days_until(today.weekday(), weekday);
        if forced_next {
            ahead += 7;
        }
        let date = today.checked_add_days(Days::new(ahead))?;
        return Some(ParsedDate { display: date.format("%A %d/%m").to_string(), date });
    }

    None
}

/// Canonical `YYYY-MM-DD` companion to `parse_date`.
pub fn to_iso(text: &str, today: NaiveDate) -> Option<String> {
    parse_date(text, today).map(|parsed| parsed.iso())
}

/// Whether the text carries any date vocabulary. Used by the name parser to
/// keep "for friday" out of the name slot.
pub fn contains_date_phrase(text: &str) -> bool {
    let words = tokens(text);
    words.iter().any(|w| w == "today" || w == "tonight" || is_tomorrow_word(w))
        || find_weekday(&words).is_some()
        || numeric_re().is_match(text)
        || day_month_re()
            .captures_iter(text)
            .any(|caps| month_index(&caps[2].to_lowercase()).is_some())
}

fn is_tomorrow_word(word: &str) -> bool {
    TOMORROW_WORDS.contains(&word) || fuzzy_match(word, &["tomorrow"], 2).is_some()
}

fn find_weekday(words: &[String]) -> Option<(Weekday, bool)> {
    for (index, word) in words.iter().enumerate() {
        let exact = WEEKDAYS
            .iter()
            .chain(WEEKDAY_ABBREVS.iter())
            .find(|(name, _)| name == word)
            .map(|(_, weekday)| *weekday);

        let matched = exact.or_else(|| {
            let names: Vec<&str> = WEEKDAYS.iter().map(|(name, _)| *name).collect();
            fuzzy_match(word, &names, 2)
                .and_then(|name| WEEKDAYS.iter().find(|(n, _)| *n == name))
                .map(|(_, weekday)| *weekday)
        });

        if let Some(weekday) = matched {
            let forced_next = index > 0 && words[index - 1] == "next";
            return Some((weekday, forced_next));
        }
    }
    None
}

fn parse_day_month(text: &str, today: NaiveDate) -> Option<ParsedDate> {
    for caps in day_month_re().captures_iter(text) {
        let day: u32 = caps[1].parse().ok()?;
        let Some(month) = month_index(&caps[2].to_lowercase()) else { continue };
        let date = upcoming_ymd(today, month, day)?;
        return Some(ParsedDate { display: date.format("%d %B").to_string(), date });
    }
    None
}

fn month_index(word: &str) -> Option<u32> {
    if MONTH_ABBREVS.contains(&word) {
        // Abbreviations map by prefix so "sept" and "sep" land on the same month.
        let full = MONTHS.iter().position(|month| month.starts_with(&word[..3]))?;
        return Some(full as u32 + 1);
    }
    fuzzy_match(word, MONTHS, 2)
        .and_then(|month| MONTHS.iter().position(|m| *m == month))
        .map(|index| index as u32 + 1)
}

fn upcoming_ymd(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(date) if date >= today => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

fn days_until(from: Weekday, to: Weekday) -> u64 {
    let from = from.num_days_from_monday() as i64;
    let to = to.num_days_from_monday() as i64;
    ((to - from).rem_euclid(7)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wednesday() -> NaiveDate {
        // 2026-08-26 is a Wednesday.
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap()
    }

    #[test]
    fn today_and_tonight_map_to_today() {
        let parsed = parse_date("can we come tonight", wednesday()).unwrap();
        assert_eq!(parsed.date, wednesday());
        assert_eq!(parsed.display, "today");
    }

    #[test]
    fn tomorrow_synonyms_and_misspellings() {
        for text in ["tomorrow", "tmr", "tommorow", "2morrow", "tomorow pls"] {
            let parsed = parse_date(text, wednesday()).unwrap_or_else(|| panic!("{text}"));
            assert_eq!(parsed.date, wednesday().succ_opt().unwrap(), "{text}");
        }
    }

    #[test]
    fn weekday_names_resolve_to_the_upcoming_occurrence() {
        let parsed = parse_date("friday would be great", wednesday()).unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2026, 8, 28).unwrap());
        assert_eq!(parsed.iso(), "2026-08-28");
    }

    #[test]
    fn same_weekday_means_today_not_next_week() {
        let parsed = parse_date("wednesday", wednesday()).unwrap();
        assert_eq!(parsed.date, wednesday());
    }

    #[test]
    fn misspelled_weekday_within_two_edits_matches() {
        let parsed = parse_date("how about fridey", wednesday()).unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2026, 8, 28).unwrap());
    }

    #[test]
    fn next_weekday_is_at_least_seven_days_out() {
        let parsed = parse_date("next friday", wednesday()).unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2026, 9, 4).unwrap());

        let parsed = parse_date("next wednesday", wednesday()).unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2026, 9, 2).unwrap());
    }

    #[test]
    fn numeric_dates_parse_day_first() {
        let parsed = parse_date("on 5/9", wednesday()).unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2026, 9, 5).unwrap());

        let parsed = parse_date("05/09/2027", wednesday()).unwrap();
        assert_eq!(parsed.iso(), "2027-09-05");
    }

    #[test]
    fn passed_numeric_dates_roll_to_next_year() {
        let parsed = parse_date("on 3/1", wednesday()).unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2027, 1, 3).unwrap());
    }

    #[test]
    fn day_month_with_fuzzy_month() {
        let parsed = parse_date("5 september", wednesday()).unwrap();
        assert_eq!(parsed.iso(), "2026-09-05");

        let parsed = parse_date("the 12th of octobre", wednesday()).unwrap();
        assert_eq!(parsed.iso(), "2026-10-12");
    }

    #[test]
    fn unrelated_text_yields_nothing() {
        assert_eq!(parse_date("we love your rooftop bar", wednesday()), None);
        assert_eq!(to_iso("hello there", wednesday()), None);
    }

    #[test]
    fn date_phrase_detection_covers_all_shapes() {
        assert!(contains_date_phrase("see you friday"));
        assert!(contains_date_phrase("tomorow at 8"));
        assert!(contains_date_phrase("5/9"));
        assert!(contains_date_phrase("5 september"));
        assert!(!contains_date_phrase("under Koen"));
    }
}
