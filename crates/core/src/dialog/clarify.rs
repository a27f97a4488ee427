use crate::domain::Language;
use crate::parsers::fuzzy::{fuzzy_match, tokens};
use crate::parsers::Daypart;

// Morning/evening synonym tables per language, including the abbreviations
// and misspellings guests actually type.
const AM_EN: &[&str] = &["morning", "mornin", "morningg", "am", "a.m", "early"];
const PM_EN: &[&str] =
    &["evening", "evenin", "eve", "pm", "p.m", "night", "tonight", "afternoon", "dinner", "late"];

const AM_VI: &[&str] = &["sang", "sáng", "buoi sang", "buổi sáng"];
const PM_VI: &[&str] = &["chieu", "chiều", "toi", "tối", "buoi toi", "buổi tối", "dem", "đêm"];

const AM_NL: &[&str] = &["ochtend", "sochtends", "ochtends", "vroeg"];
const PM_NL: &[&str] = &["avond", "savonds", "avonds", "middag", "smiddags", "laat"];

/// Interpret the guest's answer to "morning or evening?". A bare am/pm token
/// works in any language; otherwise the guest's own language table is tried
/// first with English as fallback.
pub fn parse_daypart_reply(text: &str, lang: Language) -> Option<Daypart> {
    let lower = text.to_lowercase();
    let words = tokens(&lower);

    for word in &words {
        if word == "am" {
            return Some(Daypart::Am);
        }
        if word == "pm" {
            return Some(Daypart::Pm);
        }
    }

    let (am_table, pm_table): (&[&str], &[&str]) = match lang {
        Language::En => (AM_EN, PM_EN),
        Language::Vi => (AM_VI, PM_VI),
        Language::Nl => (AM_NL, PM_NL),
    };

    if let Some(part) = scan(&lower, &words, am_table, pm_table) {
        return Some(part);
    }
    if lang != Language::En {
        return scan(&lower, &words, AM_EN, PM_EN);
    }
    None
}

fn scan(lower: &str, words: &[String], am_table: &[&str], pm_table: &[&str]) -> Option<Daypart> {
    let hit = |table: &[&str]| {
        table.iter().any(|entry| {
            if entry.contains(' ') {
                lower.contains(entry)
            } else {
                words.iter().any(|w| w == entry || fuzzy_match(w, &[*entry], 2).is_some())
            }
        })
    };

    // Evening wins when both appear ("no not morning, evening").
    if hit(pm_table) {
        return Some(Daypart::Pm);
    }
    if hit(am_table) {
        return Some(Daypart::Am);
    }
    None
}

pub fn clarify_prompt(raw: &str, lang: Language) -> String {
    match lang {
        Language::En => format!("Just to be sure, is that {raw} in the morning or the evening?"),
        Language::Vi => format!("Cho chắc chắn, {raw} giờ là buổi sáng hay buổi tối ạ?"),
        Language::Nl => format!("Even voor de zekerheid, is dat {raw} uur 's ochtends of 's avonds?"),
    }
}
