//! Optional booking pre-extraction. The model's output is a hint, nothing
//! more: it has to clear the local validation gate before the dialog engine
//! sees it, and any failure or timeout simply means "no hints".

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use concierge_core::collab::SlotExtractor;
use concierge_core::domain::{BookingEntities, NormalizedBooking};
use concierge_core::parsers::{parse_time, TimeParse};

use crate::llm::LlmClient;

const MIN_GUESTS: u32 = 1;
const MAX_GUESTS: u32 = 50;

#[derive(Clone, Copy, Debug)]
pub struct ExtractorConfig {
    pub timeout: Duration,
    pub min_confidence: f64,
}

pub struct BookingExtractor {
    llm: Arc<dyn LlmClient>,
    config: ExtractorConfig,
}

impl BookingExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, config: ExtractorConfig) -> Self {
        Self { llm, config }
    }
}

#[async_trait::async_trait]
impl SlotExtractor for BookingExtractor {
    async fn extract(&self, text: &str, today: NaiveDate) -> Option<NormalizedBooking> {
        let prompt = build_prompt(text, today);

        let raw = match tokio::time::timeout(self.config.timeout, self.llm.complete(&prompt)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(error)) => {
                debug!(event_name = "extract.llm_failed", error = %error, "extraction skipped");
                return None;
            }
            Err(_) => {
                warn!(event_name = "extract.timeout", "extraction call timed out");
                return None;
            }
        };

        let entities = parse_response(&raw)?;
        let normalized = validate(entities, self.config.min_confidence, today);
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }
}

fn build_prompt(text: &str, today: NaiveDate) -> String {
    format!(
        "Extract booking details from this hotel guest message. Today is {today}.\n\
         Respond with only a JSON object with keys: guests (integer or null), \
         time (string like \"8pm\" or \"19:30\" or null), date (ISO YYYY-MM-DD or null), \
         name (string or null), confidence (0.0-1.0). Do not guess missing fields.\n\n\
         Message: {text}"
    )
}

/// Tolerates the model wrapping its JSON in a markdown code fence.
fn parse_response(raw: &str) -> Option<BookingEntities> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```"))
        .unwrap_or(trimmed);

    match serde_json::from_str::<BookingEntities>(body.trim()) {
        Ok(entities) => Some(entities),
        Err(error) => {
            debug!(event_name = "extract.bad_json", error = %error, "discarding extraction output");
            None
        }
    }
}

/// The gate between model output and the dialog engine. Fields that fail
/// validation are dropped individually; a sub-threshold confidence drops the
/// whole response.
fn validate(entities: BookingEntities, min_confidence: f64, today: NaiveDate) -> NormalizedBooking {
    if entities.confidence < min_confidence {
        return NormalizedBooking::default();
    }

    let mut out = NormalizedBooking::default();

    if let Some(guests) = entities.guests {
        if (MIN_GUESTS..=MAX_GUESTS).contains(&guests) {
            out.guests = Some(guests);
        }
    }

    if let Some(date) = entities.date.as_deref() {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            if parsed >= today {
                out.date_iso = Some(date.to_owned());
            }
        }
    }

    // Times go through the same parser typed input does; a bare 1-12 hour is
    // flagged for clarification rather than accepted with a guessed meridiem.
    if let Some(time) = entities.time.as_deref() {
        match parse_time(time) {
            Some(TimeParse::Exact(display)) => out.time_display = Some(display),
            Some(TimeParse::Ambiguous(raw)) => {
                let hour: String = raw.chars().take_while(char::is_ascii_digit).collect();
                out.needs_time_clarification = hour.parse().ok();
            }
            None => {}
        }
    }

    if let Some(name) = entities.name.as_deref() {
        let words: Vec<&str> = name.split_whitespace().collect();
        let plausible = !words.is_empty()
            && words.len() <= 3
            && words.iter().all(|w| w.chars().all(|c| c.is_alphabetic() || c == '\''));
        if plausible {
            out.name = Some(name.to_owned());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use crate::llm::LlmError;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap()
    }

    fn entities(json: &str) -> BookingEntities {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn sub_threshold_confidence_discards_everything() {
        let e = entities(r#"{"guests": 4, "time": "8pm", "date": "2026-08-28", "confidence": 0.4}"#);
        assert!(validate(e, 0.70, today()).is_empty());
    }

    #[test]
    fn valid_fields_pass_and_bad_fields_drop_individually() {
        let e = entities(
            r#"{"guests": 400, "time": "8pm", "date": "28/08/2026", "name": "Koen", "confidence": 0.9}"#,
        );
        let out = validate(e, 0.70, today());
        assert_eq!(out.guests, None);
        assert_eq!(out.time_display.as_deref(), Some("8:00 pm"));
        assert_eq!(out.date_iso, None);
        assert_eq!(out.name.as_deref(), Some("Koen"));
    }

    #[test]
    fn past_dates_are_rejected() {
        let e = entities(r#"{"date": "2026-08-20", "confidence": 0.95}"#);
        assert!(validate(e, 0.70, today()).is_empty());
    }

    #[test]
    fn ambiguous_extracted_hour_is_flagged_not_accepted() {
        let e = entities(r#"{"time": "7", "confidence": 0.9}"#);
        let out = validate(e, 0.70, today());
        assert_eq!(out.time_display, None);
        assert_eq!(out.needs_time_clarification, Some(7));
    }

    #[test]
    fn code_fences_are_tolerated() {
        let parsed =
            parse_response("```json\n{\"guests\": 2, \"confidence\": 0.8}\n```").expect("parsed");
        assert_eq!(parsed.guests, Some(2));
        assert!(parse_response("I could not find any details.").is_none());
    }

    struct CannedLlm(&'static str);

    #[async_trait::async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_owned())
        }
    }

    #[tokio::test]
    async fn end_to_end_extraction_returns_validated_hints() {
        let extractor = BookingExtractor::new(
            Arc::new(CannedLlm(
                r#"{"guests": 4, "time": "19:30", "date": "2026-08-28", "name": "Nguyen", "confidence": 0.88}"#,
            )),
            ExtractorConfig { timeout: Duration::from_secs(4), min_confidence: 0.70 },
        );

        let out = extractor.extract("table for 4 friday 19:30 under Nguyen", today()).await.unwrap();
        assert_eq!(out.guests, Some(4));
        assert_eq!(out.time_display.as_deref(), Some("7:30 pm"));
        assert_eq!(out.date_iso.as_deref(), Some("2026-08-28"));
        assert_eq!(out.name.as_deref(), Some("Nguyen"));
    }

    #[tokio::test]
    async fn llm_failure_contributes_nothing() {
        let extractor = BookingExtractor::new(
            Arc::new(crate::llm::NoopLlmClient),
            ExtractorConfig { timeout: Duration::from_secs(1), min_confidence: 0.70 },
        );
        assert!(extractor.extract("table for 4", today()).await.is_none());
    }
}
