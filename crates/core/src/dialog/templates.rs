use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{RejectBehavior, SlotField};

/// One orderable service and the fields it needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceTemplate {
    pub key: &'static str,
    pub label: &'static str,
    pub required: Vec<SlotField>,
    pub on_reject: RejectBehavior,
}

/// Recognizes which service a message asks for: an exact phrase table keyed
/// by property first, then a generic keyword fallback.
pub struct ServiceCatalog {
    templates: Vec<ServiceTemplate>,
    property_phrases: HashMap<String, Vec<(String, String)>>,
}

fn table_fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(book|reserve|reservation|table)\b").unwrap()
    })
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self {
            templates: vec![
                ServiceTemplate {
                    key: "table_booking",
                    label: "table booking",
                    required: vec![
                        SlotField::Guests,
                        SlotField::Time,
                        SlotField::Date,
                        SlotField::Name,
                    ],
                    on_reject: RejectBehavior::Restart,
                },
                ServiceTemplate {
                    key: "spa_booking",
                    label: "spa appointment",
                    required: vec![SlotField::Time, SlotField::Date, SlotField::Name],
                    on_reject: RejectBehavior::Restart,
                },
                ServiceTemplate {
                    key: "taxi",
                    label: "taxi pickup",
                    required: vec![SlotField::Time, SlotField::Date],
                    on_reject: RejectBehavior::Edit,
                },
                ServiceTemplate {
                    key: "late_checkout",
                    label: "late checkout",
                    required: vec![SlotField::Time],
                    on_reject: RejectBehavior::Edit,
                },
            ],
            property_phrases: HashMap::new(),
        }
    }
}

impl ServiceCatalog {
    pub fn get(&self, key: &str) -> Option<&ServiceTemplate> {
        self.templates.iter().find(|t| t.key == key)
    }

    /// Register a property-specific trigger phrase, e.g. "sunset dinner" →
    /// `table_booking`.
    pub fn add_property_phrase(
        &mut self,
        property_id: &str,
        phrase: impl Into<String>,
        service_key: impl Into<String>,
    ) {
        self.property_phrases
            .entry(property_id.to_owned())
            .or_default()
            .push((phrase.into().to_lowercase(), service_key.into()));
    }

    pub fn recognize(&self, property_id: &str, text: &str) -> Option<&ServiceTemplate> {
        let lower = text.to_lowercase();

        if let Some(phrases) = self.property_phrases.get(property_id) {
            for (phrase, key) in phrases {
                if lower.contains(phrase.as_str()) {
                    return self.get(key);
                }
            }
        }

        if lower.contains("spa") || lower.contains("massage") {
            return self.get("spa_booking");
        }
        if lower.contains("taxi") || lower.contains("transfer") || lower.contains("airport pickup")
        {
            return self.get("taxi");
        }
        if lower.contains("late checkout") || lower.contains("late check-out") {
            return self.get("late_checkout");
        }
        if table_fallback_re().is_match(&lower) {
            return self.get("table_booking");
        }

        None
    }
}
