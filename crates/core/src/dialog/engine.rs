use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{
    FlowStage, FlowState, Language, NormalizedBooking, RejectBehavior, Reply, SlotField,
};
use crate::parsers::{
    self, fuzzy::tokens, parse_date, parse_guests, parse_name, parse_time, resolve_pending,
    TimeParse,
};

use super::clarify::{clarify_prompt, parse_daypart_reply};
use super::templates::{ServiceCatalog, ServiceTemplate};

const AFFIRM_TOKENS: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "sure", "ok", "okay", "confirm", "confirmed", "correct",
    "right", "perfect", "ja", "oke", "co", "có", "vang", "vâng",
];

const NEGATE_TOKENS: &[&str] =
    &["no", "n", "nope", "nah", "wrong", "change", "incorrect", "nee", "khong", "không"];

const CANCEL_TOKENS: &[&str] = &["cancel", "nevermind", "forget it", "stop"];

/// Result of one dialog turn. `flow = None` means the flow ended (confirmed
/// or cancelled); `completed` carries the finalized booking when it did so by
/// confirmation.
#[derive(Clone, Debug, PartialEq)]
pub struct DialogOutcome {
    pub flow: Option<FlowState>,
    pub reply: Reply,
    pub completed: Option<CompletedBooking>,
}

/// A confirmed service request, ready for the finalization side effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedBooking {
    pub service_key: String,
    pub label: String,
    pub collected: BTreeMap<SlotField, String>,
}

impl CompletedBooking {
    /// Staff-visible one-liner posted on finalization.
    pub fn staff_summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(guests) = self.collected.get(&SlotField::Guests) {
            parts.push(format!("{guests} guests"));
        }
        if let Some(date) = self.collected.get(&SlotField::Date) {
            parts.push(date.clone());
        }
        if let Some(time) = self.collected.get(&SlotField::Time) {
            parts.push(format!("at {time}"));
        }
        if let Some(name) = self.collected.get(&SlotField::Name) {
            parts.push(format!("under {name}"));
        }
        format!("New {}: {}", self.label, parts.join(", "))
    }
}

/// The slot-filling conversation engine. Pure with respect to state: it takes
/// the current flow and a message and returns the next flow plus the reply;
/// persistence and side effects belong to the router.
pub struct DialogEngine {
    catalog: ServiceCatalog,
}

impl Default for DialogEngine {
    fn default() -> Self {
        Self::new(ServiceCatalog::default())
    }
}

impl DialogEngine {
    pub fn new(catalog: ServiceCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Try to start a flow from a fresh message. Returns `None` when no
    /// service is recognized. The first message is immediately mined for
    /// every required field, so a fully-specified request goes straight to
    /// confirmation.
    pub fn start(
        &self,
        property_id: &str,
        text: &str,
        lang: Language,
        today: NaiveDate,
        hints: Option<&NormalizedBooking>,
    ) -> Option<DialogOutcome> {
        let template = self.catalog.recognize(property_id, text)?;
        let mut flow = new_flow(template);

        if let Some(hints) = hints {
            apply_hints(&mut flow, hints);
        }
        fill_from_text(&mut flow, text, today);

        debug!(
            event_name = "dialog.flow_started",
            service_key = flow.service_key.as_str(),
            missing = flow.missing().len(),
            "service flow started"
        );

        Some(self.prompt_for_current_stage(flow, lang))
    }

    /// Start a flow directly from a welcome-menu shortcut, skipping
    /// recognition.
    pub fn start_from_shortcut(&self, service_key: &str, lang: Language) -> Option<DialogOutcome> {
        let template = self.catalog.get(service_key)?;
        let flow = new_flow(template);
        Some(self.prompt_for_current_stage(flow, lang))
    }

    /// Advance an active flow with the guest's next message.
    pub fn advance(
        &self,
        mut flow: FlowState,
        text: &str,
        lang: Language,
        today: NaiveDate,
    ) -> DialogOutcome {
        if is_cancel(text) {
            return DialogOutcome {
                flow: None,
                reply: Reply::text("No problem, I've cancelled that request. Anything else I can help with?"),
                completed: None,
            };
        }

        if flow.awaiting_time_clarification() {
            return self.advance_time_clarify(flow, text, lang, today);
        }

        match flow.stage.clone() {
            FlowStage::Slot(field) => {
                let ambiguous = fill_from_text(&mut flow, text, today);
                if let Some(raw) = ambiguous {
                    flow.pending_time_raw = Some(raw.clone());
                    flow.stage = FlowStage::Slot(SlotField::Time);
                    let prompt = clarify_prompt(&raw, lang);
                    return DialogOutcome { flow: Some(flow), reply: Reply::text(prompt), completed: None };
                }
                if flow.collected.contains_key(&field) {
                    flow.stage = flow.next_stage();
                    self.prompt_for_current_stage(flow, lang)
                } else {
                    let reply = Reply::text(retry_prompt(field));
                    DialogOutcome { flow: Some(flow), reply, completed: None }
                }
            }
            FlowStage::Confirm => self.advance_confirm(flow, text, lang),
            FlowStage::AskChange => self.advance_ask_change(flow, text, lang, today),
        }
    }

    fn advance_time_clarify(
        &self,
        mut flow: FlowState,
        text: &str,
        lang: Language,
        today: NaiveDate,
    ) -> DialogOutcome {
        let raw = flow.pending_time_raw.clone().unwrap_or_default();

        // A fully retyped time short-circuits the morning/evening question.
        let resolved = match parse_time(text) {
            Some(TimeParse::Exact(display)) => Some(display),
            _ => parse_daypart_reply(text, lang).and_then(|part| resolve_pending(&raw, part)),
        };

        match resolved {
            Some(display) => {
                flow.collected.insert(SlotField::Time, display);
                flow.pending_time_raw = None;
                // Opportunistically pick up anything else in the same message.
                fill_from_text(&mut flow, text, today);
                flow.stage = flow.next_stage();
                self.prompt_for_current_stage(flow, lang)
            }
            None => {
                let prompt = clarify_prompt(&raw, lang);
                DialogOutcome { flow: Some(flow), reply: Reply::text(prompt), completed: None }
            }
        }
    }

    fn advance_confirm(&self, mut flow: FlowState, text: &str, lang: Language) -> DialogOutcome {
        if is_affirmative(text) {
            let template_label =
                self.catalog.get(&flow.service_key).map(|t| t.label.to_owned()).unwrap_or_else(|| flow.service_key.clone());
            let completed = CompletedBooking {
                service_key: flow.service_key.clone(),
                label: template_label,
                collected: flow.collected.clone(),
            };
            return DialogOutcome {
                flow: None,
                reply: Reply::text(
                    "Wonderful, that's confirmed! Our team has been notified and will take care of it.",
                ),
                completed: Some(completed),
            };
        }

        if is_negative_token(text) {
            return match flow.on_reject {
                RejectBehavior::Restart => {
                    flow.collected.clear();
                    flow.pending_time_raw = None;
                    flow.stage = flow.next_stage();
                    let mut outcome = self.prompt_for_current_stage(flow, lang);
                    outcome.reply.text =
                        format!("Alright, let's start over. {}", outcome.reply.text);
                    outcome
                }
                RejectBehavior::Edit => {
                    flow.stage = FlowStage::AskChange;
                    DialogOutcome {
                        flow: Some(flow),
                        reply: Reply::text(
                            "What would you like to change? You can give me a new time, date, number of guests, or name.",
                        ),
                        completed: None,
                    }
                }
            };
        }

        // Anything else re-shows the summary unchanged.
        let summary = confirm_summary(&flow, self.catalog.get(&flow.service_key));
        DialogOutcome { flow: Some(flow), reply: summary, completed: None }
    }

    fn advance_ask_change(
        &self,
        mut flow: FlowState,
        text: &str,
        lang: Language,
        today: NaiveDate,
    ) -> DialogOutcome {
        let changed = update_from_text(&mut flow, text, today);

        match changed {
            UpdateResult::Ambiguous(raw) => {
                flow.pending_time_raw = Some(raw.clone());
                flow.stage = FlowStage::Slot(SlotField::Time);
                let prompt = clarify_prompt(&raw, lang);
                DialogOutcome { flow: Some(flow), reply: Reply::text(prompt), completed: None }
            }
            UpdateResult::Changed => {
                flow.stage = FlowStage::Confirm;
                let summary = confirm_summary(&flow, self.catalog.get(&flow.service_key));
                DialogOutcome { flow: Some(flow), reply: summary, completed: None }
            }
            UpdateResult::Nothing => DialogOutcome {
                flow: Some(flow),
                reply: Reply::text(
                    "I couldn't spot a change in that. Try something like \"8pm instead\" or \"make it 4 people\".",
                ),
                completed: None,
            },
        }
    }

    fn prompt_for_current_stage(&self, mut flow: FlowState, lang: Language) -> DialogOutcome {
        if flow.awaiting_time_clarification() {
            let raw = flow.pending_time_raw.clone().unwrap_or_default();
            let prompt = clarify_prompt(&raw, lang);
            return DialogOutcome { flow: Some(flow), reply: Reply::text(prompt), completed: None };
        }

        flow.stage = flow.next_stage();
        let reply = match flow.stage {
            FlowStage::Slot(field) => Reply::text(ask_prompt(field)),
            FlowStage::Confirm | FlowStage::AskChange => {
                confirm_summary(&flow, self.catalog.get(&flow.service_key))
            }
        };
        DialogOutcome { flow: Some(flow), reply, completed: None }
    }
}

fn new_flow(template: &ServiceTemplate) -> FlowState {
    FlowState {
        service_key: template.key.to_owned(),
        required: template.required.clone(),
        collected: BTreeMap::new(),
        stage: FlowStage::Slot(*template.required.first().unwrap_or(&SlotField::Name)),
        pending_time_raw: None,
        on_reject: template.on_reject,
    }
}

/// Validated extraction hints pre-fill slots; an ambiguous extracted hour
/// goes through the same clarification path a typed one would.
fn apply_hints(flow: &mut FlowState, hints: &NormalizedBooking) {
    let mut set = |field: SlotField, value: Option<&String>| {
        if let Some(value) = value {
            if flow.required.contains(&field) {
                flow.collected.insert(field, value.clone());
            }
        }
    };
    set(SlotField::Guests, hints.guests.map(|g| g.to_string()).as_ref());
    set(SlotField::Time, hints.time_display.as_ref());
    set(SlotField::Date, hints.date_iso.as_ref());
    set(SlotField::Name, hints.name.as_ref());

    if let Some(hour) = hints.needs_time_clarification {
        if flow.required.contains(&SlotField::Time)
            && !flow.collected.contains_key(&SlotField::Time)
        {
            flow.pending_time_raw = Some(hour.to_string());
        }
    }
}

/// Parse every still-missing field out of a message. Returns the raw
/// fragment when a time was found but ambiguous.
fn fill_from_text(flow: &mut FlowState, text: &str, today: NaiveDate) -> Option<String> {
    let mut ambiguous_time = None;

    // A message that is nothing but a number answers the field being asked,
    // not every number-shaped slot at once.
    let bare_number = text.trim().parse::<u32>().is_ok();

    for field in flow.missing() {
        let asked = flow.stage == FlowStage::Slot(field);
        if bare_number && !asked && matches!(field, SlotField::Guests | SlotField::Time) {
            continue;
        }
        match field {
            SlotField::Guests => {
                if let Some(guests) = parse_guests(text) {
                    flow.collected.insert(field, guests.to_string());
                }
            }
            SlotField::Time => match parse_time(text) {
                Some(TimeParse::Exact(display)) => {
                    flow.collected.insert(field, display);
                }
                Some(TimeParse::Ambiguous(raw)) => ambiguous_time = Some(raw),
                None => {}
            },
            SlotField::Date => {
                if let Some(parsed) = parse_date(text, today) {
                    flow.collected.insert(field, parsed.display);
                }
            }
            SlotField::Name => {
                // During mixed-slot mining only explicit cues count; the
                // bare-message fallback applies when the name is what we
                // asked for.
                let explicit = parsers::parse_name(text).filter(|_| {
                    text.to_lowercase().contains("under")
                        || text.to_lowercase().contains("name")
                        || matches!(flow.stage, FlowStage::Slot(SlotField::Name))
                });
                if let Some(name) = explicit.or_else(|| bare_name_if_asked(flow, text)) {
                    flow.collected.insert(field, name);
                }
            }
        }
    }

    ambiguous_time
}

fn bare_name_if_asked(flow: &FlowState, text: &str) -> Option<String> {
    matches!(flow.stage, FlowStage::Slot(SlotField::Name)).then(|| parse_name(text)).flatten()
}

enum UpdateResult {
    Changed,
    Ambiguous(String),
    Nothing,
}

/// Free-text edits during AskChange: any parseable field overwrites its
/// collected value.
fn update_from_text(flow: &mut FlowState, text: &str, today: NaiveDate) -> UpdateResult {
    let mut changed = false;

    for field in flow.required.clone() {
        match field {
            SlotField::Guests => {
                if let Some(guests) = parse_guests(text) {
                    flow.collected.insert(field, guests.to_string());
                    changed = true;
                }
            }
            SlotField::Time => match parse_time(text) {
                Some(TimeParse::Exact(display)) => {
                    flow.collected.insert(field, display);
                    changed = true;
                }
                Some(TimeParse::Ambiguous(raw)) => return UpdateResult::Ambiguous(raw),
                None => {}
            },
            SlotField::Date => {
                if let Some(parsed) = parse_date(text, today) {
                    flow.collected.insert(field, parsed.display);
                    changed = true;
                }
            }
            SlotField::Name => {
                if let Some(name) = parse_name(text) {
                    // The bare fallback is too eager here; require a cue.
                    let lower = text.to_lowercase();
                    if lower.contains("under") || lower.contains("name") {
                        flow.collected.insert(field, name);
                        changed = true;
                    }
                }
            }
        }
    }

    if changed {
        UpdateResult::Changed
    } else {
        UpdateResult::Nothing
    }
}

fn confirm_summary(flow: &FlowState, template: Option<&ServiceTemplate>) -> Reply {
    let label = template.map(|t| t.label).unwrap_or("request");
    let mut parts = Vec::new();
    for field in &flow.required {
        if let Some(value) = flow.collected.get(field) {
            parts.push(match field {
                SlotField::Guests => format!("{value} guests"),
                SlotField::Time => format!("at {value}"),
                SlotField::Date => format!("on {value}"),
                SlotField::Name => format!("under the name {value}"),
            });
        }
    }
    Reply::with_quick_replies(
        format!("Here's your {label}: {}. Shall I confirm it?", parts.join(", ")),
        vec!["Yes".to_owned(), "No".to_owned()],
    )
}

fn ask_prompt(field: SlotField) -> &'static str {
    match field {
        SlotField::Guests => "How many people will be joining?",
        SlotField::Time => "What time would you like?",
        SlotField::Date => "Which day would you like to come?",
        SlotField::Name => "What name should I put it under?",
    }
}

fn retry_prompt(field: SlotField) -> &'static str {
    match field {
        SlotField::Guests => {
            "Sorry, I didn't catch the number of people. How many will be joining, for example \"4\" or \"party of 4\"?"
        }
        SlotField::Time => {
            "Sorry, I didn't catch the time. Could you give it like \"7:30 pm\" or \"19:30\"?"
        }
        SlotField::Date => {
            "Sorry, I didn't catch the day. You can say \"tomorrow\", a weekday, or a date like 5/9."
        }
        SlotField::Name => "Sorry, what name should I put the booking under?",
    }
}

fn is_affirmative(text: &str) -> bool {
    let words = tokens(text);
    !words.is_empty() && words.len() <= 4 && words.iter().any(|w| AFFIRM_TOKENS.contains(&w.as_str()))
}

fn is_negative_token(text: &str) -> bool {
    let words = tokens(text);
    !words.is_empty() && words.len() <= 4 && words.iter().any(|w| NEGATE_TOKENS.contains(&w.as_str()))
}

fn is_cancel(text: &str) -> bool {
    let lower = text.to_lowercase();
    CANCEL_TOKENS.iter().any(|t| lower.contains(t))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn engine() -> DialogEngine {
        DialogEngine::default()
    }

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 26).unwrap()
    }

    #[test]
    fn fully_specified_message_reaches_confirm_immediately() {
        let outcome = engine()
            .start(
                "p1",
                "book a table for friday 8pm for 2 people under koen",
                Language::En,
                wednesday(),
                None,
            )
            .expect("service recognized");

        let flow = outcome.flow.expect("flow active");
        assert_eq!(flow.stage, FlowStage::Confirm);
        assert_eq!(flow.collected[&SlotField::Guests], "2");
        assert_eq!(flow.collected[&SlotField::Time], "8:00 pm");
        assert_eq!(flow.collected[&SlotField::Date], "Friday 28/08");
        assert_eq!(flow.collected[&SlotField::Name], "Koen");
        assert!(outcome.reply.text.contains("Shall I confirm"));
    }

    #[test]
    fn missing_fields_are_asked_one_at_a_time() {
        let outcome = engine()
            .start("p1", "can I book a table", Language::En, wednesday(), None)
            .expect("recognized");
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.stage, FlowStage::Slot(SlotField::Guests));
        assert!(outcome.reply.text.contains("How many people"));

        let outcome = engine().advance(flow, "4 people", Language::En, wednesday());
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.stage, FlowStage::Slot(SlotField::Time));
        assert!(outcome.reply.text.contains("What time"));
    }

    #[test]
    fn ambiguous_hour_enters_clarification_and_resolves_without_reasking() {
        let outcome = engine()
            .start("p1", "table for 7 people tomorrow", Language::En, wednesday(), None)
            .expect("recognized");
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.collected[&SlotField::Guests], "7");
        assert_eq!(flow.collected[&SlotField::Date], "tomorrow");
        assert_eq!(flow.stage, FlowStage::Slot(SlotField::Time));

        // bare "7" is ambiguous
        let outcome = engine().advance(flow, "7", Language::En, wednesday());
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.pending_time_raw.as_deref(), Some("7"));
        assert!(outcome.reply.text.contains("morning or the evening"));

        // "pm" resolves it and moves on to the name, not back to the time
        let outcome = engine().advance(flow, "pm", Language::En, wednesday());
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.collected[&SlotField::Time], "7:00 pm");
        assert!(flow.pending_time_raw.is_none());
        assert_eq!(flow.stage, FlowStage::Slot(SlotField::Name));
    }

    #[test]
    fn retyped_full_time_short_circuits_clarification() {
        let outcome = engine()
            .start("p1", "table for 2 tomorrow", Language::En, wednesday(), None)
            .expect("recognized");
        let flow = outcome.flow.expect("flow");

        let outcome = engine().advance(flow, "8", Language::En, wednesday());
        let flow = outcome.flow.expect("flow");
        assert!(flow.awaiting_time_clarification());

        let outcome = engine().advance(flow, "19:30 actually", Language::En, wednesday());
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.collected[&SlotField::Time], "7:30 pm");
        assert!(flow.pending_time_raw.is_none());
    }

    #[test]
    fn confirm_yes_completes_and_clears_the_flow() {
        let mut flow = full_flow();
        flow.stage = FlowStage::Confirm;

        let outcome = engine().advance(flow, "yes please", Language::En, wednesday());
        assert!(outcome.flow.is_none());
        let completed = outcome.completed.expect("completed");
        assert_eq!(completed.service_key, "table_booking");
        assert!(completed.staff_summary().contains("2 guests"));
        assert!(completed.staff_summary().contains("under Koen"));
    }

    #[test]
    fn confirm_no_restarts_full_flows_from_the_first_field() {
        let mut flow = full_flow();
        flow.stage = FlowStage::Confirm;

        let outcome = engine().advance(flow, "no", Language::En, wednesday());
        let flow = outcome.flow.expect("flow survives");
        assert!(flow.collected.is_empty());
        assert_eq!(flow.stage, FlowStage::Slot(SlotField::Guests));
        assert!(outcome.reply.text.contains("start over"));
    }

    #[test]
    fn confirm_no_enters_edit_step_for_edit_style_services() {
        let engine = engine();
        let outcome = engine
            .start("p1", "need a taxi at 9am tomorrow", Language::En, wednesday(), None)
            .expect("recognized");
        let mut flow = outcome.flow.expect("flow");
        assert_eq!(flow.stage, FlowStage::Confirm);

        let outcome = engine.advance(flow, "no", Language::En, wednesday());
        flow = outcome.flow.expect("flow");
        assert_eq!(flow.stage, FlowStage::AskChange);

        // a recognized change returns to confirm
        let outcome = engine.advance(flow, "make it 10am", Language::En, wednesday());
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.stage, FlowStage::Confirm);
        assert_eq!(flow.collected[&SlotField::Time], "10:00 am");
    }

    #[test]
    fn unrecognized_edit_is_tolerated_with_a_reprompt() {
        let mut flow = full_flow();
        flow.stage = FlowStage::AskChange;

        let outcome = engine().advance(flow, "hmm not sure", Language::En, wednesday());
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.stage, FlowStage::AskChange);
        assert!(outcome.reply.text.contains("couldn't spot a change"));
    }

    #[test]
    fn garbage_at_confirm_re_shows_the_summary() {
        let mut flow = full_flow();
        flow.stage = FlowStage::Confirm;

        let outcome = engine().advance(flow, "what about parking", Language::En, wednesday());
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.stage, FlowStage::Confirm);
        assert!(outcome.reply.text.contains("Shall I confirm"));
    }

    #[test]
    fn confirm_summary_always_shows_meridiem() {
        let flow = full_flow();
        let summary = confirm_summary(&flow, engine().catalog().get("table_booking"));
        assert!(summary.text.contains("8:00 pm"));
    }

    #[test]
    fn cancel_clears_the_flow() {
        let flow = full_flow();
        let outcome = engine().advance(flow, "cancel that", Language::En, wednesday());
        assert!(outcome.flow.is_none());
        assert!(outcome.completed.is_none());
    }

    #[test]
    fn extraction_hints_prefill_but_ambiguous_hours_still_clarify() {
        let hints = NormalizedBooking {
            guests: Some(4),
            time_display: None,
            date_iso: Some("2026-08-28".to_owned()),
            name: None,
            needs_time_clarification: Some(7),
        };
        let outcome = engine()
            .start("p1", "book a table", Language::En, wednesday(), Some(&hints))
            .expect("recognized");
        let flow = outcome.flow.expect("flow");
        assert_eq!(flow.collected[&SlotField::Guests], "4");
        assert_eq!(flow.pending_time_raw.as_deref(), Some("7"));
        assert!(outcome.reply.text.contains("morning or the evening"));
    }

    fn full_flow() -> FlowState {
        let mut collected = BTreeMap::new();
        collected.insert(SlotField::Guests, "2".to_owned());
        collected.insert(SlotField::Time, "8:00 pm".to_owned());
        collected.insert(SlotField::Date, "Friday 28/08".to_owned());
        collected.insert(SlotField::Name, "Koen".to_owned());
        FlowState {
            service_key: "table_booking".to_owned(),
            required: vec![SlotField::Guests, SlotField::Time, SlotField::Date, SlotField::Name],
            collected,
            stage: FlowStage::Confirm,
            pending_time_raw: None,
            on_reject: RejectBehavior::Restart,
        }
    }
}
