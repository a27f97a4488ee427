use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Partition key for all persisted conversation state. One row per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub property_id: PropertyId,
    pub conversation_id: ConversationId,
}

impl ConversationKey {
    pub fn new(property_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            property_id: PropertyId(property_id.into()),
            conversation_id: ConversationId(conversation_id.into()),
        }
    }
}

/// Per-conversation orchestration state.
///
/// Pause bookkeeping invariant: the router's pause gate reads only `paused`;
/// `resume_at` is consulted only by the auto-resume sweep. `paused = true`
/// with `resume_at = None` is an indefinite pause that only `@boton` or
/// `@resolve` can lift.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub key: ConversationKey,
    pub paused: bool,
    pub resume_at: Option<DateTime<Utc>>,
    pub escalated: bool,
    pub watch_mode: bool,
    pub clarify_attempts: u32,
    pub negative_count: u32,
    pub service_flow: Option<FlowState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(key: ConversationKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            paused: false,
            resume_at: None,
            escalated: false,
            watch_mode: false,
            clarify_attempts: 0,
            negative_count: 0,
            service_flow: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Logical reset used by `@resolve`. The row survives; every flag,
    /// counter, and in-progress flow is dropped.
    pub fn cleared(mut self, now: DateTime<Utc>) -> Self {
        self.paused = false;
        self.resume_at = None;
        self.escalated = false;
        self.watch_mode = false;
        self.clarify_attempts = 0;
        self.negative_count = 0;
        self.service_flow = None;
        self.updated_at = now;
        self
    }
}

/// Field a service flow can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotField {
    Guests,
    Time,
    Date,
    Name,
}

impl SlotField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guests => "guests",
            Self::Time => "time",
            Self::Date => "date",
            Self::Name => "name",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "guests" => Some(Self::Guests),
            "time" => Some(Self::Time),
            "date" => Some(Self::Date),
            "name" => Some(Self::Name),
            _ => None,
        }
    }
}

/// What the flow is waiting for next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "field")]
pub enum FlowStage {
    /// Asking the guest for one specific field.
    Slot(SlotField),
    /// Showing the summary and waiting for yes/no.
    Confirm,
    /// Free-text edit step after a rejected confirmation (edit-style services).
    AskChange,
}

/// What a rejected confirmation does, per service template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectBehavior {
    /// Drop everything collected and re-ask from the first required field.
    #[default]
    Restart,
    /// Keep collected values and accept free-text corrections.
    Edit,
}

/// The persisted slot-filling session. Single tagged shape; the historical
/// split between a "pending confirm" payload and a full slot-filling payload
/// is expressed through `stage` + `on_reject` instead of key presence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub service_key: String,
    pub required: Vec<SlotField>,
    pub collected: BTreeMap<SlotField, String>,
    pub stage: FlowStage,
    /// A bare 1-12 hour captured but not yet disambiguated am/pm. While set,
    /// the next guest message is interpreted by the clarification
    /// sub-protocol and `stage` keeps pointing at the time field so it is not
    /// re-asked afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_time_raw: Option<String>,
    #[serde(default)]
    pub on_reject: RejectBehavior,
}

impl FlowState {
    pub fn missing(&self) -> Vec<SlotField> {
        self.required.iter().copied().filter(|f| !self.collected.contains_key(f)).collect()
    }

    /// First remaining field, or `Confirm` when everything is collected.
    pub fn next_stage(&self) -> FlowStage {
        match self.missing().first() {
            Some(field) => FlowStage::Slot(*field),
            None => FlowStage::Confirm,
        }
    }

    pub fn awaiting_time_clarification(&self) -> bool {
        self.pending_time_raw.is_some()
    }

    /// Structural checks on a persisted payload before it drives a turn. A
    /// row that violates these was written by a different schema or tampered
    /// with; advancing it would produce nonsense prompts.
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(field) = self.collected.keys().find(|f| !self.required.contains(f)) {
            return Err(DomainError::InvariantViolation(format!(
                "collected field `{}` is not required by `{}`",
                field.as_str(),
                self.service_key
            )));
        }

        if self.pending_time_raw.is_some() && self.stage != FlowStage::Slot(SlotField::Time) {
            return Err(DomainError::InvariantViolation(
                "pending time clarification while the time field is not in play".to_owned(),
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn flow() -> FlowState {
        FlowState {
            service_key: "table_booking".to_owned(),
            required: vec![SlotField::Guests, SlotField::Time, SlotField::Date, SlotField::Name],
            collected: BTreeMap::new(),
            stage: FlowStage::Slot(SlotField::Guests),
            pending_time_raw: None,
            on_reject: RejectBehavior::Restart,
        }
    }

    #[test]
    fn next_stage_walks_required_fields_in_order() {
        let mut flow = flow();
        assert_eq!(flow.next_stage(), FlowStage::Slot(SlotField::Guests));

        flow.collected.insert(SlotField::Guests, "4".to_owned());
        assert_eq!(flow.next_stage(), FlowStage::Slot(SlotField::Time));

        flow.collected.insert(SlotField::Time, "7:00 pm".to_owned());
        flow.collected.insert(SlotField::Date, "tomorrow".to_owned());
        flow.collected.insert(SlotField::Name, "Koen".to_owned());
        assert_eq!(flow.next_stage(), FlowStage::Confirm);
    }

    #[test]
    fn cleared_state_drops_all_flags_and_flow() {
        let now = Utc::now();
        let mut state = ConversationState::new(ConversationKey::new("prop-1", "conv-1"), now);
        state.paused = true;
        state.escalated = true;
        state.watch_mode = true;
        state.clarify_attempts = 2;
        state.negative_count = 3;
        state.service_flow = Some(flow());

        let cleared = state.cleared(now);
        assert!(!cleared.paused);
        assert!(!cleared.escalated);
        assert!(!cleared.watch_mode);
        assert_eq!(cleared.clarify_attempts, 0);
        assert_eq!(cleared.negative_count, 0);
        assert!(cleared.service_flow.is_none());
    }

    #[test]
    fn validate_accepts_a_well_formed_flow() {
        let mut value = flow();
        value.collected.insert(SlotField::Guests, "4".to_owned());
        value.pending_time_raw = Some("7".to_owned());
        value.stage = FlowStage::Slot(SlotField::Time);
        assert!(value.validate().is_ok());
    }

    #[test]
    fn validate_rejects_collected_fields_outside_the_template() {
        let mut value = flow();
        value.required = vec![SlotField::Time];
        value.collected.insert(SlotField::Guests, "4".to_owned());

        let error = value.validate().expect_err("stray collected field");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn validate_rejects_pending_clarification_at_the_wrong_stage() {
        let mut value = flow();
        value.pending_time_raw = Some("7".to_owned());
        value.stage = FlowStage::Confirm;

        assert!(value.validate().is_err());
    }

    #[test]
    fn flow_state_round_trips_through_json() {
        let mut value = flow();
        value.pending_time_raw = Some("7".to_owned());
        value.stage = FlowStage::Slot(SlotField::Time);

        let encoded = serde_json::to_string(&value).expect("encode flow");
        let decoded: FlowState = serde_json::from_str(&encoded).expect("decode flow");
        assert_eq!(decoded, value);
    }
}
