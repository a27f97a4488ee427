//! Top-level message routing. One inbound event goes in, exactly one outcome
//! comes out: a reply, an escalation, a staff action, or a deliberate skip.
//!
//! Ordering is the contract here: staff commands first, then the pause gate,
//! then the welcome shortcut, then an already-active flow, then intent-based
//! dispatch. Nothing below a step runs if that step claims the message.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::collab::{
    collateral, ConversationPlatform, ConversationStore, FaqSearch, ReplySender, SettingsProvider,
    SlotExtractor, SmalltalkResponder, StaffNotifier, StoreError,
};
use crate::dialog::{CompletedBooking, DialogEngine, DialogOutcome};
use crate::domain::{
    Author, ConversationState, InboundEvent, Language, Priority, PropertySettings, Reply,
};
use crate::errors::ApplicationError;
use crate::escalation::{derive_priority, is_emergency, EscalationEngine, EscalationSignal};
use crate::intent::{decide, wants_human, Intent};
use crate::staff::{parse_staff_command, status_dump, StaffCommand};

/// Prefix carried by welcome-menu button payloads.
const WELCOME_PREFIX: &str = "welcome:";

/// What the router did with one inbound event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    Replied,
    Escalated,
    StaffHandled,
    Skipped { reason: &'static str },
}

/// Every external seam the router talks to, injected as trait objects so
/// tests and the simulation CLI can swap in in-memory doubles.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ConversationStore>,
    pub replies: Arc<dyn ReplySender>,
    pub notifier: Arc<dyn StaffNotifier>,
    pub platform: Arc<dyn ConversationPlatform>,
    pub faq: Arc<dyn FaqSearch>,
    pub settings: Arc<dyn SettingsProvider>,
    pub smalltalk: Arc<dyn SmalltalkResponder>,
    pub extractor: Arc<dyn SlotExtractor>,
}

pub struct Router {
    collab: Collaborators,
    dialog: DialogEngine,
    escalation: EscalationEngine,
}

impl Router {
    pub fn new(collab: Collaborators, dialog: DialogEngine) -> Self {
        let escalation = EscalationEngine::new(
            collab.store.clone(),
            collab.notifier.clone(),
            collab.platform.clone(),
        );
        Self { collab, dialog, escalation }
    }

    pub fn escalation(&self) -> &EscalationEngine {
        &self.escalation
    }

    /// Process one inbound event to completion. Never propagates parser or
    /// collaborator failures; only lost persistence writes surface as errors.
    pub async fn handle(&self, event: &InboundEvent) -> Result<RouteOutcome, ApplicationError> {
        let now = event.timestamp;
        let today = now.date_naive();
        let settings = self.collab.settings.settings_for(&event.key.property_id.0).await;

        let mut state = self
            .collab
            .store
            .load(&event.key)
            .await
            .map_err(store_err)?
            .unwrap_or_else(|| ConversationState::new(event.key.clone(), now));

        // 1. Staff commands bypass everything, including the pause gate.
        if event.author == Author::Staff {
            return self.handle_staff(event, &mut state, &settings).await;
        }

        // 2. Pause gate: only the boolean matters here. The deadline belongs
        //    to the sweep; an elapsed timer does not reopen the gate mid-turn.
        if state.paused {
            info!(
                event_name = "router.paused_skip",
                property_id = %event.key.property_id.0,
                conversation_id = %event.key.conversation_id.0,
                "message skipped, conversation is paused"
            );
            return Ok(RouteOutcome::Skipped { reason: "paused" });
        }

        // 3. Welcome-menu shortcut: the payload names the service, no
        //    classification needed.
        if let Some(payload) = event.shortcut_payload.as_deref() {
            if let Some(service_key) = payload.strip_prefix(WELCOME_PREFIX) {
                return self.start_shortcut_flow(event, &mut state, service_key, &settings).await;
            }
        }

        // 4. An active flow consumes the message before fresh classification.
        if let Some(flow) = state.service_flow.take() {
            flow.validate()?;
            let outcome = self.dialog.advance(flow, &event.text, event.lang, today);
            return self.apply_dialog_outcome(event, &mut state, outcome).await;
        }

        // 5. Explicit "talk to a human" wins over whatever we'd classify.
        if wants_human(&event.text) {
            return self
                .escalate_with_empathy(event, &mut state, &settings, "guest asked for a human", false)
                .await;
        }

        let decision = decide(&event.text, &settings);
        let emergency = is_emergency(&event.text, &settings);

        // 6 + 7. Negative sentiment escalates no matter what the intent was.
        if decision.negative || emergency {
            state.negative_count += 1;
            let reason = if emergency { "emergency keyword" } else { "negative sentiment" };
            return self
                .escalate_with_empathy(event, &mut state, &settings, reason, emergency)
                .await;
        }

        match decision.intent {
            Intent::Service => self.start_service_flow(event, &mut state, &settings, today).await,
            Intent::Faq => self.answer_faq(event, &mut state, &settings).await,
            Intent::Chitchat if !state.watch_mode => self.chitchat(event, &mut state).await,
            _ => self.clarify_or_escalate(event, &mut state, &settings).await,
        }
    }

    async fn handle_staff(
        &self,
        event: &InboundEvent,
        state: &mut ConversationState,
        settings: &PropertySettings,
    ) -> Result<RouteOutcome, ApplicationError> {
        let Some(command) = parse_staff_command(&event.text) else {
            return Ok(RouteOutcome::Skipped { reason: "staff_message" });
        };

        match command {
            StaffCommand::PauseBot { minutes } => {
                self.escalation
                    .hard_pause(state, minutes, settings, event.timestamp)
                    .await
                    .map_err(store_err)?;
            }
            StaffCommand::ResumeBot => {
                self.escalation.resume(state, event.timestamp).await.map_err(store_err)?;
            }
            StaffCommand::Resolve => {
                self.escalation.resolve(state, event.timestamp).await.map_err(store_err)?;
            }
            StaffCommand::Status => {
                let note = Reply::private_note(status_dump(state));
                self.deliver(event, &note).await;
            }
        }
        Ok(RouteOutcome::StaffHandled)
    }

    async fn start_shortcut_flow(
        &self,
        event: &InboundEvent,
        state: &mut ConversationState,
        service_key: &str,
        settings: &PropertySettings,
    ) -> Result<RouteOutcome, ApplicationError> {
        match self.dialog.start_from_shortcut(service_key, event.lang) {
            Some(outcome) => {
                state.service_flow = outcome.flow.clone();
                self.persist(state, event).await?;
                self.deliver(event, &outcome.reply).await;
                Ok(RouteOutcome::Replied)
            }
            None => {
                warn!(
                    event_name = "router.unknown_shortcut",
                    service_key, "welcome shortcut names no known service"
                );
                self.clarify_or_escalate(event, state, settings).await
            }
        }
    }

    async fn start_service_flow(
        &self,
        event: &InboundEvent,
        state: &mut ConversationState,
        settings: &PropertySettings,
        today: chrono::NaiveDate,
    ) -> Result<RouteOutcome, ApplicationError> {
        let hints = self.collab.extractor.extract(&event.text, today).await;
        match self.dialog.start(
            &event.key.property_id.0,
            &event.text,
            event.lang,
            today,
            hints.as_ref(),
        ) {
            Some(outcome) => self.apply_dialog_outcome(event, state, outcome).await,
            // Service-shaped text with no recognizable service goes through
            // the clarify counter like any other unconfident message.
            None => self.clarify_or_escalate(event, state, settings).await,
        }
    }

    async fn apply_dialog_outcome(
        &self,
        event: &InboundEvent,
        state: &mut ConversationState,
        outcome: DialogOutcome,
    ) -> Result<RouteOutcome, ApplicationError> {
        state.service_flow = outcome.flow.clone();
        state.updated_at = event.timestamp;
        self.persist(state, event).await?;

        if let Some(completed) = &outcome.completed {
            self.finalize_booking(event, completed).await;
        }

        self.deliver(event, &outcome.reply).await;
        Ok(RouteOutcome::Replied)
    }

    /// Finalization side effects are all best-effort: the guest already has
    /// their confirmation text. A confirmed service request always carries
    /// medium priority.
    async fn finalize_booking(&self, event: &InboundEvent, completed: &CompletedBooking) {
        let key = event.key.clone();
        let label = completed.service_key.clone();
        collateral("add_label", 1, || self.collab.platform.add_label(&key, &label)).await;
        collateral("set_priority", 1, || {
            self.collab.platform.set_priority(&key, Priority::Medium)
        })
        .await;
        let summary = completed.staff_summary();
        collateral("notify_staff", 2, || {
            self.collab.notifier.notify_staff(&key, &summary, Priority::Medium)
        })
        .await;

        info!(
            event_name = "router.booking_finalized",
            property_id = %key.property_id.0,
            conversation_id = %key.conversation_id.0,
            service_key = completed.service_key.as_str(),
            "service request confirmed"
        );
    }

    async fn escalate_with_empathy(
        &self,
        event: &InboundEvent,
        state: &mut ConversationState,
        settings: &PropertySettings,
        reason: &str,
        emergency: bool,
    ) -> Result<RouteOutcome, ApplicationError> {
        let decision = decide(&event.text, settings);
        let signal = EscalationSignal {
            emergency,
            negative: decision.negative,
            negative_count: state.negative_count,
            service_intent: decision.intent == Intent::Service,
        };
        let priority = derive_priority(signal, settings);

        self.escalation.soft_escalate(state, reason, priority).await.map_err(store_err)?;

        let reply = Reply::text(empathy_reply(event.lang));
        self.deliver(event, &reply).await;
        Ok(RouteOutcome::Escalated)
    }

    async fn answer_faq(
        &self,
        event: &InboundEvent,
        state: &mut ConversationState,
        settings: &PropertySettings,
    ) -> Result<RouteOutcome, ApplicationError> {
        let hit = match self
            .collab
            .faq
            .search(&event.key.property_id.0, &event.text, event.lang)
            .await
        {
            Ok(hit) => hit,
            Err(error) => {
                warn!(event_name = "router.faq_failed", error = %error, "faq lookup failed");
                None
            }
        };

        match hit.filter(|h| h.score >= settings.faq_conf_threshold) {
            Some(answer) => {
                state.clarify_attempts = 0;
                state.updated_at = event.timestamp;
                self.persist(state, event).await?;
                self.deliver(event, &Reply::text(answer.answer)).await;
                Ok(RouteOutcome::Replied)
            }
            None => self.clarify_or_escalate(event, state, settings).await,
        }
    }

    async fn chitchat(
        &self,
        event: &InboundEvent,
        state: &mut ConversationState,
    ) -> Result<RouteOutcome, ApplicationError> {
        let text = self
            .collab
            .smalltalk
            .reply_to(&event.text, event.lang)
            .unwrap_or_else(|| "Happy to help! What can I do for you?".to_owned());
        state.updated_at = event.timestamp;
        self.persist(state, event).await?;
        self.deliver(event, &Reply::text(text)).await;
        Ok(RouteOutcome::Replied)
    }

    /// The counted two-stage clarification ladder; exhausting it hands the
    /// conversation to staff.
    async fn clarify_or_escalate(
        &self,
        event: &InboundEvent,
        state: &mut ConversationState,
        settings: &PropertySettings,
    ) -> Result<RouteOutcome, ApplicationError> {
        state.clarify_attempts += 1;

        if state.clarify_attempts > settings.max_clarify_attempts {
            let decision = decide(&event.text, settings);
            let signal = EscalationSignal {
                emergency: false,
                negative: decision.negative,
                negative_count: state.negative_count,
                service_intent: false,
            };
            let priority = derive_priority(signal, settings);
            self.escalation
                .soft_escalate(state, "clarification attempts exhausted", priority)
                .await
                .map_err(store_err)?;

            let reply = Reply::text(fallback_reply(event.lang));
            self.deliver(event, &reply).await;
            return Ok(RouteOutcome::Escalated);
        }

        state.updated_at = event.timestamp;
        self.persist(state, event).await?;

        let reply = Reply::text(clarify_stage_prompt(state.clarify_attempts, event.lang));
        self.deliver(event, &reply).await;
        Ok(RouteOutcome::Replied)
    }

    /// State-transition writes must land before the reply counts as final.
    async fn persist(
        &self,
        state: &ConversationState,
        _event: &InboundEvent,
    ) -> Result<(), ApplicationError> {
        self.collab.store.upsert(state).await.map_err(store_err)
    }

    async fn deliver(&self, event: &InboundEvent, reply: &Reply) {
        let key = event.key.clone();
        collateral("send_reply", 2, || self.collab.replies.send_reply(&key, reply)).await;
    }
}

fn store_err(error: StoreError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn empathy_reply(lang: Language) -> &'static str {
    match lang {
        Language::En => {
            "I'm very sorry about this. I've alerted our team and someone will be with you right away."
        }
        Language::Vi => {
            "Em rất xin lỗi về điều này ạ. Em đã báo cho đội ngũ và sẽ có người hỗ trợ anh/chị ngay."
        }
        Language::Nl => {
            "Het spijt me zeer. Ik heb ons team gewaarschuwd en er komt direct iemand bij u."
        }
    }
}

fn fallback_reply(lang: Language) -> &'static str {
    match lang {
        Language::En => {
            "I want to make sure you get the right help, so I've asked a member of our team to step in."
        }
        Language::Vi => {
            "Để chắc chắn anh/chị được hỗ trợ đúng, em đã nhờ một thành viên trong đội ngũ tiếp nhận ạ."
        }
        Language::Nl => {
            "Om u goed te helpen heb ik een collega gevraagd het gesprek over te nemen."
        }
    }
}

fn clarify_stage_prompt(attempt: u32, lang: Language) -> &'static str {
    match (attempt, lang) {
        (1, Language::En) => "Sorry, I didn't quite get that. Could you say it another way?",
        (1, Language::Vi) => "Xin lỗi, em chưa hiểu rõ ạ. Anh/chị có thể nói theo cách khác không ạ?",
        (1, Language::Nl) => "Sorry, dat begreep ik niet helemaal. Kunt u het anders formuleren?",
        (_, Language::En) => {
            "I can help with table bookings, spa appointments, taxis, late checkout, or questions about the property. Which would you like?"
        }
        (_, Language::Vi) => {
            "Em có thể giúp đặt bàn, đặt lịch spa, gọi taxi, trả phòng muộn hoặc trả lời câu hỏi về khách sạn ạ. Anh/chị cần gì ạ?"
        }
        (_, Language::Nl) => {
            "Ik kan helpen met tafelreserveringen, spa-afspraken, taxi's, late checkout of vragen over het hotel. Wat wilt u?"
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::collab::memory::{
        CannedSmalltalk, FixedSettings, InMemoryStore, NoopExtractor, RecordingNotifier,
        RecordingPlatform, RecordingReplySender, StaticFaq,
    };
    use crate::domain::{ConversationKey, SourceChannel};

    use super::*;

    struct Harness {
        router: Router,
        store: Arc<InMemoryStore>,
        replies: Arc<RecordingReplySender>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness() -> Harness {
        harness_with_settings(PropertySettings::default())
    }

    fn harness_with_settings(settings: PropertySettings) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let replies = Arc::new(RecordingReplySender::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let collab = Collaborators {
            store: store.clone(),
            replies: replies.clone(),
            notifier: notifier.clone(),
            platform: Arc::new(RecordingPlatform::default()),
            faq: Arc::new(
                StaticFaq::default().with_entry("breakfast", "Breakfast is 7-10am daily.", 0.9),
            ),
            settings: Arc::new(FixedSettings { settings }),
            smalltalk: Arc::new(CannedSmalltalk),
            extractor: Arc::new(NoopExtractor),
        };
        let router = Router::new(collab, DialogEngine::default());
        Harness { router, store, replies, notifier }
    }

    fn guest(text: &str) -> InboundEvent {
        InboundEvent {
            key: ConversationKey::new("p1", "c1"),
            text: text.to_owned(),
            lang: Language::En,
            timestamp: Utc::now(),
            source_channel: SourceChannel::Whatsapp,
            author: Author::Guest,
            shortcut_payload: None,
        }
    }

    fn staff(text: &str) -> InboundEvent {
        InboundEvent { author: Author::Staff, ..guest(text) }
    }

    #[tokio::test]
    async fn corrupt_persisted_flow_surfaces_a_domain_error() {
        use std::collections::BTreeMap;

        use crate::domain::{FlowStage, FlowState, RejectBehavior, SlotField};
        use crate::errors::DomainError;

        let h = harness();
        let event = guest("7 people");

        let mut collected = BTreeMap::new();
        collected.insert(SlotField::Guests, "4".to_owned());
        let mut state = ConversationState::new(event.key.clone(), Utc::now());
        state.service_flow = Some(FlowState {
            service_key: "table_booking".to_owned(),
            required: vec![SlotField::Time],
            collected,
            stage: FlowStage::Slot(SlotField::Time),
            pending_time_raw: None,
            on_reject: RejectBehavior::Restart,
        });
        h.store.upsert(&state).await.unwrap();

        let error = h.router.handle(&event).await.expect_err("flow fails validation");
        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::InvariantViolation(_))
        ));
        assert!(h.replies.texts().is_empty(), "no reply goes out for a rejected payload");
    }

    #[tokio::test]
    async fn botoff_pauses_and_guest_messages_are_skipped_silently() {
        let h = harness();

        let outcome = h.router.handle(&staff("@botoff 15")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::StaffHandled);

        let state = h.store.load(&ConversationKey::new("p1", "c1")).await.unwrap().unwrap();
        assert!(state.paused);
        let deadline = state.resume_at.unwrap();
        let delta = deadline - Utc::now();
        assert!(delta > Duration::minutes(14) && delta <= Duration::minutes(15));

        let outcome = h.router.handle(&guest("hello, anyone there?")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Skipped { reason: "paused" });
        assert!(h.replies.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_service_message_escalates_instead_of_booking() {
        let h = harness();

        let outcome =
            h.router.handle(&guest("the AC is broken and I'm furious")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Escalated);

        let state = h.store.load(&ConversationKey::new("p1", "c1")).await.unwrap().unwrap();
        assert!(state.escalated);
        assert!(state.service_flow.is_none());
        assert_eq!(state.negative_count, 1);

        let notes = h.notifier.notifications.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].2, Priority::High);
        assert!(h.replies.texts()[0].contains("sorry"));
    }

    #[tokio::test]
    async fn service_message_starts_a_flow_and_later_messages_advance_it() {
        let h = harness();

        let outcome = h.router.handle(&guest("I'd like to book a table")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Replied);
        let state = h.store.load(&ConversationKey::new("p1", "c1")).await.unwrap().unwrap();
        assert!(state.service_flow.is_some());
        assert!(h.replies.texts()[0].contains("How many people"));

        // the follow-up is consumed by the flow, not re-classified
        h.router.handle(&guest("4 people")).await.unwrap();
        let state = h.store.load(&ConversationKey::new("p1", "c1")).await.unwrap().unwrap();
        let flow = state.service_flow.unwrap();
        assert_eq!(flow.collected[&crate::domain::SlotField::Guests], "4");
    }

    #[tokio::test]
    async fn confident_faq_answers_directly() {
        let h = harness();
        let outcome = h.router.handle(&guest("what time is breakfast?")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Replied);
        assert_eq!(h.replies.texts(), vec!["Breakfast is 7-10am daily."]);
    }

    #[tokio::test]
    async fn unknown_messages_clarify_twice_then_escalate() {
        let h = harness();

        let o1 = h.router.handle(&guest("xyzzy plugh")).await.unwrap();
        assert_eq!(o1, RouteOutcome::Replied);
        let o2 = h.router.handle(&guest("xyzzy plugh")).await.unwrap();
        assert_eq!(o2, RouteOutcome::Replied);
        let o3 = h.router.handle(&guest("xyzzy plugh")).await.unwrap();
        assert_eq!(o3, RouteOutcome::Escalated);

        let texts = h.replies.texts();
        assert!(texts[0].contains("didn't quite get that"));
        assert!(texts[1].contains("I can help with"));
        assert!(texts[2].contains("team"));
        assert_eq!(h.notifier.notifications.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wants_human_escalates_regardless_of_intent() {
        let h = harness();
        let outcome = h.router.handle(&guest("can I talk to a human please")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Escalated);
        let state = h.store.load(&ConversationKey::new("p1", "c1")).await.unwrap().unwrap();
        assert!(state.watch_mode);
    }

    #[tokio::test]
    async fn emergency_keyword_pages_staff_urgently() {
        let settings = PropertySettings {
            escalate_keywords: vec!["fire".to_owned()],
            ..PropertySettings::default()
        };
        let h = harness_with_settings(settings);

        let outcome = h.router.handle(&guest("there's a fire on the balcony")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Escalated);
        assert_eq!(h.notifier.notifications.lock().unwrap()[0].2, Priority::Urgent);
    }

    #[tokio::test]
    async fn welcome_shortcut_skips_classification() {
        let h = harness();
        let mut event = guest("");
        event.shortcut_payload = Some("welcome:spa_booking".to_owned());

        let outcome = h.router.handle(&event).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Replied);
        let state = h.store.load(&ConversationKey::new("p1", "c1")).await.unwrap().unwrap();
        assert_eq!(state.service_flow.unwrap().service_key, "spa_booking");
    }

    #[tokio::test]
    async fn chitchat_gets_a_smalltalk_reply() {
        let h = harness();
        let outcome = h.router.handle(&guest("hello!")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Replied);
        assert!(h.replies.texts()[0].contains("How can I help"));
    }

    #[tokio::test]
    async fn watch_mode_sends_chitchat_through_the_clarify_ladder() {
        let h = harness();
        let key = ConversationKey::new("p1", "c1");
        let mut state = ConversationState::new(key.clone(), Utc::now());
        state.watch_mode = true;
        state.escalated = true;
        h.store.seed(state);

        let outcome = h.router.handle(&guest("hello!")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Replied);
        let state = h.store.load(&key).await.unwrap().unwrap();
        assert_eq!(state.clarify_attempts, 1);
    }

    #[tokio::test]
    async fn unrecognized_staff_text_is_ignored() {
        let h = harness();
        let outcome = h.router.handle(&staff("I'll take over from here")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Skipped { reason: "staff_message" });
        assert!(h.replies.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn botstatus_replies_with_a_private_dump() {
        let h = harness();
        let outcome = h.router.handle(&staff("@botstatus")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::StaffHandled);
        let sent = h.replies.sent.lock().unwrap();
        assert!(sent[0].1.private);
        assert!(sent[0].1.text.contains("paused=false"));
    }

    #[tokio::test]
    async fn boton_after_botoff_resumes_and_guest_flow_works_again() {
        let h = harness();
        h.router.handle(&staff("@botoff")).await.unwrap();
        h.router.handle(&staff("@boton")).await.unwrap();

        let outcome = h.router.handle(&guest("hi there")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Replied);
    }

    #[tokio::test]
    async fn full_booking_finalization_notifies_staff_with_summary() {
        let h = harness();
        h.router
            .handle(&guest("book a table for friday 8pm for 2 people under koen"))
            .await
            .unwrap();
        let outcome = h.router.handle(&guest("yes")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Replied);

        let state = h.store.load(&ConversationKey::new("p1", "c1")).await.unwrap().unwrap();
        assert!(state.service_flow.is_none());
        let notes = h.notifier.notifications.lock().unwrap();
        assert!(notes.iter().any(|(_, m, p)| {
            m.contains("table booking") && m.contains("2 guests") && *p == Priority::Medium
        }));
    }
}
