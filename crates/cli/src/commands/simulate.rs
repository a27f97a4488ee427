//! Offline conversation simulation: the full routing pipeline wired to
//! in-memory doubles, so a scripted exchange can be replayed without a
//! database or a messaging platform.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::commands::CommandResult;
use concierge_core::collab::memory::{
    CannedSmalltalk, FixedSettings, InMemoryStore, NoopExtractor, RecordingNotifier,
    RecordingPlatform, RecordingReplySender, StaticFaq,
};
use concierge_core::{
    Author, Collaborators, ConversationKey, DialogEngine, InboundEvent, Language, RouteOutcome,
    Router, SourceChannel,
};

const STAFF_PREFIX: &str = "staff:";

#[derive(Debug, Serialize)]
struct SimulationSummary {
    command: &'static str,
    status: &'static str,
    turns: usize,
    replies: usize,
    staff_notifications: usize,
}

pub fn run(messages: &[String]) -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "simulate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let replies = Arc::new(RecordingReplySender::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let collab = Collaborators {
        store: Arc::new(InMemoryStore::new()),
        replies: replies.clone(),
        notifier: notifier.clone(),
        platform: Arc::new(RecordingPlatform::default()),
        faq: Arc::new(
            StaticFaq::default()
                .with_entry("wifi", "The wifi password is printed on your key card.", 0.92)
                .with_entry("checkout", "Checkout is at 11am; late checkout on request.", 0.88),
        ),
        settings: Arc::new(FixedSettings::default()),
        smalltalk: Arc::new(CannedSmalltalk),
        extractor: Arc::new(NoopExtractor),
    };
    let router = Router::new(collab, DialogEngine::default());

    let mut lines = Vec::new();
    let mut delivered = 0usize;

    for raw in messages {
        let (author, text) = match raw.strip_prefix(STAFF_PREFIX) {
            Some(rest) => (Author::Staff, rest.trim()),
            None => (Author::Guest, raw.as_str()),
        };

        let event = InboundEvent {
            key: ConversationKey::new("sim", "sim-1"),
            text: text.to_owned(),
            lang: Language::En,
            timestamp: Utc::now(),
            source_channel: SourceChannel::Webchat,
            author,
            shortcut_payload: None,
        };

        let speaker = if author == Author::Staff { "staff" } else { "guest" };
        lines.push(format!("{speaker}> {text}"));

        let outcome = match runtime.block_on(router.handle(&event)) {
            Ok(outcome) => outcome,
            Err(error) => {
                return CommandResult::failure(
                    "simulate",
                    "routing",
                    format!("turn `{text}` failed: {error}"),
                    6,
                );
            }
        };

        let sent = replies.texts();
        for reply in &sent[delivered..] {
            lines.push(format!("bot> {reply}"));
        }
        delivered = sent.len();

        match outcome {
            RouteOutcome::Replied => {}
            RouteOutcome::Escalated => lines.push("(escalated to staff)".to_string()),
            RouteOutcome::StaffHandled => lines.push("(staff command applied)".to_string()),
            RouteOutcome::Skipped { reason } => lines.push(format!("(skipped: {reason})")),
        }
    }

    let notifications = notifier.notifications.lock().unwrap().len();
    let summary = SimulationSummary {
        command: "simulate",
        status: "ok",
        turns: messages.len(),
        replies: delivered,
        staff_notifications: notifications,
    };
    lines.push(serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string()));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}
