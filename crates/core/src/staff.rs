//! Staff slash-style commands. Case-insensitive prefix match on the message
//! text; anything else typed privately by staff is ignored.

use crate::domain::ConversationState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaffCommand {
    /// `@botoff [minutes]` — hard pause, optional duration.
    PauseBot { minutes: Option<i64> },
    /// `@boton` — manual resume.
    ResumeBot,
    /// `@resolve` — close out the conversation.
    Resolve,
    /// `@botstatus` — read-only state dump, replied as a private note.
    Status,
}

pub fn parse_staff_command(text: &str) -> Option<StaffCommand> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    if let Some(rest) = lower.strip_prefix("@botoff") {
        let minutes = rest.split_whitespace().next().and_then(|w| w.parse::<i64>().ok());
        return Some(StaffCommand::PauseBot { minutes: minutes.filter(|m| *m > 0) });
    }
    if lower.starts_with("@botstatus") {
        return Some(StaffCommand::Status);
    }
    if lower.starts_with("@boton") {
        return Some(StaffCommand::ResumeBot);
    }
    if lower.starts_with("@resolve") {
        return Some(StaffCommand::Resolve);
    }
    None
}

/// The `@botstatus` dump staff sees as a private note.
pub fn status_dump(state: &ConversationState) -> String {
    let resume = state
        .resume_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "-".to_owned());
    let flow = state
        .service_flow
        .as_ref()
        .map(|f| f.service_key.clone())
        .unwrap_or_else(|| "-".to_owned());
    format!(
        "bot status: paused={} resume_at={} escalated={} watch={} clarify_attempts={} negative_count={} active_flow={}",
        state.paused,
        resume,
        state.escalated,
        state.watch_mode,
        state.clarify_attempts,
        state.negative_count,
        flow,
    )
}
