pub mod config;
pub mod doctor;
pub mod migrate;
pub mod simulate;

use serde_json::json;

/// What a subcommand hands back to `run()`: the process exit code plus the
/// text to print. Machine-facing commands put a single JSON object on the
/// last line of `output`.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self { exit_code: 0, output: outcome_json(command, "ok", None, &message.into()) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self {
            exit_code,
            output: outcome_json(command, "error", Some(error_class), &message.into()),
        }
    }
}

fn outcome_json(command: &str, status: &str, error_class: Option<&str>, message: &str) -> String {
    json!({
        "command": command,
        "status": status,
        "error_class": error_class,
        "message": message,
    })
    .to_string()
}
