use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use concierge_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let reporter = SourceReporter::detect();

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let api_token = redact_token(config.platform.api_token.expose_secret());
    let extract_key = if config.extract.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let fields: Vec<(&str, String, Option<&str>)> = vec![
        ("database.url", config.database.url.clone(), Some("CONCIERGE_DATABASE_URL")),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            Some("CONCIERGE_DATABASE_MAX_CONNECTIONS"),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            Some("CONCIERGE_DATABASE_TIMEOUT_SECS"),
        ),
        ("platform.base_url", config.platform.base_url.clone(), Some("CONCIERGE_PLATFORM_BASE_URL")),
        ("platform.api_token", api_token, Some("CONCIERGE_PLATFORM_API_TOKEN")),
        ("platform.bot_tag", config.platform.bot_tag.clone(), None),
        ("extract.enabled", config.extract.enabled.to_string(), Some("CONCIERGE_EXTRACT_ENABLED")),
        (
            "extract.base_url",
            config.extract.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            Some("CONCIERGE_EXTRACT_BASE_URL"),
        ),
        ("extract.api_key", extract_key.to_string(), Some("CONCIERGE_EXTRACT_API_KEY")),
        ("extract.model", config.extract.model.clone(), Some("CONCIERGE_EXTRACT_MODEL")),
        (
            "extract.timeout_secs",
            config.extract.timeout_secs.to_string(),
            Some("CONCIERGE_EXTRACT_TIMEOUT_SECS"),
        ),
        (
            "extract.min_confidence",
            config.extract.min_confidence.to_string(),
            Some("CONCIERGE_EXTRACT_MIN_CONFIDENCE"),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            Some("CONCIERGE_SERVER_BIND_ADDRESS"),
        ),
        (
            "server.webhook_port",
            config.server.webhook_port.to_string(),
            Some("CONCIERGE_SERVER_WEBHOOK_PORT"),
        ),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            Some("CONCIERGE_SERVER_HEALTH_CHECK_PORT"),
        ),
        (
            "sweep.interval_secs",
            config.sweep.interval_secs.to_string(),
            Some("CONCIERGE_SWEEP_INTERVAL_SECS"),
        ),
        ("sweep.batch_size", config.sweep.batch_size.to_string(), Some("CONCIERGE_SWEEP_BATCH_SIZE")),
        ("logging.level", config.logging.level.clone(), Some("CONCIERGE_LOGGING_LEVEL")),
        ("logging.format", format!("{:?}", config.logging.format), Some("CONCIERGE_LOGGING_FORMAT")),
    ];

    for (key, value, env_key) in fields {
        lines.push(render_line(key, &value, reporter.field_source(key, env_key)));
    }

    lines.join("\n")
}

struct SourceReporter {
    config_file_path: Option<PathBuf>,
    config_file_doc: Option<Value>,
}

impl SourceReporter {
    fn detect() -> Self {
        let config_file_path = detect_config_path();
        let config_file_doc = load_config_file_doc(config_file_path.as_deref());
        Self { config_file_path, config_file_doc }
    }

    fn field_source(&self, key_path: &str, env_key: Option<&str>) -> String {
        if let Some(env_key) = env_key {
            if env::var_os(env_key).is_some() {
                return format!("env ({env_key})");
            }
        }

        if let Some(doc) = &self.config_file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .config_file_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("concierge.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/concierge.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
