use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PropertySettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub platform: PlatformConfig,
    pub extract: ExtractConfig,
    pub server: ServerConfig,
    pub sweep: SweepConfig,
    pub defaults: PropertySettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Credentials and endpoint of the chat-platform REST API.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub base_url: String,
    pub api_token: SecretString,
    /// Marker appended to bot-authored messages so the router can recognize
    /// and skip its own output on read-back.
    pub bot_tag: String,
}

/// Optional LLM booking pre-extraction. Disabled by default; when enabled the
/// call is bounded by `timeout_secs` and its output still has to clear the
/// local validation gate.
#[derive(Clone, Debug)]
pub struct ExtractConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
    pub min_confidence: f64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub webhook_port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SweepConfig {
    pub interval_secs: u64,
    pub batch_size: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub platform_api_token: Option<String>,
    pub extract_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://concierge.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            platform: PlatformConfig {
                base_url: "https://api.chat.example.com".to_string(),
                api_token: String::new().into(),
                bot_tag: "[bot]".to_string(),
            },
            extract: ExtractConfig {
                enabled: false,
                base_url: Some("http://localhost:11434".to_string()),
                api_key: None,
                model: "llama3.1".to_string(),
                timeout_secs: 4,
                min_confidence: 0.70,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                webhook_port: 8089,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            sweep: SweepConfig { interval_secs: 30, batch_size: 50 },
            defaults: PropertySettings::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("concierge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(platform) = patch.platform {
            if let Some(base_url) = platform.base_url {
                self.platform.base_url = base_url;
            }
            if let Some(api_token_value) = platform.api_token {
                self.platform.api_token = secret_value(api_token_value);
            }
            if let Some(bot_tag) = platform.bot_tag {
                self.platform.bot_tag = bot_tag;
            }
        }

        if let Some(extract) = patch.extract {
            if let Some(enabled) = extract.enabled {
                self.extract.enabled = enabled;
            }
            if let Some(base_url) = extract.base_url {
                self.extract.base_url = Some(base_url);
            }
            if let Some(api_key_value) = extract.api_key {
                self.extract.api_key = Some(secret_value(api_key_value));
            }
            if let Some(model) = extract.model {
                self.extract.model = model;
            }
            if let Some(timeout_secs) = extract.timeout_secs {
                self.extract.timeout_secs = timeout_secs;
            }
            if let Some(min_confidence) = extract.min_confidence {
                self.extract.min_confidence = min_confidence;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(webhook_port) = server.webhook_port {
                self.server.webhook_port = webhook_port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(sweep) = patch.sweep {
            if let Some(interval_secs) = sweep.interval_secs {
                self.sweep.interval_secs = interval_secs;
            }
            if let Some(batch_size) = sweep.batch_size {
                self.sweep.batch_size = batch_size;
            }
        }

        if let Some(defaults) = patch.defaults {
            if let Some(faq_conf_threshold) = defaults.faq_conf_threshold {
                self.defaults.faq_conf_threshold = faq_conf_threshold;
            }
            if let Some(chitchat_enabled) = defaults.chitchat_enabled {
                self.defaults.chitchat_enabled = chitchat_enabled;
            }
            if let Some(negative_repeat_threshold) = defaults.negative_repeat_threshold {
                self.defaults.negative_repeat_threshold = negative_repeat_threshold;
            }
            if let Some(auto_resume_minutes) = defaults.auto_resume_minutes {
                self.defaults.auto_resume_minutes = auto_resume_minutes;
            }
            if let Some(escalate_keywords) = defaults.escalate_keywords {
                self.defaults.escalate_keywords = escalate_keywords;
            }
            if let Some(max_clarify_attempts) = defaults.max_clarify_attempts {
                self.defaults.max_clarify_attempts = max_clarify_attempts;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONCIERGE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CONCIERGE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CONCIERGE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CONCIERGE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_PLATFORM_BASE_URL") {
            self.platform.base_url = value;
        }
        if let Some(value) = read_env("CONCIERGE_PLATFORM_API_TOKEN") {
            self.platform.api_token = secret_value(value);
        }

        if let Some(value) = read_env("CONCIERGE_EXTRACT_ENABLED") {
            self.extract.enabled = parse_bool("CONCIERGE_EXTRACT_ENABLED", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_EXTRACT_BASE_URL") {
            self.extract.base_url = Some(value);
        }
        if let Some(value) = read_env("CONCIERGE_EXTRACT_API_KEY") {
            self.extract.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CONCIERGE_EXTRACT_MODEL") {
            self.extract.model = value;
        }
        if let Some(value) = read_env("CONCIERGE_EXTRACT_TIMEOUT_SECS") {
            self.extract.timeout_secs = parse_u64("CONCIERGE_EXTRACT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_EXTRACT_MIN_CONFIDENCE") {
            self.extract.min_confidence = parse_f64("CONCIERGE_EXTRACT_MIN_CONFIDENCE", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_WEBHOOK_PORT") {
            self.server.webhook_port = parse_u16("CONCIERGE_SERVER_WEBHOOK_PORT", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("CONCIERGE_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_SWEEP_INTERVAL_SECS") {
            self.sweep.interval_secs = parse_u64("CONCIERGE_SWEEP_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_SWEEP_BATCH_SIZE") {
            self.sweep.batch_size = parse_u32("CONCIERGE_SWEEP_BATCH_SIZE", &value)?;
        }

        let log_level =
            read_env("CONCIERGE_LOGGING_LEVEL").or_else(|| read_env("CONCIERGE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CONCIERGE_LOGGING_FORMAT").or_else(|| read_env("CONCIERGE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(api_token) = overrides.platform_api_token {
            self.platform.api_token = secret_value(api_token);
        }
        if let Some(enabled) = overrides.extract_enabled {
            self.extract.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_platform(&self.platform)?;
        validate_extract(&self.extract)?;
        validate_server(&self.server)?;
        validate_sweep(&self.sweep)?;
        validate_defaults(&self.defaults)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("concierge.toml"), PathBuf::from("config/concierge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_platform(platform: &PlatformConfig) -> Result<(), ConfigError> {
    if platform.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("platform.base_url is required".to_string()));
    }
    if !platform.base_url.starts_with("http://") && !platform.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "platform.base_url must be an http(s) URL".to_string(),
        ));
    }
    if platform.api_token.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "platform.api_token is required (set CONCIERGE_PLATFORM_API_TOKEN)".to_string(),
        ));
    }
    if platform.bot_tag.trim().is_empty() {
        return Err(ConfigError::Validation("platform.bot_tag must not be blank".to_string()));
    }
    Ok(())
}

fn validate_extract(extract: &ExtractConfig) -> Result<(), ConfigError> {
    if extract.enabled && extract.base_url.as_deref().map_or(true, |url| url.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "extract.base_url is required when extraction is enabled".to_string(),
        ));
    }
    if extract.timeout_secs == 0 || extract.timeout_secs > 30 {
        return Err(ConfigError::Validation(
            "extract.timeout_secs must be in range 1..=30".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&extract.min_confidence) {
        return Err(ConfigError::Validation(
            "extract.min_confidence must be in range 0.0..=1.0".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be blank".to_string()));
    }
    if server.webhook_port == server.health_check_port {
        return Err(ConfigError::Validation(
            "server.webhook_port and server.health_check_port must differ".to_string(),
        ));
    }
    Ok(())
}

fn validate_sweep(sweep: &SweepConfig) -> Result<(), ConfigError> {
    if sweep.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sweep.interval_secs must be greater than zero".to_string(),
        ));
    }
    if sweep.batch_size == 0 {
        return Err(ConfigError::Validation(
            "sweep.batch_size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_defaults(defaults: &PropertySettings) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&defaults.faq_conf_threshold) {
        return Err(ConfigError::Validation(
            "defaults.faq_conf_threshold must be in range 0.0..=1.0".to_string(),
        ));
    }
    if defaults.auto_resume_minutes <= 0 {
        return Err(ConfigError::Validation(
            "defaults.auto_resume_minutes must be greater than zero".to_string(),
        ));
    }
    if defaults.max_clarify_attempts == 0 {
        return Err(ConfigError::Validation(
            "defaults.max_clarify_attempts must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    let known = ["trace", "debug", "info", "warn", "error"];
    if !known.contains(&level.as_str()) {
        return Err(ConfigError::Validation(format!(
            "logging.level `{}` is not one of trace|debug|info|warn|error",
            logging.level
        )));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value: value.to_owned() })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value: value.to_owned() })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value: value.to_owned() })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value: value.to_owned() })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_owned(), value: value.to_owned() }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    platform: Option<PlatformPatch>,
    extract: Option<ExtractPatch>,
    server: Option<ServerPatch>,
    sweep: Option<SweepPatch>,
    defaults: Option<DefaultsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PlatformPatch {
    base_url: Option<String>,
    api_token: Option<String>,
    bot_tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    min_confidence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    webhook_port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SweepPatch {
    interval_secs: Option<u64>,
    batch_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsPatch {
    faq_conf_threshold: Option<f64>,
    chitchat_enabled: Option<bool>,
    negative_repeat_threshold: Option<u32>,
    auto_resume_minutes: Option<i64>,
    escalate_keywords: Option<Vec<String>>,
    max_clarify_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
