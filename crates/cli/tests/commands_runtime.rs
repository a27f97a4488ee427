use std::env;
use std::sync::{Mutex, OnceLock};

use concierge_cli::commands::{config, doctor, migrate, simulate};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[
            ("CONCIERGE_DATABASE_URL", "sqlite::memory:"),
            ("CONCIERGE_PLATFORM_API_TOKEN", "token-test"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn migrate_returns_config_failure_without_token() {
    with_env(&[], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_redacts_token_and_attributes_env_source() {
    with_env(
        &[
            ("CONCIERGE_DATABASE_URL", "sqlite::memory:"),
            ("CONCIERGE_PLATFORM_API_TOKEN", "token-supersecret"),
        ],
        || {
            let output = config::run();
            assert!(output.contains("- platform.api_token = token-*** "));
            assert!(!output.contains("supersecret"));
            assert!(output.contains("(source: env (CONCIERGE_PLATFORM_API_TOKEN))"));
            assert!(output.contains("- database.url = sqlite::memory: "));
            assert!(output.contains("- sweep.batch_size = 50 (source: default)"));
        },
    );
}

#[test]
fn doctor_json_passes_with_valid_env() {
    with_env(
        &[
            ("CONCIERGE_DATABASE_URL", "sqlite::memory:"),
            ("CONCIERGE_PLATFORM_API_TOKEN", "token-test"),
        ],
        || {
            let output = doctor::run(true);
            let payload = parse_payload(&output);
            assert_eq!(payload["overall_status"], "pass");

            let checks = payload["checks"].as_array().expect("checks array");
            let names: Vec<&str> =
                checks.iter().filter_map(|check| check["name"].as_str()).collect();
            assert_eq!(
                names,
                ["config_validation", "platform_token_readiness", "database_connectivity"]
            );
        },
    );
}

#[test]
fn doctor_reports_config_failure_and_skips_dependent_checks() {
    with_env(&[], || {
        let output = doctor::run(false);
        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation:"));
        assert!(output.contains("- [skip] platform_token_readiness:"));
        assert!(output.contains("- [skip] database_connectivity:"));
    });
}

#[test]
fn simulate_replays_a_scripted_conversation() {
    let messages = vec![
        "hi there".to_string(),
        "staff:@botoff 10".to_string(),
        "anyone home?".to_string(),
        "staff:@boton".to_string(),
        "what is the wifi password?".to_string(),
    ];

    let result = simulate::run(&messages);
    assert_eq!(result.exit_code, 0, "expected successful simulation");

    assert!(result.output.contains("guest> hi there"));
    assert!(result.output.contains("(staff command applied)"));
    assert!(result.output.contains("(skipped: paused)"));
    assert!(result.output.contains("bot> The wifi password is printed on your key card."));

    let payload = parse_payload(last_line(&result.output));
    assert_eq!(payload["command"], "simulate");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["turns"], 5);
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CONCIERGE_DATABASE_URL",
        "CONCIERGE_DATABASE_MAX_CONNECTIONS",
        "CONCIERGE_DATABASE_TIMEOUT_SECS",
        "CONCIERGE_PLATFORM_BASE_URL",
        "CONCIERGE_PLATFORM_API_TOKEN",
        "CONCIERGE_EXTRACT_ENABLED",
        "CONCIERGE_EXTRACT_BASE_URL",
        "CONCIERGE_EXTRACT_API_KEY",
        "CONCIERGE_EXTRACT_MODEL",
        "CONCIERGE_EXTRACT_TIMEOUT_SECS",
        "CONCIERGE_EXTRACT_MIN_CONFIDENCE",
        "CONCIERGE_SERVER_BIND_ADDRESS",
        "CONCIERGE_SERVER_WEBHOOK_PORT",
        "CONCIERGE_SERVER_HEALTH_CHECK_PORT",
        "CONCIERGE_SWEEP_INTERVAL_SECS",
        "CONCIERGE_SWEEP_BATCH_SIZE",
        "CONCIERGE_LOGGING_LEVEL",
        "CONCIERGE_LOGGING_FORMAT",
        "CONCIERGE_LOG_LEVEL",
        "CONCIERGE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
