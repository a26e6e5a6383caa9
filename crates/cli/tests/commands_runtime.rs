use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use approvals_cli::commands::{config, doctor, evaluate, tiers};
use approvals_core::config::ENV_KEYS;
use serde_json::Value;
use tempfile::TempDir;

const GAPPED_POLICY: &str = r#"
[[tiers]]
id = "small"
min_amount = 0
max_amount = 1000
risk_level = "low"

[[tiers.requirements]]
role = "manager"
department = "Finance"
count = 1
priority = 1
description = "Finance manager"

[[tiers]]
id = "large"
min_amount = 5000
risk_level = "high"

[[tiers.requirements]]
role = "manager"
count = 1
priority = 1
description = "Any manager"
"#;

#[test]
fn evaluate_fully_staffed_transfer_exits_zero() {
    with_env(&[], || {
        let result = evaluate::run("500000", "KRW", None, true);
        assert_eq!(result.exit_code, 0, "expected a fully staffed result");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["tier"]["id"], "tier_under_1m");
        assert_eq!(payload["selectedApprovers"].as_array().map(Vec::len), Some(2));
        assert_eq!(payload["missingRequirements"].as_array().map(Vec::len), Some(0));
    });
}

#[test]
fn evaluate_shortfall_exits_with_attention_code() {
    with_env(&[], || {
        let result = evaluate::run("2000000000", "krw", None, true);
        assert_eq!(result.exit_code, 3, "expected the finance shortfall to be flagged");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["tier"]["id"], "tier_1b_plus");
        assert_eq!(payload["warnings"][0], "Finance manager approval: need 2, found 1");
    });
}

#[test]
fn evaluate_negative_amount_is_invalid_input() {
    with_env(&[], || {
        let result = evaluate::run("-5", "KRW", None, true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "evaluate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_amount");
    });
}

#[test]
fn evaluate_reports_configuration_failure_for_missing_policy_file() {
    with_env(&[("APPROVALS_POLICY_PATH", "/nonexistent/approvals-policy.toml")], || {
        let result = evaluate::run("100", "KRW", None, true);
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "configuration");
    });
}

#[test]
fn evaluate_uses_rates_file_from_env() {
    let dir = TempDir::new().expect("temp dir");
    let rates_path = dir.path().join("rates.toml");
    fs::write(&rates_path, "reference = \"KRW\"\n\n[rates]\nBTC = \"90000000\"\n").expect("write rates");
    let rates = rates_path.to_string_lossy().to_string();

    with_env(&[("APPROVALS_RATES_PATH", rates.as_str())], || {
        let result = evaluate::run("10", "SOL", None, true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["tier"]["id"], "tier_under_1m");
        assert_eq!(payload["warnings"][0], "no exchange rate for SOL; amount treated as 0");
    });
}

#[test]
fn tiers_json_lists_reference_policy() {
    with_env(&[], || {
        let result = tiers::run(true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["referenceCurrency"], "KRW");
        assert_eq!(payload["source"], "built-in reference");
        assert_eq!(payload["tiers"].as_array().map(Vec::len), Some(5));
        assert_eq!(payload["tiers"][4]["maxAmount"], Value::Null);
    });
}

#[test]
fn config_attributes_env_overrides() {
    with_env(&[("APPROVALS_SERVER_PORT", "9100"), ("APPROVALS_LOG_LEVEL", "debug")], || {
        let output = config::run();

        assert!(output.contains("- server.port = 9100 (source: env (APPROVALS_SERVER_PORT))"));
        assert!(output.contains("- logging.level = debug (source: env (APPROVALS_LOG_LEVEL))"));
        assert!(output.contains("- policy.policy_path = <built-in reference> (source: default)"));
    });
}

#[test]
fn config_reports_invalid_env_override() {
    with_env(&[("APPROVALS_SERVER_PORT", "not-a-port")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed"));
    });
}

#[test]
fn doctor_passes_on_reference_data() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        assert_eq!(payload["checks"].as_array().map(Vec::len), Some(4));
    });
}

#[test]
fn doctor_fails_on_policy_with_coverage_gap() {
    let dir = TempDir::new().expect("temp dir");
    let policy_path = dir.path().join("policy.toml");
    fs::write(&policy_path, GAPPED_POLICY).expect("write policy");
    let policy = policy_path.to_string_lossy().to_string();

    with_env(&[("APPROVALS_POLICY_PATH", policy.as_str())], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][1]["name"], "policy_data");
        assert_eq!(payload["checks"][1]["status"], "fail");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let previous_values: Vec<(&str, Option<String>)> =
        ENV_KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in ENV_KEYS {
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
