use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use basket_cli::commands::{doctor, migrate, recommend, rules, seed, MiningArgs};
use serde_json::Value;
use tempfile::TempDir;

const GROCERY_INPUT: &str = r#"[
    {"transaction_id": 1, "item_name": "Milk"},
    {"transaction_id": 1, "item_name": "Bread"},
    {"transaction_id": 1, "item_name": "Butter"},
    {"transaction_id": 2, "item_name": "Milk"},
    {"transaction_id": 2, "item_name": "Bread"},
    {"transaction_id": 3, "item_name": "Milk"},
    {"transaction_id": 3, "item_name": "Bread"},
    {"transaction_id": 3, "item_name": "Butter"},
    {"transaction_id": "4", "item_name": "Eggs"},
    {"transaction_id": "4", "item_name": "Tea"},
    {"transaction_id": "5", "item_name": "Eggs"},
    {"transaction_id": "5", "item_name": "Tea"},
    {"transaction_id": "6", "item_name": "Milk"},
    {"transaction_id": "6", "item_name": "Butter"}
]"#;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("BASKET_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("BASKET_DATABASE_URL", "postgres://localhost/basket")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("basket.db").display());

    with_env(&[("BASKET_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");
        assert_eq!(
            first_payload["message"],
            "demo basket dataset loaded: 10 invoices, 25 itemized lines"
        );

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        assert_eq!(first_payload["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn rules_over_seeded_database_lists_rules() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("basket.db").display());

    with_env(&[("BASKET_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0, "seed should succeed");

        let result = rules::run(&MiningArgs { min_support: Some(0.2), ..MiningArgs::default() });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["success"], true);
        let count = payload["rules_count"].as_u64().expect("rules_count should be a number");
        assert!(count > 0);
        assert_eq!(payload["rules"].as_array().map(Vec::len), Some(count as usize));
    });
}

#[test]
fn rules_on_empty_database_is_a_diagnostic() {
    with_env(&[("BASKET_DATABASE_URL", "sqlite::memory:")], || {
        let result = rules::run(&MiningArgs::default());
        assert_eq!(result.exit_code, 0, "diagnostics are not failures");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["success"], false);
        assert!(payload.get("rules").is_none());
        assert!(payload["message"].as_str().is_some_and(|message| !message.is_empty()));
    });
}

#[test]
fn recommend_reads_json_input_file() {
    let (_dir, input) = write_input(GROCERY_INPUT);

    with_env(&[("BASKET_DATABASE_URL", "sqlite::memory:")], || {
        let result = recommend::run(
            "Milk",
            &MiningArgs {
                min_support: Some(0.3),
                min_threshold: Some(0.0),
                top_k: Some(2),
                input: Some(input.clone()),
                ..MiningArgs::default()
            },
        );
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["success"], true);
        assert_eq!(payload["item_id"], "Milk");
        let recommendations =
            payload["recommendations"].as_array().expect("recommendations should be an array");
        assert_eq!(recommendations.len(), 2);
        assert!(recommendations[0]["lift"].as_f64() >= recommendations[1]["lift"].as_f64());
    });
}

#[test]
fn recommend_unknown_item_is_a_diagnostic() {
    let (_dir, input) = write_input(GROCERY_INPUT);

    with_env(&[], || {
        let result = recommend::run(
            "Caviar",
            &MiningArgs {
                min_support: Some(0.3),
                input: Some(input.clone()),
                ..MiningArgs::default()
            },
        );
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["success"], false);
        assert_eq!(payload["recommendations"], serde_json::json!([]));
    });
}

#[test]
fn invalid_min_support_is_a_bad_request() {
    let (_dir, input) = write_input(GROCERY_INPUT);

    with_env(&[], || {
        let result = rules::run(&MiningArgs {
            min_support: Some(1.5),
            input: Some(input.clone()),
            ..MiningArgs::default()
        });
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "bad_request");
    });
}

#[test]
fn malformed_input_file_is_reported() {
    let (_dir, input) = write_input("{\"not\": \"an array\"}");

    with_env(&[], || {
        let result = rules::run(&MiningArgs { input: Some(input.clone()), ..MiningArgs::default() });
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "input");
    });
}

#[test]
fn doctor_json_reports_all_checks() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("basket.db").display());

    with_env(&[("BASKET_DATABASE_URL", url.as_str())], || {
        assert_eq!(migrate::run().exit_code, 0, "migrate before doctor");

        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "doctor should pass: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks should be an array")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(names, vec!["config_validation", "database_connectivity", "invoice_schema"]);
    });
}

#[test]
fn doctor_reports_pending_migrations_without_applying_them() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("basket.db").display());

    with_env(&[("BASKET_DATABASE_URL", url.as_str())], || {
        for _ in 0..2 {
            let result = doctor::run(true);
            assert_eq!(result.exit_code, 1, "unmigrated database should fail doctor");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["overall_status"], "fail");
            assert_eq!(payload["checks"][1]["status"], "pass");
            assert_eq!(payload["checks"][2]["name"], "invoice_schema");
            assert_eq!(payload["checks"][2]["status"], "fail");
            assert_eq!(
                payload["checks"][2]["details"],
                "1 pending migration(s); run `basket migrate`"
            );
        }

        assert_eq!(migrate::run().exit_code, 0);
        assert_eq!(doctor::run(true).exit_code, 0, "doctor should pass once migrated");
    });
}

#[test]
fn doctor_skips_database_checks_when_config_invalid() {
    with_env(&[("BASKET_MINING_TOP_K", "0")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
    });
}

fn write_input(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("records.json");
    fs::write(&path, contents).expect("write input file");
    (dir, path)
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BASKET_DATABASE_URL",
        "BASKET_DATABASE_MAX_CONNECTIONS",
        "BASKET_DATABASE_TIMEOUT_SECS",
        "BASKET_MINING_MIN_SUPPORT",
        "BASKET_MINING_METRIC",
        "BASKET_MINING_MIN_THRESHOLD",
        "BASKET_MINING_TOP_K",
        "BASKET_MINING_MAX_ITEMSET_LEN",
        "BASKET_MINING_MAX_CANDIDATES",
        "BASKET_MINING_DEADLINE_MS",
        "BASKET_MINING_CACHE_ENABLED",
        "BASKET_SERVER_BIND_ADDRESS",
        "BASKET_SERVER_PORT",
        "BASKET_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "BASKET_LOGGING_LEVEL",
        "BASKET_LOGGING_FORMAT",
        "BASKET_LOG_LEVEL",
        "BASKET_LOG_FORMAT",
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
