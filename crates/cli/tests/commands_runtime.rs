use std::env;
use std::sync::{Mutex, OnceLock};

use brewline_cli::commands::track::TrackArgs;
use brewline_cli::commands::{defaults, migrate, overrides, purge, seed, settings, suggest, track};
use brewline_core::{AutoStrategy, OverrideType, SettingsUpdate};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("BREWLINE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_timeout() {
    with_env(
        &[
            ("BREWLINE_DATABASE_URL", "sqlite::memory:"),
            ("BREWLINE_SUGGESTIONS_STRATEGY_TIMEOUT_MS", "0"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_database(|| {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["message"], second_payload["message"]);
        assert_eq!(
            first_payload["message"],
            "demo cafe seeded: 10 products, 3 orders, defaults [croissant, cold-brew, chai-latte]"
        );
    });
}

#[test]
fn suggest_serves_guest_defaults_and_personalized_results() {
    with_database(|| {
        assert_eq!(seed::run().exit_code, 0);

        let guest = parse_payload(&suggest::run(None).output);
        assert_eq!(guest["status"], "ok");
        assert_eq!(guest["data"]["isPersonalized"], false);
        assert_eq!(suggestion_ids(&guest), vec!["croissant", "cold-brew", "chai-latte"]);

        let ana = parse_payload(&suggest::run(Some("user-ana".to_string())).output);
        assert_eq!(ana["data"]["isPersonalized"], true);
        assert_eq!(suggestion_ids(&ana), vec!["flat-white", "cold-brew", "matcha-latte"]);
    });
}

#[test]
fn tracked_search_feeds_search_history_strategy() {
    with_database(|| {
        assert_eq!(seed::run().exit_code, 0);
        let updated = settings::set(SettingsUpdate {
            auto_enabled: None,
            auto_strategy: Some(AutoStrategy::SearchHistory),
        });
        assert_eq!(parse_payload(&updated.output)["data"]["auto_strategy"], "searchHistory");

        let tracked = track::run(TrackArgs {
            user: Some("user-cara".to_string()),
            query: "  Croissant ".to_string(),
            tags: Vec::new(),
            product: None,
        });
        assert_eq!(tracked.exit_code, 0, "{}", tracked.output);
        assert_eq!(parse_payload(&tracked.output)["data"]["query"], "croissant");

        let cara = parse_payload(&suggest::run(Some("user-cara".to_string())).output);
        assert_eq!(suggestion_ids(&cara), vec!["croissant", "almond-croissant", "cold-brew"]);
    });
}

#[test]
fn blank_search_is_a_validation_failure() {
    with_database(|| {
        let result = track::run(TrackArgs {
            user: Some("user-cara".to_string()),
            query: "   ".to_string(),
            tags: vec!["iced".to_string()],
            product: None,
        });

        assert_eq!(result.exit_code, 7);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "track");
        assert_eq!(payload["error_class"], "validation");
    });
}

#[test]
fn defaults_set_rejects_short_lists_and_keeps_state() {
    with_database(|| {
        assert_eq!(seed::run().exit_code, 0);

        let rejected = defaults::set(vec!["espresso".to_string(), "espresso".to_string()]);
        assert_eq!(rejected.exit_code, 7);
        assert_eq!(parse_payload(&rejected.output)["error_class"], "validation");

        let shown = parse_payload(&defaults::show().output);
        assert_eq!(suggestion_ids(&shown), vec!["croissant", "cold-brew", "chai-latte"]);

        let replaced = defaults::set(
            ["banana-bread", "espresso", "avocado-toast", "flat-white"].map(String::from).to_vec(),
        );
        assert_eq!(replaced.exit_code, 0);
        let guest = parse_payload(&suggest::run(None).output);
        assert_eq!(suggestion_ids(&guest), vec!["banana-bread", "espresso", "avocado-toast"]);
    });
}

#[test]
fn override_lifecycle_round_trips_through_commands() {
    with_database(|| {
        assert_eq!(seed::run().exit_code, 0);

        let assigned = overrides::set(
            "user-ben".to_string(),
            ["avocado-toast", "banana-bread", "cold-brew"].map(String::from).to_vec(),
            OverrideType::Manual,
        );
        assert_eq!(assigned.exit_code, 0, "{}", assigned.output);

        let listed = parse_payload(&overrides::list().output);
        assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
        assert_eq!(listed["data"][0]["userId"], "user-ben");
        assert_eq!(listed["data"][0]["overrideType"], "manual");

        let ben = parse_payload(&suggest::run(Some("user-ben".to_string())).output);
        assert_eq!(suggestion_ids(&ben), vec!["avocado-toast", "banana-bread", "cold-brew"]);

        let cleared = parse_payload(&overrides::clear("user-ben".to_string()).output);
        assert_eq!(cleared["data"]["removed"], true);
        let again = parse_payload(&overrides::clear("user-ben".to_string()).output);
        assert_eq!(again["status"], "ok");
        assert_eq!(again["data"]["removed"], false);
    });
}

#[test]
fn settings_show_reports_seeded_policy() {
    with_database(|| {
        assert_eq!(seed::run().exit_code, 0);

        let payload = parse_payload(&settings::show().output);
        assert_eq!(payload["data"]["auto_enabled"], true);
        assert_eq!(payload["data"]["auto_strategy"], "hybrid");
    });
}

#[test]
fn purge_history_succeeds_on_empty_log() {
    with_database(|| {
        let payload = parse_payload(&purge::run().output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "purged 0 expired search history entries");
    });
}

fn suggestion_ids(payload: &Value) -> Vec<String> {
    payload["data"]["suggestions"]
        .as_array()
        .map(|products| {
            products
                .iter()
                .filter_map(|product| product["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

/// Runs `test_fn` against a fresh file database; every command opens its own pool.
fn with_database(test_fn: impl FnOnce()) {
    let dir = TempDir::new().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("brewline.db").display());
    with_env(&[("BREWLINE_DATABASE_URL", url.as_str())], test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BREWLINE_DATABASE_URL",
        "BREWLINE_DATABASE_MAX_CONNECTIONS",
        "BREWLINE_DATABASE_TIMEOUT_SECS",
        "BREWLINE_SERVER_BIND_ADDRESS",
        "BREWLINE_SERVER_HEALTH_CHECK_PORT",
        "BREWLINE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "BREWLINE_SUGGESTIONS_STRATEGY_TIMEOUT_MS",
        "BREWLINE_SUGGESTIONS_HISTORY_PURGE_INTERVAL_SECS",
        "BREWLINE_LOGGING_LEVEL",
        "BREWLINE_LOGGING_FORMAT",
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
