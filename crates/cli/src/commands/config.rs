use std::env;
use std::fs;
use std::path::Path;

use brewline_core::config::{discover_config_file, AppConfig, LoadOptions};
use toml::Value;

/// (key path, env var) for every field shown by `brewline config`.
const FIELDS: &[(&str, &str)] = &[
    ("database.url", "BREWLINE_DATABASE_URL"),
    ("database.max_connections", "BREWLINE_DATABASE_MAX_CONNECTIONS"),
    ("database.timeout_secs", "BREWLINE_DATABASE_TIMEOUT_SECS"),
    ("server.bind_address", "BREWLINE_SERVER_BIND_ADDRESS"),
    ("server.health_check_port", "BREWLINE_SERVER_HEALTH_CHECK_PORT"),
    ("server.graceful_shutdown_secs", "BREWLINE_SERVER_GRACEFUL_SHUTDOWN_SECS"),
    ("suggestions.strategy_timeout_ms", "BREWLINE_SUGGESTIONS_STRATEGY_TIMEOUT_MS"),
    (
        "suggestions.history_purge_interval_secs",
        "BREWLINE_SUGGESTIONS_HISTORY_PURGE_INTERVAL_SECS",
    ),
    ("logging.level", "BREWLINE_LOGGING_LEVEL"),
    ("logging.format", "BREWLINE_LOGGING_FORMAT"),
];

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = discover_config_file();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key) in FIELDS {
        lines.push(render_line(
            key_path,
            &field_value(&config, key_path),
            field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    lines.join("\n")
}

fn field_value(config: &AppConfig, key_path: &str) -> String {
    match key_path {
        "database.url" => config.database.url.clone(),
        "database.max_connections" => config.database.max_connections.to_string(),
        "database.timeout_secs" => config.database.timeout_secs.to_string(),
        "server.bind_address" => config.server.bind_address.clone(),
        "server.health_check_port" => config.server.health_check_port.to_string(),
        "server.graceful_shutdown_secs" => config.server.graceful_shutdown_secs.to_string(),
        "suggestions.strategy_timeout_ms" => config.suggestions.strategy_timeout_ms.to_string(),
        "suggestions.history_purge_interval_secs" => {
            config.suggestions.history_purge_interval_secs.to_string()
        }
        "logging.level" => config.logging.level.clone(),
        "logging.format" => format!("{:?}", config.logging.format),
        _ => "<unknown>".to_string(),
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
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
