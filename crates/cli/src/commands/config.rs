use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use basket_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "BASKET_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "BASKET_DATABASE_MAX_CONNECTIONS",
        ),
        ("database.timeout_secs", config.database.timeout_secs.to_string(), "BASKET_DATABASE_TIMEOUT_SECS"),
        ("mining.min_support", config.mining.min_support.to_string(), "BASKET_MINING_MIN_SUPPORT"),
        ("mining.metric", config.mining.metric.to_string(), "BASKET_MINING_METRIC"),
        ("mining.min_threshold", config.mining.min_threshold.to_string(), "BASKET_MINING_MIN_THRESHOLD"),
        ("mining.top_k", config.mining.top_k.to_string(), "BASKET_MINING_TOP_K"),
        (
            "mining.max_itemset_len",
            unbounded_when_zero(config.mining.max_itemset_len as u64),
            "BASKET_MINING_MAX_ITEMSET_LEN",
        ),
        ("mining.max_candidates", config.mining.max_candidates.to_string(), "BASKET_MINING_MAX_CANDIDATES"),
        ("mining.deadline_ms", unbounded_when_zero(config.mining.deadline_ms), "BASKET_MINING_DEADLINE_MS"),
        ("mining.cache_enabled", config.mining.cache_enabled.to_string(), "BASKET_MINING_CACHE_ENABLED"),
        ("server.bind_address", config.server.bind_address.clone(), "BASKET_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "BASKET_SERVER_PORT"),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            "BASKET_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        ("logging.level", config.logging.level.clone(), "BASKET_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "BASKET_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in fields {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn unbounded_when_zero(value: u64) -> String {
    if value == 0 {
        "0 (unbounded)".to_string()
    } else {
        value.to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("basket.toml"), PathBuf::from("config/basket.toml")]
        .into_iter()
        .find(|path| path.exists())
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

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, unbounded_when_zero};

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: Value = "[mining]\nmin_support = 0.2\n".parse().expect("toml should parse");
        assert!(contains_path(&doc, "mining.min_support"));
        assert!(!contains_path(&doc, "mining.top_k"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn zero_limits_render_as_unbounded() {
        assert_eq!(unbounded_when_zero(0), "0 (unbounded)");
        assert_eq!(unbounded_when_zero(250), "250");
    }
}
