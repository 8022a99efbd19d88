use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::rule::RuleMetric;
use crate::mining::{
    MiningLimits, MiningParams, DEFAULT_MAX_CANDIDATES, DEFAULT_MIN_SUPPORT, DEFAULT_MIN_THRESHOLD,
    DEFAULT_TOP_K,
};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub mining: MiningConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Defaults for every mining run; request parameters override them per call.
#[derive(Clone, Debug, PartialEq)]
pub struct MiningConfig {
    pub min_support: f64,
    pub metric: RuleMetric,
    pub min_threshold: f64,
    pub top_k: usize,
    /// 0 = unbounded
    pub max_itemset_len: usize,
    pub max_candidates: usize,
    /// 0 = no deadline
    pub deadline_ms: u64,
    pub cache_enabled: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
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
    pub min_support: Option<f64>,
    pub metric: Option<RuleMetric>,
    pub min_threshold: Option<f64>,
    pub top_k: Option<usize>,
    pub port: Option<u16>,
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
                url: "sqlite://basket.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            mining: MiningConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
            metric: RuleMetric::Lift,
            min_threshold: DEFAULT_MIN_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            max_itemset_len: 0,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            deadline_ms: 10_000,
            cache_enabled: false,
        }
    }
}

impl MiningConfig {
    pub fn limits(&self) -> MiningLimits {
        let mut limits = MiningLimits::unbounded().with_max_candidates(self.max_candidates);
        if self.max_itemset_len > 0 {
            limits = limits.with_max_itemset_len(self.max_itemset_len);
        }
        if self.deadline_ms > 0 {
            limits = limits.with_time_budget(Duration::from_millis(self.deadline_ms));
        }
        limits
    }

    pub fn to_params(&self) -> MiningParams {
        MiningParams::new()
            .with_min_support(self.min_support)
            .with_metric(self.metric)
            .with_min_threshold(self.min_threshold)
            .with_top_k(self.top_k)
            .with_limits(self.limits())
    }
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("basket.toml"));
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

        if let Some(mining) = patch.mining {
            if let Some(min_support) = mining.min_support {
                self.mining.min_support = min_support;
            }
            if let Some(metric) = mining.metric {
                self.mining.metric = metric;
            }
            if let Some(min_threshold) = mining.min_threshold {
                self.mining.min_threshold = min_threshold;
            }
            if let Some(top_k) = mining.top_k {
                self.mining.top_k = top_k;
            }
            if let Some(max_itemset_len) = mining.max_itemset_len {
                self.mining.max_itemset_len = max_itemset_len;
            }
            if let Some(max_candidates) = mining.max_candidates {
                self.mining.max_candidates = max_candidates;
            }
            if let Some(deadline_ms) = mining.deadline_ms {
                self.mining.deadline_ms = deadline_ms;
            }
            if let Some(cache_enabled) = mining.cache_enabled {
                self.mining.cache_enabled = cache_enabled;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("BASKET_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BASKET_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("BASKET_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BASKET_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BASKET_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BASKET_MINING_MIN_SUPPORT") {
            self.mining.min_support = parse_f64("BASKET_MINING_MIN_SUPPORT", &value)?;
        }
        if let Some(value) = read_env("BASKET_MINING_METRIC") {
            self.mining.metric = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "BASKET_MINING_METRIC".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = read_env("BASKET_MINING_MIN_THRESHOLD") {
            self.mining.min_threshold = parse_f64("BASKET_MINING_MIN_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("BASKET_MINING_TOP_K") {
            self.mining.top_k = parse_usize("BASKET_MINING_TOP_K", &value)?;
        }
        if let Some(value) = read_env("BASKET_MINING_MAX_ITEMSET_LEN") {
            self.mining.max_itemset_len = parse_usize("BASKET_MINING_MAX_ITEMSET_LEN", &value)?;
        }
        if let Some(value) = read_env("BASKET_MINING_MAX_CANDIDATES") {
            self.mining.max_candidates = parse_usize("BASKET_MINING_MAX_CANDIDATES", &value)?;
        }
        if let Some(value) = read_env("BASKET_MINING_DEADLINE_MS") {
            self.mining.deadline_ms = parse_u64("BASKET_MINING_DEADLINE_MS", &value)?;
        }
        if let Some(value) = read_env("BASKET_MINING_CACHE_ENABLED") {
            self.mining.cache_enabled = parse_bool("BASKET_MINING_CACHE_ENABLED", &value)?;
        }

        if let Some(value) = read_env("BASKET_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BASKET_SERVER_PORT") {
            self.server.port = parse_u16("BASKET_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("BASKET_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BASKET_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("BASKET_LOGGING_LEVEL").or_else(|| read_env("BASKET_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BASKET_LOGGING_FORMAT").or_else(|| read_env("BASKET_LOG_FORMAT"));
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
        if let Some(min_support) = overrides.min_support {
            self.mining.min_support = min_support;
        }
        if let Some(metric) = overrides.metric {
            self.mining.metric = metric;
        }
        if let Some(min_threshold) = overrides.min_threshold {
            self.mining.min_threshold = min_threshold;
        }
        if let Some(top_k) = overrides.top_k {
            self.mining.top_k = top_k;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_mining(&self.mining)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("basket.toml"), PathBuf::from("config/basket.toml")]
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

fn validate_mining(mining: &MiningConfig) -> Result<(), ConfigError> {
    if mining.max_candidates == 0 {
        return Err(ConfigError::Validation(
            "mining.max_candidates must be greater than zero".to_string(),
        ));
    }

    mining
        .to_params()
        .validate()
        .map_err(|error| ConfigError::Validation(format!("mining: {error}")))
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    mining: Option<MiningPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MiningPatch {
    min_support: Option<f64>,
    metric: Option<RuleMetric>,
    min_threshold: Option<f64>,
    top_k: Option<usize>,
    max_itemset_len: Option<usize>,
    max_candidates: Option<usize>,
    deadline_ms: Option<u64>,
    cache_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
