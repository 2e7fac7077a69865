//! Configuration management for flowsync
//!
//! Configuration is loaded either from a YAML file or from environment
//! variables, then validated once at startup. The resulting value is passed
//! explicitly into every component that needs it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Tag holding the batch number inside each snapshot
pub const DEFAULT_BATCH_TAG: &str = "LM_RUN1!RUN1_BATCH_NR_PRV";

/// Highest `METER_<n>_*` index read from the environment
pub const MAX_METERS: usize = 16;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Ship/fleet identifier attached to every upload
    #[serde(default)]
    pub ship_name: String,

    /// Remote aggregation service
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Configured instrument sources
    #[serde(default)]
    pub meters: Vec<MeterConfig>,

    /// Polling behaviour
    #[serde(default)]
    pub polling: PollingConfig,

    /// Retry behaviour shared by both syncers
    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-call HTTP timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Report syncer settings
    #[serde(default)]
    pub reports: ReportConfig,

    /// HTTP front-end configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Uses the same variable names as [`Config::from_env`]. Values are
    /// trimmed and empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Config::default();

        if let Some(ship) = get("SHIP_NAME") {
            config.ship_name = ship;
        }
        if let Some(url) = get("REMOTE_API_URL") {
            config.remote.api_url = url;
        }
        if let Some(url) = get("REMOTE_API_URL_BATCH") {
            config.remote.batch_url = url;
        }
        if let Some(token) = get("REMOTE_API_TOKEN") {
            config.remote.token = token;
        }
        config.remote.ticket_url = get("REPORT_TICKET_API_URL");

        if let Some(filter) = get("REPORT_FILTER") {
            config.reports.filter = filter;
        }

        if let Some(ms) = get("POLL_INTERVAL_MS") {
            config.polling.interval_ms = parse_number("POLL_INTERVAL_MS", &ms)?;
        }
        if let Some(size) = get("BATCH_SIZE") {
            config.polling.page_size = parse_number("BATCH_SIZE", &size)?;
        }
        if let Some(tag) = get("BATCH_TAG") {
            config.polling.batch_tag = tag;
        }
        if let Some(retries) = get("MAX_RETRIES") {
            config.retry.max_attempts = parse_number("MAX_RETRIES", &retries)?;
        }
        if let Some(delay) = get("RETRY_DELAY_SECONDS") {
            config.retry.delay_secs = parse_number("RETRY_DELAY_SECONDS", &delay)?;
        }
        if let Some(secs) = get("TIMEOUT_SECONDS_LOCAL") {
            config.timeouts.local_secs = parse_number("TIMEOUT_SECONDS_LOCAL", &secs)?;
        }
        if let Some(secs) = get("TIMEOUT_SECONDS_REMOTE") {
            config.timeouts.remote_secs = parse_number("TIMEOUT_SECONDS_REMOTE", &secs)?;
        }
        if let Some(secs) = get("TIMEOUT_SECONDS_PROBE") {
            config.timeouts.probe_secs = parse_number("TIMEOUT_SECONDS_PROBE", &secs)?;
        }

        if let Some(host) = get("HOST") {
            config.server.host = host;
        }
        if let Some(port) = get("PORT") {
            config.server.port = parse_number("PORT", &port)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = get("LOG_FORMAT") {
            config.logging.format = format;
        }

        // METER_1_* through METER_<MAX_METERS>_*; gaps are allowed
        for index in 1..=MAX_METERS {
            let id = get(&format!("METER_{}_ID", index));
            let url = get(&format!("METER_{}_LOCAL_API_URL", index));
            let archive = get(&format!("METER_{}_ARCHIVE_NAME", index));

            // Partially configured meters are ignored
            if let (Some(id), Some(local_api_url), Some(archive_name)) = (id, url, archive) {
                config.meters.push(MeterConfig {
                    id,
                    local_api_url,
                    archive_name,
                });
            }
        }

        Ok(config)
    }

    /// Check required values and cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ship_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired("ship_name".to_string()));
        }
        if self.remote.api_url.is_empty() {
            return Err(ConfigError::MissingRequired("remote.api_url".to_string()));
        }
        if self.remote.batch_url.is_empty() {
            return Err(ConfigError::MissingRequired("remote.batch_url".to_string()));
        }
        if self.remote.token.is_empty() {
            return Err(ConfigError::MissingRequired("remote.token".to_string()));
        }
        if self.meters.is_empty() {
            return Err(ConfigError::MissingRequired(
                "at least one meter must be configured".to_string(),
            ));
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "polling.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.polling.page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "polling.page_size must be greater than zero".to_string(),
            ));
        }

        check_url("remote.api_url", &self.remote.api_url)?;
        check_url("remote.batch_url", &self.remote.batch_url)?;
        if let Some(ticket_url) = &self.remote.ticket_url {
            check_url("remote.ticket_url", ticket_url)?;
        }

        let mut seen = HashSet::new();
        for meter in &self.meters {
            if meter.id.is_empty() || meter.archive_name.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "meter entries need an id and an archive name: {:?}",
                    meter
                )));
            }
            if !seen.insert(meter.id.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate meter id: {}",
                    meter.id
                )));
            }
            check_url(&format!("meters.{}.local_api_url", meter.id), &meter.local_api_url)?;
        }

        Ok(())
    }
}

/// Remote aggregation service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    /// Existence/count probe endpoint
    #[serde(default)]
    pub api_url: String,

    /// Batch upload endpoint
    #[serde(default)]
    pub batch_url: String,

    /// Bearer token sent with every remote call
    #[serde(default)]
    pub token: String,

    /// Report ticket endpoint; the report syncer is disabled when unset
    #[serde(default)]
    pub ticket_url: Option<String>,
}

/// A single instrument source (meter)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeterConfig {
    /// Meter identifier sent to the remote service
    pub id: String,

    /// Base URL of the meter's local archive API
    pub local_api_url: String,

    /// Archive name used to scope snapshot queries
    pub archive_name: String,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Interval between scheduled cycles in milliseconds
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Number of snapshots requested per archive page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Snapshot tag carrying the batch number
    #[serde(default = "default_batch_tag")]
    pub batch_tag: String,
}

impl PollingConfig {
    /// Interval between scheduled cycles
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            page_size: default_page_size(),
            batch_tag: default_batch_tag(),
        }
    }
}

fn default_interval() -> u64 {
    900_000 // 15 minutes
}

fn default_page_size() -> usize {
    100
}

fn default_batch_tag() -> String {
    DEFAULT_BATCH_TAG.to_string()
}

/// Retry configuration for a whole sync run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_retry_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    10
}

/// Per-call HTTP timeouts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutConfig {
    /// Calls to a meter's local archive
    #[serde(default = "default_local_timeout")]
    pub local_secs: u64,

    /// Uploads to the remote service
    #[serde(default = "default_remote_timeout")]
    pub remote_secs: u64,

    /// Existence probes against the remote service
    #[serde(default = "default_local_timeout")]
    pub probe_secs: u64,
}

impl TimeoutConfig {
    pub fn local(&self) -> Duration {
        Duration::from_secs(self.local_secs)
    }

    pub fn remote(&self) -> Duration {
        Duration::from_secs(self.remote_secs)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            local_secs: default_local_timeout(),
            remote_secs: default_remote_timeout(),
            probe_secs: default_local_timeout(),
        }
    }
}

fn default_local_timeout() -> u64 {
    30
}

fn default_remote_timeout() -> u64 {
    300
}

/// Report syncer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Glob-like filter passed to the report listing
    #[serde(default = "default_report_filter")]
    pub filter: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            filter: default_report_filter(),
        }
    }
}

fn default_report_filter() -> String {
    "*Mass*".to_string()
}

/// HTTP front-end configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} must be a number, got {:?}", key, value)))
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    reqwest::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidValue(format!("{} is not a valid URL: {}", field, e)))
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid_config() -> Config {
        Config {
            ship_name: "MV Example".to_string(),
            remote: RemoteConfig {
                api_url: "https://remote.example.com/api/snapshots".to_string(),
                batch_url: "https://remote.example.com/api/snapshots/batch".to_string(),
                token: "secret".to_string(),
                ticket_url: None,
            },
            meters: vec![MeterConfig {
                id: "M1".to_string(),
                local_api_url: "http://10.0.0.5:8080".to_string(),
                archive_name: "Main".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_complete_yaml_config() {
        let yaml = r#"
ship_name: "MV Example"
remote:
  api_url: "https://remote.example.com/api/snapshots"
  batch_url: "https://remote.example.com/api/snapshots/batch"
  token: "secret"
  ticket_url: "https://remote.example.com/api/tickets"
meters:
  - id: "M1"
    local_api_url: "http://10.0.0.5:8080"
    archive_name: "Main"
  - id: "M2"
    local_api_url: "http://10.0.0.6:8080/"
    archive_name: "Aux"
polling:
  interval_ms: 60000
  page_size: 50
retry:
  max_attempts: 5
  delay_secs: 2
timeouts:
  local_secs: 10
  remote_secs: 120
reports:
  filter: "*Prover*"
server:
  host: "127.0.0.1"
  port: 9090
logging:
  level: "debug"
  format: "pretty"
"#;

        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.ship_name, "MV Example");
        assert_eq!(
            config.remote.ticket_url,
            Some("https://remote.example.com/api/tickets".to_string())
        );
        assert_eq!(config.meters.len(), 2);
        assert_eq!(config.meters[1].archive_name, "Aux");
        assert_eq!(config.polling.interval_ms, 60_000);
        assert_eq!(config.polling.page_size, 50);
        assert_eq!(config.polling.batch_tag, DEFAULT_BATCH_TAG);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_secs, 2);
        assert_eq!(config.timeouts.local_secs, 10);
        assert_eq!(config.timeouts.remote_secs, 120);
        assert_eq!(config.timeouts.probe_secs, 30);
        assert_eq!(config.reports.filter, "*Prover*");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values_applied() {
        let config = Config::from_yaml("{}").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.polling.interval_ms, 900_000);
        assert_eq!(config.polling.page_size, 100);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_secs, 10);
        assert_eq!(config.timeouts.local_secs, 30);
        assert_eq!(config.timeouts.remote_secs, 300);
        assert_eq!(config.reports.filter, "*Mass*");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("FLOWSYNC_TEST_TOKEN", "env_secret");

        let yaml = r#"
remote:
  token: "${FLOWSYNC_TEST_TOKEN}"
  api_url: "${FLOWSYNC_TEST_UNSET_VAR}"
"#;

        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.remote.token, "env_secret");
        // Unknown variables are left untouched
        assert_eq!(config.remote.api_url, "${FLOWSYNC_TEST_UNSET_VAR}");

        std::env::remove_var("FLOWSYNC_TEST_TOKEN");
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let lookup = lookup_from(&[
            ("SHIP_NAME", " MV Example "),
            ("REMOTE_API_URL", "https://remote/api"),
            ("REMOTE_API_URL_BATCH", "https://remote/api/batch"),
            ("REMOTE_API_TOKEN", "tok"),
            ("POLL_INTERVAL_MS", "60000"),
            ("BATCH_SIZE", "25"),
            ("MAX_RETRIES", "4"),
            ("RETRY_DELAY_SECONDS", "1"),
            ("TIMEOUT_SECONDS_LOCAL", "5"),
            ("TIMEOUT_SECONDS_REMOTE", "50"),
            ("PORT", "8081"),
            ("METER_1_ID", "M1"),
            ("METER_1_LOCAL_API_URL", "http://m1"),
            ("METER_1_ARCHIVE_NAME", "A1"),
            ("METER_2_ID", "M2"),
            ("METER_2_LOCAL_API_URL", "http://m2"),
            ("METER_2_ARCHIVE_NAME", "A2"),
        ]);

        let config = Config::from_lookup(lookup).unwrap();

        assert_eq!(config.ship_name, "MV Example");
        assert_eq!(config.remote.ticket_url, None);
        assert_eq!(config.polling.interval_ms, 60_000);
        assert_eq!(config.polling.page_size, 25);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.delay_secs, 1);
        assert_eq!(config.timeouts.local_secs, 5);
        assert_eq!(config.timeouts.remote_secs, 50);
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.meters.len(), 2);
        assert_eq!(config.meters[0].id, "M1");
        assert_eq!(config.meters[1].archive_name, "A2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_meters_past_a_gap() {
        let lookup = lookup_from(&[
            ("METER_2_ID", "M2"),
            ("METER_2_LOCAL_API_URL", "http://m2"),
            ("METER_2_ARCHIVE_NAME", "A2"),
            ("METER_5_ID", "M5"),
            ("METER_5_LOCAL_API_URL", "http://m5"),
            ("METER_5_ARCHIVE_NAME", "A5"),
        ]);

        let config = Config::from_lookup(lookup).unwrap();

        let ids: Vec<&str> = config.meters.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["M2", "M5"]);
    }

    #[test]
    fn test_from_lookup_keeps_millisecond_interval() {
        let lookup = lookup_from(&[("POLL_INTERVAL_MS", "1500")]);

        let config = Config::from_lookup(lookup).unwrap();

        assert_eq!(config.polling.interval_ms, 1500);
        assert_eq!(config.polling.interval(), Duration::from_millis(1500));
    }

    #[test]
    fn test_from_lookup_skips_partial_meters() {
        let lookup = lookup_from(&[
            ("METER_1_ID", "M1"),
            ("METER_1_LOCAL_API_URL", "http://m1"),
            ("METER_2_ID", "M2"),
            ("METER_2_LOCAL_API_URL", "http://m2"),
            ("METER_2_ARCHIVE_NAME", "A2"),
        ]);

        let config = Config::from_lookup(lookup).unwrap();

        assert_eq!(config.meters.len(), 1);
        assert_eq!(config.meters[0].id, "M2");
    }

    #[test]
    fn test_from_lookup_rejects_non_numeric_values() {
        let lookup = lookup_from(&[("BATCH_SIZE", "lots")]);

        match Config::from_lookup(lookup) {
            Err(ConfigError::InvalidValue(msg)) => assert!(msg.contains("BATCH_SIZE")),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_invalid_yaml() {
        let yaml = r#"
server:
  port: "not_a_number"
"#;

        match Config::from_yaml(yaml) {
            Err(ConfigError::Parse(msg)) => assert!(msg.contains("Failed to parse YAML")),
            other => panic!("Expected ConfigError::Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_requires_meters() {
        let config = Config {
            meters: vec![],
            ..valid_config()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingRequired(
                "at least one meter must be configured".to_string()
            ))
        );
    }

    #[test]
    fn test_validate_requires_remote_fields() {
        let mut config = valid_config();
        config.remote.token = String::new();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingRequired("remote.token".to_string()))
        );

        let mut config = valid_config();
        config.ship_name = "  ".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingRequired("ship_name".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_meter_ids() {
        let mut config = valid_config();
        let duplicate = config.meters[0].clone();
        config.meters.push(duplicate);

        match config.validate() {
            Err(ConfigError::InvalidValue(msg)) => assert!(msg.contains("duplicate meter id")),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = valid_config();
        config.remote.ticket_url = Some("not a url".to_string());

        match config.validate() {
            Err(ConfigError::InvalidValue(msg)) => assert!(msg.contains("remote.ticket_url")),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = valid_config();
        config.polling.page_size = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = valid_config();
        config.polling.interval_ms = 0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = valid_config();

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(config, parsed);
    }
}
