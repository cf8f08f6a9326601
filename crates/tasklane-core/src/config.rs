//! Config - 設定ファイル（TOML）の読み込みと検証
//!
//! Resolution order: explicit path, `TASKLANE_CONFIG`, then the search paths
//! (`./tasklane.toml`, `/etc/tasklane/tasklane.toml`). Values may reference
//! the environment as `${VAR}`, `${VAR:-default}` or `${VAR:?message}`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::{LanePolicy, TopicRoutes};
use crate::impls::RetryPolicy;
use crate::impls::http::parse_http_url;
use crate::ports::Position;

pub const CONFIG_ENV: &str = "TASKLANE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (set TASKLANE_CONFIG or pass --config)")]
    NotFound,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment substitution failed: {0}")]
    EnvSubstitution(String),

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub task_api: TaskApiConfig,
    pub archive_api: ArchiveApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
    /// Required: there is no implicit in-memory ledger.
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskApiConfig {
    pub base_url: String,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_task_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveApiConfig {
    /// GraphQL endpoint.
    pub endpoint: String,
    #[serde(default = "default_archive_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerConfig {
    #[serde(default = "default_create_topic")]
    pub create_topic: String,
    #[serde(default = "default_update_topic")]
    pub update_topic: String,
    /// Positions acknowledged without processing.
    #[serde(default)]
    pub skip_positions: Vec<Position>,
    #[serde(default)]
    pub dead_letter_after: Option<u32>,
    #[serde(default)]
    pub dead_letter_path: Option<PathBuf>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            create_topic: default_create_topic(),
            update_topic: default_update_topic(),
            skip_positions: Vec::new(),
            dead_letter_after: None,
            dead_letter_path: None,
        }
    }
}

impl ConsumerConfig {
    pub fn routes(&self) -> TopicRoutes {
        TopicRoutes {
            create_topic: self.create_topic.clone(),
            update_topic: self.update_topic.clone(),
        }
    }
}

/// Where reconciliation markers are kept.
///
/// `memory` forgets every marker when the process exits and is only fit for
/// tests and dry runs; the reconcile command refuses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LedgerConfig {
    Memory,
    Dir {
        path: PathBuf,
    },
}

impl LedgerConfig {
    /// Survives a process restart.
    pub fn is_durable(&self) -> bool {
        !matches!(self, LedgerConfig::Memory)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconciliationConfig {
    /// Candidate document ids for the sweep.
    #[serde(default)]
    pub candidates: Vec<String>,
}

fn default_create_topic() -> String {
    TopicRoutes::default().create_topic
}

fn default_update_topic() -> String {
    TopicRoutes::default().update_topic
}

fn default_task_token_env() -> String {
    "TASK_API_TOKEN".to_string()
}

fn default_archive_token_env() -> String {
    "ARCHIVE_API_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    500
}

impl AppConfig {
    /// Parse (after env substitution) and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::from_toml_with(content, |name| std::env::var(name).ok())
    }

    fn from_toml_with(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let substituted = substitute_env_vars(content, lookup)?;
        let config: AppConfig = toml::from_str(&substituted)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("task_api.base_url", &self.task_api.base_url)?;
        validate_url("archive_api.endpoint", &self.archive_api.endpoint)?;

        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.consumer.create_topic == self.consumer.update_topic {
            return Err(invalid(
                "consumer.update_topic",
                "must differ from consumer.create_topic",
            ));
        }
        match (
            self.consumer.dead_letter_after,
            &self.consumer.dead_letter_path,
        ) {
            (Some(0), _) => {
                return Err(invalid("consumer.dead_letter_after", "must be at least 1"));
            }
            (Some(_), None) => {
                return Err(invalid(
                    "consumer.dead_letter_path",
                    "required when dead_letter_after is set",
                ));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.delay_ms),
        )
    }

    pub fn lane_policy(&self) -> LanePolicy {
        LanePolicy {
            skip_positions: self
                .consumer
                .skip_positions
                .iter()
                .cloned()
                .collect::<HashSet<_>>(),
            dead_letter_after: self.consumer.dead_letter_after,
        }
    }
}

fn validate_url(field: &'static str, url: &str) -> Result<(), ConfigError> {
    parse_http_url(url).map(drop).map_err(|message| invalid(field, message))
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

fn substitute_env_vars(
    content: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for cap in ENV_VAR.captures_iter(content) {
        let (Some(whole), Some(expr)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        out.push_str(&content[last..whole.start()]);
        out.push_str(&resolve_var(expr.as_str(), &lookup)?);
        last = whole.end();
    }
    out.push_str(&content[last..]);
    Ok(out)
}

fn resolve_var(
    expr: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    if let Some((name, default)) = expr.split_once(":-") {
        Ok(lookup(name).unwrap_or_else(|| default.to_string()))
    } else if let Some((name, message)) = expr.split_once(":?") {
        lookup(name).ok_or_else(|| {
            ConfigError::EnvSubstitution(format!("required variable {name} is not set: {message}"))
        })
    } else {
        lookup(expr).ok_or_else(|| {
            ConfigError::EnvSubstitution(format!("required variable {expr} is not set"))
        })
    }
}

/// Finds and loads the configuration file.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            search_paths: vec![
                PathBuf::from("./tasklane.toml"),
                PathBuf::from("/etc/tasklane/tasklane.toml"),
            ],
        }
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn load(&self, explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match std::env::var(CONFIG_ENV) {
                Ok(path) => PathBuf::from(path),
                Err(_) => self.find_config_file().ok_or(ConfigError::NotFound)?,
            },
        };
        self.load_file(&path)
    }

    pub fn load_file(&self, path: &Path) -> Result<AppConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        AppConfig::from_toml(&content)
    }

    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.is_file()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
        [task_api]
        base_url = "https://tasks.example/api/v1"

        [archive_api]
        endpoint = "https://archive.example/graphql"

        [ledger]
        kind = "dir"
        path = "/var/lib/tasklane/ledger"
    "#;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::from_toml_with(MINIMAL, env(&[])).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.task_api.token_env, "TASK_API_TOKEN");
        assert_eq!(config.consumer.routes(), TopicRoutes::default());
        assert!(config.ledger.is_durable());
        assert_eq!(config.consumer.dead_letter_after, None);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn full_config_with_env_substitution() {
        let content = r#"
            [task_api]
            base_url = "${TASK_URL}"
            token_env = "OPPGAVE_TOKEN"

            [archive_api]
            endpoint = "${ARCHIVE_URL:-https://archive.local/graphql}"

            [retry]
            max_attempts = 5
            delay_ms = 10

            [consumer]
            create_topic = "eessi-pensjon-oppgave-v1"
            update_topic = "eessi-pensjon-oppgave-endring"
            dead_letter_after = 3
            dead_letter_path = "/var/lib/tasklane/dead.jsonl"
            skip_positions = [
                { topic = "eessi-pensjon-oppgave-v1", partition = 0, offset = 17 },
            ]

            [ledger]
            kind = "dir"
            path = "/var/lib/tasklane/ledger"

            [reconciliation]
            candidates = ["645601988", "604920787"]
        "#;
        let config =
            AppConfig::from_toml_with(content, env(&[("TASK_URL", "https://tasks.example")]))
                .unwrap();

        assert_eq!(config.task_api.base_url, "https://tasks.example");
        assert_eq!(config.archive_api.endpoint, "https://archive.local/graphql");
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(
            config.ledger,
            LedgerConfig::Dir {
                path: PathBuf::from("/var/lib/tasklane/ledger")
            }
        );
        let policy = config.lane_policy();
        assert!(
            policy
                .skip_positions
                .contains(&Position::new("eessi-pensjon-oppgave-v1", 0, 17))
        );
        assert_eq!(policy.dead_letter_after, Some(3));
        assert_eq!(config.reconciliation.candidates.len(), 2);
    }

    #[test]
    fn missing_required_variable_fails() {
        let content = MINIMAL.replace("https://tasks.example/api/v1", "${NOT_SET:?task api url}");
        let err = AppConfig::from_toml_with(&content, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvSubstitution(msg) if msg.contains("task api url")));
    }

    #[test]
    fn ledger_section_is_required() {
        let content = r#"
            [task_api]
            base_url = "https://tasks.example"

            [archive_api]
            endpoint = "https://archive.example/graphql"
        "#;
        let err = AppConfig::from_toml_with(content, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("ledger"));

        let memory = format!("{content}
[ledger]
kind = \"memory\"\n");
        let config = AppConfig::from_toml_with(&memory, env(&[])).unwrap();
        assert!(!config.ledger.is_durable());
    }

    #[test]
    fn rejects_zero_attempts() {
        let content = format!("{MINIMAL}\n[retry]\nmax_attempts = 0\n");
        let err = AppConfig::from_toml_with(&content, env(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "retry.max_attempts",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_http_urls() {
        let content = MINIMAL.replace("https://tasks.example/api/v1", "tasks.example");
        let err = AppConfig::from_toml_with(&content, env(&[])).unwrap_err();
        assert!(err.to_string().contains("task_api.base_url"));
    }

    #[test]
    fn rejects_urls_that_do_not_parse() {
        let content = MINIMAL
            .replace("https://tasks.example/api/v1", "https://tasks example/api")
            .replace("https://archive.example/graphql", "http://:notaport");
        let err = AppConfig::from_toml_with(&content, env(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "task_api.base_url",
                ..
            }
        ));

        let content = MINIMAL.replace("https://archive.example/graphql", "http://:notaport");
        let err = AppConfig::from_toml_with(&content, env(&[])).unwrap_err();
        assert!(err.to_string().contains("archive_api.endpoint"));
    }

    #[test]
    fn dead_letter_threshold_needs_a_path() {
        let content = format!("{MINIMAL}\n[consumer]\ndead_letter_after = 2\n");
        let err = AppConfig::from_toml_with(&content, env(&[])).unwrap_err();
        assert!(err.to_string().contains("dead_letter_path"));
    }

    #[test]
    fn loads_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasklane.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let loader = ConfigLoader::with_search_paths(vec![]);
        let config = loader.load(Some(&path)).unwrap();
        assert_eq!(config.archive_api.timeout_secs, 30);

        let missing = loader.load_file(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
