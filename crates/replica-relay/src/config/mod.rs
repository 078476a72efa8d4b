use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RelayError, Result};

/// Environment variable that overrides [`Config::mode`]
pub const MODE_ENV_VAR: &str = "REPLICA_RELAY_ENV";

/// Environment variable that overrides [`RelayConfig::upstream_url`]
pub const UPSTREAM_ENV_VAR: &str = "REPLICA_RELAY_UPSTREAM";

/// Main configuration structure for replica-relay
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Deployment mode (production vs everything else)
    #[serde(default)]
    pub mode: DeploymentMode,
    /// Binary forwarder configuration
    #[serde(default)]
    pub relay: RelayConfig,
    /// Agent/actor manager configuration
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Deployment mode flag.
///
/// Production means a strict origin allow-list, no root-key bootstrap, and
/// clients that talk to the upstream directly. Every other mode is permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    Production,
    #[default]
    Development,
}

impl DeploymentMode {
    /// Parse a mode flag. Only "production" (any case) is production.
    pub fn from_flag(flag: &str) -> Self {
        if flag.trim().eq_ignore_ascii_case("production") {
            DeploymentMode::Production
        } else {
            DeploymentMode::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == DeploymentMode::Production
    }
}

/// Binary forwarder configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Address to listen on (e.g., "127.0.0.1:4944")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// The single trusted replica base URL
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    /// Route the forwarder is mounted on
    #[serde(default = "default_proxy_path")]
    pub proxy_path: String,
    /// Origins that receive CORS headers in production mode
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Outbound request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            upstream_url: default_upstream_url(),
            proxy_path: default_proxy_path(),
            allowed_origins: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:4944".to_string()
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:4943".to_string()
}

fn default_proxy_path() -> String {
    "/api/ic-proxy".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Agent/actor manager configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Replica host clients talk to. Falls back to `relay.upstream_url`.
    #[serde(default)]
    pub host: Option<String>,
    /// Forwarder URL to route through outside production (e.g.
    /// "http://127.0.0.1:4944/api/ic-proxy")
    #[serde(default)]
    pub relay_url: Option<String>,
    /// Default deadline for `with_timeout`, in milliseconds
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Transport timeout for client requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Identity provider used by the login flow
    #[serde(default = "default_identity_provider")]
    pub identity_provider: String,
    /// Maximum session lifetime, in seconds
    #[serde(default = "default_max_time_to_live_secs")]
    pub max_time_to_live_secs: u64,
    /// Session idle timeout, in seconds
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: None,
            relay_url: None,
            call_timeout_ms: default_call_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            identity_provider: default_identity_provider(),
            max_time_to_live_secs: default_max_time_to_live_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl AgentConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_time_to_live(&self) -> Duration {
        Duration::from_secs(self.max_time_to_live_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_identity_provider() -> String {
    "https://identity.ic0.app".to_string()
}

fn default_max_time_to_live_secs() -> u64 {
    24 * 60 * 60
}

fn default_idle_timeout_secs() -> u64 {
    30 * 60
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RelayError::Config(format!("Failed to parse config: {e}")))
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Load from an explicit path, or the first default location that
    /// exists, or fall back to defaults. Environment overrides are applied
    /// last.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(path)?
            }
            None => match default_paths().into_iter().find(|p| p.exists()) {
                Some(path) => {
                    tracing::info!("Loading config from: {}", path.display());
                    Self::from_file(&path)?
                }
                None => {
                    tracing::info!("No config file found, using defaults");
                    Config::default()
                }
            },
        };

        config.apply_overrides(
            std::env::var(MODE_ENV_VAR).ok().as_deref(),
            std::env::var(UPSTREAM_ENV_VAR).ok().as_deref(),
        );
        Ok(config)
    }

    /// Apply mode and upstream overrides (normally taken from the environment)
    pub fn apply_overrides(&mut self, mode: Option<&str>, upstream: Option<&str>) {
        if let Some(flag) = mode {
            self.mode = DeploymentMode::from_flag(flag);
        }
        if let Some(url) = upstream.filter(|u| !u.is_empty()) {
            self.relay.upstream_url = url.to_string();
        }
    }

    /// Host the agent layer talks to
    pub fn agent_host(&self) -> &str {
        self.agent
            .host
            .as_deref()
            .unwrap_or(&self.relay.upstream_url)
    }
}

fn default_paths() -> Vec<PathBuf> {
    [
        dirs::home_dir().map(|h| h.join(".replica-relay").join("config.toml")),
        dirs::config_dir().map(|c| c.join("replica-relay").join("config.toml")),
        Some(PathBuf::from("config.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.mode, DeploymentMode::Development);
        assert_eq!(config.relay.listen_addr, "127.0.0.1:4944");
        assert_eq!(config.relay.upstream_url, "http://127.0.0.1:4943");
        assert_eq!(config.relay.proxy_path, "/api/ic-proxy");
        assert!(config.relay.allowed_origins.is_empty());
        assert_eq!(config.relay.timeout_secs, 30);
        assert!(config.agent.host.is_none());
        assert!(config.agent.relay_url.is_none());
        assert_eq!(config.agent.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.agent.max_time_to_live(), Duration::from_secs(86_400));
        assert_eq!(config.agent.idle_timeout(), Duration::from_secs(1_800));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
mode = "production"

[relay]
listen_addr = "0.0.0.0:8080"
upstream_url = "https://icp-api.io"
proxy_path = "/relay"
allowed_origins = ["https://app.example.org", "https://www.example.org"]
timeout_secs = 5

[agent]
host = "https://icp0.io"
call_timeout_ms = 2500
idle_timeout_secs = 60
"#;

        let config = Config::from_toml(toml_str).expect("Failed to parse TOML");

        assert!(config.mode.is_production());
        assert_eq!(config.relay.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.relay.upstream_url, "https://icp-api.io");
        assert_eq!(config.relay.proxy_path, "/relay");
        assert_eq!(config.relay.allowed_origins.len(), 2);
        assert_eq!(config.relay.timeout_secs, 5);
        assert_eq!(config.agent_host(), "https://icp0.io");
        assert_eq!(config.agent.call_timeout_ms, 2500);
        assert_eq!(config.agent.idle_timeout_secs, 60);
        // untouched field keeps its default
        assert_eq!(config.agent.max_time_to_live_secs, 86_400);
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[relay]
upstream_url = "http://localhost:8000"
"#;

        let config = Config::from_toml(toml_str).expect("Failed to parse partial TOML");

        assert_eq!(config.mode, DeploymentMode::Development);
        assert_eq!(config.relay.listen_addr, "127.0.0.1:4944");
        assert_eq!(config.agent_host(), "http://localhost:8000");
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let result = Config::from_toml("mode = \"staging\"");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_mode_flag_parsing() {
        assert_eq!(DeploymentMode::from_flag("production"), DeploymentMode::Production);
        assert_eq!(DeploymentMode::from_flag("PRODUCTION"), DeploymentMode::Production);
        assert_eq!(DeploymentMode::from_flag("development"), DeploymentMode::Development);
        assert_eq!(DeploymentMode::from_flag("staging"), DeploymentMode::Development);
        assert_eq!(DeploymentMode::from_flag(""), DeploymentMode::Development);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Some("production"), Some("https://icp-api.io"));
        assert!(config.mode.is_production());
        assert_eq!(config.relay.upstream_url, "https://icp-api.io");

        // empty upstream override is ignored
        config.apply_overrides(None, Some(""));
        assert_eq!(config.relay.upstream_url, "https://icp-api.io");
        assert!(config.mode.is_production());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[relay]\nproxy_path = \"/p\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.relay.proxy_path, "/p");
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(RelayError::Config(_))));
    }
}
