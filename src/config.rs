use crate::error::{RelayError, Result};
use crate::upstream::UpstreamSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: default_api_key_env(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_port() -> u16 {
    5000
}

fn default_api_key_env() -> String {
    "LITELLM_API_KEY".to_string()
}

fn default_model() -> String {
    "gemini/gemini-flash-lite-latest".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl RelayConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to defaults.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn effective_base_url(&self) -> Result<String> {
        match self.upstream.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.trim_end_matches('/').to_string()),
            _ => Err(RelayError::config(
                "No upstream base_url configured. Set [upstream].base_url or pass --base-url",
            )),
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String> {
        match std::env::var(&self.upstream.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(RelayError::config(format!(
                "Environment variable '{}' not set. Set it with your gateway API key.",
                self.upstream.api_key_env
            ))),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    /// Settings for the upstream client. The key is taken as given so that
    /// a missing key fails each call instead of preventing startup.
    pub fn upstream_settings(&self, api_key: impl Into<String>) -> Result<UpstreamSettings> {
        Ok(UpstreamSettings {
            base_url: self.effective_base_url()?,
            api_key: api_key.into(),
            model: self.upstream.model.clone(),
            timeout: self.timeout(),
        })
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("chat-relay.toml")];

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("chat-relay").join("config.toml"));
    }
    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("chat-relay").join("config.toml"));
        paths.push(home.join(".chat-relay.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 8080

[upstream]
base_url = "https://gateway.example.org/"
api_key_env = "GATEWAY_KEY"
model = "gpt-4o-mini"
timeout_secs = 15
"#
        )
        .unwrap();

        let config = RelayConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream.api_key_env, "GATEWAY_KEY");
        assert_eq!(config.upstream.model, "gpt-4o-mini");
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(
            config.effective_base_url().unwrap(),
            "https://gateway.example.org"
        );
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "[upstream]\nbase_url = \"http://localhost:4000\"").unwrap();

        let config = RelayConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.upstream.api_key_env, "LITELLM_API_KEY");
        assert_eq!(config.upstream.model, "gemini/gemini-flash-lite-latest");
        assert_eq!(config.upstream.timeout_secs, 60);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "port = \"not a number\"").unwrap();

        let err = RelayConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, RelayError::Toml(_)));
    }

    #[test]
    fn test_missing_base_url_is_config_error() {
        let mut config = RelayConfig::default();
        assert_eq!(config.effective_base_url().unwrap_err().code(), "config_error");

        config.upstream.base_url = Some("   ".to_string());
        assert_eq!(config.effective_base_url().unwrap_err().code(), "config_error");
    }

    #[test]
    fn test_unset_key_env_is_config_error() {
        let mut config = RelayConfig::default();
        config.upstream.api_key_env = "CHAT_RELAY_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert_eq!(config.resolve_api_key().unwrap_err().code(), "config_error");
    }

    #[test]
    fn test_upstream_settings() {
        let mut config = RelayConfig::default();
        config.upstream.base_url = Some("http://localhost:4000/v1/".to_string());

        let settings = config.upstream_settings("sk-test").unwrap();
        assert_eq!(settings.base_url, "http://localhost:4000/v1");
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.model, "gemini/gemini-flash-lite-latest");
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }
}
