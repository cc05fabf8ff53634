//! Client configuration.
//!
//! Read from a TOML file and then overridden from the environment.
//!
//! # Example
//!
//! ```toml
//! [api]
//! url = "icinga.example.com"
//! username = "root"
//! password = "icinga"
//! verify_tls = false
//! timeout_secs = 30
//! cache_seconds = 60
//! ```

use std::path::Path;

use icinga2_api::CacheDuration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 5665;
pub const ENV_URL: &str = "ICINGA2_API_URL";
pub const ENV_USER: &str = "ICINGA2_API_USER";
pub const ENV_PASSWORD: &str = "ICINGA2_API_PASSWORD";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub api: ClientConfig,
}

/// `[api]` section: where the API lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host, host:port or full URL. Normalised with [`prepare_base_url`].
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Lifetime of cached query results in seconds.
    #[serde(default = "default_cache_seconds")]
    pub cache_seconds: u64,
}

fn default_verify_tls() -> bool {
    true
}

fn default_cache_seconds() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            url: None,
            username: None,
            password: None,
            verify_tls: default_verify_tls(),
            timeout_secs: None,
            cache_seconds: default_cache_seconds(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Read and parse a client config TOML file.
pub fn read_client_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_client_config(&content).map_err(|message| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    })
}

/// Parse a client config from TOML text.
pub fn parse_client_config(content: &str) -> Result<ClientConfig, String> {
    toml::from_str::<ConfigFile>(content)
        .map(|f| f.api)
        .map_err(|e| e.to_string())
}

impl ClientConfig {
    /// Override fields from `ICINGA2_API_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override fields from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL) {
            self.url = Some(url);
        }
        if let Some(user) = lookup(ENV_USER) {
            self.username = Some(user);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = Some(password);
        }
    }

    /// The normalised base URL.
    pub fn base_url(&self) -> Result<String, ConfigError> {
        let url = self.url.as_deref().ok_or(ConfigError::MissingUrl)?;
        prepare_base_url(url)
    }

    pub fn cache_duration(&self) -> CacheDuration {
        CacheDuration::from_secs(self.cache_seconds)
    }
}

// ── URL normalisation ─────────────────────────────────────────────────────────

/// Normalise a configured URL into the API base URL.
///
/// Adds `https://` when no scheme is given, a trailing `/`, the `v1/` version
/// segment when none is present and port 5665 when none is given.
///
/// `icinga.example.com` → `https://icinga.example.com:5665/v1/`
pub fn prepare_base_url(url: &str) -> Result<String, ConfigError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ConfigError::InvalidUrl(url.to_string()));
    }

    let mut url = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    if !url.ends_with('/') {
        url.push('/');
    }

    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| ConfigError::InvalidUrl(url.clone()))?;
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    if host.is_empty() {
        return Err(ConfigError::InvalidUrl(url.clone()));
    }

    let host = if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{DEFAULT_PORT}")
    };

    let last_segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let versioned = last_segment.len() > 1
        && last_segment.starts_with('v')
        && last_segment[1..].chars().all(|c| c.is_ascii_digit());
    let path = if versioned {
        path.to_string()
    } else {
        format!("{path}v1/")
    };

    Ok(format!("{scheme}://{host}/{path}"))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn prepare_base_url_defaults() {
        assert_eq!(
            prepare_base_url("icinga.example.com").unwrap(),
            "https://icinga.example.com:5665/v1/"
        );
        assert_eq!(
            prepare_base_url("http://localhost:8080").unwrap(),
            "http://localhost:8080/v1/"
        );
        assert_eq!(
            prepare_base_url("https://icinga:5665/v1").unwrap(),
            "https://icinga:5665/v1/"
        );
        assert_eq!(
            prepare_base_url("https://proxy/icinga/").unwrap(),
            "https://proxy:5665/icinga/v1/"
        );
    }

    #[test]
    fn prepare_base_url_rejects_empty() {
        assert!(matches!(
            prepare_base_url("  "),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(prepare_base_url("https://").is_err());
    }

    #[test]
    fn parse_full_config() {
        let config = parse_client_config(
            r#"
[api]
url = "icinga.example.com"
username = "root"
password = "secret"
verify_tls = false
timeout_secs = 5
cache_seconds = 120
"#,
        )
        .unwrap();
        assert_eq!(config.username.as_deref(), Some("root"));
        assert!(!config.verify_tls);
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(
            config.cache_duration(),
            CacheDuration::Finite(std::time::Duration::from_secs(120))
        );
    }

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = parse_client_config("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.verify_tls);
        assert!(matches!(config.base_url(), Err(ConfigError::MissingUrl)));
    }

    #[test]
    fn parse_rejects_wrong_types() {
        assert!(parse_client_config("[api]\nverify_tls = \"no\"\n").is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: BTreeMap<&str, &str> = [(ENV_URL, "other-host"), (ENV_USER, "api")]
            .into_iter()
            .collect();
        let mut config = parse_client_config("[api]\nurl = \"file-host\"\npassword = \"p\"\n").unwrap();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.url.as_deref(), Some("other-host"));
        assert_eq!(config.username.as_deref(), Some("api"));
        assert_eq!(config.password.as_deref(), Some("p"));
        assert_eq!(config.base_url().unwrap(), "https://other-host:5665/v1/");
    }
}
