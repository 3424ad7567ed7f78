use avatica_core::{AvaticaError, Result};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8765;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_ARRAY_SIZE: usize = 1;
pub const DEFAULT_ITER_SIZE: u32 = 2000;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub url: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub verify: TlsVerify,
    pub extra_headers: HashMap<String, String>,
    pub auth: Option<AuthConfig>,
    pub cursor: CursorConfig,
    /// Session properties (`autoCommit`, `readOnly`, ...) plus Phoenix connection info.
    pub properties: HashMap<String, String>,
}

/// `verify = false` disables certificate checks, `verify = "/path/ca.pem"` trusts an extra CA.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TlsVerify {
    Enabled(bool),
    CaFile(PathBuf),
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CursorConfig {
    pub arraysize: usize,
    pub itersize: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: format!("http://localhost:{DEFAULT_PORT}/"),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            verify: TlsVerify::Enabled(true),
            extra_headers: HashMap::new(),
            auth: None,
            cursor: CursorConfig::default(),
            properties: HashMap::new(),
        }
    }
}

impl Default for TlsVerify {
    fn default() -> Self {
        TlsVerify::Enabled(true)
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            arraysize: DEFAULT_ARRAY_SIZE,
            itersize: DEFAULT_ITER_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow::anyhow!("url must not be empty"));
        }
        if self.cursor.itersize == 0 {
            return Err(anyhow::anyhow!("cursor.itersize must be positive"));
        }
        if self.cursor.itersize > i32::MAX as u32 {
            return Err(anyhow::anyhow!("cursor.itersize exceeds the frame size limit"));
        }
        if let Some(auth) = &self.auth {
            if auth.username.is_empty() {
                return Err(anyhow::anyhow!("auth enabled but username missing"));
            }
        }
        if let TlsVerify::CaFile(path) = &self.verify {
            if !path.exists() {
                return Err(anyhow::anyhow!(format!(
                    "ca file {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// A zero retry count falls back to the default.
    pub fn effective_max_retries(&self) -> u32 {
        if self.max_retries == 0 {
            DEFAULT_MAX_RETRIES
        } else {
            self.max_retries
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Normalizes the server address. A bare `host[:port][/path]` becomes
/// `http://host:8765/path` (port only added when missing, path defaults to `/`).
pub fn parse_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    let normalized = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        let (netloc, path) = match trimmed.find('/') {
            Some(slash) => trimmed.split_at(slash),
            None => (trimmed, "/"),
        };
        if has_port(netloc) {
            format!("http://{netloc}{path}")
        } else {
            format!("http://{netloc}:{DEFAULT_PORT}{path}")
        }
    };
    Url::parse(&normalized)
        .map_err(|err| AvaticaError::interface(format!("invalid server url {url:?}: {err}")))
}

fn has_port(netloc: &str) -> bool {
    match netloc.rfind(']') {
        Some(bracket) => netloc[bracket..].contains(':'),
        None => netloc.contains(':'),
    }
}
