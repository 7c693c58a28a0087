//! Connection settings for a KEF speaker.
//!
//! Every field has a default, so a YAML document only needs the keys it
//! changes:
//!
//! ```yaml
//! host: 192.168.1.42
//! min_connect_interval_ms: 150
//! ```
//!
//! Values can also be overridden from the environment with variables named
//! `PMOKEF_CONFIG__<FIELD>` (for instance `PMOKEF_CONFIG__HTTP_PORT=8081`).

use std::{env, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, info};

use crate::errors::{KefError, Result};

const ENV_PREFIX: &str = "PMOKEF_CONFIG__";
/// Fields taken verbatim from the environment, never parsed as YAML.
const STRING_FIELDS: [&str; 2] = ["host", "control_path"];

pub const DEFAULT_TCP_PORT: u16 = 50001;
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_CONTROL_PATH: &str = "/AVTransport/ctrl";
const DEFAULT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_LINGER_MS: u64 = 5000;
const DEFAULT_MIN_CONNECT_INTERVAL_MS: u64 = 100;
const DEFAULT_STREAM_RETENTION_SECS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KefConfig {
    pub host: String,
    pub tcp_port: u16,
    pub http_port: u16,
    pub control_path: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub linger_ms: u64,
    pub min_connect_interval_ms: u64,
    pub http_timeout_ms: u64,
    /// How long a fixed-length stream stays available on the stream server.
    pub stream_retention_secs: u64,
}

impl Default for KefConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            tcp_port: DEFAULT_TCP_PORT,
            http_port: DEFAULT_HTTP_PORT,
            control_path: DEFAULT_CONTROL_PATH.to_string(),
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            linger_ms: DEFAULT_LINGER_MS,
            min_connect_interval_ms: DEFAULT_MIN_CONNECT_INTERVAL_MS,
            http_timeout_ms: DEFAULT_TIMEOUT_MS,
            stream_retention_secs: DEFAULT_STREAM_RETENTION_SECS,
        }
    }
}

impl KefConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: KefConfig = serde_yaml::from_str(yaml)
            .map_err(|e| KefError::Config(format!("Invalid KEF configuration: {}", e)))?;
        config.validate()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading KEF configuration");
        let content = fs::read_to_string(path).map_err(|e| {
            KefError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Applies `PMOKEF_CONFIG__*` variables from the process environment.
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(env::vars())
    }

    fn apply_overrides<I>(self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut value = serde_yaml::to_value(&self)
            .map_err(|e| KefError::Config(format!("Cannot serialize configuration: {}", e)))?;

        let Value::Mapping(mapping) = &mut value else {
            return Err(KefError::Config("Configuration is not a mapping".to_string()));
        };

        for (key, raw) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let field = field.to_ascii_lowercase();
            debug!(field = %field, "Overriding KEF configuration from environment");
            let value = if STRING_FIELDS.contains(&field.as_str()) {
                Value::String(raw)
            } else {
                convert_env_value(&raw)
            };
            mapping.insert(Value::String(field), value);
        }

        let config: KefConfig = serde_yaml::from_value(value)
            .map_err(|e| KefError::Config(format!("Invalid environment override: {}", e)))?;
        config.validate()
    }

    /// Rejects an empty host or a zero port.
    pub fn validate(self) -> Result<Self> {
        if self.host.trim().is_empty() {
            return Err(KefError::Config("host must not be empty".to_string()));
        }
        if self.tcp_port == 0 || self.http_port == 0 {
            return Err(KefError::Config("ports must be non-zero".to_string()));
        }
        Ok(self)
    }

    /// `host:port` of the binary control port, bracketing IPv6 literals.
    pub fn tcp_address(&self) -> String {
        join_host_port(&self.host, self.tcp_port)
    }

    pub fn control_url(&self) -> String {
        let path = if self.control_path.starts_with('/') {
            self.control_path.clone()
        } else {
            format!("/{}", self.control_path)
        };
        format!("http://{}{}", join_host_port(&self.host, self.http_port), path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }

    pub fn min_connect_interval(&self) -> Duration {
        Duration::from_millis(self.min_connect_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn stream_retention(&self) -> Duration {
        Duration::from_secs(self.stream_retention_secs)
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{host}:{port}")
    }
}

fn convert_env_value(value: &str) -> Value {
    match serde_yaml::from_str::<Value>(value) {
        Ok(Value::Null) | Err(_) => Value::String(value.to_string()),
        Ok(parsed) => parsed,
    }
}
