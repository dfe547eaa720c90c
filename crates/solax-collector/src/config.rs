use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use http_client::ClientConfig;
use poller_actor::ActorConfig;
use types::InverterEndpoint;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_RESPAWN_DELAY_MS: u64 = 5_000;
const DEFAULT_DISCOVERY_BACKOFF_MS: u64 = 1_000;
const DEFAULT_DISCOVERY_BACKOFF_MAX_MS: u64 = 60_000;

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    pub inverter: InverterEndpoint,
    pub http: ClientConfig,
    pub poller: ActorConfig,
    pub discovery_backoff_ms: u64,
    pub discovery_backoff_max_ms: u64,
    pub channel_capacity: usize,
    pub respawn_delay_ms: u64,
}

impl CollectorConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn load_with_path(config_path: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(file_config) = load_file_config(config_path.as_deref())? {
            apply_file_config(&mut config, file_config);
        }

        apply_env_overrides(&mut config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inverter.host.trim().is_empty() {
            anyhow::bail!("inverter.host must be non-empty");
        }
        if self.inverter.port == 0 {
            anyhow::bail!("inverter.port must be between 1 and 65535");
        }
        if self
            .inverter
            .headers
            .iter()
            .any(|(name, _)| name.trim().is_empty())
        {
            anyhow::bail!("inverter.headers must not contain empty names");
        }
        if self.http.timeout_ms == 0 {
            anyhow::bail!("http.timeout_ms must be >= 1");
        }
        if self.http.connect_timeout_ms == 0 {
            anyhow::bail!("http.connect_timeout_ms must be >= 1");
        }
        if self.poller.poll_interval.as_millis() == 0 {
            anyhow::bail!("poller.poll_interval_ms must be >= 1");
        }
        if self.poller.request_timeout.as_millis() == 0 {
            anyhow::bail!("poller.request_timeout_ms must be >= 1");
        }
        if self.discovery_backoff_ms == 0 {
            anyhow::bail!("discovery.retry_backoff_ms must be >= 1");
        }
        if self.discovery_backoff_max_ms < self.discovery_backoff_ms {
            anyhow::bail!("discovery.retry_max_backoff_ms must be >= discovery.retry_backoff_ms");
        }
        if self.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be >= 1");
        }
        if self.respawn_delay_ms == 0 {
            anyhow::bail!("respawn_delay_ms must be >= 1");
        }

        Ok(())
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            inverter: InverterEndpoint::default(),
            http: ClientConfig::default(),
            poller: ActorConfig::default(),
            discovery_backoff_ms: DEFAULT_DISCOVERY_BACKOFF_MS,
            discovery_backoff_max_ms: DEFAULT_DISCOVERY_BACKOFF_MAX_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            respawn_delay_ms: DEFAULT_RESPAWN_DELAY_MS,
        }
    }
}

fn apply_env_overrides(config: &mut CollectorConfig) {
    if let Ok(value) = env::var("SOLAX_HOST") {
        config.inverter.host = value;
    }

    if let Some(port) = parse_env_u16("SOLAX_PORT") {
        config.inverter.port = port;
    }

    if let Ok(value) = env::var("SOLAX_PASSWORD") {
        config.inverter.password = value;
    }

    if let Some(timeout_ms) = parse_env_u64("SOLAX_HTTP_TIMEOUT_MS") {
        config.http.timeout_ms = timeout_ms;
    }

    if let Some(timeout_ms) = parse_env_u64("SOLAX_REQUEST_TIMEOUT_MS") {
        config.poller.request_timeout = Duration::from_millis(timeout_ms);
    }

    if let Some(interval_ms) = parse_env_u64("SOLAX_POLL_INTERVAL_MS") {
        config.poller.poll_interval = Duration::from_millis(interval_ms);
    }

    if let Some(jitter_ms) = parse_env_u64("SOLAX_JITTER_MS") {
        config.poller.jitter_ms = jitter_ms;
    }

    if let Some(max) = parse_env_u32("SOLAX_MAX_CONSECUTIVE_FAILURES") {
        config.poller.max_consecutive_failures = max;
    }

    config.channel_capacity =
        parse_env_usize("SOLAX_CHANNEL_CAPACITY").unwrap_or(config.channel_capacity);
    config.respawn_delay_ms =
        parse_env_u64("SOLAX_RESPAWN_DELAY_MS").unwrap_or(config.respawn_delay_ms);
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    inverter: Option<FileInverterConfig>,
    http: Option<FileHttpConfig>,
    poller: Option<FilePollerConfig>,
    discovery: Option<FileDiscoveryConfig>,
    channel_capacity: Option<usize>,
    respawn_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileInverterConfig {
    host: Option<String>,
    port: Option<u16>,
    password: Option<String>,
    headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct FileHttpConfig {
    timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FilePollerConfig {
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    jitter_ms: Option<u64>,
    max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FileDiscoveryConfig {
    retry_backoff_ms: Option<u64>,
    retry_max_backoff_ms: Option<u64>,
}

fn load_file_config(config_path: Option<&str>) -> Result<Option<FileConfig>> {
    let path = match config_path {
        Some(path) => path.to_string(),
        None => match env::var("SOLAX_CONFIG") {
            Ok(value) => value,
            Err(_) => return Ok(None),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("read config file {path}"))?;
    let ext = Path::new(&path).extension().and_then(|value| value.to_str());

    let config = match ext {
        Some("json") => serde_json::from_str(&content).context("parse json config")?,
        _ => toml::from_str(&content).context("parse toml config")?,
    };

    Ok(Some(config))
}

fn apply_file_config(config: &mut CollectorConfig, file: FileConfig) {
    if let Some(inverter) = file.inverter {
        if let Some(host) = inverter.host {
            config.inverter.host = host;
        }
        if let Some(port) = inverter.port {
            config.inverter.port = port;
        }
        if let Some(password) = inverter.password {
            config.inverter.password = password;
        }
        if let Some(headers) = inverter.headers {
            config.inverter.headers = headers.into_iter().collect();
        }
    }

    if let Some(http) = file.http {
        if let Some(timeout_ms) = http.timeout_ms {
            config.http.timeout_ms = timeout_ms;
        }
        if let Some(timeout_ms) = http.connect_timeout_ms {
            config.http.connect_timeout_ms = timeout_ms;
        }
    }

    if let Some(poller) = file.poller {
        if let Some(interval_ms) = poller.poll_interval_ms {
            config.poller.poll_interval = Duration::from_millis(interval_ms);
        }
        if let Some(timeout_ms) = poller.request_timeout_ms {
            config.poller.request_timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(jitter_ms) = poller.jitter_ms {
            config.poller.jitter_ms = jitter_ms;
        }
        if let Some(max) = poller.max_consecutive_failures {
            config.poller.max_consecutive_failures = max;
        }
    }

    if let Some(discovery) = file.discovery {
        if let Some(backoff) = discovery.retry_backoff_ms {
            config.discovery_backoff_ms = backoff;
        }
        if let Some(max_backoff) = discovery.retry_max_backoff_ms {
            config.discovery_backoff_max_ms = max_backoff;
        }
    }

    if let Some(capacity) = file.channel_capacity {
        config.channel_capacity = capacity;
    }
    if let Some(delay) = file.respawn_delay_ms {
        config.respawn_delay_ms = delay;
    }
}

fn parse_env_u16(key: &str) -> Option<u16> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
