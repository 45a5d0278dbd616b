use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use fjall::Keyspace;
use serde::Deserialize;

use crate::activity_pub::CloudAddress;

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub activity_pub: ActivityPubConfig,
    pub server: ServerConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ActivityPubConfig {
    /// Public address of this server, without trailing slash
    pub base_url: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub retry_secs: u64,
    pub visibility_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Delivery attempts before a message is dropped
    pub max_receive_count: u64,
}

#[derive(Clone)]
pub struct RuntimeConfig {
    pub init: Config,
    pub keyspace: Keyspace,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&text).context("unable to parse config file")?;
        Ok(config)
    }
}

impl ActivityPubConfig {
    pub fn user_iri(&self, uid: &str) -> String {
        format!("{}/users/{}", self.base_url, uid)
    }
}

impl CloudAddress for ActivityPubConfig {
    fn current_address(&self) -> String {
        self.base_url.clone()
    }
}

impl DeliveryConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_secs)
    }
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ActivityPubConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            retry_secs: 30,
            visibility_timeout_secs: 30,
            request_timeout_secs: 10,
            max_receive_count: 10,
        }
    }
}
