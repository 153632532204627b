use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::info;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_nickname")]
    pub nickname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub default_volume: u32,
    #[serde(default = "default_max_volume")]
    pub max_volume: u32,
    /// Seek step in percent of the track used when none is given.
    #[serde(default = "default_seek_step")]
    pub seek_step: f64,
}

/// Identities with elevated rights and identities refused outright.
/// Duplicates are kept as entered.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UsersConfig {
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub banned_users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_service")]
    pub default: String,
    /// Station catalogue searched by the `stations` service (TOML or M3U).
    #[serde(default = "default_stations_file")]
    pub stations_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Upper bound on concurrently running searches and url resolutions.
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            nickname: default_nickname(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            max_volume: default_max_volume(),
            seek_step: default_seek_step(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            default: default_service(),
            stations_file: default_stations_file(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            max_jobs: default_max_jobs(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_nickname() -> String {
    "MediaBot".to_string()
}

fn default_volume() -> u32 {
    50
}

fn default_max_volume() -> u32 {
    100
}

fn default_seek_step() -> f64 {
    5.0
}

fn default_service() -> String {
    "stations".to_string()
}

fn default_stations_file() -> PathBuf {
    platform::config_dir().join("stations.toml")
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    platform::DEFAULT_TRANSPORT_PORT
}

fn default_max_jobs() -> usize {
    4
}

impl Config {
    /// Load the config at the default location, writing defaults on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

/// Shared, mutable config tree plus the file it persists to.
///
/// Read by every dispatch (admin and ban lists), written rarely by admin
/// commands, so the tree sits behind a read-mostly lock.
pub struct ConfigStore {
    config: RwLock<Config>,
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            config: RwLock::new(config),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Config) -> R) -> R {
        let config = self.config.read().await;
        f(&config)
    }

    pub async fn write<R>(&self, f: impl FnOnce(&mut Config) -> R) -> R {
        let mut config = self.config.write().await;
        f(&mut config)
    }

    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn is_admin(&self, identity: &str) -> bool {
        self.read(|c| c.users.admins.iter().any(|a| a == identity))
            .await
    }

    pub async fn is_banned(&self, identity: &str) -> bool {
        self.read(|c| c.users.banned_users.iter().any(|b| b == identity))
            .await
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        let content = {
            let config = self.config.read().await;
            toml::to_string_pretty(&*config)?
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;
        info!("Config saved to {:?}", self.path);
        Ok(())
    }
}
