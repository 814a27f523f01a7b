//! Configuration file handling.
//!
//! The configuration file is stored at `{home}/config.json` and contains the
//! remote base URL and the fetch retry budget. A missing file is created with
//! defaults on first load, so the CLI works out of the box.

use crate::home::Home;
use crate::retry::DEFAULT_MAX_ATTEMPTS;
use crate::utils;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

const APP_NAME: &str = "spending-sync";
const CONFIG_VERSION: u8 = 1;
const DEFAULT_BASE_URL: &str = "https://development.sprintform.com";

/// The `Config` object represents the configuration of the app. You
/// instantiate it by providing the path to the home directory, and from there
/// it loads (or creates) `config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    home: Home,
    config_file: ConfigFile,
    base_url: Url,
}

impl Config {
    /// Loads `{home}/config.json`, creating the home directory and a default
    /// configuration file when they do not exist yet.
    pub async fn load(home: impl Into<std::path::PathBuf>) -> Result<Self> {
        let home = Home::new(home).await?;
        let config_file = if home.config().is_file() {
            utils::deserialize::<ConfigFile>(home.config()).await?
        } else {
            let defaults = ConfigFile::default();
            defaults.save(home.config()).await?;
            defaults
        };
        let base_url = Url::parse(&config_file.base_url)
            .with_context(|| format!("Invalid base URL '{}'", config_file.base_url))?;
        Ok(Self {
            home,
            config_file,
            base_url,
        })
    }

    /// The base URL the transaction list is fetched from.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The total fetch attempt budget per retry session.
    pub fn max_attempts(&self) -> u32 {
        self.config_file.max_attempts
    }

    /// The directory holding the cached transaction blob.
    pub fn cache_dir(&self) -> &Path {
        self.home.root()
    }
}

/// The serialized form of `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct ConfigFile {
    app_name: String,
    config_version: u8,
    base_url: String,
    max_attempts: u32,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ConfigFile {
    async fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Unable to serialize configuration")?;
        utils::write(path, json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_creates_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path().join("spending")).await.unwrap();
        assert_eq!(config.base_url().as_str(), "https://development.sprintform.com/");
        assert_eq!(config.max_attempts(), 5);
        assert!(config.cache_dir().join("config.json").is_file());
    }

    #[tokio::test]
    async fn test_load_round_trips_existing_file() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("spending");
        Config::load(&home).await.unwrap();

        let path = home.join("config.json");
        let content = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\"max_attempts\": 5", "\"max_attempts\": 3");
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.max_attempts(), 3);
    }

    #[tokio::test]
    async fn test_load_rejects_bad_base_url() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("spending");
        Config::load(&home).await.unwrap();

        let path = home.join("config.json");
        let content = std::fs::read_to_string(&path)
            .unwrap()
            .replace(DEFAULT_BASE_URL, "not a url");
        std::fs::write(&path, content).unwrap();

        assert!(Config::load(&home).await.is_err());
    }
}
