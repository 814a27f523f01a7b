//! The application-private data directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// The `Home` object represents the file paths of the spending-sync data
/// directory: the configuration file and the cached transaction blob both
/// live directly under the root.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Home {
    root: PathBuf,
    config: PathBuf,
}

impl Home {
    /// This will create the data directory, if it does not exist, and
    /// canonicalize itself.
    pub async fn new(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        fs::create_dir_all(&maybe_relative)
            .await
            .context("Unable to create the spending-sync home directory")?;
        let root = fs::canonicalize(&maybe_relative).await.with_context(|| {
            format!(
                "Unable to canonicalize the path {}",
                maybe_relative.to_string_lossy()
            )
        })?;
        let config = root.join("config.json");
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Path {
        &self.config
    }
}

/// The default home directory: the platform data dir, falling back to a
/// dotted directory under `$HOME`.
pub fn default_home() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("spending-sync"))
        .or_else(|| dirs::home_dir().map(|d| d.join(".spending-sync")))
        .unwrap_or_else(|| PathBuf::from(".spending-sync"))
}

#[tokio::test]
async fn test_home() {
    use tempfile::TempDir;
    let dir = TempDir::new().unwrap();
    let home = Home::new(dir.path().join("spending")).await.unwrap();
    assert!(home.root().is_dir());
    assert_eq!(home.config().file_name().unwrap(), "config.json");
}
