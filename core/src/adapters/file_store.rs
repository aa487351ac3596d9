//! JSON-file forward-config persistence.
//!
//! Stores one context's forward configurations in
//! `~/.kubebridge/forwards/<context>.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::domain::UserForwardConfig;
use crate::error::{Error, Result};
use crate::ports::ForwardConfigStore;

/// On-disk layout of one store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForwardsFile {
    #[serde(default)]
    forwards: Vec<UserForwardConfig>,
}

/// File-backed [`ForwardConfigStore`], one file per context.
pub struct FileForwardStore {
    config_path: PathBuf,
}

impl FileForwardStore {
    /// Creates a store at the default path for the given context name
    /// (`~/.kubebridge/forwards/<context>.json`).
    pub fn new(context_name: &str) -> Result<Self> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?
            .join(".kubebridge")
            .join("forwards");

        Ok(Self {
            config_path: config_dir.join(format!("{context_name}.json")),
        })
    }

    /// Creates a store with a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Returns the store file path.
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    async fn load(&self) -> Result<ForwardsFile> {
        if !self.config_path.exists() {
            return Ok(ForwardsFile::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read forwards file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse forwards file: {}", e)))
    }

    async fn save(&self, file: &ForwardsFile) -> Result<()> {
        // Ensure the directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Config(format!("Failed to create forwards dir: {}", e)))?;
        }

        // Write to a temp file first, then rename (atomic write)
        let temp_path = self.config_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(file)
            .map_err(|e| Error::Config(format!("Failed to serialize forwards: {}", e)))?;

        fs::write(&temp_path, content)
            .await
            .map_err(|e| Error::Config(format!("Failed to write forwards file: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to save forwards file: {}", e)))?;

        Ok(())
    }
}

impl ForwardConfigStore for FileForwardStore {
    async fn create_forward(&self, config: &UserForwardConfig) -> Result<()> {
        let mut file = self.load().await?;

        if file.forwards.iter().any(|c| c.id() == config.id()) {
            return Err(Error::DuplicateForward(config.id()));
        }

        file.forwards.push(config.clone());
        self.save(&file).await
    }

    async fn update_forward(&self, config: &UserForwardConfig) -> Result<()> {
        let mut file = self.load().await?;

        let Some(existing) = file.forwards.iter_mut().find(|c| c.id() == config.id()) else {
            return Err(Error::ForwardNotFound(config.id()));
        };

        *existing = config.clone();
        self.save(&file).await
    }

    async fn delete_forward(&self, id: Uuid) -> Result<()> {
        let mut file = self.load().await?;
        let original_len = file.forwards.len();

        file.forwards.retain(|c| c.id() != id);

        if file.forwards.len() == original_len {
            return Err(Error::ForwardNotFound(id));
        }

        self.save(&file).await
    }

    async fn list_forwards(&self) -> Result<Vec<UserForwardConfig>> {
        let file = self.load().await?;
        Ok(file.forwards)
    }
}
