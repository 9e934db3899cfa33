// File: gridwatch-core/src/repositories/layout_store.rs

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tracing::debug;

use gridwatch_common::models::SavedLayout;
use gridwatch_common::traits::repository_traits::LayoutStore;
use crate::Error;

/// Persists the last layout choice as a small JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileLayoutStore {
    path: PathBuf,
}

impl JsonFileLayoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/gridwatch/layout.json`.
    pub fn default_location() -> Result<Self, Error> {
        let base = dirs::config_dir()
            .ok_or_else(|| Error::Config("no per-user config directory on this platform".into()))?;
        Ok(Self::new(base.join("gridwatch").join("layout.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LayoutStore for JsonFileLayoutStore {
    async fn save(&self, layout: &SavedLayout) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(layout)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Saved layout to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Option<SavedLayout>, Error> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }
}
