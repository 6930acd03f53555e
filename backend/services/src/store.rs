use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// JSON documents kept side by side in the bot's data directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_path: PathBuf,
}

impl JsonStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)
            .with_context(|| format!("Failed to create data directory {}", base_path.display()))?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.base_path.join(file)
    }

    /// Missing or unreadable documents yield `default`.
    pub fn load_or<T>(&self, file: &str, default: T) -> T
    where
        T: DeserializeOwned,
    {
        let path = self.path(file);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{} not found, starting empty", path.display());
                return default;
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                default
            }
        }
    }

    pub fn save<T>(&self, file: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {}", file))?;

        // Write next to the target and rename over it
        let tmp_path = self.path(&format!(".{}.tmp", file));
        std::fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        log::debug!("Saved {}", path.display());
        Ok(())
    }
}
