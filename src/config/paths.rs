//! Path management for vinylcrate
//!
//! This module manages the top-level config directory and the single
//! `profiles.toml` file it holds. Per-profile database directories are
//! resolved separately by [`crate::profile::ProfileManager`].

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static PATHS: OnceCell<Arc<Paths>> = OnceCell::new();

/// Manages the application-level filesystem paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Parent directory of the config folder
    config_parent: PathBuf,
    /// Config directory path
    config_dir: PathBuf,
}

impl Paths {
    /// Initialize the paths singleton
    pub fn init(config_override: Option<PathBuf>) -> Result<Arc<Paths>> {
        let paths = PATHS.get_or_try_init(|| {
            let paths = Self::new(config_override)?;
            Ok::<_, anyhow::Error>(Arc::new(paths))
        })?;
        Ok(Arc::clone(paths))
    }

    /// Get the global paths instance
    pub fn get() -> Result<Arc<Paths>> {
        PATHS.get().map(Arc::clone).context("Paths not initialized")
    }

    fn new(config_override: Option<PathBuf>) -> Result<Self> {
        let config_parent = if let Some(path) = config_override {
            path
        } else {
            directories::ProjectDirs::from("", "", "vinylcrate")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        };

        let config_dir_name = if is_home_dir(&config_parent) {
            ".vinylcrate"
        } else {
            "vinylcrate"
        };

        let config_dir = config_parent.join(config_dir_name);

        let paths = Self {
            config_parent,
            config_dir,
        };

        paths.create_directories()?;

        Ok(paths)
    }

    fn create_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(self.profiles_dir())?;
        Ok(())
    }

    /// Get the config directory
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the config parent directory
    pub fn config_parent(&self) -> &Path {
        &self.config_parent
    }

    /// Get the profiles manifest path (profiles.toml)
    pub fn profiles_manifest_path(&self) -> PathBuf {
        self.config_dir.join("profiles.toml")
    }

    /// Get the directory under which per-profile database directories live
    /// by default (a profile may still point its `databasePath` elsewhere).
    pub fn profiles_dir(&self) -> PathBuf {
        self.config_dir.join("profiles")
    }
}

/// Check if a path is in the user's home directory
fn is_home_dir(path: &Path) -> bool {
    directories::UserDirs::new()
        .map(|dirs| path.starts_with(dirs.home_dir()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_creation() {
        let temp_dir = TempDir::new().unwrap();
        let config = Some(temp_dir.path().to_path_buf());

        let paths = Paths::new(config).unwrap();

        assert!(paths.config_dir().exists());
        assert!(paths.profiles_dir().exists());
    }
}
