//! ProfileManager — profile CRUD, the active profile, and `profiles.toml`
//! persistence (spec §4 "Profile & Configuration Manager", §9).
//!
//! The manifest load/atomic-write discipline mirrors the teacher's
//! `config::Paths` singleton: a `OnceCell`-backed global accessor
//! ([`ProfileManager::global`]) alongside an explicit, injectable
//! constructor ([`ProfileManager::load`]) for tests and embedders that
//! don't want process-wide global state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{VinylError, VinylResult};
use crate::models::{Profile, ProfileId};

static PROFILE_MANAGER: OnceCell<Arc<ProfileManager>> = OnceCell::new();

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestData {
    profiles: Vec<Profile>,
    active_profile_id: Option<ProfileId>,
}

/// Owns the set of profiles, the identity of the active one, and the single
/// `Catalog` connection bound to it.
pub struct ProfileManager {
    manifest_path: PathBuf,
    profiles: RwLock<Vec<Profile>>,
    active_id: RwLock<Option<ProfileId>>,
    catalog: Catalog,
}

impl ProfileManager {
    /// Load `manifest_path` if it exists, or start with an empty profile set.
    pub fn load(manifest_path: impl Into<PathBuf>) -> VinylResult<Self> {
        let manifest_path = manifest_path.into();

        let data = if manifest_path.exists() {
            let raw = std::fs::read_to_string(&manifest_path)
                .map_err(|e| VinylError::io("read profiles manifest", manifest_path.clone(), e))?;
            toml::from_str(&raw).map_err(|e| VinylError::InvalidConfig {
                reason: format!("malformed profiles manifest: {e}"),
            })?
        } else {
            ManifestData::default()
        };

        Ok(ProfileManager {
            manifest_path,
            profiles: RwLock::new(data.profiles),
            active_id: RwLock::new(data.active_profile_id),
            catalog: Catalog::new(),
        })
    }

    /// Create a new profile. Fails if `name` is empty/already taken or
    /// `database_path` is already used by another profile.
    pub fn create_profile(
        &self,
        name: impl Into<String>,
        database_path: impl Into<PathBuf>,
    ) -> VinylResult<ProfileId> {
        let name = name.into();
        let database_path = database_path.into();

        if name.trim().is_empty() {
            return Err(VinylError::InvalidConfig {
                reason: "profile name must not be empty".to_string(),
            });
        }

        let mut profiles = self.profiles.write();
        if profiles.iter().any(|p| p.name == name) {
            return Err(VinylError::InvalidConfig {
                reason: format!("profile name `{name}` is already in use"),
            });
        }
        if profiles.iter().any(|p| p.database_path == database_path) {
            return Err(VinylError::InvalidConfig {
                reason: format!("database path {} is already in use", database_path.display()),
            });
        }

        let profile = Profile::new(name, database_path);
        let id = profile.id;
        profiles.push(profile);
        let is_first = profiles.len() == 1;
        drop(profiles);

        if is_first {
            *self.active_id.write() = Some(id);
        }

        self.persist()?;
        Ok(id)
    }

    /// Delete a profile. Requires at least one remaining profile; deleting
    /// the active profile auto-switches to another. Database files on disk
    /// are left untouched.
    pub fn delete_profile(&self, id: ProfileId) -> VinylResult<()> {
        let mut profiles = self.profiles.write();
        if profiles.len() <= 1 {
            return Err(VinylError::InvalidConfig {
                reason: "cannot delete the only remaining profile".to_string(),
            });
        }
        let index = profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| VinylError::not_found(format!("profile {id}")))?;
        profiles.remove(index);

        let next_active = if self.active_id.read().as_ref() == Some(&id) {
            profiles.first().map(|p| p.id)
        } else {
            None
        };
        drop(profiles);

        if let Some(next) = next_active {
            *self.active_id.write() = Some(next);
        }

        self.persist()
    }

    pub fn list_profiles(&self) -> Vec<Profile> {
        self.profiles.read().clone()
    }

    pub fn get_profile(&self, id: ProfileId) -> Option<Profile> {
        self.profiles.read().iter().find(|p| p.id == id).cloned()
    }

    pub fn active_profile(&self) -> Option<Profile> {
        let active_id = (*self.active_id.read())?;
        self.get_profile(active_id)
    }

    /// Switch the active profile: shut down the current catalog connection
    /// and initialize it against the new profile's database path. Callers
    /// must cancel any in-flight scan before calling this (spec §5).
    pub async fn switch_active(&self, id: ProfileId) -> VinylResult<()> {
        let database_path = {
            let mut profiles = self.profiles.write();
            let profile = profiles
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| VinylError::not_found(format!("profile {id}")))?;
            profile.touch_last_used();
            profile.database_path.clone()
        };

        self.catalog.shutdown().await;
        self.catalog.initialize(&database_path).await?;
        *self.active_id.write() = Some(id);
        self.persist()
    }

    /// Ensure the catalog is connected to the active profile's database,
    /// without changing which profile is active.
    pub async fn ensure_catalog_initialized(&self) -> VinylResult<()> {
        let profile = self
            .active_profile()
            .ok_or_else(|| VinylError::InvalidConfig {
                reason: "no active profile".to_string(),
            })?;
        self.catalog.initialize(&profile.database_path).await
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Initialize the process-wide `ProfileManager` singleton. Must be
    /// called exactly once, before [`ProfileManager::global`].
    pub fn init_global(manifest_path: impl Into<PathBuf>) -> VinylResult<Arc<ProfileManager>> {
        let manager = Arc::new(ProfileManager::load(manifest_path)?);
        PROFILE_MANAGER
            .set(Arc::clone(&manager))
            .map_err(|_| VinylError::InvalidConfig {
                reason: "profile manager already initialized".to_string(),
            })?;
        Ok(manager)
    }

    /// Fetch the process-wide `ProfileManager` singleton set up by
    /// [`ProfileManager::init_global`].
    pub fn global() -> VinylResult<Arc<ProfileManager>> {
        PROFILE_MANAGER
            .get()
            .cloned()
            .ok_or_else(|| VinylError::InvalidConfig {
                reason: "profile manager not initialized".to_string(),
            })
    }

    /// Rewrite `profiles.toml` atomically: write to a temp file in the same
    /// directory, then rename over the target (spec §9).
    fn persist(&self) -> VinylResult<()> {
        let data = ManifestData {
            profiles: self.profiles.read().clone(),
            active_profile_id: *self.active_id.read(),
        };
        let serialized = toml::to_string_pretty(&data).map_err(|e| {
            VinylError::InvalidConfig {
                reason: format!("failed to serialize profiles manifest: {e}"),
            }
        })?;

        if let Some(parent) = self.manifest_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VinylError::io("create config directory", parent.to_path_buf(), e))?;
        }

        let tmp_path = tmp_path_for(&self.manifest_path);
        std::fs::write(&tmp_path, serialized)
            .map_err(|e| VinylError::io("write profiles manifest temp file", tmp_path.clone(), e))?;
        std::fs::rename(&tmp_path, &self.manifest_path)
            .map_err(|e| VinylError::io("rename profiles manifest into place", self.manifest_path.clone(), e))?;

        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
