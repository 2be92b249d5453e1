//! Profile model — a named, isolated database location with its own fuzzy
//! and template configuration (spec §3).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FuzzyConfig;
use crate::template::PathTemplate;

/// Opaque profile identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    pub fn new() -> Self {
        ProfileId(Uuid::new_v4())
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The default set of enabled file types for a freshly created profile,
/// per spec §6 "Supported file types (default set)".
pub fn default_file_types() -> HashSet<String> {
    [
        "mp3", "flac", "wav", "ogg", "m4a", "aac", "wma", "aiff", "ape", "opus",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub database_path: std::path::PathBuf,
    pub created_date: DateTime<Utc>,
    pub last_used_date: DateTime<Utc>,
    pub fuzzy_config: FuzzyConfig,
    pub path_template: PathTemplate,
    pub enabled_file_types: HashSet<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>, database_path: impl Into<std::path::PathBuf>) -> Self {
        let now = Utc::now();
        Profile {
            id: ProfileId::new(),
            name: name.into(),
            database_path: database_path.into(),
            created_date: now,
            last_used_date: now,
            fuzzy_config: FuzzyConfig::default(),
            path_template: PathTemplate::default_template(),
            enabled_file_types: default_file_types(),
        }
    }

    pub fn touch_last_used(&mut self) {
        self.last_used_date = Utc::now();
    }
}
