//! JSON file persistence for the user registry.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::{UserRecord, UserRegistry};
use crate::{Error, Result, Secret};

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    users: HashMap<i64, UserRecord>,
}

/// File-backed [`UserRegistry`].
///
/// The whole registry lives in one JSON file, loaded at construction
/// and rewritten atomically after every mutation. A missing or
/// unparseable file starts empty rather than failing: the registry is
/// bookkeeping, the daemon config is the authority.
pub struct FileRegistry {
    path: PathBuf,
    users: Mutex<HashMap<i64, UserRecord>>,
}

impl FileRegistry {
    /// Open (or initialize) the registry at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let users = Self::load(&path);
        Self {
            path,
            users: Mutex::new(users),
        }
    }

    fn load(path: &Path) -> HashMap<i64, UserRecord> {
        if !path.exists() {
            debug!("Registry file not found at {}", path.display());
            return HashMap::new();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to read registry file: {e}");
                return HashMap::new();
            }
        };

        match serde_json::from_str::<RegistryFile>(&content) {
            Ok(file) => {
                info!(
                    "Loaded {} user records ({} active)",
                    file.users.len(),
                    file.users.values().filter(|u| u.is_active).count()
                );
                file.users
            }
            Err(e) => {
                warn!("Failed to parse registry file: {e}");
                HashMap::new()
            }
        }
    }

    fn save(&self, users: &HashMap<i64, UserRecord>) -> Result<()> {
        let file = RegistryFile {
            version: 1,
            users: users.clone(),
        };
        let content = serde_json::to_string(&file)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Registry(format!("create {}: {e}", parent.display())))?;
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| Error::Registry(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Registry(format!("rename to {}: {e}", self.path.display())))?;

        debug!("Saved {} user records", users.len());
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, UserRecord>> {
        self.users.lock().expect("registry lock poisoned")
    }
}

impl UserRegistry for FileRegistry {
    fn get(&self, user_id: i64) -> Result<Option<UserRecord>> {
        Ok(self.lock().get(&user_id).cloned())
    }

    fn upsert(&self, user_id: i64, display_name: &str, secret: &Secret) -> Result<()> {
        let mut users = self.lock();

        match users.get_mut(&user_id) {
            Some(record) => {
                // Reactivation keeps created_at for history.
                record.display_name = display_name.to_string();
                record.secret = secret.clone();
                record.is_active = true;
            }
            None => {
                users.insert(
                    user_id,
                    UserRecord {
                        user_id,
                        display_name: display_name.to_string(),
                        secret: secret.clone(),
                        is_active: true,
                        created_at: Utc::now(),
                    },
                );
            }
        }

        self.save(&users)
    }

    fn deactivate(&self, user_id: i64) -> Result<bool> {
        let mut users = self.lock();

        let Some(record) = users.get_mut(&user_id) else {
            return Ok(false);
        };
        record.is_active = false;

        self.save(&users)?;
        Ok(true)
    }

    fn list_active(&self) -> Result<Vec<UserRecord>> {
        let mut active: Vec<UserRecord> = self
            .lock()
            .values()
            .filter(|u| u.is_active)
            .cloned()
            .collect();
        active.sort_by_key(|u| u.user_id);
        Ok(active)
    }
}
