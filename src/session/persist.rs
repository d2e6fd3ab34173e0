//! File-backed persistence for the auth store.
//!
//! Only `{user, is_authenticated}` survive restarts, under the fixed
//! `sidra-auth` namespace key. Writes are atomic (temp file + rename);
//! a missing or unreadable file hydrates as "no persisted state".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::store::User;

/// Namespace key; the backing file is `<dir>/sidra-auth.json`.
pub const STORAGE_KEY: &str = "sidra-auth";

/// The persisted subset of the auth state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAuth {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store rooted at `dir`, created on first save if needed.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{STORAGE_KEY}.json")),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hydrate the persisted subset. Corrupt or missing files are treated
    /// as empty; corruption is logged and discarded.
    #[must_use]
    pub fn load(&self) -> Option<PersistedAuth> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(persisted) => Some(persisted),
            Err(err) => {
                warn!("Discarding corrupt auth state at {:?}: {err}", self.path);
                None
            }
        }
    }

    /// # Errors
    /// Returns an error when the directory cannot be created or the write
    /// or rename fails.
    pub fn save(&self, persisted: &PersistedAuth) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory {parent:?}"))?;
        }

        let raw = serde_json::to_string(persisted).context("Failed to encode auth state")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).with_context(|| format!("Failed to write {tmp:?}"))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move auth state into place at {:?}", self.path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use std::env;
    use ulid::Ulid;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        env::temp_dir().join(format!("sidra-edge-test-{}", Ulid::new()))
    }

    #[test]
    fn missing_file_loads_as_none() {
        let store = FileStore::new(&scratch_dir());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = scratch_dir();
        let store = FileStore::new(&dir);
        let persisted = PersistedAuth {
            user: Some(User {
                id: Uuid::new_v4(),
                email: "leila@sidraos.app".to_string(),
                full_name: None,
                avatar_url: None,
                locale: Locale::Ar,
                created_at: None,
                updated_at: None,
            }),
            is_authenticated: true,
        };

        store.save(&persisted).unwrap();
        assert_eq!(store.load(), Some(persisted));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = scratch_dir();
        let store = FileStore::new(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        assert_eq!(store.load(), None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_lives_under_namespace_key() {
        let dir = scratch_dir();
        let store = FileStore::new(&dir);
        assert!(store.path().ends_with("sidra-auth.json"));
    }
}
