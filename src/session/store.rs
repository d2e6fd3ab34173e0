//! Auth state container.
//!
//! An explicit, injectable store rather than ambient global state. All
//! mutation goes through the five operations below; `is_authenticated` is
//! kept equal to `user.is_some()` by construction and never set directly.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use super::persist::{FileStore, PersistedAuth};
use crate::identity::ProfileRow;
use crate::locale::Locale;

/// Profile projection consumed by UI layers. Distinct from the provider's
/// raw session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub locale: Locale,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<ProfileRow> for User {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            // Profiles without a stored preference render in the default
            locale: row.locale.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Point-in-time view of the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_initialized: bool,
}

impl AuthSnapshot {
    fn initial() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            is_initialized: false,
        }
    }
}

pub struct AuthStore {
    state: Mutex<AuthSnapshot>,
    persistence: Option<FileStore>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AuthSnapshot::initial()),
            persistence: None,
        }
    }

    /// Build a store backed by a file, hydrating `{user, is_authenticated}`
    /// from the previous run. `is_loading` and `is_initialized` always start
    /// fresh.
    #[must_use]
    pub fn with_persistence(persistence: FileStore) -> Self {
        let mut state = AuthSnapshot::initial();
        if let Some(persisted) = persistence.load() {
            state.user = persisted.user;
            state.is_authenticated = persisted.is_authenticated;
        }
        Self {
            state: Mutex::new(state),
            persistence: Some(persistence),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.lock().clone()
    }

    /// Install the resolved user. Also settles the transient flags, so a
    /// completed resolution is observable as one transition.
    pub fn set_user(&self, user: Option<User>) {
        {
            let mut state = self.lock();
            state.is_authenticated = user.is_some();
            state.user = user;
            state.is_loading = false;
            state.is_initialized = true;
        }
        self.persist();
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.lock().is_loading = is_loading;
    }

    pub fn set_initialized(&self, is_initialized: bool) {
        self.lock().is_initialized = is_initialized;
    }

    /// Local reset on sign-out. Keeps `is_initialized`: the scope has
    /// already completed its one-time initialization.
    pub fn logout(&self) {
        {
            let mut state = self.lock();
            state.user = None;
            state.is_authenticated = false;
            state.is_loading = false;
        }
        self.persist();
    }

    /// Full reset to the pristine state, including the persisted subset.
    pub fn reset(&self) {
        *self.lock() = AuthSnapshot::initial();
        self.persist();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuthSnapshot> {
        // A poisoned lock means a writer panicked mid-mutation; the state
        // itself is a plain value, so continue with it.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        let persisted = {
            let state = self.lock();
            PersistedAuth {
                user: state.user.clone(),
                is_authenticated: state.is_authenticated,
            }
        };
        if let Err(err) = persistence.save(&persisted) {
            warn!("Failed to persist auth state: {err}");
        }
    }
}
