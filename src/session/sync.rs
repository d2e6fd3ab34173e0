//! Session synchronizer: bridges the provider's session lifecycle into the
//! auth store.
//!
//! Initialization runs once per mounted scope; afterwards the subscription
//! keeps the store live until the scope drops its handle. Provider errors
//! never propagate out of this module; they become state transitions.

use std::sync::Arc;
use tracing::{debug, warn};

use super::store::{AuthStore, User};
use crate::identity::{AuthEvent, IdentityProvider, Subscription};

/// Where a caller-initiated logout navigates to.
pub const LOGIN_PATH: &str = "/login";

#[derive(Clone)]
pub struct SessionSynchronizer {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<AuthStore>,
}

impl SessionSynchronizer {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<AuthStore>) -> Self {
        Self { provider, store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    /// One-time hydration of the store from the provider.
    ///
    /// Whatever happens on the way, `is_loading` ends false and
    /// `is_initialized` ends true, in that order.
    pub async fn initialize(&self) {
        self.store.set_loading(true);

        match self.resolve_current_user().await {
            Ok(user) => self.store.set_user(user),
            Err(err) => {
                warn!("Auth initialization failed: {err}");
                self.store.set_user(None);
            }
        }

        self.store.set_loading(false);
        self.store.set_initialized(true);
    }

    /// A session whose profile row is missing resolves as unauthenticated.
    async fn resolve_current_user(&self) -> anyhow::Result<Option<User>> {
        let lookup = self.provider.current_user(None).await?;
        let Some(auth_user) = lookup.user else {
            return Ok(None);
        };
        let profile = self.provider.fetch_profile(auth_user.id).await?;
        Ok(profile.map(User::from))
    }

    /// Consume auth events until the subscription is released or the hub
    /// goes away. Events are applied in delivery order.
    pub async fn run(&self, mut subscription: Subscription) {
        while let Some(event) = subscription.next().await {
            self.apply(event).await;
        }
        debug!("auth event stream closed");
    }

    /// Apply a single auth event to the store.
    pub async fn apply(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn { user_id } => match self.provider.fetch_profile(user_id).await {
                // The same profile-miss policy as initialization: a session
                // with no profile row is not an authenticated user.
                Ok(profile) => self.store.set_user(profile.map(User::from)),
                Err(err) => {
                    warn!("Profile fetch after sign-in failed: {err}");
                }
            },
            AuthEvent::SignedOut => self.store.logout(),
            AuthEvent::TokenRefreshed => {}
        }
    }

    /// Caller-initiated logout: provider sign-out, local reset, then hand
    /// back the path the shell should navigate to.
    pub async fn logout(&self) -> &'static str {
        if let Err(err) = self.provider.sign_out().await {
            // The provider session may outlive us; local state is cleared
            // regardless so the user sees the logged-out experience.
            warn!("Provider sign-out failed: {err}");
        }
        self.store.logout();
        LOGIN_PATH
    }
}
