//! External identity provider interface.
//!
//! The provider owns sessions; this crate only observes them. The edge guard
//! exchanges request cookies for the current user, the session synchronizer
//! asks for the ambient user and listens for auth events. Provider failures
//! are recoverable by contract: callers treat them as "no user".

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use tokio::sync::broadcast;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::locale::Locale;

pub mod http;
pub use http::HttpIdentityProvider;

/// Environment variables gating session resolution. Absence of either is a
/// supported no-auth mode, not an error.
pub const ENV_IDENTITY_URL: &str = "SIDRA_IDENTITY_URL";
pub const ENV_IDENTITY_KEY: &str = "SIDRA_IDENTITY_KEY";

/// The authenticated identity as the provider reports it. Opaque to the
/// guard beyond its id; the profile projection is fetched separately.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Raw row from the provider's `profiles` table.
#[derive(Clone, Debug, Deserialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub locale: Option<Locale>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Result of a session exchange: the resolved user, if any, plus refreshed
/// session cookies that must be relayed on the response regardless of the
/// routing decision.
#[derive(Clone, Debug, Default)]
pub struct UserLookup {
    pub user: Option<AuthUser>,
    pub refreshed_cookies: Vec<String>,
}

/// Asynchronous auth notification from the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: Uuid },
    SignedOut,
    /// Refresh and other housekeeping events; consumers ignore these.
    TokenRefreshed,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the current user. The edge passes the request `Cookie` header;
    /// client-runtime callers pass `None` and rely on the provider's own
    /// session.
    async fn current_user(&self, cookies: Option<&str>) -> Result<UserLookup>;

    /// Fetch the profile projection for a user id. `Ok(None)` means the
    /// session has no matching profile row.
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<ProfileRow>>;

    /// Invalidate the provider-side session.
    async fn sign_out(&self) -> Result<()>;

    /// Subscribe to auth events for the life of the returned handle.
    fn subscribe(&self) -> Subscription;
}

/// Fan-out hub for auth events. One live stream per subscriber; delivery is
/// in send order.
#[derive(Clone, Debug)]
pub struct EventHub {
    tx: broadcast::Sender<AuthEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    /// Deliver an event to all live subscriptions. Silently a no-op when
    /// nobody is subscribed.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: Some(self.tx.subscribe()),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live auth event stream. Dropping the handle releases the subscription
/// exactly once; no events are delivered afterwards.
#[derive(Debug)]
pub struct Subscription {
    rx: Option<broadcast::Receiver<AuthEvent>>,
}

impl Subscription {
    /// Next event in delivery order, or `None` once the subscription has
    /// been released or the hub is gone.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("auth event stream lagged, {skipped} events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Release the subscription. Idempotent; dropping the handle has the
    /// same effect.
    pub fn unsubscribe(&mut self) {
        self.rx = None;
    }
}

/// Provider endpoint plus service key, read from the environment.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub url: Url,
    pub key: SecretString,
}

impl IdentityConfig {
    /// Build from explicit values, as the CLI layer passes them.
    ///
    /// # Errors
    /// Returns an error when the URL does not parse.
    pub fn new(url: &str, key: SecretString) -> Result<Self> {
        let url = Url::parse(url)?;
        Ok(Self { url, key })
    }

    /// Read `SIDRA_IDENTITY_URL` / `SIDRA_IDENTITY_KEY`. Both absent means
    /// degraded no-auth mode (`Ok(None)`); one without the other is a
    /// configuration error.
    ///
    /// # Errors
    /// Returns an error on a half-configured pair or an invalid URL.
    pub fn from_env() -> Result<Option<Self>> {
        let url = env::var(ENV_IDENTITY_URL).ok();
        let key = env::var(ENV_IDENTITY_KEY).ok();
        match (url, key) {
            (Some(url), Some(key)) => Ok(Some(Self::new(&url, SecretString::from(key))?)),
            (None, None) => Ok(None),
            _ => anyhow::bail!(
                "{ENV_IDENTITY_URL} and {ENV_IDENTITY_KEY} must be set together or not at all"
            ),
        }
    }
}
