//! HTTP client for the hosted identity provider.
//!
//! Speaks the provider's REST surface: `GET /auth/v1/user` for session
//! exchange, `GET /rest/v1/profiles` for the profile projection, and
//! `POST /auth/v1/logout`. Refreshed session cookies show up as `Set-Cookie`
//! headers on the exchange response and are passed back verbatim.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::SET_COOKIE, Client, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::{
    AuthEvent, AuthUser, EventHub, IdentityConfig, IdentityProvider, ProfileRow, Subscription,
    UserLookup,
};
use crate::APP_USER_AGENT;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpIdentityProvider {
    base: Url,
    key: secrecy::SecretString,
    client: Client,
    events: EventHub,
}

impl HttpIdentityProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: IdentityConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build identity provider client")?;

        Ok(Self {
            base: config.url,
            key: config.key,
            client,
            events: EventHub::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid identity endpoint: {path}"))
    }

    fn api_key(&self) -> &str {
        self.key.expose_secret()
    }

    /// The provider-local event hub. The edge never uses this; the session
    /// synchronizer subscribes through [`IdentityProvider::subscribe`].
    #[must_use]
    pub fn events(&self) -> &EventHub {
        &self.events
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip_all)]
    async fn current_user(&self, cookies: Option<&str>) -> Result<UserLookup> {
        let mut request = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", self.api_key());

        if let Some(cookies) = cookies {
            request = request.header(reqwest::header::COOKIE, cookies);
        }

        let response = request.send().await.context("Session exchange failed")?;

        // Refreshed tokens ride along as Set-Cookie on any exchange outcome.
        let refreshed_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(ToString::to_string))
            .collect();

        match response.status() {
            StatusCode::OK => {
                let user: AuthUser = response
                    .json()
                    .await
                    .context("Malformed user payload from identity provider")?;
                Ok(UserLookup {
                    user: Some(user),
                    refreshed_cookies,
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("no active session");
                Ok(UserLookup {
                    user: None,
                    refreshed_cookies,
                })
            }
            status => anyhow::bail!("Unexpected status from session exchange: {status}"),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<ProfileRow>> {
        let mut url = self.endpoint("rest/v1/profiles")?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"))
            .append_pair("select", "*");

        let response = self
            .client
            .get(url)
            .header("apikey", self.api_key())
            .send()
            .await
            .context("Profile lookup failed")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let rows: Vec<ProfileRow> = response
            .error_for_status()
            .context("Profile lookup rejected")?
            .json()
            .await
            .context("Malformed profile payload")?;

        Ok(rows.into_iter().next())
    }

    #[instrument(skip_all)]
    async fn sign_out(&self) -> Result<()> {
        self.client
            .post(self.endpoint("auth/v1/logout")?)
            .header("apikey", self.api_key())
            .send()
            .await
            .context("Sign-out request failed")?
            .error_for_status()
            .context("Sign-out rejected")?;

        // Local subscribers (other views in the same process) observe the
        // sign-out the same way a provider-initiated one arrives.
        self.events.emit(AuthEvent::SignedOut);

        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn provider() -> HttpIdentityProvider {
        let config = IdentityConfig::new(
            "https://id.sidraos.app",
            SecretString::from("anon-key".to_string()),
        )
        .unwrap();
        HttpIdentityProvider::new(config).unwrap()
    }

    #[test]
    fn endpoints_join_against_base() {
        let provider = provider();
        assert_eq!(
            provider.endpoint("auth/v1/user").unwrap().as_str(),
            "https://id.sidraos.app/auth/v1/user"
        );
        assert_eq!(
            provider.endpoint("rest/v1/profiles").unwrap().as_str(),
            "https://id.sidraos.app/rest/v1/profiles"
        );
    }

    #[tokio::test]
    async fn subscribe_attaches_to_local_hub() {
        let provider = provider();
        let _sub = provider.subscribe();
        assert_eq!(provider.events().subscriber_count(), 1);
    }
}
