//! Integration tests for the edge routing guard.
//!
//! Drives the full router (guard middleware, health endpoint, upstream
//! fallback) with in-process requests and a scripted identity provider.

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::util::ServiceExt;
use url::Url;
use uuid::Uuid;

use sidra_edge::edge::{router, EdgeState};
use sidra_edge::identity::{
    AuthEvent, AuthUser, EventHub, IdentityProvider, ProfileRow, Subscription, UserLookup,
};
use sidra_edge::policy::RoutePolicy;

/// Scripted provider: fixed session-exchange outcome, no profile store.
struct ScriptedProvider {
    user: Option<AuthUser>,
    refreshed_cookies: Vec<String>,
    fail_exchange: bool,
    hub: EventHub,
}

impl ScriptedProvider {
    fn anonymous() -> Self {
        Self {
            user: None,
            refreshed_cookies: Vec::new(),
            fail_exchange: false,
            hub: EventHub::new(),
        }
    }

    fn signed_in() -> Self {
        Self {
            user: Some(AuthUser {
                id: Uuid::new_v4(),
                email: Some("leila@sidraos.app".to_string()),
            }),
            ..Self::anonymous()
        }
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn current_user(&self, _cookies: Option<&str>) -> Result<UserLookup> {
        if self.fail_exchange {
            anyhow::bail!("identity provider unreachable");
        }
        Ok(UserLookup {
            user: self.user.clone(),
            refreshed_cookies: self.refreshed_cookies.clone(),
        })
    }

    async fn fetch_profile(&self, _user_id: Uuid) -> Result<Option<ProfileRow>> {
        Ok(None)
    }

    async fn sign_out(&self) -> Result<()> {
        self.hub.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}

/// Serve a stub upstream on an ephemeral port and return its base URL.
async fn spawn_upstream() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(|| async { "upstream ok" });
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

fn state(provider: Option<Arc<dyn IdentityProvider>>, upstream: Url) -> EdgeState {
    EdgeState {
        provider,
        policy: Arc::new(RoutePolicy::default()),
        upstream,
        http: reqwest::Client::new(),
    }
}

async fn request(app: Router, path: &str) -> axum::http::Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(path)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

fn location(response: &axum::http::Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn protected_route_without_session_redirects_to_login() {
    let upstream = Url::parse("http://127.0.0.1:9").unwrap();
    let app = router(state(Some(Arc::new(ScriptedProvider::anonymous())), upstream));

    let response = request(app, "/en/overview").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/en/login?redirectTo=%2Fen%2Foverview");
}

#[tokio::test]
async fn auth_route_with_session_redirects_to_overview() {
    let upstream = Url::parse("http://127.0.0.1:9").unwrap();
    let app = router(state(Some(Arc::new(ScriptedProvider::signed_in())), upstream));

    let response = request(app, "/ar/login").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/ar/overview");
}

#[tokio::test]
async fn public_route_passes_through_to_upstream() {
    let upstream = spawn_upstream().await;

    for provider in [ScriptedProvider::anonymous(), ScriptedProvider::signed_in()] {
        let app = router(state(Some(Arc::new(provider)), upstream.clone()));
        let response = request(app, "/en/pricing").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn unprefixed_path_is_redirected_to_default_locale() {
    let upstream = Url::parse("http://127.0.0.1:9").unwrap();
    let app = router(state(Some(Arc::new(ScriptedProvider::anonymous())), upstream));

    let response = request(app, "/pricing?plan=pro").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/en/pricing?plan=pro");
}

#[tokio::test]
async fn no_provider_never_issues_auth_redirects() {
    let upstream = spawn_upstream().await;
    let app = router(state(None, upstream.clone()));

    // Protected route passes straight through in degraded mode
    let response = request(app, "/en/overview").await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = router(state(None, upstream));
    let response = request(app, "/ar/login").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn exchange_failure_fails_closed_for_protected_routes() {
    let upstream = Url::parse("http://127.0.0.1:9").unwrap();
    let provider = ScriptedProvider {
        fail_exchange: true,
        ..ScriptedProvider::signed_in()
    };
    let app = router(state(Some(Arc::new(provider)), upstream));

    let response = request(app, "/en/settings").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/en/login?redirectTo=%2Fen%2Fsettings");
}

#[tokio::test]
async fn exchange_failure_fails_open_for_auth_routes() {
    let upstream = spawn_upstream().await;
    let provider = ScriptedProvider {
        fail_exchange: true,
        ..ScriptedProvider::signed_in()
    };
    let app = router(state(Some(Arc::new(provider)), upstream));

    // An ambiguous session is not authenticated, so login stays reachable
    let response = request(app, "/en/login").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refreshed_cookies_ride_on_redirects() {
    let upstream = Url::parse("http://127.0.0.1:9").unwrap();
    let provider = ScriptedProvider {
        refreshed_cookies: vec!["sb-access-token=fresh; Path=/; HttpOnly".to_string()],
        ..ScriptedProvider::anonymous()
    };
    let app = router(state(Some(Arc::new(provider)), upstream));

    let response = request(app, "/en/overview").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let cookies: Vec<&str> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    assert_eq!(cookies, vec!["sb-access-token=fresh; Path=/; HttpOnly"]);
}

#[tokio::test]
async fn refreshed_cookies_ride_on_pass_through() {
    let upstream = spawn_upstream().await;
    let provider = ScriptedProvider {
        refreshed_cookies: vec!["sb-refresh-token=next; Path=/".to_string()],
        ..ScriptedProvider::signed_in()
    };
    let app = router(state(Some(Arc::new(provider)), upstream));

    let response = request(app, "/en/pricing").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|value| value.to_str().unwrap_or_default().starts_with("sb-refresh-token=next")));
}

#[tokio::test]
async fn bypassed_prefixes_skip_the_guard() {
    let upstream = spawn_upstream().await;
    // A provider that fails loudly proves the guard never ran
    let provider = ScriptedProvider {
        fail_exchange: true,
        ..ScriptedProvider::anonymous()
    };
    let app = router(state(Some(Arc::new(provider)), upstream));

    let response = request(app, "/api/waitlist").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_auth_mode() {
    let upstream = Url::parse("http://127.0.0.1:9").unwrap();
    let app = router(state(None, upstream));

    let response = request(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["name"], "sidra-edge");
    assert_eq!(body["auth"], "disabled");
}
