use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
    Router,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

use crate::identity::{HttpIdentityProvider, IdentityConfig, IdentityProvider};
use crate::policy::RoutePolicy;
use crate::APP_USER_AGENT;

pub mod guard;
pub mod handlers;
pub mod proxy;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Server configuration assembled by the CLI layer.
#[derive(Debug)]
pub struct EdgeConfig {
    pub port: u16,
    pub upstream: Url,
    /// `None` runs the edge in degraded no-auth mode.
    pub identity: Option<IdentityConfig>,
}

/// Shared per-request state. Stateless across requests: everything here is
/// read-only after startup.
#[derive(Clone)]
pub struct EdgeState {
    pub provider: Option<Arc<dyn IdentityProvider>>,
    pub policy: Arc<RoutePolicy>,
    pub upstream: Url,
    pub http: reqwest::Client,
}

/// Build the edge router: health endpoint, guard middleware, upstream
/// fallback, and the tracing/request-id layers.
#[must_use]
pub fn router(state: EdgeState) -> Router {
    Router::new()
        .route("/health", get(handlers::health).options(handlers::health))
        .fallback(proxy::forward)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(middleware::from_fn_with_state(state.clone(), guard::guard)),
        )
        .with_state(state)
}

/// Start the server
/// # Errors
/// Return error if the route policy is invalid or the server fails to start
pub async fn new(config: EdgeConfig) -> Result<()> {
    let policy = RoutePolicy::default();
    // Overlapping prefix tables produce redirect loops; refuse to start.
    policy.validate()?;

    let provider: Option<Arc<dyn IdentityProvider>> = match config.identity {
        Some(identity) => Some(Arc::new(HttpIdentityProvider::new(identity)?)),
        None => {
            info!("No identity provider configured, running without auth gating");
            None
        }
    };

    let http = reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .context("Failed to build upstream client")?;

    let state = EdgeState {
        provider,
        policy: Arc::new(policy),
        upstream: config.upstream,
        http,
    };

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{}", config.port)).await?;

    info!("Listening on [::]:{}", config.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
