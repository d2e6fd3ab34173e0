//! Per-request routing guard.
//!
//! Runs once for every non-bypassed request: resolves the locale prefix,
//! exchanges cookies with the identity provider, and produces exactly one
//! outcome. Refreshed session cookies are relayed on every response path,
//! redirects included; on a cookie-name collision the session cookie wins.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::Response,
};
use tracing::warn;
use url::form_urlencoded;

use super::EdgeState;
use crate::identity::AuthUser;
use crate::locale::{split_locale, Locale};
use crate::policy::{is_bypassed, RouteClass, RoutePolicy};

/// Whether session resolution ran for this request.
#[derive(Clone, Debug)]
pub enum SessionGate {
    /// No provider configured; auth policy is not enforced.
    Disabled,
    /// Session exchange completed (possibly with no user).
    Resolved(Option<AuthUser>),
}

/// The guard's routing decision. Exactly one per request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Locale-correct and policy-approved: hand the request to the inner
    /// service.
    Forward,
    /// Protected route without a session.
    RedirectToLogin { locale: Locale, redirect_to: String },
    /// Auth-only route with an active session.
    RedirectToOverview { locale: Locale },
    /// Path without a valid locale prefix; send to the default-locale
    /// equivalent.
    RedirectToLocale { path: String },
}

impl Decision {
    /// The redirect target, if the decision is a redirect.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Forward => None,
            Self::RedirectToLogin {
                locale,
                redirect_to,
            } => {
                let query: String = form_urlencoded::Serializer::new(String::new())
                    .append_pair("redirectTo", redirect_to)
                    .finish();
                Some(format!("/{locale}/login?{query}"))
            }
            Self::RedirectToOverview { locale } => Some(format!("/{locale}/overview")),
            Self::RedirectToLocale { path } => Some(path.clone()),
        }
    }
}

/// Pure policy decision for one request path.
///
/// Auth policy is evaluated on the locale-stripped path and takes precedence
/// over locale normalization, so an unprefixed protected path still lands on
/// the login redirect rather than bouncing through the locale redirect first.
#[must_use]
pub fn decide(path: &str, gate: &SessionGate, policy: &RoutePolicy) -> Decision {
    let (prefix, path_without_locale) = split_locale(path);
    let locale = prefix.unwrap_or_default();

    if let SessionGate::Resolved(user) = gate {
        match policy.classify(path_without_locale) {
            RouteClass::Protected if user.is_none() => {
                return Decision::RedirectToLogin {
                    locale,
                    redirect_to: path.to_string(),
                };
            }
            RouteClass::AuthOnly if user.is_some() => {
                return Decision::RedirectToOverview { locale };
            }
            _ => {}
        }
    }

    match prefix {
        Some(_) => Decision::Forward,
        None => {
            let suffix = if path == "/" { "" } else { path };
            Decision::RedirectToLocale {
                path: format!("/{}{suffix}", Locale::default()),
            }
        }
    }
}

/// Axum middleware wrapping [`decide`] with session resolution and cookie
/// relay.
pub async fn guard(State(state): State<EdgeState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_bypassed(&path) {
        return next.run(request).await;
    }

    let cookies = request
        .headers()
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let (gate, refreshed_cookies) = match &state.provider {
        None => (SessionGate::Disabled, Vec::new()),
        Some(provider) => match provider.current_user(cookies.as_deref()).await {
            Ok(lookup) => (SessionGate::Resolved(lookup.user), lookup.refreshed_cookies),
            Err(err) => {
                // An ambiguous session is never treated as authenticated.
                warn!("Session exchange failed, treating as unauthenticated: {err}");
                (SessionGate::Resolved(None), Vec::new())
            }
        },
    };

    let decision = decide(&path, &gate, &state.policy);
    let mut response = match &decision {
        Decision::Forward => next.run(request).await,
        Decision::RedirectToLocale { .. } => {
            // Locale normalization keeps the query string intact.
            let mut location = decision.location().unwrap_or_default();
            if let Some(query) = request.uri().query() {
                location.push('?');
                location.push_str(query);
            }
            redirect(&location)
        }
        Decision::RedirectToLogin { .. } | Decision::RedirectToOverview { .. } => {
            redirect(&decision.location().unwrap_or_default())
        }
    };

    merge_set_cookies(response.headers_mut(), &refreshed_cookies);
    response
}

fn redirect(location: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
        }
        Err(err) => {
            warn!("Unencodable redirect location {location:?}: {err}");
            *response.status_mut() = StatusCode::BAD_REQUEST;
        }
    }
    response
}

/// Append refreshed session cookies, replacing any same-named cookie set
/// further in.
fn merge_set_cookies(headers: &mut HeaderMap, refreshed: &[String]) {
    if refreshed.is_empty() {
        return;
    }

    let incoming: Vec<&str> = refreshed.iter().filter_map(|raw| cookie_name(raw)).collect();
    let existing: Vec<HeaderValue> = headers.get_all(SET_COOKIE).iter().cloned().collect();
    headers.remove(SET_COOKIE);

    for value in existing {
        let replaced = value
            .to_str()
            .ok()
            .and_then(cookie_name)
            .is_some_and(|name| incoming.contains(&name));
        if !replaced {
            headers.append(SET_COOKIE, value);
        }
    }

    for raw in refreshed {
        match HeaderValue::from_str(raw) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(err) => warn!("Dropping malformed refreshed cookie: {err}"),
        }
    }
}

fn cookie_name(raw: &str) -> Option<&str> {
    raw.split(';').next()?.split('=').next().map(str::trim)
}
