//! Route classification policy for the edge guard.
//!
//! Paths are classified after the locale prefix is removed. The protected
//! and auth-only prefix tables must be disjoint; otherwise the guard's two
//! redirect rules would chase each other across requests. Disjointness is
//! validated once at startup instead of being assumed.

use anyhow::{bail, Result};

/// Dashboard routes that require an authenticated session.
pub const PROTECTED_ROUTES: [&str; 5] = [
    "/overview",
    "/finance",
    "/productivity",
    "/second-brain",
    "/settings",
];

/// Visitor-only routes; authenticated users are redirected away from these.
pub const AUTH_ROUTES: [&str; 4] = ["/login", "/register", "/forgot-password", "/reset-password"];

/// Prefixes the guard never touches: the API namespace, framework assets,
/// the edge's own health endpoint, and dotted static files.
const BYPASS_PREFIXES: [&str; 4] = ["/api", "/_next", "/_vercel", "/health"];

/// Classification of a locale-stripped path. Exactly one class applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    AuthOnly,
    Public,
}

/// Enumerated route policy table.
#[derive(Clone, Debug)]
pub struct RoutePolicy {
    protected: Vec<String>,
    auth_only: Vec<String>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            protected: PROTECTED_ROUTES.iter().map(ToString::to_string).collect(),
            auth_only: AUTH_ROUTES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl RoutePolicy {
    #[must_use]
    pub fn new(protected: Vec<String>, auth_only: Vec<String>) -> Self {
        Self {
            protected,
            auth_only,
        }
    }

    /// Reject overlapping protected/auth-only prefixes.
    ///
    /// A path matching both tables would be redirected to login while
    /// unauthenticated and away from login while authenticated, producing a
    /// redirect loop.
    ///
    /// # Errors
    /// Returns an error naming the first overlapping pair.
    pub fn validate(&self) -> Result<()> {
        for p in &self.protected {
            for a in &self.auth_only {
                if p.starts_with(a.as_str()) || a.starts_with(p.as_str()) {
                    bail!("route policy overlap: protected prefix {p:?} and auth prefix {a:?}");
                }
            }
        }
        Ok(())
    }

    /// Classify a locale-stripped path. Pure prefix matching, in table order.
    #[must_use]
    pub fn classify(&self, path_without_locale: &str) -> RouteClass {
        if self
            .protected
            .iter()
            .any(|route| path_without_locale.starts_with(route.as_str()))
        {
            RouteClass::Protected
        } else if self
            .auth_only
            .iter()
            .any(|route| path_without_locale.starts_with(route.as_str()))
        {
            RouteClass::AuthOnly
        } else {
            RouteClass::Public
        }
    }
}

/// Requests the guard passes straight through to the inner service.
#[must_use]
pub fn is_bypassed(path: &str) -> bool {
    BYPASS_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
        || path.contains('.')
}
