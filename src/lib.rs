//! # SidraOS Edge
//!
//! `sidra-edge` is the request edge for the SidraOS web application. It owns
//! the two pieces of session plumbing that every page load depends on:
//!
//! - **Edge routing guard** — runs once per inbound request, resolves the
//!   locale prefix (`/ar/...`, `/en/...`), refreshes the session against the
//!   external identity provider, and decides whether the request passes
//!   through to the upstream renderer or is redirected by auth policy.
//! - **Session synchronizer** — the client-runtime half: an explicit auth
//!   state container hydrated from the provider at startup, kept live through
//!   an auth event subscription, with the `{user, authenticated}` subset
//!   persisted across restarts.
//!
//! ## Route policy
//!
//! Routes are classified by path prefix (after the locale segment is removed)
//! into exactly one of `Protected`, `AuthOnly`, or `Public`. The protected
//! and auth-only prefix lists are validated for disjointness at startup;
//! overlapping lists would make the two redirect rules fire against each
//! other across requests.
//!
//! ## Degraded mode
//!
//! When no identity provider credentials are configured the guard still
//! performs locale resolution but skips session resolution entirely and never
//! issues an auth redirect. This is a supported mode for local development,
//! not an error.

pub mod cli;
pub mod edge;
pub mod identity;
pub mod locale;
pub mod policy;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
