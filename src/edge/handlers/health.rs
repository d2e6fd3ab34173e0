use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method},
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::super::EdgeState;
use crate::GIT_COMMIT_HASH;

// axum handler for health
pub async fn health(method: Method, State(state): State<EdgeState>) -> impl IntoResponse {
    let body = if method == Method::GET {
        Json(json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "build": GIT_COMMIT_HASH,
            "auth": if state.provider.is_some() { "enabled" } else { "disabled" },
            "upstream": state.upstream.as_str(),
        }))
        .into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    (headers, body)
}
