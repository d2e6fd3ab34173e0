//! Pass-through to the upstream renderer.
//!
//! Requests the guard lets through are forwarded to the SidraOS application
//! server. Hop-by-hop headers are stripped in both directions; an
//! unreachable upstream answers 502 rather than surfacing a client error.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;
use url::Url;

use super::EdgeState;

/// Forwarded request bodies beyond this are rejected upstream anyway.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || name == header::HOST
}

fn upstream_url(base: &Url, request: &Request) -> Result<Url> {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path(), |pq| pq.as_str());
    base.join(path_and_query)
        .with_context(|| format!("Invalid upstream path: {path_and_query}"))
}

pub async fn forward(State(state): State<EdgeState>, request: Request) -> Response {
    match forward_inner(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            error!("Upstream forward failed: {err}");
            (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response()
        }
    }
}

async fn forward_inner(state: &EdgeState, request: Request) -> Result<Response> {
    let url = upstream_url(&state.upstream, &request)?;
    let method = request.method().clone();

    let mut headers = request.headers().clone();
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(header::HOST);

    let body = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .context("Failed to buffer request body")?;

    let upstream_response = state
        .http
        .request(method, url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .context("Upstream request failed")?;

    let status = upstream_response.status();
    let response_headers = upstream_response.headers().clone();
    let bytes = upstream_response
        .bytes()
        .await
        .context("Failed to read upstream response body")?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    for (name, value) in &response_headers {
        if !is_hop_by_hop(name) {
            response.headers_mut().append(name.clone(), value.clone());
        }
    }

    Ok(response)
}
