//! Vhost dispatch and backend forwarding.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, uri::Scheme, HeaderName, HeaderValue, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};

use crate::http::server::EdgeState;
use crate::routing::Route;

/// Connection-scoped headers never forwarded to a backend.
const HOP_BY_HOP: [HeaderName; 5] = [
    header::CONNECTION,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Route by Host and forward, or answer through the overload guard.
pub async fn vhost_handler(State(state): State<EdgeState>, request: Request<Body>) -> Response {
    let host = request_host(&request);
    let route = host
        .as_deref()
        .and_then(|h| state.routes.load().lookup(h));

    let Some(route) = route else {
        tracing::warn!(host = host.as_deref().unwrap_or("-"), "No route for host");
        return state.guard.on_route_not_found().await;
    };

    if let Some(auth) = &route.auth {
        if !auth.verify(request.headers().get(header::AUTHORIZATION)) {
            tracing::debug!(host = host.as_deref().unwrap_or("-"), "Basic auth failed");
            return state.guard.on_unauthorized();
        }
    }

    forward(&state, &route, request).await
}

/// Host header, or the URI authority for HTTP/2 requests.
fn request_host(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
}

async fn forward(state: &EdgeState, route: &Route, request: Request<Body>) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let (mut parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let uri = match Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(route.backend.to_string().as_str())
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot build backend URI");
            return (StatusCode::BAD_REQUEST, "Invalid request target").into_response();
        }
    };
    parts.uri = uri;
    parts.version = Version::HTTP_11;

    for name in HOP_BY_HOP {
        parts.headers.remove(name);
    }
    if let Some(peer) = peer {
        if let Ok(value) = HeaderValue::from_str(&peer.ip().to_string()) {
            parts.headers.append(X_FORWARDED_FOR, value);
        }
    }

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => response.map(Body::new),
        Err(e) => {
            tracing::error!(backend = %route.backend, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
