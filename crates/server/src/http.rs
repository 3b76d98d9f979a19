//! Local HTTP front.
//!
//! Pages point at this listener instead of the origin. Every request is
//! turned into a [`ProxyRequest`], answered by the proxy (or sent straight
//! through when the proxy does not intercept it) and written back with an
//! `x-biblio-source` header naming where the answer came from.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use url::Url;

use biblio_core::proxy::{Intercept, RequestMode};
use biblio_core::{Error, OfflineProxy, ProxyRequest, ProxyResponse};

/// Header naming the source of an answer.
pub const SOURCE_HEADER: &str = "x-biblio-source";

/// Request bodies beyond this are refused.
const MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Router that sends every path through the proxy.
pub fn router(proxy: Arc<OfflineProxy>) -> Router {
    Router::new().fallback(intercept).with_state(proxy)
}

async fn intercept(State(proxy): State<Arc<OfflineProxy>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_REQUEST_BYTES).await {
        Ok(body) => body,
        Err(e) => return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response(),
    };

    let request = match to_proxy_request(&proxy.config().scope, &parts, body) {
        Ok(request) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match proxy.handle(&request).await {
        Intercept::Respond(response) => {
            let source = response.source.as_str();
            to_response(response, source)
        }
        Intercept::Passthrough => match proxy.passthrough(&request).await {
            Ok(response) => to_response(response, "passthrough"),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "passthrough failed");
                (StatusCode::BAD_GATEWAY, [(SOURCE_HEADER, "passthrough")], e.to_string()).into_response()
            }
        },
    }
}

/// Build a proxy request from an inbound HTTP request.
///
/// Origin-form targets (`/data/books.json`) are resolved inside the scope;
/// absolute-form targets are taken as-is.
pub fn to_proxy_request(scope: &Url, parts: &Parts, body: Bytes) -> Result<ProxyRequest, Error> {
    let url = if parts.uri.scheme().is_some() {
        Url::parse(&parts.uri.to_string()).map_err(|e| Error::InvalidUrl(format!("{}: {e}", parts.uri)))?
    } else {
        let target = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        scope
            .join(target.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{target}: {e}")))?
    };

    let method = parts.method.as_str().to_string();
    let mode = if is_navigation(&parts.method, &parts.headers) { RequestMode::Navigate } else { RequestMode::Subresource };

    let headers = parts
        .headers
        .iter()
        .filter(|(name, _)| forwardable(name) && name.as_str() != "host")
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();

    let body = if body.is_empty() { None } else { Some(body) };

    Ok(ProxyRequest { method, url, mode, headers, body })
}

/// `Sec-Fetch-Mode: navigate`, or a GET that accepts HTML.
fn is_navigation(method: &Method, headers: &HeaderMap) -> bool {
    if let Some(mode) = headers.get("sec-fetch-mode").and_then(|v| v.to_str().ok()) {
        return mode.eq_ignore_ascii_case("navigate");
    }
    *method == Method::GET
        && headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
}

/// Write a proxy response back to the page.
pub fn to_response(response: ProxyResponse, source: &'static str) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) else {
            tracing::debug!(header = %name, "dropping unrepresentable header");
            continue;
        };
        if forwardable(&name) {
            headers.append(name, value);
        }
    }
    headers.insert(SOURCE_HEADER, HeaderValue::from_static(source));

    (status, headers, Body::from(response.body)).into_response()
}

fn forwardable(name: &HeaderName) -> bool {
    let name = name.as_str();
    !HOP_BY_HOP.contains(&name) && name != header::CONTENT_LENGTH.as_str()
}
