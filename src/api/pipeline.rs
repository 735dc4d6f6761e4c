//! Request pipeline middleware.
//!
//! [`routes::create_router`](super::routes::create_router) assembles these in
//! a fixed order: documentation, HTTPS enforcement, routing, authorization,
//! content negotiation, dispatch. Error reporting and version headers wrap
//! the whole pipeline.

use std::any::Any;

use axum::Json;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderName, HeaderValue, Method, Uri, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use super::error::{ApiError, ErrorDetail, ErrorResponse};
use super::state::AppState;

/// Response header listing every mapped API version.
pub const SUPPORTED_VERSIONS_HEADER: HeaderName = HeaderName::from_static("api-supported-versions");

/// Standard port, omitted from redirect targets.
const DEFAULT_HTTPS_PORT: u16 = 443;

// =============================================================================
// Authorization
// =============================================================================

/// Decides whether a routed request may reach its controller.
#[cfg_attr(test, mockall::automock)]
pub trait AccessPolicy: Send + Sync {
    /// `route` is the matched route template, e.g. `/api/v0.9/drivers/{id}`.
    fn permits(&self, method: &Method, route: &str) -> bool;
}

/// Policy that lets every request through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn permits(&self, _method: &Method, _route: &str) -> bool {
        true
    }
}

/// Consult the access policy. Installed with `route_layer`, so it only runs
/// once routing has resolved a controller.
pub async fn authorize(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if !state.policy().permits(request.method(), &route) {
        state
            .log()
            .warn("access_denied", &format!("{} {}", request.method(), route));
        return ApiError::Forbidden {
            path: request.uri().path().to_string(),
        }
        .into_response();
    }
    next.run(request).await
}

// =============================================================================
// Content negotiation
// =============================================================================

/// Media types every controller can produce.
const PRODUCED_MEDIA_TYPES: &[(&str, &str)] = &[("application", "json"), ("text", "json")];

/// Reject requests whose `Accept` header rules out JSON. Installed with
/// `route_layer`, after authorization.
pub async fn negotiate_content(request: Request, next: Next) -> Response {
    let ranges: Vec<&str> = request
        .headers()
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|range| !range.is_empty())
        .collect();

    if ranges.is_empty() || ranges.iter().any(|range| accepts_json(range)) {
        return next.run(request).await;
    }
    ApiError::NotAcceptable {
        accept: ranges.join(", "),
    }
    .into_response()
}

/// Whether one `Accept` media range admits a produced type.
fn accepts_json(range: &str) -> bool {
    let mut parts = range.split(';');
    let media = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let refused = parts.any(|param| {
        param
            .trim()
            .strip_prefix("q=")
            .and_then(|q| q.trim().parse::<f32>().ok())
            .is_some_and(|q| q <= 0.0)
    });
    if refused {
        return false;
    }

    let Some((kind, subtype)) = media.split_once('/') else {
        return false;
    };
    PRODUCED_MEDIA_TYPES.iter().any(|(produced_kind, produced_subtype)| {
        kind == "*" || (kind == *produced_kind && (subtype == "*" || subtype == *produced_subtype))
    })
}

// =============================================================================
// HTTPS enforcement
// =============================================================================

/// Redirect plain HTTP to HTTPS when an HTTPS port is configured.
pub async fn enforce_https(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let target = state
        .https_port()
        .filter(|_| !is_secure(&request))
        .and_then(|port| redirect_target(&request, port));
    match target {
        Some(location) => Redirect::temporary(&location).into_response(),
        None => next.run(request).await,
    }
}

fn is_secure(request: &Request) -> bool {
    request.uri().scheme_str() == Some("https")
        || request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

fn redirect_target(request: &Request, port: u16) -> Option<String> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host())
        .map(strip_port)?;
    let path = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    if port == DEFAULT_HTTPS_PORT {
        Some(format!("https://{host}{path}"))
    } else {
        Some(format!("https://{host}:{port}{path}"))
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

// =============================================================================
// Routing failures
// =============================================================================

/// Fallback for requests no controller claimed.
///
/// A request under `/api/` whose version segment is not mapped is reported as
/// an unsupported version; it is never handed to another version's
/// controllers.
pub async fn route_not_found(State(state): State<AppState>, uri: Uri) -> ApiError {
    let path = uri.path();
    if let Some(rest) = path.strip_prefix("/api/") {
        let token = rest.split('/').next().unwrap_or_default();
        if state.versions().resolve(token).is_none() {
            return ApiError::UnsupportedVersion {
                version: token.to_string(),
                supported: state.versions().supported(),
            };
        }
    }
    ApiError::Routing {
        path: path.to_string(),
    }
}

// =============================================================================
// Error reporting
// =============================================================================

/// Log server errors through the logging service and, in development only,
/// expose their detail in the response body.
pub async fn handle_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = next.run(request).await;
    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };

    let status = response.status();
    state
        .log()
        .request_failed(method.as_str(), &uri.to_string(), status.as_u16(), &detail);

    if !state.environment().is_development() {
        return response;
    }
    let body = ErrorResponse {
        detail: Some(detail),
        ..ErrorResponse::from(&ApiError::Internal {
            detail: String::new(),
        })
    };
    (status, Json(body)).into_response()
}

/// Turn a handler panic into an ordinary internal error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal {
        detail: format!("handler panicked: {message}"),
    }
    .into_response()
}

/// Advertise the mapped API versions on every response.
pub async fn report_api_versions(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&state.versions().supported()) {
        response
            .headers_mut()
            .insert(SUPPORTED_VERSIONS_HEADER, value);
    }
    response
}
