//! HTTP surface over the orchestrator.
//!
//! Routes:
//! - `POST /v1/summarize`: summarize a JSON [`SummaryRequest`]
//! - `GET /v1/healthz`: dependency health, 503 when nothing is reachable
//! - `GET /`: service info

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::types::{HealthReport, HealthStatus, SummaryRequest, SummaryResult};
use crate::{Orchestrator, SummaryError};

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    api_keys: Arc<HashSet<String>>,
    trust_forwarded_for: bool,
}

impl AppState {
    /// `api_keys` is the bearer allow-list; empty disables authentication.
    pub fn new(orchestrator: Arc<Orchestrator>, api_keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            orchestrator,
            api_keys: Arc::new(api_keys.into_iter().collect()),
            trust_forwarded_for: false,
        }
    }

    /// Identify unauthenticated callers by the first `x-forwarded-for` hop
    /// instead of the peer address. Only safe behind a proxy that sets it.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }
}

/// Build the router with request-id, tracing and security header layers.
pub fn router(state: AppState) -> Router {
    let api_v1 = Router::new()
        .route("/summarize", post(summarize))
        .route("/healthz", get(healthz));

    Router::new()
        .route("/", get(root))
        .nest("/v1", api_v1)
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
}

/// JSON error body: `{ error, message, request_id }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    request_id: Option<String>,
    retry_after_secs: Option<u64>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    request_id: Option<&'a str>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            request_id: None,
            retry_after_secs: None,
        }
    }

    fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid API key",
        )
    }

    fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::Validation(message) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
            }
            SummaryError::RateLimited { window, .. } => {
                let mut api = Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limited",
                    err.to_string(),
                );
                api.retry_after_secs = Some(window.as_secs().max(1));
                api
            }
            other => {
                warn!(error = %other, "unexpected error reached the HTTP layer");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.code,
            message: &self.message,
            request_id: self.request_id.as_deref(),
        });
        let mut response = (self.status, body).into_response();

        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(&REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller identity used for admission.
///
/// With authentication on, the API key itself (the limiter only ever sees
/// its digest). Otherwise the peer address, or the first `x-forwarded-for`
/// hop when the state trusts it. A connection without peer info falls into
/// a shared anonymous bucket.
fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> Result<String, ApiError> {
    if state.auth_enabled() {
        return match bearer_token(headers) {
            Some(token) if state.api_keys.contains(token) => Ok(format!("key:{token}")),
            Some(token) => {
                let digest = format!("{:x}", Sha256::digest(token.as_bytes()));
                warn!(key_digest = &digest[..12], "rejected unknown API key");
                Err(ApiError::unauthorized())
            }
            None => Err(ApiError::unauthorized()),
        };
    }

    if let Some(ip) = forwarded_for(headers).filter(|_| state.trust_forwarded_for) {
        return Ok(format!("ip:{ip}"));
    }
    Ok(match peer {
        Some(addr) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    })
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
}

async fn summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<SummaryResult>, ApiError> {
    let request_id = request_id(&headers);
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = authenticate(&state, &headers, peer)
        .map_err(|e| e.with_request_id(request_id.clone()))?;

    let Json(request) = payload.map_err(|rejection| {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            rejection.body_text(),
        )
        .with_request_id(request_id.clone())
    })?;

    state
        .orchestrator
        .summarize(&identity, request)
        .await
        .map(Json)
        .map_err(|e| ApiError::from(e).with_request_id(request_id))
}

async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.orchestrator.health().await;
    let status = match report.status {
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Error => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "abridge",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
        "health": "/v1/healthz",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(
            bearer_token(&headers(&[("authorization", "Bearer abc")])),
            Some("abc")
        );
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer  ")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    fn state(trust_forwarded_for: bool) -> AppState {
        let orchestrator = crate::Abridge::builder().build().unwrap();
        AppState::new(Arc::new(orchestrator), Vec::new()).trust_forwarded_for(trust_forwarded_for)
    }

    #[test]
    fn identity_is_peer_ip_by_default() {
        let peer: SocketAddr = "203.0.113.7:51000".parse().unwrap();
        let forwarded = headers(&[("x-forwarded-for", "198.51.100.4")]);

        let identity = authenticate(&state(false), &forwarded, Some(peer)).unwrap();
        assert_eq!(identity, "ip:203.0.113.7");
        assert_eq!(
            authenticate(&state(false), &HeaderMap::new(), None).unwrap(),
            "anonymous"
        );
    }

    #[test]
    fn forwarded_for_only_when_trusted() {
        let peer: SocketAddr = "10.0.0.1:40000".parse().unwrap();
        let forwarded = headers(&[("x-forwarded-for", "198.51.100.4, 10.0.0.1")]);

        let identity = authenticate(&state(true), &forwarded, Some(peer)).unwrap();
        assert_eq!(identity, "ip:198.51.100.4");
        let identity = authenticate(&state(true), &HeaderMap::new(), Some(peer)).unwrap();
        assert_eq!(identity, "ip:10.0.0.1");
    }

    #[test]
    fn rate_limited_maps_to_429_with_retry_after() {
        let err = SummaryError::RateLimited {
            limit: 2,
            window: std::time::Duration::from_secs(60),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    }

    #[test]
    fn validation_maps_to_422() {
        let response = ApiError::from(SummaryError::Validation("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
