//! HTTP route handlers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Form, Router,
    extract::{ConnectInfo, FromRequest, Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{MethodRouter, get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::health::Health;
use crate::service::{HashService, HealthSnapshot, SubmitError};
use crate::store::SlotView;
use crate::version::VersionInfo;

/// Where `GET /` sends visitors.
pub const README_URL: &str = "https://github.com/dbyington/hash-o-matic#readme";

const NOT_READY_STATUS: &str = "Hash string not ready";

#[derive(Debug, Default, Deserialize)]
struct HashRequest {
    #[serde(default, alias = "Password")]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashAccepted {
    hash_id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashReady {
    hash_string: String,
}

#[derive(Debug, Serialize)]
struct HashPending {
    status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: Health,
    pub outstanding: usize,
    pub tickets: usize,
    pub version: VersionInfo,
}

impl From<HealthSnapshot> for HealthCheckResponse {
    fn from(snapshot: HealthSnapshot) -> Self {
        Self {
            status: snapshot.state,
            outstanding: snapshot.outstanding,
            tickets: snapshot.tickets,
            version: snapshot.version,
        }
    }
}

/// JSON error body: `{"ErrorMessage": "<reason>[: <detail>]"}`.
fn error_response(status: StatusCode, detail: Option<&str>) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    let message = match detail {
        Some(detail) => format!("{reason}: {detail}"),
        None => reason.to_string(),
    };
    (
        status,
        Json(serde_json::json!({ "ErrorMessage": message })),
    )
        .into_response()
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .unwrap_or("")
}

/// Pull the password out of a JSON or form-encoded body.
async fn extract_password(request: Request) -> Option<String> {
    let content_type = content_type(request.headers()).to_owned();
    let body = match content_type.as_str() {
        "application/json" => Json::<HashRequest>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .map_err(|e| debug!(error = %e, "Rejected JSON body"))
            .ok()?,
        "application/x-www-form-urlencoded" => Form::<HashRequest>::from_request(request, &())
            .await
            .map(|Form(body)| body)
            .map_err(|e| debug!(error = %e, "Rejected form body"))
            .ok()?,
        other => {
            debug!(content_type = other, "Unsupported content type for /hash");
            return None;
        }
    };
    body.password
}

async fn create_hash(State(service): State<Arc<HashService>>, request: Request) -> Response {
    let started = Instant::now();
    let password = extract_password(request).await.unwrap_or_default();

    let response = match service.submit(&password) {
        Ok(ticket) => (
            StatusCode::ACCEPTED,
            Json(HashAccepted {
                hash_id: ticket.get(),
            }),
        )
            .into_response(),
        Err(e @ SubmitError::EmptySecret) => {
            error_response(StatusCode::BAD_REQUEST, Some(&e.to_string()))
        }
        Err(e @ SubmitError::ShuttingDown) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, Some(&e.to_string()))
        }
    };

    service.record_submission_time(started.elapsed());
    response
}

async fn get_hash(State(service): State<Arc<HashService>>, Path(id): Path<String>) -> Response {
    // Only plain decimal ids; signs and overflow are simply unknown tickets.
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return error_response(StatusCode::NOT_FOUND, None);
    }
    let Ok(raw) = id.parse::<i64>() else {
        return error_response(StatusCode::NOT_FOUND, None);
    };
    debug!(hash_id = raw, "Hash id requested");

    match service.lookup(raw) {
        SlotView::NotFound => error_response(StatusCode::NOT_FOUND, None),
        SlotView::Pending => (
            StatusCode::ACCEPTED,
            Json(HashPending {
                status: NOT_READY_STATUS,
            }),
        )
            .into_response(),
        SlotView::Ready(hash_string) => {
            (StatusCode::OK, Json(HashReady { hash_string })).into_response()
        }
    }
}

async fn shutdown(State(service): State<Arc<HashService>>) -> impl IntoResponse {
    info!("Shutdown requested via HTTP");
    service.request_shutdown();
    (StatusCode::ACCEPTED, "shutting down...")
}

async fn stats(State(service): State<Arc<HashService>>) -> impl IntoResponse {
    (StatusCode::OK, Json(service.stats()))
}

async fn health_check(State(service): State<Arc<HashService>>) -> Json<HealthCheckResponse> {
    Json(service.health().into())
}

async fn index() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, README_URL)])
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, None)
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, None)
}

/// Access log plus in-flight registration for every request.
async fn track_request(
    State(service): State<Arc<HashService>>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = service.track_request();

    let method = request.method().clone();
    let uri = request.uri().clone();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    info!(%method, %uri, %remote, %user_agent, "Incoming request");
    let response = next.run(request).await;
    info!(%method, %uri, %remote, status = response.status().as_u16(), "Request complete");
    response
}

fn only(method_router: MethodRouter<Arc<HashService>>) -> MethodRouter<Arc<HashService>> {
    method_router.fallback(method_not_allowed)
}

pub fn routes(service: Arc<HashService>) -> Router {
    Router::new()
        .route("/", only(get(index)))
        .route("/hash", only(post(create_hash)))
        .route("/hash/{id}", only(get(get_hash)))
        .route("/shutdown", only(put(shutdown)))
        .route("/stats", only(get(stats)))
        .route("/health-check", only(get(health_check)))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&service),
            track_request,
        ))
        .with_state(service)
}
