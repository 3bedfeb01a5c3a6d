//! # REST API
//!
//! Builds the axum router for the registry and verification node. All
//! handlers share [`AppState`] through axum's `State` extractor and are thin
//! wrappers over `veripay_protocol`.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                        |
//! |--------|--------------------------|------------------------------------|
//! | GET    | `/health`                | Liveness check                     |
//! | POST   | `/register`              | Register a unique key hash         |
//! | GET    | `/check/:hash`           | Has this hash been issued?         |
//! | POST   | `/accumulator/leaves`    | Append a leaf to the accumulator   |
//! | GET    | `/accumulator`           | Current root and leaf count        |
//! | POST   | `/verify/payment-proof`  | Structural check of a shared proof |
//! | POST   | `/verify/combined`       | Identity + payment + binding check |

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use veripay_protocol::crypto::{FieldElement, SharedBackend};
use veripay_protocol::identity::{
    check_with_timeout, validate_unique_key_hash, RegistrationOutcome, RegistryStatus,
    UniqueKeyRegistry, UniquenessAccumulator,
};
use veripay_protocol::payment::verify_structure;
use veripay_protocol::verify::CombinedVerifier;
use veripay_protocol::ProtocolError;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state available to all request handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Hash backend selected at startup.
    pub backend: SharedBackend,
    pub registry: Arc<dyn UniqueKeyRegistry>,
    /// Single writer: every append holds the write guard.
    pub accumulator: Arc<RwLock<UniquenessAccumulator>>,
    pub verifier: CombinedVerifier,
    pub metrics: SharedMetrics,
    /// Upper bound on a registry lookup before `/check` reports unknown.
    pub lookup_timeout: Duration,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the API [`Router`] with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/register", post(register_handler))
        .route("/check/:hash", get(check_handler))
        .route("/accumulator", get(accumulator_handler))
        .route("/accumulator/leaves", post(append_leaf_handler))
        .route("/verify/payment-proof", post(verify_payment_proof_handler))
        .route("/verify/combined", post(verify_combined_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(alias = "uniqueKeyHash")]
    pub unique_key_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppendLeafRequest {
    /// `0x` hex or decimal field element.
    pub leaf: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatorResponse {
    pub root: FieldElement,
    pub leaf_count: usize,
}

/// Error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map a library error to an HTTP response.
fn protocol_error_response(err: &ProtocolError) -> Response {
    let status = match err {
        ProtocolError::Validation(_) | ProtocolError::Malformed(_) | ProtocolError::Signature(_) => {
            StatusCode::BAD_REQUEST
        }
        ProtocolError::Duplicate { .. } => StatusCode::CONFLICT,
        ProtocolError::Storage(_) => {
            tracing::error!(error = %err, "storage failure while handling request");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": state.version,
        "hashBackend": state.backend.kind(),
    }))
}

/// `POST /register`
async fn register_handler(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let hash = match body {
        Ok(Json(RegisterRequest {
            unique_key_hash: Some(hash),
        })) => hash,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, "unique_key_hash is required"),
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match state.registry.register(&hash).await {
        Ok(RegistrationOutcome::Registered(record)) => {
            state.metrics.registrations_total.inc();
            (
                StatusCode::OK,
                Json(json!({
                    "registered": true,
                    "id": record.id,
                    "issuedAt": record.issued_at,
                })),
            )
                .into_response()
        }
        Ok(RegistrationOutcome::Conflict(record)) => {
            state.metrics.registration_conflicts_total.inc();
            (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "unique key hash already registered",
                    "id": record.id,
                    "issuedAt": record.issued_at,
                })),
            )
                .into_response()
        }
        Err(e) => protocol_error_response(&e),
    }
}

/// `GET /check/:hash`
///
/// An unreachable or slow registry answers 503, never `issued: false`.
async fn check_handler(State(state): State<AppState>, Path(hash): Path<String>) -> Response {
    let hash = match validate_unique_key_hash(&hash) {
        Ok(h) => h,
        Err(e) => return protocol_error_response(&e),
    };

    match check_with_timeout(state.registry.as_ref(), &hash, state.lookup_timeout).await {
        RegistryStatus::Issued(record) => Json(json!({
            "issued": true,
            "issuedAt": record.issued_at,
            "id": record.id,
        }))
        .into_response(),
        RegistryStatus::NotIssued => Json(json!({ "issued": false })).into_response(),
        RegistryStatus::Unknown { reason } => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("registry status unknown: {reason}"),
        ),
    }
}

/// `GET /accumulator`
async fn accumulator_handler(State(state): State<AppState>) -> impl IntoResponse {
    let acc = state.accumulator.read().await;
    Json(AccumulatorResponse {
        root: acc.root(),
        leaf_count: acc.leaf_count(),
    })
}

/// `POST /accumulator/leaves`
async fn append_leaf_handler(
    State(state): State<AppState>,
    body: Result<Json<AppendLeafRequest>, JsonRejection>,
) -> Response {
    let raw = match body {
        Ok(Json(AppendLeafRequest { leaf: Some(leaf) })) => leaf,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, "leaf is required"),
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let leaf = match FieldElement::parse_scalar(&raw) {
        Ok(leaf) => leaf,
        Err(e) => return protocol_error_response(&e),
    };

    let mut acc = state.accumulator.write().await;
    match acc.append(leaf) {
        Ok(outcome) => {
            state.metrics.accumulator_appends_total.inc();
            state.metrics.accumulator_leaves.set(outcome.leaf_count as i64);
            Json(AccumulatorResponse {
                root: outcome.root,
                leaf_count: outcome.leaf_count,
            })
            .into_response()
        }
        Err(e) => {
            if e.is_duplicate() {
                state.metrics.accumulator_duplicates_total.inc();
            }
            protocol_error_response(&e)
        }
    }
}

/// `POST /verify/payment-proof`
async fn verify_payment_proof_handler(
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(candidate)) => Json(verify_structure(&candidate)).into_response(),
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    }
}

/// `POST /verify/combined`
async fn verify_combined_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(value) = match body {
        Ok(v) => v,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let started = Instant::now();
    let result = state.verifier.verify_json(value);
    state
        .metrics
        .verification_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(result) => {
            let verdict = if result.overall { "pass" } else { "fail" };
            state
                .metrics
                .verifications_total
                .with_label_values(&[verdict])
                .inc();
            Json(result).into_response()
        }
        Err(e) => protocol_error_response(&e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
