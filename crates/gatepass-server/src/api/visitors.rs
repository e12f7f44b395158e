//! Visitor pass API endpoints.
//!
//! Front desk staff register visitors and get back a `VIS-####` pass id.
//! Gate staff scan that id: the first scan checks the visitor in, the second
//! checks them out, and anything after that (or after the pass expires) is
//! rejected.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use gatepass_core::{
    list_all, PassStatus, RegistrationRequest, ScanOutcome, VisitorPass, VisitorType,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiJson, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the visitors router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/visitors", get(list_visitors).post(register_visitor))
        .route("/api/visitors/scan", post(scan_pass))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for registering a visitor.
///
/// Every field is optional on the wire so that missing fields are reported
/// together rather than as a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "fullName": "Jane Doe",
    "phone": "555-0100",
    "visitorType": "multiday",
    "purpose": "Quarterly audit",
    "hostName": "Bob Smith",
    "validUntil": "2025-01-20"
}))]
pub struct RegisterVisitorRequest {
    /// Visitor's full name. Required.
    #[schema(example = "Jane Doe")]
    pub full_name: Option<String>,

    /// Visitor's phone number. Required.
    #[schema(example = "555-0100")]
    pub phone: Option<String>,

    /// `oneday` (default) or `multiday`.
    #[schema(example = "oneday")]
    pub visitor_type: Option<String>,

    /// Reason for the visit. Required.
    #[schema(example = "Quarterly audit")]
    pub purpose: Option<String>,

    /// Person being visited. Required.
    #[schema(example = "Bob Smith")]
    pub host_name: Option<String>,

    /// Last valid day for `multiday` passes (`YYYY-MM-DD` or RFC 3339).
    /// Ignored for `oneday`.
    #[schema(example = "2025-01-20")]
    pub valid_until: Option<String>,
}

impl From<RegisterVisitorRequest> for RegistrationRequest {
    fn from(req: RegisterVisitorRequest) -> Self {
        Self {
            full_name: req.full_name,
            phone: req.phone,
            visitor_type: req.visitor_type,
            purpose: req.purpose,
            host_name: req.host_name,
            valid_until: req.valid_until,
        }
    }
}

/// Request body for scanning a pass.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "passId": "VIS-4821" }))]
pub struct ScanRequest {
    /// The pass id printed on the visitor's pass. Required.
    #[schema(example = "VIS-4821")]
    pub pass_id: Option<String>,
}

/// A visitor pass as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": "01942f8e-7c3a-7d2b-9a41-3f5e6b7c8d9e",
    "passId": "VIS-4821",
    "fullName": "Jane Doe",
    "phone": "555-0100",
    "visitorType": "oneday",
    "purpose": "Quarterly audit",
    "hostName": "Bob Smith",
    "validUntil": "2025-01-15T23:59:59.999Z",
    "checkInTime": "2025-01-15T09:05:00Z",
    "checkOutTime": null,
    "status": "Active",
    "createdAt": "2025-01-15T08:45:00Z",
    "updatedAt": "2025-01-15T09:05:00Z"
}))]
pub struct VisitorResponse {
    /// Internal record id.
    pub id: Uuid,

    /// Human-facing pass id.
    #[schema(example = "VIS-4821")]
    pub pass_id: String,

    /// Visitor's full name.
    pub full_name: String,

    /// Visitor's phone number.
    pub phone: String,

    /// One-day or multi-day visit.
    pub visitor_type: VisitorType,

    /// Reason for the visit.
    pub purpose: String,

    /// Person being visited.
    pub host_name: String,

    /// Expiration instant (end of a local calendar day).
    pub valid_until: DateTime<Utc>,

    /// When the visitor checked in.
    #[schema(nullable)]
    pub check_in_time: Option<DateTime<Utc>>,

    /// When the visitor checked out.
    #[schema(nullable)]
    pub check_out_time: Option<DateTime<Utc>>,

    /// Lifecycle status.
    pub status: PassStatus,

    /// When the pass was registered.
    pub created_at: DateTime<Utc>,

    /// Last write to the pass.
    pub updated_at: DateTime<Utc>,
}

impl From<&VisitorPass> for VisitorResponse {
    fn from(pass: &VisitorPass) -> Self {
        Self {
            id: pass.id,
            pass_id: pass.pass_id.clone(),
            full_name: pass.full_name.clone(),
            phone: pass.phone.clone(),
            visitor_type: pass.visitor_type,
            purpose: pass.purpose.clone(),
            host_name: pass.host_name.clone(),
            valid_until: pass.valid_until,
            check_in_time: pass.check_in_time(),
            check_out_time: pass.check_out_time(),
            status: pass.status(),
            created_at: pass.created_at,
            updated_at: pass.updated_at,
        }
    }
}

/// Result of a scan, returned for both accepted and rejected scans.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "message": "Check-In Successful",
    "type": "check-in",
    "visitor": {
        "id": "01942f8e-7c3a-7d2b-9a41-3f5e6b7c8d9e",
        "passId": "VIS-4821",
        "fullName": "Jane Doe",
        "phone": "555-0100",
        "visitorType": "oneday",
        "purpose": "Quarterly audit",
        "hostName": "Bob Smith",
        "validUntil": "2025-01-15T23:59:59.999Z",
        "checkInTime": "2025-01-15T09:05:00Z",
        "checkOutTime": null,
        "status": "Active",
        "createdAt": "2025-01-15T08:45:00Z",
        "updatedAt": "2025-01-15T09:05:00Z"
    }
}))]
pub struct ScanResponse {
    /// Human-readable outcome.
    #[schema(example = "Check-In Successful")]
    pub message: String,

    /// Machine-readable outcome.
    #[serde(rename = "type")]
    pub outcome: ScanOutcome,

    /// The pass after the scan.
    pub visitor: VisitorResponse,
}

/// Body of a 400 from the scan endpoint.
///
/// Only used to document the two shapes a 400 can take.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ScanBadRequest {
    /// The scan was processed and rejected.
    Rejected(ScanResponse),
    /// The request could not be processed.
    Invalid(ErrorResponse),
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new visitor.
#[utoipa::path(
    post,
    path = "/api/visitors",
    tag = "visitors",
    operation_id = "registerVisitor",
    summary = "Register a visitor",
    description = "Creates a pass in the `Registered` state. `oneday` passes \
        expire at the end of today; `multiday` passes at the end of \
        `validUntil`, or three days from now when it is absent or unreadable.",
    request_body = RegisterVisitorRequest,
    responses(
        (status = 201, description = "Visitor registered", body = VisitorResponse),
        (status = 400, description = "Missing fields, unknown visitor type or unreadable body", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    )
)]
pub async fn register_visitor(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<RegisterVisitorRequest>,
) -> ApiResult<(StatusCode, Json<VisitorResponse>)> {
    let pass = state.issuer.register(request.into()).await?;
    Ok((StatusCode::CREATED, Json(VisitorResponse::from(&pass))))
}

/// List every visitor pass.
#[utoipa::path(
    get,
    path = "/api/visitors",
    tag = "visitors",
    operation_id = "listVisitors",
    summary = "List all visitors",
    description = "Returns every pass, newest registration first. No filtering.",
    responses(
        (status = 200, description = "Visitors listed", body = Vec<VisitorResponse>),
        (status = 500, description = "Server error", body = ErrorResponse)
    )
)]
pub async fn list_visitors(
    State(state): State<SharedState>,
) -> ApiResult<Json<Vec<VisitorResponse>>> {
    let passes = list_all(state.store.as_ref()).await?;
    Ok(Json(passes.iter().map(VisitorResponse::from).collect()))
}

/// Scan a pass at the gate.
#[utoipa::path(
    post,
    path = "/api/visitors/scan",
    tag = "visitors",
    operation_id = "scanPass",
    summary = "Scan a visitor pass",
    description = "Checks a `Registered` pass in and an `Active` pass out. \
        A pass scanned after its expiration becomes `Expired`. Rejected scans \
        (expired, already used) return 400 with the same body shape as \
        accepted ones.",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Checked in or out", body = ScanResponse),
        (status = 400, description = "Pass expired or already used (`ScanResponse`), \
            or passId missing or body unreadable (`ErrorResponse`)", body = ScanBadRequest),
        (status = 404, description = "Unknown pass id", body = ErrorResponse),
        (status = 409, description = "Pass changed during the scan", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    )
)]
pub async fn scan_pass(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<ScanRequest>,
) -> ApiResult<(StatusCode, Json<ScanResponse>)> {
    let pass_id = request.pass_id.unwrap_or_default();
    if pass_id.trim().is_empty() {
        return Err(ApiError::BadRequest {
            error_code: "missing_pass_id".to_string(),
            message: "Pass ID is required".to_string(),
        });
    }

    let result = state.scanner.scan(&pass_id).await?;

    let status = if result.outcome.is_rejection() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(ScanResponse {
            message: result.outcome.message().to_string(),
            outcome: result.outcome,
            visitor: VisitorResponse::from(&result.pass),
        }),
    ))
}
