//! OpenAPI specification generation for the gatepass API.
//!
//! The document is served at `/api/openapi.json` and written to disk by the
//! `gen-openapi` binary for client generation.

use axum::Json;
use utoipa::OpenApi;

use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::visitors::{
    RegisterVisitorRequest, ScanBadRequest, ScanRequest, ScanResponse, VisitorResponse,
};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a pretty-printed string.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for gatepass.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "gatepass API",
        version = "0.1.0",
        description = r#"
# gatepass API

Visitor passes for a single site.

## Lifecycle

1. **Register**: the front desk records the visitor and receives a `VIS-####` pass id.
2. **Check in**: the first scan of a `Registered` pass makes it `Active`.
3. **Check out**: the next scan makes it `Checked Out`. Further scans are rejected.

A pass scanned after its `validUntil` instant becomes `Expired` and stays that way.
"#
    ),
    servers(
        (url = "/", description = "Local gatepass server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks"
        ),
        (
            name = "visitors",
            description = "Visitor registration, listing and gate scans"
        )
    ),
    paths(
        super::health::health_check,
        super::visitors::register_visitor,
        super::visitors::list_visitors,
        super::visitors::scan_pass,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            RegisterVisitorRequest,
            ScanRequest,
            ScanResponse,
            ScanBadRequest,
            VisitorResponse,
            gatepass_core::VisitorType,
            gatepass_core::PassStatus,
            gatepass_core::ScanOutcome,
        )
    )
)]
pub struct ApiDoc;
