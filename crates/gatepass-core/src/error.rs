//! Unified error types for the gatepass core library.
//!
//! This module provides a unified error type [`GatepassError`] that covers all
//! failure modes of registration and scanning. Store failures
//! ([`StoreError`](crate::storage::StoreError)) convert into it at the
//! boundary. Configuration problems are reported at startup as
//! [`ConfigError`](crate::config::ConfigError).
//!
//! Business rejections (an expired pass, a pass already checked out) are not
//! errors: they are reported as [`ScanOutcome`](crate::lifecycle::ScanOutcome)s
//! alongside the current record.
//!
//! # Example
//!
//! ```rust
//! use gatepass_core::error::{GatepassError, Result};
//!
//! fn require_pass_id(raw: &str) -> Result<&str> {
//!     let trimmed = raw.trim();
//!     if trimmed.is_empty() {
//!         return Err(GatepassError::MissingPassId);
//!     }
//!     Ok(trimmed)
//! }
//!
//! assert!(require_pass_id("  ").is_err());
//! ```

use thiserror::Error;

/// The unified error type for all gatepass operations.
#[derive(Debug, Error)]
pub enum GatepassError {
    // =========================================================================
    // VALIDATION ERRORS
    // =========================================================================
    /// One or more required registration fields were absent or blank.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A scan request did not carry a pass identifier.
    #[error("Pass ID is required")]
    MissingPassId,

    /// The visitor type is not one of the supported values.
    #[error("Invalid visitor type: '{0}'. Expected 'oneday' or 'multiday'.")]
    InvalidVisitorType(String),

    /// The pass would expire beyond the representable calendar.
    #[error("Expiration date is outside the supported range")]
    ExpiryOutOfRange,

    // =========================================================================
    // LOOKUP ERRORS
    // =========================================================================
    /// No pass exists with the given identifier.
    #[error("Visitor not found: no pass with id '{0}'")]
    PassNotFound(String),

    // =========================================================================
    // CONCURRENCY & ISSUING ERRORS
    // =========================================================================
    /// The pass changed between lookup and save; the scan was not applied.
    #[error("Pass '{pass_id}' was updated by another scan. Scan again to see its current state.")]
    ConcurrentUpdate {
        /// Identifier of the contended pass.
        pass_id: String,
    },

    /// Every generated pass identifier collided with an existing pass.
    #[error("Could not allocate a unique pass id after {attempts} attempts")]
    PassIdExhausted {
        /// Number of identifiers tried.
        attempts: u32,
    },

    // =========================================================================
    // PERSISTENCE ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading pass records.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

/// A specialized [`Result`] type for gatepass operations.
pub type Result<T> = std::result::Result<T, GatepassError>;

impl GatepassError {
    /// Returns `true` if the request itself was malformed.
    #[inline]
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::MissingFields(_)
                | Self::MissingPassId
                | Self::InvalidVisitorType(_)
                | Self::ExpiryOutOfRange
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::MissingFields(_)
            | Self::MissingPassId
            | Self::InvalidVisitorType(_)
            | Self::ExpiryOutOfRange => 400,

            // 404 Not Found
            Self::PassNotFound(_) => 404,

            // 409 Conflict - lost a race against another scan
            Self::ConcurrentUpdate { .. } => 409,

            // 500 Internal Server Error - server-side issues
            Self::PassIdExhausted { .. } | Self::PersistenceError(_) => 500,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::MissingPassId => "MISSING_PASS_ID",
            Self::InvalidVisitorType(_) => "INVALID_VISITOR_TYPE",
            Self::ExpiryOutOfRange => "EXPIRY_OUT_OF_RANGE",
            Self::PassNotFound(_) => "PASS_NOT_FOUND",
            Self::ConcurrentUpdate { .. } => "CONCURRENT_UPDATE",
            Self::PassIdExhausted { .. } => "PASS_ID_EXHAUSTED",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::storage::StoreError> for GatepassError {
    fn from(err: crate::storage::StoreError) -> Self {
        use crate::storage::StoreError;
        match err {
            StoreError::UnknownRecord { pass_id, .. } => Self::PassNotFound(pass_id),
            StoreError::StatusMismatch { pass_id, .. } => Self::ConcurrentUpdate { pass_id },
            StoreError::DuplicatePassId(pass_id) => {
                Self::PersistenceError(format!("Duplicate pass id: {pass_id}"))
            }
            StoreError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {}: {}", path.display(), source))
            }
            StoreError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {}: {}", path.display(), source))
            }
            StoreError::ParseError { path, source } => {
                Self::PersistenceError(format!("Failed to parse {}: {}", path.display(), source))
            }
            err @ StoreError::DuplicateRecord { .. } => Self::PersistenceError(err.to_string()),
            StoreError::SerializeError(e) => Self::PersistenceError(e.to_string()),
            StoreError::CreateDirError { path, source } => Self::PersistenceError(format!(
                "Failed to create directory {}: {}",
                path.display(),
                source
            )),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
