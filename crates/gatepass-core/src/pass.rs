//! Visitor pass records.
//!
//! A [`VisitorPass`] is the only entity in gatepass. Its lifecycle lives in
//! [`PassState`], a tagged variant that carries the scan timestamps, so a
//! check-out time can never exist without a check-in time. On disk and on the
//! wire the record is flat (`status`, `checkInTime`, `checkOutTime`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::GatepassError;

/// How long a visitor is expected to stay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum VisitorType {
    /// Valid until the end of the registration day.
    #[default]
    #[serde(rename = "oneday")]
    OneDay,

    /// Valid until the end of a requested (or default) later day.
    #[serde(rename = "multiday")]
    MultiDay,
}

impl VisitorType {
    /// The wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "oneday",
            Self::MultiDay => "multiday",
        }
    }
}

impl fmt::Display for VisitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitorType {
    type Err = GatepassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "oneday" => Ok(Self::OneDay),
            "multiday" => Ok(Self::MultiDay),
            other => Err(GatepassError::InvalidVisitorType(other.to_string())),
        }
    }
}

/// The flat status label stored with each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PassStatus {
    /// Issued, never scanned.
    Registered,
    /// Checked in, not yet checked out.
    Active,
    /// Checked in and out. Terminal.
    #[serde(rename = "Checked Out")]
    CheckedOut,
    /// Scanned after its expiration instant. Terminal.
    Expired,
}

impl PassStatus {
    /// The wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "Registered",
            Self::Active => "Active",
            Self::CheckedOut => "Checked Out",
            Self::Expired => "Expired",
        }
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a pass, carrying the timestamps each state implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Issued, never scanned.
    Registered,
    /// First scan accepted.
    Active {
        /// When the visitor checked in.
        checked_in_at: DateTime<Utc>,
    },
    /// Second scan accepted.
    CheckedOut {
        /// When the visitor checked in.
        checked_in_at: DateTime<Utc>,
        /// When the visitor checked out.
        checked_out_at: DateTime<Utc>,
    },
    /// Observed past its expiration instant.
    Expired {
        /// Check-in time, if the visitor had checked in before expiring.
        checked_in_at: Option<DateTime<Utc>>,
        /// Check-out time carried over from records written before
        /// check-out became terminal.
        checked_out_at: Option<DateTime<Utc>>,
    },
}

impl PassState {
    /// The flat status label for this state.
    #[must_use]
    pub const fn status(&self) -> PassStatus {
        match self {
            Self::Registered => PassStatus::Registered,
            Self::Active { .. } => PassStatus::Active,
            Self::CheckedOut { .. } => PassStatus::CheckedOut,
            Self::Expired { .. } => PassStatus::Expired,
        }
    }

    /// When the visitor checked in, if they have.
    #[must_use]
    pub const fn checked_in_at(&self) -> Option<DateTime<Utc>> {
        match *self {
            Self::Registered => None,
            Self::Active { checked_in_at } | Self::CheckedOut { checked_in_at, .. } => {
                Some(checked_in_at)
            }
            Self::Expired { checked_in_at, .. } => checked_in_at,
        }
    }

    /// When the visitor checked out, if they have.
    #[must_use]
    pub const fn checked_out_at(&self) -> Option<DateTime<Utc>> {
        match *self {
            Self::Registered | Self::Active { .. } => None,
            Self::CheckedOut { checked_out_at, .. } => Some(checked_out_at),
            Self::Expired { checked_out_at, .. } => checked_out_at,
        }
    }

    /// Rebuilds a state from its flat stored form.
    ///
    /// Inconsistent records are normalized toward the earlier state: a
    /// record claiming to be `Active` or `Checked Out` without a check-in
    /// time loads as `Registered`, and `Checked Out` without a check-out
    /// time loads as `Active`.
    #[must_use]
    pub fn from_parts(
        status: PassStatus,
        check_in_time: Option<DateTime<Utc>>,
        check_out_time: Option<DateTime<Utc>>,
    ) -> Self {
        match (status, check_in_time, check_out_time) {
            (PassStatus::Registered, _, _) | (PassStatus::Active | PassStatus::CheckedOut, None, _) => {
                Self::Registered
            }
            (PassStatus::Active, Some(checked_in_at), _)
            | (PassStatus::CheckedOut, Some(checked_in_at), None) => Self::Active { checked_in_at },
            (PassStatus::CheckedOut, Some(checked_in_at), Some(checked_out_at)) => {
                Self::CheckedOut {
                    checked_in_at,
                    checked_out_at,
                }
            }
            (PassStatus::Expired, checked_in_at, checked_out_at) => Self::Expired {
                checked_in_at,
                checked_out_at: checked_in_at.and(checked_out_at),
            },
        }
    }
}

/// A stored visitor pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PassRecord", into = "PassRecord")]
pub struct VisitorPass {
    /// Internal store key.
    pub id: Uuid,
    /// Human-facing identifier printed on the pass (`VIS-####`).
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
    /// Hard expiration instant (end of a local calendar day).
    pub valid_until: DateTime<Utc>,
    /// Lifecycle state.
    pub state: PassState,
    /// Set by the store on create.
    pub created_at: DateTime<Utc>,
    /// Set by the store on every write.
    pub updated_at: DateTime<Utc>,
}

impl VisitorPass {
    /// The flat status label.
    #[must_use]
    pub const fn status(&self) -> PassStatus {
        self.state.status()
    }

    /// When the visitor checked in, if they have.
    #[must_use]
    pub const fn check_in_time(&self) -> Option<DateTime<Utc>> {
        self.state.checked_in_at()
    }

    /// When the visitor checked out, if they have.
    #[must_use]
    pub const fn check_out_time(&self) -> Option<DateTime<Utc>> {
        self.state.checked_out_at()
    }

    /// Whether `now` lies strictly after the expiration instant.
    #[must_use]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }
}

/// A pass that has been built but not yet stored.
///
/// The store assigns `id`, `created_at`, `updated_at` and the initial
/// `Registered` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisitorPass {
    /// Human-facing identifier.
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
    /// Hard expiration instant.
    pub valid_until: DateTime<Utc>,
}

impl NewVisitorPass {
    /// Materializes the record with store-assigned fields.
    #[must_use]
    pub fn into_pass(self, id: Uuid, now: DateTime<Utc>) -> VisitorPass {
        VisitorPass {
            id,
            pass_id: self.pass_id,
            full_name: self.full_name,
            phone: self.phone,
            visitor_type: self.visitor_type,
            purpose: self.purpose,
            host_name: self.host_name,
            valid_until: self.valid_until,
            state: PassState::Registered,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Flat persisted form of a [`VisitorPass`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassRecord {
    id: Uuid,
    pass_id: String,
    full_name: String,
    phone: String,
    #[serde(default)]
    visitor_type: VisitorType,
    purpose: String,
    host_name: String,
    valid_until: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_in_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_out_time: Option<DateTime<Utc>>,
    status: PassStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PassRecord> for VisitorPass {
    fn from(record: PassRecord) -> Self {
        Self {
            id: record.id,
            pass_id: record.pass_id,
            full_name: record.full_name,
            phone: record.phone,
            visitor_type: record.visitor_type,
            purpose: record.purpose,
            host_name: record.host_name,
            valid_until: record.valid_until,
            state: PassState::from_parts(record.status, record.check_in_time, record.check_out_time),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<VisitorPass> for PassRecord {
    fn from(pass: VisitorPass) -> Self {
        Self {
            id: pass.id,
            check_in_time: pass.check_in_time(),
            check_out_time: pass.check_out_time(),
            status: pass.status(),
            pass_id: pass.pass_id,
            full_name: pass.full_name,
            phone: pass.phone,
            visitor_type: pass.visitor_type,
            purpose: pass.purpose,
            host_name: pass.host_name,
            valid_until: pass.valid_until,
            created_at: pass.created_at,
            updated_at: pass.updated_at,
        }
    }
}
