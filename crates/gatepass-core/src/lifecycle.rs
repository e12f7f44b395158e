//! The scan transition function.
//!
//! Every scan of a pass goes through [`PassState::on_scan`]. It is pure: it
//! looks at the current state, the expiration instant and the scan time, and
//! returns the outcome plus the state to persist (if any).
//!
//! ```text
//!  Registered ──scan──▶ Active ──scan──▶ Checked Out (terminal)
//!      │                  │
//!      └──scan after ─────┴──▶ Expired (terminal)
//!         valid_until
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::pass::PassState;

/// What a scan did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ScanOutcome {
    /// First scan: the visitor is now on site.
    CheckIn,
    /// Second scan: the visitor has left.
    CheckOut,
    /// The pass has already completed its lifecycle.
    AlreadyUsed,
    /// The pass is past its expiration instant.
    Expired,
}

impl ScanOutcome {
    /// Whether the scan was refused.
    #[must_use]
    pub const fn is_rejection(self) -> bool {
        matches!(self, Self::AlreadyUsed | Self::Expired)
    }

    /// The wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckIn => "check-in",
            Self::CheckOut => "check-out",
            Self::AlreadyUsed => "already-used",
            Self::Expired => "expired",
        }
    }

    /// Message shown to the operator at the gate.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::CheckIn => "Check-In Successful",
            Self::CheckOut => "Check-Out Successful",
            Self::AlreadyUsed => "Pass already used for Check-Out",
            Self::Expired => "Pass Expired",
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying one scan to a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// What the scan did.
    pub outcome: ScanOutcome,
    /// State to persist, or `None` when the record must stay untouched.
    pub next: Option<PassState>,
}

impl Transition {
    const fn unchanged(outcome: ScanOutcome) -> Self {
        Self {
            outcome,
            next: None,
        }
    }

    const fn to(outcome: ScanOutcome, next: PassState) -> Self {
        Self {
            outcome,
            next: Some(next),
        }
    }
}

impl PassState {
    /// Decides what a scan at `now` does to a pass expiring at `valid_until`.
    ///
    /// Terminal states never change. Otherwise expiration is checked before
    /// check-in/check-out, so a pass scanned late never becomes `Active`.
    #[must_use]
    pub fn on_scan(&self, valid_until: DateTime<Utc>, now: DateTime<Utc>) -> Transition {
        match *self {
            Self::CheckedOut { .. } => Transition::unchanged(ScanOutcome::AlreadyUsed),
            Self::Expired { .. } => Transition::unchanged(ScanOutcome::Expired),
            Self::Registered | Self::Active { .. } if now > valid_until => {
                Transition::to(
                    ScanOutcome::Expired,
                    Self::Expired {
                        checked_in_at: self.checked_in_at(),
                        checked_out_at: None,
                    },
                )
            }
            Self::Registered => Transition::to(
                ScanOutcome::CheckIn,
                Self::Active { checked_in_at: now },
            ),
            Self::Active { checked_in_at } => Transition::to(
                ScanOutcome::CheckOut,
                Self::CheckedOut {
                    checked_in_at,
                    checked_out_at: now,
                },
            ),
        }
    }
}
