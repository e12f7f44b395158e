//! Pass issuing.
//!
//! [`PassIssuer::register`] validates registration input, computes the
//! expiration instant and stores a new `Registered` pass under a freshly
//! generated pass id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::DEFAULT_ID_ATTEMPTS;
use crate::error::{GatepassError, Result};
use crate::expiry::ExpiryPolicy;
use crate::pass::{NewVisitorPass, VisitorPass, VisitorType};
use crate::pass_id::PassIdGenerator;
use crate::storage::{PassStore, StoreError};

/// Raw registration input, as received from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// Visitor's full name.
    pub full_name: Option<String>,
    /// Visitor's phone number.
    pub phone: Option<String>,
    /// `oneday` (default) or `multiday`.
    pub visitor_type: Option<String>,
    /// Reason for the visit.
    pub purpose: Option<String>,
    /// Person being visited.
    pub host_name: Option<String>,
    /// Requested last day for multi-day passes.
    pub valid_until: Option<String>,
}

/// Registration input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Trimmed full name.
    pub full_name: String,
    /// Trimmed phone number.
    pub phone: String,
    /// Parsed visitor type.
    pub visitor_type: VisitorType,
    /// Trimmed purpose.
    pub purpose: String,
    /// Trimmed host name.
    pub host_name: String,
    /// Raw requested date, if any.
    pub valid_until: Option<String>,
}

impl RegistrationRequest {
    /// Check required fields and parse the visitor type.
    ///
    /// Every blank required field is reported in one
    /// [`GatepassError::MissingFields`].
    pub fn validate(self) -> Result<Registration> {
        let mut missing = Vec::new();
        let mut required = |value: Option<String>, name: &'static str| {
            let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
            if value.is_empty() {
                missing.push(name);
            }
            value
        };

        let full_name = required(self.full_name, "fullName");
        let phone = required(self.phone, "phone");
        let purpose = required(self.purpose, "purpose");
        let host_name = required(self.host_name, "hostName");

        if !missing.is_empty() {
            return Err(GatepassError::MissingFields(missing));
        }

        let visitor_type = match self.visitor_type.as_deref().map(str::trim) {
            None | Some("") => VisitorType::default(),
            Some(raw) => raw.parse()?,
        };

        Ok(Registration {
            full_name,
            phone,
            visitor_type,
            purpose,
            host_name,
            valid_until: self.valid_until,
        })
    }
}

/// Builds and stores new visitor passes.
pub struct PassIssuer {
    store: Arc<dyn PassStore>,
    ids: Arc<dyn PassIdGenerator>,
    policy: ExpiryPolicy,
    id_attempts: u32,
}

impl PassIssuer {
    /// Create an issuer writing to `store`.
    pub fn new(
        store: Arc<dyn PassStore>,
        ids: Arc<dyn PassIdGenerator>,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            store,
            ids,
            policy,
            id_attempts: DEFAULT_ID_ATTEMPTS,
        }
    }

    /// Set how many pass ids to try before giving up (minimum 1).
    #[must_use]
    pub fn with_id_attempts(mut self, attempts: u32) -> Self {
        self.id_attempts = attempts.max(1);
        self
    }

    /// The expiration policy in use.
    #[must_use]
    pub const fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// Register a visitor now.
    pub async fn register(&self, request: RegistrationRequest) -> Result<VisitorPass> {
        self.register_at(request, Utc::now()).await
    }

    /// Register a visitor as if the request arrived at `now`.
    ///
    /// # Errors
    ///
    /// - [`GatepassError::MissingFields`] / [`GatepassError::InvalidVisitorType`]
    ///   for bad input; nothing is stored.
    /// - [`GatepassError::ExpiryOutOfRange`] if no expiry can be represented.
    /// - [`GatepassError::PassIdExhausted`] if every generated id was taken.
    /// - Store failures, passed through.
    pub async fn register_at(
        &self,
        request: RegistrationRequest,
        now: DateTime<Utc>,
    ) -> Result<VisitorPass> {
        let registration = request.validate()?;
        let valid_until = self.policy.valid_until(
            registration.visitor_type,
            registration.valid_until.as_deref(),
            now,
        )?;

        for attempt in 1..=self.id_attempts {
            let candidate = NewVisitorPass {
                pass_id: self.ids.next_pass_id(),
                full_name: registration.full_name.clone(),
                phone: registration.phone.clone(),
                visitor_type: registration.visitor_type,
                purpose: registration.purpose.clone(),
                host_name: registration.host_name.clone(),
                valid_until,
            };

            match self.store.create(candidate).await {
                Ok(pass) => {
                    info!(
                        pass_id = %pass.pass_id,
                        visitor_type = %pass.visitor_type,
                        valid_until = %pass.valid_until,
                        "Visitor registered"
                    );
                    return Ok(pass);
                }
                Err(StoreError::DuplicatePassId(pass_id)) => {
                    warn!(%pass_id, attempt, "Pass id already taken, generating another");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(GatepassError::PassIdExhausted {
            attempts: self.id_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::PassStatus;
    use crate::pass_id::{is_valid_pass_id, RandomPassIdGenerator, SequentialPassIdGenerator};
    use crate::storage::MemoryPassStore;
    use chrono::{Duration, TimeZone};

    fn jane() -> RegistrationRequest {
        RegistrationRequest {
            full_name: Some("Jane".to_string()),
            phone: Some("555".to_string()),
            purpose: Some("meeting".to_string()),
            host_name: Some("Bob".to_string()),
            ..Default::default()
        }
    }

    fn issuer_with(store: Arc<MemoryPassStore>, ids: impl PassIdGenerator + 'static) -> PassIssuer {
        PassIssuer::new(store, Arc::new(ids), ExpiryPolicy::default())
    }

    fn end_of_day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 23, 59, 59).unwrap() + Duration::milliseconds(999)
    }

    #[tokio::test]
    async fn test_register_oneday_defaults() {
        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store.clone(), RandomPassIdGenerator);
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();

        let pass = issuer.register_at(jane(), now).await.unwrap();

        assert_eq!(pass.status(), PassStatus::Registered);
        assert_eq!(pass.visitor_type, VisitorType::OneDay);
        assert_eq!(pass.valid_until, end_of_day(2025, 1, 15));
        assert!(is_valid_pass_id(&pass.pass_id));
        assert_eq!(pass.check_in_time(), None);
        let stored = store.find_by_pass_id(&pass.pass_id).await.unwrap();
        assert_eq!(stored, Some(pass));
    }

    #[tokio::test]
    async fn test_register_multiday_without_date() {
        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store, SequentialPassIdGenerator::default());
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap();

        let request = RegistrationRequest {
            visitor_type: Some("multiday".to_string()),
            ..jane()
        };
        let pass = issuer.register_at(request, now).await.unwrap();
        assert_eq!(pass.visitor_type, VisitorType::MultiDay);
        assert_eq!(pass.valid_until, end_of_day(2025, 1, 18));
    }

    #[tokio::test]
    async fn test_register_multiday_with_date() {
        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store, SequentialPassIdGenerator::default());
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap();

        let request = RegistrationRequest {
            visitor_type: Some("multiday".to_string()),
            valid_until: Some("2025-01-20".to_string()),
            ..jane()
        };
        let pass = issuer.register_at(request, now).await.unwrap();
        assert_eq!(pass.valid_until, end_of_day(2025, 1, 20));
    }

    #[tokio::test]
    async fn test_register_multiday_with_out_of_range_date_uses_default() {
        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store, SequentialPassIdGenerator::default());
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap();

        let request = RegistrationRequest {
            visitor_type: Some("multiday".to_string()),
            valid_until: Some("+262142-12-31".to_string()),
            ..jane()
        };
        let pass = issuer.register_at(request, now).await.unwrap();
        assert_eq!(pass.valid_until, end_of_day(2025, 1, 18));
    }

    #[tokio::test]
    async fn test_register_trims_fields() {
        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store, SequentialPassIdGenerator::default());
        let request = RegistrationRequest {
            full_name: Some("  Jane Doe ".to_string()),
            ..jane()
        };
        let pass = issuer.register(request).await.unwrap();
        assert_eq!(pass.full_name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_missing_fields_are_reported_together() {
        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store.clone(), SequentialPassIdGenerator::default());
        let request = RegistrationRequest {
            full_name: Some("   ".to_string()),
            host_name: None,
            ..jane()
        };

        let err = issuer.register(request).await.unwrap_err();
        match err {
            GatepassError::MissingFields(fields) => assert_eq!(fields, ["fullName", "hostName"]),
            other => panic!("expected MissingFields, got {other:?}"),
        }
        assert!(store.list_newest_first().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_visitor_type_is_rejected() {
        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store, SequentialPassIdGenerator::default());
        let request = RegistrationRequest {
            visitor_type: Some("weekly".to_string()),
            ..jane()
        };
        assert!(matches!(
            issuer.register(request).await,
            Err(GatepassError::InvalidVisitorType(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_visitor_type_defaults_to_oneday() {
        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store, SequentialPassIdGenerator::default());
        let request = RegistrationRequest {
            visitor_type: Some(" ".to_string()),
            ..jane()
        };
        let pass = issuer.register(request).await.unwrap();
        assert_eq!(pass.visitor_type, VisitorType::OneDay);
    }

    #[tokio::test]
    async fn test_collision_retries_with_next_id() {
        let store = Arc::new(MemoryPassStore::new());
        let first = issuer_with(store.clone(), SequentialPassIdGenerator::starting_at(1000));
        first.register(jane()).await.unwrap();

        // Starts on the already-issued VIS-1000, then moves on.
        let second = issuer_with(store.clone(), SequentialPassIdGenerator::starting_at(1000));
        let pass = second.register(jane()).await.unwrap();
        assert_eq!(pass.pass_id, "VIS-1001");
        assert_eq!(store.list_newest_first().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_collision_gives_up_after_configured_attempts() {
        struct SameId;
        impl PassIdGenerator for SameId {
            fn next_pass_id(&self) -> String {
                "VIS-4242".to_string()
            }
        }

        let store = Arc::new(MemoryPassStore::new());
        let issuer = issuer_with(store.clone(), SameId).with_id_attempts(2);
        issuer.register(jane()).await.unwrap();

        let err = issuer.register(jane()).await.unwrap_err();
        assert!(matches!(err, GatepassError::PassIdExhausted { attempts: 2 }));
        assert_eq!(store.list_newest_first().await.unwrap().len(), 1);
    }
}
