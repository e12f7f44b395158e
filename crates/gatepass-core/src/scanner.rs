//! Pass scanning.
//!
//! [`ScanProcessor::scan`] looks a pass up, runs the transition function
//! and persists the new state. The save is conditional on the status read
//! at lookup, so two concurrent scans of one pass cannot both succeed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{GatepassError, Result};
use crate::lifecycle::ScanOutcome;
use crate::pass::VisitorPass;
use crate::storage::PassStore;

/// Outcome of one scan together with the pass as it now stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// What the scan did.
    pub outcome: ScanOutcome,
    /// The pass after the scan.
    pub pass: VisitorPass,
}

/// Applies check-in/check-out scans to stored passes.
pub struct ScanProcessor {
    store: Arc<dyn PassStore>,
}

impl ScanProcessor {
    /// Create a processor over `store`.
    pub fn new(store: Arc<dyn PassStore>) -> Self {
        Self { store }
    }

    /// Scan a pass now.
    pub async fn scan(&self, pass_id: &str) -> Result<ScanResult> {
        self.scan_at(pass_id, Utc::now()).await
    }

    /// Scan a pass as if it were presented at `now`.
    ///
    /// Rejections (expired, already used) are returned as `Ok` with a
    /// rejecting [`ScanOutcome`].
    ///
    /// # Errors
    ///
    /// - [`GatepassError::MissingPassId`] for a blank id.
    /// - [`GatepassError::PassNotFound`] for an unknown id.
    /// - [`GatepassError::ConcurrentUpdate`] if another scan changed the pass
    ///   between lookup and save.
    /// - Store failures, passed through.
    pub async fn scan_at(&self, pass_id: &str, now: DateTime<Utc>) -> Result<ScanResult> {
        let pass_id = pass_id.trim();
        if pass_id.is_empty() {
            return Err(GatepassError::MissingPassId);
        }

        let pass = self
            .store
            .find_by_pass_id(pass_id)
            .await?
            .ok_or_else(|| GatepassError::PassNotFound(pass_id.to_string()))?;

        let observed = pass.status();
        let transition = pass.state.on_scan(pass.valid_until, now);

        let pass = match transition.next {
            Some(next) => {
                let mut updated = pass;
                updated.state = next;
                self.store.save(updated, observed).await?
            }
            None => {
                debug!(%pass_id, status = %observed, "Scan left pass unchanged");
                pass
            }
        };

        info!(
            %pass_id,
            outcome = %transition.outcome,
            status = %pass.status(),
            "Pass scanned"
        );

        Ok(ScanResult {
            outcome: transition.outcome,
            pass,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::ExpiryPolicy;
    use crate::issuer::{PassIssuer, RegistrationRequest};
    use crate::pass::{NewVisitorPass, PassState, PassStatus, VisitorType};
    use crate::pass_id::SequentialPassIdGenerator;
    use crate::storage::{MemoryPassStore, StoreResult};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn registration_day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    async fn registered_pass(store: Arc<dyn PassStore>) -> VisitorPass {
        let issuer = PassIssuer::new(
            store,
            Arc::new(SequentialPassIdGenerator::starting_at(1000)),
            ExpiryPolicy::default(),
        );
        let request = RegistrationRequest {
            full_name: Some("Jane".to_string()),
            phone: Some("555".to_string()),
            purpose: Some("meeting".to_string()),
            host_name: Some("Bob".to_string()),
            ..Default::default()
        };
        issuer.register_at(request, registration_day()).await.unwrap()
    }

    #[tokio::test]
    async fn test_check_in_then_check_out_then_already_used() {
        let store: Arc<dyn PassStore> = Arc::new(MemoryPassStore::new());
        let pass = registered_pass(store.clone()).await;
        let scanner = ScanProcessor::new(store.clone());

        let t1 = registration_day() + Duration::hours(1);
        let first = scanner.scan_at(&pass.pass_id, t1).await.unwrap();
        assert_eq!(first.outcome, ScanOutcome::CheckIn);
        assert_eq!(first.pass.status(), PassStatus::Active);
        assert_eq!(first.pass.check_in_time(), Some(t1));

        let t2 = t1 + Duration::hours(4);
        let second = scanner.scan_at(&pass.pass_id, t2).await.unwrap();
        assert_eq!(second.outcome, ScanOutcome::CheckOut);
        assert_eq!(second.pass.status(), PassStatus::CheckedOut);
        assert_eq!(second.pass.check_in_time(), Some(t1));
        assert_eq!(second.pass.check_out_time(), Some(t2));

        let third = scanner
            .scan_at(&pass.pass_id, t2 + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(third.outcome, ScanOutcome::AlreadyUsed);
        assert_eq!(third.pass, second.pass);
    }

    #[tokio::test]
    async fn test_checked_out_pass_is_never_touched_again() {
        let store: Arc<dyn PassStore> = Arc::new(MemoryPassStore::new());
        let pass = registered_pass(store.clone()).await;
        let scanner = ScanProcessor::new(store.clone());

        scanner.scan_at(&pass.pass_id, registration_day()).await.unwrap();
        let done = scanner.scan_at(&pass.pass_id, registration_day()).await.unwrap();

        for offset in [1, 2, 48] {
            let again = scanner
                .scan_at(&pass.pass_id, registration_day() + Duration::hours(offset))
                .await
                .unwrap();
            assert_eq!(again.outcome, ScanOutcome::AlreadyUsed);
            assert_eq!(again.pass.updated_at, done.pass.updated_at);
            assert_eq!(again.pass.status(), PassStatus::CheckedOut);
        }
    }

    #[tokio::test]
    async fn test_late_scan_expires_without_check_in() {
        let store: Arc<dyn PassStore> = Arc::new(MemoryPassStore::new());
        let pass = registered_pass(store.clone()).await;
        let scanner = ScanProcessor::new(store.clone());

        let next_day = registration_day() + Duration::days(1);
        let result = scanner.scan_at(&pass.pass_id, next_day).await.unwrap();
        assert_eq!(result.outcome, ScanOutcome::Expired);
        assert_eq!(result.pass.status(), PassStatus::Expired);
        assert_eq!(result.pass.check_in_time(), None);
        assert_eq!(result.pass.check_out_time(), None);

        let stored = store.find_by_pass_id(&pass.pass_id).await.unwrap().unwrap();
        assert_eq!(stored.status(), PassStatus::Expired);
    }

    #[tokio::test]
    async fn test_active_pass_expires_on_late_scan() {
        let store: Arc<dyn PassStore> = Arc::new(MemoryPassStore::new());
        let pass = registered_pass(store.clone()).await;
        let scanner = ScanProcessor::new(store.clone());

        scanner.scan_at(&pass.pass_id, registration_day()).await.unwrap();
        let result = scanner
            .scan_at(&pass.pass_id, registration_day() + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(result.outcome, ScanOutcome::Expired);
        assert_eq!(result.pass.check_in_time(), Some(registration_day()));
        assert_eq!(result.pass.check_out_time(), None);
    }

    #[tokio::test]
    async fn test_expired_stays_expired() {
        let store: Arc<dyn PassStore> = Arc::new(MemoryPassStore::new());
        let pass = registered_pass(store.clone()).await;
        let scanner = ScanProcessor::new(store.clone());

        let expired = scanner
            .scan_at(&pass.pass_id, registration_day() + Duration::days(1))
            .await
            .unwrap();
        // Even a scan timestamped before valid_until does not revive it.
        let again = scanner.scan_at(&pass.pass_id, registration_day()).await.unwrap();
        assert_eq!(again.outcome, ScanOutcome::Expired);
        assert_eq!(again.pass, expired.pass);
    }

    #[tokio::test]
    async fn test_unknown_and_blank_pass_ids() {
        let scanner = ScanProcessor::new(Arc::new(MemoryPassStore::new()));

        assert!(matches!(
            scanner.scan("VIS-4040").await,
            Err(GatepassError::PassNotFound(ref id)) if id == "VIS-4040"
        ));
        assert!(matches!(
            scanner.scan("   ").await,
            Err(GatepassError::MissingPassId)
        ));
    }

    #[tokio::test]
    async fn test_pass_id_is_trimmed() {
        let store: Arc<dyn PassStore> = Arc::new(MemoryPassStore::new());
        let pass = registered_pass(store.clone()).await;
        let scanner = ScanProcessor::new(store);

        let padded = format!("  {} ", pass.pass_id);
        let result = scanner.scan_at(&padded, registration_day()).await.unwrap();
        assert_eq!(result.outcome, ScanOutcome::CheckIn);
    }

    /// Store whose lookups always return the snapshot taken at construction,
    /// simulating a second scanner that read the pass before the first wrote.
    struct StaleReads {
        inner: MemoryPassStore,
        snapshot: VisitorPass,
    }

    #[async_trait]
    impl PassStore for StaleReads {
        async fn create(&self, pass: NewVisitorPass) -> StoreResult<VisitorPass> {
            self.inner.create(pass).await
        }

        async fn find_by_pass_id(&self, _pass_id: &str) -> StoreResult<Option<VisitorPass>> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn list_newest_first(&self) -> StoreResult<Vec<VisitorPass>> {
            self.inner.list_newest_first().await
        }

        async fn save(&self, pass: VisitorPass, expected: PassStatus) -> StoreResult<VisitorPass> {
            self.inner.save(pass, expected).await
        }

        fn backend_name(&self) -> &'static str {
            "stale"
        }
    }

    #[tokio::test]
    async fn test_lost_race_reports_concurrent_update() {
        let snapshot = NewVisitorPass {
            pass_id: "VIS-1000".to_string(),
            full_name: "Jane".to_string(),
            phone: "555".to_string(),
            visitor_type: VisitorType::OneDay,
            purpose: "meeting".to_string(),
            host_name: "Bob".to_string(),
            valid_until: registration_day() + Duration::hours(12),
        }
        .into_pass(uuid::Uuid::now_v7(), registration_day());
        let mut already_active = snapshot.clone();
        already_active.state = PassState::Active {
            checked_in_at: registration_day(),
        };

        let store = Arc::new(StaleReads {
            inner: MemoryPassStore::with_records(vec![already_active]).unwrap(),
            snapshot,
        });
        let scanner = ScanProcessor::new(store);

        let err = scanner
            .scan_at("VIS-1000", registration_day() + Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GatepassError::ConcurrentUpdate { .. }));
    }
}
