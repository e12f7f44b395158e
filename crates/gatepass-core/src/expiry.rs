//! Expiration policy.
//!
//! Every pass expires at 23:59:59.999 of some calendar day in the site
//! timezone. Which day depends on the visitor type:
//!
//! - `oneday`: the registration day.
//! - `multiday`: the requested date if it parses, otherwise registration day
//!   plus a configurable number of days (3 by default).
//!
//! All date arithmetic is checked. A requested date whose end of day cannot
//! be represented is treated like an unreadable one.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{GatepassError, Result};
use crate::pass::VisitorType;

/// Days added to the registration date when a multi-day pass has no date.
pub const DEFAULT_MULTIDAY_DAYS: u32 = 3;

/// Longest run of skipped local time searched when midnight falls in a gap.
const MAX_GAP_MINUTES: i64 = 3 * 60;

/// Computes `valid_until` for new passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    timezone: Tz,
    multiday_default_days: u32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(chrono_tz::UTC, DEFAULT_MULTIDAY_DAYS)
    }
}

impl ExpiryPolicy {
    /// Create a policy for a site in `timezone`.
    #[must_use]
    pub const fn new(timezone: Tz, multiday_default_days: u32) -> Self {
        Self {
            timezone,
            multiday_default_days,
        }
    }

    /// The site timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Expiration instant for a pass registered at `now`.
    ///
    /// `requested` is only consulted for multi-day passes.
    ///
    /// # Errors
    ///
    /// [`GatepassError::ExpiryOutOfRange`] if the default expiry day lies
    /// beyond the representable calendar.
    pub fn valid_until(
        &self,
        visitor_type: VisitorType,
        requested: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let requested = match visitor_type {
            VisitorType::OneDay => return self.end_of_day_or_err(self.local_date(now)),
            VisitorType::MultiDay => requested
                .and_then(|raw| self.parse_date(raw))
                .and_then(|day| self.end_of_day(day)),
        };

        match requested {
            Some(expiry) => Ok(expiry),
            None => {
                let day = Duration::try_days(i64::from(self.multiday_default_days))
                    .and_then(|days| now.checked_add_signed(days))
                    .map(|instant| self.local_date(instant))
                    .ok_or(GatepassError::ExpiryOutOfRange)?;
                self.end_of_day_or_err(day)
            }
        }
    }

    /// Parses a requested expiration date.
    ///
    /// Accepts RFC 3339 timestamps (their date in the site timezone) and
    /// plain `YYYY-MM-DD` dates. Anything else yields `None`.
    #[must_use]
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&self.timezone).date_naive());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }

    /// Calendar date of `instant` in the site timezone.
    #[must_use]
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// The last millisecond of `date` in the site timezone.
    ///
    /// This is one millisecond before the following day starts. When the
    /// following midnight is repeated the first occurrence counts; when it is
    /// skipped the day starts at the first local time that exists.
    ///
    /// Returns `None` when the result falls outside chrono's range.
    #[must_use]
    pub fn end_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let midnight = date.succ_opt()?.and_time(NaiveTime::MIN);

        let next_day_start = (0..=MAX_GAP_MINUTES).find_map(|minutes| {
            let local = midnight.checked_add_signed(Duration::minutes(minutes))?;
            self.timezone.from_local_datetime(&local).earliest()
        })?;

        next_day_start
            .with_timezone(&Utc)
            .checked_sub_signed(Duration::milliseconds(1))
    }

    fn end_of_day_or_err(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        self.end_of_day(date).ok_or(GatepassError::ExpiryOutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn end_of_utc_day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 23, 59, 59).unwrap() + Duration::milliseconds(999)
    }

    #[test]
    fn test_oneday_expires_end_of_registration_day_at_any_hour() {
        let policy = ExpiryPolicy::default();
        for hour in [0, 6, 12, 23] {
            let now = utc(2025, 1, 15, hour, 30);
            assert_eq!(
                policy.valid_until(VisitorType::OneDay, None, now).unwrap(),
                end_of_utc_day(2025, 1, 15)
            );
        }
    }

    #[test]
    fn test_oneday_ignores_requested_date() {
        let policy = ExpiryPolicy::default();
        let now = utc(2025, 1, 15, 10, 0);
        assert_eq!(
            policy.valid_until(VisitorType::OneDay, Some("2025-02-01"), now).unwrap(),
            end_of_utc_day(2025, 1, 15)
        );
    }

    #[test]
    fn test_multiday_defaults_to_three_days_out() {
        let policy = ExpiryPolicy::default();
        let now = utc(2025, 1, 15, 10, 0);
        assert_eq!(
            policy.valid_until(VisitorType::MultiDay, None, now).unwrap(),
            end_of_utc_day(2025, 1, 18)
        );
    }

    #[test]
    fn test_multiday_default_crosses_month_boundary() {
        let policy = ExpiryPolicy::default();
        let now = utc(2025, 1, 30, 22, 0);
        assert_eq!(
            policy.valid_until(VisitorType::MultiDay, None, now).unwrap(),
            end_of_utc_day(2025, 2, 2)
        );
    }

    #[test]
    fn test_multiday_uses_requested_date() {
        let policy = ExpiryPolicy::default();
        let now = utc(2025, 1, 15, 10, 0);
        assert_eq!(
            policy.valid_until(VisitorType::MultiDay, Some("2025-02-01"), now).unwrap(),
            end_of_utc_day(2025, 2, 1)
        );
    }

    #[test]
    fn test_multiday_falls_back_on_unparseable_date() {
        let policy = ExpiryPolicy::default();
        let now = utc(2025, 1, 15, 10, 0);
        for raw in ["next tuesday", "", "2025-13-40"] {
            assert_eq!(
                policy.valid_until(VisitorType::MultiDay, Some(raw), now).unwrap(),
                end_of_utc_day(2025, 1, 18)
            );
        }
    }

    #[test]
    fn test_rfc3339_date_is_read_in_site_timezone() {
        let policy = ExpiryPolicy::default();
        // 06:00 in Tokyo on Feb 1 is still Jan 31 in UTC.
        assert_eq!(
            policy.parse_date("2025-02-01T06:00:00+09:00"),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
    }

    #[test]
    fn test_custom_multiday_default() {
        let policy = ExpiryPolicy::new(chrono_tz::UTC, 7);
        let now = utc(2025, 1, 15, 10, 0);
        assert_eq!(
            policy.valid_until(VisitorType::MultiDay, None, now).unwrap(),
            end_of_utc_day(2025, 1, 22)
        );
    }

    #[test]
    fn test_site_timezone_sets_day_boundary() {
        let policy = ExpiryPolicy::new(chrono_tz::America::New_York, DEFAULT_MULTIDAY_DAYS);
        // 03:00 UTC on Mar 10 is 23:00 EDT on Mar 9.
        let now = utc(2025, 3, 10, 3, 0);
        let expiry = policy.valid_until(VisitorType::OneDay, None, now).unwrap();

        assert_eq!(expiry, utc(2025, 3, 10, 3, 59) + Duration::milliseconds(59_999));
        let local = expiry.with_timezone(&chrono_tz::America::New_York);
        assert_eq!(
            (local.hour(), local.minute(), local.second()),
            (23, 59, 59)
        );
        assert_eq!(local.nanosecond(), 999_000_000);
    }

    #[test]
    fn test_unrepresentable_requested_date_falls_back_to_default() {
        let policy = ExpiryPolicy::default();
        let now = utc(2025, 1, 15, 10, 0);
        for raw in ["+262142-12-31", "+262142-12-31T12:00:00Z"] {
            assert_eq!(
                policy.valid_until(VisitorType::MultiDay, Some(raw), now).unwrap(),
                end_of_utc_day(2025, 1, 18),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_last_calendar_day_has_no_end_in_any_timezone() {
        for tz in [chrono_tz::UTC, chrono_tz::America::New_York, chrono_tz::Asia::Tokyo] {
            let policy = ExpiryPolicy::new(tz, DEFAULT_MULTIDAY_DAYS);
            assert_eq!(policy.end_of_day(NaiveDate::MAX), None);
        }
    }

    #[test]
    fn test_default_expiry_past_calendar_end_is_an_error() {
        let policy = ExpiryPolicy::new(chrono_tz::UTC, 365);
        let now = NaiveDate::MAX
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert!(matches!(
            policy.valid_until(VisitorType::MultiDay, None, now),
            Err(GatepassError::ExpiryOutOfRange)
        ));
        assert!(matches!(
            policy.valid_until(VisitorType::OneDay, None, now),
            Err(GatepassError::ExpiryOutOfRange)
        ));
    }

    #[test]
    fn test_repeated_midnight_ends_day_at_first_occurrence() {
        // Havana falls back 01:00 CDT -> 00:00 CST on 2025-11-02, so local
        // midnight happens twice. Nov 1 ends just before the first one.
        let policy = ExpiryPolicy::new(chrono_tz::America::Havana, DEFAULT_MULTIDAY_DAYS);
        let date = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();

        let expiry = policy.end_of_day(date).unwrap();

        assert_eq!(expiry, utc(2025, 11, 2, 3, 59) + Duration::milliseconds(59_999));
        let local = expiry.with_timezone(&chrono_tz::America::Havana);
        assert_eq!(local.date_naive(), date);
        assert_eq!((local.hour(), local.minute(), local.second()), (23, 59, 59));
    }

    #[test]
    fn test_skipped_midnight_ends_day_before_gap() {
        // Havana springs forward 00:00 CST -> 01:00 CDT on 2025-03-09, so
        // local midnight never happens. Mar 8 ends at 23:59:59.999 CST.
        let policy = ExpiryPolicy::new(chrono_tz::America::Havana, DEFAULT_MULTIDAY_DAYS);
        let date = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();

        let expiry = policy.end_of_day(date).unwrap();

        assert_eq!(expiry, utc(2025, 3, 9, 4, 59) + Duration::milliseconds(59_999));
        let local = expiry.with_timezone(&chrono_tz::America::Havana);
        assert_eq!(local.date_naive(), date);
        assert_eq!((local.hour(), local.minute(), local.second()), (23, 59, 59));
        assert_eq!(local.nanosecond(), 999_000_000);
    }
}
