//! Certification lifecycle: expiration computation and status buckets
//!
//! Every function here takes `today` explicitly so results never depend on
//! the wall clock.

use chrono::{Months, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::core::error::{HabError, HabResult};
use crate::entities::certification::CertClass;

/// Days remaining at or below which a certification is due for renewal
pub const RENEWAL_WINDOW_DAYS: i64 = 90;

/// Expiration status derived from days remaining; never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBucket {
    /// Already past its expiration date
    Expired,
    /// Expires within 30 days
    Critical,
    /// Expires in 31..=60 days
    Warning,
    /// Expires in 61..=90 days
    Notice,
    Valid,
}

impl StatusBucket {
    pub fn all() -> &'static [StatusBucket] {
        &[
            StatusBucket::Expired,
            StatusBucket::Critical,
            StatusBucket::Warning,
            StatusBucket::Notice,
            StatusBucket::Valid,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBucket::Expired => "expired",
            StatusBucket::Critical => "critical",
            StatusBucket::Warning => "warning",
            StatusBucket::Notice => "notice",
            StatusBucket::Valid => "valid",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusBucket::Expired => "expired",
            StatusBucket::Critical => "1 month",
            StatusBucket::Warning => "2 months",
            StatusBucket::Notice => "3 months",
            StatusBucket::Valid => "valid",
        }
    }

    /// Inside the renewal window (not expired, not comfortably valid)
    pub fn is_due(&self) -> bool {
        matches!(
            self,
            StatusBucket::Critical | StatusBucket::Warning | StatusBucket::Notice
        )
    }
}

impl fmt::Display for StatusBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StatusBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expired" => Ok(StatusBucket::Expired),
            "critical" | "1m" | "1month" => Ok(StatusBucket::Critical),
            "warning" | "2m" | "2months" => Ok(StatusBucket::Warning),
            "notice" | "3m" | "3months" => Ok(StatusBucket::Notice),
            "valid" => Ok(StatusBucket::Valid),
            _ => Err(format!(
                "Invalid status: {}. Use expired, critical, warning, notice, or valid",
                s
            )),
        }
    }
}

/// Validation date + class duration, in calendar months
///
/// Month arithmetic clamps to the end of the month, so a Feb 29 validation
/// lands on Feb 28 in a non-leap target year.
pub fn compute_expiration(validated_on: NaiveDate, class: CertClass) -> HabResult<NaiveDate> {
    validated_on
        .checked_add_months(Months::new(class.validity_months()))
        .ok_or_else(|| HabError::InvalidDate(validated_on.to_string()))
}

/// Same as [`compute_expiration`] for a `YYYY-MM-DD` string
pub fn compute_expiration_str(validated_on: &str, class: CertClass) -> HabResult<NaiveDate> {
    compute_expiration(parse_iso_date(validated_on)?, class)
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_iso_date(s: &str) -> HabResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| HabError::InvalidDate(s.to_string()))
}

/// Whole days from `today` until `expires_on` (negative once expired)
pub fn days_until(expires_on: NaiveDate, today: NaiveDate) -> i64 {
    (expires_on - today).num_days()
}

pub fn classify(expires_on: NaiveDate, today: NaiveDate) -> StatusBucket {
    match days_until(expires_on, today) {
        d if d < 0 => StatusBucket::Expired,
        0..=30 => StatusBucket::Critical,
        31..=60 => StatusBucket::Warning,
        61..=RENEWAL_WINDOW_DAYS => StatusBucket::Notice,
        _ => StatusBucket::Valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_expiration_per_class() {
        assert_eq!(compute_expiration(d(2024, 1, 5), CertClass::Ht).unwrap(), d(2027, 1, 5));
        assert_eq!(compute_expiration(d(2024, 1, 5), CertClass::St).unwrap(), d(2025, 1, 5));
    }

    #[test]
    fn test_expiration_leap_day_clamps() {
        assert_eq!(compute_expiration(d(2024, 2, 29), CertClass::St).unwrap(), d(2025, 2, 28));
        assert_eq!(compute_expiration(d(2024, 2, 29), CertClass::Ht).unwrap(), d(2027, 2, 28));
    }

    #[test]
    fn test_expiration_from_string() {
        assert_eq!(compute_expiration_str("2023-06-15", CertClass::Ht).unwrap(), d(2026, 6, 15));
        assert!(matches!(
            compute_expiration_str("15/06/2023", CertClass::Ht),
            Err(HabError::InvalidDate(_))
        ));
        assert!(compute_expiration_str("", CertClass::St).is_err());
    }

    #[test]
    fn test_bucket_boundaries() {
        let today = d(2025, 1, 1);
        assert_eq!(classify(d(2024, 12, 31), today), StatusBucket::Expired);
        assert_eq!(classify(d(2025, 1, 1), today), StatusBucket::Critical);
        assert_eq!(classify(d(2025, 1, 31), today), StatusBucket::Critical);
        assert_eq!(classify(d(2025, 2, 1), today), StatusBucket::Warning);
        assert_eq!(classify(d(2025, 3, 2), today), StatusBucket::Warning);
        assert_eq!(classify(d(2025, 3, 3), today), StatusBucket::Notice);
        assert_eq!(classify(d(2025, 4, 1), today), StatusBucket::Notice);
        assert_eq!(classify(d(2025, 4, 2), today), StatusBucket::Valid);
    }

    #[test]
    fn test_days_until_sign() {
        assert_eq!(days_until(d(2025, 1, 11), d(2025, 1, 1)), 10);
        assert_eq!(days_until(d(2024, 12, 22), d(2025, 1, 1)), -10);
    }

    #[test]
    fn test_is_due() {
        assert!(!StatusBucket::Expired.is_due());
        assert!(StatusBucket::Critical.is_due());
        assert!(StatusBucket::Notice.is_due());
        assert!(!StatusBucket::Valid.is_due());
    }
}
