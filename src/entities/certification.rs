//! Certification ("habilitation") records
//!
//! A certification belongs to one employee, has a class (HT or ST) that
//! fixes both its validity duration and its code vocabulary, and carries a
//! validation date plus a derived expiration date.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::error::{HabError, HabResult};
use crate::core::lifecycle::{self, StatusBucket};

/// Codes a high-voltage (HT) certification may carry
pub const HT_CODES: &[&str] = &[
    "H0V", "B0V", "H1V", "B1V", "H2V", "B2V", "HC", "BR", "BC", "SF6",
];

/// Codes a low-voltage (ST) certification may carry
pub const ST_CODES: &[&str] = &["H1N", "H1T", "H2N", "H2T"];

/// Certification class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertClass {
    /// High voltage, valid 3 years
    Ht,
    /// Low voltage, valid 1 year
    St,
}

impl CertClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertClass::Ht => "HT",
            CertClass::St => "ST",
        }
    }

    pub fn all() -> &'static [CertClass] {
        &[CertClass::Ht, CertClass::St]
    }

    /// Validity duration in calendar months
    pub fn validity_months(&self) -> u32 {
        match self {
            CertClass::Ht => 36,
            CertClass::St => 12,
        }
    }

    /// Fixed code vocabulary for this class
    pub fn vocabulary(&self) -> &'static [&'static str] {
        match self {
            CertClass::Ht => HT_CODES,
            CertClass::St => ST_CODES,
        }
    }

    pub fn accepts(&self, code: &str) -> bool {
        self.vocabulary().contains(&code)
    }
}

impl fmt::Display for CertClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CertClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ht" => Ok(CertClass::Ht),
            "st" => Ok(CertClass::St),
            _ => Err(format!("Invalid certification class: {}. Use HT or ST", s)),
        }
    }
}

/// Non-empty, de-duplicated set of capability codes, all valid for one class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeSet(BTreeSet<String>);

impl CodeSet {
    /// Build a code set, upper-casing input and rejecting unknown codes
    pub fn new<I, S>(class: CertClass, codes: I) -> HabResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for code in codes {
            let code = code.as_ref().trim().to_uppercase();
            if code.is_empty() {
                continue;
            }
            if !class.accepts(&code) {
                return Err(HabError::Validation(format!(
                    "code '{}' is not a valid {} code (allowed: {})",
                    code,
                    class,
                    class.vocabulary().join(", ")
                )));
            }
            set.insert(code);
        }

        if set.is_empty() {
            return Err(HabError::Validation(format!(
                "a {} certification needs at least one code",
                class
            )));
        }

        Ok(Self(set))
    }

    /// Parse a comma/space separated list such as "H1V, B1V"
    pub fn parse(class: CertClass, list: &str) -> HabResult<Self> {
        Self::new(
            class,
            list.split(|c: char| c == ',' || c.is_whitespace()),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn to_json(&self) -> HabResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Decode a stored JSON array; stored rows were validated on write
    pub fn from_json(json: &str) -> HabResult<Self> {
        let codes: BTreeSet<String> = serde_json::from_str(json)?;
        Ok(Self(codes))
    }
}

impl fmt::Display for CodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iter().collect::<Vec<_>>().join(", "))
    }
}

/// A stored certification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    pub id: i64,
    pub employee_id: i64,
    pub class: CertClass,
    pub codes: CodeSet,
    /// Reference number printed on the certificate ("N° du titre")
    pub numero: Option<String>,
    pub validated_on: NaiveDate,
    pub expires_on: NaiveDate,
    /// Opaque attached-document reference (path or URL)
    pub document: Option<String>,
}

impl Certification {
    pub fn status(&self, today: NaiveDate) -> StatusBucket {
        lifecycle::classify(self.expires_on, today)
    }

    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        lifecycle::days_until(self.expires_on, today)
    }
}

/// Fields for inserting a certification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertification {
    pub class: CertClass,
    pub codes: CodeSet,
    pub numero: Option<String>,
    pub validated_on: NaiveDate,
    /// Explicit expiration; computed from the class when absent
    pub expires_on: Option<NaiveDate>,
}

impl NewCertification {
    pub fn new(class: CertClass, codes: CodeSet, validated_on: NaiveDate) -> Self {
        Self {
            class,
            codes,
            numero: None,
            validated_on,
            expires_on: None,
        }
    }

    pub fn with_numero(mut self, numero: Option<String>) -> Self {
        self.numero = numero.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_expiration(mut self, expires_on: Option<NaiveDate>) -> Self {
        self.expires_on = expires_on;
        self
    }

    /// Expiration to store: the explicit one, else validation + class duration
    pub fn effective_expiration(&self) -> HabResult<NaiveDate> {
        match self.expires_on {
            Some(date) => Ok(date),
            None => lifecycle::compute_expiration(self.validated_on, self.class),
        }
    }
}

/// Partial update of a single certification
#[derive(Debug, Clone, Default)]
pub struct CertificationUpdate {
    pub codes: Option<Vec<String>>,
    /// `Some(None)` clears the number
    pub numero: Option<Option<String>>,
    pub validated_on: Option<NaiveDate>,
    /// Overrides the recomputed expiration
    pub expires_on: Option<NaiveDate>,
}

/// Certification joined with its owner, with status derived for `today`
#[derive(Debug, Clone, Serialize)]
pub struct CertificationRow {
    #[serde(flatten)]
    pub certification: Certification,
    pub matricule: String,
    pub first_name: String,
    pub last_name: String,
    pub division: String,
    pub service: String,
    pub team: String,
    pub days_remaining: i64,
    pub status: StatusBucket,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_parse_and_display() {
        assert_eq!("ht".parse::<CertClass>().unwrap(), CertClass::Ht);
        assert_eq!(" St ".parse::<CertClass>().unwrap(), CertClass::St);
        assert!("xx".parse::<CertClass>().is_err());
        assert_eq!(CertClass::Ht.to_string(), "HT");
    }

    #[test]
    fn test_code_set_dedups_and_uppercases() {
        let codes = CodeSet::parse(CertClass::Ht, "h1v, B1V h1v").unwrap();
        assert_eq!(codes.len(), 2);
        assert!(codes.contains("H1V"));
        assert_eq!(codes.to_string(), "B1V, H1V");
    }

    #[test]
    fn test_code_set_rejects_foreign_vocabulary() {
        let err = CodeSet::parse(CertClass::St, "H1V").unwrap_err();
        assert!(matches!(err, HabError::Validation(_)));
    }

    #[test]
    fn test_code_set_rejects_empty() {
        assert!(CodeSet::parse(CertClass::Ht, " , ").is_err());
        assert!(CodeSet::new(CertClass::St, Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_code_set_json_roundtrip() {
        let codes = CodeSet::parse(CertClass::St, "H2T,H1N").unwrap();
        let json = codes.to_json().unwrap();
        assert_eq!(json, r#"["H1N","H2T"]"#);
        assert_eq!(CodeSet::from_json(&json).unwrap(), codes);
    }

    #[test]
    fn test_explicit_expiration_is_trusted() {
        let validated = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let explicit = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let cert = NewCertification::new(
            CertClass::Ht,
            CodeSet::parse(CertClass::Ht, "HC").unwrap(),
            validated,
        );
        assert_eq!(
            cert.effective_expiration().unwrap(),
            NaiveDate::from_ymd_opt(2027, 1, 5).unwrap()
        );
        let cert = cert.with_expiration(Some(explicit));
        assert_eq!(cert.effective_expiration().unwrap(), explicit);
    }
}
