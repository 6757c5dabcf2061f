//! Employee records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{HabError, HabResult};
use crate::core::org::Placement;
use crate::entities::certification::NewCertification;

/// Five-digit employee identifier, unique across the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Matricule(String);

impl Matricule {
    pub fn parse(raw: &str) -> HabResult<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 5 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(HabError::Validation(format!(
                "identifier must be 5 digits, got '{}'",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Matricule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Matricule {
    type Error = HabError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Matricule::parse(&value)
    }
}

impl From<Matricule> for String {
    fn from(m: Matricule) -> Self {
        m.0
    }
}

impl std::str::FromStr for Matricule {
    type Err = HabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Matricule::parse(s)
    }
}

/// A stored employee with its placement names joined in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Employee {
    pub id: i64,
    pub matricule: String,
    pub first_name: String,
    pub last_name: String,
    pub division_id: i64,
    pub service_id: i64,
    pub team_id: i64,
    pub division: String,
    pub service: String,
    pub team: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn placement(&self) -> Placement {
        Placement::new(&self.division, &self.service, &self.team)
    }
}

/// Fields for creating an employee (and optionally its certifications)
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub matricule: Matricule,
    pub first_name: String,
    pub last_name: String,
    pub placement: Placement,
    pub certifications: Vec<NewCertification>,
}

impl NewEmployee {
    pub fn new(
        matricule: Matricule,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        placement: Placement,
    ) -> HabResult<Self> {
        let first_name = first_name.into().trim().to_string();
        let last_name = last_name.into().trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(HabError::Validation(
                "first name and last name are required".to_string(),
            ));
        }
        Ok(Self {
            matricule,
            first_name,
            last_name,
            placement,
            certifications: Vec::new(),
        })
    }

    pub fn with_certification(mut self, cert: NewCertification) -> Self {
        self.certifications.push(cert);
        self
    }
}

/// Full replacement of an employee's editable fields
#[derive(Debug, Clone)]
pub struct EmployeeUpdate {
    pub matricule: Matricule,
    pub first_name: String,
    pub last_name: String,
    pub placement: Placement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matricule_accepts_five_digits() {
        assert_eq!(Matricule::parse(" 01234 ").unwrap().as_str(), "01234");
    }

    #[test]
    fn test_matricule_rejects_other_shapes() {
        for raw in ["1234", "123456", "12a45", "", "１２３４５"] {
            assert!(Matricule::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_new_employee_requires_names() {
        let placement = Placement::new("D", "S", "T");
        let m = Matricule::parse("12345").unwrap();
        assert!(NewEmployee::new(m.clone(), " ", "Dupont", placement.clone()).is_err());
        let emp = NewEmployee::new(m, " Jean ", "Dupont", placement).unwrap();
        assert_eq!(emp.first_name, "Jean");
    }
}
