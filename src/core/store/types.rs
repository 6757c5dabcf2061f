//! Query filters and result types for the store

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::lifecycle::StatusBucket;
use crate::core::text::normalize;
use crate::entities::certification::{CertClass, Certification, CertificationRow};
use crate::entities::employee::Employee;

/// One division, service or team row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgUnit {
    pub id: i64,
    pub name: String,
    /// Owning division (for services) or service (for teams)
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementIds {
    pub division_id: i64,
    pub service_id: i64,
    pub team_id: i64,
}

/// Employee filter; text fields match by normalized containment
#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    /// Matches matricule, first name, last name or team
    pub search: Option<String>,
    pub division: Option<String>,
    pub service: Option<String>,
    pub team: Option<String>,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        self.matches_fields(
            &employee.matricule,
            &employee.first_name,
            &employee.last_name,
            &employee.division,
            &employee.service,
            &employee.team,
        )
    }

    /// Same test against the owner columns of a certification row
    pub fn matches_row(&self, row: &CertificationRow) -> bool {
        self.matches_fields(
            &row.matricule,
            &row.first_name,
            &row.last_name,
            &row.division,
            &row.service,
            &row.team,
        )
    }

    fn matches_fields(
        &self,
        matricule: &str,
        first_name: &str,
        last_name: &str,
        division: &str,
        service: &str,
        team: &str,
    ) -> bool {
        if let Some(ref search) = self.search {
            let needle = normalize(search);
            let hit = [matricule, first_name, last_name, team]
                .iter()
                .any(|field| normalize(field).contains(&needle));
            if !hit {
                return false;
            }
        }

        contains(&self.division, division)
            && contains(&self.service, service)
            && contains(&self.team, team)
    }
}

fn contains(filter: &Option<String>, value: &str) -> bool {
    match filter {
        Some(f) => normalize(value).contains(&normalize(f)),
        None => true,
    }
}

/// Certification filter
#[derive(Debug, Clone, Default)]
pub struct CertFilter {
    /// Filters on the owning employee
    pub owner: EmployeeFilter,
    pub employee_id: Option<i64>,
    pub class: Option<CertClass>,
    pub status: Option<StatusBucket>,
}

impl CertFilter {
    pub fn matches(&self, row: &CertificationRow) -> bool {
        if !self.owner.matches_row(row) {
            return false;
        }
        if let Some(id) = self.employee_id {
            if row.certification.employee_id != id {
                return false;
            }
        }
        if let Some(class) = self.class {
            if row.certification.class != class {
                return false;
            }
        }
        if let Some(status) = self.status {
            if row.status != status {
                return false;
            }
        }
        true
    }
}

/// Sort order for employee listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Matricule,
    Name,
    /// Earliest certification expiration first; employees without any go last
    Expiration,
}

impl SortKey {
    pub fn sort(&self, records: &mut [EmployeeRecord]) {
        match self {
            SortKey::Matricule => {
                records.sort_by(|a, b| a.employee.matricule.cmp(&b.employee.matricule))
            }
            SortKey::Name => records.sort_by(|a, b| {
                (normalize(&a.employee.last_name), normalize(&a.employee.first_name))
                    .cmp(&(normalize(&b.employee.last_name), normalize(&b.employee.first_name)))
            }),
            SortKey::Expiration => records.sort_by(|a, b| {
                match (a.earliest_expiration(), b.earliest_expiration()) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
                .then_with(|| a.employee.matricule.cmp(&b.employee.matricule))
            }),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "matricule" | "id" => Ok(SortKey::Matricule),
            "name" => Ok(SortKey::Name),
            "expiration" | "expires" => Ok(SortKey::Expiration),
            _ => Err(format!("Invalid sort key: {}. Use matricule, name, or expiration", s)),
        }
    }
}

/// An employee with all of its certifications
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeRecord {
    #[serde(flatten)]
    pub employee: Employee,
    pub certifications: Vec<Certification>,
}

impl EmployeeRecord {
    pub fn earliest_expiration(&self) -> Option<NaiveDate> {
        self.certifications.iter().map(|c| c.expires_on).min()
    }

    /// True when at least one certification is in `bucket` on `today`
    pub fn has_status(&self, bucket: StatusBucket, today: NaiveDate) -> bool {
        self.certifications.iter().any(|c| c.status(today) == bucket)
    }

    /// Union of the codes held in one class, sorted
    pub fn codes(&self, class: CertClass) -> Vec<String> {
        let mut codes: Vec<String> = self
            .certifications
            .iter()
            .filter(|c| c.class == class)
            .flat_map(|c| c.codes.iter().map(str::to_string))
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }
}

/// Why one item of a batch was not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: i64,
    pub reason: String,
}

/// Per-item outcome of a batch operation
///
/// Items are applied one by one; earlier successes stay applied when a later
/// item fails.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    pub done: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self {
            done: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn fail(&mut self, id: i64, reason: impl ToString) {
        self.failed.push(BatchFailure {
            id,
            reason: reason.to_string(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self::new()
    }
}
