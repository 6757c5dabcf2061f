//! Employee and certification CRUD

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    date_column, date_param, now_rfc3339, parse_datetime, CertFilter, EmployeeFilter,
    EmployeeRecord, Store,
};
use crate::core::error::{HabError, HabResult};
use crate::core::lifecycle::{self, RENEWAL_WINDOW_DAYS};
use crate::entities::certification::{
    CertClass, Certification, CertificationRow, CertificationUpdate, CodeSet, NewCertification,
};
use crate::entities::employee::{Employee, EmployeeUpdate, NewEmployee};

const EMPLOYEE_SELECT: &str = r#"
    SELECT e.id, e.matricule, e.first_name, e.last_name,
           e.division_id, e.service_id, e.team_id,
           d.name, s.name, t.name,
           e.created_at, e.updated_at
    FROM employees e
    JOIN divisions d ON e.division_id = d.id
    JOIN services s ON e.service_id = s.id
    JOIN teams t ON e.team_id = t.id
"#;

const CERT_SELECT: &str = r#"
    SELECT c.id, c.employee_id, c.class, c.codes, c.numero,
           c.validated_on, c.expires_on, c.document
    FROM certifications c
"#;

const CERT_ROW_SELECT: &str = r#"
    SELECT c.id, c.employee_id, c.class, c.codes, c.numero,
           c.validated_on, c.expires_on, c.document,
           e.matricule, e.first_name, e.last_name,
           d.name, s.name, t.name
    FROM certifications c
    JOIN employees e ON c.employee_id = e.id
    JOIN divisions d ON e.division_id = d.id
    JOIN services s ON e.service_id = s.id
    JOIN teams t ON e.team_id = t.id
"#;

impl Store {
    // =========================================================================
    // Employees
    // =========================================================================

    /// Insert an employee and its certifications in one transaction
    pub fn create_employee(&mut self, new: &NewEmployee) -> HabResult<Employee> {
        if self.find_employee_by_matricule(new.matricule.as_str())?.is_some() {
            return Err(HabError::Conflict(format!(
                "identifier {} already exists",
                new.matricule
            )));
        }
        let ids = self.placement_ids(&new.placement)?;
        let now = now_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"INSERT INTO employees
               (matricule, first_name, last_name, division_id, service_id, team_id, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)"#,
            params![
                new.matricule.as_str(),
                new.first_name,
                new.last_name,
                ids.division_id,
                ids.service_id,
                ids.team_id,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        for cert in &new.certifications {
            insert_certification_row(&tx, id, cert, &now)?;
        }
        tx.commit()?;

        self.get_employee(id)
    }

    pub fn get_employee(&self, id: i64) -> HabResult<Employee> {
        self.conn
            .query_row(
                &format!("{} WHERE e.id = ?1", EMPLOYEE_SELECT),
                params![id],
                map_employee,
            )
            .optional()?
            .ok_or_else(|| HabError::not_found("employee", id))
    }

    pub fn find_employee_by_matricule(&self, matricule: &str) -> HabResult<Option<Employee>> {
        Ok(self
            .conn
            .query_row(
                &format!("{} WHERE e.matricule = ?1", EMPLOYEE_SELECT),
                params![matricule.trim()],
                map_employee,
            )
            .optional()?)
    }

    /// Resolve a numeric id or a matricule to an employee
    pub fn lookup_employee(&self, key: &str) -> HabResult<Employee> {
        let key = key.trim();
        if let Some(emp) = self.find_employee_by_matricule(key)? {
            return Ok(emp);
        }
        match key.parse::<i64>() {
            Ok(id) => self.get_employee(id),
            Err(_) => Err(HabError::not_found("employee", key)),
        }
    }

    /// Employees matching `filter`, ordered by matricule
    pub fn list_employees(&self, filter: &EmployeeFilter) -> HabResult<Vec<Employee>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY e.matricule", EMPLOYEE_SELECT))?;
        let employees = stmt
            .query_map([], map_employee)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(employees.into_iter().filter(|e| filter.matches(e)).collect())
    }

    /// Employees matching `filter` with their certifications attached
    pub fn list_employee_records(&self, filter: &EmployeeFilter) -> HabResult<Vec<EmployeeRecord>> {
        let employees = self.list_employees(filter)?;

        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY c.expires_on, c.id", CERT_SELECT))?;
        let mut by_owner: HashMap<i64, Vec<Certification>> = HashMap::new();
        for cert in stmt.query_map([], map_certification)? {
            let cert = cert?;
            by_owner.entry(cert.employee_id).or_default().push(cert);
        }

        Ok(employees
            .into_iter()
            .map(|employee| EmployeeRecord {
                certifications: by_owner.remove(&employee.id).unwrap_or_default(),
                employee,
            })
            .collect())
    }

    /// Replace an employee's identity and placement
    pub fn update_employee(&mut self, id: i64, update: &EmployeeUpdate) -> HabResult<Employee> {
        self.get_employee(id)?;
        if let Some(other) = self.find_employee_by_matricule(update.matricule.as_str())? {
            if other.id != id {
                return Err(HabError::Conflict(format!(
                    "identifier {} already belongs to employee {}",
                    update.matricule, other.id
                )));
            }
        }
        let first_name = update.first_name.trim();
        let last_name = update.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(HabError::Validation(
                "first name and last name are required".to_string(),
            ));
        }
        let ids = self.placement_ids(&update.placement)?;

        self.conn.execute(
            r#"UPDATE employees
               SET matricule = ?1, first_name = ?2, last_name = ?3,
                   division_id = ?4, service_id = ?5, team_id = ?6, updated_at = ?7
               WHERE id = ?8"#,
            params![
                update.matricule.as_str(),
                first_name,
                last_name,
                ids.division_id,
                ids.service_id,
                ids.team_id,
                now_rfc3339(),
                id
            ],
        )?;
        self.get_employee(id)
    }

    /// Delete an employee; its certifications go with it
    pub fn delete_employee(&mut self, id: i64) -> HabResult<Employee> {
        let employee = self.get_employee(id)?;
        self.conn
            .execute("DELETE FROM employees WHERE id = ?1", params![id])?;
        Ok(employee)
    }

    // =========================================================================
    // Certifications
    // =========================================================================

    pub fn create_certification(
        &mut self,
        employee_id: i64,
        cert: &NewCertification,
    ) -> HabResult<Certification> {
        self.get_employee(employee_id)?;
        let id = insert_certification_row(&self.conn, employee_id, cert, &now_rfc3339())?;
        self.get_certification(id)
    }

    pub fn get_certification(&self, id: i64) -> HabResult<Certification> {
        self.conn
            .query_row(
                &format!("{} WHERE c.id = ?1", CERT_SELECT),
                params![id],
                map_certification,
            )
            .optional()?
            .ok_or_else(|| HabError::not_found("certification", id))
    }

    /// Certification joined with its owner, status computed for `today`
    pub fn get_certification_row(&self, id: i64, today: NaiveDate) -> HabResult<CertificationRow> {
        self.conn
            .query_row(
                &format!("{} WHERE c.id = ?1", CERT_ROW_SELECT),
                params![id],
                |row| map_certification_row(row, today),
            )
            .optional()?
            .ok_or_else(|| HabError::not_found("certification", id))
    }

    /// Certifications matching `filter`, soonest expiration first
    pub fn list_certifications(
        &self,
        filter: &CertFilter,
        today: NaiveDate,
    ) -> HabResult<Vec<CertificationRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY c.expires_on, c.id", CERT_ROW_SELECT))?;
        let rows = stmt
            .query_map([], |row| map_certification_row(row, today))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().filter(|r| filter.matches(r)).collect())
    }

    /// Certifications expiring within `max_days` (not yet expired), soonest first
    pub fn list_renewals(&self, max_days: i64, today: NaiveDate) -> HabResult<Vec<CertificationRow>> {
        let max_days = max_days.clamp(0, RENEWAL_WINDOW_DAYS);
        let mut rows: Vec<CertificationRow> = self
            .list_certifications(&CertFilter::default(), today)?
            .into_iter()
            .filter(|r| (0..=max_days).contains(&r.days_remaining))
            .collect();
        rows.sort_by(|a, b| {
            a.days_remaining
                .cmp(&b.days_remaining)
                .then_with(|| a.matricule.cmp(&b.matricule))
        });
        Ok(rows)
    }

    /// Apply a partial update; expiration is recomputed unless overridden
    pub fn update_certification(
        &mut self,
        id: i64,
        update: &CertificationUpdate,
    ) -> HabResult<Certification> {
        let current = self.get_certification(id)?;

        let codes = match update.codes {
            Some(ref codes) => CodeSet::new(current.class, codes)?,
            None => current.codes,
        };
        let numero = match update.numero {
            Some(ref numero) => numero.clone().filter(|n| !n.trim().is_empty()),
            None => current.numero,
        };
        let validated_on = update.validated_on.unwrap_or(current.validated_on);
        let expires_on = match update.expires_on {
            Some(date) => date,
            None => lifecycle::compute_expiration(validated_on, current.class)?,
        };

        self.conn.execute(
            r#"UPDATE certifications
               SET codes = ?1, numero = ?2, validated_on = ?3, expires_on = ?4, updated_at = ?5
               WHERE id = ?6"#,
            params![
                codes.to_json()?,
                numero,
                date_param(validated_on),
                date_param(expires_on),
                now_rfc3339(),
                id
            ],
        )?;
        self.get_certification(id)
    }

    pub fn delete_certification(&mut self, id: i64) -> HabResult<Certification> {
        let cert = self.get_certification(id)?;
        self.conn
            .execute("DELETE FROM certifications WHERE id = ?1", params![id])?;
        Ok(cert)
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// Store an opaque document reference on a certification
    pub fn set_attachment(&mut self, id: i64, reference: &str) -> HabResult<Certification> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(HabError::Validation(
                "attachment reference must not be empty".to_string(),
            ));
        }
        self.get_certification(id)?;
        self.conn.execute(
            "UPDATE certifications SET document = ?1, updated_at = ?2 WHERE id = ?3",
            params![reference, now_rfc3339(), id],
        )?;
        self.get_certification(id)
    }

    pub fn clear_attachment(&mut self, id: i64) -> HabResult<Certification> {
        let cert = self.get_certification(id)?;
        if cert.document.is_none() {
            return Err(HabError::not_found("attachment", format!("certification {}", id)));
        }
        self.conn.execute(
            "UPDATE certifications SET document = NULL, updated_at = ?1 WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        self.get_certification(id)
    }

    // =========================================================================
    // Counts
    // =========================================================================

    pub fn count_employees(&self) -> HabResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn count_certifications(&self) -> HabResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM certifications", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn insert_certification_row(
    conn: &Connection,
    employee_id: i64,
    cert: &NewCertification,
    now: &str,
) -> HabResult<i64> {
    let expires_on = cert.effective_expiration()?;
    conn.execute(
        r#"INSERT INTO certifications
           (employee_id, class, codes, numero, validated_on, expires_on, document, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?7)"#,
        params![
            employee_id,
            cert.class.as_str(),
            cert.codes.to_json()?,
            cert.numero,
            date_param(cert.validated_on),
            date_param(expires_on),
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn map_employee(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        matricule: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        division_id: row.get(4)?,
        service_id: row.get(5)?,
        team_id: row.get(6)?,
        division: row.get(7)?,
        service: row.get(8)?,
        team: row.get(9)?,
        created_at: parse_datetime(row.get(10)?),
        updated_at: parse_datetime(row.get(11)?),
    })
}

fn map_certification(row: &Row<'_>) -> rusqlite::Result<Certification> {
    let class: String = row.get(2)?;
    let class: CertClass = class.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
    })?;
    let codes: String = row.get(3)?;
    let codes = CodeSet::from_json(&codes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Certification {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        class,
        codes,
        numero: row.get(4)?,
        validated_on: date_column(row, 5)?,
        expires_on: date_column(row, 6)?,
        document: row.get(7)?,
    })
}

fn map_certification_row(row: &Row<'_>, today: NaiveDate) -> rusqlite::Result<CertificationRow> {
    let certification = map_certification(row)?;
    Ok(CertificationRow {
        days_remaining: certification.days_remaining(today),
        status: certification.status(today),
        certification,
        matricule: row.get(8)?,
        first_name: row.get(9)?,
        last_name: row.get(10)?,
        division: row.get(11)?,
        service: row.get(12)?,
        team: row.get(13)?,
    })
}
