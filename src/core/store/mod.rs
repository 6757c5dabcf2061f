//! SQLite-backed record store
//!
//! This module provides the persistence layer for the tracker:
//! - the organizational hierarchy, synced from the configured [`OrgTree`]
//! - employees and their certifications (cascade on employee delete)
//! - batch renewal, deletion and attachment with per-item outcomes
//!
//! The database lives at `.hab/habilitations.db` inside a project.

mod batch;
mod queries;
mod schema;
mod types;

pub use types::*;

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::core::error::{HabError, HabResult};
use crate::core::org::{OrgTree, Placement};
use crate::core::project::Project;
use crate::entities::certification::NewCertification;
use crate::entities::employee::{Employee, NewEmployee};

/// Database file location within a project
pub const DB_FILE: &str = ".hab/habilitations.db";

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Persistence operations the bulk importer relies on
pub trait RecordStore {
    fn find_employee_by_matricule(&self, matricule: &str) -> HabResult<Option<Employee>>;

    /// Insert an employee together with its certifications, all or nothing
    fn insert_employee(&mut self, employee: &NewEmployee) -> HabResult<i64>;

    fn insert_certification(&mut self, employee_id: i64, cert: &NewCertification) -> HabResult<i64>;
}

/// The record store backed by SQLite
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the project database
    pub fn open(project: &Project, tree: &OrgTree) -> HabResult<Self> {
        Self::open_path(&project.root().join(DB_FILE), tree)
    }

    pub fn open_path(path: &Path, tree: &OrgTree) -> HabResult<Self> {
        debug!(path = %path.display(), "opening store");
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::configure(conn, tree)
    }

    /// Throwaway store, mostly for tests
    pub fn open_in_memory(tree: &OrgTree) -> HabResult<Self> {
        Self::configure(Connection::open_in_memory()?, tree)
    }

    fn configure(conn: Connection, tree: &OrgTree) -> HabResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut store = Self { conn };

        let version = store.stored_schema_version();
        if version > SCHEMA_VERSION {
            return Err(HabError::Validation(format!(
                "database schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }
        store.init_schema()?;
        store.sync_org_tree(tree)?;
        Ok(store)
    }

    /// Insert any divisions, services and teams missing from the database
    ///
    /// Existing rows keep their ids; nothing is ever removed here.
    pub fn sync_org_tree(&mut self, tree: &OrgTree) -> HabResult<()> {
        let tx = self.conn.transaction()?;
        for division in &tree.divisions {
            tx.execute(
                "INSERT OR IGNORE INTO divisions (name) VALUES (?1)",
                params![division.name],
            )?;
            let division_id: i64 = tx.query_row(
                "SELECT id FROM divisions WHERE name = ?1",
                params![division.name],
                |row| row.get(0),
            )?;

            for service in &division.services {
                tx.execute(
                    "INSERT OR IGNORE INTO services (name, division_id) VALUES (?1, ?2)",
                    params![service.name, division_id],
                )?;
                let service_id: i64 = tx.query_row(
                    "SELECT id FROM services WHERE name = ?1 AND division_id = ?2",
                    params![service.name, division_id],
                    |row| row.get(0),
                )?;

                for team in &service.teams {
                    tx.execute(
                        "INSERT OR IGNORE INTO teams (name, service_id) VALUES (?1, ?2)",
                        params![team, service_id],
                    )?;
                }
            }
        }
        tx.commit()?;
        debug!(divisions = tree.divisions.len(), "org tree synced");
        Ok(())
    }

    pub fn list_divisions(&self) -> HabResult<Vec<OrgUnit>> {
        self.list_units("SELECT id, name, NULL FROM divisions ORDER BY name", None)
    }

    pub fn list_services(&self, division_id: i64) -> HabResult<Vec<OrgUnit>> {
        self.list_units(
            "SELECT id, name, division_id FROM services WHERE division_id = ?1 ORDER BY name",
            Some(division_id),
        )
    }

    pub fn list_teams(&self, service_id: i64) -> HabResult<Vec<OrgUnit>> {
        self.list_units(
            "SELECT id, name, service_id FROM teams WHERE service_id = ?1 ORDER BY name",
            Some(service_id),
        )
    }

    fn list_units(&self, sql: &str, parent: Option<i64>) -> HabResult<Vec<OrgUnit>> {
        let mut stmt = self.conn.prepare(sql)?;
        let map = |row: &Row<'_>| {
            Ok(OrgUnit {
                id: row.get(0)?,
                name: row.get(1)?,
                parent_id: row.get(2)?,
            })
        };
        let rows = match parent {
            Some(id) => stmt.query_map(params![id], map)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    /// Map canonical names to ids, checking the division/service/team chain
    pub fn placement_ids(&self, placement: &Placement) -> HabResult<PlacementIds> {
        self.conn
            .query_row(
                r#"SELECT d.id, s.id, t.id
                   FROM teams t
                   JOIN services s ON t.service_id = s.id
                   JOIN divisions d ON s.division_id = d.id
                   WHERE d.name = ?1 AND s.name = ?2 AND t.name = ?3"#,
                params![placement.division, placement.service, placement.team],
                |row| {
                    Ok(PlacementIds {
                        division_id: row.get(0)?,
                        service_id: row.get(1)?,
                        team_id: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| HabError::not_found("placement", placement))
    }

    /// Map ids back to names; fails when the ids do not form one chain
    pub fn placement_from_ids(&self, ids: PlacementIds) -> HabResult<Placement> {
        self.conn
            .query_row(
                r#"SELECT d.name, s.name, t.name
                   FROM teams t
                   JOIN services s ON t.service_id = s.id
                   JOIN divisions d ON s.division_id = d.id
                   WHERE d.id = ?1 AND s.id = ?2 AND t.id = ?3"#,
                params![ids.division_id, ids.service_id, ids.team_id],
                |row| {
                    Ok(Placement {
                        division: row.get(0)?,
                        service: row.get(1)?,
                        team: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| {
                HabError::Validation(format!(
                    "team {} does not belong to service {} of division {}",
                    ids.team_id, ids.service_id, ids.division_id
                ))
            })
    }
}

impl RecordStore for Store {
    fn find_employee_by_matricule(&self, matricule: &str) -> HabResult<Option<Employee>> {
        Store::find_employee_by_matricule(self, matricule)
    }

    fn insert_employee(&mut self, employee: &NewEmployee) -> HabResult<i64> {
        Ok(self.create_employee(employee)?.id)
    }

    fn insert_certification(&mut self, employee_id: i64, cert: &NewCertification) -> HabResult<i64> {
        Ok(self.create_certification(employee_id, cert)?.id)
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Parse a stored timestamp, falling back to now for legacy/garbled values
pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests;
