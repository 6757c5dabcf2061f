//! Database schema initialization

use rusqlite::params;

use super::{Store, SCHEMA_VERSION};
use crate::core::error::HabResult;

impl Store {
    /// Create tables if missing and record the schema version
    pub(super) fn init_schema(&mut self) -> HabResult<()> {
        self.conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Organizational hierarchy, synced from the configured tree
            CREATE TABLE IF NOT EXISTS divisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS services (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                division_id INTEGER NOT NULL REFERENCES divisions(id) ON DELETE CASCADE,
                UNIQUE (name, division_id)
            );
            CREATE INDEX IF NOT EXISTS idx_services_division ON services(division_id);

            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
                UNIQUE (name, service_id)
            );
            CREATE INDEX IF NOT EXISTS idx_teams_service ON teams(service_id);

            -- Employees
            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                matricule TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                division_id INTEGER NOT NULL REFERENCES divisions(id),
                service_id INTEGER NOT NULL REFERENCES services(id),
                team_id INTEGER NOT NULL REFERENCES teams(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_employees_division ON employees(division_id);
            CREATE INDEX IF NOT EXISTS idx_employees_service ON employees(service_id);

            -- Certifications; codes is a JSON array
            CREATE TABLE IF NOT EXISTS certifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_id INTEGER NOT NULL REFERENCES employees(id) ON DELETE CASCADE,
                class TEXT NOT NULL CHECK (class IN ('HT', 'ST')),
                codes TEXT NOT NULL,
                numero TEXT,
                validated_on TEXT NOT NULL,
                expires_on TEXT NOT NULL,
                document TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_certifications_employee ON certifications(employee_id);
            CREATE INDEX IF NOT EXISTS idx_certifications_class ON certifications(class);
            CREATE INDEX IF NOT EXISTS idx_certifications_expires ON certifications(expires_on);
            "#,
        )?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Version recorded in the database, 0 when never initialized
    pub(super) fn stored_schema_version(&self) -> i32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<i32>>(0)
            })
            .ok()
            .flatten()
            .unwrap_or(0)
    }
}
