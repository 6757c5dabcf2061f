//! Batch operations over certifications
//!
//! Each item is applied on its own, in input order. A failing item is
//! recorded in the report and the batch moves on; nothing is rolled back.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::{BatchReport, Store};
use crate::core::error::HabResult;
use crate::entities::certification::{Certification, CertificationUpdate};

impl Store {
    /// Delete each certification; unknown ids are reported, not fatal
    pub fn delete_certifications_batch(&mut self, ids: &[i64]) -> BatchReport<Certification> {
        let mut report = BatchReport::new();
        for &id in ids {
            match self.delete_certification(id) {
                Ok(cert) => report.done.push(cert),
                Err(e) => {
                    warn!(id, error = %e, "batch delete item failed");
                    report.fail(id, e);
                }
            }
        }
        info!(deleted = report.done.len(), failed = report.failed.len(), "batch delete finished");
        report
    }

    /// Renew each certification from one new validation date
    ///
    /// Expiration is recomputed from each record's own class, so a mixed
    /// HT/ST selection renews each item with its own duration. When `codes`
    /// is given it replaces the code set, validated against each record's
    /// class.
    pub fn renew_batch(
        &mut self,
        ids: &[i64],
        validated_on: NaiveDate,
        codes: Option<&[String]>,
    ) -> BatchReport<Certification> {
        let update = CertificationUpdate {
            codes: codes.map(<[String]>::to_vec),
            validated_on: Some(validated_on),
            ..Default::default()
        };

        let mut report = BatchReport::new();
        for &id in ids {
            match self.update_certification(id, &update) {
                Ok(cert) => report.done.push(cert),
                Err(e) => {
                    warn!(id, error = %e, "batch renew item failed");
                    report.fail(id, e);
                }
            }
        }
        info!(renewed = report.done.len(), failed = report.failed.len(), "batch renew finished");
        report
    }

    /// Attach one document reference per certification
    pub fn attach_batch(&mut self, items: &[(i64, String)]) -> BatchReport<Certification> {
        let mut report = BatchReport::new();
        for (id, reference) in items {
            match self.set_attachment(*id, reference) {
                Ok(cert) => report.done.push(cert),
                Err(e) => {
                    warn!(id, error = %e, "batch attach item failed");
                    report.fail(*id, e);
                }
            }
        }
        info!(attached = report.done.len(), failed = report.failed.len(), "batch attach finished");
        report
    }

    /// Ids of every certification held by one employee
    pub fn certification_ids_for(&self, employee_id: i64) -> HabResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM certifications WHERE employee_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map([employee_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}
