//! Bulk import of employees and certifications from tabular data
//!
//! Each row is processed on its own and ends in a [`RowOutcome`]. A bad row
//! never aborts the batch: it becomes an [`ImportIssue`] in the report and
//! the next row is processed.

mod codes;
mod common;
mod dates;
mod workbook;

pub use codes::{class_of, extract_codes, ExtractedCodes};
pub use common::{read_delimited, template_header, Delimiter, Field, ImportTable, RawRow};
pub use dates::parse_import_date;
pub use workbook::{is_workbook, read_workbook};

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::error::HabError;
use crate::core::org::{OrgTree, Placement, Resolver};
use crate::core::store::RecordStore;
use crate::core::text::title_case;
use crate::entities::certification::{CertClass, CodeSet, NewCertification};
use crate::entities::employee::{Matricule, NewEmployee};

/// Why a row was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingFields,
    InvalidIdentifier,
    DuplicateIdentifier,
    PlacementNotFound,
    InvalidValidationDate,
    ImportError,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingFields => "missing required fields",
            SkipReason::InvalidIdentifier => "invalid identifier",
            SkipReason::DuplicateIdentifier => "duplicate identifier",
            SkipReason::PlacementNotFound => "division/service/team not found",
            SkipReason::InvalidValidationDate => "missing or invalid validation date",
            SkipReason::ImportError => "import error",
        };
        write!(f, "{}", s)
    }
}

/// One skipped row, as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportIssue {
    #[serde(skip)]
    pub line: usize,
    pub identifier: String,
    pub division: String,
    pub service: String,
    pub team: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Imported,
    /// Imported after the placement names were corrected
    Corrected,
    Skipped(ImportIssue),
}

/// Diagnostics for a whole import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub corrected: usize,
    pub issues: Vec<ImportIssue>,
}

impl ImportReport {
    fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Imported => self.imported += 1,
            RowOutcome::Corrected => {
                self.imported += 1;
                self.corrected += 1;
            }
            RowOutcome::Skipped(issue) => {
                self.skipped += 1;
                self.issues.push(issue);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Run every step except persistence
    pub dry_run: bool,
}

/// Row importer bound to one store and one org tree
pub struct Importer<'a, S: RecordStore> {
    store: &'a mut S,
    resolver: Resolver<'a>,
    options: ImportOptions,
    /// Identifiers imported earlier in this batch
    seen: HashSet<String>,
}

impl<'a, S: RecordStore> Importer<'a, S> {
    pub fn new(store: &'a mut S, tree: &'a OrgTree, options: ImportOptions) -> Self {
        Self {
            store,
            resolver: Resolver::new(tree),
            options,
            seen: HashSet::new(),
        }
    }

    /// Process every row of `table` in order
    pub fn run(&mut self, table: &ImportTable) -> ImportReport {
        let mut report = ImportReport::default();
        for row in &table.rows {
            let outcome = self.process_row(table, row);
            report.record(outcome);
        }
        info!(
            imported = report.imported,
            skipped = report.skipped,
            corrected = report.corrected,
            dry_run = self.options.dry_run,
            "import finished"
        );
        report
    }

    pub fn process_row(&mut self, table: &ImportTable, row: &RawRow) -> RowOutcome {
        let cells = RowCells::read(table, row);
        match self.import_cells(table, row, &cells) {
            Ok(outcome) => outcome,
            Err(reason) => RowOutcome::Skipped(cells.issue(row.line, reason)),
        }
    }

    fn import_cells(
        &mut self,
        table: &ImportTable,
        row: &RawRow,
        cells: &RowCells,
    ) -> Result<RowOutcome, SkipReason> {
        if cells.identifier.is_empty() || cells.first_name.is_empty() || cells.last_name.is_empty() {
            return Err(SkipReason::MissingFields);
        }
        let matricule =
            Matricule::parse(&cells.identifier).map_err(|_| SkipReason::InvalidIdentifier)?;

        if self.seen.contains(matricule.as_str()) {
            return Err(SkipReason::DuplicateIdentifier);
        }
        match self.store.find_employee_by_matricule(matricule.as_str()) {
            Ok(Some(_)) => return Err(SkipReason::DuplicateIdentifier),
            Ok(None) => {}
            Err(e) => {
                error!(line = row.line, matricule = %matricule, error = %e, "lookup failed");
                return Err(SkipReason::ImportError);
            }
        }

        let placement = self
            .resolver
            .resolve(&cells.division, &cells.service, &cells.team)
            .map_err(|failure| {
                warn!(
                    line = row.line,
                    matricule = %matricule,
                    division = %cells.division,
                    service = %cells.service,
                    team = %cells.team,
                    "{}",
                    failure
                );
                SkipReason::PlacementNotFound
            })?;
        let corrected = cells.differs_from(&placement);

        let mut employee = NewEmployee::new(
            matricule.clone(),
            cells.first_name.clone(),
            cells.last_name.clone(),
            placement,
        )
        .map_err(|_| SkipReason::MissingFields)?;
        for cert in certifications(table, row)? {
            employee = employee.with_certification(cert);
        }

        if !self.options.dry_run {
            if let Err(e) = self.store.insert_employee(&employee) {
                error!(line = row.line, matricule = %matricule, error = %e, "insert failed");
                return Err(SkipReason::ImportError);
            }
        }
        self.seen.insert(matricule.as_str().to_string());

        Ok(if corrected {
            RowOutcome::Corrected
        } else {
            RowOutcome::Imported
        })
    }
}

/// Import a whole table into `store`
pub fn import_table<S: RecordStore>(
    store: &mut S,
    tree: &OrgTree,
    table: &ImportTable,
    options: ImportOptions,
) -> ImportReport {
    Importer::new(store, tree, options).run(table)
}

/// Identity and placement cells of a row, cleaned
struct RowCells {
    identifier: String,
    first_name: String,
    last_name: String,
    division: String,
    service: String,
    team: String,
}

impl RowCells {
    fn read(table: &ImportTable, row: &RawRow) -> Self {
        Self {
            identifier: table.get(row, Field::Matricule).to_string(),
            first_name: title_case(table.get(row, Field::FirstName)),
            last_name: title_case(table.get(row, Field::LastName)),
            division: title_case(table.get(row, Field::Division)),
            service: title_case(table.get(row, Field::Service)),
            team: title_case(table.get(row, Field::Team)),
        }
    }

    /// True when resolution changed any of the three names
    fn differs_from(&self, placement: &Placement) -> bool {
        title_case(&placement.division) != self.division
            || title_case(&placement.service) != self.service
            || title_case(&placement.team) != self.team
    }

    fn issue(&self, line: usize, reason: SkipReason) -> ImportIssue {
        ImportIssue {
            line,
            identifier: self.identifier.clone(),
            division: self.division.clone(),
            service: self.service.clone(),
            team: self.team.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Certifications carried by a row, one per class that has codes
fn certifications(table: &ImportTable, row: &RawRow) -> Result<Vec<NewCertification>, SkipReason> {
    let codes = extract_codes(table.free_cells(row));
    if codes.is_empty() {
        return Ok(Vec::new());
    }

    let validated_on = parse_import_date(table.get(row, Field::Validated))
        .ok_or(SkipReason::InvalidValidationDate)?;
    let expires_on = parse_import_date(table.get(row, Field::Expires));
    let numero = Some(table.get(row, Field::Numero).to_string());

    let mut certs = Vec::new();
    for class in CertClass::all() {
        let set = codes.get(*class);
        if set.is_empty() {
            continue;
        }
        let set = CodeSet::new(*class, set).map_err(|e: HabError| {
            error!(line = row.line, error = %e, "extracted codes rejected");
            SkipReason::ImportError
        })?;
        certs.push(
            NewCertification::new(*class, set, validated_on)
                .with_numero(numero.clone())
                .with_expiration(expires_on),
        );
    }
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::core::error::HabResult;
    use crate::core::store::{EmployeeFilter, Store};
    use crate::entities::employee::Employee;

    const HEADER: &str = "Matricule\tNom\tPrénom\tDivision\tService\tEquipe\tN° du titre\tDate Validation\tDate Expiration\tHabilitations";

    fn tsv(rows: &[&str]) -> ImportTable {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        read_delimited(&text, Delimiter::Tab).unwrap()
    }

    fn run(store: &mut Store, table: &ImportTable) -> ImportReport {
        import_table(store, &OrgTree::builtin(), table, ImportOptions::default())
    }

    fn store() -> Store {
        Store::open_in_memory(&OrgTree::builtin()).unwrap()
    }

    const GOOD: &str = "12345\tdupont\tjean\tCasa\tmaintenance\tTST Lignes\tT-1\t05/01/2024\t\tH1V, B1V, H1N";

    #[test]
    fn test_import_valid_row_with_both_classes() {
        let mut store = store();
        let report = run(&mut store, &tsv(&[GOOD]));
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.corrected, 1);

        let records = store.list_employee_records(&EmployeeFilter::default()).unwrap();
        let record = &records[0];
        assert_eq!(record.employee.first_name, "Jean");
        assert_eq!(record.employee.last_name, "Dupont");
        assert_eq!(record.employee.team, "Equipe TST Lignes Casa");
        assert_eq!(record.codes(CertClass::Ht), vec!["B1V", "H1V"]);
        assert_eq!(record.codes(CertClass::St), vec!["H1N"]);

        let ht = record.certifications.iter().find(|c| c.class == CertClass::Ht).unwrap();
        assert_eq!(ht.expires_on, NaiveDate::from_ymd_opt(2027, 1, 5).unwrap());
        assert_eq!(ht.numero.as_deref(), Some("T-1"));
    }

    #[test]
    fn test_spreadsheet_rows_import_like_delimited_rows() {
        let split = |line: &str| line.split('\t').map(str::to_string).collect::<Vec<_>>();
        let table = ImportTable::new(split(HEADER), vec![split(GOOD)]);

        let mut store = store();
        let report = run(&mut store, &table);
        assert_eq!(report.imported, 1);
        assert_eq!(report.corrected, 1);

        let records = store.list_employee_records(&EmployeeFilter::default()).unwrap();
        assert_eq!(records[0].employee.team, "Equipe TST Lignes Casa");
        assert_eq!(records[0].codes(CertClass::Ht), vec!["B1V", "H1V"]);
        assert_eq!(records[0].codes(CertClass::St), vec!["H1N"]);
    }

    #[test]
    fn test_exact_names_are_not_corrected() {
        let mut store = store();
        let row = "12345\tDupont\tJean\tDivision Exploitation Casa\tService Maintenance Casa\tEquipe TST Lignes Casa\t\t\t\t";
        let report = run(&mut store, &tsv(&[row]));
        assert_eq!(report.imported, 1);
        assert_eq!(report.corrected, 0);
    }

    #[test]
    fn test_same_row_twice_imports_once() {
        let mut store = store();
        let report = run(&mut store, &tsv(&[GOOD, GOOD]));
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.issues[0].reason, "duplicate identifier");

        // And again against the stored record
        let report = run(&mut store, &tsv(&[GOOD]));
        assert_eq!(report.imported, 0);
        assert_eq!(report.issues[0].reason, "duplicate identifier");
    }

    #[test]
    fn test_dry_run_writes_nothing_but_still_detects_duplicates() {
        let mut store = store();
        let options = ImportOptions { dry_run: true };
        let report = import_table(&mut store, &OrgTree::builtin(), &tsv(&[GOOD, GOOD]), options);
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.count_employees().unwrap(), 0);
    }

    #[test]
    fn test_garbage_division_yields_one_issue() {
        let mut store = store();
        let row = "12345\tDupont\tJean\tRabat\tnowhere\tnobody\t\t\t\t";
        let report = run(&mut store, &tsv(&[row]));
        assert_eq!(report.skipped, 1);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].reason, "division/service/team not found");
        assert_eq!(report.issues[0].division, "Rabat");
        assert_eq!(report.issues[0].line, 2);
    }

    #[test]
    fn test_missing_and_invalid_identity() {
        let mut store = store();
        let rows = [
            "\tDupont\tJean\tCasa\tmaintenance\tTST Lignes\t\t\t\t",
            "12345\tDupont\t\tCasa\tmaintenance\tTST Lignes\t\t\t\t",
            "123\tDupont\tJean\tCasa\tmaintenance\tTST Lignes\t\t\t\t",
        ];
        let report = run(&mut store, &tsv(&rows));
        let reasons: Vec<&str> = report.issues.iter().map(|i| i.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec!["missing required fields", "missing required fields", "invalid identifier"]
        );
    }

    #[test]
    fn test_codes_require_a_validation_date() {
        let mut store = store();
        let rows = [
            "11111\tDupont\tJean\tCasa\tmaintenance\tTST Lignes\t\tpas de date\t\tHC",
            // No codes: date problems do not matter
            "22222\tMartin\tAli\tCasa\tmaintenance\tTST Lignes\t\tpas de date\t\t",
        ];
        let report = run(&mut store, &tsv(&rows));
        assert_eq!(report.imported, 1);
        assert_eq!(report.issues[0].identifier, "11111");
        assert_eq!(report.issues[0].reason, "missing or invalid validation date");
    }

    #[test]
    fn test_explicit_expiration_is_trusted() {
        let mut store = store();
        let row = "12345\tDupont\tJean\tCasa\tmaintenance\tTST Lignes\t\tAOUT -2024\t15/09/2026\tH2T";
        run(&mut store, &tsv(&[row]));
        let records = store.list_employee_records(&EmployeeFilter::default()).unwrap();
        let cert = &records[0].certifications[0];
        assert_eq!(cert.validated_on, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());
        assert_eq!(cert.expires_on, NaiveDate::from_ymd_opt(2026, 9, 15).unwrap());
    }

    #[test]
    fn test_counters_cover_every_row() {
        let mut store = store();
        let rows = [
            GOOD,
            "\tDupont\tJean\tCasa\t\t\t\t\t\t",
            "54321\tMartin\tAli\tJadida\tconduite\tSafi\t\t\t\t",
            "",
            "99999\tX\tY\tAfourer\tmaintenance\tMars\t\t\t\t",
        ];
        let table = tsv(&rows);
        let report = run(&mut store, &table);
        assert_eq!(report.imported + report.skipped, table.rows.len());
        assert_eq!(table.rows.len(), 4);
    }

    struct FailingStore;

    impl RecordStore for FailingStore {
        fn find_employee_by_matricule(&self, _: &str) -> HabResult<Option<Employee>> {
            Ok(None)
        }

        fn insert_employee(&mut self, _: &NewEmployee) -> HabResult<i64> {
            Err(HabError::Validation("disk full".to_string()))
        }

        fn insert_certification(&mut self, _: i64, _: &NewCertification) -> HabResult<i64> {
            Err(HabError::Validation("disk full".to_string()))
        }
    }

    #[test]
    fn test_persistence_failure_is_counted_and_import_continues() {
        let mut store = FailingStore;
        let other = GOOD.replacen("12345", "54321", 1);
        let table = tsv(&[GOOD, &other]);
        let report = import_table(&mut store, &OrgTree::builtin(), &table, ImportOptions::default());
        assert_eq!(report.imported, 0);
        assert_eq!(report.skipped, 2);
        assert!(report.issues.iter().all(|i| i.reason == "import error"));
    }

    #[test]
    fn test_report_json_shape() {
        let mut store = store();
        let report = run(&mut store, &tsv(&["123\tA\tB\tCasa\t\t\t\t\t\t"]));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["skipped"], 1);
        let issue = &json["issues"][0];
        assert_eq!(issue["identifier"], "123");
        assert_eq!(issue["reason"], "invalid identifier");
        assert!(issue.get("line").is_none());
    }
}
