use chrono::NaiveDate;

use super::*;
use crate::core::lifecycle::{StatusBucket, RENEWAL_WINDOW_DAYS};
use crate::entities::certification::{CertClass, CertificationUpdate, CodeSet};
use crate::entities::employee::{EmployeeUpdate, Matricule};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn store() -> Store {
    Store::open_in_memory(&OrgTree::builtin()).unwrap()
}

fn casa_tst() -> Placement {
    Placement::new(
        "Division Exploitation Casa",
        "Service Maintenance Casa",
        "Equipe TST Lignes Casa",
    )
}

fn ht(codes: &str, validated: NaiveDate) -> NewCertification {
    NewCertification::new(CertClass::Ht, CodeSet::parse(CertClass::Ht, codes).unwrap(), validated)
}

fn st(codes: &str, validated: NaiveDate) -> NewCertification {
    NewCertification::new(CertClass::St, CodeSet::parse(CertClass::St, codes).unwrap(), validated)
}

fn employee(matricule: &str) -> NewEmployee {
    NewEmployee::new(Matricule::parse(matricule).unwrap(), "Jean", "Dupont", casa_tst()).unwrap()
}

#[test]
fn test_org_tree_is_synced() {
    let store = store();
    let divisions = store.list_divisions().unwrap();
    assert_eq!(divisions.len(), 3);
    let casa = divisions
        .iter()
        .find(|d| d.name == "Division Exploitation Casa")
        .unwrap();
    let services = store.list_services(casa.id).unwrap();
    assert_eq!(services.len(), 2);
    let maintenance = services
        .iter()
        .find(|s| s.name == "Service Maintenance Casa")
        .unwrap();
    assert_eq!(maintenance.parent_id, Some(casa.id));
    assert_eq!(store.list_teams(maintenance.id).unwrap().len(), 7);
}

#[test]
fn test_sync_is_idempotent() {
    let mut store = store();
    let before = store.list_divisions().unwrap();
    store.sync_org_tree(&OrgTree::builtin()).unwrap();
    assert_eq!(store.list_divisions().unwrap(), before);
}

#[test]
fn test_placement_ids_round_trip_and_chain_check() {
    let store = store();
    let ids = store.placement_ids(&casa_tst()).unwrap();
    assert_eq!(store.placement_from_ids(ids).unwrap(), casa_tst());

    let other = store
        .placement_ids(&Placement::new(
            "Division Exploitation Afourer",
            "Service Maintenance Afourer",
            "Equipe TST Lignes Afourer",
        ))
        .unwrap();
    let mixed = PlacementIds {
        team_id: other.team_id,
        ..ids
    };
    assert!(matches!(store.placement_from_ids(mixed), Err(HabError::Validation(_))));

    let bogus = Placement::new("Division Exploitation Casa", "Service Maintenance Casa", "Nope");
    assert!(matches!(store.placement_ids(&bogus), Err(HabError::NotFound { .. })));
}

#[test]
fn test_create_employee_with_certifications() {
    let mut store = store();
    let new = employee("12345")
        .with_certification(ht("H1V,B1V", d(2024, 1, 5)))
        .with_certification(st("H1N", d(2024, 1, 5)));
    let emp = store.create_employee(&new).unwrap();
    assert_eq!(emp.matricule, "12345");
    assert_eq!(emp.team, "Equipe TST Lignes Casa");

    let records = store.list_employee_records(&EmployeeFilter::default()).unwrap();
    assert_eq!(records.len(), 1);
    let certs = &records[0].certifications;
    assert_eq!(certs.len(), 2);
    let ht = certs.iter().find(|c| c.class == CertClass::Ht).unwrap();
    assert_eq!(ht.expires_on, d(2027, 1, 5));
    let st = certs.iter().find(|c| c.class == CertClass::St).unwrap();
    assert_eq!(st.expires_on, d(2025, 1, 5));
}

#[test]
fn test_duplicate_matricule_conflicts() {
    let mut store = store();
    store.create_employee(&employee("12345")).unwrap();
    let err = store.create_employee(&employee("12345")).unwrap_err();
    assert!(matches!(err, HabError::Conflict(_)));
    assert_eq!(store.count_employees().unwrap(), 1);
}

#[test]
fn test_update_employee_checks_matricule_owner() {
    let mut store = store();
    let a = store.create_employee(&employee("11111")).unwrap();
    store.create_employee(&employee("22222")).unwrap();

    let update = EmployeeUpdate {
        matricule: Matricule::parse("22222").unwrap(),
        first_name: "Ali".to_string(),
        last_name: "Bennani".to_string(),
        placement: casa_tst(),
    };
    assert!(matches!(store.update_employee(a.id, &update), Err(HabError::Conflict(_))));

    // Keeping its own matricule is fine
    let update = EmployeeUpdate {
        matricule: Matricule::parse("11111").unwrap(),
        ..update
    };
    let updated = store.update_employee(a.id, &update).unwrap();
    assert_eq!(updated.first_name, "Ali");
}

#[test]
fn test_delete_employee_cascades() {
    let mut store = store();
    let emp = store
        .create_employee(&employee("12345").with_certification(ht("HC", d(2024, 1, 5))))
        .unwrap();
    assert_eq!(store.count_certifications().unwrap(), 1);
    store.delete_employee(emp.id).unwrap();
    assert_eq!(store.count_certifications().unwrap(), 0);
    assert!(matches!(store.get_employee(emp.id), Err(HabError::NotFound { .. })));
}

#[test]
fn test_delete_certification_keeps_employee() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    let cert = store.create_certification(emp.id, &ht("HC", d(2024, 1, 5))).unwrap();
    store.delete_certification(cert.id).unwrap();
    assert!(store.get_employee(emp.id).is_ok());
}

#[test]
fn test_create_certification_for_unknown_employee() {
    let mut store = store();
    let err = store.create_certification(99, &ht("HC", d(2024, 1, 5))).unwrap_err();
    assert!(matches!(err, HabError::NotFound { kind: "employee", .. }));
}

#[test]
fn test_update_certification_recomputes_expiration() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    let cert = store.create_certification(emp.id, &st("H1N", d(2024, 3, 1))).unwrap();

    let renewed = store
        .update_certification(
            cert.id,
            &CertificationUpdate {
                validated_on: Some(d(2025, 3, 1)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(renewed.expires_on, d(2026, 3, 1));

    let overridden = store
        .update_certification(
            cert.id,
            &CertificationUpdate {
                expires_on: Some(d(2025, 12, 31)),
                numero: Some(Some("T-42".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(overridden.expires_on, d(2025, 12, 31));
    assert_eq!(overridden.numero.as_deref(), Some("T-42"));
}

#[test]
fn test_update_certification_rejects_foreign_codes() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    let cert = store.create_certification(emp.id, &st("H1N", d(2024, 3, 1))).unwrap();
    let err = store
        .update_certification(
            cert.id,
            &CertificationUpdate {
                codes: Some(vec!["H1V".to_string()]),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, HabError::Validation(_)));
}

#[test]
fn test_renew_batch_reads_class_per_record() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    let a = store.create_certification(emp.id, &ht("H1V", d(2020, 6, 1))).unwrap();
    let b = store.create_certification(emp.id, &st("H1N", d(2023, 2, 10))).unwrap();

    let report = store.renew_batch(&[a.id, b.id], d(2025, 3, 15), None);
    assert!(report.is_clean());
    assert_eq!(store.get_certification(a.id).unwrap().expires_on, d(2028, 3, 15));
    assert_eq!(store.get_certification(b.id).unwrap().expires_on, d(2026, 3, 15));
}

#[test]
fn test_renew_batch_keeps_going_after_failure() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    let a = store.create_certification(emp.id, &ht("H1V", d(2020, 6, 1))).unwrap();
    let b = store.create_certification(emp.id, &st("H1N", d(2023, 2, 10))).unwrap();

    // H1V is valid for the HT record only
    let codes = vec!["H1V".to_string()];
    let report = store.renew_batch(&[a.id, 999, b.id], d(2025, 3, 15), Some(&codes));
    assert_eq!(report.done.len(), 1);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].id, 999);
    assert_eq!(report.failed[1].id, b.id);
    assert_eq!(store.get_certification(a.id).unwrap().validated_on, d(2025, 3, 15));
    assert_eq!(store.get_certification(b.id).unwrap().validated_on, d(2023, 2, 10));
}

#[test]
fn test_delete_batch_reports_missing_ids() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    let a = store.create_certification(emp.id, &ht("HC", d(2024, 1, 1))).unwrap();
    let report = store.delete_certifications_batch(&[a.id, a.id, 77]);
    assert_eq!(report.done.len(), 1);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(store.count_certifications().unwrap(), 0);
}

#[test]
fn test_attachments() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    let cert = store.create_certification(emp.id, &ht("HC", d(2024, 1, 1))).unwrap();

    assert!(matches!(
        store.clear_attachment(cert.id),
        Err(HabError::NotFound { kind: "attachment", .. })
    ));
    assert!(store.set_attachment(cert.id, "  ").is_err());

    let report = store.attach_batch(&[(cert.id, "docs/hab-12345.pdf".to_string()), (5, "x".to_string())]);
    assert_eq!(report.done.len(), 1);
    assert_eq!(report.failed[0].id, 5);
    assert_eq!(
        store.get_certification(cert.id).unwrap().document.as_deref(),
        Some("docs/hab-12345.pdf")
    );

    let cleared = store.clear_attachment(cert.id).unwrap();
    assert!(cleared.document.is_none());
}

#[test]
fn test_list_certifications_filters_and_status() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    store.create_certification(emp.id, &st("H1N", d(2024, 1, 20))).unwrap(); // expires 2025-01-20
    store.create_certification(emp.id, &ht("HC", d(2024, 1, 1))).unwrap(); // expires 2027-01-01

    let today = d(2025, 1, 1);
    let all = store.list_certifications(&CertFilter::default(), today).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].status, StatusBucket::Critical);
    assert_eq!(all[0].days_remaining, 19);
    assert_eq!(all[0].matricule, "12345");

    let filter = CertFilter {
        class: Some(CertClass::Ht),
        ..Default::default()
    };
    let ht_only = store.list_certifications(&filter, today).unwrap();
    assert_eq!(ht_only.len(), 1);
    assert_eq!(ht_only[0].status, StatusBucket::Valid);

    let filter = CertFilter {
        owner: EmployeeFilter {
            division: Some("afourer".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(store.list_certifications(&filter, today).unwrap().is_empty());
}

#[test]
fn test_renewals_window() {
    let mut store = store();
    let emp = store.create_employee(&employee("12345")).unwrap();
    let today = d(2025, 1, 1);
    store.create_certification(emp.id, &st("H1N", d(2024, 3, 1))).unwrap(); // 59 days
    store.create_certification(emp.id, &st("H1T", d(2024, 1, 10))).unwrap(); // 9 days
    store.create_certification(emp.id, &st("H2N", d(2023, 12, 1))).unwrap(); // expired
    store.create_certification(emp.id, &st("H2T", d(2024, 6, 1))).unwrap(); // 151 days

    let due = store.list_renewals(RENEWAL_WINDOW_DAYS, today).unwrap();
    let days: Vec<i64> = due.iter().map(|r| r.days_remaining).collect();
    assert_eq!(days, vec![9, 59]);

    assert_eq!(store.list_renewals(30, today).unwrap().len(), 1);
}

#[test]
fn test_employee_filter_and_sort() {
    let mut store = store();
    let zed = NewEmployee::new(Matricule::parse("00002").unwrap(), "Zineb", "Alaoui", casa_tst()).unwrap();
    store
        .create_employee(&zed.with_certification(st("H1N", d(2024, 2, 1))))
        .unwrap();
    let amine = NewEmployee::new(
        Matricule::parse("00001").unwrap(),
        "Amine",
        "Zerouali",
        Placement::new(
            "Division Exploitation Afourer",
            "Service Conduite et Exploitation Afourer",
            "Equipe Conduite Kalaa",
        ),
    )
    .unwrap();
    store.create_employee(&amine).unwrap();

    let filter = EmployeeFilter {
        search: Some("kalaa".to_string()),
        ..Default::default()
    };
    let found = store.list_employees(&filter).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].first_name, "Amine");

    let mut records = store.list_employee_records(&EmployeeFilter::default()).unwrap();
    SortKey::Name.sort(&mut records);
    assert_eq!(records[0].employee.last_name, "Alaoui");
    SortKey::Expiration.sort(&mut records);
    assert_eq!(records[0].employee.matricule, "00002");
    assert_eq!(records[1].earliest_expiration(), None);
    assert!(records[0].has_status(StatusBucket::Critical, d(2025, 1, 15)));
}

#[test]
fn test_lookup_employee_by_matricule_or_id() {
    let mut store = store();
    let emp = store.create_employee(&employee("54321")).unwrap();
    assert_eq!(store.lookup_employee("54321").unwrap().id, emp.id);
    assert_eq!(store.lookup_employee(&emp.id.to_string()).unwrap().id, emp.id);
    assert!(store.lookup_employee("nobody").is_err());
}

#[test]
fn test_reopen_file_store_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hab.db");
    let tree = OrgTree::builtin();
    {
        let mut store = Store::open_path(&path, &tree).unwrap();
        store.create_employee(&employee("12345")).unwrap();
    }
    let store = Store::open_path(&path, &tree).unwrap();
    assert!(store.find_employee_by_matricule("12345").unwrap().is_some());
}
