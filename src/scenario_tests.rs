//! End-to-end flows across the hierarchy, membership, diagnostic and
//! reporting engines against one in-memory registry.

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::repository as repo;
use crate::db::sqlite::open_memory_database;
use crate::diagnostics;
use crate::error::ClinicError;
use crate::hierarchy;
use crate::membership;
use crate::models::enums::RoleKind;
use crate::models::{Clinic, Diagnostic, Hospital, Person};
use crate::reporting;

struct Registry {
    conn: Connection,
    hospital: Hospital,
    cardio: Clinic,
    doctor: Person,
    patient: Person,
    hypertension: Diagnostic,
}

/// General → Cardio, d@x.com practising there, p@x.com enrolled with
/// Hypertension recorded by the doctor.
fn populated() -> Registry {
    let conn = open_memory_database().unwrap();
    let hospital = hierarchy::add_hospital(&conn, "General").unwrap();
    let cardio = hierarchy::add_clinic(&conn, &hospital.id, "Cardio").unwrap();

    membership::register_person(&conn, "d@x.com", "Dr. D").unwrap();
    membership::assign_doctor_role(&conn, "d@x.com").unwrap();
    let doctor = membership::add_doctor_to_clinic(&conn, "d@x.com", &cardio.id).unwrap();

    let patient = membership::register_person(&conn, "p@x.com", "P").unwrap();
    membership::add_patient_to_clinic(&conn, "p@x.com", &cardio.id).unwrap();

    let hypertension =
        diagnostics::add_diagnostic(&conn, &cardio.id, "Hypertension", "High blood pressure", Some(doctor.id))
            .unwrap();
    diagnostics::assign_diagnostic_to_patient(&conn, &hypertension.id, &patient.id).unwrap();

    Registry {
        conn,
        hospital,
        cardio,
        doctor,
        patient,
        hypertension,
    }
}

fn count(conn: &Connection, sql: &str, id: &Uuid) -> i64 {
    conn.query_row(sql, params![id.to_string()], |row| row.get(0)).unwrap()
}

fn is_patient(conn: &Connection, id: &Uuid) -> bool {
    repo::has_role(conn, id, RoleKind::Patient).unwrap()
}

#[test]
fn unenrolling_patient_keeps_doctor_and_catalog() {
    let r = populated();
    assert!(is_patient(&r.conn, &r.patient.id));

    let removal = membership::remove_patient_from_clinic(&r.conn, &r.patient.id, &r.cardio.id).unwrap();
    assert_eq!(removal.diagnostics_removed, 1);
    assert!(removal.patient_role_revoked);

    assert!(diagnostics::patient_diagnostics_in_clinic(&r.conn, &r.patient.id, &r.cardio.id)
        .unwrap()
        .is_empty());
    assert!(!is_patient(&r.conn, &r.patient.id));
    assert!(reporting::patients_in_clinic(&r.conn, &r.cardio.id).unwrap().is_empty());

    let doctor = repo::get_person(&r.conn, &r.doctor.id).unwrap().unwrap();
    assert_eq!(doctor.clinic_id, Some(r.cardio.id));
    assert!(repo::has_role(&r.conn, &r.doctor.id, RoleKind::Doctor).unwrap());
    assert_eq!(diagnostics::get_diagnostic(&r.conn, &r.hypertension.id).unwrap(), r.hypertension);
}

#[test]
fn removing_repopulated_hospital_clears_everything_under_it() {
    let r = populated();
    membership::remove_patient_from_clinic(&r.conn, &r.patient.id, &r.cardio.id).unwrap();

    // Re-populate the clinic
    membership::add_patient_to_clinic(&r.conn, "p@x.com", &r.cardio.id).unwrap();
    diagnostics::assign_diagnostic_to_patient(&r.conn, &r.hypertension.id, &r.patient.id).unwrap();
    hierarchy::add_service(&r.conn, &r.cardio.id, "ECG").unwrap();

    let removal = hierarchy::remove_hospital(&r.conn, &r.hospital.id).unwrap();
    assert_eq!(removal.clinics.len(), 1);
    assert_eq!(removal.clinics[0].services_removed, 1);
    assert_eq!(removal.clinics[0].doctors_detached, 1);

    let summary = serde_json::to_value(&removal).unwrap();
    assert_eq!(summary["clinics"][0]["patients_removed"], 1);
    assert_eq!(summary["clinics"][0]["diagnostics_removed"], 1);

    for table in ["clinics", "diagnostics", "services", "patient_clinics", "patient_diagnostics"] {
        let total: i64 = r
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap();
        assert_eq!(total, 0, "{table} not emptied");
    }

    let doctor = repo::get_person(&r.conn, &r.doctor.id).unwrap().unwrap();
    assert_eq!(doctor.clinic_id, None);
    assert!(repo::has_role(&r.conn, &r.doctor.id, RoleKind::Doctor).unwrap());
    assert!(!is_patient(&r.conn, &r.patient.id));
    assert!(matches!(
        hierarchy::get_hospital(&r.conn, &r.hospital.id),
        Err(ClinicError::NotFound { .. })
    ));
}

#[test]
fn clinic_belongs_to_hospital_listing_through_edits_and_removal() {
    let r = populated();
    let neuro = hierarchy::add_clinic(&r.conn, &r.hospital.id, "Neuro").unwrap();
    let listed = |conn: &Connection| -> Vec<Uuid> {
        reporting::clinics_by_hospital(conn).unwrap()[0]
            .clinics
            .iter()
            .map(|c| c.id)
            .collect()
    };
    assert_eq!(listed(&r.conn), vec![r.cardio.id, neuro.id]);

    let renamed = hierarchy::edit_clinic(&r.conn, &neuro.id, "Neurology").unwrap();
    assert_eq!(renamed.hospital_id, Some(r.hospital.id));
    assert!(listed(&r.conn).contains(&neuro.id));

    hierarchy::remove_clinic(&r.conn, &neuro.id).unwrap();
    assert_eq!(listed(&r.conn), vec![r.cardio.id]);
}

#[test]
fn doctor_roster_matches_clinic_assignment() {
    let r = populated();
    let roster = reporting::doctors_in_clinic(&r.conn, &r.cardio.id).unwrap();
    assert!(roster.iter().any(|p| p.id == r.doctor.id));
    assert!(!roster.iter().any(|p| p.id == r.patient.id));

    membership::remove_doctor_from_clinic(&r.conn, &r.doctor.id).unwrap();
    assert!(reporting::doctors_in_clinic(&r.conn, &r.cardio.id).unwrap().is_empty());
    assert_eq!(membership::doctor_clinic(&r.conn, &r.doctor.id).unwrap(), None);
}

#[test]
fn patient_role_tracks_enrollment_count() {
    let r = populated();
    let neuro = hierarchy::add_clinic(&r.conn, &r.hospital.id, "Neuro").unwrap();

    membership::add_patient_to_clinic(&r.conn, "p@x.com", &neuro.id).unwrap();
    assert!(is_patient(&r.conn, &r.patient.id));

    let first = membership::remove_patient_from_clinic(&r.conn, &r.patient.id, &r.cardio.id).unwrap();
    assert!(!first.patient_role_revoked);
    assert!(is_patient(&r.conn, &r.patient.id));

    let last = membership::remove_patient_from_clinic(&r.conn, &r.patient.id, &neuro.id).unwrap();
    assert!(last.patient_role_revoked);
    assert!(!is_patient(&r.conn, &r.patient.id));
}

#[test]
fn clinic_removal_leaves_nothing_referencing_it() {
    let r = populated();
    let other = membership::register_person(&r.conn, "q@x.com", "").unwrap();
    membership::add_patient_to_clinic(&r.conn, "q@x.com", &r.cardio.id).unwrap();
    diagnostics::add_diagnostic(&r.conn, &r.cardio.id, "Arrhythmia", "", None).unwrap();
    hierarchy::add_service(&r.conn, &r.cardio.id, "ECG").unwrap();

    let removal = hierarchy::remove_clinic(&r.conn, &r.cardio.id).unwrap();
    assert_eq!(removal.patients_removed, 2);
    assert_eq!(removal.patient_roles_revoked, 2);
    assert_eq!(removal.diagnostics_removed, 2);

    let id = &r.cardio.id;
    assert_eq!(count(&r.conn, "SELECT COUNT(*) FROM patient_clinics WHERE clinic_id = ?1", id), 0);
    assert_eq!(count(&r.conn, "SELECT COUNT(*) FROM diagnostics WHERE clinic_id = ?1", id), 0);
    assert_eq!(count(&r.conn, "SELECT COUNT(*) FROM services WHERE clinic_id = ?1", id), 0);
    assert_eq!(count(&r.conn, "SELECT COUNT(*) FROM people WHERE clinic_id = ?1", id), 0);
    assert_eq!(
        count(&r.conn, "SELECT COUNT(*) FROM patient_diagnostics WHERE diagnostic_id = ?1", &r.hypertension.id),
        0
    );
    assert!(!is_patient(&r.conn, &other.id));
}

#[test]
fn diagnostic_assignment_follows_enrollment() {
    let r = populated();
    let newcomer = membership::register_person(&r.conn, "n@x.com", "").unwrap();

    let err = diagnostics::assign_diagnostic_to_patient(&r.conn, &r.hypertension.id, &newcomer.id).unwrap_err();
    assert!(matches!(err, ClinicError::InvalidState(_)));

    membership::add_patient_to_clinic(&r.conn, "n@x.com", &r.cardio.id).unwrap();
    diagnostics::assign_diagnostic_to_patient(&r.conn, &r.hypertension.id, &newcomer.id).unwrap();

    membership::remove_patient_from_clinic(&r.conn, &newcomer.id, &r.cardio.id).unwrap();
    assert!(repo::get_patient_diagnostic(&r.conn, &newcomer.id, &r.hypertension.id)
        .unwrap()
        .is_none());
}

#[test]
fn reports_reflect_the_populated_registry() {
    let r = populated();
    let history = reporting::diagnostic_history(&r.conn, &r.patient.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].clinic_name, "Cardio");

    let by_doctor = reporting::diagnostics_from_doctor(&r.conn, &r.doctor.id).unwrap();
    assert_eq!(by_doctor.diagnostics, vec![r.hypertension.clone()]);

    let view = diagnostics::patient_diagnostics_in_clinic(&r.conn, &r.patient.id, &r.cardio.id).unwrap();
    assert_eq!(view[0].creator_email.as_deref(), Some("d@x.com"));

    assert_eq!(reporting::patients_with_diagnostics(&r.conn).unwrap(), vec![r.patient.clone()]);
}
