//! Repository layer: table-scoped database operations.
//!
//! Each sub-module owns the SQL for one table. Functions take a plain
//! `&Connection` so they compose inside a caller's transaction.

mod clinic;
mod diagnostic;
mod hospital;
mod membership;
mod person;
mod role;
mod service;

use chrono::{NaiveDateTime, Timelike, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

pub use clinic::*;
pub use diagnostic::*;
pub use hospital::*;
pub use membership::*;
pub use person::*;
pub use role::*;
pub use service::*;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC time at the precision stored in the database. Whole seconds
/// only, so listings order by `rowid` (insertion order) rather than by this.
pub fn now_timestamp() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Uuid::parse_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::db::DatabaseError;
    use crate::models::*;
    use crate::models::enums::RoleKind;
    use rusqlite::Connection;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_hospital(conn: &Connection, name: &str) -> Hospital {
        let hospital = Hospital { id: Uuid::new_v4(), name: name.into() };
        insert_hospital(conn, &hospital).unwrap();
        hospital
    }

    fn make_clinic(conn: &Connection, hospital_id: Uuid, name: &str) -> Clinic {
        let clinic = Clinic { id: Uuid::new_v4(), name: name.into(), hospital_id: Some(hospital_id) };
        insert_clinic(conn, &clinic).unwrap();
        clinic
    }

    fn make_person(conn: &Connection, email: &str) -> Person {
        let person = Person {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: email.split('@').next().unwrap_or_default().into(),
            clinic_id: None,
        };
        insert_person(conn, &person).unwrap();
        person
    }

    fn make_diagnostic(conn: &Connection, clinic_id: Uuid, name: &str, creator: Option<Uuid>) -> Diagnostic {
        let diag = Diagnostic {
            id: Uuid::new_v4(),
            name: name.into(),
            description: format!("{name} description"),
            clinic_id,
            creator_id: creator,
        };
        insert_diagnostic(conn, &diag).unwrap();
        diag
    }

    #[test]
    fn hospital_insert_and_lookup_by_name() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        assert_eq!(get_hospital(&conn, &h.id).unwrap(), Some(h.clone()));
        assert_eq!(find_hospital_by_name(&conn, "General").unwrap(), Some(h));
        assert!(find_hospital_by_name(&conn, "Nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_hospital_name_is_unique_violation() {
        let conn = test_db();
        make_hospital(&conn, "General");
        let err = insert_hospital(&conn, &Hospital { id: Uuid::new_v4(), name: "General".into() })
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn delete_missing_hospital_is_not_found() {
        let conn = test_db();
        let err = delete_hospital(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn clinics_listed_per_hospital_in_name_order() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let other = make_hospital(&conn, "Other");
        make_clinic(&conn, h.id, "Neuro");
        make_clinic(&conn, h.id, "Cardio");
        make_clinic(&conn, other.id, "Derma");

        let names: Vec<String> = list_clinics_for_hospital(&conn, &h.id)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Cardio", "Neuro"]);
    }

    #[test]
    fn person_email_lookup_is_case_insensitive() {
        let conn = test_db();
        let p = make_person(&conn, "Doc@Example.com");
        let found = find_person_by_email(&conn, "doc@example.com").unwrap().unwrap();
        assert_eq!(found.id, p.id);
    }

    #[test]
    fn assign_person_clinic_is_compare_and_swap() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let a = make_clinic(&conn, h.id, "Cardio");
        let b = make_clinic(&conn, h.id, "Neuro");
        let p = make_person(&conn, "d@x.com");

        assert!(assign_person_clinic(&conn, &p.id, &a.id).unwrap());
        assert!(!assign_person_clinic(&conn, &p.id, &b.id).unwrap());
        assert_eq!(get_person(&conn, &p.id).unwrap().unwrap().clinic_id, Some(a.id));

        assert!(clear_person_clinic(&conn, &p.id).unwrap());
        assert!(!clear_person_clinic(&conn, &p.id).unwrap());
    }

    #[test]
    fn detach_clinic_roster_clears_every_doctor() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let c = make_clinic(&conn, h.id, "Cardio");
        let d1 = make_person(&conn, "d1@x.com");
        let d2 = make_person(&conn, "d2@x.com");
        assign_person_clinic(&conn, &d1.id, &c.id).unwrap();
        assign_person_clinic(&conn, &d2.id, &c.id).unwrap();
        assert_eq!(list_people_in_clinic(&conn, &c.id).unwrap().len(), 2);

        assert_eq!(detach_clinic_roster(&conn, &c.id).unwrap(), 2);
        assert!(list_people_in_clinic(&conn, &c.id).unwrap().is_empty());
    }

    #[test]
    fn grant_role_reports_whether_it_changed_anything() {
        let conn = test_db();
        let p = make_person(&conn, "p@x.com");
        assert!(grant_role(&conn, &p.id, RoleKind::Patient).unwrap());
        assert!(!grant_role(&conn, &p.id, RoleKind::Patient).unwrap());
        assert!(has_role(&conn, &p.id, RoleKind::Patient).unwrap());
        assert!(!has_role(&conn, &p.id, RoleKind::Doctor).unwrap());
        assert_eq!(roles_for_person(&conn, &p.id).unwrap(), vec![RoleKind::Patient]);

        assert!(revoke_role(&conn, &p.id, RoleKind::Patient).unwrap());
        assert!(!revoke_role(&conn, &p.id, RoleKind::Patient).unwrap());
    }

    #[test]
    fn people_with_role_filters_by_role() {
        let conn = test_db();
        let d = make_person(&conn, "d@x.com");
        let p = make_person(&conn, "p@x.com");
        grant_role(&conn, &d.id, RoleKind::Doctor).unwrap();
        grant_role(&conn, &p.id, RoleKind::Patient).unwrap();

        let doctors = list_people_with_role(&conn, RoleKind::Doctor).unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].id, d.id);
    }

    #[test]
    fn membership_rows_and_counts() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let a = make_clinic(&conn, h.id, "Cardio");
        let b = make_clinic(&conn, h.id, "Neuro");
        let p = make_person(&conn, "p@x.com");

        for clinic in [&a, &b] {
            insert_patient_clinic(&conn, &PatientClinic {
                patient_id: p.id,
                clinic_id: clinic.id,
                enrolled_at: now_timestamp(),
            }).unwrap();
        }
        assert_eq!(count_patient_clinics(&conn, &p.id).unwrap(), 2);
        assert!(get_patient_clinic(&conn, &p.id, &a.id).unwrap().is_some());

        assert!(delete_patient_clinic(&conn, &p.id, &a.id).unwrap());
        assert!(!delete_patient_clinic(&conn, &p.id, &a.id).unwrap());
        assert_eq!(count_patient_clinics(&conn, &p.id).unwrap(), 1);
    }

    #[test]
    fn membership_timestamp_survives_storage() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let c = make_clinic(&conn, h.id, "Cardio");
        let p = make_person(&conn, "p@x.com");
        let row = PatientClinic { patient_id: p.id, clinic_id: c.id, enrolled_at: now_timestamp() };
        insert_patient_clinic(&conn, &row).unwrap();
        assert_eq!(get_patient_clinic(&conn, &p.id, &c.id).unwrap(), Some(row));
    }

    #[test]
    fn patient_diagnostics_deleted_only_within_clinic() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let a = make_clinic(&conn, h.id, "Cardio");
        let b = make_clinic(&conn, h.id, "Neuro");
        let p = make_person(&conn, "p@x.com");
        let da = make_diagnostic(&conn, a.id, "Hypertension", None);
        let db_ = make_diagnostic(&conn, b.id, "Migraine", None);
        for diag in [&da, &db_] {
            insert_patient_diagnostic(&conn, &PatientDiagnostic {
                patient_id: p.id,
                diagnostic_id: diag.id,
                assigned_at: now_timestamp(),
            }).unwrap();
        }

        assert_eq!(delete_patient_diagnostics_in_clinic(&conn, &p.id, &a.id).unwrap(), 1);
        let remaining = list_patient_diagnostics_for_patient(&conn, &p.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].diagnostic_id, db_.id);
    }

    #[test]
    fn available_diagnostics_exclude_assigned_ones() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let c = make_clinic(&conn, h.id, "Cardio");
        let p = make_person(&conn, "p@x.com");
        let assigned = make_diagnostic(&conn, c.id, "Arrhythmia", None);
        let open = make_diagnostic(&conn, c.id, "Hypertension", None);
        insert_patient_diagnostic(&conn, &PatientDiagnostic {
            patient_id: p.id,
            diagnostic_id: assigned.id,
            assigned_at: now_timestamp(),
        }).unwrap();

        let available = list_available_diagnostics(&conn, &p.id, &c.id).unwrap();
        assert_eq!(available, vec![open]);
    }

    #[test]
    fn diagnostic_update_keeps_clinic() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let c = make_clinic(&conn, h.id, "Cardio");
        let d = make_diagnostic(&conn, c.id, "Hypertension", None);
        assert!(update_diagnostic(&conn, &d.id, "Stage 2 hypertension", "BP >= 140/90").unwrap());
        let stored = get_diagnostic(&conn, &d.id).unwrap().unwrap();
        assert_eq!(stored.name, "Stage 2 hypertension");
        assert_eq!(stored.clinic_id, c.id);
    }

    #[test]
    fn services_deleted_per_clinic() {
        let conn = test_db();
        let h = make_hospital(&conn, "General");
        let c = make_clinic(&conn, h.id, "Cardio");
        for name in ["ECG", "Echo"] {
            insert_service(&conn, &Service { id: Uuid::new_v4(), name: name.into(), clinic_id: c.id })
                .unwrap();
        }
        assert_eq!(list_services_for_clinic(&conn, &c.id).unwrap().len(), 2);
        assert_eq!(delete_services_for_clinic(&conn, &c.id).unwrap(), 2);
        assert!(list_services_for_clinic(&conn, &c.id).unwrap().is_empty());
    }

    #[test]
    fn corrupt_stored_id_surfaces_as_conversion_error() {
        let conn = test_db();
        conn.execute("INSERT INTO hospitals (id, name) VALUES ('not-a-uuid', 'Broken')", [])
            .unwrap();
        let err = list_hospitals(&conn).unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Sqlite(rusqlite::Error::FromSqlConversionFailure(..))
        ));
    }
}
