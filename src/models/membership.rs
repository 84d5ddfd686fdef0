use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Active enrollment of a patient at a clinic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientClinic {
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub enrolled_at: NaiveDateTime,
}

/// A diagnostic recorded against a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDiagnostic {
    pub patient_id: Uuid,
    pub diagnostic_id: Uuid,
    pub assigned_at: NaiveDateTime,
}
