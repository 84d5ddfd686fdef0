use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clinic-scoped definition of a condition. The per-patient record is
/// `PatientDiagnostic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub clinic_id: Uuid,
    /// Informational, never validated against clinic staff.
    pub creator_id: Option<Uuid>,
}
