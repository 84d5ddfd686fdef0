use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity-level person. `clinic_id` is set only for a doctor assigned to a
/// clinic roster; patient enrollment lives in `PatientClinic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub clinic_id: Option<Uuid>,
}
