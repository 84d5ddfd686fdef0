use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A clinic and its owning hospital. Doctors, services and diagnostics point
/// back at the clinic by id; none of them are owned here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub hospital_id: Option<Uuid>,
}
