use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MedicineTiming;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub issued_by: Option<Uuid>,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_name: String,
    pub items: Vec<PrescriptionItem>,
    pub advice: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub name: String,
    /// Morning/noon/night, e.g. "1/0/1".
    pub dose: String,
    pub timing: MedicineTiming,
}
