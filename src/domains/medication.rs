use serde::{Deserialize, Serialize};

/// A tracked medication. Schedules and intakes reference it by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A recurring dosing rule: one time of day plus a set of weekdays.
///
/// `time` is a 24-hour "HH:MM" string; `days_of_week` is a comma-separated
/// list of 1..=7 where 1 is Monday. Both are kept as strings and parsed at
/// the points that need calendar math, so a record with a malformed spec
/// still loads and persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSchedule {
    pub id: i64,
    pub medication_id: i64,
    pub time: String,
    pub days_of_week: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A recorded dose event for one schedule on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationIntake {
    pub id: i64,
    pub medication_id: i64,
    pub schedule_id: i64,
    pub taken_at: i64,
    pub scheduled_time: String,
    pub scheduled_date: String,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default = "default_taken")]
    pub taken: bool,
}

/// A pending notification for one scheduled occurrence, due at
/// `reminder_time` (epoch seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationReminder {
    pub id: i64,
    pub medication_id: i64,
    pub schedule_id: i64,
    pub reminder_time: i64,
    pub scheduled_time: String,
    pub scheduled_date: String,
    #[serde(default)]
    pub acknowledged: bool,
}

fn default_taken() -> bool {
    true
}
