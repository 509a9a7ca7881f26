use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, AsRefStr, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    UnexcusedAbsence,
    ExcusedAbsence,
    Sick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "0b6f7a52-2d7e-4f0e-9a51-3cbbf1f0a1de",
    "student_id": "student-1",
    "class_id": "class-1",
    "date": "2026-10-16",
    "time": "07:45",
    "status": "present",
    "recorded_by": "user-2"
}))]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "07:45")]
    pub time: NaiveTime,
    pub status: AttendanceStatus,
    pub recorded_by: String,
}

/// A record as handed to the ledger, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendanceRecord {
    pub student_id: String,
    pub class_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AttendanceStatus,
    pub recorded_by: String,
}

impl NewAttendanceRecord {
    pub fn into_record(self, id: String) -> AttendanceRecord {
        AttendanceRecord {
            id,
            student_id: self.student_id,
            class_id: self.class_id,
            date: self.date,
            time: self.time,
            status: self.status,
            recorded_by: self.recorded_by,
        }
    }
}

/// Serializes a time of day as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
