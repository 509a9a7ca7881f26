//! Check-in recording.
//!
//! Validation runs in a fixed order and the first failure wins:
//! identifiers present, student exists, class exists, no record yet for
//! (student, class, today). The last check is repeated atomically by the
//! ledger's `append`, so two concurrent check-ins cannot both succeed.

use crate::model::attendance::{AttendanceRecord, AttendanceStatus, NewAttendanceRecord};
use crate::store::{AppendError, AttendanceLedger, RosterStore, StoreError};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use derive_more::Display;
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "student_name": "Alice Johnson",
    "class_name": "Class 10-A",
    "time": "07:45"
}))]
pub struct CheckInConfirmation {
    pub student_name: String,
    pub class_name: String,
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Missing {
    #[display(fmt = "Student")]
    Student,
    #[display(fmt = "Class")]
    Class,
}

#[derive(Debug, Display)]
pub enum CheckInError {
    #[display(fmt = "Student id and class id are required")]
    InvalidInput,
    #[display(fmt = "{} not found", _0)]
    NotFound(Missing),
    /// Informational: the student was already recorded today.
    #[display(fmt = "Student is already marked as '{}' today", "existing.status.to_string()")]
    DuplicateCheckIn { existing: AttendanceRecord },
    #[display(fmt = "Failed to record attendance")]
    PersistenceFailure(StoreError),
}

impl std::error::Error for CheckInError {}

impl From<StoreError> for CheckInError {
    fn from(e: StoreError) -> Self {
        CheckInError::PersistenceFailure(e)
    }
}

impl CheckInError {
    /// Status of the record that blocked a duplicate check-in.
    pub fn existing_status(&self) -> Option<AttendanceStatus> {
        match self {
            CheckInError::DuplicateCheckIn { existing } => Some(existing.status),
            _ => None,
        }
    }
}

/// Wall-clock time truncated to the minute.
fn minute_of(now: NaiveDateTime) -> NaiveTime {
    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(NaiveTime::MIN)
}

pub async fn record_attendance(
    roster: &dyn RosterStore,
    ledger: &dyn AttendanceLedger,
    student_id: &str,
    class_id: &str,
    recorded_by: &str,
    now: NaiveDateTime,
) -> Result<CheckInConfirmation, CheckInError> {
    let student_id = student_id.trim();
    let class_id = class_id.trim();

    if student_id.is_empty() || class_id.is_empty() {
        return Err(CheckInError::InvalidInput);
    }

    let student = roster
        .get_student(student_id)
        .await?
        .ok_or(CheckInError::NotFound(Missing::Student))?;

    let class = roster
        .get_class(class_id)
        .await?
        .ok_or(CheckInError::NotFound(Missing::Class))?;

    let today = now.date();

    if let Some(existing) = ledger.find(student_id, class_id, today).await? {
        info!(student_id, class_id, %today, "Duplicate check-in rejected");
        return Err(CheckInError::DuplicateCheckIn { existing });
    }

    let record = NewAttendanceRecord {
        student_id: student.id.clone(),
        class_id: class.id.clone(),
        date: today,
        time: minute_of(now),
        status: AttendanceStatus::Present,
        recorded_by: recorded_by.to_string(),
    };

    let stored = match ledger.append(record).await {
        Ok(stored) => stored,
        Err(AppendError::Duplicate(existing)) => {
            info!(student_id, class_id, %today, "Concurrent duplicate check-in rejected");
            return Err(CheckInError::DuplicateCheckIn { existing });
        }
        Err(AppendError::Store(e)) => {
            error!(error = %e, student_id, class_id, "Check-in failed");
            return Err(CheckInError::PersistenceFailure(e));
        }
    };

    info!(
        student_id,
        class_id,
        recorded_by,
        record_id = %stored.id,
        "Check-in recorded"
    );

    Ok(CheckInConfirmation {
        student_name: student.full_name,
        class_name: class.name,
        time: stored.time.format(crate::model::attendance::hhmm::FORMAT).to_string(),
    })
}
