//! Storage ports for the roster and the attendance ledger.
//!
//! Services depend only on these traits. `mysql` is the production backing
//! store; `memory` backs the tests.

use crate::model::{
    attendance::{AttendanceRecord, NewAttendanceRecord},
    class::Class,
    student::{NewStudent, Student, StudentPatch},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::Display;

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "corrupt row: {}", _0)]
    CorruptRow(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a rejected append.
#[derive(Debug, Display)]
pub enum AppendError {
    /// A record already exists for the same student, class and day.
    #[display(fmt = "record already exists for this student, class and day")]
    Duplicate(AttendanceRecord),
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for AppendError {}

impl From<StoreError> for AppendError {
    fn from(e: StoreError) -> Self {
        AppendError::Store(e)
    }
}

impl From<sqlx::Error> for AppendError {
    fn from(e: sqlx::Error) -> Self {
        AppendError::Store(StoreError::Database(e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub date: Option<NaiveDate>,
    pub class_id: Option<String>,
    pub student_id: Option<String>,
}

impl AttendanceFilter {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.date.is_none_or(|d| record.date == d)
            && self.class_id.as_ref().is_none_or(|c| &record.class_id == c)
            && self
                .student_id
                .as_ref()
                .is_none_or(|s| &record.student_id == s)
    }
}

#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Inserts a student under a freshly generated id.
    async fn create_student(&self, new: NewStudent) -> StoreResult<Student>;
    /// Returns `None` when no student has this id.
    async fn update_student(&self, id: &str, patch: StudentPatch) -> StoreResult<Option<Student>>;
    /// Returns whether a student was found and removed.
    async fn delete_student(&self, id: &str) -> StoreResult<bool>;
    async fn get_student(&self, id: &str) -> StoreResult<Option<Student>>;
    async fn find_student_by_nisn(&self, nisn: &str) -> StoreResult<Option<Student>>;
    /// Students ordered by full name, then id.
    async fn list_students(&self) -> StoreResult<Vec<Student>>;
    async fn count_students(&self) -> StoreResult<usize>;

    async fn get_class(&self, id: &str) -> StoreResult<Option<Class>>;
    async fn list_classes(&self) -> StoreResult<Vec<Class>>;
}

#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    async fn find(
        &self,
        student_id: &str,
        class_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Appends one record. The uniqueness of (student, class, date) is checked
    /// atomically with the insert; a clash returns the existing record.
    async fn append(&self, record: NewAttendanceRecord) -> Result<AttendanceRecord, AppendError>;

    /// Records matching the filter, newest first.
    async fn list(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>>;

    /// Records dated within `from..=to`.
    async fn list_between(&self, from: NaiveDate, to: NaiveDate)
    -> StoreResult<Vec<AttendanceRecord>>;

    async fn count_records(&self) -> StoreResult<usize>;
}
