use super::{
    AppendError, AttendanceFilter, AttendanceLedger, RosterStore, StoreResult,
};
use crate::model::{
    attendance::{AttendanceRecord, NewAttendanceRecord},
    class::Class,
    student::{NewStudent, Student, StudentPatch},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryRoster {
    students: Mutex<Vec<Student>>,
    classes: Mutex<Vec<Class>>,
}

impl MemoryRoster {
    pub fn with_classes(classes: Vec<Class>) -> Self {
        Self {
            students: Mutex::new(Vec::new()),
            classes: Mutex::new(classes),
        }
    }

    /// Inserts a student with a caller-chosen id.
    pub fn insert_student(&self, student: Student) {
        self.students.lock().unwrap().push(student);
    }
}

#[async_trait]
impl RosterStore for MemoryRoster {
    async fn create_student(&self, new: NewStudent) -> StoreResult<Student> {
        let student = new.into_student(Uuid::new_v4().to_string());
        self.students.lock().unwrap().push(student.clone());
        Ok(student)
    }

    async fn update_student(&self, id: &str, patch: StudentPatch) -> StoreResult<Option<Student>> {
        let mut students = self.students.lock().unwrap();
        Ok(students.iter_mut().find(|s| s.id == id).map(|s| {
            patch.apply_to(s);
            s.clone()
        }))
    }

    async fn delete_student(&self, id: &str) -> StoreResult<bool> {
        let mut students = self.students.lock().unwrap();
        let before = students.len();
        students.retain(|s| s.id != id);
        Ok(students.len() != before)
    }

    async fn get_student(&self, id: &str) -> StoreResult<Option<Student>> {
        let students = self.students.lock().unwrap();
        Ok(students.iter().find(|s| s.id == id).cloned())
    }

    async fn find_student_by_nisn(&self, nisn: &str) -> StoreResult<Option<Student>> {
        let students = self.students.lock().unwrap();
        Ok(students.iter().find(|s| s.nisn == nisn).cloned())
    }

    async fn list_students(&self) -> StoreResult<Vec<Student>> {
        let mut students = self.students.lock().unwrap().clone();
        students.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        Ok(students)
    }

    async fn count_students(&self) -> StoreResult<usize> {
        Ok(self.students.lock().unwrap().len())
    }

    async fn get_class(&self, id: &str) -> StoreResult<Option<Class>> {
        let classes = self.classes.lock().unwrap();
        Ok(classes.iter().find(|c| c.id == id).cloned())
    }

    async fn list_classes(&self) -> StoreResult<Vec<Class>> {
        Ok(self.classes.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl MemoryLedger {
    /// Inserts a record as-is, bypassing the uniqueness check.
    pub fn insert_raw(&self, record: AttendanceRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[async_trait]
impl AttendanceLedger for MemoryLedger {
    async fn find(
        &self,
        student_id: &str,
        class_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .find(|r| r.student_id == student_id && r.class_id == class_id && r.date == date)
            .cloned())
    }

    async fn append(&self, record: NewAttendanceRecord) -> Result<AttendanceRecord, AppendError> {
        // check and push under one lock
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.iter().find(|r| {
            r.student_id == record.student_id
                && r.class_id == record.class_id
                && r.date == record.date
        }) {
            return Err(AppendError::Duplicate(existing.clone()));
        }

        let record = record.into_record(Uuid::new_v4().to_string());
        records.push(record.clone());
        Ok(record)
    }

    async fn list(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        let mut matching: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date).then(b.time.cmp(&a.time)));
        Ok(matching)
    }

    async fn list_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.date >= from && r.date <= to)
            .cloned()
            .collect())
    }

    async fn count_records(&self) -> StoreResult<usize> {
        Ok(self.records.lock().unwrap().len())
    }
}
