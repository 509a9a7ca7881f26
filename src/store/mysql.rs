use super::{
    AppendError, AttendanceFilter, AttendanceLedger, RosterStore, StoreError, StoreResult,
};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendanceRecord},
    class::Class,
    student::{Gender, NewStudent, Student, StudentPatch},
};
use crate::utils::db_utils::{build_update_sql, execute_update, student_patch_columns};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{FromRow, MySqlPool};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

const STUDENT_COLUMNS: &str =
    "id, nisn, full_name, gender, date_of_birth, email, phone, address, class_id";

const RECORD_COLUMNS: &str = "id, student_id, class_id, date, time, status, recorded_by";

/// True for a violated UNIQUE index (not for other SQLSTATE 23000 cases such
/// as a failed foreign key).
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(FromRow)]
struct StudentRow {
    id: String,
    nisn: String,
    full_name: String,
    gender: String,
    date_of_birth: NaiveDate,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    class_id: String,
}

impl TryFrom<StudentRow> for Student {
    type Error = StoreError;

    fn try_from(row: StudentRow) -> Result<Self, Self::Error> {
        let gender = Gender::from_str(&row.gender)
            .map_err(|_| StoreError::CorruptRow(format!("student {}: gender {:?}", row.id, row.gender)))?;

        Ok(Student {
            id: row.id,
            nisn: row.nisn,
            full_name: row.full_name,
            gender,
            date_of_birth: row.date_of_birth,
            email: row.email,
            phone: row.phone,
            address: row.address,
            class_id: row.class_id,
        })
    }
}

#[derive(FromRow)]
struct RecordRow {
    id: String,
    student_id: String,
    class_id: String,
    date: NaiveDate,
    time: NaiveTime,
    status: String,
    recorded_by: String,
}

impl TryFrom<RecordRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status).map_err(|_| {
            StoreError::CorruptRow(format!("attendance {}: status {:?}", row.id, row.status))
        })?;

        Ok(AttendanceRecord {
            id: row.id,
            student_id: row.student_id,
            class_id: row.class_id,
            date: row.date,
            time: row.time,
            status,
            recorded_by: row.recorded_by,
        })
    }
}

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[derive(Clone)]
pub struct MySqlRoster {
    pool: MySqlPool,
}

impl MySqlRoster {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterStore for MySqlRoster {
    async fn create_student(&self, new: NewStudent) -> StoreResult<Student> {
        let student = new.into_student(Uuid::new_v4().to_string());

        sqlx::query(
            r#"
            INSERT INTO students
            (id, nisn, full_name, gender, date_of_birth, email, phone, address, class_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&student.id)
        .bind(&student.nisn)
        .bind(&student.full_name)
        .bind(student.gender.as_ref())
        .bind(student.date_of_birth)
        .bind(&student.email)
        .bind(&student.phone)
        .bind(&student.address)
        .bind(&student.class_id)
        .execute(&self.pool)
        .await?;

        Ok(student)
    }

    async fn update_student(&self, id: &str, patch: StudentPatch) -> StoreResult<Option<Student>> {
        let select_sql = format!("SELECT {} FROM students WHERE id = ? FOR UPDATE", STUDENT_COLUMNS);

        let mut tx = self.pool.begin().await?;

        // MySQL reports changed rows, not matched rows, so existence is
        // decided by the locking read.
        let existing = sqlx::query_as::<_, StudentRow>(&select_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };
        let mut student = Student::try_from(existing)?;

        if let Some(update) = build_update_sql("students", student_patch_columns(patch.clone()), "id", id) {
            debug!(sql = %update.sql, student_id = id, "Updating student");
            execute_update(&mut tx, update).await?;
        }

        tx.commit().await?;

        patch.apply_to(&mut student);
        Ok(Some(student))
    }

    async fn delete_student(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_student(&self, id: &str) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);

        sqlx::query_as::<_, StudentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Student::try_from)
            .transpose()
    }

    async fn find_student_by_nisn(&self, nisn: &str) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {} FROM students WHERE nisn = ? LIMIT 1", STUDENT_COLUMNS);

        sqlx::query_as::<_, StudentRow>(&sql)
            .bind(nisn)
            .fetch_optional(&self.pool)
            .await?
            .map(Student::try_from)
            .transpose()
    }

    async fn list_students(&self) -> StoreResult<Vec<Student>> {
        let sql = format!("SELECT {} FROM students ORDER BY full_name, id", STUDENT_COLUMNS);

        let rows = sqlx::query_as::<_, StudentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        collect(rows)
    }

    async fn count_students(&self) -> StoreResult<usize> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;

        Ok(total as usize)
    }

    async fn get_class(&self, id: &str) -> StoreResult<Option<Class>> {
        Ok(sqlx::query_as::<_, Class>("SELECT id, name FROM classes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_classes(&self) -> StoreResult<Vec<Class>> {
        Ok(sqlx::query_as::<_, Class>("SELECT id, name FROM classes ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?)
    }
}

#[derive(Clone)]
pub struct MySqlLedger {
    pool: MySqlPool,
}

impl MySqlLedger {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    Date(NaiveDate),
    Str(&'a str),
}

#[async_trait]
impl AttendanceLedger for MySqlLedger {
    async fn find(
        &self,
        student_id: &str,
        class_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {} FROM attendance_records WHERE student_id = ? AND class_id = ? AND date = ?",
            RECORD_COLUMNS
        );

        sqlx::query_as::<_, RecordRow>(&sql)
            .bind(student_id)
            .bind(class_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn append(&self, record: NewAttendanceRecord) -> Result<AttendanceRecord, AppendError> {
        let record = record.into_record(Uuid::new_v4().to_string());

        // uq_attendance_day (student_id, class_id, date) makes this insert the
        // single point of truth for the one-record-per-day rule.
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records
            (id, student_id, class_id, date, time, status, recorded_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.student_id)
        .bind(&record.class_id)
        .bind(record.date)
        .bind(record.time)
        .bind(record.status.as_ref())
        .bind(&record.recorded_by)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record),
            Err(e) if is_duplicate_key(&e) => {
                let existing = self
                    .find(&record.student_id, &record.class_id, record.date)
                    .await?
                    .ok_or_else(|| {
                        StoreError::CorruptRow(format!(
                            "duplicate key reported for student {} but no record found",
                            record.student_id
                        ))
                    })?;
                Err(AppendError::Duplicate(existing))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        let mut conditions = Vec::new();
        let mut bindings = Vec::new();

        if let Some(date) = filter.date {
            conditions.push("date = ?");
            bindings.push(FilterValue::Date(date));
        }
        if let Some(class_id) = &filter.class_id {
            conditions.push("class_id = ?");
            bindings.push(FilterValue::Str(class_id));
        }
        if let Some(student_id) = &filter.student_id {
            conditions.push("student_id = ?");
            bindings.push(FilterValue::Str(student_id));
        }

        let where_clause = if conditions.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM attendance_records {} ORDER BY date DESC, time DESC",
            RECORD_COLUMNS, where_clause
        );
        debug!(sql = %sql, "Listing attendance records");

        let mut query = sqlx::query_as::<_, RecordRow>(&sql);
        for b in bindings {
            query = match b {
                FilterValue::Date(v) => query.bind(v),
                FilterValue::Str(v) => query.bind(v),
            };
        }

        collect(query.fetch_all(&self.pool).await?)
    }

    async fn list_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {} FROM attendance_records WHERE date BETWEEN ? AND ?",
            RECORD_COLUMNS
        );

        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        collect(rows)
    }

    async fn count_records(&self) -> StoreResult<usize> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(total as usize)
    }
}
