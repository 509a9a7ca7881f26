use chrono::NaiveDate;
use sqlx::{MySql, Transaction};

use crate::model::student::StudentPatch;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Date(NaiveDate),
    Null,
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        v.map(SqlValue::String).unwrap_or(SqlValue::Null)
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Column/value pairs for the fields a patch actually sets.
pub fn student_patch_columns(patch: StudentPatch) -> Vec<(&'static str, SqlValue)> {
    let mut columns = Vec::new();

    if let Some(v) = patch.nisn {
        columns.push(("nisn", SqlValue::String(v)));
    }
    if let Some(v) = patch.full_name {
        columns.push(("full_name", SqlValue::String(v)));
    }
    if let Some(v) = patch.gender {
        columns.push(("gender", SqlValue::String(v.as_ref().to_string())));
    }
    if let Some(v) = patch.date_of_birth {
        columns.push(("date_of_birth", SqlValue::Date(v)));
    }
    if let Some(v) = patch.email {
        columns.push(("email", v.into()));
    }
    if let Some(v) = patch.phone {
        columns.push(("phone", v.into()));
    }
    if let Some(v) = patch.address {
        columns.push(("address", v.into()));
    }
    if let Some(v) = patch.class_id {
        columns.push(("class_id", SqlValue::String(v)));
    }

    columns
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Column names come from the static list above, never from client input.
/// Returns `None` when there is nothing to set.
pub fn build_update_sql(
    table: &str,
    columns: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: &str,
) -> Option<SqlUpdate> {
    if columns.is_empty() {
        return None;
    }

    let set_clause = columns
        .iter()
        .map(|(k, _)| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = columns.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::String(id_value.to_string()));

    Some(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(
    tx: &mut Transaction<'_, MySql>,
    update: SqlUpdate,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(&mut **tx).await?;
    Ok(result.rows_affected())
}
