use crate::auth::auth::AuthUser;
use crate::model::attendance::AttendanceRecord;
use crate::service::recorder::{CheckInConfirmation, record_attendance};
use crate::state::AppState;
use crate::store::AttendanceFilter;
use crate::api::error::internal_error;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};

/// Missing or `null` ids reach the recorder as blank and fail there.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckInReq {
    /// Scanned QR payload, which is the student id.
    #[schema(example = "3f1c2a9e-8d7b-4c61-a0f4-6b2e9d1c5a77", value_type = String)]
    pub student_id: Option<String>,
    #[schema(example = "class-1", value_type = String)]
    pub class_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    #[schema(example = "Attendance recorded")]
    pub message: String,
    #[serde(flatten)]
    pub confirmation: CheckInConfirmation,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceQuery {
    /// Calendar day, `YYYY-MM-DD`
    #[param(value_type = Option<String>, example = "2026-10-16")]
    pub date: Option<NaiveDate>,
    pub class_id: Option<String>,
    pub student_id: Option<String>,
}

impl From<AttendanceQuery> for AttendanceFilter {
    fn from(q: AttendanceQuery) -> Self {
        AttendanceFilter {
            date: q.date,
            class_id: q.class_id.filter(|c| !c.trim().is_empty()),
            student_id: q.student_id.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 25)]
    pub total: usize,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInReq,
    responses(
        (status = 200, description = "Checked in successfully", body = CheckInResponse),
        (status = 400, description = "Student id and class id are required", body = Object, example = json!({
            "message": "Student id and class id are required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown student or class", body = Object, example = json!({
            "message": "Student not found"
        })),
        (status = 409, description = "Already recorded today", body = Object, example = json!({
            "message": "Student is already marked as 'present' today",
            "status": "present"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CheckInReq>,
) -> actix_web::Result<impl Responder> {
    let confirmation = record_attendance(
        state.roster.as_ref(),
        state.ledger.as_ref(),
        payload.student_id.as_deref().unwrap_or_default(),
        payload.class_id.as_deref().unwrap_or_default(),
        &auth.user_id,
        Local::now().naive_local(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(CheckInResponse {
        message: format!(
            "Attendance recorded for {} in {}",
            confirmation.student_name, confirmation.class_name
        ),
        confirmation,
    }))
}

/// List attendance records, newest first
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Matching records", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    _auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let filter = AttendanceFilter::from(query.into_inner());

    let records = state.ledger.list(&filter).await.map_err(|e| {
        error!(error = %e, ?filter, "Failed to list attendance");
        internal_error()
    })?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        total: records.len(),
        data: records,
    }))
}
