use crate::auth::auth::AuthUser;
use crate::model::student::Student;
use crate::service::roster::{CreateStudent, UpdateStudent};
use crate::state::AppState;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct StudentQuery {
    /// Only students of this class
    pub class_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StudentListResponse {
    pub data: Vec<Student>,
    #[schema(example = 10)]
    pub total: usize,
}

/// List students
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Students ordered by name", body = StudentListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn list_students(
    _auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<StudentQuery>,
) -> actix_web::Result<impl Responder> {
    let mut students = state.roster_service().list().await?;

    if let Some(class_id) = &query.class_id {
        students.retain(|s| &s.class_id == class_id);
    }

    Ok(HttpResponse::Ok().json(StudentListResponse {
        total: students.len(),
        data: students,
    }))
}

/// Get Student by ID
#[utoipa::path(
    get,
    path = "/api/students/{student_id}",
    params(("student_id", Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 404, description = "Student not found", body = Object, example = json!({
            "message": "Student not found"
        }))
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn get_student(
    _auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let student = state.roster_service().get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(student))
}

/// Create Student
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Invalid input", body = Object, example = json!({
            "message": "Invalid input",
            "details": { "nisn": "NISN is required" }
        })),
        (status = 403, description = "Admin only"),
        (status = 409, description = "A student with this NISN already exists")
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn create_student(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateStudent>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let student = state.roster_service().create(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(student))
}

/// Update Student
#[utoipa::path(
    put,
    path = "/api/students/{student_id}",
    params(("student_id", Path, description = "Student ID")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "A student with this NISN already exists")
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn update_student(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateStudent>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let student = state
        .roster_service()
        .update(&path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(student))
}

/// Delete Student
#[utoipa::path(
    delete,
    path = "/api/students/{student_id}",
    params(("student_id", Path, description = "Student ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Student not found", body = Object, example = json!({
            "message": "Student not found"
        }))
    ),
    tag = "Student",
    security(("bearer_auth" = []))
)]
pub async fn delete_student(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if !state.roster_service().delete(&path.into_inner()).await? {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Student not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
