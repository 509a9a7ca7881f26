use crate::api::attendance::{AttendanceListResponse, CheckInReq, CheckInResponse};
use crate::api::student::StudentListResponse;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    class::Class,
    role::Role,
    student::{Gender, Student},
};
use crate::models::{CreateUserReq, LoginReqDto, LoginResponse};
use crate::service::aggregator::{DailyAttendance, DashboardSummary};
use crate::service::analysis::TrendAnalysis;
use crate::service::recorder::CheckInConfirmation;
use crate::service::roster::{CreateStudent, UpdateStudent};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Attendance API",
        version = "1.0.0",
        description = r#"
## School Attendance System

This API powers a **school attendance** service: a student roster, QR-code check-ins and
a dashboard over the attendance ledger.

### 🔹 Key Features
- **Student Management**
  - Create, update, list, view and delete students
- **Attendance**
  - QR check-in (the QR payload is the student id), at most one record per student, class and day
  - Attendance history filtered by date, class or student
- **Dashboard**
  - Today's attendance rate and a seven-day present/absent series
- **Trend Analysis**
  - AI-generated trends, predictions and insights over the attendance history

### 🔐 Security
Endpoints under the API prefix require a **JWT Bearer** access token.
Student writes and user creation are restricted to **Admin**.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::create_user,

        crate::api::student::list_students,
        crate::api::student::get_student,
        crate::api::student::create_student,
        crate::api::student::update_student,
        crate::api::student::delete_student,

        crate::api::class::list_classes,

        crate::api::attendance::check_in,
        crate::api::attendance::list_attendance,

        crate::api::dashboard::dashboard,

        crate::api::analysis::analyze_attendance
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            CreateUserReq,
            Role,
            Student,
            Gender,
            CreateStudent,
            UpdateStudent,
            StudentListResponse,
            Class,
            CheckInReq,
            CheckInResponse,
            CheckInConfirmation,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceListResponse,
            DailyAttendance,
            DashboardSummary,
            TrendAnalysis
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Login, token rotation and user accounts"),
        (name = "Student", description = "Student roster APIs"),
        (name = "Class", description = "Class APIs"),
        (name = "Attendance", description = "Check-in and attendance history APIs"),
        (name = "Dashboard", description = "Attendance statistics"),
        (name = "Analysis", description = "AI attendance trend analysis"),
    )
)]
pub struct ApiDoc;
