use crate::auth::jwt::{generate_access_token, generate_refresh_token};
use crate::config::Config;
use crate::model::{
    class::Class,
    role::Role,
    student::{Gender, Student},
};
use crate::routes;
use crate::service::analysis::{AnalysisError, TrendAnalysis, TrendAnalyzer};
use crate::state::AppState;
use crate::store::{AttendanceLedger, RosterStore};
use crate::store::memory::{MemoryLedger, MemoryRoster};
use crate::utils::nisn_index::NisnIndex;
use actix_web::{App, http::StatusCode, test, web::Data};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new(Config::for_tests()))
                .app_data(Data::new($state.clone()))
                .configure(|cfg| routes::configure(cfg, Config::for_tests())),
        )
        .await
    };
}

struct FixedAnalyzer;

#[async_trait]
impl TrendAnalyzer for FixedAnalyzer {
    async fn analyze(&self, _attendance_json: &str) -> Result<TrendAnalysis, AnalysisError> {
        Ok(TrendAnalysis {
            trends: "Attendance is stable".into(),
            predictions: "No absenteeism expected".into(),
            insights: "Keep the morning routine".into(),
        })
    }
}

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

async fn state() -> AppState {
    let roster = MemoryRoster::with_classes(vec![Class {
        id: "class-1".into(),
        name: "Class 10-A".into(),
    }]);
    roster.insert_student(Student {
        id: "student-1".into(),
        nisn: "1001".into(),
        full_name: "Alice Johnson".into(),
        gender: Gender::Female,
        date_of_birth: NaiveDate::from_ymd_opt(2008, 5, 10).unwrap(),
        email: None,
        phone: None,
        address: None,
        class_id: "class-1".into(),
    });

    let state = AppState {
        roster: Arc::new(roster),
        ledger: Arc::new(MemoryLedger::default()),
        nisn_index: Arc::new(NisnIndex::new()),
        analyzer: None,
    };
    state.nisn_index.warmup(state.roster.as_ref()).await.unwrap();
    state
}

fn token(user_id: &str, role: Role) -> String {
    let config = Config::for_tests();
    let bearer = generate_access_token(user_id, user_id, role, &config.jwt_secret, 900).unwrap();
    format!("Bearer {}", bearer)
}

fn check_in_body() -> Value {
    json!({ "student_id": "student-1", "class_id": "class-1" })
}

#[actix_web::test]
async fn check_in_requires_a_token() {
    let state = state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .peer_addr(peer())
        .set_json(check_in_body())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.ledger.count_records().await.unwrap(), 0);
}

#[actix_web::test]
async fn refresh_token_is_not_an_access_token() {
    let state = state().await;
    let app = test_app!(state);
    let config = Config::for_tests();
    let (refresh, _) =
        generate_refresh_token("user-2", "ben", Role::Teacher, &config.jwt_secret, 900).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/dashboard")
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {}", refresh)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn duplicate_check_in_is_conflict_with_existing_status() {
    let state = state().await;
    let app = test_app!(state);
    let auth = token("user-2", Role::Teacher);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .peer_addr(peer())
        .insert_header(("Authorization", auth.clone()))
        .set_json(check_in_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["student_name"], "Alice Johnson");
    assert_eq!(body["class_name"], "Class 10-A");
    assert_eq!(body["time"].as_str().unwrap().len(), 5);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .peer_addr(peer())
        .insert_header(("Authorization", auth))
        .set_json(check_in_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "present");
    assert_eq!(state.ledger.count_records().await.unwrap(), 1);
}

#[actix_web::test]
async fn check_in_records_the_authenticated_user() {
    let state = state().await;
    let app = test_app!(state);
    let auth = token("user-7", Role::Teacher);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .peer_addr(peer())
        .insert_header(("Authorization", auth.clone()))
        .set_json(check_in_body())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/attendance?student_id=student-1")
        .peer_addr(peer())
        .insert_header(("Authorization", auth))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["recorded_by"], "user-7");
    assert_eq!(body["data"][0]["status"], "present");
}

#[actix_web::test]
async fn check_in_errors_map_to_statuses() {
    let state = state().await;
    let app = test_app!(state);
    let auth = token("user-2", Role::Teacher);

    for (body, expected) in [
        (json!({ "student_id": " ", "class_id": "class-1" }), StatusCode::BAD_REQUEST),
        (json!({ "student_id": "student-9", "class_id": "class-1" }), StatusCode::NOT_FOUND),
        (json!({ "student_id": "student-1", "class_id": "class-9" }), StatusCode::NOT_FOUND),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .peer_addr(peer())
            .insert_header(("Authorization", auth.clone()))
            .set_json(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), expected);
    }

    assert_eq!(state.ledger.count_records().await.unwrap(), 0);
}

#[actix_web::test]
async fn dashboard_has_seven_weekly_entries() {
    let state = state().await;
    let app = test_app!(state);
    let auth = token("user-2", Role::Teacher);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .peer_addr(peer())
        .insert_header(("Authorization", auth.clone()))
        .set_json(check_in_body())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/dashboard")
        .peer_addr(peer())
        .insert_header(("Authorization", auth))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total_students"], 1);
    assert_eq!(body["total_classes"], 1);
    assert_eq!(body["present_today"], 1);
    assert_eq!(body["attendance_rate"], 100.0);

    let weekly = body["weekly"].as_array().unwrap();
    assert_eq!(weekly.len(), 7);
    assert_eq!(weekly[6]["present_count"], 1);
    assert_eq!(weekly[6]["absent_count"], 0);
}

#[actix_web::test]
async fn student_writes_are_admin_only() {
    let state = state().await;
    let app = test_app!(state);
    let new_student = json!({
        "nisn": "2002",
        "full_name": "Bob Smith",
        "gender": "male",
        "date_of_birth": "2008-01-20",
        "class_id": "class-1"
    });

    let req = test::TestRequest::post()
        .uri("/api/students")
        .peer_addr(peer())
        .insert_header(("Authorization", token("user-2", Role::Teacher)))
        .set_json(new_student.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri("/api/students/student-1")
        .peer_addr(peer())
        .insert_header(("Authorization", token("user-2", Role::Teacher)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    assert_eq!(state.roster.count_students().await.unwrap(), 1);
}

#[actix_web::test]
async fn admin_manages_students() {
    let state = state().await;
    let app = test_app!(state);
    let admin = token("user-1", Role::Admin);

    let req = test::TestRequest::post()
        .uri("/api/students")
        .peer_addr(peer())
        .insert_header(("Authorization", admin.clone()))
        .set_json(json!({
            "nisn": "2002",
            "full_name": "Bob Smith",
            "gender": "male",
            "date_of_birth": "2008-01-20",
            "email": "bob@example.com",
            "class_id": "class-1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();

    // NISN already taken by Alice
    let req = test::TestRequest::put()
        .uri(&format!("/api/students/{}", id))
        .peer_addr(peer())
        .insert_header(("Authorization", admin.clone()))
        .set_json(json!({ "nisn": "1001" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/students")
        .peer_addr(peer())
        .insert_header(("Authorization", admin.clone()))
        .set_json(json!({
            "nisn": "",
            "full_name": "",
            "gender": "female",
            "date_of_birth": "2008-01-20",
            "email": "not-an-email",
            "class_id": "class-1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["details"]["nisn"].is_string());
    assert!(body["details"]["email"].is_string());

    let req = test::TestRequest::get()
        .uri("/api/students")
        .peer_addr(peer())
        .insert_header(("Authorization", admin.clone()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"][0]["full_name"], "Alice Johnson");
    assert_eq!(body["data"][1]["full_name"], "Bob Smith");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/students/{}", id))
        .peer_addr(peer())
        .insert_header(("Authorization", admin.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/students/{}", id))
        .peer_addr(peer())
        .insert_header(("Authorization", admin.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/api/students/{}", id))
        .peer_addr(peer())
        .insert_header(("Authorization", admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn classes_are_listed() {
    let state = state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/classes")
        .peer_addr(peer())
        .insert_header(("Authorization", token("user-2", Role::Teacher)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body, json!([{ "id": "class-1", "name": "Class 10-A" }]));
}

#[actix_web::test]
async fn analysis_without_analyzer_is_unavailable() {
    let state = state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/analysis")
        .peer_addr(peer())
        .insert_header(("Authorization", token("user-2", Role::Teacher)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn analysis_returns_the_analyzer_reply() {
    let mut state = state().await;
    state.analyzer = Some(Arc::new(FixedAnalyzer));
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/analysis")
        .peer_addr(peer())
        .insert_header(("Authorization", token("user-2", Role::Teacher)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["trends"], "Attendance is stable");
    assert_eq!(body["insights"], "Keep the morning routine");
}

#[actix_web::test]
async fn missing_or_null_check_in_ids_are_invalid_input() {
    let state = state().await;
    let app = test_app!(state);
    let auth = token("user-2", Role::Teacher);

    for body in [
        json!({ "student_id": "student-1" }),
        json!({ "student_id": "student-1", "class_id": null }),
        json!({}),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .peer_addr(peer())
            .insert_header(("Authorization", auth.clone()))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "message": "Student id and class id are required" }));
    }

    assert_eq!(state.ledger.count_records().await.unwrap(), 0);
}

#[actix_web::test]
async fn unparseable_student_fields_are_field_errors() {
    let state = state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/students")
        .peer_addr(peer())
        .insert_header(("Authorization", token("user-1", Role::Admin)))
        .set_json(json!({
            "nisn": "2002",
            "full_name": "Bob Smith",
            "gender": "Male",
            "date_of_birth": "2008-02-30",
            "class_id": null
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid input");
    assert!(body["details"]["gender"].is_string());
    assert!(body["details"]["date_of_birth"].is_string());
    assert_eq!(body["details"]["class_id"], "Class is required");
}

#[actix_web::test]
async fn extractor_and_role_errors_are_json() {
    let state = state().await;
    let app = test_app!(state);
    let teacher = token("user-2", Role::Teacher);

    let req = test::TestRequest::delete()
        .uri("/api/students/student-1")
        .peer_addr(peer())
        .insert_header(("Authorization", teacher.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "message": "Admin only" }));

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .peer_addr(peer())
        .insert_header(("Authorization", teacher.clone()))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"student_id\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].is_string());

    let req = test::TestRequest::get()
        .uri("/api/attendance?date=yesterday")
        .peer_addr(peer())
        .insert_header(("Authorization", teacher))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].is_string());
}
