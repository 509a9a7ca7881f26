use crate::auth::auth::AuthUser;
use crate::service::analysis::{AnalysisError, TrendAnalysis, run_attendance_analysis};
use crate::state::AppState;
use actix_web::{HttpResponse, Responder, web};
use tracing::{error, info};

/// Run the attendance trend analysis
#[utoipa::path(
    post,
    path = "/api/analysis",
    responses(
        (status = 200, description = "Trends, predictions and insights", body = TrendAnalysis),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Analysis service failed", body = Object, example = json!({
            "message": "Attendance analysis failed, please try again later"
        })),
        (status = 503, description = "Analysis is not configured", body = Object, example = json!({
            "message": "Attendance analysis is not configured"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analysis"
)]
pub async fn analyze_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    info!(user_id = %auth.user_id, "Attendance analysis requested");

    let analysis = run_attendance_analysis(state.ledger.as_ref(), state.analyzer.as_deref())
        .await
        .inspect_err(|e| match e {
            AnalysisError::NotConfigured => {}
            other => error!(error = %other, "Attendance analysis failed"),
        })?;

    Ok(HttpResponse::Ok().json(analysis))
}
