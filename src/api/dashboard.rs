use crate::auth::auth::AuthUser;
use crate::service::aggregator::{DashboardSummary, dashboard_summary, window_start};
use crate::state::AppState;
use crate::api::error::internal_error;
use actix_web::{HttpResponse, Responder, web};
use chrono::Local;
use tracing::{debug, error};

/// Dashboard summary
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Roster totals, today's rate and the last seven days", body = DashboardSummary),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn dashboard(
    _auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let now = Local::now().naive_local();

    let internal = |e: crate::store::StoreError| {
        error!(error = %e, "Failed to load dashboard data");
        internal_error()
    };

    let total_students = state.roster.count_students().await.map_err(internal)?;
    let total_classes = state.roster.list_classes().await.map_err(internal)?.len();
    let records = state
        .ledger
        .list_between(window_start(now), now.date())
        .await
        .map_err(internal)?;

    debug!(total_students, total_classes, records = records.len(), "Building dashboard");

    Ok(HttpResponse::Ok().json(dashboard_summary(
        total_students,
        total_classes,
        &records,
        now,
    )))
}
