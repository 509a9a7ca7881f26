use crate::auth::auth::AuthUser;
use crate::model::class::Class;
use crate::state::AppState;
use crate::api::error::internal_error;
use actix_web::{HttpResponse, Responder, web};
use tracing::error;

/// List classes
#[utoipa::path(
    get,
    path = "/api/classes",
    responses(
        (status = 200, description = "All classes", body = [Class]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Class",
    security(("bearer_auth" = []))
)]
pub async fn list_classes(
    _auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let classes = state.roster.list_classes().await.map_err(|e| {
        error!(error = %e, "Failed to list classes");
        internal_error()
    })?;

    Ok(HttpResponse::Ok().json(classes))
}
