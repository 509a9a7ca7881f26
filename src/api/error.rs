use crate::service::analysis::AnalysisError;
use crate::service::recorder::CheckInError;
use crate::service::roster::RosterError;
use actix_web::{HttpResponse, ResponseError, error::InternalError, http::StatusCode, web};
use serde_json::json;
use tracing::debug;

/// An actix error whose body is `{"message": ...}`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> actix_web::Error {
    let message = message.into();
    let response = HttpResponse::build(status).json(json!({ "message": message }));
    InternalError::from_response(message, response).into()
}

pub fn internal_error() -> actix_web::Error {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// Malformed JSON bodies answer with the usual error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!(error = %err, "Rejected request body");
        json_error(err.status_code(), err.to_string())
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        debug!(error = %err, "Rejected query string");
        json_error(StatusCode::BAD_REQUEST, err.to_string())
    })
}

impl ResponseError for CheckInError {
    fn status_code(&self) -> StatusCode {
        match self {
            CheckInError::InvalidInput => StatusCode::BAD_REQUEST,
            CheckInError::NotFound(_) => StatusCode::NOT_FOUND,
            CheckInError::DuplicateCheckIn { .. } => StatusCode::CONFLICT,
            CheckInError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self.existing_status() {
            Some(status) => json!({ "message": self.to_string(), "status": status }),
            None => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl ResponseError for RosterError {
    fn status_code(&self) -> StatusCode {
        match self {
            RosterError::Validation(_) => StatusCode::BAD_REQUEST,
            RosterError::DuplicateNisn => StatusCode::CONFLICT,
            RosterError::NotFound => StatusCode::NOT_FOUND,
            RosterError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            RosterError::Validation(details) => {
                json!({ "message": self.to_string(), "details": details })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl ResponseError for AnalysisError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AnalysisError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalysisError::Upstream(_) | AnalysisError::MalformedReply(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // upstream details stay in the logs
        let message = match self {
            AnalysisError::Upstream(_) | AnalysisError::MalformedReply(_) => {
                "Attendance analysis failed, please try again later".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
