use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use crate::auth::jwt::verify_token;
use crate::api::error::json_error;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::StatusCode, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(json_error(StatusCode::UNAUTHORIZED, "Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Config missing",
                )));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(json_error(StatusCode::UNAUTHORIZED, "Invalid token"))),
        };

        if claims.token_type != TokenType::Access {
            return ready(Err(json_error(StatusCode::UNAUTHORIZED, "Access token required")));
        }

        ready(Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role: claims.role,
        }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(json_error(StatusCode::FORBIDDEN, "Admin only"))
        }
    }
}
