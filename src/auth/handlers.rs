use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{role::Role, user::User},
    models::{Claims, CreateUserReq, LoginReqDto, LoginResponse, TokenType},
    store::mysql::is_duplicate_key,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access/refresh pair and stores the refresh token's jti.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    user_id: &str,
    username: &str,
    role: Role,
) -> Result<LoginResponse, HttpResponse> {
    let access_token = generate_access_token(
        user_id,
        username,
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        HttpResponse::InternalServerError().finish()
    })?;

    let (refresh_token, refresh_claims): (String, Claims) = generate_refresh_token(
        user_id,
        username,
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign refresh token");
        HttpResponse::InternalServerError().finish()
    })?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to store refresh token");
        HttpResponse::InternalServerError().finish()
    })?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Inserts a user with a hashed password.
async fn insert_user(
    pool: &MySqlPool,
    username: &str,
    password: &str,
    role: Role,
) -> Result<String, HttpResponse> {
    let hashed = hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        HttpResponse::InternalServerError().finish()
    })?;
    let id = Uuid::new_v4().to_string();

    let result = sqlx::query(
        r#"INSERT INTO users (id, username, password, role) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(username)
    .bind(hashed)
    .bind(role.as_ref())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(id),
        Err(e) if is_duplicate_key(&e) => Err(HttpResponse::Conflict().json(json!({
            "message": "Username already exists"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to insert user");
            Err(HttpResponse::InternalServerError().json(json!({
                "message": "Failed to create user"
            })))
        }
    }
}

/// Creates the configured admin account when the users table is empty.
pub async fn ensure_bootstrap_admin(pool: &MySqlPool, config: &Config) -> anyhow::Result<()> {
    let Some((username, password)) = &config.bootstrap_admin else {
        return Ok(());
    };

    let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if users > 0 {
        return Ok(());
    }

    insert_user(pool, username, password, Role::Admin)
        .await
        .map_err(|resp| anyhow::anyhow!("bootstrap admin insert failed: {}", resp.status()))?;

    info!(username = %username, "Bootstrap admin account created");
    Ok(())
}

/// Create a user account (admin only)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created", "id": "7d4c0f5e-5d8f-4a43-9b0e-1f6f0d0c2b1a"
        })),
        (status = 400, description = "Username or password missing"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    user: web::Json<CreateUserReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let username = user.username.trim().to_lowercase();
    if username.is_empty() || user.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Username and password must not be empty"
        })));
    }

    match insert_user(pool.get_ref(), &username, &user.password, user.role).await {
        Ok(id) => {
            info!(created_by = %auth.user_id, user_id = %id, role = %user.role, "User created");
            Ok(HttpResponse::Created().json(json!({
                "message": "User created",
                "id": id
            })))
        }
        Err(resp) => Ok(resp),
    }
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = LoginResponse),
        (status = 400, description = "Username or password required"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().json(json!({"message": "Username or password required"}));
    }

    let username = user.username.trim().to_lowercase();

    let db_user = match sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&username)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => {
            info!("Invalid credentials: user not found or inactive");
            return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
    }

    let role = match Role::from_str(&db_user.role) {
        Ok(r) => r,
        Err(_) => {
            warn!(user_id = %db_user.id, role = %db_user.role, "User has unknown role");
            return HttpResponse::Unauthorized().json(json!({"message": "Invalid role"}));
        }
    };

    let tokens = match issue_tokens(pool.get_ref(), &config, &db_user.id, &db_user.username, role).await {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    // non-fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(&db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = %db_user.id, "Login successful");
    HttpResponse::Ok().json(tokens)
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::Unauthorized().json(json!({"message": "No token"}));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    // revoke the presented token; only an unrevoked one can be rotated
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND revoked = FALSE AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await;

    match revoked {
        Ok(r) if r.rows_affected() == 1 => {}
        Ok(_) => {
            info!(jti = %claims.jti, "Refresh with unknown or revoked token");
            return HttpResponse::Unauthorized().finish();
        }
        Err(e) => {
            error!(error = %e, "Failed to revoke refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    }

    match issue_tokens(pool.get_ref(), &config, &claims.user_id, &claims.sub, claims.role).await {
        Ok(tokens) => HttpResponse::Ok().json(tokens),
        Err(resp) => resp,
    }
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}
