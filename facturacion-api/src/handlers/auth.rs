use actix_web::{web, HttpResponse};
use shared_types::{LoginRequest, LoginResponse};
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::database::users as db;
use crate::database::{DbError, Database};
use crate::helpers::auth::{AuthService, AuthenticatedUser};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub async fn login(
    database: web::Data<Arc<Database>>,
    auth: web::Data<Arc<AuthService>>,
    request: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let found = db::find_credentials(database.async_connection.clone(), &request.username).await?;

    let user = match found {
        Some((user, hash)) if user.activo && auth.verify_password(&request.password, &hash) => user,
        Some((user, _)) if !user.activo => {
            tracing::warn!("Login attempt for inactive user {}", user.username);
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        _ => return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())),
    };

    let token = auth.issue_token(&user)?;
    tracing::info!("User {} logged in", user.username);
    Ok(HttpResponse::Ok().json(LoginResponse { token, user }))
}

pub async fn me(
    AuthenticatedUser(claims): AuthenticatedUser,
    database: web::Data<Arc<Database>>,
) -> ApiResult<HttpResponse> {
    let user = db::get_user(database.async_connection.clone(), claims.sub)
        .await
        .map_err(|e| match e {
            DbError::NotFound => ApiError::Unauthorized("User no longer exists".to_string()),
            other => other.into(),
        })?;

    if !user.activo {
        return Err(ApiError::Unauthorized("User is inactive".to_string()));
    }
    Ok(HttpResponse::Ok().json(user))
}
