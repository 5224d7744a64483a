use actix_web::{web, HttpResponse};
use shared_types::{CreateUserRequest, UpdateUserRequest, UserRole, UsersResponse};
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::database::users::{self as db, UserChanges};
use crate::database::Database;
use crate::helpers::auth::{AdminUser, AuthService};
use crate::helpers::validation;

pub async fn list_users(
    _admin: AdminUser,
    database: web::Data<Arc<Database>>,
) -> ApiResult<HttpResponse> {
    let users = db::list_users(database.async_connection.clone()).await?;
    Ok(HttpResponse::Ok().json(UsersResponse { users }))
}

pub async fn get_user(
    _admin: AdminUser,
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let user = db::get_user(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn create_user(
    AdminUser(admin): AdminUser,
    database: web::Data<Arc<Database>>,
    auth: web::Data<Arc<AuthService>>,
    request: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    validation::validate_new_user(&request).map_err(|e| ApiError::Validation(e.to_string()))?;

    let hash = auth.hash_password(&request.password)?;
    let user = db::create_user(
        database.async_connection.clone(),
        &request.username,
        &request.nombre,
        &hash,
        request.rol.unwrap_or(UserRole::Usuario),
    )
    .await?;

    tracing::info!("User {} created by {}", user.username, admin.username);
    Ok(HttpResponse::Created().json(user))
}

pub async fn update_user(
    AdminUser(admin): AdminUser,
    database: web::Data<Arc<Database>>,
    auth: web::Data<Arc<AuthService>>,
    path: web::Path<i64>,
    request: web::Json<UpdateUserRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let request = request.into_inner();

    if let Some(nombre) = &request.nombre {
        validation::validate_name("nombre", nombre)
            .map_err(|e| ApiError::Validation(e.to_string()))?;
    }
    let password_hash = match &request.password {
        Some(password) => {
            validation::validate_password(password)
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            Some(auth.hash_password(password)?)
        }
        None => None,
    };

    let user = db::update_user(
        database.async_connection.clone(),
        id,
        UserChanges {
            nombre: request.nombre,
            password_hash,
            rol: request.rol,
            activo: request.activo,
        },
    )
    .await?;

    tracing::info!("User {} updated by {}", user.username, admin.username);
    Ok(HttpResponse::Ok().json(user))
}

pub async fn delete_user(
    AdminUser(admin): AdminUser,
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    if id == admin.sub {
        return Err(ApiError::Validation(
            "Administrators cannot delete their own account".to_string(),
        ));
    }

    db::delete_user(database.async_connection.clone(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}
