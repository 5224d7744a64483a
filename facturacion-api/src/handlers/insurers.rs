use actix_web::{web, HttpResponse};
use shared_types::{CreateInsurerRequest, InsurersResponse, UpdateInsurerRequest};
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::database::insurers as db;
use crate::database::Database;
use crate::helpers::validation;

pub async fn list_insurers(database: web::Data<Arc<Database>>) -> ApiResult<HttpResponse> {
    let insurers = db::list_insurers(database.async_connection.clone()).await?;
    Ok(HttpResponse::Ok().json(InsurersResponse { insurers }))
}

pub async fn get_insurer(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let insurer = db::get_insurer(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(insurer))
}

pub async fn create_insurer(
    database: web::Data<Arc<Database>>,
    request: web::Json<CreateInsurerRequest>,
) -> ApiResult<HttpResponse> {
    validation::validate_new_insurer(&request).map_err(|e| ApiError::Validation(e.to_string()))?;

    let insurer = db::create_insurer(database.async_connection.clone(), &request).await?;
    tracing::info!("Created insurer {} ({})", insurer.nombre, insurer.codigo);
    Ok(HttpResponse::Created().json(insurer))
}

pub async fn update_insurer(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateInsurerRequest>,
) -> ApiResult<HttpResponse> {
    validation::validate_insurer_update(&request)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let insurer =
        db::update_insurer(database.async_connection.clone(), path.into_inner(), &request).await?;
    Ok(HttpResponse::Ok().json(insurer))
}

pub async fn delete_insurer(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    db::delete_insurer(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
