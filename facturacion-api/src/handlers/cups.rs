use actix_web::{web, HttpResponse};
use serde::Deserialize;
use shared_types::{
    CreateCupAssignmentRequest, CreateCupRequest, CupAssignmentsResponse, CupsResponse,
    UpdateCupRequest,
};
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::database::cups as db;
use crate::database::Database;

#[derive(Deserialize)]
pub struct CupsQuery {
    search: Option<String>,
}

fn validate_code(codigo: &str) -> ApiResult<()> {
    if codigo.trim().is_empty() {
        return Err(ApiError::Validation("codigo is required".to_string()));
    }
    Ok(())
}

pub async fn list_cups(
    database: web::Data<Arc<Database>>,
    query: web::Query<CupsQuery>,
) -> ApiResult<HttpResponse> {
    let cups = db::list_cups(database.async_connection.clone(), query.search.as_deref()).await?;
    Ok(HttpResponse::Ok().json(CupsResponse { cups }))
}

pub async fn get_cup(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let cup = db::get_cup(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cup))
}

pub async fn create_cup(
    database: web::Data<Arc<Database>>,
    request: web::Json<CreateCupRequest>,
) -> ApiResult<HttpResponse> {
    validate_code(&request.codigo)?;
    let cup = db::create_cup(database.async_connection.clone(), &request).await?;
    Ok(HttpResponse::Created().json(cup))
}

pub async fn update_cup(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateCupRequest>,
) -> ApiResult<HttpResponse> {
    if let Some(codigo) = &request.codigo {
        validate_code(codigo)?;
    }
    let cup = db::update_cup(database.async_connection.clone(), path.into_inner(), &request).await?;
    Ok(HttpResponse::Ok().json(cup))
}

pub async fn delete_cup(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    db::delete_cup(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_assignments(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let assignments =
        db::list_assignments(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(CupAssignmentsResponse { assignments }))
}

pub async fn create_assignment(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<CreateCupAssignmentRequest>,
) -> ApiResult<HttpResponse> {
    let assignment = db::create_assignment(
        database.async_connection.clone(),
        path.into_inner(),
        request.sede_id,
    )
    .await?;
    Ok(HttpResponse::Created().json(assignment))
}

pub async fn delete_assignment(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    db::delete_assignment(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
