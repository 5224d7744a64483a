use actix_web::{web, HttpResponse};
use shared_types::{CreateFacilityRequest, FacilitiesResponse, UpdateFacilityRequest};
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::database::facilities as db;
use crate::database::Database;
use crate::helpers::validation;

pub async fn list_facilities(database: web::Data<Arc<Database>>) -> ApiResult<HttpResponse> {
    let facilities = db::list_facilities(database.async_connection.clone()).await?;
    Ok(HttpResponse::Ok().json(FacilitiesResponse { facilities }))
}

pub async fn get_facility(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let facility = db::get_facility(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(facility))
}

pub async fn create_facility(
    database: web::Data<Arc<Database>>,
    request: web::Json<CreateFacilityRequest>,
) -> ApiResult<HttpResponse> {
    validation::validate_name("nombre", &request.nombre)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let facility = db::create_facility(database.async_connection.clone(), &request).await?;
    tracing::info!("Created facility {}", facility.nombre);
    Ok(HttpResponse::Created().json(facility))
}

pub async fn update_facility(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdateFacilityRequest>,
) -> ApiResult<HttpResponse> {
    if let Some(nombre) = &request.nombre {
        validation::validate_name("nombre", nombre)
            .map_err(|e| ApiError::Validation(e.to_string()))?;
    }

    let facility =
        db::update_facility(database.async_connection.clone(), path.into_inner(), &request)
            .await?;
    Ok(HttpResponse::Ok().json(facility))
}

/// Facilities referenced by invoices or cancellations answer 409
pub async fn delete_facility(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    db::delete_facility(database.async_connection.clone(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
