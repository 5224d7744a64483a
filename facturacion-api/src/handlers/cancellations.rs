use actix_web::{web, HttpResponse};
use billing_rules::{parse_iso_range, InsurerDirectory};
use shared_types::{
    CancellationKind, CancellationListResponse, ReplacementUploadRequest, SyncKind, SyncRequest,
};
use std::sync::Arc;
use tracing::info;

use super::{csv_attachment, non_empty, ApiError, ApiResult, ListQuery};
use crate::database::cancellations::{self as db, CancellationFilter};
use crate::database::{insurers as insurers_db, last_updates, Database};
use crate::helpers::export;
use crate::jobs::cancellation_sync::CancellationSyncManager;

fn filter_from_query(query: &ListQuery) -> ApiResult<CancellationFilter> {
    let tipo_registro = match non_empty(&query.tipo_registro) {
        None => None,
        Some(raw) => Some(CancellationKind::parse(&raw).ok_or_else(|| {
            ApiError::Validation(format!(
                "Invalid tipoRegistro '{}': expected 'Anulación' or 'Nota Crédito'",
                raw
            ))
        })?),
    };

    Ok(CancellationFilter {
        fecha_inicial: non_empty(&query.fecha_inicial),
        fecha_final: non_empty(&query.fecha_final),
        search: non_empty(&query.search),
        sede_id: query.sede,
        aseguradora: non_empty(&query.aseguradora),
        tipo_registro,
    })
}

pub async fn sync_cancellations(
    manager: web::Data<Arc<CancellationSyncManager>>,
    request: web::Json<SyncRequest>,
) -> ApiResult<HttpResponse> {
    let request = request.into_inner();
    let (start, end) = parse_iso_range(&request.fecha_inicial, &request.fecha_final)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    info!(
        "Cancellation sync requested: {} .. {} (user {:?})",
        start, end, request.user_id
    );

    let summary = manager
        .sync_range(start, end, &request.token, request.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(summary))
}

pub async fn upload_replacements(
    manager: web::Data<Arc<CancellationSyncManager>>,
    request: web::Json<ReplacementUploadRequest>,
) -> ApiResult<HttpResponse> {
    if request.datos.is_empty() {
        return Err(ApiError::Validation("datos must not be empty".to_string()));
    }

    let response = manager.apply_replacement_upload(&request.datos).await?;
    info!(
        "Replacement upload: {} rows, {} cancellations updated",
        request.datos.len(),
        response.updated
    );

    Ok(HttpResponse::Ok().json(response))
}

pub async fn list_cancellations(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let filter = filter_from_query(&query)?;
    let page = query.page();

    let (data, total) =
        db::list_cancellations(database.async_connection.clone(), &filter, Some(page)).await?;

    Ok(HttpResponse::Ok().json(CancellationListResponse {
        data,
        total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages(total),
    }))
}

pub async fn get_last_update(database: web::Data<Arc<Database>>) -> ApiResult<HttpResponse> {
    let update =
        last_updates::get_last_update(database.async_connection.clone(), SyncKind::Anulaciones)
            .await?;
    Ok(HttpResponse::Ok().json(update))
}

pub async fn export_cancellations(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let filter = filter_from_query(&query)?;
    let (records, _) =
        db::list_cancellations(database.async_connection.clone(), &filter, None).await?;
    let insurers = insurers_db::list_insurers(database.async_connection.clone()).await?;

    let body = export::cancellations_csv(&records, &InsurerDirectory::from_insurers(&insurers))?;
    info!("Exported {} cancellations", records.len());

    Ok(csv_attachment("anulaciones.csv", body))
}
