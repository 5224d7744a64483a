use actix_web::{web, HttpResponse};
use billing_rules::{parse_iso_range, InsurerDirectory};
use serde::Deserialize;
use shared_types::{
    BillingEventListResponse, RipsRecordsResponse, RipsReportsResponse, SyncKind, SyncRequest,
    UpdatePeriodRequest,
};
use std::sync::Arc;
use tracing::info;

use super::{csv_attachment, non_empty, ApiError, ApiResult, ListQuery};
use crate::database::billing_events::{self as db, BillingEventFilter};
use crate::database::{insurers as insurers_db, last_updates, rips as rips_db, Database};
use crate::helpers::{export, validation};
use crate::jobs::billing_sync::BillingSyncManager;

const RECENT_RIPS_REPORTS: usize = 50;

fn filter_from_query(query: &ListQuery) -> ApiResult<BillingEventFilter> {
    let periodo = validation::parse_period_value(query.periodo.as_deref())
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    Ok(BillingEventFilter {
        fecha_inicial: non_empty(&query.fecha_inicial),
        fecha_final: non_empty(&query.fecha_final),
        search: non_empty(&query.search),
        sede_id: query.sede,
        aseguradora: non_empty(&query.aseguradora),
        periodo,
    })
}

pub async fn sync_billing(
    manager: web::Data<Arc<BillingSyncManager>>,
    request: web::Json<SyncRequest>,
) -> ApiResult<HttpResponse> {
    let request = request.into_inner();
    let (start, end) = parse_iso_range(&request.fecha_inicial, &request.fecha_final)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    info!(
        "Billing sync requested: {} .. {} (user {:?})",
        start, end, request.user_id
    );

    let summary = manager
        .sync_range(start, end, &request.token, request.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(summary))
}

pub async fn list_events(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let filter = filter_from_query(&query)?;
    let page = query.page();

    let (data, total) =
        db::list_billing_events(database.async_connection.clone(), &filter, Some(page)).await?;

    Ok(HttpResponse::Ok().json(BillingEventListResponse {
        data,
        total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages(total),
    }))
}

pub async fn update_event_period(
    database: web::Data<Arc<Database>>,
    path: web::Path<i64>,
    request: web::Json<UpdatePeriodRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let periodo = validation::parse_period_value(request.periodo.as_deref())
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let event = db::update_period(database.async_connection.clone(), id, periodo)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Billing event {} not found", id)))?;

    info!("Period of invoice {} set to {:?}", event.numero_factura, periodo);
    Ok(HttpResponse::Ok().json(event))
}

pub async fn backfill_periods(
    manager: web::Data<Arc<BillingSyncManager>>,
) -> ApiResult<HttpResponse> {
    let summary = manager.backfill_periods().await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    fecha_inicial: String,
    fecha_final: String,
}

pub async fn get_summary(
    database: web::Data<Arc<Database>>,
    query: web::Query<SummaryQuery>,
) -> ApiResult<HttpResponse> {
    parse_iso_range(&query.fecha_inicial, &query.fecha_final)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let summary = db::summarize(
        database.async_connection.clone(),
        &query.fecha_inicial,
        &query.fecha_final,
    )
    .await?;

    Ok(HttpResponse::Ok().json(summary))
}

pub async fn get_last_update(database: web::Data<Arc<Database>>) -> ApiResult<HttpResponse> {
    let update =
        last_updates::get_last_update(database.async_connection.clone(), SyncKind::Facturacion)
            .await?;
    Ok(HttpResponse::Ok().json(update))
}

pub async fn list_rips_reports(database: web::Data<Arc<Database>>) -> ApiResult<HttpResponse> {
    let reports =
        rips_db::list_rips_reports(database.async_connection.clone(), RECENT_RIPS_REPORTS).await?;
    Ok(HttpResponse::Ok().json(RipsReportsResponse { reports }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RipsQuery {
    numero_factura: String,
}

pub async fn list_invoice_rips(
    database: web::Data<Arc<Database>>,
    query: web::Query<RipsQuery>,
) -> ApiResult<HttpResponse> {
    if query.numero_factura.trim().is_empty() {
        return Err(ApiError::Validation("numeroFactura is required".to_string()));
    }

    let records =
        rips_db::list_rips_for_invoice(database.async_connection.clone(), &query.numero_factura)
            .await?;
    Ok(HttpResponse::Ok().json(RipsRecordsResponse { records }))
}

pub async fn export_events(
    database: web::Data<Arc<Database>>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let filter = filter_from_query(&query)?;
    let (events, _) =
        db::list_billing_events(database.async_connection.clone(), &filter, None).await?;
    let insurers = insurers_db::list_insurers(database.async_connection.clone()).await?;

    let body = export::billing_events_csv(&events, &InsurerDirectory::from_insurers(&insurers))?;
    info!("Exported {} billing events", events.len());

    Ok(csv_attachment("facturacion.csv", body))
}
