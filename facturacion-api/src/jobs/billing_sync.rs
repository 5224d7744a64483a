use crate::database::billing_events::{self as events_db, NewBillingEvent, PeriodUpdate};
use crate::database::cancellations as cancellations_db;
use crate::database::rips::{self as rips_db, NewRipsRecord};
use crate::database::{facilities as facilities_db, last_updates, AsyncDbConnection};
use crate::integrations::{fetch_with_retry, ReportKind, ReportSource};
use crate::jobs::SyncSettings;
use anyhow::Result;
use billing_rules::{
    classify_period, decode_rows, normalize_invoice_number, parse_pergamo_date, split_by_month,
    FacilityDirectory, InvoiceRow, RipsRow,
};
use chrono::NaiveDate;
use shared_types::{BillingSyncSummary, Period, PeriodBackfillSummary, SyncKind};
use std::sync::Arc;

/// Pulls invoices and their RIPS lines from Pergamo and classifies each
/// invoice as CORRIENTE or REMANENTE.
pub struct BillingSyncManager {
    db_conn: AsyncDbConnection,
    source: Arc<dyn ReportSource>,
    settings: SyncSettings,
}

fn iso(date: Option<NaiveDate>, raw: &Option<String>) -> Option<String> {
    date.map(|d| d.to_string()).or_else(|| raw.clone())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BillingSyncManager {
    pub fn new(
        db_conn: AsyncDbConnection,
        source: Arc<dyn ReportSource>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            db_conn,
            source,
            settings,
        }
    }

    pub async fn sync_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        token: &str,
        user_id: Option<i64>,
    ) -> Result<BillingSyncSummary> {
        let ranges = split_by_month(start, end);
        let mut summary = BillingSyncSummary {
            months_requested: ranges.len(),
            ..Default::default()
        };

        let mut invoice_values = Vec::new();
        let mut rips_values = Vec::new();
        let mut months_fetched = 0;

        for range in &ranges {
            tracing::info!("Fetching invoices {} .. {}", range.start, range.end);
            let Some(invoices) = fetch_with_retry(
                self.source.as_ref(),
                ReportKind::Invoices,
                range,
                token,
                self.settings.invoice_policy,
            )
            .await
            else {
                summary.failed_ranges.push(range.to_wire());
                continue;
            };
            invoice_values.extend(invoices.rows(ReportKind::Invoices.rows_key()));
            months_fetched += 1;

            match fetch_with_retry(
                self.source.as_ref(),
                ReportKind::Rips,
                range,
                token,
                self.settings.rips_policy,
            )
            .await
            {
                Some(rips) => rips_values.extend(rips.rows(ReportKind::Rips.rows_key())),
                None => summary.failed_ranges.push(range.to_wire()),
            }
        }

        let (rips_rows, rips_errors) = decode_rows::<RipsRow>(rips_values);
        let (invoice_rows, invoice_errors) = decode_rows::<InvoiceRow>(invoice_values);
        for error in rips_errors.iter().chain(invoice_errors.iter()) {
            tracing::debug!("Discarding Pergamo row: {}", error);
        }
        summary.invalid_rows = rips_errors.len() + invoice_errors.len();
        summary.rips_received = rips_rows.len();
        summary.invoices_received = invoice_rows.len();

        // RIPS first so the invoices below classify against fresh service dates
        let mut rips_keys = rips_db::load_rips_keys(self.db_conn.clone()).await?;
        let mut new_rips = Vec::new();
        for row in rips_rows {
            let key = rips_db::rips_key(&row.factura, &row.cups);
            if key.0.is_empty() {
                summary.invalid_rows += 1;
                continue;
            }
            if !rips_keys.insert(key) {
                summary.rips_duplicates += 1;
                continue;
            }
            new_rips.push(NewRipsRecord {
                fecha_inicio: iso(row.service_start(), &row.fecha_inicio),
                fecha_fin: iso(row.service_end(), &row.fecha_fin),
                numero_factura: row.factura,
                codigo_cups: row.cups,
                documento_paciente: trimmed(row.documento_paciente),
                valor: row.valor,
                sede: trimmed(row.sede),
            });
        }
        summary.rips_inserted =
            rips_db::insert_rips_records(self.db_conn.clone(), &new_rips).await?;

        if months_fetched > 0 {
            rips_db::insert_rips_report(
                self.db_conn.clone(),
                &start.to_string(),
                &end.to_string(),
                summary.rips_received,
                summary.rips_inserted,
                summary.rips_duplicates,
                user_id,
            )
            .await?;
        }

        let facilities = facilities_db::list_facilities(self.db_conn.clone()).await?;
        let directory = FacilityDirectory::from_facilities(&facilities);
        let service_index = rips_db::load_service_index(self.db_conn.clone()).await?;
        let mut invoice_keys = events_db::load_invoice_keys(self.db_conn.clone()).await?;
        let voided_keys = cancellations_db::load_voided_invoice_keys(self.db_conn.clone()).await?;

        let mut new_events = Vec::new();
        for row in invoice_rows {
            let key = normalize_invoice_number(&row.factura);
            let Some(billing_date) = row.billing_date().filter(|_| !key.is_empty()) else {
                summary.invalid_rows += 1;
                continue;
            };
            if invoice_keys.contains(&key) {
                summary.invoice_duplicates += 1;
                continue;
            }
            let Some(sede_id) = directory.resolve(row.sede.as_deref()) else {
                tracing::debug!("No facility matches '{}'", row.sede.as_deref().unwrap_or(""));
                summary.unmatched_facility += 1;
                continue;
            };

            let window = service_index.get(&key).copied();
            let (periodo, valor) = if voided_keys.contains(&key) {
                (Period::Anulada, 0.0)
            } else {
                (classify_period(billing_date, window.as_ref()), row.total_facturado)
            };
            match periodo {
                Period::Anulada => summary.anuladas += 1,
                Period::Remanente => summary.remanente += 1,
                Period::Corriente => summary.corriente += 1,
            }

            invoice_keys.insert(key);
            new_events.push(NewBillingEvent {
                numero_factura: row.factura,
                fecha_facturacion: billing_date.to_string(),
                valor,
                sede_id,
                aseguradora: trimmed(row.aseguradora),
                documento_paciente: trimmed(row.documento_paciente),
                nombre_paciente: trimmed(row.nombre_paciente),
                periodo,
                fecha_inicio_servicio: window.and_then(|w| w.start).map(|d| d.to_string()),
                fecha_fin_servicio: window.and_then(|w| w.end).map(|d| d.to_string()),
            });
        }
        summary.invoices_inserted =
            events_db::insert_billing_events(self.db_conn.clone(), &new_events).await?;

        if months_fetched > 0 {
            last_updates::record_last_update(
                self.db_conn.clone(),
                SyncKind::Facturacion,
                &start.to_string(),
                &end.to_string(),
                user_id,
            )
            .await?;
        }

        tracing::info!(
            "Billing sync {} .. {}: {} invoices inserted ({} already cancelled), {} duplicates, {} without facility, {} RIPS lines inserted, {} ranges failed",
            start,
            end,
            summary.invoices_inserted,
            summary.anuladas,
            summary.invoice_duplicates,
            summary.unmatched_facility,
            summary.rips_inserted,
            summary.failed_ranges.len()
        );

        Ok(summary)
    }

    /// Fills the period and service dates of events that lack them, using
    /// the same classification as ingestion. Events without RIPS keep a
    /// period already set by hand.
    pub async fn backfill_periods(&self) -> Result<PeriodBackfillSummary> {
        let candidates = events_db::list_backfill_candidates(self.db_conn.clone()).await?;
        let service_index = rips_db::load_service_index(self.db_conn.clone()).await?;
        let mut summary = PeriodBackfillSummary {
            examined: candidates.len(),
            ..Default::default()
        };

        let mut updates = Vec::new();
        for candidate in candidates {
            let window = service_index.get(&candidate.numero_normalizado);
            if window.is_none() {
                summary.without_rips += 1;
                if candidate.periodo.is_some() {
                    continue;
                }
            }
            let Some(billing_date) = parse_pergamo_date(&candidate.fecha_facturacion) else {
                tracing::warn!(
                    "Event {} has an unreadable billing date '{}'",
                    candidate.id,
                    candidate.fecha_facturacion
                );
                continue;
            };

            let update = PeriodUpdate {
                id: candidate.id,
                periodo: classify_period(billing_date, window),
                fecha_inicio_servicio: window
                    .and_then(|w| w.start)
                    .map(|d| d.to_string())
                    .or(candidate.fecha_inicio_servicio.clone()),
                fecha_fin_servicio: window
                    .and_then(|w| w.end)
                    .map(|d| d.to_string())
                    .or(candidate.fecha_fin_servicio.clone()),
            };

            let unchanged = candidate.periodo == Some(update.periodo)
                && candidate.fecha_inicio_servicio == update.fecha_inicio_servicio
                && candidate.fecha_fin_servicio == update.fecha_fin_servicio;
            if !unchanged {
                updates.push(update);
            }
        }

        summary.updated = events_db::apply_period_updates(self.db_conn.clone(), &updates).await?;
        tracing::info!(
            "Period backfill: {} examined, {} updated, {} without RIPS",
            summary.examined,
            summary.updated,
            summary.without_rips
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::billing_events::tests::{event, seed_facility};
    use crate::database::billing_events::BillingEventFilter;
    use crate::database::test_database;
    use crate::jobs::testing::{settings, FakeSource};
    use serde_json::json;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn march_source() -> FakeSource {
        FakeSource::default()
            .with(
                ReportKind::Invoices,
                "2025-03-01",
                json!({"data": {"h1": [], "h2": [], "h3": [
                    {"Factura": "FE-100", "Fecha_Facturacion": "2025-03-05", "Total_Facturado": "150000",
                     "Sede": " norte ", "Aseguradora": "NUEVA EPS", "Documento_Paciente": "123"},
                    {"Factura": "FE-101", "Fecha_Facturacion": "2025-03-06", "Total_Facturado": 80000,
                     "Sede": "NORTE", "Aseguradora": "SANITAS"},
                    {"Factura": "FE 100", "Fecha_Facturacion": "2025-03-05", "Total_Facturado": 1,
                     "Sede": "NORTE"},
                    {"Factura": "FE-102", "Fecha_Facturacion": "2025-03-07", "Total_Facturado": 5,
                     "Sede": "DESCONOCIDA"},
                    {"Factura": "", "Fecha_Facturacion": "2025-03-07", "Total_Facturado": 5,
                     "Sede": "NORTE"}
                ]}}),
            )
            .with(
                ReportKind::Rips,
                "2025-03-01",
                json!({"data": {"report_rips": [
                    {"Factura": "FE-100", "Cups": "890201", "Fecha_Inicio": "2025-01-10", "Fecha_Fin": "2025-01-10", "Valor": 150000},
                    {"Factura": "FE-101", "Cups": "890201", "Fecha_Inicio": "2025-02-27", "Fecha_Fin": "2025-02-28", "Valor": 80000},
                    {"Factura": "FE-101", "Cups": "890201", "Fecha_Inicio": "2025-02-27", "Fecha_Fin": "2025-02-28", "Valor": 80000}
                ]}}),
            )
    }

    #[tokio::test]
    async fn test_sync_classifies_and_counts() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        seed_facility(conn.clone(), "Norte").await;

        let manager = BillingSyncManager::new(conn.clone(), Arc::new(march_source()), settings());
        let summary = manager
            .sync_range(date("2025-03-01"), date("2025-03-31"), "tok", Some(4))
            .await
            .unwrap();

        assert_eq!(summary.months_requested, 1);
        assert!(summary.failed_ranges.is_empty());
        assert_eq!(summary.invoices_received, 5);
        assert_eq!(summary.invoices_inserted, 2);
        assert_eq!(summary.invoice_duplicates, 1);
        assert_eq!(summary.unmatched_facility, 1);
        assert_eq!(summary.invalid_rows, 1);
        assert_eq!(summary.rips_inserted, 2);
        assert_eq!(summary.rips_duplicates, 1);
        assert_eq!(summary.remanente, 1);
        assert_eq!(summary.corriente, 1);

        let (events, _) =
            events_db::list_billing_events(conn.clone(), &BillingEventFilter::default(), None)
                .await
                .unwrap();
        let fe100 = events.iter().find(|e| e.numero_factura == "FE-100").unwrap();
        assert_eq!(fe100.periodo, Some(Period::Remanente));
        assert_eq!(fe100.valor, 150000.0);
        assert_eq!(fe100.fecha_fin_servicio.as_deref(), Some("2025-01-10"));
        let fe101 = events.iter().find(|e| e.numero_factura == "FE-101").unwrap();
        assert_eq!(fe101.periodo, Some(Period::Corriente));

        let update = last_updates::get_last_update(conn.clone(), SyncKind::Facturacion)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update.fecha_final, "2025-03-31");
        assert_eq!(update.user_id, Some(4));
        assert_eq!(rips_db::list_rips_reports(conn, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invoice_already_cancelled_is_stored_voided() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let norte = seed_facility(conn.clone(), "Norte").await;
        cancellations_db::insert_cancellations(
            conn.clone(),
            &[cancellations_db::NewCancellation {
                numero_anulacion: "AN-100".to_string(),
                numero_factura: "FE100".to_string(),
                tipo_registro: shared_types::CancellationKind::Anulacion,
                fecha: "2025-03-10".to_string(),
                valor: 150000.0,
                sede_id: norte,
                aseguradora: None,
                motivo: None,
            }],
        )
        .await
        .unwrap();

        let manager = BillingSyncManager::new(conn.clone(), Arc::new(march_source()), settings());
        let summary = manager
            .sync_range(date("2025-03-01"), date("2025-03-31"), "tok", None)
            .await
            .unwrap();

        assert_eq!(summary.invoices_inserted, 2);
        assert_eq!(summary.anuladas, 1);
        assert_eq!(summary.remanente, 0);
        assert_eq!(summary.corriente, 1);

        let (events, _) = events_db::list_billing_events(conn, &BillingEventFilter::default(), None)
            .await
            .unwrap();
        let fe100 = events.iter().find(|e| e.numero_factura == "FE-100").unwrap();
        assert_eq!(fe100.periodo, Some(Period::Anulada));
        assert_eq!(fe100.valor, 0.0);
    }

    #[tokio::test]
    async fn test_second_run_inserts_nothing() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        seed_facility(conn.clone(), "Norte").await;
        let manager = BillingSyncManager::new(conn.clone(), Arc::new(march_source()), settings());

        manager
            .sync_range(date("2025-03-01"), date("2025-03-31"), "tok", None)
            .await
            .unwrap();
        let again = manager
            .sync_range(date("2025-03-01"), date("2025-03-31"), "tok", None)
            .await
            .unwrap();

        assert_eq!(again.invoices_inserted, 0);
        assert_eq!(again.invoice_duplicates, 3);
        assert_eq!(again.rips_inserted, 0);
        assert_eq!(again.rips_duplicates, 3);
    }

    #[tokio::test]
    async fn test_failed_month_is_skipped_after_retries() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        seed_facility(conn.clone(), "Norte").await;
        let source = Arc::new(march_source());
        let manager = BillingSyncManager::new(conn.clone(), source.clone(), settings());

        let summary = manager
            .sync_range(date("2025-02-15"), date("2025-03-31"), "tok", None)
            .await
            .unwrap();

        assert_eq!(summary.months_requested, 2);
        assert_eq!(summary.failed_ranges.len(), 1);
        assert_eq!(summary.failed_ranges[0].inicial, "2025-02-15");
        assert_eq!(summary.failed_ranges[0].fin, "2025-02-28");
        // 3 failed attempts for February plus 1 for March
        assert_eq!(source.call_count(ReportKind::Invoices), 4);
        assert_eq!(summary.invoices_inserted, 2);
    }

    #[tokio::test]
    async fn test_all_months_failing_records_no_update() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let source = Arc::new(FakeSource::default());
        let manager = BillingSyncManager::new(conn.clone(), source, settings());

        let summary = manager
            .sync_range(date("2025-01-01"), date("2025-01-31"), "tok", None)
            .await
            .unwrap();

        assert_eq!(summary.failed_ranges.len(), 1);
        assert!(last_updates::get_last_update(conn, SyncKind::Facturacion)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_backfill_uses_rips_loaded_later() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let sede = seed_facility(conn.clone(), "Norte").await;

        let mut missing = event("FE-500", "2025-04-02", 10.0, sede);
        missing.periodo = Period::Corriente;
        let mut manual = event("FE-501", "2025-04-03", 10.0, sede);
        manual.periodo = Period::Remanente;
        events_db::insert_billing_events(conn.clone(), &[missing, manual]).await.unwrap();
        rips_db::insert_rips_records(
            conn.clone(),
            &[NewRipsRecord {
                numero_factura: "FE500".to_string(),
                codigo_cups: "890201".to_string(),
                documento_paciente: None,
                fecha_inicio: Some("2025-01-20".to_string()),
                fecha_fin: Some("2025-01-21".to_string()),
                valor: 10.0,
                sede: None,
            }],
        )
        .await
        .unwrap();

        let source = Arc::new(FakeSource::default());
        let manager = BillingSyncManager::new(conn.clone(), source, settings());
        let summary = manager.backfill_periods().await.unwrap();

        assert_eq!(summary.examined, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.without_rips, 1);

        let (events, _) =
            events_db::list_billing_events(conn.clone(), &BillingEventFilter::default(), None)
                .await
                .unwrap();
        let fe500 = events.iter().find(|e| e.numero_factura == "FE-500").unwrap();
        assert_eq!(fe500.periodo, Some(Period::Remanente));
        assert_eq!(fe500.fecha_inicio_servicio.as_deref(), Some("2025-01-20"));
        let fe501 = events.iter().find(|e| e.numero_factura == "FE-501").unwrap();
        assert_eq!(fe501.periodo, Some(Period::Remanente));

        let second = manager.backfill_periods().await.unwrap();
        assert_eq!(second.updated, 0);
    }
}
