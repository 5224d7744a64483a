use crate::database::cancellations::{self as cancellations_db, NewCancellation};
use crate::database::{
    billing_events as events_db, facilities as facilities_db, last_updates, AsyncDbConnection,
};
use crate::integrations::{fetch_with_retry, ReportKind, ReportSource};
use crate::jobs::SyncSettings;
use anyhow::Result;
use billing_rules::{
    classify_cancellations, decode_rows, merge_replacement_rows, normalize_invoice_number,
    split_by_month, CancellationRow, FacilityDirectory,
};
use chrono::NaiveDate;
use futures::future::join_all;
use shared_types::{
    CancellationKind, CancellationSyncSummary, ReplacementRow, ReplacementUploadResponse, SyncKind,
};
use std::sync::Arc;

/// Loads cancellations and credit notes from Pergamo and voids the
/// invoices they fully cancel.
pub struct CancellationSyncManager {
    db_conn: AsyncDbConnection,
    source: Arc<dyn ReportSource>,
    settings: SyncSettings,
}

impl CancellationSyncManager {
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
    ) -> Result<CancellationSyncSummary> {
        let ranges = split_by_month(start, end);
        let mut summary = CancellationSyncSummary {
            months_requested: ranges.len(),
            ..Default::default()
        };

        // Months are fetched concurrently, each with its own retries
        let fetches = ranges.iter().map(|range| {
            fetch_with_retry(
                self.source.as_ref(),
                ReportKind::Cancellations,
                range,
                token,
                self.settings.cancellation_policy,
            )
        });
        let payloads = join_all(fetches).await;

        let mut detailed_values = Vec::new();
        let mut general_values = Vec::new();
        for (range, payload) in ranges.iter().zip(payloads) {
            match payload {
                Some(payload) => {
                    detailed_values.extend(payload.rows("h3"));
                    general_values.extend(payload.rows("h2"));
                }
                None => summary.failed_ranges.push(range.to_wire()),
            }
        }

        let (detailed, detailed_errors) = decode_rows::<CancellationRow>(detailed_values);
        let (general, general_errors) = decode_rows::<CancellationRow>(general_values);
        summary.invalid_rows = detailed_errors.len() + general_errors.len();
        summary.detailed_received = detailed.len();
        summary.general_received = general.len();

        let batch = classify_cancellations(detailed, general, self.settings.credit_note_cutoff);
        summary.discarded_before_cutoff = batch.discarded_before_cutoff;
        summary.invalid_rows += batch.without_number;

        let facilities = facilities_db::list_facilities(self.db_conn.clone()).await?;
        let directory = FacilityDirectory::from_facilities(&facilities);
        let mut known = cancellations_db::load_cancellation_keys(self.db_conn.clone()).await?;

        let mut new_records = Vec::new();
        for record in batch.records {
            let key = normalize_invoice_number(record.row.document_number());
            if key.is_empty() {
                summary.invalid_rows += 1;
                continue;
            }
            if known.contains(&key) {
                summary.duplicates += 1;
                continue;
            }
            let Some(sede_id) = directory.resolve(record.row.sede.as_deref()) else {
                summary.unmatched_facility += 1;
                continue;
            };
            // Unreadable dates are stored as received
            let fecha = match (record.row.date(), record.row.fecha.as_deref()) {
                (Some(date), _) => date.to_string(),
                (None, Some(raw)) => raw.to_string(),
                (None, None) => {
                    tracing::debug!("Cancellation '{}' has no date", record.row.document_number());
                    summary.invalid_rows += 1;
                    continue;
                }
            };

            match record.kind {
                CancellationKind::Anulacion => summary.anulaciones += 1,
                CancellationKind::NotaCredito => summary.notas_credito += 1,
            }

            known.insert(key);
            new_records.push(NewCancellation {
                numero_anulacion: record.row.document_number().to_string(),
                numero_factura: record.row.factura,
                tipo_registro: record.kind,
                fecha,
                valor: record.row.valor,
                sede_id,
                aseguradora: record.row.aseguradora,
                motivo: record.row.motivo,
            });
        }

        summary.inserted =
            cancellations_db::insert_cancellations(self.db_conn.clone(), &new_records).await?;

        // Every stored Anulación, so invoices synced after an earlier run are voided too
        let voided_keys: Vec<String> =
            cancellations_db::load_voided_invoice_keys(self.db_conn.clone())
                .await?
                .into_iter()
                .collect();
        summary.invoices_voided =
            events_db::void_invoices(self.db_conn.clone(), &voided_keys).await?;

        if !ranges.is_empty() && summary.failed_ranges.len() < ranges.len() {
            last_updates::record_last_update(
                self.db_conn.clone(),
                SyncKind::Anulaciones,
                &start.to_string(),
                &end.to_string(),
                user_id,
            )
            .await?;
        }

        tracing::info!(
            "Cancellation sync {} .. {}: {} anulaciones, {} notas crédito, {} duplicates, {} without facility, {} invoices voided, {} ranges failed",
            start,
            end,
            summary.anulaciones,
            summary.notas_credito,
            summary.duplicates,
            summary.unmatched_facility,
            summary.invoices_voided,
            summary.failed_ranges.len()
        );

        Ok(summary)
    }

    /// Stores the replacement invoices listed in a flat-file upload
    pub async fn apply_replacement_upload(
        &self,
        rows: &[ReplacementRow],
    ) -> Result<ReplacementUploadResponse> {
        let updates = merge_replacement_rows(rows);
        let (updated, not_found) =
            cancellations_db::apply_replacements(self.db_conn.clone(), &updates).await?;
        if !not_found.is_empty() {
            tracing::warn!("{} uploaded cancellation numbers were not found", not_found.len());
        }
        Ok(ReplacementUploadResponse { updated, not_found })
    }
}
