use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Body of the `cargar` endpoints
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SyncRequest {
    pub fecha_inicial: String,
    pub fecha_final: String,
    /// Pergamo bearer token
    pub token: String,
    pub user_id: Option<i64>,
}

/// Inclusive ISO date range, as sent to Pergamo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct DateRange {
    pub inicial: String,
    #[serde(rename = "final")]
    pub fin: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingSyncSummary {
    pub months_requested: usize,
    pub failed_ranges: Vec<DateRange>,
    pub invoices_received: usize,
    pub invoices_inserted: usize,
    pub invoice_duplicates: usize,
    pub unmatched_facility: usize,
    /// Rows that failed to decode or lack a number or date
    pub invalid_rows: usize,
    pub rips_received: usize,
    pub rips_inserted: usize,
    pub rips_duplicates: usize,
    pub corriente: usize,
    pub remanente: usize,
    /// Invoices stored as ANULADA because a cancellation already voids them
    pub anuladas: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CancellationSyncSummary {
    pub months_requested: usize,
    pub failed_ranges: Vec<DateRange>,
    pub detailed_received: usize,
    pub general_received: usize,
    pub anulaciones: usize,
    pub notas_credito: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub unmatched_facility: usize,
    pub discarded_before_cutoff: usize,
    pub invalid_rows: usize,
    pub invoices_voided: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodBackfillSummary {
    pub examined: usize,
    pub updated: usize,
    pub without_rips: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Facturacion,
    Anulaciones,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Facturacion => "facturacion",
            SyncKind::Anulaciones => "anulaciones",
        }
    }
}

/// Last successful synchronization of one kind
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LastUpdate {
    pub tipo: SyncKind,
    pub fecha_inicial: String,
    pub fecha_final: String,
    pub user_id: Option<i64>,
    pub actualizado_en: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PergamoLoginRequest {
    pub usuario: String,
    pub clave: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PergamoLoginResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_request_accepts_camel_case_body() {
        let request: SyncRequest = serde_json::from_str(
            r#"{"fechaInicial":"2025-01-01","fechaFinal":"2025-03-31","token":"abc","userId":7}"#,
        )
        .unwrap();
        assert_eq!(request.fecha_inicial, "2025-01-01");
        assert_eq!(request.fecha_final, "2025-03-31");
        assert_eq!(request.user_id, Some(7));
    }

    #[test]
    fn test_date_range_wire_names() {
        let range = DateRange {
            inicial: "2025-02-01".to_string(),
            fin: "2025-02-28".to_string(),
        };
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(json["inicial"], "2025-02-01");
        assert_eq!(json["final"], "2025-02-28");
    }
}
