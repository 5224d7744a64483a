use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Discriminator between a full cancellation and a credit note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
pub enum CancellationKind {
    #[serde(rename = "Anulación")]
    Anulacion,
    #[serde(rename = "Nota Crédito")]
    NotaCredito,
}

impl CancellationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationKind::Anulacion => "Anulación",
            CancellationKind::NotaCredito => "Nota Crédito",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Anulación" | "Anulacion" => Some(CancellationKind::Anulacion),
            "Nota Crédito" | "Nota Credito" => Some(CancellationKind::NotaCredito),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cancellation {
    pub id: i64,
    pub numero_anulacion: String,
    /// Invoice the record cancels or credits
    pub numero_factura: String,
    pub tipo_registro: CancellationKind,
    pub fecha: String,
    pub valor: f64,
    pub sede_id: i64,
    pub sede_nombre: Option<String>,
    pub aseguradora: Option<String>,
    pub motivo: Option<String>,
    // Comma-separated lists filled by the flat-file upload
    pub facturas_reemplazo: Option<String>,
    pub fechas_reemplazo: Option<String>,
    pub valores_reemplazo: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CancellationListResponse {
    pub data: Vec<Cancellation>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// One line of the replacement-invoice flat file
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementRow {
    pub numero_anulacion: String,
    pub factura_reemplazo: Option<String>,
    pub fecha_reemplazo: Option<String>,
    /// Accepted as text so thousands separators survive untouched
    pub valor_reemplazo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReplacementUploadRequest {
    pub datos: Vec<ReplacementRow>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReplacementUploadResponse {
    pub updated: usize,
    pub not_found: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&CancellationKind::Anulacion).unwrap(),
            "\"Anulación\""
        );
        assert_eq!(
            serde_json::to_string(&CancellationKind::NotaCredito).unwrap(),
            "\"Nota Crédito\""
        );
    }

    #[test]
    fn test_replacement_row_uses_camel_case() {
        let row: ReplacementRow = serde_json::from_str(
            r#"{"numeroAnulacion":"AN-1","facturaReemplazo":"FE-9","fechaReemplazo":null,"valorReemplazo":"1000"}"#,
        )
        .unwrap();
        assert_eq!(row.numero_anulacion, "AN-1");
        assert_eq!(row.factura_reemplazo.as_deref(), Some("FE-9"));
        assert!(row.fecha_reemplazo.is_none());
    }
}
