use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Billing period label attached to an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Period {
    /// Services rendered in the month before billing (or later)
    Corriente,
    /// Services rendered two or more months before billing
    Remanente,
    /// Invoice voided by a cancellation
    Anulada,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Corriente => "CORRIENTE",
            Period::Remanente => "REMANENTE",
            Period::Anulada => "ANULADA",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "CORRIENTE" => Some(Period::Corriente),
            "REMANENTE" => Some(Period::Remanente),
            "ANULADA" => Some(Period::Anulada),
            _ => None,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invoice synchronized from Pergamo
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingEvent {
    pub id: i64,
    pub numero_factura: String,
    pub fecha_facturacion: String, // ISO date
    pub valor: f64,
    pub sede_id: i64,
    pub sede_nombre: Option<String>,
    /// Insurer name as received from Pergamo
    pub aseguradora: Option<String>,
    pub documento_paciente: Option<String>,
    pub nombre_paciente: Option<String>,
    pub periodo: Option<Period>,
    pub fecha_inicio_servicio: Option<String>,
    pub fecha_fin_servicio: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdatePeriodRequest {
    pub periodo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingEventListResponse {
    pub data: Vec<BillingEvent>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PeriodTotal {
    /// `None` groups events still without a period
    pub periodo: Option<Period>,
    pub count: i64,
    pub valor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct FacilityTotal {
    pub sede_id: i64,
    pub sede_nombre: String,
    pub count: i64,
    pub valor: f64,
}

/// Dashboard totals for a date range
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingSummary {
    pub fecha_inicial: String,
    pub fecha_final: String,
    pub total_count: i64,
    pub total_valor: f64,
    pub por_periodo: Vec<PeriodTotal>,
    pub por_sede: Vec<FacilityTotal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_serialization() {
        let json = serde_json::to_string(&Period::Remanente).unwrap();
        assert_eq!(json, "\"REMANENTE\"");

        let period: Period = serde_json::from_str("\"ANULADA\"").unwrap();
        assert_eq!(period, Period::Anulada);
    }

    #[test]
    fn test_period_parse_is_case_insensitive() {
        assert_eq!(Period::parse(" corriente "), Some(Period::Corriente));
        assert_eq!(Period::parse("Remanente"), Some(Period::Remanente));
        assert_eq!(Period::parse("PENDIENTE"), None);
    }
}
