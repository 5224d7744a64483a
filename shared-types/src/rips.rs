use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One service line of the RIPS report
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RipsRecord {
    pub id: i64,
    pub numero_factura: String,
    pub codigo_cups: String,
    pub documento_paciente: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub valor: f64,
    pub sede: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RipsRecordsResponse {
    pub records: Vec<RipsRecord>,
}

/// Log entry written for every RIPS fetch run
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RipsReport {
    pub id: i64,
    pub fecha_inicial: String,
    pub fecha_final: String,
    pub total_registros: i64,
    pub insertados: i64,
    pub duplicados: i64,
    pub user_id: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RipsReportsResponse {
    pub reports: Vec<RipsReport>,
}
