use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// CUPS procedure code
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cup {
    pub id: i64,
    pub codigo: String,
    pub descripcion: String,
    pub activo: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateCupRequest {
    pub codigo: String,
    pub descripcion: String,
    pub activo: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateCupRequest {
    pub codigo: Option<String>,
    pub descripcion: Option<String>,
    pub activo: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CupsResponse {
    pub cups: Vec<Cup>,
}

/// A CUPS code offered at a facility
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CupAssignment {
    pub id: i64,
    pub cup_id: i64,
    pub sede_id: i64,
    pub sede_nombre: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateCupAssignmentRequest {
    pub sede_id: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CupAssignmentsResponse {
    pub assignments: Vec<CupAssignment>,
}
