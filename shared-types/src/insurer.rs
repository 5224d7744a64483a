use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Insurer {
    pub id: i64,
    /// Name exactly as Pergamo reports it
    pub nombre_pergamo: String,
    pub nombre: String,
    /// Three-letter internal code
    pub codigo: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateInsurerRequest {
    pub nombre_pergamo: String,
    pub nombre: String,
    pub codigo: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateInsurerRequest {
    pub nombre_pergamo: Option<String>,
    pub nombre: Option<String>,
    pub codigo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InsurersResponse {
    pub insurers: Vec<Insurer>,
}
