use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Clinic location
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Facility {
    pub id: i64,
    pub nombre: String,
    pub ciudad: Option<String>,
    pub activo: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateFacilityRequest {
    pub nombre: String,
    pub ciudad: Option<String>,
    pub activo: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateFacilityRequest {
    pub nombre: Option<String>,
    pub ciudad: Option<String>,
    pub activo: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FacilitiesResponse {
    pub facilities: Vec<Facility>,
}
