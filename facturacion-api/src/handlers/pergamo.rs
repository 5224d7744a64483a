use actix_web::{web, HttpResponse};
use shared_types::{PergamoLoginRequest, PergamoLoginResponse};
use std::sync::Arc;

use super::{ApiError, ApiResult};
use crate::integrations::{PergamoClient, PergamoError};

/// Relays the Pergamo login so the frontend never needs the upstream address
pub async fn login(
    client: web::Data<Arc<PergamoClient>>,
    request: web::Json<PergamoLoginRequest>,
) -> ApiResult<HttpResponse> {
    if request.usuario.trim().is_empty() || request.clave.is_empty() {
        return Err(ApiError::Validation(
            "usuario and clave are required".to_string(),
        ));
    }

    let token = client
        .login(request.usuario.trim(), &request.clave)
        .await
        .map_err(|e| match e {
            PergamoError::Status(401) | PergamoError::Status(403) => {
                ApiError::Unauthorized("Pergamo rejected the credentials".to_string())
            }
            unconfigured @ PergamoError::NotConfigured => {
                ApiError::Internal(unconfigured.to_string())
            }
            other => {
                tracing::warn!("Pergamo login failed: {}", other);
                ApiError::Upstream(other.to_string())
            }
        })?;

    Ok(HttpResponse::Ok().json(PergamoLoginResponse { token }))
}
