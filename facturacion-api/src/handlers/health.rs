use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::database::Database;

pub async fn health(database: web::Data<Arc<Database>>) -> HttpResponse {
    let connected = match database.async_connection.lock().await {
        Ok(conn) => conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).is_ok(),
        Err(_) => false,
    };

    if connected {
        HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected"
        }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "database": "disconnected"
        }))
    }
}
