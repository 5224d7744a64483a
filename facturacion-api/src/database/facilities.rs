use crate::database::{constraint_error, now_timestamp, AsyncDbConnection, DbError};
use billing_rules::facility_key;
use rusqlite::OptionalExtension;
use shared_types::{CreateFacilityRequest, Facility, UpdateFacilityRequest};

const SELECT_FACILITY: &str = "SELECT id, nombre, ciudad, activo, created_at, updated_at FROM sede";

fn map_facility(row: &rusqlite::Row) -> rusqlite::Result<Facility> {
    Ok(Facility {
        id: row.get(0)?,
        nombre: row.get(1)?,
        ciudad: row.get(2)?,
        activo: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn duplicate(nombre: &str) -> DbError {
    DbError::Duplicate(format!("Facility '{}' already exists", nombre))
}

pub async fn list_facilities(conn: AsyncDbConnection) -> Result<Vec<Facility>, DbError> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(&format!("{} ORDER BY nombre", SELECT_FACILITY))?;
    let facilities = stmt
        .query_map([], map_facility)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(facilities)
}

pub async fn get_facility(conn: AsyncDbConnection, id: i64) -> Result<Facility, DbError> {
    let conn = conn.lock().await?;
    conn.query_row(&format!("{} WHERE id = ?", SELECT_FACILITY), [id], map_facility)
        .optional()?
        .ok_or(DbError::NotFound)
}

/// Names are stored uppercase and trimmed so Pergamo `Sede` values match exactly
pub async fn create_facility(
    conn: AsyncDbConnection,
    request: &CreateFacilityRequest,
) -> Result<Facility, DbError> {
    let nombre = facility_key(&request.nombre);
    let id = {
        let conn = conn.lock().await?;
        let now = now_timestamp();
        conn.query_row(
            "INSERT INTO sede (nombre, ciudad, activo, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
            rusqlite::params![
                &nombre,
                request.ciudad.as_deref().map(str::trim),
                request.activo.unwrap_or(true),
                now,
                now
            ],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| constraint_error(e, duplicate(&nombre)))?
    };
    get_facility(conn, id).await
}

pub async fn update_facility(
    conn: AsyncDbConnection,
    id: i64,
    request: &UpdateFacilityRequest,
) -> Result<Facility, DbError> {
    let existing = get_facility(conn.clone(), id).await?;
    let nombre = request
        .nombre
        .as_deref()
        .map(facility_key)
        .unwrap_or(existing.nombre);
    let ciudad = match &request.ciudad {
        Some(ciudad) => Some(ciudad.trim().to_string()),
        None => existing.ciudad,
    };
    let activo = request.activo.unwrap_or(existing.activo);

    {
        let conn = conn.lock().await?;
        conn.execute(
            "UPDATE sede SET nombre = ?, ciudad = ?, activo = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![&nombre, ciudad, activo, now_timestamp(), id],
        )
        .map_err(|e| constraint_error(e, duplicate(&nombre)))?;
    }
    get_facility(conn, id).await
}

pub async fn delete_facility(conn: AsyncDbConnection, id: i64) -> Result<(), DbError> {
    let conn = conn.lock().await?;
    let deleted = conn
        .execute("DELETE FROM sede WHERE id = ?", [id])
        .map_err(|e| {
            constraint_error(
                e,
                DbError::InUse("Facility has billing or cancellation records".to_string()),
            )
        })?;
    if deleted == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
