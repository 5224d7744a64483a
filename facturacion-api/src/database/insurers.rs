use crate::database::{constraint_error, now_timestamp, AsyncDbConnection, DbError};
use billing_rules::insurer_key;
use rusqlite::OptionalExtension;
use shared_types::{CreateInsurerRequest, Insurer, UpdateInsurerRequest};

const SELECT_INSURER: &str =
    "SELECT id, nombre_pergamo, nombre, codigo, created_at, updated_at FROM aseguradora";

fn map_insurer(row: &rusqlite::Row) -> rusqlite::Result<Insurer> {
    Ok(Insurer {
        id: row.get(0)?,
        nombre_pergamo: row.get(1)?,
        nombre: row.get(2)?,
        codigo: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn duplicate(nombre_pergamo: &str) -> DbError {
    DbError::Duplicate(format!(
        "Insurer with Pergamo name '{}' already exists",
        nombre_pergamo
    ))
}

pub async fn list_insurers(conn: AsyncDbConnection) -> Result<Vec<Insurer>, DbError> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(&format!("{} ORDER BY nombre", SELECT_INSURER))?;
    let insurers = stmt
        .query_map([], map_insurer)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(insurers)
}

pub async fn get_insurer(conn: AsyncDbConnection, id: i64) -> Result<Insurer, DbError> {
    let conn = conn.lock().await?;
    conn.query_row(&format!("{} WHERE id = ?", SELECT_INSURER), [id], map_insurer)
        .optional()?
        .ok_or(DbError::NotFound)
}

/// Expects `codigo` already validated; it is stored uppercase
pub async fn create_insurer(
    conn: AsyncDbConnection,
    request: &CreateInsurerRequest,
) -> Result<Insurer, DbError> {
    let nombre_pergamo = insurer_key(&request.nombre_pergamo);
    let id = {
        let conn = conn.lock().await?;
        let now = now_timestamp();
        conn.query_row(
            "INSERT INTO aseguradora (nombre_pergamo, nombre, codigo, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
            rusqlite::params![
                &nombre_pergamo,
                request.nombre.trim(),
                request.codigo.trim().to_uppercase(),
                now,
                now
            ],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| constraint_error(e, duplicate(&nombre_pergamo)))?
    };
    get_insurer(conn, id).await
}

pub async fn update_insurer(
    conn: AsyncDbConnection,
    id: i64,
    request: &UpdateInsurerRequest,
) -> Result<Insurer, DbError> {
    let existing = get_insurer(conn.clone(), id).await?;
    let nombre_pergamo = request
        .nombre_pergamo
        .as_deref()
        .map(insurer_key)
        .unwrap_or(existing.nombre_pergamo);
    let nombre = request
        .nombre
        .as_deref()
        .map(|n| n.trim().to_string())
        .unwrap_or(existing.nombre);
    let codigo = request
        .codigo
        .as_deref()
        .map(|c| c.trim().to_uppercase())
        .unwrap_or(existing.codigo);

    {
        let conn = conn.lock().await?;
        conn.execute(
            "UPDATE aseguradora SET nombre_pergamo = ?, nombre = ?, codigo = ?, updated_at = ?
             WHERE id = ?",
            rusqlite::params![&nombre_pergamo, nombre, codigo, now_timestamp(), id],
        )
        .map_err(|e| constraint_error(e, duplicate(&nombre_pergamo)))?;
    }
    get_insurer(conn, id).await
}

pub async fn delete_insurer(conn: AsyncDbConnection, id: i64) -> Result<(), DbError> {
    let conn = conn.lock().await?;
    let deleted = conn.execute("DELETE FROM aseguradora WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
