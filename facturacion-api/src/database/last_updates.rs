use crate::database::{now_timestamp, AsyncDbConnection};
use anyhow::Result;
use rusqlite::OptionalExtension;
use shared_types::{LastUpdate, SyncKind};

/// Records the range of the latest synchronization of `kind`, replacing the previous one
pub async fn record_last_update(
    conn: AsyncDbConnection,
    kind: SyncKind,
    fecha_inicial: &str,
    fecha_final: &str,
    user_id: Option<i64>,
) -> Result<()> {
    let conn = conn.lock().await?;
    conn.execute(
        "INSERT INTO ultima_actualizacion (tipo, fecha_inicial, fecha_final, user_id, actualizado_en)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(tipo) DO UPDATE SET
            fecha_inicial = excluded.fecha_inicial,
            fecha_final = excluded.fecha_final,
            user_id = excluded.user_id,
            actualizado_en = excluded.actualizado_en",
        rusqlite::params![kind.as_str(), fecha_inicial, fecha_final, user_id, now_timestamp()],
    )?;
    Ok(())
}

pub async fn get_last_update(
    conn: AsyncDbConnection,
    kind: SyncKind,
) -> Result<Option<LastUpdate>> {
    let conn = conn.lock().await?;
    let update = conn
        .query_row(
            "SELECT fecha_inicial, fecha_final, user_id, actualizado_en
             FROM ultima_actualizacion WHERE tipo = ?",
            [kind.as_str()],
            |row| {
                Ok(LastUpdate {
                    tipo: kind,
                    fecha_inicial: row.get(0)?,
                    fecha_final: row.get(1)?,
                    user_id: row.get(2)?,
                    actualizado_en: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(update)
}
