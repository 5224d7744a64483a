use crate::database::{constraint_error, now_timestamp, AsyncDbConnection, DbError};
use rusqlite::OptionalExtension;
use shared_types::{CreateCupRequest, Cup, CupAssignment, UpdateCupRequest};

const SELECT_CUP: &str = "SELECT id, codigo, descripcion, activo, created_at, updated_at FROM cup";

fn map_cup(row: &rusqlite::Row) -> rusqlite::Result<Cup> {
    Ok(Cup {
        id: row.get(0)?,
        codigo: row.get(1)?,
        descripcion: row.get(2)?,
        activo: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn duplicate(codigo: &str) -> DbError {
    DbError::Duplicate(format!("CUPS code '{}' already exists", codigo))
}

/// Lists procedures, optionally filtered by a substring of code or description
pub async fn list_cups(conn: AsyncDbConnection, search: Option<&str>) -> Result<Vec<Cup>, DbError> {
    let conn = conn.lock().await?;
    let cups = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let pattern = format!("%{}%", term);
            let mut stmt = conn.prepare(&format!(
                "{} WHERE codigo LIKE ?1 OR descripcion LIKE ?1 ORDER BY codigo",
                SELECT_CUP
            ))?;
            let rows = stmt
                .query_map([pattern], map_cup)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!("{} ORDER BY codigo", SELECT_CUP))?;
            let rows = stmt.query_map([], map_cup)?.collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(cups)
}

pub async fn get_cup(conn: AsyncDbConnection, id: i64) -> Result<Cup, DbError> {
    let conn = conn.lock().await?;
    conn.query_row(&format!("{} WHERE id = ?", SELECT_CUP), [id], map_cup)
        .optional()?
        .ok_or(DbError::NotFound)
}

pub async fn create_cup(
    conn: AsyncDbConnection,
    request: &CreateCupRequest,
) -> Result<Cup, DbError> {
    let codigo = request.codigo.trim().to_string();
    let id = {
        let conn = conn.lock().await?;
        let now = now_timestamp();
        conn.query_row(
            "INSERT INTO cup (codigo, descripcion, activo, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
            rusqlite::params![
                &codigo,
                request.descripcion.trim(),
                request.activo.unwrap_or(true),
                now,
                now
            ],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| constraint_error(e, duplicate(&codigo)))?
    };
    get_cup(conn, id).await
}

pub async fn update_cup(
    conn: AsyncDbConnection,
    id: i64,
    request: &UpdateCupRequest,
) -> Result<Cup, DbError> {
    let existing = get_cup(conn.clone(), id).await?;
    let codigo = request
        .codigo
        .as_deref()
        .map(|c| c.trim().to_string())
        .unwrap_or(existing.codigo);
    let descripcion = request
        .descripcion
        .as_deref()
        .map(|d| d.trim().to_string())
        .unwrap_or(existing.descripcion);
    let activo = request.activo.unwrap_or(existing.activo);

    {
        let conn = conn.lock().await?;
        conn.execute(
            "UPDATE cup SET codigo = ?, descripcion = ?, activo = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![&codigo, descripcion, activo, now_timestamp(), id],
        )
        .map_err(|e| constraint_error(e, duplicate(&codigo)))?;
    }
    get_cup(conn, id).await
}

/// Deleting a procedure also removes its facility assignments
pub async fn delete_cup(conn: AsyncDbConnection, id: i64) -> Result<(), DbError> {
    let conn = conn.lock().await?;
    let deleted = conn.execute("DELETE FROM cup WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

fn map_assignment(row: &rusqlite::Row) -> rusqlite::Result<CupAssignment> {
    Ok(CupAssignment {
        id: row.get(0)?,
        cup_id: row.get(1)?,
        sede_id: row.get(2)?,
        sede_nombre: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub async fn list_assignments(
    conn: AsyncDbConnection,
    cup_id: i64,
) -> Result<Vec<CupAssignment>, DbError> {
    get_cup(conn.clone(), cup_id).await?;

    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(
        "SELECT a.id, a.cup_id, a.sede_id, s.nombre, a.created_at
         FROM cup_assignment a
         LEFT JOIN sede s ON s.id = a.sede_id
         WHERE a.cup_id = ?
         ORDER BY s.nombre",
    )?;
    let assignments = stmt
        .query_map([cup_id], map_assignment)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assignments)
}

pub async fn create_assignment(
    conn: AsyncDbConnection,
    cup_id: i64,
    sede_id: i64,
) -> Result<CupAssignment, DbError> {
    get_cup(conn.clone(), cup_id).await?;
    crate::database::facilities::get_facility(conn.clone(), sede_id).await?;

    let conn = conn.lock().await?;
    let id: i64 = conn
        .query_row(
            "INSERT INTO cup_assignment (cup_id, sede_id, created_at) VALUES (?, ?, ?) RETURNING id",
            rusqlite::params![cup_id, sede_id, now_timestamp()],
            |row| row.get(0),
        )
        .map_err(|e| {
            constraint_error(
                e,
                DbError::Duplicate("Procedure is already assigned to this facility".to_string()),
            )
        })?;

    let assignment = conn.query_row(
        "SELECT a.id, a.cup_id, a.sede_id, s.nombre, a.created_at
         FROM cup_assignment a
         LEFT JOIN sede s ON s.id = a.sede_id
         WHERE a.id = ?",
        [id],
        map_assignment,
    )?;
    Ok(assignment)
}

pub async fn delete_assignment(conn: AsyncDbConnection, id: i64) -> Result<(), DbError> {
    let conn = conn.lock().await?;
    let deleted = conn.execute("DELETE FROM cup_assignment WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{facilities, test_database};
    use shared_types::CreateFacilityRequest;

    fn cup(codigo: &str, descripcion: &str) -> CreateCupRequest {
        CreateCupRequest {
            codigo: codigo.to_string(),
            descripcion: descripcion.to_string(),
            activo: None,
        }
    }

    #[tokio::test]
    async fn test_search_matches_code_and_description() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        create_cup(conn.clone(), &cup("890201", "Consulta medicina general")).await.unwrap();
        create_cup(conn.clone(), &cup("903841", "Glucosa en suero")).await.unwrap();

        assert_eq!(list_cups(conn.clone(), None).await.unwrap().len(), 2);
        assert_eq!(list_cups(conn.clone(), Some("8902")).await.unwrap().len(), 1);
        let found = list_cups(conn.clone(), Some("glucosa")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].codigo, "903841");
        assert_eq!(list_cups(conn, Some("  ")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_assignment_is_unique_per_facility() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        let procedure = create_cup(conn.clone(), &cup("890201", "Consulta")).await.unwrap();
        let facility = facilities::create_facility(
            conn.clone(),
            &CreateFacilityRequest {
                nombre: "Norte".to_string(),
                ciudad: None,
                activo: None,
            },
        )
        .await
        .unwrap();

        let assignment = create_assignment(conn.clone(), procedure.id, facility.id)
            .await
            .unwrap();
        assert_eq!(assignment.sede_nombre.as_deref(), Some("NORTE"));

        let again = create_assignment(conn.clone(), procedure.id, facility.id).await;
        assert!(matches!(again, Err(DbError::Duplicate(_))));

        let missing = create_assignment(conn.clone(), procedure.id, 999).await;
        assert!(matches!(missing, Err(DbError::NotFound)));

        delete_cup(conn.clone(), procedure.id).await.unwrap();
        assert!(matches!(
            delete_assignment(conn, assignment.id).await,
            Err(DbError::NotFound)
        ));
    }
}
