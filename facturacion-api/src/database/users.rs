use crate::database::{constraint_error, now_timestamp, AsyncDbConnection, DbError};
use rusqlite::OptionalExtension;
use shared_types::{User, UserRole};

const SELECT_USER: &str =
    "SELECT id, username, nombre, rol, activo, created_at, updated_at, password_hash FROM user";

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<(User, String)> {
    let rol: String = row.get(3)?;
    let user = User {
        id: row.get(0)?,
        username: row.get(1)?,
        nombre: row.get(2)?,
        rol: UserRole::parse(&rol).unwrap_or(UserRole::Usuario),
        activo: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    };
    Ok((user, row.get(7)?))
}

/// Changes applied by `update_user`; the password arrives already hashed
#[derive(Debug, Default)]
pub struct UserChanges {
    pub nombre: Option<String>,
    pub password_hash: Option<String>,
    pub rol: Option<UserRole>,
    pub activo: Option<bool>,
}

pub async fn list_users(conn: AsyncDbConnection) -> Result<Vec<User>, DbError> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(&format!("{} ORDER BY username", SELECT_USER))?;
    let users = stmt
        .query_map([], map_user)?
        .map(|r| r.map(|(user, _)| user))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub async fn count_users(conn: AsyncDbConnection) -> Result<i64, DbError> {
    let conn = conn.lock().await?;
    Ok(conn.query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))?)
}

pub async fn get_user(conn: AsyncDbConnection, id: i64) -> Result<User, DbError> {
    let conn = conn.lock().await?;
    conn.query_row(&format!("{} WHERE id = ?", SELECT_USER), [id], map_user)
        .optional()?
        .map(|(user, _)| user)
        .ok_or(DbError::NotFound)
}

/// Returns the user together with its stored password hash
pub async fn find_credentials(
    conn: AsyncDbConnection,
    username: &str,
) -> Result<Option<(User, String)>, DbError> {
    let conn = conn.lock().await?;
    Ok(conn
        .query_row(
            &format!("{} WHERE username = ?", SELECT_USER),
            [username.trim()],
            map_user,
        )
        .optional()?)
}

pub async fn create_user(
    conn: AsyncDbConnection,
    username: &str,
    nombre: &str,
    password_hash: &str,
    rol: UserRole,
) -> Result<User, DbError> {
    let username = username.trim();
    let id = {
        let conn = conn.lock().await?;
        let now = now_timestamp();
        conn.query_row(
            "INSERT INTO user (username, nombre, password_hash, rol, activo, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?)
             RETURNING id",
            rusqlite::params![username, nombre.trim(), password_hash, rol.as_str(), now, now],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| {
            constraint_error(
                e,
                DbError::Duplicate(format!("Username '{}' is already taken", username)),
            )
        })?
    };
    get_user(conn, id).await
}

pub async fn update_user(
    conn: AsyncDbConnection,
    id: i64,
    changes: UserChanges,
) -> Result<User, DbError> {
    let existing = get_user(conn.clone(), id).await?;
    {
        let conn = conn.lock().await?;
        let now = now_timestamp();
        conn.execute(
            "UPDATE user SET nombre = ?, rol = ?, activo = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![
                changes.nombre.as_deref().map(str::trim).unwrap_or(&existing.nombre),
                changes.rol.unwrap_or(existing.rol).as_str(),
                changes.activo.unwrap_or(existing.activo),
                now,
                id
            ],
        )?;
        if let Some(hash) = &changes.password_hash {
            conn.execute(
                "UPDATE user SET password_hash = ? WHERE id = ?",
                rusqlite::params![hash, id],
            )?;
        }
    }
    get_user(conn, id).await
}

pub async fn delete_user(conn: AsyncDbConnection, id: i64) -> Result<(), DbError> {
    let conn = conn.lock().await?;
    let deleted = conn.execute("DELETE FROM user WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_database;

    #[tokio::test]
    async fn test_user_lifecycle() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let user = create_user(conn.clone(), " ana ", "Ana Pérez", "$2b$04$hash", UserRole::Usuario)
            .await
            .unwrap();
        assert_eq!(user.username, "ana");
        assert!(user.activo);
        assert_eq!(count_users(conn.clone()).await.unwrap(), 1);

        let again = create_user(conn.clone(), "ana", "Otra", "$2b$04$x", UserRole::Admin).await;
        assert!(matches!(again, Err(DbError::Duplicate(_))));

        let updated = update_user(
            conn.clone(),
            user.id,
            UserChanges {
                rol: Some(UserRole::Admin),
                password_hash: Some("$2b$04$other".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.rol, UserRole::Admin);
        assert_eq!(updated.nombre, "Ana Pérez");

        let (found, hash) = find_credentials(conn.clone(), "ana").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "$2b$04$other");
        assert!(find_credentials(conn.clone(), "nadie").await.unwrap().is_none());

        delete_user(conn.clone(), user.id).await.unwrap();
        assert!(list_users(conn).await.unwrap().is_empty());
    }
}
