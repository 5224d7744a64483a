use crate::config::AuthConfig;
use crate::database::{users as users_db, AsyncDbConnection, Database, DbError};
use crate::handlers::ApiError;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use anyhow::Result;
use futures::future::{FutureExt, LocalBoxFuture};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared_types::{User, UserRole};
use std::future::{ready, Ready};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub rol: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.rol == UserRole::Admin.as_str()
    }
}

/// Password hashing and HS256 session tokens
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(secret: &[u8], ttl_hours: i64, bcrypt_cost: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_hours,
            bcrypt_cost,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        if config.jwt_secret.is_empty() {
            tracing::warn!("auth.jwt_secret is not set; sessions will not survive a restart");
            let secret: [u8; 32] = rand::thread_rng().gen();
            Self::new(&secret, config.token_ttl_hours, config.bcrypt_cost)
        } else {
            Self::new(
                config.jwt_secret.as_bytes(),
                config.token_ttl_hours,
                config.bcrypt_cost,
            )
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        Ok(bcrypt::hash(password, self.bcrypt_cost)?)
    }

    /// Only bcrypt hashes are accepted; anything else never verifies
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        hash.starts_with("$2") && bcrypt::verify(password, hash).unwrap_or(false)
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            rol: user.rol.as_str().to_string(),
            iat: now,
            exp: now + self.ttl_hours * 3600,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

/// Creates the first administrator from `auth.admin_password` when no user exists yet
pub async fn bootstrap_admin(
    conn: AsyncDbConnection,
    service: &AuthService,
    config: &AuthConfig,
) -> Result<Option<User>> {
    if users_db::count_users(conn.clone()).await? > 0 {
        return Ok(None);
    }
    let Some(password) = config.admin_password.as_deref().filter(|p| !p.is_empty()) else {
        tracing::warn!("No users exist and auth.admin_password is not set; nobody can log in");
        return Ok(None);
    };

    let hash = service.hash_password(password)?;
    let user = users_db::create_user(
        conn,
        &config.admin_username,
        "Administrador",
        &hash,
        UserRole::Admin,
    )
    .await?;
    tracing::info!("Created initial administrator '{}'", user.username);
    Ok(Some(user))
}

/// Claims of the bearer token sent with the request
pub struct AuthenticatedUser(pub Claims);

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ApiError> {
    let service = req
        .app_data::<web::Data<Arc<AuthService>>>()
        .ok_or_else(|| ApiError::Internal("Auth service not configured".to_string()))?;

    let token = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = service
        .verify_token(token.trim())
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(AuthenticatedUser(claims))
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// Like `AuthenticatedUser`, but the stored account must still be an
/// active administrator
pub struct AdminUser(pub Claims);

async fn require_admin(
    database: Option<web::Data<Arc<Database>>>,
    claims: Claims,
) -> Result<AdminUser, ApiError> {
    let database =
        database.ok_or_else(|| ApiError::Internal("Database not configured".to_string()))?;
    let user = users_db::get_user(database.async_connection.clone(), claims.sub)
        .await
        .map_err(|e| match e {
            DbError::NotFound => ApiError::Unauthorized("User no longer exists".to_string()),
            other => other.into(),
        })?;

    if !user.activo {
        return Err(ApiError::Unauthorized("User is inactive".to_string()));
    }
    if user.rol != UserRole::Admin {
        tracing::warn!("User {} is not an administrator", user.username);
        return Err(ApiError::Forbidden("Administrator role required".to_string()));
    }
    Ok(AdminUser(claims))
}

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let authenticated = authenticate(req);
        let database = req.app_data::<web::Data<Arc<Database>>>().cloned();
        async move {
            let AuthenticatedUser(claims) = authenticated?;
            require_admin(database, claims).await
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(rol: UserRole) -> User {
        User {
            id: 7,
            username: "ana".to_string(),
            nombre: "Ana".to_string(),
            rol,
            activo: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let service = AuthService::new(b"secret", 1, 4);
        let token = service.issue_token(&user(UserRole::Admin)).unwrap();
        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert!(claims.is_admin());
        assert_eq!(claims.exp - claims.iat, 3600);

        let other = AuthService::new(b"other", 1, 4);
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = AuthService::new(b"secret", -2, 4);
        let token = service.issue_token(&user(UserRole::Usuario)).unwrap();
        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    fn test_plaintext_passwords_never_verify() {
        let service = AuthService::new(b"secret", 1, 4);
        let hash = service.hash_password("clave-segura").unwrap();
        assert!(service.verify_password("clave-segura", &hash));
        assert!(!service.verify_password("otra", &hash));
        assert!(!service.verify_password("clave-segura", "clave-segura"));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_on_empty_table() {
        let (_dir, db) = crate::database::test_database();
        let service = AuthService::new(b"secret", 1, 4);
        let mut config = AuthConfig::default();

        let created = bootstrap_admin(db.async_connection.clone(), &service, &config)
            .await
            .unwrap();
        assert!(created.is_none());

        config.admin_password = Some("clave-inicial".to_string());
        let admin = bootstrap_admin(db.async_connection.clone(), &service, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.rol, UserRole::Admin);

        let again = bootstrap_admin(db.async_connection.clone(), &service, &config)
            .await
            .unwrap();
        assert!(again.is_none());
    }
}
