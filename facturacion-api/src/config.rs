use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub cors: Option<CorsConfig>,
    pub server: Option<ServerConfig>,
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub pergamo: PergamoConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors: Some(CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            }),
            server: Some(ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            }),
            database: None,
            pergamo: PergamoConfig::default(),
            sync: SyncConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Connection settings for the Pergamo reporting API
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PergamoConfig {
    pub base_url: String,
    pub login_path: String,
    pub invoices_path: String,
    pub rips_path: String,
    pub cancellations_path: String,
    pub max_attempts: u32,
    pub invoice_timeout_secs: u64,
    pub rips_timeout_secs: u64,
    pub cancellation_timeout_secs: u64,
}

impl Default for PergamoConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login_path: "/api/login".to_string(),
            invoices_path: "/api/reportes/facturacion".to_string(),
            rips_path: "/api/reportes/rips".to_string(),
            cancellations_path: "/api/reportes/anulaciones".to_string(),
            max_attempts: 3,
            invoice_timeout_secs: 60,
            rips_timeout_secs: 60,
            cancellation_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    /// General-set credit notes dated before this day are discarded
    pub credit_note_cutoff: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            credit_note_cutoff: "2025-01-01".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret; a random one is generated when empty
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Created at startup when the user table is empty
    pub admin_username: String,
    pub admin_password: Option<String>,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: 12,
            admin_username: "admin".to_string(),
            admin_password: None,
            bcrypt_cost: 12,
        }
    }
}

impl ApiConfig {
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        if !config_path.exists() {
            let default_config = r#"
[cors]
allowed_origins = ["http://localhost:3000"]

[server]
host = "127.0.0.1"
port = 8080

# [database]
# path = "/var/lib/control-facturacion/facturacion.db"

[pergamo]
# base_url = "https://pergamo.example.com"
login_path = "/api/login"
invoices_path = "/api/reportes/facturacion"
rips_path = "/api/reportes/rips"
cancellations_path = "/api/reportes/anulaciones"
max_attempts = 3
invoice_timeout_secs = 60
rips_timeout_secs = 60
cancellation_timeout_secs = 20

[sync]
credit_note_cutoff = "2025-01-01"

[auth]
# jwt_secret = "change-me"
token_ttl_hours = 12
admin_username = "admin"
# admin_password = "set-on-first-run"
bcrypt_cost = 12
"#;
            std::fs::write(&config_path, default_config).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .add_source(
                Environment::with_prefix("FACTURACION")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: ApiConfig = builder.try_deserialize()?;

        Ok((config, config_path))
    }

    pub fn bind_address(&self) -> (String, u16) {
        match &self.server {
            Some(server) => (server.host.clone(), server.port),
            None => ("127.0.0.1".to_string(), 8080),
        }
    }
}

pub fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("control-facturacion").join("api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: ApiConfig = Config::builder()
            .add_source(config::File::from_str(
                r#"
[pergamo]
base_url = "https://pergamo.test"
max_attempts = 5
"#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.pergamo.base_url, "https://pergamo.test");
        assert_eq!(config.pergamo.max_attempts, 5);
        assert_eq!(config.pergamo.cancellation_timeout_secs, 20);
        assert_eq!(config.sync.credit_note_cutoff, "2025-01-01");
        assert_eq!(config.auth.token_ttl_hours, 12);
        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 8080));
    }
}
