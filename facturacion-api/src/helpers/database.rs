use crate::config::ApiConfig;
use std::path::PathBuf;

/// Returns the path to the billing database based on the operating system
///
/// # Platform-specific paths
///
/// - **macOS**: `~/Library/Application Support/control-facturacion/facturacion.db`
/// - **Linux**: `~/.local/share/control-facturacion/facturacion.db`
/// - **Windows**: `%LOCALAPPDATA%\control-facturacion\facturacion.db`
pub fn get_db_path() -> anyhow::Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(data_dir.join("control-facturacion").join("facturacion.db"))
}

/// Open the database at the configured path, or the platform default
pub fn initialize_database(
    config: &ApiConfig,
) -> anyhow::Result<std::sync::Arc<crate::database::Database>> {
    let db_path = match &config.database {
        Some(database) => database.path.clone(),
        None => get_db_path()?,
    };

    tracing::info!("Using database at {}", db_path.display());
    let db = crate::database::Database::new(&db_path)?;
    Ok(std::sync::Arc::new(db))
}
