use anyhow::Result;
use std::path::PathBuf;

const LEADFLOW_DIR: &str = ".leadflow";
const DB_FILE: &str = "leadflow.db";

/// Environment variable to override the LeadFlow data directory.
const LEADFLOW_DIR_ENV: &str = "LEADFLOW_DIR";

/// Resolve the LeadFlow data directory.
/// Priority: LEADFLOW_DIR env var > ~/.leadflow/
pub fn resolve_leadflow_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(LEADFLOW_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(LEADFLOW_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the data directory exists and return the database path inside it.
pub fn ensure_database_path() -> Result<PathBuf> {
    let dir = resolve_leadflow_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join(DB_FILE))
}

/// Convenience helper returning the database path as a UTF-8 string.
pub fn ensure_database_path_string() -> Result<String> {
    Ok(ensure_database_path()?.to_string_lossy().into_owned())
}
