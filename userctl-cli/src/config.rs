//! Environment file loading
//!
//! Priority order (highest to lowest):
//! 1. Variables already set in the process environment
//! 2. Current directory .env
//! 3. ~/.userctl/.env

use std::path::PathBuf;

/// Get the userctl config directory path (~/.userctl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".userctl"))
}

/// Load `.env` files without overriding variables that are already set.
///
/// Runs before tracing is initialized; returns the files that were read.
pub fn load_dotenv() -> Vec<PathBuf> {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        // dotenvy doesn't overwrite existing vars
        if env_file.exists() && dotenvy::from_path(&env_file).is_ok() {
            loaded_from.push(env_file);
        }
    }

    loaded_from
}
