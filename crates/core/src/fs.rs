//! Filesystem utilities

use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};

/// Create a directory and all parent directories if they don't exist
pub fn create_dir_all(path: &str) -> std::io::Result<()> {
    let path = Path::new(path);
    if !path.exists() {
        fs::create_dir_all(path)?;
        info!("Created directory: {}", path.display());
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary
///
/// Returns true if the directory exists (either already existed or was created).
pub fn ensure_dir_exists(path: &str) -> bool {
    let path = Path::new(path);

    if path.is_dir() {
        return true;
    }

    match fs::create_dir_all(path) {
        Ok(_) => {
            info!("Created directory: {}", path.display());
            true
        }
        Err(e) => {
            error!("Failed to create directory {}: {}", path.display(), e);
            false
        }
    }
}

/// Directory holding one day's observation files: `<root>/<YYYY-MM-DD>`
pub fn dated_dir(root: &str, date: impl std::fmt::Display) -> PathBuf {
    Path::new(root).join(date.to_string())
}
