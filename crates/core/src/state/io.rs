//! # IO Utilities
//!
//! File system operations for the `.marketmind` runtime directory, which holds
//! the database, the `.env` key file and persisted settings.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Get the runtime directory path (.marketmind)
pub fn get_runtime_path() -> PathBuf {
    if let Ok(path) = std::env::var("MARKETMIND_RUNTIME_PATH") {
        return PathBuf::from(path);
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".marketmind")
}

/// Read a file from the runtime directory, `None` if it does not exist
pub async fn read_runtime_file(relative_path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = get_runtime_path().join(relative_path.as_ref());
    match fs::read_to_string(&path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read file: {:?}", path)),
    }
}

/// Write a file to the runtime directory, creating parents as needed
pub async fn write_runtime_file(relative_path: impl AsRef<Path>, content: &str) -> Result<PathBuf> {
    let path = get_runtime_path().join(relative_path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write file: {:?}", path))?;
    Ok(path)
}
