//! Whole-file replacement through a sibling temp file and a rename

use std::path::{Path, PathBuf};

use super::persistence_error::{PersistenceError, PersistenceResult};

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents`.
///
/// Readers observe either the previous file or the complete new one, never a
/// partial write. Parent directories are created on demand.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> PersistenceResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PersistenceError::io(parent, e))?;
    }

    let temp_path = temp_path_for(path);

    let result = async {
        tokio::fs::write(&temp_path, contents)
            .await
            .map_err(|e| PersistenceError::io(&temp_path, e))?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| PersistenceError::io(path, e))
    }
    .await;

    if result.is_err() && temp_path.exists() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }

    result
}

/// Serialize `value` as pretty JSON and write it atomically
pub async fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> PersistenceResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| PersistenceError::json(path, e))?;
    write_atomic(path, &bytes).await
}
