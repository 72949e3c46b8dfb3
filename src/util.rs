//! Small filesystem helpers shared by daemon implementations

use std::path::Path;

use crate::error::Error;
use crate::Result;

/// Write a file, creating its parent directories first
pub async fn write_file_with_dir(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent.display().to_string(), e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::io(path.display().to_string(), e))
}
