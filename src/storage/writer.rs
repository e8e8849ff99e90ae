//! Mapping file writer

use std::path::Path;

use tracing::debug;

use crate::Result;

/// Write `content` to `path`, creating parent directories as needed
///
/// Any existing file at `path` is replaced.
///
/// # Errors
///
/// Returns error if a directory cannot be created or the write fails
pub async fn save(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(path, content.as_bytes()).await?;
    debug!("Saved mapping {}", path.display());

    Ok(())
}
