use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};
use uuid::Uuid;

/// A file part written to the upload temp dir. The file is removed when the
/// guard is dropped, whatever happened to the request in between.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    content_type: String,
}

impl TempUpload {
    pub async fn write(dir: &Path, bytes: &[u8], content_type: &str) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create upload dir {}", dir.display()))?;
        let path = dir.join(format!("{}.part", Uuid::new_v4()));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write temp upload {}", path.display()))?;
        debug!(path = %path.display(), size = bytes.len(), "temp upload written");
        Ok(Self {
            path,
            content_type: content_type.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "temp upload removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %self.path.display(), "failed to remove temp upload"),
        }
    }
}
