use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use super::temp::TempUpload;
use crate::storage::StorageClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Avatars,
    CoverImages,
}

impl MediaFolder {
    fn prefix(self) -> &'static str {
        match self {
            MediaFolder::Avatars => "avatars",
            MediaFolder::CoverImages => "cover-images",
        }
    }
}

/// Uploads a spooled file and returns its public URL. The temp file is
/// consumed and deleted on success and on failure.
pub async fn upload_on_media_host(
    storage: &dyn StorageClient,
    file: TempUpload,
    folder: MediaFolder,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(file.content_type()).unwrap_or("bin");
    let key = format!("{}/{}.{}", folder.prefix(), Uuid::new_v4(), ext);

    let result = async {
        let body = tokio::fs::read(file.path())
            .await
            .with_context(|| format!("read temp upload {}", file.path().display()))?;
        storage
            .put_object(&key, Bytes::from(body), file.content_type())
            .await
            .with_context(|| format!("put_object {}", key))?;
        Ok::<_, anyhow::Error>(storage.public_url(&key))
    }
    .await;
    drop(file);

    match &result {
        Ok(url) => info!(%key, %url, "media uploaded"),
        Err(e) => warn!(error = ?e, %key, "media upload failed"),
    }
    result
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod media_tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn tmp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join("vidtube-media-tests")
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn upload_returns_url_and_removes_temp_file() {
        let storage = MemoryStorage::new();
        let file = TempUpload::write(&tmp_dir(), b"\x89PNG", "image/png")
            .await
            .unwrap();
        let path = file.path().to_path_buf();

        let url = upload_on_media_host(&storage, file, MediaFolder::Avatars)
            .await
            .unwrap();

        assert!(url.starts_with("https://media.local/avatars/"));
        assert!(url.ends_with(".png"));
        assert_eq!(storage.object_count(), 1);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_upload_still_removes_temp_file() {
        let storage = MemoryStorage::rejecting();
        let file = TempUpload::write(&tmp_dir(), b"data", "image/jpeg")
            .await
            .unwrap();
        let path = file.path().to_path_buf();

        let res = upload_on_media_host(&storage, file, MediaFolder::CoverImages).await;

        assert!(res.is_err());
        assert!(!path.exists());
    }
}
