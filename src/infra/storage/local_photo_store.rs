use crate::domain::ports::PhotoStore;
use crate::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{error, info};

/// Writes uploads to a local directory that the router serves statically.
pub struct LocalPhotoStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalPhotoStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: String) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        if file_name.contains('/') || file_name.contains('\\') || file_name.starts_with('.') {
            return Err(AppError::Validation("Invalid file name".into()));
        }

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            let msg = format!("Cannot create upload dir {}: {}", self.root.display(), e);
            error!("{}", msg);
            AppError::InternalWithMsg(msg)
        })?;

        let path = self.root.join(file_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            let msg = format!("Cannot write upload {}: {}", path.display(), e);
            error!("{}", msg);
            AppError::InternalWithMsg(msg)
        })?;

        info!(bytes = bytes.len(), file = %file_name, "Stored photo");
        Ok(format!("{}/{}", self.public_base_url, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_file_and_returns_public_url() {
        let dir = std::env::temp_dir().join(format!("photo-store-{}", uuid::Uuid::new_v4()));
        let store = LocalPhotoStore::new(&dir, "http://cdn.local/uploads/".into());

        let url = store.save("abc.png", b"png-bytes").await.unwrap();
        assert_eq!(url, "http://cdn.local/uploads/abc.png");
        assert_eq!(tokio::fs::read(dir.join("abc.png")).await.unwrap(), b"png-bytes");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let store = LocalPhotoStore::new(std::env::temp_dir(), "/uploads".into());
        assert!(matches!(store.save("../etc/passwd", b"x").await, Err(AppError::Validation(_))));
    }
}
