use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::Config;

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Please upload an image file")]
    UnsupportedType,

    #[error("Image must be smaller than 5MB")]
    TooLarge,

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Profile photos on local disk, served back under `public_url`.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
    public_url: String,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.upload_dir, &config.upload_public_url)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the image as `{user_id}-{millis}.{ext}` and returns its public URL.
    pub async fn save(
        &self,
        user_id: Uuid,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        let ext = image_extension(content_type).ok_or(UploadError::UnsupportedType)?;
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(UploadError::TooLarge);
        }

        let file_name = format!(
            "{}-{}.{}",
            user_id,
            chrono::Utc::now().timestamp_millis(),
            ext
        );

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        tracing::info!(user_id = %user_id, file = %file_name, size = bytes.len(), "Profile photo stored");
        Ok(format!("{}/{}", self.public_url, file_name))
    }
}

pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> PhotoStore {
        let dir = std::env::temp_dir().join(format!("nosugar-uploads-{}", Uuid::new_v4()));
        PhotoStore::new(dir, "/uploads/")
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("IMAGE/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(image_extension("image/svg+xml"), None);
    }

    #[tokio::test]
    async fn test_save_names_file_after_user() {
        let store = temp_store();
        let user = Uuid::new_v4();

        let url = store.save(user, "image/png", b"\x89PNG").await.unwrap();
        let prefix = format!("/uploads/{}-", user);
        assert!(url.starts_with(&prefix), "{url}");
        assert!(url.ends_with(".png"));

        let file_name = url.trim_start_matches("/uploads/");
        assert!(store.dir().join(file_name).exists());
        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[tokio::test]
    async fn test_rejects_non_images_and_oversize() {
        let store = temp_store();
        let user = Uuid::new_v4();

        assert!(matches!(
            store.save(user, "text/plain", b"hi").await,
            Err(UploadError::UnsupportedType)
        ));

        let big = vec![0u8; MAX_PHOTO_BYTES + 1];
        assert!(matches!(
            store.save(user, "image/jpeg", &big).await,
            Err(UploadError::TooLarge)
        ));
    }
}
