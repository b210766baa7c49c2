use crate::{
    error::{GenError, Result},
    storage::traits::{ImageStorage, NamingContext, StoredImage},
    validation::ValidatedImage,
};
use async_trait::async_trait;
use chrono::Utc;
use image::ImageFormat;
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const GENERIC_PREFIX: &str = "generated";

/// Writes PNG files into a flat directory served under `public_prefix`.
pub struct LocalImageStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locator_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name)
    }

    fn encode_png(image: &ValidatedImage) -> Result<Vec<u8>> {
        if image.info.format == Some(ImageFormat::Png) {
            return Ok(image.bytes.clone());
        }
        let mut out = Cursor::new(Vec::with_capacity(image.bytes.len()));
        image
            .decoded
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| GenError::StorageError(format!("PNG encoding failed: {}", e)))?;
        Ok(out.into_inner())
    }
}

#[async_trait]
impl ImageStorage for LocalImageStore {
    async fn store(&self, image: &ValidatedImage, naming: &NamingContext) -> Result<StoredImage> {
        let png = Self::encode_png(image)?;

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            GenError::StorageError(format!(
                "Cannot create image directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let file_name = unique_file_name(naming);
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, &png).await.map_err(|e| {
            GenError::StorageError(format!("Cannot write {}: {}", path.display(), e))
        })?;

        log::info!("💾 Image saved to {}", path.display());

        Ok(StoredImage {
            locator: self.locator_for(&file_name),
            file_name,
            path,
            byte_size: png.len() as u64,
        })
    }

    async fn load(&self, file_name: &str) -> Result<Option<Vec<u8>>> {
        if !is_safe_file_name(file_name) {
            log::warn!("Rejected image lookup for unsafe name: {:?}", file_name);
            return Ok(None);
        }
        match tokio::fs::read(self.root.join(file_name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GenError::StorageError(e.to_string())),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| GenError::StorageError(e.to_string()))?;
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| GenError::StorageError(e.to_string()))?;
        Ok(metadata.is_dir() && !metadata.permissions().readonly())
    }
}

/// `<slug>_<UTC millis timestamp>_<8 hex>.png`
pub fn unique_file_name(naming: &NamingContext) -> String {
    let prefix = match naming {
        NamingContext::Model(name) => slugify(name),
        NamingContext::Generic => GENERIC_PREFIX.to_string(),
    };
    let stamp = Utc::now().format("%Y%m%d_%H%M%S%3f");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}.png", prefix, stamp, &suffix[..8])
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        GENERIC_PREFIX.to_string()
    } else {
        slug.to_string()
    }
}

pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_model_names() {
        assert_eq!(
            slugify("stabilityai/stable-diffusion-xl-base-1.0"),
            "stabilityai_stable-diffusion-xl-base-1_0"
        );
        assert_eq!(slugify("///"), "generated");
    }

    #[test]
    fn test_unique_file_names_differ() {
        let naming = NamingContext::model("org/model");
        let a = unique_file_name(&naming);
        let b = unique_file_name(&naming);
        assert_ne!(a, b);
        assert!(a.starts_with("org_model_"));
        assert!(a.ends_with(".png"));
        assert!(unique_file_name(&NamingContext::Generic).starts_with("generated_"));
    }

    #[test]
    fn test_safe_file_names() {
        assert!(is_safe_file_name("org_model_20240101_120000123_abcd1234.png"));
        assert!(!is_safe_file_name("../secret"));
        assert!(!is_safe_file_name("a/b.png"));
        assert!(!is_safe_file_name(".hidden"));
        assert!(!is_safe_file_name(""));
    }

    #[tokio::test]
    async fn test_load_missing_and_unsafe() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/static/images/");
        assert_eq!(store.locator_for("x.png"), "/static/images/x.png");
        assert!(store.load("missing.png").await.unwrap().is_none());
        assert!(store.load("../etc/passwd").await.unwrap().is_none());
        assert!(store.health_check().await.unwrap());
    }
}
