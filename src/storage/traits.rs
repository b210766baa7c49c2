use crate::{error::Result, validation::ValidatedImage};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn store(&self, image: &ValidatedImage, naming: &NamingContext) -> Result<StoredImage>;

    /// Bytes of a previously stored file, `None` if it does not exist.
    async fn load(&self, file_name: &str) -> Result<Option<Vec<u8>>>;

    async fn health_check(&self) -> Result<bool>;
}

/// What a stored file is named after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingContext {
    Model(String),
    Generic,
}

impl NamingContext {
    pub fn model(name: impl Into<String>) -> Self {
        NamingContext::Model(name.into())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub file_name: String,
    pub path: PathBuf,
    pub locator: String,
    pub byte_size: u64,
}
