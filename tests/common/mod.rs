#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rimgen::inference::RecordingSleeper;
use rimgen::{AppConfig, InferenceClient, LocalImageStore, ModelDescriptor};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

pub const TOKEN: &str = "hf_test_token";

/// PNG filled with noise so it stays well above the minimum byte size.
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let img = RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode test png");
    out.into_inner()
}

pub fn model_path(name: &str) -> String {
    format!("/models/{}", name)
}

pub fn model(server: &MockServer, name: &str) -> ModelDescriptor {
    ModelDescriptor::new(name, format!("{}{}", server.uri(), model_path(name)))
        .with_timeout(Duration::from_secs(5))
        .with_max_retries(3)
}

pub struct Harness {
    pub client: InferenceClient,
    pub sleeper: Arc<RecordingSleeper>,
    pub dir: TempDir,
}

pub fn config(models: Vec<ModelDescriptor>) -> AppConfig {
    AppConfig::new().with_api_token(TOKEN).with_models(models)
}

pub fn harness(models: Vec<ModelDescriptor>) -> Harness {
    harness_with(config(models))
}

pub fn harness_with(config: AppConfig) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config.with_images_dir(dir.path());
    let storage = Arc::new(LocalImageStore::new(
        config.images_dir.clone(),
        config.public_prefix.clone(),
    ));
    let sleeper = Arc::new(RecordingSleeper::new());
    let client = InferenceClient::with_components(config, storage, sleeper.clone())
        .expect("valid test config");
    Harness {
        client,
        sleeper,
        dir,
    }
}
