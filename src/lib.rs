//! Text-to-image front-end with ordered model fallback.
//!
//! A prompt is validated, enhanced and sent to each configured inference
//! endpoint in turn. Each endpoint gets its own retry budget with
//! status-specific backoff; the first payload that decodes as a large enough
//! image is written to the images directory and returned as a locator.

pub mod config;
pub mod error;
pub mod inference;
pub mod logger;
pub mod models;
pub mod prompt;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;
pub mod validation;

pub use config::{AppConfig, GenerationParameters, ModelDescriptor, RetryPolicy, ValidationLimits};
pub use error::{GenError, Result};
pub use inference::{EndpointProber, FallbackOrchestrator, InferenceClient, ModelInvoker};
pub use models::*;
pub use storage::{ImageStorage, LocalImageStore, NamingContext, StoredImage};
pub use validation::{ImageInfo, ImageRejection, ImageValidator, ValidatedImage};
