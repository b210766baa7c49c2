use crate::config::ValidationLimits;
use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ImageRejection {
    #[error("payload too small to be an image ({size} bytes, minimum {min})")]
    TooSmall { size: usize, min: usize },
    #[error("payload could not be decoded as an image: {0}")]
    Undecodable(String),
    #[error("image is {width}x{height}, minimum is {min}x{min}")]
    Undersized { width: u32, height: u32, min: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub byte_size: usize,
    pub format: Option<ImageFormat>,
}

/// A payload that passed validation, kept together with its decoded form.
pub struct ValidatedImage {
    pub bytes: Vec<u8>,
    pub decoded: DynamicImage,
    pub info: ImageInfo,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageValidator {
    limits: ValidationLimits,
}

impl ImageValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn validate(&self, bytes: Vec<u8>) -> Result<ValidatedImage, ImageRejection> {
        if bytes.len() < self.limits.min_bytes {
            return Err(ImageRejection::TooSmall {
                size: bytes.len(),
                min: self.limits.min_bytes,
            });
        }

        let format = image::guess_format(&bytes).ok();
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| ImageRejection::Undecodable(e.to_string()))?;

        let (width, height) = decoded.dimensions();
        let min = self.limits.min_dimension;
        if width < min || height < min {
            return Err(ImageRejection::Undersized { width, height, min });
        }

        let info = ImageInfo {
            width,
            height,
            byte_size: bytes.len(),
            format,
        };
        Ok(ValidatedImage {
            bytes,
            decoded,
            info,
        })
    }
}
