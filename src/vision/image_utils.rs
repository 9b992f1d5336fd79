// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turning uploaded or fetched bytes into a decoded image
//!
//! Bytes are size-checked, sniffed against the accepted format list and
//! decoded under pixel-dimension limits. Channel normalization happens
//! later, in preprocessing.

use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use std::io::Cursor;
use thiserror::Error;

/// Maximum accepted image payload (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Largest width or height the decoder will allocate for
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;

/// Encodings accepted from clients
pub const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Metadata of a decoded image
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Encoded payload length
    pub size_bytes: usize,
}

impl ImageInfo {
    fn describe(image: &DynamicImage, format: ImageFormat, size_bytes: usize) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            format,
            size_bytes,
        }
    }
}

/// Identify the encoding of `bytes`, restricted to [`ACCEPTED_FORMATS`]
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    match image::guess_format(bytes) {
        Ok(format) if ACCEPTED_FORMATS.contains(&format) => Ok(format),
        _ => Err(ImageError::UnsupportedFormat),
    }
}

fn decoder_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits
}

/// Decode one encoded image
///
/// Empty payloads, payloads over [`MAX_IMAGE_SIZE`], unknown encodings and
/// corrupt or oversized images are all errors.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    match bytes.len() {
        0 => return Err(ImageError::EmptyData),
        len if len > MAX_IMAGE_SIZE => return Err(ImageError::TooLarge(len, MAX_IMAGE_SIZE)),
        _ => {}
    }

    let format = sniff_format(bytes)?;

    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(decoder_limits());
    let image = reader
        .decode()
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo::describe(&image, format, bytes.len());
    Ok((image, info))
}
