// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing into the classifier input tensor

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

use super::profile::{ChannelOrder, ModelProfile, PixelScaling};

/// Convert any decoded image to 3-channel 8-bit RGB
///
/// Grayscale is replicated across channels; alpha is dropped, not
/// composited. 16-bit and float images are quantised to 8 bits.
pub fn to_three_channels(image: &DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        other => other.to_rgb8(),
    }
}

/// Resize to exactly `size` x `size` with bilinear filtering
///
/// Aspect ratio is not preserved, matching how the models were trained.
pub fn resize_exact(image: &RgbImage, size: u32) -> RgbImage {
    if image.dimensions() == (size, size) {
        return image.clone();
    }
    imageops::resize(image, size, size, FilterType::Triangle)
}

/// Convert a resized RGB image to an NHWC tensor [1, H, W, 3]
///
/// Channel order and pixel scaling follow the profile.
pub fn to_input_tensor(image: &RgbImage, profile: &ModelProfile) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::zeros((1, height as usize, width as usize, 3));

    let scale = match profile.pixel_scaling {
        PixelScaling::Raw => 1.0,
        PixelScaling::UnitInterval => 1.0 / 255.0,
    };

    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            let src = match profile.channel_order {
                ChannelOrder::Rgb => c,
                ChannelOrder::Bgr => 2 - c,
            };
            tensor[[0, y as usize, x as usize, c]] = pixel[src] as f32 * scale;
        }
    }

    tensor
}

/// Full preprocessing: channels -> resize -> tensor
pub fn preprocess(image: &DynamicImage, profile: &ModelProfile) -> Array4<f32> {
    let rgb = to_three_channels(image);
    let resized = resize_exact(&rgb, profile.input_size);
    to_input_tensor(&resized, profile)
}
