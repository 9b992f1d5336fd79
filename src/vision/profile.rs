// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model variant profiles
//!
//! A profile pins the resolution, pixel scaling, channel order and label
//! table a model was released with. The 150x150 models take raw 0-255
//! pixels while the 224x224 model takes values scaled to [0, 1].

use std::fmt;

use thiserror::Error;

use super::labels::{LabelTable, DERMNET_21, SKINLENS_V1, SKINLENS_V2};

/// How pixel values are presented to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelScaling {
    /// Raw 0..=255 values as f32
    Raw,
    /// Values divided by 255.0
    UnitInterval,
}

/// Channel order of the last tensor axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    /// Models trained on OpenCV-decoded images
    Bgr,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("unknown model profile '{name}', available: {available:?}")]
    UnknownProfile {
        name: String,
        available: Vec<&'static str>,
    },
}

/// Configuration tuple for one released model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    pub name: &'static str,
    /// Square input side length in pixels
    pub input_size: u32,
    pub pixel_scaling: PixelScaling,
    pub channel_order: ChannelOrder,
    pub labels: LabelTable,
}

pub const SKINLENS_V1_PROFILE: ModelProfile = ModelProfile {
    name: "skinlens-v1",
    input_size: 150,
    pixel_scaling: PixelScaling::Raw,
    channel_order: ChannelOrder::Bgr,
    labels: SKINLENS_V1,
};

pub const SKINLENS_V2_PROFILE: ModelProfile = ModelProfile {
    name: "skinlens-v2",
    input_size: 150,
    pixel_scaling: PixelScaling::Raw,
    channel_order: ChannelOrder::Rgb,
    labels: SKINLENS_V2,
};

pub const DERMNET_21_PROFILE: ModelProfile = ModelProfile {
    name: "dermnet-21",
    input_size: 224,
    pixel_scaling: PixelScaling::UnitInterval,
    channel_order: ChannelOrder::Rgb,
    labels: DERMNET_21,
};

/// All built-in profiles
pub const PROFILES: &[ModelProfile] = &[
    SKINLENS_V1_PROFILE,
    SKINLENS_V2_PROFILE,
    DERMNET_21_PROFILE,
];

impl ModelProfile {
    /// Look up a built-in profile by name (case-insensitive)
    pub fn from_name(name: &str) -> Result<&'static ModelProfile, ProfileError> {
        PROFILES
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ProfileError::UnknownProfile {
                name: name.to_string(),
                available: PROFILES.iter().map(|p| p.name).collect(),
            })
    }

    /// Expected NHWC input shape: [1, size, size, 3]
    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.input_size as usize;
        [1, side, side, 3]
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }
}

impl fmt::Display for ModelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}x{}, {:?}, {:?}, {} classes)",
            self.name,
            self.input_size,
            self.input_size,
            self.pixel_scaling,
            self.channel_order,
            self.num_classes()
        )
    }
}
