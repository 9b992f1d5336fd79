// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Label tables and arg-max decoding of classifier output

/// Label returned for a class index outside the table
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Fixed mapping from class index to condition name
///
/// Each table is paired with exactly one trained model and must not be
/// reused for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTable {
    name: &'static str,
    labels: &'static [&'static str],
}

impl LabelTable {
    pub const fn new(name: &'static str, labels: &'static [&'static str]) -> Self {
        Self { name, labels }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of classes the paired model predicts
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Look up a class name, falling back to [`UNKNOWN_LABEL`]
    pub fn label(&self, index: usize) -> &'static str {
        self.labels.get(index).copied().unwrap_or(UNKNOWN_LABEL)
    }

    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }
}

/// Table for the first 150x150 upload model
pub const SKINLENS_V1: LabelTable = LabelTable::new(
    "skinlens-v1",
    &[
        "Actinic Keratosis",
        "Dermatofibroma",
        "Melanoma",
        "Seborrheic Keratosis",
        "Squamous Cell Carcinoma",
        "Acne and Rosacea",
        "Eczema",
        "Tinea (Ringworm)",
    ],
);

/// ISIC-style lesion table for the second 150x150 model
///
/// Placeholder order: it must be replaced with the class order of the
/// exported model before that model is served.
pub const SKINLENS_V2: LabelTable = LabelTable::new(
    "skinlens-v2",
    &[
        "Actinic Keratosis",
        "Basal Cell Carcinoma",
        "Benign Keratosis",
        "Dermatofibroma",
        "Melanoma",
        "Melanocytic Nevus",
        "Squamous Cell Carcinoma",
        "Vascular Lesion",
    ],
);

/// 21-class table for the 224x224 model
///
/// Placeholder order apart from index 10 (Melanoma): it must match the class
/// order of the exported model before that model is served.
pub const DERMNET_21: LabelTable = LabelTable::new(
    "dermnet-21",
    &[
        "Acne and Rosacea",
        "Actinic Keratosis and Basal Cell Carcinoma",
        "Atopic Dermatitis",
        "Bullous Disease",
        "Cellulitis and Impetigo",
        "Eczema",
        "Exanthems and Drug Eruptions",
        "Hair Loss and Alopecia",
        "Herpes, HPV and other STDs",
        "Pigmentation Disorders",
        "Melanoma",
        "Nail Fungus",
        "Contact Dermatitis",
        "Psoriasis and Lichen Planus",
        "Scabies and Infestations",
        "Seborrheic Keratoses and Benign Tumors",
        "Systemic Disease",
        "Tinea and Candidiasis",
        "Urticaria (Hives)",
        "Vascular Tumors",
        "Vasculitis",
    ],
);

/// Index of the highest probability
///
/// Ties resolve to the lowest index and NaN entries never win.
/// Returns `None` for an empty or all-NaN vector.
pub fn argmax(probabilities: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;

    for (index, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((index, p)),
        }
    }

    best.map(|(index, _)| index)
}
