//! Static per-model token prices.
//!
//! Rates are USD per single token, split by modality and direction. The
//! table is immutable for the process lifetime; unknown model ids resolve to
//! [`DEFAULT_MODEL`] so cost tracking keeps working across server-side model
//! renames.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Model used when the session's model id has no table entry.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-live-001";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalityRates {
    pub text: f64,
    pub audio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input: ModalityRates,
    pub output: ModalityRates,
}

static PRICE_TABLE: Lazy<HashMap<&'static str, ModelPricing>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        "gemini-2.0-flash-live-001",
        ModelPricing {
            input: ModalityRates {
                text: 0.35e-6,
                audio: 2.10e-6,
            },
            output: ModalityRates {
                text: 1.50e-6,
                audio: 8.50e-6,
            },
        },
    );
    table.insert(
        "gemini-live-2.5-flash-preview",
        ModelPricing {
            input: ModalityRates {
                text: 0.50e-6,
                audio: 3.00e-6,
            },
            output: ModalityRates {
                text: 2.00e-6,
                audio: 12.00e-6,
            },
        },
    );
    table.insert(
        "gemini-2.5-flash-preview-native-audio-dialog",
        ModelPricing {
            input: ModalityRates {
                text: 0.50e-6,
                audio: 3.00e-6,
            },
            output: ModalityRates {
                text: 2.00e-6,
                audio: 12.00e-6,
            },
        },
    );
    table
});

/// Resolve a model id to its prices, falling back to [`DEFAULT_MODEL`].
pub fn pricing_for(model_id: &str) -> &'static ModelPricing {
    PRICE_TABLE
        .get(model_id)
        .unwrap_or_else(|| &PRICE_TABLE[DEFAULT_MODEL])
}
