//! USD prices per 1K tokens for known models.

use crate::types::TokenUsage;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPrice {
    const fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }

    pub fn cost(&self, usage: TokenUsage) -> f64 {
        (usage.input_tokens as f64 * self.input_per_1k
            + usage.output_tokens as f64 * self.output_per_1k)
            / 1000.0
    }
}

const PRICES: &[(&str, ModelPrice)] = &[
    ("gpt-4o", ModelPrice::new(0.0025, 0.01)),
    ("gpt-4o-mini", ModelPrice::new(0.00015, 0.0006)),
    ("gpt-4-turbo", ModelPrice::new(0.01, 0.03)),
    ("gpt-3.5-turbo", ModelPrice::new(0.0005, 0.0015)),
    ("o1", ModelPrice::new(0.015, 0.06)),
    ("claude-3-5-sonnet-20240620", ModelPrice::new(0.003, 0.015)),
    ("claude-3-5-haiku-20241022", ModelPrice::new(0.001, 0.005)),
    ("claude-3-opus-20240229", ModelPrice::new(0.015, 0.075)),
    ("claude-sonnet-4-20250514", ModelPrice::new(0.003, 0.015)),
    ("gemini-2.0-flash", ModelPrice::new(0.0, 0.0)),
    ("gemini-2.0-flash-lite", ModelPrice::new(0.0, 0.0)),
    ("gemini-1.5-pro", ModelPrice::new(0.00125, 0.005)),
    ("gemini-2.5-pro-preview-05-06", ModelPrice::new(0.00125, 0.01)),
];

/// Unknown models are priced at zero.
pub fn price_for(model: &str) -> ModelPrice {
    PRICES
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, price)| *price)
        .unwrap_or_default()
}

pub fn estimate_cost(model: &str, usage: TokenUsage) -> f64 {
    price_for(model).cost(usage)
}
