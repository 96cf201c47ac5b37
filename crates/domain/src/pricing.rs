//! A minimal per-model USD price table backing the executor's token
//! accounting (spec §4.5's "cumulative prompt/completion/cost"). This is
//! deliberately small and internal — distinct from the model-catalog
//! registry table (an external collaborator, stubbed at the HTTP layer in
//! `lop-gateway::api::stub`), which is a CRUD surface over a much larger,
//! operator-managed catalog.

/// USD cost per 1k tokens, prompt and completion priced separately.
#[derive(Debug, Clone, Copy)]
pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Applied when a model isn't in the table below.
const DEFAULT_PRICE: ModelPrice = ModelPrice {
    input_per_1k: 0.003,
    output_per_1k: 0.015,
};

fn known_price(model: &str) -> Option<ModelPrice> {
    match model {
        "claude-3-5-sonnet" | "claude-3-5-sonnet-latest" => Some(ModelPrice {
            input_per_1k: 0.003,
            output_per_1k: 0.015,
        }),
        "claude-3-5-haiku" | "claude-3-5-haiku-latest" => Some(ModelPrice {
            input_per_1k: 0.0008,
            output_per_1k: 0.004,
        }),
        "claude-3-opus" | "claude-3-opus-latest" => Some(ModelPrice {
            input_per_1k: 0.015,
            output_per_1k: 0.075,
        }),
        _ => None,
    }
}

/// The price to use for `model`, falling back to [`DEFAULT_PRICE`] for
/// anything not listed above.
pub fn price_for_model(model: &str) -> ModelPrice {
    known_price(model).unwrap_or(DEFAULT_PRICE)
}

/// Estimate the USD cost of one completion given its token usage.
pub fn estimate_cost_usd(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let price = price_for_model(model);
    (prompt_tokens as f64 / 1000.0) * price.input_per_1k
        + (completion_tokens as f64 / 1000.0) * price.output_per_1k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_uses_its_own_rate() {
        let cost = estimate_cost_usd("claude-3-5-haiku", 1000, 1000);
        assert!((cost - (0.0008 + 0.004)).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_falls_back_to_default_price() {
        let cost = estimate_cost_usd("some-unlisted-model", 1000, 1000);
        assert!((cost - (0.003 + 0.015)).abs() < 1e-9);
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(estimate_cost_usd("claude-3-5-sonnet", 0, 0), 0.0);
    }
}
