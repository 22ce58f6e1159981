//! Token cost estimation from the `model_pricing` table

use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::constants::storage::DEFAULT_PRICING_MODEL;
use crate::storage::{ModelPricing, Store};

#[derive(Clone)]
pub struct CostCalculator {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl CostCalculator {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Pricing in effect today for the model, falling back to the `default` row
    pub fn pricing_for(&self, model_name: &str) -> Option<ModelPricing> {
        let today = self.clock.today();
        let lookup = |name: &str| match self.store.pricing_for(name, today) {
            Ok(pricing) => pricing,
            Err(error) => {
                warn!(%error, model = name, "pricing lookup failed");
                None
            }
        };

        let pricing = lookup(model_name).or_else(|| lookup(DEFAULT_PRICING_MODEL));
        if pricing.is_none() {
            warn!(model = model_name, "no pricing found");
        }
        pricing
    }

    /// USD cost of a call, `None` without pricing
    pub fn calculate_cost(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        model_name: &str,
    ) -> Option<f64> {
        let pricing = self.pricing_for(model_name)?;
        let input_cost = (input_tokens as f64 / 1000.0) * pricing.input_cost_per_1k_tokens;
        let output_cost = (output_tokens as f64 / 1000.0) * pricing.output_cost_per_1k_tokens;
        let total = input_cost + output_cost;
        debug!(
            input_tokens,
            output_tokens,
            model = model_name,
            cost = total,
            "calculated call cost"
        );
        Some(total)
    }
}

/// Rough token count: four characters per token, at least one for non-empty text
pub fn estimate_tokens_from_text(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    (text.chars().count() as u64 / 4).max(1)
}

/// Parameters recorded alongside a conversation turn
pub fn llm_params(
    model_name: &str,
    temperature: f32,
    max_tokens: u32,
    extra: Map<String, Value>,
) -> Value {
    let mut params = Map::new();
    params.insert("model_name".to_string(), json!(model_name));
    params.insert("temperature".to_string(), json!(temperature));
    params.insert("max_tokens".to_string(), json!(max_tokens));
    params.extend(extra);
    Value::Object(params)
}
