//! Cost estimates and prompt-cache efficiency from per-model token totals.

use std::collections::BTreeMap;

use crate::format::round_to;
use crate::models::{CacheMetrics, CostEstimate, DailyCost, DailyModelTokens, ModelUsage};

const PER_MILLION: f64 = 1_000_000.0;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
    pub cache_read: f64,
    pub cache_write: f64,
}

const SONNET: ModelPricing = ModelPricing {
    input: 3.0,
    output: 15.0,
    cache_read: 0.3,
    cache_write: 3.75,
};

const OPUS: ModelPricing = ModelPricing {
    input: 15.0,
    output: 75.0,
    cache_read: 1.5,
    cache_write: 18.75,
};

const HAIKU: ModelPricing = ModelPricing {
    input: 0.25,
    output: 1.25,
    cache_read: 0.03,
    cache_write: 0.30,
};

/// Pricing tier by model family; unrecognized models price as sonnet.
pub fn model_pricing(model: &str) -> ModelPricing {
    let m = model.to_lowercase();
    if m.contains("opus") {
        OPUS
    } else if m.contains("haiku") {
        HAIKU
    } else {
        SONNET
    }
}

fn per_million(tokens: u64, price: f64) -> f64 {
    tokens as f64 / PER_MILLION * price
}

pub fn model_cost(usage: &ModelUsage) -> f64 {
    let p = model_pricing(&usage.model);
    per_million(usage.input_tokens, p.input)
        + per_million(usage.output_tokens, p.output)
        + per_million(usage.cache_read_tokens, p.cache_read)
        + per_million(usage.cache_creation_tokens, p.cache_write)
}

/// What the cache-read tokens would have cost at the full input price.
pub fn cache_savings(usage: &ModelUsage) -> f64 {
    let p = model_pricing(&usage.model);
    per_million(usage.cache_read_tokens, p.input - p.cache_read)
}

/// Daily totals carry no input/output split, so every token is priced at the
/// output rate. This is an upper bound, not an estimate.
pub fn daily_costs(daily: &[DailyModelTokens]) -> Vec<DailyCost> {
    daily
        .iter()
        .map(|day| {
            let mut cost = 0.0;
            let mut cost_by_model = BTreeMap::new();
            for (model, tokens) in &day.tokens_by_model {
                let model_cost = per_million(*tokens, model_pricing(model).output);
                cost += model_cost;
                cost_by_model.insert(model.clone(), round_to(model_cost, 4));
            }
            DailyCost {
                date: day.date.clone(),
                cost: round_to(cost, 4),
                cost_by_model,
            }
        })
        .collect()
}

/// `None` when there is neither model usage nor daily token data.
pub fn estimate_cost(
    model_usage: &[ModelUsage],
    daily: &[DailyModelTokens],
) -> Option<CostEstimate> {
    if model_usage.is_empty() && daily.is_empty() {
        return None;
    }

    let mut total = 0.0;
    let mut savings = 0.0;
    let mut cost_by_model = BTreeMap::new();
    for usage in model_usage {
        let cost = model_cost(usage);
        total += cost;
        savings += cache_savings(usage);
        *cost_by_model.entry(usage.model.clone()).or_insert(0.0) += cost;
    }

    Some(CostEstimate {
        total_cost_usd: round_to(total, 2),
        cost_by_model: cost_by_model
            .into_iter()
            .map(|(model, cost)| (model, round_to(cost, 2)))
            .collect(),
        cost_by_day: daily_costs(daily),
        cache_savings_usd: round_to(savings, 2),
    })
}

/// `None` when there is no model usage.
pub fn cache_metrics(model_usage: &[ModelUsage]) -> Option<CacheMetrics> {
    if model_usage.is_empty() {
        return None;
    }

    let read: u64 = model_usage.iter().map(|u| u.cache_read_tokens).sum();
    let write: u64 = model_usage.iter().map(|u| u.cache_creation_tokens).sum();
    let ops = read + write;
    let ratio = if ops > 0 {
        read as f64 / ops as f64
    } else {
        0.0
    };

    Some(CacheMetrics {
        total_cache_read_tokens: read,
        total_cache_write_tokens: write,
        cache_hit_ratio: round_to(ratio, 4),
        tokens_saved: read,
    })
}
