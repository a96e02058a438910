use super::StepFailure;
use crate::engine::context::ExecutionContext;
use serde::Deserialize;
use serde_json::{Value, json};

/// Buckets a numeric lead field into tier/priority categories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformConfig {
    /// Field of the lead data holding the numeric score.
    pub score_field: String,
    pub hot_threshold: f64,
    pub warm_threshold: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            score_field: "score".to_string(),
            hot_threshold: 70.0,
            warm_threshold: 40.0,
        }
    }
}

/// Pure transform: derives categorical fields from the current lead data and
/// merges them over it. No I/O, no clock — the same input always produces
/// the same output.
pub fn run(config: &TransformConfig, ctx: &mut ExecutionContext) -> Result<Value, StepFailure> {
    if config.hot_threshold < config.warm_threshold {
        return Err(StepFailure::InvalidConfig(format!(
            "hotThreshold ({}) must not be below warmThreshold ({})",
            config.hot_threshold, config.warm_threshold
        )));
    }

    let score = ctx
        .get_variable(&config.score_field)
        .and_then(|v| v.as_f64());

    let (tier, priority) = match score {
        Some(s) if s >= config.hot_threshold => ("hot", "high"),
        Some(s) if s >= config.warm_threshold => ("warm", "normal"),
        Some(_) => ("cold", "low"),
        None => ("unscored", "low"),
    };

    let derived = json!({
        "leadTier": tier,
        "priority": priority,
    });
    ctx.merge_variables(&derived);

    Ok(json!({
        "success": true,
        "data": ctx.current_data(),
        "derived": derived,
    }))
}
