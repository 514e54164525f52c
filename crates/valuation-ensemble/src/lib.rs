//! Ensemble/Rule Engine
//!
//! Blends independent model estimates into one enterprise value using
//! an explicit weighting rule, never learned weights. The baseline rule
//! allocates blend weight proportional to model confidence; alternate
//! rules plug in behind [`BlendStrategy`] without changing the
//! contract: weights are non-negative, sum to one, and a confidence-0
//! model contributes nothing.

use deal_core::{EnsembleResult, ModelEstimate, Result, ValuationError, WeightedEstimate};
use statrs::statistics::Statistics;
use tracing::{debug, info};

/// Disagreement penalty per unit coefficient of variation
pub const DISAGREEMENT_PENALTY_SCALE: f64 = 0.5;
/// Penalty ceiling so disagreement alone cannot zero the confidence
pub const DISAGREEMENT_PENALTY_CAP: f64 = 0.35;
/// Overall confidence never reported below this
pub const CONFIDENCE_FLOOR: f64 = 0.05;

/// A rule for turning model confidences into blend weights
pub trait BlendStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Blend weights for `estimates`; must be non-negative and sum to 1
    fn weights(&self, estimates: &[ModelEstimate]) -> Vec<f64>;
}

/// Baseline rule: weight_i = confidence_i / sum(confidences), falling
/// back to equal weights when every model reports zero confidence
#[derive(Debug, Default)]
pub struct ProportionalConfidence;

impl BlendStrategy for ProportionalConfidence {
    fn name(&self) -> &'static str {
        "proportional-confidence"
    }

    fn weights(&self, estimates: &[ModelEstimate]) -> Vec<f64> {
        let total: f64 = estimates.iter().map(|e| e.confidence).sum();
        if total > 0.0 {
            estimates.iter().map(|e| e.confidence / total).collect()
        } else {
            let equal = 1.0 / estimates.len() as f64;
            vec![equal; estimates.len()]
        }
    }
}

/// Blend `estimates` with the baseline proportional-confidence rule
pub fn combine(estimates: Vec<ModelEstimate>) -> Result<EnsembleResult> {
    combine_with(&ProportionalConfidence, estimates)
}

/// Blend `estimates` under `strategy`.
///
/// Final enterprise value is the weighted average of point estimates;
/// overall confidence is the weighted average of model confidences less
/// a disagreement penalty proportional to the coefficient of variation
/// across the point estimates, floored at [`CONFIDENCE_FLOOR`]. An
/// empty estimate set is `NoViableValuation`.
pub fn combine_with(
    strategy: &dyn BlendStrategy,
    estimates: Vec<ModelEstimate>,
) -> Result<EnsembleResult> {
    if estimates.is_empty() {
        return Err(ValuationError::NoViableValuation(
            "No model produced an estimate".to_string(),
        ));
    }

    let weights = strategy.weights(&estimates);
    debug_assert_eq!(weights.len(), estimates.len());

    let enterprise_value: f64 = estimates
        .iter()
        .zip(&weights)
        .map(|(e, w)| e.enterprise_value * w)
        .sum();
    let weighted_confidence: f64 = estimates
        .iter()
        .zip(&weights)
        .map(|(e, w)| e.confidence * w)
        .sum();

    let penalty = disagreement_penalty(&estimates);
    let confidence = (weighted_confidence - penalty).max(CONFIDENCE_FLOOR);
    if penalty > 0.0 {
        debug!(penalty, "Models disagree; confidence reduced");
    }
    info!(
        strategy = strategy.name(),
        models = estimates.len(),
        enterprise_value,
        confidence,
        "Blended model estimates"
    );

    Ok(EnsembleResult {
        enterprise_value,
        confidence,
        components: estimates
            .into_iter()
            .zip(weights)
            .map(|(estimate, weight)| WeightedEstimate { estimate, weight })
            .collect(),
    })
}

/// Penalty proportional to the coefficient of variation across point
/// estimates, capped at [`DISAGREEMENT_PENALTY_CAP`]. Zero for a single
/// model or a non-positive mean (no meaningful dispersion measure).
fn disagreement_penalty(estimates: &[ModelEstimate]) -> f64 {
    if estimates.len() < 2 {
        return 0.0;
    }
    let points: Vec<f64> = estimates.iter().map(|e| e.enterprise_value).collect();
    let mean = points.iter().copied().mean();
    if mean <= 0.0 {
        return 0.0;
    }
    let cov = points.iter().copied().population_std_dev() / mean;
    (DISAGREEMENT_PENALTY_SCALE * cov).min(DISAGREEMENT_PENALTY_CAP)
}
