//! Discounted Cash Flow Valuation
//!
//! Projects free cash flow along a per-year growth path, discounts at
//! WACC, and closes with a Gordon-growth terminal value. Pure math over
//! an immutable profile snapshot; every run with the same inputs
//! produces an identical estimate.

use deal_core::{
    CompanyProfile, FcfObservation, ModelEstimate, Result, ValuationAssumptions,
    ValuationContext, ValuationError, ValuationModel,
};
use serde_json::json;

pub const MODEL_NAME: &str = "DCF";

/// Years of FCF history at which the completeness input saturates
pub const COMPLETENESS_YEARS: f64 = 5.0;
const COMPLETENESS_WEIGHT: f64 = 0.6;
const PLAUSIBILITY_WEIGHT: f64 = 0.4;
/// Plausibility used when no historical growth is available
const NEUTRAL_PLAUSIBILITY: f64 = 0.5;

/// Data completeness input to DCF confidence: distinct fiscal years of
/// FCF history against the [`COMPLETENESS_YEARS`] target, capped at 1.
pub fn history_completeness(history: &[FcfObservation]) -> f64 {
    let mut years: Vec<i32> = history.iter().map(|obs| obs.fiscal_year).collect();
    years.sort_unstable();
    years.dedup();
    (years.len() as f64 / COMPLETENESS_YEARS).min(1.0)
}

/// Growth plausibility input to DCF confidence: 1 when the assumed
/// near-term rate matches history, fading to 0 as it deviates by more
/// than the historical rate itself (scale floored at 0.05). Neutral
/// 0.5 when no history exists to compare against.
pub fn growth_plausibility(assumed: f64, historical: Option<f64>) -> f64 {
    match historical {
        Some(hist) => {
            let scale = hist.abs().max(0.05);
            1.0 - ((assumed - hist).abs() / scale).min(1.0)
        }
        None => NEUTRAL_PLAUSIBILITY,
    }
}

/// Discounted cash flow model
#[derive(Debug, Default)]
pub struct DcfModel;

impl DcfModel {
    pub fn new() -> Self {
        Self
    }

    /// Value `target` under `assumptions`.
    ///
    /// Fails with `InvalidAssumptions` before any computation when the
    /// assumptions are inconsistent, `MissingData` when the profile has
    /// no FCF history, and `NoViableValuation` when the base FCF is
    /// non-positive (a Gordon perpetuity is meaningless there).
    pub fn value(
        &self,
        target: &CompanyProfile,
        assumptions: &ValuationAssumptions,
    ) -> Result<ModelEstimate> {
        assumptions.validate()?;

        let base_fcf = target.latest_fcf().ok_or_else(|| {
            ValuationError::MissingData(format!(
                "{} has no free cash flow history",
                target.ticker
            ))
        })?;
        if base_fcf <= 0.0 {
            return Err(ValuationError::NoViableValuation(format!(
                "{} latest free cash flow is non-positive",
                target.ticker
            )));
        }

        let rates = assumptions.growth_path.yearly_rates(assumptions.horizon_years);
        let mut projected = Vec::with_capacity(rates.len());
        let mut discounted = Vec::with_capacity(rates.len());
        let mut fcf = base_fcf;
        let mut pv_sum = 0.0;
        for (year, growth) in rates.iter().enumerate() {
            fcf *= 1.0 + growth;
            let pv = fcf / (1.0 + assumptions.wacc).powi(year as i32 + 1);
            projected.push(fcf);
            discounted.push(pv);
            pv_sum += pv;
        }

        // Gordon growth on the final projected year, discounted back
        // from the end of the horizon
        let terminal_value = fcf * (1.0 + assumptions.terminal_growth)
            / (assumptions.wacc - assumptions.terminal_growth);
        let discounted_terminal =
            terminal_value / (1.0 + assumptions.wacc).powi(assumptions.horizon_years as i32);
        let enterprise_value = pv_sum + discounted_terminal;

        let completeness = history_completeness(&target.fcf_history);
        let plausibility = growth_plausibility(rates[0], target.historical_growth());
        let confidence = COMPLETENESS_WEIGHT * completeness + PLAUSIBILITY_WEIGHT * plausibility;

        Ok(ModelEstimate {
            model: MODEL_NAME.to_string(),
            enterprise_value,
            confidence,
            detail: json!({
                "base_fcf": base_fcf,
                "growth_path": rates,
                "projected_fcf": projected,
                "discounted_fcf": discounted,
                "terminal_value": terminal_value,
                "discounted_terminal_value": discounted_terminal,
                "completeness": completeness,
                "growth_plausibility": plausibility,
            }),
        })
    }
}

impl ValuationModel for DcfModel {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn value(&self, ctx: &ValuationContext<'_>) -> Result<ModelEstimate> {
        DcfModel::value(self, ctx.target, ctx.assumptions)
    }
}
