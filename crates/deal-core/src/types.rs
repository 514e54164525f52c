use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result, ValuationError};
use crate::metrics;

/// One fiscal year of free cash flow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FcfObservation {
    pub fiscal_year: i32,
    pub value: f64,
}

/// Normalized company fundamentals supplied by the profile store.
/// Numeric fields are optional because provider coverage is uneven;
/// each consumer declares which fields it requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub revenue: Option<f64>,
    pub ebitda: Option<f64>,
    /// Trailing annual revenue growth rate (0.10 = 10%)
    pub revenue_growth: Option<f64>,
    pub beta: Option<f64>,
    pub net_debt: Option<f64>,
    /// Historical free cash flows, one entry per fiscal year
    #[serde(default)]
    pub fcf_history: Vec<FcfObservation>,
    /// Periodic price returns, most recent last
    #[serde(default)]
    pub price_returns: Vec<f64>,
}

impl CompanyProfile {
    /// Free cash flow of the most recent fiscal year on record
    pub fn latest_fcf(&self) -> Option<f64> {
        self.fcf_history
            .iter()
            .max_by_key(|obs| obs.fiscal_year)
            .map(|obs| obs.value)
    }

    /// Market cap plus net debt; unreported net debt is treated as zero
    pub fn enterprise_value(&self) -> Option<f64> {
        self.market_cap
            .map(|mc| mc + self.net_debt.unwrap_or(0.0))
    }

    /// Reported revenue growth, falling back to the FCF series CAGR
    pub fn historical_growth(&self) -> Option<f64> {
        if let Some(g) = self.revenue_growth {
            return Some(g);
        }
        let first = self.fcf_history.iter().min_by_key(|obs| obs.fiscal_year)?;
        let last = self.fcf_history.iter().max_by_key(|obs| obs.fiscal_year)?;
        let years = (last.fiscal_year - first.fiscal_year) as f64;
        metrics::cagr(first.value, last.value, years)
    }
}

/// Growth-rate path applied over the projection horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GrowthPath {
    /// Same rate every projected year
    Flat(f64),
    /// Linear fade from `start` in year one to `end` in the final year
    LinearFade { start: f64, end: f64 },
    /// Explicit per-year rates; length must equal the horizon
    PerYear(Vec<f64>),
}

impl GrowthPath {
    /// Resolve the path into one growth rate per projected year
    pub fn yearly_rates(&self, horizon_years: usize) -> Vec<f64> {
        match self {
            GrowthPath::Flat(g) => vec![*g; horizon_years],
            GrowthPath::LinearFade { start, end } => {
                if horizon_years <= 1 {
                    return vec![*start; horizon_years];
                }
                let step = (end - start) / (horizon_years - 1) as f64;
                (0..horizon_years)
                    .map(|year| start + step * year as f64)
                    .collect()
            }
            GrowthPath::PerYear(rates) => rates.clone(),
        }
    }

    /// Shift every year's rate by `offset` (sensitivity perturbation)
    pub fn shifted(&self, offset: f64) -> GrowthPath {
        match self {
            GrowthPath::Flat(g) => GrowthPath::Flat(g + offset),
            GrowthPath::LinearFade { start, end } => GrowthPath::LinearFade {
                start: start + offset,
                end: end + offset,
            },
            GrowthPath::PerYear(rates) => {
                GrowthPath::PerYear(rates.iter().map(|g| g + offset).collect())
            }
        }
    }

    fn rates_for_validation(&self) -> Vec<f64> {
        match self {
            GrowthPath::Flat(g) => vec![*g],
            GrowthPath::LinearFade { start, end } => vec![*start, *end],
            GrowthPath::PerYear(rates) => rates.clone(),
        }
    }
}

/// Which peer multiple the comps model applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultipleSelection {
    /// Prefer EV/EBITDA, fall back to EV/Revenue
    Auto,
    EvEbitda,
    EvRevenue,
}

/// User-editable inputs to a valuation run, validated before any model runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationAssumptions {
    /// Discount rate applied to projected cash flows (0.10 = 10%)
    pub wacc: f64,
    /// Perpetual growth beyond the horizon; must stay strictly below `wacc`
    pub terminal_growth: f64,
    /// Projection horizon in years
    pub horizon_years: usize,
    pub growth_path: GrowthPath,
    pub multiple: MultipleSelection,
}

impl Default for ValuationAssumptions {
    fn default() -> Self {
        Self {
            wacc: 0.10,
            terminal_growth: 0.025,
            horizon_years: 5,
            growth_path: GrowthPath::Flat(0.05),
            multiple: MultipleSelection::Auto,
        }
    }
}

impl ValuationAssumptions {
    pub const MAX_HORIZON_YEARS: usize = 30;

    /// Fail-fast guard; no model computes against assumptions that fail here
    pub fn validate(&self) -> Result<()> {
        if !self.wacc.is_finite() || self.wacc <= 0.0 || self.wacc >= 1.0 {
            return Err(ValuationError::InvalidAssumptions(format!(
                "WACC must be in (0, 1), got {}",
                self.wacc
            )));
        }
        if !self.terminal_growth.is_finite() {
            return Err(ValuationError::InvalidAssumptions(
                "Terminal growth must be finite".to_string(),
            ));
        }
        if self.wacc <= self.terminal_growth {
            return Err(ValuationError::InvalidAssumptions(format!(
                "WACC ({:.4}) must exceed terminal growth ({:.4})",
                self.wacc, self.terminal_growth
            )));
        }
        if self.horizon_years == 0 || self.horizon_years > Self::MAX_HORIZON_YEARS {
            return Err(ValuationError::InvalidAssumptions(format!(
                "Horizon must be between 1 and {} years, got {}",
                Self::MAX_HORIZON_YEARS,
                self.horizon_years
            )));
        }
        if let GrowthPath::PerYear(rates) = &self.growth_path {
            if rates.len() != self.horizon_years {
                return Err(ValuationError::InvalidAssumptions(format!(
                    "Per-year growth path has {} rates for a {}-year horizon",
                    rates.len(),
                    self.horizon_years
                )));
            }
        }
        for rate in self.growth_path.rates_for_validation() {
            if !rate.is_finite() || rate <= -1.0 {
                return Err(ValuationError::InvalidAssumptions(format!(
                    "Growth rate {} is outside (-1, inf)",
                    rate
                )));
            }
        }
        Ok(())
    }
}

/// Sub-score dimension of the compatibility composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitFactor {
    SectorFit,
    SizeRatio,
    AcquirerCapacity,
    GrowthComplementarity,
    ReturnCorrelation,
}

impl FitFactor {
    /// Human-readable label for the factor
    pub fn label(&self) -> &'static str {
        match self {
            FitFactor::SectorFit => "Sector Fit",
            FitFactor::SizeRatio => "Size Ratio",
            FitFactor::AcquirerCapacity => "Acquirer Capacity",
            FitFactor::GrowthComplementarity => "Growth Complementarity",
            FitFactor::ReturnCorrelation => "Return Correlation",
        }
    }
}

/// One weighted sub-score in a compatibility breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubScore {
    pub factor: FitFactor,
    /// Normalized to [0, 100] before weighting
    pub score: f64,
    pub weight: f64,
}

/// Composite fit score for one acquirer/target pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityScore {
    pub target: String,
    /// Weighted sum of the breakdown, 0 to 100
    pub composite: f64,
    pub breakdown: Vec<SubScore>,
}

impl CompatibilityScore {
    /// Sub-score for `factor`, if present in the breakdown
    pub fn sub_score(&self, factor: FitFactor) -> Option<f64> {
        self.breakdown
            .iter()
            .find(|s| s.factor == factor)
            .map(|s| s.score)
    }
}

/// Candidate excluded from ranking, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub ticker: String,
    pub reason: String,
}

/// Point estimate produced by one valuation model.
/// Carries no timestamp: identical inputs serialize identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEstimate {
    pub model: String,
    /// Enterprise value in the profile store's reporting currency
    pub enterprise_value: f64,
    /// 0.0 to 1.0
    pub confidence: f64,
    /// Model-specific detail: per-year flows for DCF, per-peer rows for comps
    pub detail: serde_json::Value,
}

/// A model that declined to produce an estimate, kept alongside successes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ModelFailure {
    pub fn from_error(model: &str, err: &ValuationError) -> Self {
        Self {
            model: model.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One model's contribution to the blended estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedEstimate {
    pub estimate: ModelEstimate,
    /// Applied blend weight; non-negative, weights sum to 1
    pub weight: f64,
}

/// Blended enterprise value across every model that produced an estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub enterprise_value: f64,
    /// Weighted model confidence less the disagreement penalty
    pub confidence: f64,
    pub components: Vec<WeightedEstimate>,
}

/// Enterprise-value outcomes across two perturbed assumption axes.
/// `values[r][c]` pairs with `row_offsets[r]` and `col_offsets[c]`;
/// cells that would violate model validity are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub row_label: String,
    pub col_label: String,
    pub row_offsets: Vec<f64>,
    pub col_offsets: Vec<f64>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl SensitivityGrid {
    /// Cell for `row_offset == 0` and `col_offset == 0`, when the axes
    /// include an unperturbed point
    pub fn center(&self) -> Option<f64> {
        let r = self.row_offsets.iter().position(|o| *o == 0.0)?;
        let c = self.col_offsets.iter().position(|o| *o == 0.0)?;
        self.values.get(r)?.get(c).copied()?
    }
}

/// Ranked candidate list for one acquirer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRanking {
    pub acquirer: String,
    /// Descending by composite score
    pub scores: Vec<CompatibilityScore>,
    pub skipped: Vec<SkippedCandidate>,
    pub total_candidates: usize,
    pub generated_at: DateTime<Utc>,
}

/// Output bundle for a pair-specific valuation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealBrief {
    pub acquirer: String,
    pub target: String,
    pub valuation: EnsembleResult,
    /// Absent when the DCF could not run even at the base assumptions
    #[serde(default)]
    pub sensitivity: Option<SensitivityGrid>,
    pub model_details: Vec<ModelEstimate>,
    pub model_failures: Vec<ModelFailure>,
    /// Assumptions after defaults and beta-derived WACC were applied
    pub assumptions: ValuationAssumptions,
    /// Blended enterprise value over target revenue, when revenue is known
    pub implied_ev_revenue: Option<f64>,
    /// Blended enterprise value over target EBITDA, when EBITDA is known
    pub implied_ev_ebitda: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_fcf(history: &[(i32, f64)]) -> CompanyProfile {
        CompanyProfile {
            ticker: "TEST".to_string(),
            name: None,
            sector: Some("Technology".to_string()),
            industry: None,
            market_cap: Some(1_000.0),
            revenue: Some(500.0),
            ebitda: Some(100.0),
            revenue_growth: None,
            beta: None,
            net_debt: Some(50.0),
            fcf_history: history
                .iter()
                .map(|(fiscal_year, value)| FcfObservation {
                    fiscal_year: *fiscal_year,
                    value: *value,
                })
                .collect(),
            price_returns: vec![],
        }
    }

    #[test]
    fn test_latest_fcf_picks_most_recent_year() {
        let p = profile_with_fcf(&[(2022, 80.0), (2024, 120.0), (2023, 100.0)]);
        assert_eq!(p.latest_fcf(), Some(120.0));
        assert_eq!(profile_with_fcf(&[]).latest_fcf(), None);
    }

    #[test]
    fn test_enterprise_value_treats_missing_net_debt_as_zero() {
        let mut p = profile_with_fcf(&[]);
        assert_eq!(p.enterprise_value(), Some(1_050.0));
        p.net_debt = None;
        assert_eq!(p.enterprise_value(), Some(1_000.0));
        p.market_cap = None;
        assert_eq!(p.enterprise_value(), None);
    }

    #[test]
    fn test_historical_growth_falls_back_to_fcf_cagr() {
        let mut p = profile_with_fcf(&[(2022, 100.0), (2024, 121.0)]);
        let g = p.historical_growth().unwrap();
        assert!((g - 0.10).abs() < 1e-9);

        p.revenue_growth = Some(0.25);
        assert_eq!(p.historical_growth(), Some(0.25));
    }

    #[test]
    fn test_growth_path_yearly_rates() {
        assert_eq!(GrowthPath::Flat(0.05).yearly_rates(3), vec![0.05; 3]);

        let fade = GrowthPath::LinearFade {
            start: 0.10,
            end: 0.02,
        };
        let rates = fade.yearly_rates(5);
        assert_eq!(rates.len(), 5);
        assert!((rates[0] - 0.10).abs() < 1e-12);
        assert!((rates[2] - 0.06).abs() < 1e-12);
        assert!((rates[4] - 0.02).abs() < 1e-12);

        let per_year = GrowthPath::PerYear(vec![0.08, 0.06, 0.04]);
        assert_eq!(per_year.yearly_rates(3), vec![0.08, 0.06, 0.04]);
    }

    #[test]
    fn test_growth_path_shifted() {
        let shifted = GrowthPath::LinearFade {
            start: 0.10,
            end: 0.02,
        }
        .shifted(0.01);
        match shifted {
            GrowthPath::LinearFade { start, end } => {
                assert!((start - 0.11).abs() < 1e-12);
                assert!((end - 0.03).abs() < 1e-12);
            }
            other => panic!("unexpected path: {:?}", other),
        }
    }

    #[test]
    fn test_assumptions_default_is_valid() {
        assert!(ValuationAssumptions::default().validate().is_ok());
    }

    #[test]
    fn test_assumptions_reject_wacc_below_terminal_growth() {
        let assumptions = ValuationAssumptions {
            wacc: 0.03,
            terminal_growth: 0.05,
            ..Default::default()
        };
        match assumptions.validate() {
            Err(ValuationError::InvalidAssumptions(_)) => {}
            other => panic!("expected InvalidAssumptions, got {:?}", other),
        }
    }

    #[test]
    fn test_assumptions_reject_bad_horizon_and_path() {
        let zero_horizon = ValuationAssumptions {
            horizon_years: 0,
            ..Default::default()
        };
        assert!(zero_horizon.validate().is_err());

        let mismatched = ValuationAssumptions {
            horizon_years: 5,
            growth_path: GrowthPath::PerYear(vec![0.05, 0.04]),
            ..Default::default()
        };
        assert!(mismatched.validate().is_err());

        let impossible_rate = ValuationAssumptions {
            growth_path: GrowthPath::Flat(-1.5),
            ..Default::default()
        };
        assert!(impossible_rate.validate().is_err());
    }

    #[test]
    fn test_grid_center_lookup() {
        let grid = SensitivityGrid {
            row_label: "WACC offset".to_string(),
            col_label: "Growth offset".to_string(),
            row_offsets: vec![-0.01, 0.0, 0.01],
            col_offsets: vec![-0.005, 0.0, 0.005],
            values: vec![
                vec![Some(1.0), Some(2.0), Some(3.0)],
                vec![Some(4.0), Some(5.0), Some(6.0)],
                vec![None, Some(8.0), Some(9.0)],
            ],
        };
        assert_eq!(grid.center(), Some(5.0));
    }
}
