//! Compatibility scoring and ranking.

use deal_core::{
    metrics, CompanyProfile, CompatibilityScore, FitFactor, Result, SkippedCandidate, SubScore,
    ValuationError,
};
use tracing::debug;

use crate::sector::{self, SectorRelation};

/// Target/acquirer market-cap ratios scored at the plateau
pub const IDEAL_SIZE_MIN: f64 = 0.05;
pub const IDEAL_SIZE_MAX: f64 = 0.40;
/// Ratios outside these bounds score zero
pub const ABSOLUTE_SIZE_MIN: f64 = 0.01;
pub const ABSOLUTE_SIZE_MAX: f64 = 1.00;

/// Assumed takeover premium over the target's market cap
pub const CONTROL_PREMIUM: f64 = 0.30;
/// Debt capacity assumed at this multiple of acquirer EBITDA
pub const MAX_LEVERAGE: f64 = 3.0;
/// Capacity-to-price ratio at which the capacity sub-score saturates
pub const CAPACITY_SATURATION: f64 = 1.25;

/// Growth differentials (target minus acquirer) scored at the plateau
pub const IDEAL_GROWTH_DIFF_MIN: f64 = 0.05;
pub const IDEAL_GROWTH_DIFF_MAX: f64 = 0.20;
/// Differentials at or below this score zero
pub const GROWTH_DIFF_FLOOR: f64 = -0.20;
/// Differentials at or above this hold the extreme-growth floor score
pub const GROWTH_DIFF_CEILING: f64 = 0.60;
const EXTREME_GROWTH_SCORE: f64 = 20.0;

/// Minimum aligned return observations before correlation is scored
pub const MIN_RETURN_OVERLAP: usize = 8;
const NEUTRAL_CORRELATION_SCORE: f64 = 50.0;

/// Weights for the compatibility composite
#[derive(Debug, Clone)]
pub struct ScorerWeights {
    /// Weight for sector fit
    pub sector_weight: f64,
    /// Weight for relative size
    pub size_weight: f64,
    /// Weight for acquirer funding capacity
    pub capacity_weight: f64,
    /// Weight for growth complementarity
    pub growth_weight: f64,
    /// Weight for return correlation
    pub correlation_weight: f64,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            sector_weight: 0.25,
            size_weight: 0.20,
            capacity_weight: 0.20,
            growth_weight: 0.20,
            correlation_weight: 0.15,
        }
    }
}

impl ScorerWeights {
    /// Weights must be non-negative and sum to 1
    pub fn validate(&self) -> Result<()> {
        let parts = [
            self.sector_weight,
            self.size_weight,
            self.capacity_weight,
            self.growth_weight,
            self.correlation_weight,
        ];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ValuationError::InvalidAssumptions(
                "Sub-score weights must be non-negative".to_string(),
            ));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ValuationError::InvalidAssumptions(format!(
                "Sub-score weights sum to {}, expected 1.0",
                sum
            )));
        }
        Ok(())
    }
}

/// Derived view over one acquirer/target pair, computed fresh per pair
#[derive(Debug, Clone)]
pub struct CompatibilityInputs {
    pub sector_relation: SectorRelation,
    /// Target market cap over acquirer market cap
    pub size_ratio: f64,
    /// Acquirer funding capacity over the estimated purchase price
    pub capacity_ratio: f64,
    /// Target growth minus acquirer growth
    pub growth_differential: f64,
    /// Pearson correlation of aligned price returns, when overlap suffices
    pub return_correlation: Option<f64>,
}

impl CompatibilityInputs {
    /// Derive scoring inputs for a pair. Missing required fields on either
    /// profile fail with `MissingData` naming the ticker and the field.
    pub fn derive(
        acquirer: &CompanyProfile,
        target: &CompanyProfile,
    ) -> Result<Self> {
        let acq_cap = positive(acquirer, acquirer.market_cap, "market cap")?;
        let acq_sector = required(acquirer, acquirer.sector.as_deref(), "sector")?;
        let acq_ebitda = required(acquirer, acquirer.ebitda, "EBITDA")?;
        let acq_growth = required(acquirer, acquirer.historical_growth(), "growth history")?;

        let tgt_cap = positive(target, target.market_cap, "market cap")?;
        let tgt_sector = required(target, target.sector.as_deref(), "sector")?;
        let tgt_growth = required(target, target.historical_growth(), "growth history")?;

        let sector_relation = sector::classify(
            acq_sector,
            acquirer.industry.as_deref(),
            tgt_sector,
            target.industry.as_deref(),
        );
        let capacity = (MAX_LEVERAGE * acq_ebitda - acquirer.net_debt.unwrap_or(0.0)).max(0.0);
        let price = tgt_cap * (1.0 + CONTROL_PREMIUM);

        Ok(Self {
            sector_relation,
            size_ratio: tgt_cap / acq_cap,
            capacity_ratio: capacity / price,
            growth_differential: tgt_growth - acq_growth,
            return_correlation: metrics::return_correlation(
                &acquirer.price_returns,
                &target.price_returns,
                MIN_RETURN_OVERLAP,
            ),
        })
    }

    /// Acquirer-side required fields, checked once before a ranking run
    /// so an incomplete acquirer fails the request instead of marking
    /// every candidate skipped.
    pub fn check_acquirer(acquirer: &CompanyProfile) -> Result<()> {
        positive(acquirer, acquirer.market_cap, "market cap")?;
        required(acquirer, acquirer.sector.as_deref(), "sector")?;
        required(acquirer, acquirer.ebitda, "EBITDA")?;
        required(acquirer, acquirer.historical_growth(), "growth history")?;
        Ok(())
    }
}

/// Size sub-score from the target/acquirer market-cap ratio.
/// Flat at 100 inside the ideal band, linear falloff outward, zero once
/// the target is immaterial or larger than the acquirer.
pub fn size_score(ratio: f64) -> f64 {
    if !ratio.is_finite() || ratio < ABSOLUTE_SIZE_MIN || ratio > ABSOLUTE_SIZE_MAX {
        return 0.0;
    }
    if ratio >= IDEAL_SIZE_MIN && ratio <= IDEAL_SIZE_MAX {
        return 100.0;
    }
    if ratio < IDEAL_SIZE_MIN {
        (ratio - ABSOLUTE_SIZE_MIN) / (IDEAL_SIZE_MIN - ABSOLUTE_SIZE_MIN) * 100.0
    } else {
        (1.0 - (ratio - IDEAL_SIZE_MAX) / (ABSOLUTE_SIZE_MAX - IDEAL_SIZE_MAX)) * 100.0
    }
}

/// Capacity sub-score; saturates once funding comfortably covers the price
pub fn capacity_score(capacity_ratio: f64) -> f64 {
    if !capacity_ratio.is_finite() || capacity_ratio <= 0.0 {
        return 0.0;
    }
    (capacity_ratio / CAPACITY_SATURATION * 100.0).min(100.0)
}

/// Growth sub-score from the target-minus-acquirer growth differential.
/// Peaks for a moderate positive differential; strongly negative
/// differentials score zero and extreme ones fall back to a floor.
pub fn growth_score(differential: f64) -> f64 {
    if !differential.is_finite() || differential <= GROWTH_DIFF_FLOOR {
        return 0.0;
    }
    if differential < IDEAL_GROWTH_DIFF_MIN {
        return (differential - GROWTH_DIFF_FLOOR) / (IDEAL_GROWTH_DIFF_MIN - GROWTH_DIFF_FLOOR)
            * 100.0;
    }
    if differential <= IDEAL_GROWTH_DIFF_MAX {
        return 100.0;
    }
    if differential < GROWTH_DIFF_CEILING {
        let falloff = (differential - IDEAL_GROWTH_DIFF_MAX)
            / (GROWTH_DIFF_CEILING - IDEAL_GROWTH_DIFF_MAX);
        return 100.0 - falloff * (100.0 - EXTREME_GROWTH_SCORE);
    }
    EXTREME_GROWTH_SCORE
}

/// Correlation sub-score. Lower correlation scores higher; this is the
/// only sub-score where a lower input maps to a better score.
pub fn correlation_score(correlation: Option<f64>) -> f64 {
    match correlation {
        Some(r) => (1.0 - r.clamp(-1.0, 1.0)) * 50.0,
        None => NEUTRAL_CORRELATION_SCORE,
    }
}

/// Scores and ranks acquisition candidates for an acquirer
pub struct CompatibilityScorer {
    weights: ScorerWeights,
}

impl Default for CompatibilityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl CompatibilityScorer {
    /// Create a scorer with the default weights
    pub fn new() -> Self {
        Self {
            weights: ScorerWeights::default(),
        }
    }

    /// Create a scorer with custom weights, rejecting invalid ones
    pub fn with_weights(weights: ScorerWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScorerWeights {
        &self.weights
    }

    /// Score a single acquirer/target pair
    pub fn score_pair(
        &self,
        acquirer: &CompanyProfile,
        target: &CompanyProfile,
    ) -> Result<CompatibilityScore> {
        let inputs = CompatibilityInputs::derive(acquirer, target)?;
        Ok(self.score_inputs(&target.ticker, &inputs))
    }

    /// Rank candidates descending by composite score. Candidates missing
    /// required fields are excluded and reported, never scored as zero.
    pub fn rank_candidates(
        &self,
        acquirer: &CompanyProfile,
        candidates: &[CompanyProfile],
    ) -> Result<(Vec<CompatibilityScore>, Vec<SkippedCandidate>)> {
        CompatibilityInputs::check_acquirer(acquirer)?;

        let mut scores = Vec::new();
        let mut skipped = Vec::new();
        for candidate in candidates {
            if candidate.ticker == acquirer.ticker {
                skipped.push(SkippedCandidate {
                    ticker: candidate.ticker.clone(),
                    reason: "Candidate is the acquirer itself".to_string(),
                });
                continue;
            }
            match CompatibilityInputs::derive(acquirer, candidate) {
                Ok(inputs) => scores.push(self.score_inputs(&candidate.ticker, &inputs)),
                Err(err) => {
                    debug!(ticker = %candidate.ticker, "Skipping candidate: {}", err);
                    skipped.push(SkippedCandidate {
                        ticker: candidate.ticker.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        // Descending composite; ties break by capacity, then by ticker
        scores.sort_by(|a, b| {
            b.composite
                .partial_cmp(&a.composite)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let cap_a = a.sub_score(FitFactor::AcquirerCapacity).unwrap_or(0.0);
                    let cap_b = b.sub_score(FitFactor::AcquirerCapacity).unwrap_or(0.0);
                    cap_b
                        .partial_cmp(&cap_a)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.target.cmp(&b.target))
        });

        Ok((scores, skipped))
    }

    fn score_inputs(&self, target: &str, inputs: &CompatibilityInputs) -> CompatibilityScore {
        let breakdown = vec![
            SubScore {
                factor: FitFactor::SectorFit,
                score: inputs.sector_relation.score(),
                weight: self.weights.sector_weight,
            },
            SubScore {
                factor: FitFactor::SizeRatio,
                score: size_score(inputs.size_ratio),
                weight: self.weights.size_weight,
            },
            SubScore {
                factor: FitFactor::AcquirerCapacity,
                score: capacity_score(inputs.capacity_ratio),
                weight: self.weights.capacity_weight,
            },
            SubScore {
                factor: FitFactor::GrowthComplementarity,
                score: growth_score(inputs.growth_differential),
                weight: self.weights.growth_weight,
            },
            SubScore {
                factor: FitFactor::ReturnCorrelation,
                score: correlation_score(inputs.return_correlation),
                weight: self.weights.correlation_weight,
            },
        ];

        let composite = breakdown
            .iter()
            .map(|s| s.score * s.weight)
            .sum::<f64>()
            .clamp(0.0, 100.0);

        CompatibilityScore {
            target: target.to_string(),
            composite,
            breakdown,
        }
    }
}

fn required<T>(
    profile: &CompanyProfile,
    field: Option<T>,
    name: &str,
) -> Result<T> {
    field.ok_or_else(|| ValuationError::MissingData(format!("{} has no {}", profile.ticker, name)))
}

fn positive(
    profile: &CompanyProfile,
    field: Option<f64>,
    name: &str,
) -> Result<f64> {
    match field {
        Some(v) if v > 0.0 => Ok(v),
        _ => Err(ValuationError::MissingData(format!(
            "{} has no positive {}",
            profile.ticker, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_profile(ticker: &str, market_cap: f64, growth: f64) -> CompanyProfile {
        CompanyProfile {
            ticker: ticker.to_string(),
            name: Some(format!("{} Inc", ticker)),
            sector: Some("Technology".to_string()),
            industry: None,
            market_cap: Some(market_cap),
            revenue: Some(market_cap * 0.5),
            ebitda: Some(market_cap * 0.1),
            revenue_growth: Some(growth),
            beta: Some(1.0),
            net_debt: Some(0.0),
            fcf_history: vec![],
            price_returns: vec![],
        }
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScorerWeights::default();
        let sum = w.sector_weight
            + w.size_weight
            + w.capacity_weight
            + w.growth_weight
            + w.correlation_weight;
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut w = ScorerWeights::default();
        w.sector_weight = 0.5;
        assert!(matches!(
            w.validate(),
            Err(ValuationError::InvalidAssumptions(_))
        ));
        assert!(CompatibilityScorer::with_weights(w).is_err());

        let negative = ScorerWeights {
            sector_weight: -0.1,
            size_weight: 0.45,
            capacity_weight: 0.25,
            growth_weight: 0.25,
            correlation_weight: 0.15,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_size_score_shape() {
        // Plateau across the ideal band
        assert_eq!(size_score(0.05), 100.0);
        assert_eq!(size_score(0.20), 100.0);
        assert_eq!(size_score(0.40), 100.0);
        // Zero outside the absolute bounds
        assert_eq!(size_score(0.005), 0.0);
        assert_eq!(size_score(1.5), 0.0);
        // Monotonic falloff on both sides
        assert!(size_score(0.02) < size_score(0.04));
        assert!(size_score(0.80) < size_score(0.50));
        assert!((size_score(0.03) - 50.0).abs() < 1e-9);
        assert!((size_score(0.70) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_growth_score_shape() {
        assert_eq!(growth_score(-0.30), 0.0);
        assert!((growth_score(0.0) - 80.0).abs() < 1e-9);
        assert_eq!(growth_score(0.05), 100.0);
        assert_eq!(growth_score(0.20), 100.0);
        assert!((growth_score(0.40) - 60.0).abs() < 1e-9);
        assert_eq!(growth_score(0.80), 20.0);
        // Strongly negative scores below moderate positive
        assert!(growth_score(-0.15) < growth_score(0.10));
    }

    #[test]
    fn test_capacity_score_saturates() {
        assert_eq!(capacity_score(0.0), 0.0);
        assert!((capacity_score(0.625) - 50.0).abs() < 1e-9);
        assert_eq!(capacity_score(1.25), 100.0);
        assert_eq!(capacity_score(3.0), 100.0);
    }

    #[test]
    fn test_correlation_score_inverts() {
        assert_eq!(correlation_score(Some(-1.0)), 100.0);
        assert_eq!(correlation_score(Some(0.0)), 50.0);
        assert_eq!(correlation_score(Some(1.0)), 0.0);
        assert_eq!(correlation_score(None), NEUTRAL_CORRELATION_SCORE);
    }

    #[test]
    fn test_composite_in_range_and_weights_attached() {
        let scorer = CompatibilityScorer::new();
        let acquirer = create_test_profile("BIG", 10_000.0, 0.05);
        let target = create_test_profile("SML", 1_500.0, 0.15);

        let score = scorer.score_pair(&acquirer, &target).unwrap();
        assert!(score.composite >= 0.0 && score.composite <= 100.0);
        assert_eq!(score.breakdown.len(), 5);
        let weight_sum: f64 = score.breakdown.iter().map(|s| s.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
        for sub in &score.breakdown {
            assert!(sub.score >= 0.0 && sub.score <= 100.0);
        }
    }

    #[test]
    fn test_ranking_is_deterministic_and_descending() {
        let scorer = CompatibilityScorer::new();
        let acquirer = create_test_profile("ACQ", 10_000.0, 0.05);
        let candidates = vec![
            create_test_profile("TGT1", 2_000.0, 0.15),
            create_test_profile("TGT2", 9_500.0, 0.02),
            create_test_profile("TGT3", 800.0, 0.12),
        ];

        let (first, _) = scorer.rank_candidates(&acquirer, &candidates).unwrap();
        let (second, _) = scorer.rank_candidates(&acquirer, &candidates).unwrap();

        let order: Vec<&str> = first.iter().map(|s| s.target.as_str()).collect();
        let rerun: Vec<&str> = second.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(order, rerun);
        for pair in first.windows(2) {
            assert!(pair[0].composite >= pair[1].composite);
        }
    }

    #[test]
    fn test_tie_breaks_by_capacity_then_ticker() {
        let scorer = CompatibilityScorer::new();
        // Capacity 3 * 100 - 40 = 260 against prices of 130 and 260 puts
        // the capacity sub-scores at 100 and 80 while the growth scores
        // (80 and 100) compensate exactly, so composites tie.
        let mut acquirer = create_test_profile("ACQ", 1_000.0, 0.05);
        acquirer.ebitda = Some(100.0);
        acquirer.net_debt = Some(40.0);

        let big_capacity = create_test_profile("ZZZ", 100.0, 0.05);
        let big_growth = create_test_profile("AAA", 200.0, 0.15);

        let (scores, _) = scorer
            .rank_candidates(&acquirer, &[big_growth, big_capacity])
            .unwrap();
        assert!((scores[0].composite - scores[1].composite).abs() < 1e-9);
        // Higher capacity wins even though its ticker sorts last
        assert_eq!(scores[0].target, "ZZZ");
        assert_eq!(scores[1].target, "AAA");

        // Identical candidates fall through to the ticker tie-break
        let twin_a = create_test_profile("BBB", 1_500.0, 0.15);
        let twin_b = create_test_profile("ABC", 1_500.0, 0.15);
        let (scores, _) = scorer.rank_candidates(&acquirer, &[twin_a, twin_b]).unwrap();
        assert_eq!(scores[0].target, "ABC");
        assert_eq!(scores[1].target, "BBB");
    }

    #[test]
    fn test_incomplete_candidate_is_skipped_not_zeroed() {
        let scorer = CompatibilityScorer::new();
        let acquirer = create_test_profile("ACQ", 10_000.0, 0.05);
        let mut no_sector = create_test_profile("BAD", 2_000.0, 0.10);
        no_sector.sector = None;
        let good = create_test_profile("OK", 2_000.0, 0.10);

        let (scores, skipped) = scorer
            .rank_candidates(&acquirer, &[no_sector, good])
            .unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].target, "OK");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].ticker, "BAD");
        assert!(skipped[0].reason.contains("sector"));
    }

    #[test]
    fn test_incomplete_acquirer_fails_the_request() {
        let scorer = CompatibilityScorer::new();
        let mut acquirer = create_test_profile("ACQ", 10_000.0, 0.05);
        acquirer.ebitda = None;
        let candidates = vec![create_test_profile("TGT", 2_000.0, 0.10)];

        match scorer.rank_candidates(&acquirer, &candidates) {
            Err(ValuationError::MissingData(msg)) => assert!(msg.contains("ACQ")),
            other => panic!("expected MissingData, got {:?}", other),
        }
    }

    #[test]
    fn test_acquirer_cannot_be_its_own_candidate() {
        let scorer = CompatibilityScorer::new();
        let acquirer = create_test_profile("ACQ", 10_000.0, 0.05);
        let (scores, skipped) = scorer
            .rank_candidates(&acquirer, std::slice::from_ref(&acquirer))
            .unwrap();
        assert!(scores.is_empty());
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_low_correlation_outranks_high_correlation() {
        let scorer = CompatibilityScorer::new();
        let returns: Vec<f64> = vec![0.02, -0.01, 0.03, 0.01, -0.02, 0.02, 0.00, 0.01];
        let mut acquirer = create_test_profile("ACQ", 10_000.0, 0.05);
        acquirer.price_returns = returns.clone();

        let mut mirror = create_test_profile("SAME", 2_000.0, 0.15);
        mirror.price_returns = returns.clone();
        let mut hedge = create_test_profile("DIFF", 2_000.0, 0.15);
        hedge.price_returns = returns.iter().map(|r| -r).collect();

        let (scores, _) = scorer.rank_candidates(&acquirer, &[mirror, hedge]).unwrap();
        assert_eq!(scores[0].target, "DIFF");
    }
}
