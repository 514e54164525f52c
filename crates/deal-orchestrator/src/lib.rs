//! Deal Orchestration
//!
//! Ties the engines together per request: ranking runs fetch candidate
//! profiles and produce a [`TargetRanking`]; pair reviews run DCF and
//! Comps concurrently, blend them, sweep sensitivities, and assemble a
//! [`DealBrief`]. Per-model failures travel alongside successes; only a
//! request that produces no estimate at all fails.

pub mod store;

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use compatibility_scorer::{CompatibilityScorer, ScorerWeights};
use comps_valuation::CompsModel;
use dcf_valuation::DcfModel;
use deal_core::{
    metrics, DealBrief, ModelEstimate, ModelFailure, ProfileStore, Result, SkippedCandidate,
    TargetRanking, ValuationAssumptions, ValuationContext, ValuationError, ValuationModel,
};
use sensitivity_engine::SweepAxes;

pub use store::InMemoryProfileStore;

/// Per-request overrides for a ranking run
#[derive(Debug, Clone, Default)]
pub struct RankingRequest {
    /// Custom sub-score weights; defaults apply when absent
    pub weights: Option<ScorerWeights>,
    /// Keep only the best `top_n` scores; unlimited when absent
    pub top_n: Option<usize>,
}

/// Per-request overrides for a pair review
#[derive(Debug, Clone, Default)]
pub struct PairRequest {
    /// Full assumption set; when absent, defaults apply with WACC
    /// derived from the target's beta via CAPM
    pub assumptions: Option<ValuationAssumptions>,
    /// Sweep axes; defaults apply when absent
    pub axes: Option<SweepAxes>,
}

/// Drives ranking and valuation requests against a profile store
pub struct DealOrchestrator<S: ProfileStore> {
    store: S,
    comps: CompsModel,
    /// Models blended in addition to DCF and Comps
    extra_models: Vec<Arc<dyn ValuationModel>>,
}

impl<S: ProfileStore> DealOrchestrator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            comps: CompsModel::new(),
            extra_models: Vec::new(),
        }
    }

    pub fn with_comps_model(mut self, comps: CompsModel) -> Self {
        self.comps = comps;
        self
    }

    /// Register an additional valuation model for the ensemble stage
    pub fn add_model(mut self, model: Arc<dyn ValuationModel>) -> Self {
        self.extra_models.push(model);
        self
    }

    /// Rank acquisition candidates for `acquirer`.
    ///
    /// Candidates whose profiles cannot be fetched or scored land in
    /// the skipped list with a reason; an unfetchable acquirer fails
    /// the whole request.
    pub async fn rank_targets(
        &self,
        acquirer: &str,
        candidates: &[String],
        request: RankingRequest,
    ) -> Result<TargetRanking> {
        info!(acquirer, candidates = candidates.len(), "Ranking targets");

        let scorer = match request.weights {
            Some(weights) => CompatibilityScorer::with_weights(weights)?,
            None => CompatibilityScorer::new(),
        };
        let acquirer_profile = self.store.get_profile(acquirer).await?;

        let mut profiles = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();
        for ticker in candidates {
            match self.store.get_profile(ticker).await {
                Ok(profile) => profiles.push(profile),
                Err(err) => {
                    warn!(ticker = %ticker, "Candidate profile unavailable: {}", err);
                    skipped.push(SkippedCandidate {
                        ticker: ticker.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let (mut scores, unscored) = scorer.rank_candidates(&acquirer_profile, &profiles)?;
        skipped.extend(unscored);
        if let Some(top_n) = request.top_n {
            scores.truncate(top_n);
        }
        info!(
            acquirer,
            scored = scores.len(),
            skipped = skipped.len(),
            "Ranking complete"
        );

        Ok(TargetRanking {
            acquirer: acquirer_profile.ticker,
            scores,
            skipped,
            total_candidates: candidates.len(),
            generated_at: Utc::now(),
        })
    }

    /// Value `target` for `acquirer` and assemble the brief.
    ///
    /// DCF and Comps run concurrently; each model's failure is recorded
    /// rather than propagated, and only a request where no model at all
    /// produced an estimate fails with `NoViableValuation`.
    pub async fn review_pair(
        &self,
        acquirer: &str,
        target: &str,
        request: PairRequest,
    ) -> Result<DealBrief> {
        info!(acquirer, target, "Reviewing pair");

        let (acquirer_profile, target_profile) = tokio::join!(
            self.store.get_profile(acquirer),
            self.store.get_profile(target),
        );
        let acquirer_profile = acquirer_profile?;
        let target_profile = target_profile?;

        let assumptions = match request.assumptions {
            Some(assumptions) => assumptions,
            None => ValuationAssumptions {
                wacc: metrics::capm_wacc(target_profile.beta),
                ..Default::default()
            },
        };
        assumptions.validate()?;

        let peers = match target_profile.sector.as_deref() {
            Some(sector) => match self.store.get_peers(sector, &target_profile.ticker).await {
                Ok(peers) => peers,
                Err(err) => {
                    warn!(target, "Peer lookup failed, comps runs empty: {}", err);
                    Vec::new()
                }
            },
            None => {
                warn!(target, "Target has no sector, comps runs without peers");
                Vec::new()
            }
        };

        // DCF and Comps have no data dependency; run them side by side
        // on the blocking pool
        let dcf_target = target_profile.clone();
        let dcf_assumptions = assumptions.clone();
        let comps = self.comps.clone();
        let comps_target = target_profile.clone();
        let comps_peers = peers.clone();
        let comps_assumptions = assumptions.clone();
        let (dcf_result, comps_result) = tokio::join!(
            tokio::task::spawn_blocking(move || {
                DcfModel::new().value(&dcf_target, &dcf_assumptions)
            }),
            tokio::task::spawn_blocking(move || {
                comps.value(&comps_target, &comps_peers, &comps_assumptions)
            }),
        );

        let mut estimates: Vec<ModelEstimate> = Vec::new();
        let mut failures: Vec<ModelFailure> = Vec::new();
        for (name, joined) in [
            (dcf_valuation::MODEL_NAME, dcf_result),
            (comps_valuation::MODEL_NAME, comps_result),
        ] {
            match flatten_join(name, joined) {
                Ok(estimate) => estimates.push(estimate),
                Err(err) => {
                    warn!(model = name, "Model failed: {}", err);
                    failures.push(ModelFailure::from_error(name, &err));
                }
            }
        }

        let ctx = ValuationContext {
            target: &target_profile,
            peers: &peers,
            assumptions: &assumptions,
        };
        for model in &self.extra_models {
            match model.value(&ctx) {
                Ok(estimate) => estimates.push(estimate),
                Err(err) => {
                    warn!(model = model.name(), "Model failed: {}", err);
                    failures.push(ModelFailure::from_error(model.name(), &err));
                }
            }
        }

        let model_details = estimates.clone();
        let valuation = valuation_ensemble::combine(estimates)?;

        let axes = request.axes.unwrap_or_default();
        let sweep_target = target_profile.clone();
        let sweep_assumptions = assumptions.clone();
        let sensitivity = tokio::task::spawn_blocking(move || {
            sensitivity_engine::sweep(&sweep_target, &sweep_assumptions, &axes)
        })
        .await
        .ok()
        .and_then(|result| match result {
            Ok(grid) => Some(grid),
            Err(err) => {
                warn!(target, "Sensitivity sweep unavailable: {}", err);
                None
            }
        });

        let implied_ev_revenue = implied_multiple(
            valuation.enterprise_value,
            target_profile.revenue,
        );
        let implied_ev_ebitda = implied_multiple(
            valuation.enterprise_value,
            target_profile.ebitda,
        );

        info!(
            acquirer,
            target,
            enterprise_value = valuation.enterprise_value,
            confidence = valuation.confidence,
            models = model_details.len(),
            failures = failures.len(),
            "Pair review complete"
        );

        Ok(DealBrief {
            acquirer: acquirer_profile.ticker,
            target: target_profile.ticker,
            valuation,
            sensitivity,
            model_details,
            model_failures: failures,
            assumptions,
            implied_ev_revenue,
            implied_ev_ebitda,
            generated_at: Utc::now(),
        })
    }
}

/// Blended EV over a target metric, when the metric is positive
fn implied_multiple(enterprise_value: f64, metric: Option<f64>) -> Option<f64> {
    metric
        .filter(|m| *m > 0.0)
        .map(|m| enterprise_value / m)
}

/// Collapse a blocking-task join result into the model's own result;
/// a panicked task reads as that model failing, not the request
fn flatten_join(
    name: &str,
    joined: std::result::Result<Result<ModelEstimate>, tokio::task::JoinError>,
) -> Result<ModelEstimate> {
    match joined {
        Ok(result) => result,
        Err(err) => Err(ValuationError::NoViableValuation(format!(
            "{} task did not complete: {}",
            name, err
        ))),
    }
}
