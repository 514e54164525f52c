//! Comparable-Company Valuation
//!
//! Derives an implied enterprise-value range from peer trading
//! multiples. The median across peers is the point estimate (robust to
//! one stretched peer) and the interquartile range is reported as the
//! implied band. Confidence scales with peer count and metric coverage
//! rather than gating the estimate: a thin peer set still values, it
//! just says so loudly.

use deal_core::{
    metrics, CompanyProfile, ModelEstimate, MultipleSelection, Result, ValuationAssumptions,
    ValuationContext, ValuationError, ValuationModel,
};
use serde_json::json;
use statrs::statistics::Statistics;
use tracing::{debug, warn};

pub const MODEL_NAME: &str = "Comps";

/// Peer count below which confidence is capped at [`LOW_PEER_CONFIDENCE_CAP`]
pub const DEFAULT_MIN_PEERS: usize = 3;
/// Confidence ceiling for a below-minimum peer set
pub const LOW_PEER_CONFIDENCE_CAP: f64 = 0.35;
/// Peer count at which the count component of confidence saturates
pub const SATURATION_PEERS: usize = 10;

/// Metric a peer multiple was taken against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Ebitda,
    Revenue,
}

impl Metric {
    fn label(self) -> &'static str {
        match self {
            Metric::Ebitda => "EV/EBITDA",
            Metric::Revenue => "EV/Revenue",
        }
    }

    fn of(self, profile: &CompanyProfile) -> Option<f64> {
        let value = match self {
            Metric::Ebitda => profile.ebitda?,
            Metric::Revenue => profile.revenue?,
        };
        (value > 0.0).then_some(value)
    }
}

/// One peer's contribution to the implied range
#[derive(Debug, Clone)]
struct PeerRow {
    ticker: String,
    metric: Metric,
    multiple: f64,
    implied_ev: f64,
}

/// Peer-multiple comparable-company model
#[derive(Debug, Clone)]
pub struct CompsModel {
    /// Usable-peer count below which confidence is capped
    pub min_peers: usize,
}

impl Default for CompsModel {
    fn default() -> Self {
        Self {
            min_peers: DEFAULT_MIN_PEERS,
        }
    }
}

impl CompsModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_peers(min_peers: usize) -> Self {
        Self { min_peers }
    }

    /// Metric to price `peer` against `target` with, honoring the
    /// requested selection. `Auto` prefers EV/EBITDA when both sides
    /// report positive EBITDA and falls back to EV/Revenue.
    fn resolve_metric(
        selection: MultipleSelection,
        target: &CompanyProfile,
        peer: &CompanyProfile,
    ) -> Option<Metric> {
        match selection {
            MultipleSelection::EvEbitda => Some(Metric::Ebitda),
            MultipleSelection::EvRevenue => Some(Metric::Revenue),
            MultipleSelection::Auto => {
                if Metric::Ebitda.of(target).is_some() && Metric::Ebitda.of(peer).is_some() {
                    Some(Metric::Ebitda)
                } else if Metric::Revenue.of(target).is_some()
                    && Metric::Revenue.of(peer).is_some()
                {
                    Some(Metric::Revenue)
                } else {
                    None
                }
            }
        }
    }

    /// Value `target` against `peers` under `assumptions`.
    ///
    /// `MissingData` when the target lacks the requested metric,
    /// `NoViableValuation` when no peer yields a usable multiple. A
    /// below-minimum peer set is a confidence signal, not a failure.
    pub fn value(
        &self,
        target: &CompanyProfile,
        peers: &[CompanyProfile],
        assumptions: &ValuationAssumptions,
    ) -> Result<ModelEstimate> {
        assumptions.validate()?;

        // Fail fast when a pinned selection has nothing to price against
        let pinned = match assumptions.multiple {
            MultipleSelection::EvEbitda => Some(Metric::Ebitda),
            MultipleSelection::EvRevenue => Some(Metric::Revenue),
            MultipleSelection::Auto => None,
        };
        if let Some(metric) = pinned {
            if metric.of(target).is_none() {
                return Err(ValuationError::MissingData(format!(
                    "{} has no positive {} denominator",
                    target.ticker,
                    metric.label()
                )));
            }
        } else if Metric::Ebitda.of(target).is_none() && Metric::Revenue.of(target).is_none() {
            return Err(ValuationError::MissingData(format!(
                "{} reports neither positive EBITDA nor positive revenue",
                target.ticker
            )));
        }

        let mut rows: Vec<PeerRow> = Vec::with_capacity(peers.len());
        for peer in peers {
            let Some(metric) = Self::resolve_metric(assumptions.multiple, target, peer) else {
                debug!(peer = %peer.ticker, "No shared metric with target");
                continue;
            };
            let (Some(peer_ev), Some(peer_metric)) = (peer.enterprise_value(), metric.of(peer))
            else {
                debug!(peer = %peer.ticker, "Peer lacks enterprise value or metric");
                continue;
            };
            let Some(target_metric) = metric.of(target) else {
                continue;
            };
            let multiple = peer_ev / peer_metric;
            rows.push(PeerRow {
                ticker: peer.ticker.clone(),
                metric,
                multiple,
                implied_ev: multiple * target_metric,
            });
        }

        if rows.is_empty() {
            return Err(ValuationError::NoViableValuation(format!(
                "No usable peer multiples for {}",
                target.ticker
            )));
        }

        let mut implied: Vec<f64> = rows.iter().map(|row| row.implied_ev).collect();
        implied.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = metrics::median_sorted(&implied);
        let p25 = metrics::percentile_sorted(&implied, 25.0);
        let p75 = metrics::percentile_sorted(&implied, 75.0);
        let mean_multiple = rows.iter().map(|row| row.multiple).mean();

        let usable = rows.len();
        let coverage = usable as f64 / peers.len() as f64;
        let confidence = self.confidence(usable, coverage);
        if usable < self.min_peers {
            warn!(
                target = %target.ticker,
                usable,
                min_peers = self.min_peers,
                "Peer set below minimum; confidence capped"
            );
        }

        Ok(ModelEstimate {
            model: MODEL_NAME.to_string(),
            enterprise_value: median,
            confidence,
            detail: json!({
                "peers": rows
                    .iter()
                    .map(|row| {
                        json!({
                            "ticker": row.ticker,
                            "metric": row.metric.label(),
                            "multiple": row.multiple,
                            "implied_ev": row.implied_ev,
                        })
                    })
                    .collect::<Vec<_>>(),
                "implied_band": { "p25": p25, "median": median, "p75": p75 },
                "mean_multiple": mean_multiple,
                "usable_peers": usable,
                "supplied_peers": peers.len(),
                "metric_coverage": coverage,
            }),
        })
    }

    /// Confidence from peer count and metric coverage: the count term
    /// grows linearly to [`SATURATION_PEERS`], coverage scales it, and
    /// a below-minimum set is capped at [`LOW_PEER_CONFIDENCE_CAP`].
    fn confidence(&self, usable: usize, coverage: f64) -> f64 {
        let count_term = (usable as f64 / SATURATION_PEERS as f64).min(1.0);
        let raw = count_term * (0.5 + 0.5 * coverage);
        if usable < self.min_peers {
            raw.min(LOW_PEER_CONFIDENCE_CAP)
        } else {
            raw
        }
    }
}

impl ValuationModel for CompsModel {
    fn name(&self) -> &'static str {
        MODEL_NAME
    }

    fn value(&self, ctx: &ValuationContext<'_>) -> Result<ModelEstimate> {
        CompsModel::value(self, ctx.target, ctx.peers, ctx.assumptions)
    }
}
