/// Shared financial math used across the valuation engines.
///
/// Rates are decimal fractions (0.10 = 10%) and monetary values share
/// whatever reporting currency the profile store supplies.

/// Risk-free rate assumed by the CAPM derivation.
pub const RISK_FREE_RATE: f64 = 0.04;
/// Equity market risk premium assumed by the CAPM derivation.
pub const MARKET_RISK_PREMIUM: f64 = 0.06;
/// Spread over the risk-free rate assumed for the cost of debt.
pub const DEBT_SPREAD: f64 = 0.02;
/// Capital-structure debt share assumed when deriving WACC.
pub const DEBT_RATIO: f64 = 0.30;
/// Marginal tax rate applied to the debt shield.
pub const TAX_RATE: f64 = 0.25;
/// Discount rate used when beta is unavailable.
pub const FALLBACK_WACC: f64 = 0.10;

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Value at percentile `p` (0-100 scale) of an ascending-sorted slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Median of an ascending-sorted slice. Unlike the nearest-rank
/// percentile above, an even length averages the two middle values.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Compound annual growth rate between two positive endpoints.
/// Returns `None` when either endpoint is non-positive or the span is zero.
pub fn cagr(start: f64, end: f64, years: f64) -> Option<f64> {
    if start <= 0.0 || end <= 0.0 || years <= 0.0 {
        return None;
    }
    Some((end / start).powf(1.0 / years) - 1.0)
}

/// Pearson correlation over the most recent overlapping window of two
/// return series. Returns `None` when the overlap is shorter than
/// `min_overlap` or either window has no variance.
pub fn return_correlation(a: &[f64], b: &[f64], min_overlap: usize) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < min_overlap.max(2) {
        return None;
    }
    let a = &a[a.len() - n..];
    let b = &b[b.len() - n..];
    let ma = mean(a);
    let mb = mean(b);
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - ma;
        let db = b[i] - mb;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a < f64::EPSILON || var_b < f64::EPSILON {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Weighted average cost of capital derived from beta via CAPM.
/// Falls back to [`FALLBACK_WACC`] when beta is unknown.
pub fn capm_wacc(beta: Option<f64>) -> f64 {
    let Some(beta) = beta else {
        return FALLBACK_WACC;
    };
    if !beta.is_finite() {
        return FALLBACK_WACC;
    }
    let cost_of_equity = RISK_FREE_RATE + beta * MARKET_RISK_PREMIUM;
    let cost_of_debt = RISK_FREE_RATE + DEBT_SPREAD;
    cost_of_equity * (1.0 - DEBT_RATIO) + cost_of_debt * (1.0 - TAX_RATE) * DEBT_RATIO
}
