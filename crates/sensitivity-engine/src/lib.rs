//! Sensitivity Engine
//!
//! Reruns the DCF across a grid of perturbed (WACC, growth) assumption
//! pairs. Cells are independent, so the grid is evaluated in parallel;
//! placement comes from positional indices, never completion order. A
//! cell whose perturbed assumptions break the Gordon-growth validity
//! constraint is recorded as undefined rather than aborting the sweep.

use dcf_valuation::DcfModel;
use deal_core::{CompanyProfile, Result, SensitivityGrid, ValuationAssumptions, ValuationError};
use rayon::prelude::*;
use tracing::info;

/// Default WACC perturbations, in absolute rate offsets
pub const DEFAULT_WACC_OFFSETS: [f64; 5] = [-0.02, -0.01, 0.0, 0.01, 0.02];
/// Default growth perturbations, applied to the growth path and the
/// terminal rate together
pub const DEFAULT_GROWTH_OFFSETS: [f64; 5] = [-0.01, -0.005, 0.0, 0.005, 0.01];

/// Perturbation axes for one sweep; rows vary WACC, columns vary growth
#[derive(Debug, Clone)]
pub struct SweepAxes {
    pub wacc_offsets: Vec<f64>,
    pub growth_offsets: Vec<f64>,
}

impl Default for SweepAxes {
    fn default() -> Self {
        Self {
            wacc_offsets: DEFAULT_WACC_OFFSETS.to_vec(),
            growth_offsets: DEFAULT_GROWTH_OFFSETS.to_vec(),
        }
    }
}

impl SweepAxes {
    fn validate(&self) -> Result<()> {
        if self.wacc_offsets.is_empty() || self.growth_offsets.is_empty() {
            return Err(ValuationError::InvalidAssumptions(
                "Sweep axes must not be empty".to_string(),
            ));
        }
        if self
            .wacc_offsets
            .iter()
            .chain(&self.growth_offsets)
            .any(|o| !o.is_finite())
        {
            return Err(ValuationError::InvalidAssumptions(
                "Sweep offsets must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// `base` with one cell's offsets applied; `None` when the perturbed
/// pair violates the DCF validity constraint
fn perturbed(
    base: &ValuationAssumptions,
    wacc_offset: f64,
    growth_offset: f64,
) -> Option<ValuationAssumptions> {
    let wacc = base.wacc + wacc_offset;
    let terminal_growth = base.terminal_growth + growth_offset;
    if wacc <= 0.0 || wacc >= 1.0 || wacc <= terminal_growth {
        return None;
    }
    Some(ValuationAssumptions {
        wacc,
        terminal_growth,
        horizon_years: base.horizon_years,
        growth_path: base.growth_path.shifted(growth_offset),
        multiple: base.multiple,
    })
}

/// Sweep the DCF for `target` over `axes` around `base`.
///
/// The base assumptions are validated (and the unperturbed DCF run)
/// up front, so a target the model cannot value at all fails here
/// instead of producing an all-undefined grid. The center cell of a
/// zero-offset axis pair equals the unperturbed estimate exactly.
pub fn sweep(
    target: &CompanyProfile,
    base: &ValuationAssumptions,
    axes: &SweepAxes,
) -> Result<SensitivityGrid> {
    base.validate()?;
    axes.validate()?;

    let model = DcfModel::new();
    model.value(target, base)?;

    info!(
        target = %target.ticker,
        rows = axes.wacc_offsets.len(),
        cols = axes.growth_offsets.len(),
        "Running sensitivity sweep"
    );

    let cols = axes.growth_offsets.len();
    let cells: Vec<Option<f64>> = (0..axes.wacc_offsets.len() * cols)
        .into_par_iter()
        .map(|idx| {
            let wacc_offset = axes.wacc_offsets[idx / cols];
            let growth_offset = axes.growth_offsets[idx % cols];
            let assumptions = perturbed(base, wacc_offset, growth_offset)?;
            model
                .value(target, &assumptions)
                .ok()
                .map(|estimate| estimate.enterprise_value)
        })
        .collect();

    Ok(SensitivityGrid {
        row_label: "WACC offset".to_string(),
        col_label: "Growth offset".to_string(),
        row_offsets: axes.wacc_offsets.clone(),
        col_offsets: axes.growth_offsets.clone(),
        values: cells.chunks(cols).map(|row| row.to_vec()).collect(),
    })
}
