use async_trait::async_trait;

use crate::{CompanyProfile, ModelEstimate, Result, ValuationAssumptions};

/// Read-only source of company fundamentals, implemented by the data layer.
/// The engine never mutates or caches what it returns.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, ticker: &str) -> Result<CompanyProfile>;

    /// Companies trading in `sector`, excluding `exclude` itself
    async fn get_peers(&self, sector: &str, exclude: &str) -> Result<Vec<CompanyProfile>>;
}

/// Borrowed inputs for one model run
#[derive(Debug, Clone, Copy)]
pub struct ValuationContext<'a> {
    pub target: &'a CompanyProfile,
    pub peers: &'a [CompanyProfile],
    pub assumptions: &'a ValuationAssumptions,
}

/// A valuation model the ensemble stage can blend
pub trait ValuationModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn value(&self, ctx: &ValuationContext<'_>) -> Result<ModelEstimate>;
}
