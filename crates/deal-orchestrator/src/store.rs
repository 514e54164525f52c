//! In-memory profile store, for tests and embedding without a data layer.

use std::collections::HashMap;

use async_trait::async_trait;
use deal_core::{CompanyProfile, ProfileStore, Result, ValuationError};

/// [`ProfileStore`] backed by a map of pre-loaded profiles
#[derive(Debug, Default, Clone)]
pub struct InMemoryProfileStore {
    profiles: HashMap<String, CompanyProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile, keyed by its ticker
    pub fn insert(&mut self, profile: CompanyProfile) {
        self.profiles.insert(profile.ticker.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<CompanyProfile> for InMemoryProfileStore {
    fn from_iter<I: IntoIterator<Item = CompanyProfile>>(iter: I) -> Self {
        let mut store = Self::new();
        for profile in iter {
            store.insert(profile);
        }
        store
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, ticker: &str) -> Result<CompanyProfile> {
        self.profiles
            .get(ticker)
            .cloned()
            .ok_or_else(|| ValuationError::NotFound(format!("No profile for {}", ticker)))
    }

    async fn get_peers(
        &self,
        sector: &str,
        exclude: &str,
    ) -> Result<Vec<CompanyProfile>> {
        let mut peers: Vec<CompanyProfile> = self
            .profiles
            .values()
            .filter(|p| p.sector.as_deref() == Some(sector) && p.ticker != exclude)
            .cloned()
            .collect();
        // Map iteration order is arbitrary; keep the result deterministic
        peers.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(peers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(ticker: &str, sector: Option<&str>) -> CompanyProfile {
        CompanyProfile {
            ticker: ticker.to_string(),
            name: None,
            sector: sector.map(|s| s.to_string()),
            industry: None,
            market_cap: Some(1_000.0),
            revenue: None,
            ebitda: None,
            revenue_growth: None,
            beta: None,
            net_debt: None,
            fcf_history: vec![],
            price_returns: vec![],
        }
    }

    #[tokio::test]
    async fn test_get_profile_and_not_found() {
        let store: InMemoryProfileStore =
            [profile("AAA", Some("Technology"))].into_iter().collect();
        assert_eq!(store.get_profile("AAA").await.unwrap().ticker, "AAA");
        match store.get_profile("BBB").await {
            Err(ValuationError::NotFound(msg)) => assert!(msg.contains("BBB")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_peers_filters_and_sorts() {
        let store: InMemoryProfileStore = [
            profile("ZZZ", Some("Technology")),
            profile("AAA", Some("Technology")),
            profile("TGT", Some("Technology")),
            profile("OIL", Some("Energy")),
            profile("NOS", None),
        ]
        .into_iter()
        .collect();

        let peers = store.get_peers("Technology", "TGT").await.unwrap();
        let tickers: Vec<&str> = peers.iter().map(|p| p.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAA", "ZZZ"]);
    }
}
