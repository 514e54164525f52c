//! Sector taxonomy for fit scoring.
//!
//! Adjacency is a flat pair table rather than a hierarchy, so the fit
//! score stays data-driven and easy to audit against the coverage
//! universe. Matching is case-insensitive and symmetric.

/// Sector pairs at taxonomy distance one
const ADJACENT_SECTORS: &[(&str, &str)] = &[
    ("technology", "communications"),
    ("technology", "consumer cyclical"),
    ("technology", "healthcare"),
    ("technology", "financial"),
    ("technology", "industrial"),
    ("healthcare", "consumer defensive"),
    ("financial", "real estate"),
    ("consumer cyclical", "consumer defensive"),
    ("industrial", "materials"),
];

/// Industry pairs within one sector that reinforce each other
const COMPLEMENTARY_INDUSTRIES: &[(&str, &str)] = &[
    ("software", "semiconductors"),
    ("software", "hardware"),
    ("hardware", "semiconductors"),
];

/// Taxonomy relation between an acquirer and a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorRelation {
    /// Same sector and same industry
    ExactMatch,
    /// Same sector, industries that reinforce each other
    ComplementaryIndustry,
    /// Same sector, otherwise unrelated industries
    SameSector,
    /// Different sectors at taxonomy distance one
    AdjacentSector,
    /// No taxonomy link
    Unrelated,
}

impl SectorRelation {
    /// Sub-score for the relation on the 0-100 scale. Unrelated keeps a
    /// floor above zero so diversification plays can still surface.
    pub fn score(&self) -> f64 {
        match self {
            SectorRelation::ExactMatch => 100.0,
            SectorRelation::ComplementaryIndustry => 85.0,
            SectorRelation::SameSector => 70.0,
            SectorRelation::AdjacentSector => 45.0,
            SectorRelation::Unrelated => 20.0,
        }
    }
}

/// Classify the taxonomy relation between two companies
pub fn classify(
    acq_sector: &str,
    acq_industry: Option<&str>,
    tgt_sector: &str,
    tgt_industry: Option<&str>,
) -> SectorRelation {
    let acq_sector = acq_sector.trim().to_lowercase();
    let tgt_sector = tgt_sector.trim().to_lowercase();

    if acq_sector == tgt_sector {
        return match (normalize(acq_industry), normalize(tgt_industry)) {
            (Some(a), Some(t)) if a == t => SectorRelation::ExactMatch,
            (Some(a), Some(t)) if pair_in(COMPLEMENTARY_INDUSTRIES, &a, &t) => {
                SectorRelation::ComplementaryIndustry
            }
            _ => SectorRelation::SameSector,
        };
    }
    if pair_in(ADJACENT_SECTORS, &acq_sector, &tgt_sector) {
        SectorRelation::AdjacentSector
    } else {
        SectorRelation::Unrelated
    }
}

fn normalize(industry: Option<&str>) -> Option<String> {
    industry
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
}

fn pair_in(table: &[(&str, &str)], a: &str, b: &str) -> bool {
    table
        .iter()
        .any(|(x, y)| (*x == a && *y == b) || (*x == b && *y == a))
}
