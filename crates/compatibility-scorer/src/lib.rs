//! Pairwise Acquirer/Target Compatibility Scoring
//!
//! Ranks candidate targets for an acquirer on a transparent 0-100
//! composite. Weights and sub-scores stay visible so a ranking can be
//! audited line by line.

pub mod scorer;
pub mod sector;

pub use scorer::{
    capacity_score, correlation_score, growth_score, size_score, CompatibilityInputs,
    CompatibilityScorer, ScorerWeights,
};
pub use sector::SectorRelation;
