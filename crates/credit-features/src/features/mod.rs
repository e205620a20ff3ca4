//! Applicant feature derivation.
//!
//! Each submodule covers one source table and returns per-applicant
//! aggregates as [`merge::DerivedFeatures`]; [`FeatureBuilder`] runs the
//! steps in order and merges the results into the applicant table.

pub mod applicant;
pub mod bureau;
mod builder;
pub mod card_balance;
pub mod merge;
pub mod previous;

pub use builder::FeatureBuilder;
pub use merge::{DerivedFeatures, MergeOutcome, NullFill};
