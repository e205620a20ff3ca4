use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four raw tables consumed by [`crate::FeatureBuilder`].
///
/// The loan-to-applicant link is read from the `SK_ID_CURR`/`SK_ID_PREV`
/// columns of `card_balance`, so no fifth table is needed.
#[derive(Debug, Clone)]
pub struct SourceTables {
    /// One row per applicant.
    pub application: DataFrame,
    /// One row per (applicant, external credit).
    pub bureau: DataFrame,
    /// One row per (previous loan, statement period).
    pub card_balance: DataFrame,
    /// One row per prior loan application.
    pub previous_application: DataFrame,
}

impl SourceTables {
    pub fn new(
        application: DataFrame,
        bureau: DataFrame,
        card_balance: DataFrame,
        previous_application: DataFrame,
    ) -> Self {
        Self {
            application,
            bureau,
            card_balance,
            previous_application,
        }
    }
}

/// The fixed sequence of feature derivation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStep {
    /// Replace the employment-duration sentinel
    CleanDaysEmployed,
    /// Count closed bureau credits
    ClosedBureauCredits,
    /// Average bureau debt-to-credit ratio
    BureauDebtRatio,
    /// Total bureau credit-card limit
    BureauCardLimit,
    /// Per-loan card balance / limit
    CardUsageRatio,
    /// Per-loan ATM drawings
    CardAtmDrawings,
    /// Roll card aggregates up to the applicant
    CardRollup,
    /// Average approved / requested amount
    PrevApprovalRatio,
    /// Approved and refused counts
    PrevContractStatus,
    /// Yield-group totals
    PrevYieldGroups,
    /// One-hot encode applicant categoricals
    EncodeCategoricals,
}

impl FeatureStep {
    /// All steps in execution order.
    pub const ALL: [FeatureStep; 11] = [
        Self::CleanDaysEmployed,
        Self::ClosedBureauCredits,
        Self::BureauDebtRatio,
        Self::BureauCardLimit,
        Self::CardUsageRatio,
        Self::CardAtmDrawings,
        Self::CardRollup,
        Self::PrevApprovalRatio,
        Self::PrevContractStatus,
        Self::PrevYieldGroups,
        Self::EncodeCategoricals,
    ];

    /// Returns a human-readable name for the step.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CleanDaysEmployed => "Cleaning DAYS_EMPLOYED",
            Self::ClosedBureauCredits => "Counting Closed Bureau Credits",
            Self::BureauDebtRatio => "Averaging Bureau Debt Ratio",
            Self::BureauCardLimit => "Totalling Bureau Card Limit",
            Self::CardUsageRatio => "Averaging Card Usage Ratio",
            Self::CardAtmDrawings => "Averaging Card ATM Drawings",
            Self::CardRollup => "Rolling Up Card Features",
            Self::PrevApprovalRatio => "Averaging Approval Ratio",
            Self::PrevContractStatus => "Counting Contract Statuses",
            Self::PrevYieldGroups => "Totalling Yield Groups",
            Self::EncodeCategoricals => "Encoding Categoricals",
        }
    }
}

impl fmt::Display for FeatureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Record of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: FeatureStep,
    /// Row count of the applicant table after the step.
    pub rows_after: usize,
    /// Rows added by an outer merge for ids absent from the base table.
    pub rows_introduced: usize,
    /// Derived columns the step added.
    pub columns_added: Vec<String>,
}

/// What a [`crate::FeatureBuilder`] run did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    /// Applicant rows in the base table.
    pub applicants_in: usize,
    /// Rows in the final feature table.
    pub rows_out: usize,
    /// Columns in the final feature table.
    pub columns_out: usize,
    pub steps: Vec<StepRecord>,
    pub warnings: Vec<String>,
}

impl BuildSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Rows present in the output but not in the base applicant table.
    pub fn foreign_rows(&self) -> usize {
        self.steps.iter().map(|s| s.rows_introduced).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(FeatureStep::ALL[0], FeatureStep::CleanDaysEmployed);
        assert_eq!(FeatureStep::ALL[10], FeatureStep::EncodeCategoricals);
    }

    #[test]
    fn test_foreign_rows_sums_steps() {
        let mut summary = BuildSummary::new();
        summary.add_step(StepRecord {
            step: FeatureStep::ClosedBureauCredits,
            rows_after: 3,
            rows_introduced: 1,
            columns_added: vec!["num_closed_bureau_credits".to_string()],
        });
        summary.add_step(StepRecord {
            step: FeatureStep::PrevContractStatus,
            rows_after: 5,
            rows_introduced: 2,
            columns_added: vec![],
        });
        assert_eq!(summary.foreign_rows(), 3);
    }

    #[test]
    fn test_step_serialization() {
        let json = serde_json::to_string(&FeatureStep::CardRollup).unwrap();
        assert_eq!(json, "\"card_rollup\"");
    }
}
