//! Configuration types for feature derivation and outlier filtering.
//!
//! Both configurations use the builder pattern and validate on `build()`.
//! They derive serde traits so they can be loaded from a JSON file.

use crate::schema::application;
use crate::types::FeatureStep;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a derived feature table is merged into the applicant table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Keep only applicants from the base table.
    Left,
    /// Keep applicants from either side; ids found only in the feature
    /// table become new rows.
    Outer,
}

impl MergeStrategy {
    /// Whether the merge can add applicants absent from the base table.
    pub fn may_introduce_rows(&self) -> bool {
        matches!(self, Self::Outer)
    }
}

/// Per-step merge strategies.
///
/// The defaults produce the standard feature set. Outer merges can add
/// rows for applicants missing from the base table, so changing the mix
/// changes the output row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    pub closed_bureau_credits: MergeStrategy,
    pub bureau_debt_ratio: MergeStrategy,
    pub bureau_card_limit: MergeStrategy,
    pub card_rollup: MergeStrategy,
    pub prev_approval_ratio: MergeStrategy,
    pub prev_contract_status: MergeStrategy,
    pub prev_yield_groups: MergeStrategy,
}

impl Default for MergePlan {
    fn default() -> Self {
        Self {
            closed_bureau_credits: MergeStrategy::Outer,
            bureau_debt_ratio: MergeStrategy::Outer,
            bureau_card_limit: MergeStrategy::Outer,
            card_rollup: MergeStrategy::Left,
            prev_approval_ratio: MergeStrategy::Left,
            prev_contract_status: MergeStrategy::Outer,
            prev_yield_groups: MergeStrategy::Outer,
        }
    }
}

impl MergePlan {
    /// Every merge uses the same strategy.
    pub fn uniform(strategy: MergeStrategy) -> Self {
        Self {
            closed_bureau_credits: strategy,
            bureau_debt_ratio: strategy,
            bureau_card_limit: strategy,
            card_rollup: strategy,
            prev_approval_ratio: strategy,
            prev_contract_status: strategy,
            prev_yield_groups: strategy,
        }
    }

    /// The strategy for a step, or `None` if the step does not merge.
    pub fn strategy_for(&self, step: FeatureStep) -> Option<MergeStrategy> {
        match step {
            FeatureStep::ClosedBureauCredits => Some(self.closed_bureau_credits),
            FeatureStep::BureauDebtRatio => Some(self.bureau_debt_ratio),
            FeatureStep::BureauCardLimit => Some(self.bureau_card_limit),
            FeatureStep::CardRollup => Some(self.card_rollup),
            FeatureStep::PrevApprovalRatio => Some(self.prev_approval_ratio),
            FeatureStep::PrevContractStatus => Some(self.prev_contract_status),
            FeatureStep::PrevYieldGroups => Some(self.prev_yield_groups),
            _ => None,
        }
    }

    fn slot_mut(&mut self, step: FeatureStep) -> Option<&mut MergeStrategy> {
        match step {
            FeatureStep::ClosedBureauCredits => Some(&mut self.closed_bureau_credits),
            FeatureStep::BureauDebtRatio => Some(&mut self.bureau_debt_ratio),
            FeatureStep::BureauCardLimit => Some(&mut self.bureau_card_limit),
            FeatureStep::CardRollup => Some(&mut self.card_rollup),
            FeatureStep::PrevApprovalRatio => Some(&mut self.prev_approval_ratio),
            FeatureStep::PrevContractStatus => Some(&mut self.prev_contract_status),
            FeatureStep::PrevYieldGroups => Some(&mut self.prev_yield_groups),
            _ => None,
        }
    }
}

/// Applicant columns one-hot encoded in the last step.
pub const DEFAULT_CATEGORICAL_COLUMNS: [&str; 6] = [
    application::NAME_CONTRACT_TYPE,
    application::CODE_GENDER,
    application::FLAG_OWN_CAR,
    application::NAME_INCOME_TYPE,
    application::NAME_EDUCATION_TYPE,
    application::NAME_FAMILY_STATUS,
];

/// Yield groups kept as `prev_yield_*` totals. `XNA`, `low_normal` and
/// `middle` are dropped.
pub const DEFAULT_RETAINED_YIELD_GROUPS: [&str; 2] = ["high", "low_action"];

/// Configuration for [`crate::FeatureBuilder`].
///
/// # Example
///
/// ```rust,ignore
/// use credit_features::config::{FeatureConfig, MergeStrategy};
/// use credit_features::FeatureStep;
///
/// let config = FeatureConfig::builder()
///     .merge_strategy(FeatureStep::PrevContractStatus, MergeStrategy::Left)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Value meaning "not applicable" in `DAYS_EMPLOYED`.
    /// Default: 365243
    pub days_employed_sentinel: i64,

    /// Value written over the sentinel.
    /// Default: 365
    pub days_employed_placeholder: i64,

    /// `CREDIT_ACTIVE` label counted as closed.
    /// Default: "Closed"
    pub closed_status: String,

    /// `NAME_CONTRACT_STATUS` label counted as approved.
    /// Default: "Approved"
    pub approved_status: String,

    /// `NAME_CONTRACT_STATUS` label counted as refused.
    /// Default: "Refused"
    pub refused_status: String,

    /// `NAME_YIELD_GROUP` values kept as totals.
    pub retained_yield_groups: Vec<String>,

    /// Applicant columns replaced by indicator columns.
    pub categorical_columns: Vec<String>,

    /// Join type of every merge step.
    pub merges: MergePlan,

    /// Sort the final table by `SK_ID_CURR`.
    /// Default: true
    pub sort_by_client_id: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            days_employed_sentinel: 365_243,
            days_employed_placeholder: 365,
            closed_status: "Closed".to_string(),
            approved_status: "Approved".to_string(),
            refused_status: "Refused".to_string(),
            retained_yield_groups: DEFAULT_RETAINED_YIELD_GROUPS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            categorical_columns: DEFAULT_CATEGORICAL_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            merges: MergePlan::default(),
            sort_by_client_id: true,
        }
    }
}

impl FeatureConfig {
    /// Create a new configuration builder.
    pub fn builder() -> FeatureConfigBuilder {
        FeatureConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("closed_status", &self.closed_status),
            ("approved_status", &self.approved_status),
            ("refused_status", &self.refused_status),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyLabel(field.to_string()));
            }
        }

        if self.retained_yield_groups.iter().any(|g| g.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyLabel(
                "retained_yield_groups".to_string(),
            ));
        }

        check_unique("categorical_columns", &self.categorical_columns)?;
        check_unique("retained_yield_groups", &self.retained_yield_groups)?;

        Ok(())
    }
}

fn check_unique(field: &str, values: &[String]) -> Result<(), ConfigValidationError> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.as_str()) {
            return Err(ConfigValidationError::DuplicateEntry {
                field: field.to_string(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Label '{0}' must not be empty")]
    EmptyLabel(String),

    #[error("Duplicate entry '{value}' in '{field}'")]
    DuplicateEntry { field: String, value: String },

    #[error("Step '{0}' does not merge into the applicant table")]
    NotAMergeStep(FeatureStep),

    #[error("Invalid IQR multiplier: {0} (must be finite and non-negative)")]
    InvalidMultiplier(f64),
}

/// Builder for [`FeatureConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct FeatureConfigBuilder {
    days_employed_sentinel: Option<i64>,
    days_employed_placeholder: Option<i64>,
    closed_status: Option<String>,
    approved_status: Option<String>,
    refused_status: Option<String>,
    retained_yield_groups: Option<Vec<String>>,
    categorical_columns: Option<Vec<String>>,
    merges: Option<MergePlan>,
    merge_overrides: Vec<(FeatureStep, MergeStrategy)>,
    sort_by_client_id: Option<bool>,
}

impl FeatureConfigBuilder {
    /// Set the `DAYS_EMPLOYED` sentinel and its replacement.
    pub fn days_employed_sentinel(mut self, sentinel: i64, placeholder: i64) -> Self {
        self.days_employed_sentinel = Some(sentinel);
        self.days_employed_placeholder = Some(placeholder);
        self
    }

    pub fn closed_status(mut self, label: impl Into<String>) -> Self {
        self.closed_status = Some(label.into());
        self
    }

    pub fn approved_status(mut self, label: impl Into<String>) -> Self {
        self.approved_status = Some(label.into());
        self
    }

    pub fn refused_status(mut self, label: impl Into<String>) -> Self {
        self.refused_status = Some(label.into());
        self
    }

    /// Set which yield groups are kept as `prev_yield_*` totals.
    pub fn retained_yield_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retained_yield_groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Set which applicant columns are one-hot encoded.
    pub fn categorical_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the whole merge plan.
    pub fn merges(mut self, plan: MergePlan) -> Self {
        self.merges = Some(plan);
        self
    }

    /// Override the merge strategy of a single step.
    ///
    /// Applied after [`merges`](Self::merges). `build()` fails if `step`
    /// does not merge.
    pub fn merge_strategy(mut self, step: FeatureStep, strategy: MergeStrategy) -> Self {
        self.merge_overrides.push((step, strategy));
        self
    }

    pub fn sort_by_client_id(mut self, sort: bool) -> Self {
        self.sort_by_client_id = Some(sort);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<FeatureConfig, ConfigValidationError> {
        let defaults = FeatureConfig::default();

        let mut merges = self.merges.unwrap_or(defaults.merges);
        for (step, strategy) in self.merge_overrides {
            let slot = merges
                .slot_mut(step)
                .ok_or(ConfigValidationError::NotAMergeStep(step))?;
            *slot = strategy;
        }

        let config = FeatureConfig {
            days_employed_sentinel: self
                .days_employed_sentinel
                .unwrap_or(defaults.days_employed_sentinel),
            days_employed_placeholder: self
                .days_employed_placeholder
                .unwrap_or(defaults.days_employed_placeholder),
            closed_status: self.closed_status.unwrap_or(defaults.closed_status),
            approved_status: self.approved_status.unwrap_or(defaults.approved_status),
            refused_status: self.refused_status.unwrap_or(defaults.refused_status),
            retained_yield_groups: self
                .retained_yield_groups
                .unwrap_or(defaults.retained_yield_groups),
            categorical_columns: self
                .categorical_columns
                .unwrap_or(defaults.categorical_columns),
            merges,
            sort_by_client_id: self.sort_by_client_id.unwrap_or(defaults.sort_by_client_id),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration for [`crate::OutlierFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFilterConfig {
    /// Columns whose bounds are learned during `fit`.
    pub columns: Vec<String>,

    /// Width of the inlier band in IQRs beyond each quartile.
    /// Default: 1.5
    pub iqr_multiplier: f64,
}

impl OutlierFilterConfig {
    pub const DEFAULT_MULTIPLIER: f64 = 1.5;

    pub fn builder() -> OutlierFilterConfigBuilder {
        OutlierFilterConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigValidationError::InvalidMultiplier(self.iqr_multiplier));
        }
        check_unique("columns", &self.columns)
    }
}

/// Builder for [`OutlierFilterConfig`].
#[derive(Debug, Default)]
pub struct OutlierFilterConfigBuilder {
    columns: Vec<String>,
    iqr_multiplier: Option<f64>,
}

impl OutlierFilterConfigBuilder {
    /// Add a column to check for outliers.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Add several columns to check for outliers.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    pub fn build(self) -> Result<OutlierFilterConfig, ConfigValidationError> {
        let config = OutlierFilterConfig {
            columns: self.columns,
            iqr_multiplier: self
                .iqr_multiplier
                .unwrap_or(OutlierFilterConfig::DEFAULT_MULTIPLIER),
        };
        config.validate()?;
        Ok(config)
    }
}
