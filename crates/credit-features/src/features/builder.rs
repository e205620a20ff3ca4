//! Orchestration of the feature derivation steps.

use super::merge::{DerivedFeatures, merge_features};
use super::{applicant, bureau, card_balance, previous};
use crate::config::{FeatureConfig, MergeStrategy};
use crate::error::{Result, ResultExt};
use crate::schema::{self, CLIENT_ID, LOAN_ID};
use crate::types::{BuildSummary, FeatureStep, SourceTables, StepRecord};
use crate::utils::{has_column, require_columns};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Columns each step reads, by table.
const REQUIREMENTS: [(FeatureStep, &str, &[&str]); 10] = [
    (
        FeatureStep::CleanDaysEmployed,
        "application",
        &[CLIENT_ID, schema::application::DAYS_EMPLOYED],
    ),
    (
        FeatureStep::ClosedBureauCredits,
        "bureau",
        &[CLIENT_ID, schema::bureau::CREDIT_ACTIVE],
    ),
    (
        FeatureStep::BureauDebtRatio,
        "bureau",
        &[
            CLIENT_ID,
            schema::bureau::AMT_CREDIT_SUM_DEBT,
            schema::bureau::AMT_CREDIT_SUM,
        ],
    ),
    (
        FeatureStep::BureauCardLimit,
        "bureau",
        &[CLIENT_ID, schema::bureau::AMT_CREDIT_SUM_LIMIT],
    ),
    (
        FeatureStep::CardUsageRatio,
        "card_balance",
        &[
            LOAN_ID,
            schema::card_balance::AMT_BALANCE,
            schema::card_balance::AMT_CREDIT_LIMIT_ACTUAL,
        ],
    ),
    (
        FeatureStep::CardAtmDrawings,
        "card_balance",
        &[LOAN_ID, schema::card_balance::CNT_DRAWINGS_ATM_CURRENT],
    ),
    (
        FeatureStep::CardRollup,
        "card_balance",
        &[CLIENT_ID, LOAN_ID],
    ),
    (
        FeatureStep::PrevApprovalRatio,
        "previous_application",
        &[
            CLIENT_ID,
            schema::previous_application::AMT_APPLICATION,
            schema::previous_application::AMT_CREDIT,
        ],
    ),
    (
        FeatureStep::PrevContractStatus,
        "previous_application",
        &[CLIENT_ID, schema::previous_application::NAME_CONTRACT_STATUS],
    ),
    (
        FeatureStep::PrevYieldGroups,
        "previous_application",
        &[CLIENT_ID, schema::previous_application::NAME_YIELD_GROUP],
    ),
];

/// Builds the applicant feature table from the four source tables.
///
/// The builder holds only its configuration; every call to
/// [`build`](Self::build) is a pure function of the input tables.
///
/// # Example
///
/// ```rust,ignore
/// use credit_features::{FeatureBuilder, FeatureConfig, SourceTables};
///
/// let tables = SourceTables::new(application, bureau, card_balance, previous);
/// let features = FeatureBuilder::new(FeatureConfig::default()).build(&tables)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    config: FeatureConfig,
}

static_assertions::assert_impl_all!(FeatureBuilder: Send, Sync);

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Build the feature table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FeatureError::MissingColumn`] before any work is
    /// done if a source table lacks a column some step reads.
    pub fn build(&self, tables: &SourceTables) -> Result<DataFrame> {
        self.build_with_summary(tables).map(|(table, _)| table)
    }

    /// Build the feature table and report what each step did.
    pub fn build_with_summary(&self, tables: &SourceTables) -> Result<(DataFrame, BuildSummary)> {
        let start_time = Instant::now();
        info!("Starting feature derivation...");

        self.check_schema(tables)?;

        let mut summary = BuildSummary::new();
        summary.applicants_in = tables.application.height();

        // Step 1
        info!("{}...", FeatureStep::CleanDaysEmployed);
        let mut table = applicant::clean_days_employed(&tables.application, &self.config)
            .context(FeatureStep::CleanDaysEmployed.display_name())?;
        summary.add_step(StepRecord {
            step: FeatureStep::CleanDaysEmployed,
            rows_after: table.height(),
            rows_introduced: 0,
            columns_added: Vec::new(),
        });

        // Steps 2-4
        let merges = &self.config.merges;
        let closed = bureau::closed_credit_counts(&tables.bureau, &self.config.closed_status)
            .context(FeatureStep::ClosedBureauCredits.display_name())?;
        table = self.apply(table, closed, merges.closed_bureau_credits, &mut summary)?;

        let debt_ratio = bureau::average_debt_ratio(&tables.bureau)
            .context(FeatureStep::BureauDebtRatio.display_name())?;
        table = self.apply(table, debt_ratio, merges.bureau_debt_ratio, &mut summary)?;

        let card_limit = bureau::total_card_limit(&tables.bureau)
            .context(FeatureStep::BureauCardLimit.display_name())?;
        table = self.apply(table, card_limit, merges.bureau_card_limit, &mut summary)?;

        // Steps 5-7
        info!("{}...", FeatureStep::CardUsageRatio);
        let usage = card_balance::usage_ratio_per_loan(&tables.card_balance)
            .context(FeatureStep::CardUsageRatio.display_name())?;
        debug!("Usage ratio computed for {} loans", usage.height());
        summary.add_step(StepRecord {
            step: FeatureStep::CardUsageRatio,
            rows_after: table.height(),
            rows_introduced: 0,
            columns_added: Vec::new(),
        });

        info!("{}...", FeatureStep::CardAtmDrawings);
        let atm = card_balance::atm_drawings_per_loan(&tables.card_balance)
            .context(FeatureStep::CardAtmDrawings.display_name())?;
        debug!("ATM drawings computed for {} loans", atm.height());
        summary.add_step(StepRecord {
            step: FeatureStep::CardAtmDrawings,
            rows_after: table.height(),
            rows_introduced: 0,
            columns_added: Vec::new(),
        });

        let rollup = card_balance::rollup_to_applicant(&tables.card_balance, usage, atm)
            .context(FeatureStep::CardRollup.display_name())?;
        table = self.apply(table, rollup, merges.card_rollup, &mut summary)?;

        // Steps 8-10
        let previous_apps = &tables.previous_application;
        let approval = previous::average_approval_ratio(previous_apps)
            .context(FeatureStep::PrevApprovalRatio.display_name())?;
        table = self.apply(table, approval, merges.prev_approval_ratio, &mut summary)?;

        let status = previous::contract_status_counts(
            previous_apps,
            &self.config.approved_status,
            &self.config.refused_status,
        )
        .context(FeatureStep::PrevContractStatus.display_name())?;
        table = self.apply(table, status, merges.prev_contract_status, &mut summary)?;

        let yields = previous::yield_group_totals(previous_apps, &self.config.retained_yield_groups)
            .context(FeatureStep::PrevYieldGroups.display_name())?;
        table = self.apply(table, yields, merges.prev_yield_groups, &mut summary)?;

        // Step 11
        info!("{}...", FeatureStep::EncodeCategoricals);
        let width_before = table.width();
        table = applicant::encode_categoricals(&table, &self.config.categorical_columns)
            .context(FeatureStep::EncodeCategoricals.display_name())?;
        let indicator_count = table.width() + self.config.categorical_columns.len() - width_before;
        summary.add_step(StepRecord {
            step: FeatureStep::EncodeCategoricals,
            rows_after: table.height(),
            rows_introduced: 0,
            columns_added: table
                .get_column_names()
                .iter()
                .take(indicator_count)
                .map(|c| c.to_string())
                .collect(),
        });

        if self.config.sort_by_client_id && has_column(&table, CLIENT_ID) {
            table = table.sort([CLIENT_ID], SortMultipleOptions::default())?;
        }

        summary.rows_out = table.height();
        summary.columns_out = table.width();
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Feature derivation complete: {} applicants in, {} rows x {} columns out ({}ms)",
            summary.applicants_in, summary.rows_out, summary.columns_out, summary.duration_ms
        );

        Ok((table, summary))
    }

    /// Fail fast if any step would read a column its table lacks.
    fn check_schema(&self, tables: &SourceTables) -> Result<()> {
        for (step, table_name, columns) in REQUIREMENTS {
            let table = match table_name {
                "application" => &tables.application,
                "bureau" => &tables.bureau,
                "card_balance" => &tables.card_balance,
                _ => &tables.previous_application,
            };
            require_columns(table, table_name, step, columns)?;
        }

        let categorical: Vec<&str> = self
            .config
            .categorical_columns
            .iter()
            .map(String::as_str)
            .collect();
        require_columns(
            &tables.application,
            "application",
            FeatureStep::EncodeCategoricals,
            &categorical,
        )
    }

    /// Merge one aggregate and record the step.
    fn apply(
        &self,
        table: DataFrame,
        derived: DerivedFeatures,
        strategy: MergeStrategy,
        summary: &mut BuildSummary,
    ) -> Result<DataFrame> {
        let step = derived.step;
        info!("{}...", step);

        let columns_added = derived.feature_columns();
        debug!(
            "{} aggregated {} applicants into {:?} ({:?} merge)",
            step,
            derived.table.height(),
            columns_added,
            strategy
        );

        let outcome = merge_features(table, derived, strategy).context(step.display_name())?;

        if outcome.rows_introduced > 0 {
            let message = format!(
                "{} added {} rows for applicants absent from the base table",
                step, outcome.rows_introduced
            );
            warn!("{}", message);
            summary.add_warning(message);
        }

        summary.add_step(StepRecord {
            step,
            rows_after: outcome.table.height(),
            rows_introduced: outcome.rows_introduced,
            columns_added,
        });

        Ok(outcome.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;

    fn tables() -> SourceTables {
        SourceTables::new(
            df![
                "SK_ID_CURR" => [1i64, 2],
                "DAYS_EMPLOYED" => [365243i64, -100],
                "NAME_CONTRACT_TYPE" => ["Cash loans", "Revolving loans"],
                "CODE_GENDER" => ["F", "M"],
                "FLAG_OWN_CAR" => ["N", "Y"],
                "NAME_INCOME_TYPE" => ["Working", "Pensioner"],
                "NAME_EDUCATION_TYPE" => ["Higher education", "Secondary / secondary special"],
                "NAME_FAMILY_STATUS" => ["Married", "Single / not married"],
            ]
            .unwrap(),
            df![
                "SK_ID_CURR" => [1i64],
                "CREDIT_ACTIVE" => ["Closed"],
                "AMT_CREDIT_SUM_DEBT" => [0.0],
                "AMT_CREDIT_SUM" => [1000.0],
                "AMT_CREDIT_SUM_LIMIT" => [0.0],
            ]
            .unwrap(),
            df![
                "SK_ID_PREV" => [10i64],
                "SK_ID_CURR" => [1i64],
                "AMT_BALANCE" => [10.0],
                "AMT_CREDIT_LIMIT_ACTUAL" => [100.0],
                "CNT_DRAWINGS_ATM_CURRENT" => [1.0],
            ]
            .unwrap(),
            df![
                "SK_ID_CURR" => [2i64],
                "SK_ID_PREV" => [20i64],
                "AMT_APPLICATION" => [100.0],
                "AMT_CREDIT" => [100.0],
                "NAME_CONTRACT_STATUS" => ["Approved"],
                "NAME_YIELD_GROUP" => ["high"],
            ]
            .unwrap(),
        )
    }

    #[test]
    fn test_summary_records_every_step() {
        let (_, summary) = FeatureBuilder::default()
            .build_with_summary(&tables())
            .unwrap();
        let steps: Vec<FeatureStep> = summary.steps.iter().map(|s| s.step).collect();
        assert_eq!(steps, FeatureStep::ALL.to_vec());
        assert_eq!(summary.applicants_in, 2);
        assert_eq!(summary.rows_out, 2);
        assert_eq!(summary.foreign_rows(), 0);
    }

    #[test]
    fn test_encoding_step_lists_indicator_columns() {
        let (table, summary) = FeatureBuilder::default()
            .build_with_summary(&tables())
            .unwrap();
        let encode = summary.steps.last().unwrap();
        assert_eq!(encode.columns_added.len(), 12);
        assert_eq!(encode.columns_added[0], "NAME_CONTRACT_TYPE_Cash loans");
        assert!(has_column(&table, "CODE_GENDER_M"));
        assert!(!has_column(&table, "CODE_GENDER"));
    }

    #[test]
    fn test_missing_column_fails_before_work() {
        let mut tables = tables();
        tables.card_balance = tables.card_balance.drop("CNT_DRAWINGS_ATM_CURRENT").unwrap();

        let err = FeatureBuilder::default().build(&tables).unwrap_err();
        match err {
            FeatureError::MissingColumn {
                step,
                table,
                column,
            } => {
                assert_eq!(step, FeatureStep::CardAtmDrawings);
                assert_eq!(table, "card_balance");
                assert_eq!(column, "CNT_DRAWINGS_ATM_CURRENT");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_categorical_column_names_encoding_step() {
        let mut tables = tables();
        tables.application = tables.application.drop("FLAG_OWN_CAR").unwrap();

        let err = FeatureBuilder::default().build(&tables).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::MissingColumn {
                step: FeatureStep::EncodeCategoricals,
                ..
            }
        ));
    }
}
