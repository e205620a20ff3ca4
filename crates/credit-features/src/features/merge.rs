//! Merging per-applicant aggregates into the applicant table.

use crate::config::MergeStrategy;
use crate::error::Result;
use crate::schema::CLIENT_ID;
use crate::types::FeatureStep;
use polars::prelude::*;

/// What to write into a derived column for applicants the aggregate
/// has no row for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullFill {
    /// Leave the value missing.
    Keep,
    /// Absence of child records means zero.
    Zero,
}

/// A per-applicant aggregate keyed by `SK_ID_CURR`, ready to merge.
#[derive(Debug, Clone)]
pub struct DerivedFeatures {
    pub step: FeatureStep,
    pub table: DataFrame,
    pub null_fill: NullFill,
}

impl DerivedFeatures {
    pub fn new(step: FeatureStep, table: DataFrame, null_fill: NullFill) -> Self {
        Self {
            step,
            table,
            null_fill,
        }
    }

    /// Names of the derived columns, i.e. everything except the key.
    pub fn feature_columns(&self) -> Vec<String> {
        self.table
            .get_column_names()
            .iter()
            .filter(|c| c.as_str() != CLIENT_ID)
            .map(|c| c.to_string())
            .collect()
    }
}

/// Result of merging one aggregate.
#[derive(Debug)]
pub struct MergeOutcome {
    pub table: DataFrame,
    /// Rows for ids present only in the aggregate.
    pub rows_introduced: usize,
}

/// The applicant key normalized to `Int64` so joins never fail on
/// mismatched integer widths between source files.
pub fn client_key() -> Expr {
    col(CLIENT_ID).cast(DataType::Int64)
}

fn join_args(strategy: MergeStrategy) -> JoinArgs {
    match strategy {
        MergeStrategy::Left => JoinArgs::new(JoinType::Left),
        MergeStrategy::Outer => {
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns)
        }
    }
}

/// Merge `derived` into `base` on `SK_ID_CURR` and apply its fill policy.
pub fn merge_features(
    base: DataFrame,
    derived: DerivedFeatures,
    strategy: MergeStrategy,
) -> Result<MergeOutcome> {
    let rows_before = base.height();
    let features = derived.feature_columns();

    let mut fills = Vec::new();
    if derived.null_fill == NullFill::Zero {
        for name in &features {
            let dtype = derived.table.column(name)?.dtype().clone();
            fills.push(col(name.as_str()).fill_null(lit(0).cast(dtype)));
        }
    }

    let mut merged = base.lazy().join(
        derived.table.lazy(),
        [col(CLIENT_ID)],
        [col(CLIENT_ID)],
        join_args(strategy),
    );
    if !fills.is_empty() {
        merged = merged.with_columns(fills);
    }
    let table = merged.collect()?;

    let rows_introduced = table.height().saturating_sub(rows_before);
    Ok(MergeOutcome {
        table,
        rows_introduced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DataFrame {
        df![
            "SK_ID_CURR" => [1i64, 2],
            "AMT_INCOME_TOTAL" => [100.0, 200.0],
        ]
        .unwrap()
    }

    fn derived(null_fill: NullFill) -> DerivedFeatures {
        DerivedFeatures::new(
            FeatureStep::ClosedBureauCredits,
            df![
                "SK_ID_CURR" => [1i64, 3],
                "num_closed_bureau_credits" => [2i64, 5],
            ]
            .unwrap(),
            null_fill,
        )
    }

    fn feature_by_id(df: &DataFrame, id: i64) -> Option<i64> {
        let ids = df.column("SK_ID_CURR").unwrap().i64().unwrap();
        let values = df.column("num_closed_bureau_credits").unwrap().i64().unwrap();
        ids.into_iter()
            .position(|v| v == Some(id))
            .and_then(|idx| values.get(idx))
    }

    #[test]
    fn test_left_merge_keeps_base_rows_only() {
        let outcome =
            merge_features(base(), derived(NullFill::Keep), MergeStrategy::Left).unwrap();
        assert_eq!(outcome.table.height(), 2);
        assert_eq!(outcome.rows_introduced, 0);
        assert_eq!(feature_by_id(&outcome.table, 1), Some(2));
        assert_eq!(feature_by_id(&outcome.table, 2), None);
    }

    #[test]
    fn test_outer_merge_introduces_foreign_ids() {
        let outcome =
            merge_features(base(), derived(NullFill::Keep), MergeStrategy::Outer).unwrap();
        assert_eq!(outcome.table.height(), 3);
        assert_eq!(outcome.rows_introduced, 1);
        assert_eq!(feature_by_id(&outcome.table, 3), Some(5));

        let key_columns = outcome
            .table
            .get_column_names()
            .iter()
            .filter(|c| c.starts_with("SK_ID_CURR"))
            .count();
        assert_eq!(key_columns, 1);
    }

    #[test]
    fn test_zero_fill_applies_to_missing_applicants() {
        let outcome =
            merge_features(base(), derived(NullFill::Zero), MergeStrategy::Outer).unwrap();
        assert_eq!(feature_by_id(&outcome.table, 2), Some(0));
        assert_eq!(
            outcome
                .table
                .column("num_closed_bureau_credits")
                .unwrap()
                .null_count(),
            0
        );
    }
}
