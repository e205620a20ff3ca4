//! Aggregates over prior loan applications.

use super::merge::{DerivedFeatures, NullFill, client_key};
use crate::error::Result;
use crate::schema::{CLIENT_ID, derived, previous_application::*};
use crate::types::FeatureStep;
use polars::prelude::*;

fn with_client(previous: &DataFrame) -> LazyFrame {
    previous.clone().lazy().filter(col(CLIENT_ID).is_not_null())
}

/// 0/1 indicator of `column == label`, with missing values counted as 0.
fn indicator(column: &str, label: &str) -> Expr {
    col(column)
        .eq(lit(label))
        .fill_null(lit(false))
        .cast(DataType::Int64)
}

/// Per-application `AMT_CREDIT / AMT_APPLICATION`.
///
/// A zero requested amount (ratio +inf) counts as fully approved (1). An
/// undefined ratio (0 / 0) is treated as missing so the mean skips it.
pub fn approval_ratio_expr() -> Expr {
    let ratio = col(AMT_CREDIT).cast(DataType::Float64)
        / col(AMT_APPLICATION).cast(DataType::Float64);
    when(ratio.clone().is_nan())
        .then(lit(NULL).cast(DataType::Float64))
        .when(ratio.clone().eq(lit(f64::INFINITY)))
        .then(lit(1.0))
        .otherwise(ratio)
}

/// Mean approval ratio per applicant. No fill.
pub fn average_approval_ratio(previous: &DataFrame) -> Result<DerivedFeatures> {
    let table = with_client(previous)
        .group_by([client_key()])
        .agg([approval_ratio_expr()
            .mean()
            .alias(derived::PREV_AVG_RATIO_CREDIT_APPROVED)])
        .collect()?;

    Ok(DerivedFeatures::new(
        FeatureStep::PrevApprovalRatio,
        table,
        NullFill::Keep,
    ))
}

/// Number of approved and refused prior applications per applicant.
/// No fill.
pub fn contract_status_counts(
    previous: &DataFrame,
    approved: &str,
    refused: &str,
) -> Result<DerivedFeatures> {
    let table = with_client(previous)
        .group_by([client_key()])
        .agg([
            indicator(NAME_CONTRACT_STATUS, approved)
                .sum()
                .alias(derived::PREV_STATUS_APPROVED),
            indicator(NAME_CONTRACT_STATUS, refused)
                .sum()
                .alias(derived::PREV_STATUS_REFUSED),
        ])
        .collect()?;

    Ok(DerivedFeatures::new(
        FeatureStep::PrevContractStatus,
        table,
        NullFill::Keep,
    ))
}

/// Per-applicant totals of the retained yield groups, one
/// `prev_yield_<group>` column each. Other groups are dropped. No fill.
pub fn yield_group_totals(previous: &DataFrame, retained: &[String]) -> Result<DerivedFeatures> {
    let totals: Vec<Expr> = retained
        .iter()
        .map(|group| {
            indicator(NAME_YIELD_GROUP, group)
                .sum()
                .alias(derived::prev_yield(group))
        })
        .collect();

    let table = with_client(previous)
        .group_by([client_key()])
        .agg(totals)
        .collect()?;

    Ok(DerivedFeatures::new(
        FeatureStep::PrevYieldGroups,
        table,
        NullFill::Keep,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn previous() -> DataFrame {
        df![
            "SK_ID_CURR" => [1i64, 1, 1, 2, 2],
            "SK_ID_PREV" => [100i64, 101, 102, 200, 201],
            "AMT_APPLICATION" => [100.0, 0.0, 0.0, 50.0, 200.0],
            "AMT_CREDIT" => [80.0, 10.0, 0.0, 50.0, 100.0],
            "NAME_CONTRACT_STATUS" => [Some("Approved"), Some("Refused"), None, Some("Approved"), Some("Canceled")],
            "NAME_YIELD_GROUP" => ["high", "XNA", "high", "low_action", "middle"],
        ]
        .unwrap()
    }

    fn value(df: &DataFrame, column: &str, id: i64) -> Option<f64> {
        let ids = df.column("SK_ID_CURR").unwrap().i64().unwrap();
        let values = df
            .column(column)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Float64)
            .unwrap();
        let values = values.f64().unwrap();
        ids.into_iter()
            .position(|v| v == Some(id))
            .and_then(|idx| values.get(idx))
    }

    #[test]
    fn test_approval_ratio_substitutions() {
        let derived = average_approval_ratio(&previous()).unwrap();
        // client 1: 0.8, inf -> 1, NaN skipped
        let ratio = value(&derived.table, "prev_avg_ratio_credit_approved", 1).unwrap();
        assert!((ratio - 0.9).abs() < 1e-12);
        let ratio = value(&derived.table, "prev_avg_ratio_credit_approved", 2).unwrap();
        assert!((ratio - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_contract_status_counts() {
        let derived = contract_status_counts(&previous(), "Approved", "Refused").unwrap();
        assert_eq!(value(&derived.table, "prev_status_approved", 1), Some(1.0));
        assert_eq!(value(&derived.table, "prev_status_refused", 1), Some(1.0));
        assert_eq!(value(&derived.table, "prev_status_approved", 2), Some(1.0));
        assert_eq!(value(&derived.table, "prev_status_refused", 2), Some(0.0));
    }

    #[test]
    fn test_yield_group_totals_keep_only_retained() {
        let retained = vec!["high".to_string(), "low_action".to_string()];
        let derived = yield_group_totals(&previous(), &retained).unwrap();

        assert_eq!(
            derived.feature_columns(),
            vec!["prev_yield_high", "prev_yield_low_action"]
        );
        assert_eq!(value(&derived.table, "prev_yield_high", 1), Some(2.0));
        assert_eq!(value(&derived.table, "prev_yield_low_action", 1), Some(0.0));
        assert_eq!(value(&derived.table, "prev_yield_low_action", 2), Some(1.0));
    }
}
