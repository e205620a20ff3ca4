//! Aggregates over the credit-bureau table.

use super::merge::{DerivedFeatures, NullFill, client_key};
use crate::error::Result;
use crate::schema::{CLIENT_ID, bureau::*, derived};
use crate::types::FeatureStep;
use polars::prelude::*;

fn with_client(bureau: &DataFrame) -> LazyFrame {
    bureau.clone().lazy().filter(col(CLIENT_ID).is_not_null())
}

/// Number of bureau credits whose `CREDIT_ACTIVE` equals `closed_status`.
///
/// Applicants without closed credits get 0 after the merge.
pub fn closed_credit_counts(bureau: &DataFrame, closed_status: &str) -> Result<DerivedFeatures> {
    let table = with_client(bureau)
        .filter(col(CREDIT_ACTIVE).eq(lit(closed_status)))
        .group_by([client_key()])
        .agg([len()
            .cast(DataType::Int64)
            .alias(derived::NUM_CLOSED_BUREAU_CREDITS)])
        .collect()?;

    Ok(DerivedFeatures::new(
        FeatureStep::ClosedBureauCredits,
        table,
        NullFill::Zero,
    ))
}

/// Mean of `AMT_CREDIT_SUM_DEBT / (AMT_CREDIT_SUM + 1)` per applicant.
///
/// The `+ 1` keeps zero-credit records in the average. Applicants without
/// bureau records get 0 after the merge.
pub fn average_debt_ratio(bureau: &DataFrame) -> Result<DerivedFeatures> {
    let ratio = col(AMT_CREDIT_SUM_DEBT).cast(DataType::Float64)
        / (col(AMT_CREDIT_SUM).cast(DataType::Float64) + lit(1.0));

    let table = with_client(bureau)
        .group_by([client_key()])
        .agg([ratio.mean().alias(derived::AVG_RATIO_BUREAU_CR_DEBT)])
        .collect()?;

    Ok(DerivedFeatures::new(
        FeatureStep::BureauDebtRatio,
        table,
        NullFill::Zero,
    ))
}

/// Sum of `AMT_CREDIT_SUM_LIMIT` per applicant.
///
/// No fill: applicants without bureau records stay missing.
pub fn total_card_limit(bureau: &DataFrame) -> Result<DerivedFeatures> {
    let table = with_client(bureau)
        .group_by([client_key()])
        .agg([col(AMT_CREDIT_SUM_LIMIT)
            .cast(DataType::Float64)
            .sum()
            .alias(derived::TTL_BUREAU_CC_LIMIT)])
        .collect()?;

    Ok(DerivedFeatures::new(
        FeatureStep::BureauCardLimit,
        table,
        NullFill::Keep,
    ))
}
