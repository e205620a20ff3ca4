//! Base applicant table: sentinel cleanup and categorical encoding.

use crate::config::FeatureConfig;
use crate::encoding::OneHotEncoder;
use crate::error::Result;
use crate::schema::{CLIENT_ID, application::DAYS_EMPLOYED};
use polars::prelude::*;
use tracing::{debug, warn};

/// Rewrite the `DAYS_EMPLOYED` sentinel to the placeholder, keeping the
/// column's original type.
///
/// Also normalizes `SK_ID_CURR` to `Int64` and drops applicants without an
/// id, since every later step joins on it.
pub fn clean_days_employed(application: &DataFrame, config: &FeatureConfig) -> Result<DataFrame> {
    let dtype = application.column(DAYS_EMPLOYED)?.dtype().clone();
    let sentinel = config.days_employed_sentinel;

    let sentinel_rows = application
        .column(DAYS_EMPLOYED)?
        .as_materialized_series()
        .cast(&DataType::Int64)?
        .i64()?
        .into_iter()
        .filter(|v| *v == Some(sentinel))
        .count();
    debug!(
        "Replacing {} DAYS_EMPLOYED sentinel values ({} -> {})",
        sentinel_rows, sentinel, config.days_employed_placeholder
    );

    let null_ids = application.column(CLIENT_ID)?.null_count();
    if null_ids > 0 {
        warn!("Dropping {} applicants without {}", null_ids, CLIENT_ID);
    }

    let cleaned = application
        .clone()
        .lazy()
        .filter(col(CLIENT_ID).is_not_null())
        .with_columns([
            col(CLIENT_ID).cast(DataType::Int64),
            when(col(DAYS_EMPLOYED).eq(lit(sentinel)))
                .then(lit(config.days_employed_placeholder))
                .otherwise(col(DAYS_EMPLOYED))
                .cast(dtype)
                .alias(DAYS_EMPLOYED),
        ])
        .collect()?;

    Ok(cleaned)
}

/// Replace the configured categorical columns with indicator columns.
pub fn encode_categoricals(applicants: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    OneHotEncoder::fit_transform(applicants, columns)
}
