//! One-off outlier inspection of a single column.

use super::filter::Bounds;
use crate::config::{ConfigValidationError, OutlierFilterConfig};
use crate::error::{FeatureError, Result};
use crate::utils::present_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// How many values of a column fall outside its IQR band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub column: String,
    pub iqr_multiplier: f64,
    /// Non-missing values in the column.
    pub observations: usize,
    pub outliers: usize,
    /// Share of observations that would be dropped, in percent.
    pub percent: f64,
    pub bounds: Bounds,
}

impl fmt::Display for OutlierReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} observations, bounds [{:.4}, {:.4}]",
            self.column, self.observations, self.bounds.lower, self.bounds.upper
        )?;
        write!(
            f,
            "Using IQR * {}, {} outliers detected ({:.2}% of the data)",
            self.iqr_multiplier, self.outliers, self.percent
        )
    }
}

/// Count the values of `column` outside `[P25 - m * IQR, P75 + m * IQR]`
/// without removing anything.
pub fn check_outliers(df: &DataFrame, column: &str, multiplier: f64) -> Result<OutlierReport> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(ConfigValidationError::InvalidMultiplier(multiplier).into());
    }

    let series = df
        .column(column)
        .map_err(|_| FeatureError::ColumnNotFound(column.to_string()))?
        .as_materialized_series();
    let bounds = Bounds::from_series(series, multiplier)?;

    let values = present_values(series)?;
    let observations = values.len();
    let outliers = values.iter().filter(|v| !bounds.contains(**v)).count();
    let percent = outliers as f64 / observations as f64 * 100.0;

    info!(
        "{}: {} of {} observations outside IQR x {} ({:.2}%)",
        column, outliers, observations, multiplier, percent
    );

    Ok(OutlierReport {
        column: column.to_string(),
        iqr_multiplier: multiplier,
        observations,
        outliers,
        percent,
        bounds,
    })
}

/// [`check_outliers`] for every column of a filter configuration.
pub fn check_all(df: &DataFrame, config: &OutlierFilterConfig) -> Result<Vec<OutlierReport>> {
    config
        .columns
        .iter()
        .map(|column| check_outliers(df, column, config.iqr_multiplier))
        .collect()
}
