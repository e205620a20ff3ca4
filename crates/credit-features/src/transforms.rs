//! Column-wise numeric transforms applied to a finished feature table.

use crate::error::{FeatureError, Result};
use crate::utils::{has_column, is_numeric_dtype};
use polars::prelude::*;
use tracing::debug;

/// Replace each listed column with `ln(1 + x)` as `Float64`.
///
/// An empty list transforms every numeric column. Missing values stay
/// missing; values below -1 become NaN.
pub fn log1p_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
    let targets: Vec<String> = if columns.is_empty() {
        df.get_columns()
            .iter()
            .filter(|c| is_numeric_dtype(c.dtype()))
            .map(|c| c.name().to_string())
            .collect()
    } else {
        columns.iter().map(|c| c.as_ref().to_string()).collect()
    };

    let mut result = df.clone();
    for name in &targets {
        if !has_column(&result, name) {
            return Err(FeatureError::ColumnNotFound(name.clone()));
        }
        let column = result.column(name)?;
        if !is_numeric_dtype(column.dtype()) {
            return Err(FeatureError::NonNumericColumn {
                column: name.clone(),
                dtype: column.dtype().to_string(),
            });
        }

        let float_series = column.as_materialized_series().cast(&DataType::Float64)?;
        let transformed = float_series
            .f64()?
            .apply(|v| v.map(f64::ln_1p))
            .with_name(name.as_str().into());
        result.replace(name, transformed.into_series())?;
    }

    debug!("Applied log1p to {} columns", targets.len());
    Ok(result)
}
