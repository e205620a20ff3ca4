//! Shared helpers for schema checks and numeric work on Polars columns.

use crate::error::{FeatureError, Result};
use crate::types::FeatureStep;
use polars::prelude::*;

// =============================================================================
// Schema Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check whether `df` has a column called `name`.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Fail with [`FeatureError::MissingColumn`] on the first absent column.
pub fn require_columns(
    df: &DataFrame,
    table: &'static str,
    step: FeatureStep,
    columns: &[&str],
) -> Result<()> {
    match columns.iter().find(|c| !has_column(df, c)) {
        Some(missing) => Err(FeatureError::MissingColumn {
            step,
            table,
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Non-missing values of a numeric column as `f64`. Nulls and NaN are skipped.
pub fn present_values(series: &Series) -> Result<Vec<f64>> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(FeatureError::NonNumericColumn {
            column: series.name().to_string(),
            dtype: series.dtype().to_string(),
        });
    }

    let as_float = series.cast(&DataType::Float64)?;
    Ok(as_float
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Quantile of already-sorted values using linear interpolation between
/// the two closest ranks. Returns `None` for an empty slice.
pub fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Sort values in place with a total order.
pub fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float32));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_require_columns_names_first_missing() {
        let df = df!["SK_ID_CURR" => [1i64, 2]].unwrap();
        let err = require_columns(
            &df,
            "bureau",
            FeatureStep::ClosedBureauCredits,
            &["SK_ID_CURR", "CREDIT_ACTIVE", "AMT_CREDIT_SUM"],
        )
        .unwrap_err();

        match err {
            FeatureError::MissingColumn {
                step,
                table,
                column,
            } => {
                assert_eq!(step, FeatureStep::ClosedBureauCredits);
                assert_eq!(table, "bureau");
                assert_eq!(column, "CREDIT_ACTIVE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_quantile_linear_matches_interpolated_quartiles() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 100.0];
        assert_eq!(quantile_linear(&sorted, 0.25), Some(2.0));
        assert_eq!(quantile_linear(&sorted, 0.75), Some(4.0));
        assert_eq!(quantile_linear(&sorted, 0.5), Some(3.0));
    }

    #[test]
    fn test_quantile_linear_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_linear(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile_linear(&sorted, 0.75), Some(3.25));
    }

    #[test]
    fn test_quantile_linear_edge_cases() {
        assert_eq!(quantile_linear(&[], 0.5), None);
        assert_eq!(quantile_linear(&[7.0], 0.25), Some(7.0));
    }

    #[test]
    fn test_present_values_skips_missing() {
        let series = Series::new(
            "x".into(),
            &[Some(1.0), None, Some(f64::NAN), Some(3.0)],
        );
        assert_eq!(present_values(&series).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_present_values_rejects_strings() {
        let series = Series::new("x".into(), &["a", "b"]);
        assert!(matches!(
            present_values(&series),
            Err(FeatureError::NonNumericColumn { .. })
        ));
    }
}
