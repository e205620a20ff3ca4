//! IQR-based row filter with an explicit fit/transform lifecycle.

use crate::config::OutlierFilterConfig;
use crate::error::{FeatureError, Result};
use crate::utils::{has_column, is_numeric_dtype, present_values, quantile_linear, sort_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Inclusive inlier band for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    /// `[P25 - m * IQR, P75 + m * IQR]` over already-sorted values.
    pub fn from_sorted(sorted: &[f64], multiplier: f64) -> Option<Self> {
        let q1 = quantile_linear(sorted, 0.25)?;
        let q3 = quantile_linear(sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    /// Learn the band from a numeric column, ignoring nulls and NaN.
    pub fn from_series(series: &Series, multiplier: f64) -> Result<Self> {
        let mut values = present_values(series)?;
        sort_values(&mut values);
        Self::from_sorted(&values, multiplier)
            .ok_or_else(|| FeatureError::NoValidValues(series.name().to_string()))
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Lifecycle of an [`OutlierFilter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FilterState {
    #[default]
    Unfitted,
    Fitted { thresholds: HashMap<String, Bounds> },
}

/// Drops rows whose value in any fitted column lies outside that column's
/// IQR band.
///
/// Bounds are learned once by [`fit`](Self::fit) and reused by every
/// [`transform`](Self::transform). A filter cannot be refitted; build a new
/// one instead.
///
/// # Example
///
/// ```rust,ignore
/// use credit_features::OutlierFilter;
///
/// let mut filter = OutlierFilter::iqr(["AMT_INCOME_TOTAL"], 1.5)?;
/// filter.fit(&reference)?;
/// let inliers = filter.transform(&features)?;
/// ```
#[derive(Debug, Clone)]
pub struct OutlierFilter {
    config: OutlierFilterConfig,
    state: FilterState,
}

static_assertions::assert_impl_all!(OutlierFilter: Send, Sync);

impl OutlierFilter {
    pub fn new(config: OutlierFilterConfig) -> Self {
        Self {
            config,
            state: FilterState::Unfitted,
        }
    }

    /// Filter on `columns` with the given multiplier.
    pub fn iqr<I, S>(columns: I, multiplier: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = OutlierFilterConfig::builder()
            .columns(columns)
            .iqr_multiplier(multiplier)
            .build()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &OutlierFilterConfig {
        &self.config
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, FilterState::Fitted { .. })
    }

    /// Learned bounds, or `None` before `fit`.
    pub fn thresholds(&self) -> Option<&HashMap<String, Bounds>> {
        match &self.state {
            FilterState::Fitted { thresholds } => Some(thresholds),
            FilterState::Unfitted => None,
        }
    }

    /// Learn the bounds of every configured column from `reference`.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::AlreadyFitted`] if the filter holds bounds already
    /// - [`FeatureError::ColumnNotFound`] if a configured column is absent
    /// - [`FeatureError::NonNumericColumn`] / [`FeatureError::NoValidValues`]
    ///   if a column has nothing to learn from
    ///
    /// On error the filter stays unfitted.
    pub fn fit(&mut self, reference: &DataFrame) -> Result<&mut Self> {
        if self.is_fitted() {
            return Err(FeatureError::AlreadyFitted);
        }

        let mut thresholds = HashMap::with_capacity(self.config.columns.len());
        for name in &self.config.columns {
            if !has_column(reference, name) {
                return Err(FeatureError::ColumnNotFound(name.clone()));
            }
            let series = reference.column(name)?.as_materialized_series();
            let bounds = Bounds::from_series(series, self.config.iqr_multiplier)?;
            debug!(
                "{}: inlier band [{}, {}]",
                name, bounds.lower, bounds.upper
            );
            thresholds.insert(name.clone(), bounds);
        }

        info!(
            "Fitted outlier bounds for {} columns (IQR x {})",
            thresholds.len(),
            self.config.iqr_multiplier
        );
        self.state = FilterState::Fitted { thresholds };
        Ok(self)
    }

    /// Rows of `table` whose fitted columns are all missing or in bounds.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::Unfitted`] before `fit`
    /// - [`FeatureError::ColumnNotFound`] if a fitted column is absent
    pub fn transform(&self, table: &DataFrame) -> Result<DataFrame> {
        let thresholds = self.thresholds().ok_or(FeatureError::Unfitted)?;

        let mut keep = vec![true; table.height()];
        for name in &self.config.columns {
            let Some(bounds) = thresholds.get(name) else {
                continue;
            };
            if !has_column(table, name) {
                return Err(FeatureError::ColumnNotFound(name.clone()));
            }

            let column = table.column(name)?;
            if !is_numeric_dtype(column.dtype()) {
                return Err(FeatureError::NonNumericColumn {
                    column: name.clone(),
                    dtype: column.dtype().to_string(),
                });
            }

            let values = column.as_materialized_series().cast(&DataType::Float64)?;
            for (flag, value) in keep.iter_mut().zip(values.f64()?.into_iter()) {
                if let Some(v) = value
                    && !v.is_nan()
                    && !bounds.contains(v)
                {
                    *flag = false;
                }
            }
        }

        let mask = BooleanChunked::from_slice("mask".into(), &keep);
        let filtered = table.filter(&mask)?;

        let removed = table.height() - filtered.height();
        if removed > 0 {
            debug!("Removed {} outlier rows", removed);
        }

        Ok(filtered)
    }

    pub fn fit_transform(&mut self, table: &DataFrame) -> Result<DataFrame> {
        self.fit(table)?;
        self.transform(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reference() -> DataFrame {
        df!["x" => [1.0, 2.0, 3.0, 4.0, 100.0]].unwrap()
    }

    fn fitted() -> OutlierFilter {
        let mut filter = OutlierFilter::iqr(["x"], 1.5).unwrap();
        filter.fit(&reference()).unwrap();
        filter
    }

    #[test]
    fn test_fit_learns_interpolated_bounds() {
        let filter = fitted();
        let bounds = filter.thresholds().unwrap()["x"];
        assert_eq!(bounds, Bounds { lower: -1.0, upper: 7.0 });
    }

    #[test]
    fn test_transform_drops_out_of_band_rows() {
        let filtered = fitted().transform(&reference()).unwrap();
        let values: Vec<Option<f64>> = filtered
            .column("x")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let table = df!["x" => [-1.0, 7.0, 7.5]].unwrap();
        assert_eq!(fitted().transform(&table).unwrap().height(), 2);
    }

    #[test]
    fn test_missing_values_pass() {
        let table = df!["x" => [None, Some(f64::NAN), None::<f64>]].unwrap();
        assert_eq!(fitted().transform(&table).unwrap().height(), 3);
    }

    #[test]
    fn test_any_column_violation_drops_row() {
        let reference = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => [10.0, 20.0, 30.0, 40.0, 50.0],
        ]
        .unwrap();
        let mut filter = OutlierFilter::iqr(["a", "b"], 1.5).unwrap();
        filter.fit(&reference).unwrap();

        let table = df![
            "a" => [Some(3.0), Some(100.0), None],
            "b" => [Some(1000.0), Some(30.0), Some(30.0)],
        ]
        .unwrap();
        let filtered = filter.transform(&table).unwrap();
        assert_eq!(filtered.height(), 1);
        assert_eq!(filtered.column("a").unwrap().null_count(), 1);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let filter = fitted();
        let once = filter.transform(&reference()).unwrap();
        let twice = filter.transform(&once).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let filter = OutlierFilter::iqr(["x"], 1.5).unwrap();
        let err = filter.transform(&reference()).unwrap_err();
        assert!(matches!(err, FeatureError::Unfitted));
    }

    #[test]
    fn test_refit_fails() {
        let mut filter = fitted();
        let err = filter.fit(&reference()).unwrap_err();
        assert!(matches!(err, FeatureError::AlreadyFitted));
    }

    #[test]
    fn test_fit_missing_column_leaves_filter_unfitted() {
        let mut filter = OutlierFilter::iqr(["x", "y"], 1.5).unwrap();
        let err = filter.fit(&reference()).unwrap_err();
        assert!(matches!(err, FeatureError::ColumnNotFound(ref c) if c == "y"));
        assert!(!filter.is_fitted());
    }

    #[test]
    fn test_fit_rejects_strings_and_empty_columns() {
        let table = df![
            "s" => ["a", "b"],
            "e" => [None::<f64>, None],
        ]
        .unwrap();

        let mut filter = OutlierFilter::iqr(["s"], 1.5).unwrap();
        assert!(matches!(
            filter.fit(&table).unwrap_err(),
            FeatureError::NonNumericColumn { .. }
        ));

        let mut filter = OutlierFilter::iqr(["e"], 1.5).unwrap();
        assert!(matches!(
            filter.fit(&table).unwrap_err(),
            FeatureError::NoValidValues(_)
        ));
    }

    #[test]
    fn test_transform_missing_fitted_column_fails() {
        let table = df!["z" => [1.0]].unwrap();
        let err = fitted().transform(&table).unwrap_err();
        assert!(matches!(err, FeatureError::ColumnNotFound(_)));
    }

    #[test]
    fn test_negative_multiplier_rejected() {
        let err = OutlierFilter::iqr(["x"], -1.0).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidConfig(_)));
    }
}
