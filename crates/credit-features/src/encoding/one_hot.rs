//! One-hot encoding of categorical columns.

use crate::error::{FeatureError, Result};
use crate::utils::has_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Suffix of the indicator column for missing values.
pub const MISSING_CATEGORY: &str = "nan";

/// Learned categories of one encoded column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub name: String,
    /// Sorted observed categories.
    pub categories: Vec<String>,
    /// Whether missing values were observed during fit.
    pub has_missing: bool,
}

impl EncodedColumn {
    /// Output column names, in output order.
    pub fn indicator_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .categories
            .iter()
            .map(|c| format!("{}_{}", self.name, c))
            .collect();
        if self.has_missing {
            names.push(format!("{}_{}", self.name, MISSING_CATEGORY));
        }
        names
    }
}

/// Replaces categorical columns with `Float64` 0/1 indicator columns.
///
/// Indicator columns are emitted first (encoded columns in the order given
/// to [`fit`](Self::fit), categories sorted, missing last), followed by
/// every other column in its original order. Values not seen during `fit`
/// produce all-zero indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<EncodedColumn>,
}

impl OneHotEncoder {
    /// Learn the categories of `columns` from `df`.
    pub fn fit<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<Self> {
        let mut encoded = Vec::with_capacity(columns.len());

        for name in columns {
            let name = name.as_ref();
            let column = df
                .column(name)
                .map_err(|_| FeatureError::ColumnNotFound(name.to_string()))?;
            let values = column.as_materialized_series().cast(&DataType::String)?;

            let mut categories = BTreeSet::new();
            let mut has_missing = false;
            for value in values.str()?.into_iter() {
                match value {
                    Some(v) => {
                        categories.insert(v.to_string());
                    }
                    None => has_missing = true,
                }
            }

            debug!(
                "Encoding '{}' with {} categories{}",
                name,
                categories.len(),
                if has_missing { " plus missing" } else { "" }
            );

            encoded.push(EncodedColumn {
                name: name.to_string(),
                categories: categories.into_iter().collect(),
                has_missing,
            });
        }

        Ok(Self { columns: encoded })
    }

    /// Fit on `df` and encode it in one step.
    pub fn fit_transform<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
        Self::fit(df, columns)?.transform(df)
    }

    /// Learned categories per encoded column.
    pub fn encoded_columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    /// Encode `df` with the learned categories.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let height = df.height();
        let mut output: Vec<Column> = Vec::new();

        for encoded in &self.columns {
            if !has_column(df, &encoded.name) {
                return Err(FeatureError::ColumnNotFound(encoded.name.clone()));
            }
            let values = df
                .column(&encoded.name)?
                .as_materialized_series()
                .cast(&DataType::String)?;
            let values = values.str()?;

            for category in &encoded.categories {
                let indicator: Vec<f64> = values
                    .into_iter()
                    .map(|v| if v == Some(category.as_str()) { 1.0 } else { 0.0 })
                    .collect();
                let name = format!("{}_{}", encoded.name, category);
                output.push(Series::new(name.into(), indicator).into_column());
            }

            if encoded.has_missing {
                let indicator: Vec<f64> = values
                    .into_iter()
                    .map(|v| if v.is_none() { 1.0 } else { 0.0 })
                    .collect();
                let name = format!("{}_{}", encoded.name, MISSING_CATEGORY);
                output.push(Series::new(name.into(), indicator).into_column());
            }
        }

        for column in df.get_columns() {
            let is_encoded = self
                .columns
                .iter()
                .any(|e| e.name.as_str() == column.name().as_str());
            if !is_encoded {
                output.push(column.clone());
            }
        }

        if output.is_empty() {
            return Ok(DataFrame::empty());
        }

        let result = DataFrame::new(output)?;
        debug_assert_eq!(result.height(), height);
        Ok(result)
    }
}
