//! Applicant Credit Feature Library
//!
//! Builds a one-row-per-applicant feature table from credit-risk source data
//! with Polars, and filters IQR outliers from numeric feature columns.
//!
//! # Overview
//!
//! - **Feature derivation**: [`FeatureBuilder`] aggregates the bureau,
//!   credit-card balance and previous-application tables per applicant and
//!   merges the results into the application table
//! - **Explicit merge policy**: every merge step declares whether it may add
//!   applicants absent from the base table ([`config::MergePlan`])
//! - **Categorical encoding**: applicant categoricals become indicator
//!   columns ([`encoding::OneHotEncoder`])
//! - **Outlier filtering**: [`OutlierFilter`] learns IQR bounds once and
//!   drops out-of-band rows from any table
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use credit_features::{FeatureBuilder, FeatureConfig, OutlierFilter};
//! use credit_features::io::SourcePaths;
//!
//! let tables = SourcePaths::in_dir("data").load()?;
//! let (features, summary) = FeatureBuilder::new(FeatureConfig::default())
//!     .build_with_summary(&tables)?;
//! println!("{} applicants, {} foreign rows", summary.rows_out, summary.foreign_rows());
//!
//! let mut filter = OutlierFilter::iqr(["AMT_INCOME_TOTAL"], 1.5)?;
//! let inliers = filter.fit_transform(&features)?;
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use credit_features::config::{FeatureConfig, MergePlan, MergeStrategy};
//!
//! let config = FeatureConfig::builder()
//!     .merges(MergePlan::uniform(MergeStrategy::Left))
//!     .retained_yield_groups(["high", "low_action", "middle"])
//!     .build()?;
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod features;
pub mod io;
pub mod outliers;
pub mod schema;
pub mod transforms;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, FeatureConfig, FeatureConfigBuilder, MergePlan, MergeStrategy,
    OutlierFilterConfig, OutlierFilterConfigBuilder,
};
pub use encoding::OneHotEncoder;
pub use error::{FeatureError, Result as FeatureResult, ResultExt};
pub use features::FeatureBuilder;
pub use outliers::{Bounds, OutlierFilter, OutlierReport, check_outliers};
pub use types::{BuildSummary, FeatureStep, SourceTables, StepRecord};
