//! IQR outlier handling for numeric feature columns.

mod filter;
mod report;

pub use filter::{Bounds, FilterState, OutlierFilter};
pub use report::{OutlierReport, check_all, check_outliers};
