//! Categorical encoding.
//!
//! Feature derivation treats the encoder as a collaborator: given a table
//! and a list of categorical columns, it returns the table with those
//! columns replaced by indicator columns.

mod one_hot;

pub use one_hot::{EncodedColumn, MISSING_CATEGORY, OneHotEncoder};
