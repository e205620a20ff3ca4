//! Aggregates over monthly credit-card statements.
//!
//! Statements are first averaged per previous loan (`SK_ID_PREV`), then the
//! per-loan values are averaged per applicant through the loan-to-client
//! link. The link keeps one row per statement, so loans with more
//! statements weigh more in the applicant average.

use super::merge::{DerivedFeatures, NullFill, client_key};
use crate::error::Result;
use crate::schema::{CLIENT_ID, LOAN_ID, card_balance::*, derived};
use crate::types::FeatureStep;
use polars::prelude::*;

const USAGE_RATIO: &str = "credit_usage_ratio";

fn loan_key() -> Expr {
    col(LOAN_ID).cast(DataType::Int64)
}

/// Per-statement `AMT_BALANCE / AMT_CREDIT_LIMIT_ACTUAL`.
///
/// Division by zero, infinities and missing inputs all map to 0.
pub fn usage_ratio_expr() -> Expr {
    let ratio = col(AMT_BALANCE).cast(DataType::Float64)
        / col(AMT_CREDIT_LIMIT_ACTUAL).cast(DataType::Float64);
    when(ratio.clone().is_finite())
        .then(ratio)
        .otherwise(lit(0.0))
        .alias(USAGE_RATIO)
}

/// Mean usage ratio per previous loan.
pub fn usage_ratio_per_loan(card_balance: &DataFrame) -> Result<DataFrame> {
    let table = card_balance
        .clone()
        .lazy()
        .filter(col(LOAN_ID).is_not_null())
        .with_column(usage_ratio_expr())
        .group_by([loan_key()])
        .agg([col(USAGE_RATIO)
            .mean()
            .alias(derived::CC_AVG_CREDIT_USAGE_RATIO)])
        .collect()?;
    Ok(table)
}

/// Mean ATM drawings per statement for each previous loan. Loans with no
/// recorded drawings get 0.
pub fn atm_drawings_per_loan(card_balance: &DataFrame) -> Result<DataFrame> {
    let table = card_balance
        .clone()
        .lazy()
        .filter(col(LOAN_ID).is_not_null())
        .group_by([loan_key()])
        .agg([col(CNT_DRAWINGS_ATM_CURRENT)
            .cast(DataType::Float64)
            .mean()
            .alias(derived::AVG_CC_CNT_ATM_DRAWINGS)])
        .with_column(col(derived::AVG_CC_CNT_ATM_DRAWINGS).fill_null(lit(0.0)))
        .collect()?;
    Ok(table)
}

/// Average the per-loan aggregates across each applicant's loans.
///
/// No fill: applicants without card history stay missing, which keeps
/// "never had a card" apart from "had a card with zero usage".
pub fn rollup_to_applicant(
    card_balance: &DataFrame,
    usage_per_loan: DataFrame,
    atm_per_loan: DataFrame,
) -> Result<DerivedFeatures> {
    let link = card_balance
        .clone()
        .lazy()
        .filter(col(CLIENT_ID).is_not_null().and(col(LOAN_ID).is_not_null()))
        .select([client_key(), loan_key()]);

    let table = link
        .join(
            usage_per_loan.lazy(),
            [col(LOAN_ID)],
            [col(LOAN_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .join(
            atm_per_loan.lazy(),
            [col(LOAN_ID)],
            [col(LOAN_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .group_by([col(CLIENT_ID)])
        .agg([
            col(derived::CC_AVG_CREDIT_USAGE_RATIO).mean(),
            col(derived::AVG_CC_CNT_ATM_DRAWINGS).mean(),
        ])
        .collect()?;

    Ok(DerivedFeatures::new(
        FeatureStep::CardRollup,
        table,
        NullFill::Keep,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements() -> DataFrame {
        df![
            "SK_ID_PREV" => [10i64, 10, 11, 12, 12],
            "SK_ID_CURR" => [1i64, 1, 1, 2, 2],
            "AMT_BALANCE" => [Some(50.0), Some(30.0), Some(10.0), Some(0.0), None],
            "AMT_CREDIT_LIMIT_ACTUAL" => [100.0, 0.0, 20.0, 0.0, 50.0],
            "CNT_DRAWINGS_ATM_CURRENT" => [Some(2.0), Some(4.0), None, None, None],
        ]
        .unwrap()
    }

    fn by_key(df: &DataFrame, key: &str, column: &str, id: i64) -> Option<f64> {
        let ids = df.column(key).unwrap().i64().unwrap();
        let values = df.column(column).unwrap().f64().unwrap();
        ids.into_iter()
            .position(|v| v == Some(id))
            .and_then(|idx| values.get(idx))
    }

    #[test]
    fn test_zero_limit_ratio_is_zero() {
        let ratios = statements()
            .lazy()
            .select([usage_ratio_expr()])
            .collect()
            .unwrap();
        let values: Vec<Option<f64>> = ratios
            .column("credit_usage_ratio")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        // 30/0 is inf, 0/0 is NaN, null/50 is null: all become 0
        assert_eq!(
            values,
            vec![Some(0.5), Some(0.0), Some(0.5), Some(0.0), Some(0.0)]
        );
    }

    #[test]
    fn test_usage_ratio_per_loan() {
        let per_loan = usage_ratio_per_loan(&statements()).unwrap();
        assert_eq!(per_loan.height(), 3);
        assert_eq!(
            by_key(&per_loan, "SK_ID_PREV", "cc_avg_credit_usage_ratio", 10),
            Some(0.25)
        );
        assert_eq!(
            by_key(&per_loan, "SK_ID_PREV", "cc_avg_credit_usage_ratio", 12),
            Some(0.0)
        );
    }

    #[test]
    fn test_atm_drawings_missing_become_zero() {
        let per_loan = atm_drawings_per_loan(&statements()).unwrap();
        assert_eq!(
            by_key(&per_loan, "SK_ID_PREV", "avg_cc_cnt_ATM_drawings", 10),
            Some(3.0)
        );
        assert_eq!(
            by_key(&per_loan, "SK_ID_PREV", "avg_cc_cnt_ATM_drawings", 11),
            Some(0.0)
        );
    }

    #[test]
    fn test_rollup_weights_loans_by_statement_count() {
        let card = statements();
        let usage = usage_ratio_per_loan(&card).unwrap();
        let atm = atm_drawings_per_loan(&card).unwrap();
        let derived = rollup_to_applicant(&card, usage, atm).unwrap();

        assert_eq!(derived.table.height(), 2);
        assert_eq!(derived.null_fill, NullFill::Keep);

        // client 1: loan 10 (two statements, 0.25) and loan 11 (one, 0.5)
        let usage = by_key(&derived.table, "SK_ID_CURR", "cc_avg_credit_usage_ratio", 1).unwrap();
        assert!((usage - 1.0 / 3.0).abs() < 1e-12);
        // client 1 ATM: (3 + 3 + 0) / 3
        let atm = by_key(&derived.table, "SK_ID_CURR", "avg_cc_cnt_ATM_drawings", 1).unwrap();
        assert!((atm - 2.0).abs() < 1e-12);
    }
}
