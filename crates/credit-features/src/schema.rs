//! Column names of the raw source tables and of the derived features.

/// Applicant identifier shared by every table.
pub const CLIENT_ID: &str = "SK_ID_CURR";

/// Previous-loan identifier used by the card-balance and previous-application tables.
pub const LOAN_ID: &str = "SK_ID_PREV";

/// Base applicant table.
pub mod application {
    pub const DAYS_EMPLOYED: &str = "DAYS_EMPLOYED";
    pub const NAME_CONTRACT_TYPE: &str = "NAME_CONTRACT_TYPE";
    pub const CODE_GENDER: &str = "CODE_GENDER";
    pub const FLAG_OWN_CAR: &str = "FLAG_OWN_CAR";
    pub const NAME_INCOME_TYPE: &str = "NAME_INCOME_TYPE";
    pub const NAME_EDUCATION_TYPE: &str = "NAME_EDUCATION_TYPE";
    pub const NAME_FAMILY_STATUS: &str = "NAME_FAMILY_STATUS";
}

/// External credit-bureau history.
pub mod bureau {
    pub const CREDIT_ACTIVE: &str = "CREDIT_ACTIVE";
    pub const AMT_CREDIT_SUM_DEBT: &str = "AMT_CREDIT_SUM_DEBT";
    pub const AMT_CREDIT_SUM: &str = "AMT_CREDIT_SUM";
    pub const AMT_CREDIT_SUM_LIMIT: &str = "AMT_CREDIT_SUM_LIMIT";
}

/// Monthly credit-card balance statements.
pub mod card_balance {
    pub const AMT_BALANCE: &str = "AMT_BALANCE";
    pub const AMT_CREDIT_LIMIT_ACTUAL: &str = "AMT_CREDIT_LIMIT_ACTUAL";
    pub const CNT_DRAWINGS_ATM_CURRENT: &str = "CNT_DRAWINGS_ATM_CURRENT";
}

/// Prior loan applications.
pub mod previous_application {
    pub const AMT_APPLICATION: &str = "AMT_APPLICATION";
    pub const AMT_CREDIT: &str = "AMT_CREDIT";
    pub const NAME_CONTRACT_STATUS: &str = "NAME_CONTRACT_STATUS";
    pub const NAME_YIELD_GROUP: &str = "NAME_YIELD_GROUP";
}

/// Names of the derived per-applicant features.
pub mod derived {
    /// Count of closed bureau credits. Filled with 0.
    pub const NUM_CLOSED_BUREAU_CREDITS: &str = "num_closed_bureau_credits";
    /// Mean bureau debt / (credit + 1). Filled with 0.
    pub const AVG_RATIO_BUREAU_CR_DEBT: &str = "avg_ratio_bureau_cr_debt";
    /// Sum of bureau credit-card limits. May be missing.
    pub const TTL_BUREAU_CC_LIMIT: &str = "ttl_bureau_cc_limit";
    /// Mean card balance / limit. May be missing.
    pub const CC_AVG_CREDIT_USAGE_RATIO: &str = "cc_avg_credit_usage_ratio";
    /// Mean ATM drawings per statement. May be missing.
    pub const AVG_CC_CNT_ATM_DRAWINGS: &str = "avg_cc_cnt_ATM_drawings";
    /// Mean approved / requested amount. May be missing.
    pub const PREV_AVG_RATIO_CREDIT_APPROVED: &str = "prev_avg_ratio_credit_approved";
    /// Number of approved prior applications. May be missing.
    pub const PREV_STATUS_APPROVED: &str = "prev_status_approved";
    /// Number of refused prior applications. May be missing.
    pub const PREV_STATUS_REFUSED: &str = "prev_status_refused";

    /// Prefix of the retained yield-group totals, e.g. `prev_yield_high`.
    pub const PREV_YIELD_PREFIX: &str = "prev_yield_";

    /// Column name for a yield-group total.
    pub fn prev_yield(group: &str) -> String {
        format!("{PREV_YIELD_PREFIX}{group}")
    }
}
