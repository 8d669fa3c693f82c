use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Inputs {
    pub rate_percent: f64,
    pub monthly_contribution: i64,
    pub withdrawal_amount: i64,
    pub horizon_months: u32,
    pub initial_balance: i64,
}

/// Month-by-month output of a single projection run.
///
/// `balance_before[i]` and `balance_after[i]` both describe month `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub balance_after: Vec<i64>,
    pub balance_before: Vec<i64>,
    pub withdrawal_months: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub final_balance: i64,
    pub total_withdrawn: i64,
    pub withdrawal_count: usize,
    pub withdrawal_months: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub month: u32,
    pub balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WithdrawalMarker {
    pub month: u32,
    pub balance: i64,
}
