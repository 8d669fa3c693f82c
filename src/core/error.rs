use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectionError {
    /// A goal was crossed but the withdrawal would take the balance below zero.
    #[error("invalid withdrawal: amount {amount} exceeds balance {balance} in month {month}")]
    InvalidWithdrawal { month: u32, balance: i64, amount: i64 },
}
