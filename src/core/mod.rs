mod engine;
mod error;
mod report;
mod types;

pub use engine::simulate;
pub use error::ProjectionError;
pub use report::{
    balance_series, format_amount, render_text_report, summarize, withdrawal_markers,
};
pub use types::{ChartPoint, Inputs, ProjectionResult, ProjectionSummary, WithdrawalMarker};
