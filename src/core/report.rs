use std::fmt::Write;

use super::types::{ChartPoint, Inputs, ProjectionResult, ProjectionSummary, WithdrawalMarker};

pub fn summarize(inputs: &Inputs, result: &ProjectionResult) -> ProjectionSummary {
    let withdrawal_count = result.withdrawal_months.len();
    ProjectionSummary {
        final_balance: result
            .balance_after
            .last()
            .copied()
            .unwrap_or(inputs.initial_balance),
        total_withdrawn: withdrawal_count as i64 * inputs.withdrawal_amount,
        withdrawal_count,
        withdrawal_months: result.withdrawal_months.clone(),
    }
}

/// The plotted series: start-of-month balances for months `1..=horizon`.
pub fn balance_series(result: &ProjectionResult) -> Vec<ChartPoint> {
    result
        .balance_before
        .iter()
        .enumerate()
        .map(|(idx, &balance)| ChartPoint {
            month: idx as u32 + 1,
            balance,
        })
        .collect()
}

/// One marker per withdrawal event, placed on the plotted series.
pub fn withdrawal_markers(result: &ProjectionResult) -> Vec<WithdrawalMarker> {
    result
        .withdrawal_months
        .iter()
        .filter_map(|&month| {
            let idx = (month as usize).checked_sub(1)?;
            result
                .balance_before
                .get(idx)
                .map(|&balance| WithdrawalMarker { month, balance })
        })
        .collect()
}

/// Formats a whole amount with `.` between thousands groups.
pub fn format_amount(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

pub fn render_text_report(summary: &ProjectionSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Final balance: R$ {}",
        format_amount(summary.final_balance)
    );
    let _ = writeln!(
        out,
        "Total withdrawn: R$ {}",
        format_amount(summary.total_withdrawn)
    );
    let _ = writeln!(out, "Withdrawals: {}", summary.withdrawal_count);
    if summary.withdrawal_months.is_empty() {
        let _ = writeln!(out, "Withdrawal months: none");
    } else {
        let months = summary
            .withdrawal_months
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Withdrawal months: {months}");
    }
    out
}
