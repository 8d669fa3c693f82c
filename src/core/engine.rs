use tracing::{debug, warn};

use super::error::ProjectionError;
use super::types::{Inputs, ProjectionResult};

/// Projects the balance month by month, withdrawing `inputs.withdrawal_amount`
/// once for every goal the balance climbs above.
///
/// `goals` is only read; the run works on its own copy. Goals crossed in the
/// same month are handled in the order they were supplied, each one against
/// the balance left by the previous withdrawal.
pub fn simulate(inputs: &Inputs, goals: &[i64]) -> Result<ProjectionResult, ProjectionError> {
    let horizon = inputs.horizon_months as usize;
    let mut balance_after = Vec::with_capacity(horizon);
    let mut balance_before = Vec::with_capacity(horizon);
    let mut withdrawal_months = Vec::new();
    let mut active_goals = goals.to_vec();
    let mut balance = inputs.initial_balance;

    for month in 1..=inputs.horizon_months {
        balance_before.push(balance);
        balance = apply_monthly_growth(inputs, balance);
        balance = apply_goal_withdrawals(
            inputs,
            month,
            balance,
            &mut active_goals,
            &mut withdrawal_months,
        )?;
        balance_after.push(balance);
    }

    debug!(
        horizon_months = inputs.horizon_months,
        withdrawals = withdrawal_months.len(),
        goals_left = active_goals.len(),
        "projection finished"
    );

    Ok(ProjectionResult {
        balance_after,
        balance_before,
        withdrawal_months,
    })
}

// Growth and contribution are summed before truncating, so the fractional
// part of the growth is lost every month.
fn apply_monthly_growth(inputs: &Inputs, balance: i64) -> i64 {
    let grown = balance as f64 * (1.0 + inputs.rate_percent / 100.0)
        + inputs.monthly_contribution as f64;
    grown.trunc() as i64
}

fn apply_goal_withdrawals(
    inputs: &Inputs,
    month: u32,
    mut balance: i64,
    active_goals: &mut Vec<i64>,
    withdrawal_months: &mut Vec<u32>,
) -> Result<i64, ProjectionError> {
    let snapshot = active_goals.clone();
    let mut still_active = Vec::with_capacity(snapshot.len());

    for goal in snapshot {
        if balance <= goal {
            still_active.push(goal);
            continue;
        }
        if inputs.withdrawal_amount > balance {
            warn!(
                month,
                balance,
                amount = inputs.withdrawal_amount,
                goal,
                "withdrawal exceeds balance, aborting projection"
            );
            return Err(ProjectionError::InvalidWithdrawal {
                month,
                balance,
                amount: inputs.withdrawal_amount,
            });
        }
        balance -= inputs.withdrawal_amount;
        withdrawal_months.push(month);
        debug!(month, goal, balance, "goal crossed, withdrawal applied");
    }

    *active_goals = still_active;
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn inputs(
        rate_percent: f64,
        monthly_contribution: i64,
        withdrawal_amount: i64,
        horizon_months: u32,
        initial_balance: i64,
    ) -> Inputs {
        Inputs {
            rate_percent,
            monthly_contribution,
            withdrawal_amount,
            horizon_months,
            initial_balance,
        }
    }

    #[test]
    fn flat_balance_without_growth_contribution_or_goals() {
        let result = simulate(&inputs(0.0, 0, 0, 3, 1000), &[]).expect("valid run");
        assert_eq!(result.balance_after, vec![1000, 1000, 1000]);
        assert_eq!(result.balance_before, vec![1000, 1000, 1000]);
        assert!(result.withdrawal_months.is_empty());
    }

    #[test]
    fn goal_crossed_in_third_month_withdraws_once() {
        let result = simulate(&inputs(0.0, 100, 50, 3, 0), &[250]).expect("valid run");
        assert_eq!(result.balance_after, vec![100, 200, 250]);
        assert_eq!(result.balance_before, vec![0, 100, 200]);
        assert_eq!(result.withdrawal_months, vec![3]);
    }

    #[test]
    fn withdrawal_larger_than_balance_fails() {
        let err = simulate(&inputs(0.0, 0, 1000, 1, 60), &[50]).expect_err("must fail");
        assert_eq!(
            err,
            ProjectionError::InvalidWithdrawal {
                month: 1,
                balance: 60,
                amount: 1000,
            }
        );
    }

    #[test]
    fn balance_equal_to_goal_does_not_trigger() {
        let result = simulate(&inputs(0.0, 0, 10, 2, 500), &[500]).expect("valid run");
        assert_eq!(result.balance_after, vec![500, 500]);
        assert!(result.withdrawal_months.is_empty());
    }

    #[test]
    fn withdrawal_equal_to_balance_is_allowed() {
        let result = simulate(&inputs(0.0, 0, 60, 2, 60), &[50]).expect("valid run");
        assert_eq!(result.balance_after, vec![0, 0]);
        assert_eq!(result.withdrawal_months, vec![1]);
    }

    #[test]
    fn oracle_truncation_compounds_each_month() {
        // 101 * 1.5 = 151.5 -> 151; 151 * 1.5 = 226.5 -> 226; 226 * 1.5 = 339
        let result = simulate(&inputs(50.0, 0, 0, 3, 101), &[]).expect("valid run");
        assert_eq!(result.balance_before, vec![101, 151, 226]);
        assert_eq!(result.balance_after, vec![151, 226, 339]);
    }

    #[test]
    fn oracle_growth_contribution_and_withdrawal_match_hand_calculation() {
        // m1: 101 * 1.5 + 10 = 161.5 -> 161
        // m2: 161 * 1.5 + 10 = 251.5 -> 251
        // m3: 251 * 1.5 + 10 = 386.5 -> 386, above 300, withdraw 100 -> 286
        let result = simulate(&inputs(50.0, 10, 100, 3, 101), &[300]).expect("valid run");
        assert_eq!(result.balance_before, vec![101, 161, 251]);
        assert_eq!(result.balance_after, vec![161, 251, 286]);
        assert_eq!(result.withdrawal_months, vec![3]);
    }

    #[test]
    fn several_goals_in_one_month_see_the_reduced_balance() {
        // 200 > 150 -> 120; 120 > 100 -> 40; 40 > 60 is false
        let result = simulate(&inputs(0.0, 0, 80, 2, 200), &[150, 100, 60]).expect("valid run");
        assert_eq!(result.balance_after, vec![40, 40]);
        assert_eq!(result.withdrawal_months, vec![1, 1]);
    }

    #[test]
    fn goals_are_checked_in_supplied_order() {
        let ascending = simulate(&inputs(0.0, 0, 80, 1, 200), &[100, 150]).expect("valid run");
        assert_eq!(ascending.balance_after, vec![120]);
        assert_eq!(ascending.withdrawal_months, vec![1]);

        let descending = simulate(&inputs(0.0, 0, 80, 1, 200), &[150, 100]).expect("valid run");
        assert_eq!(descending.balance_after, vec![40]);
        assert_eq!(descending.withdrawal_months, vec![1, 1]);
    }

    #[test]
    fn goal_left_behind_in_one_month_can_trigger_later() {
        // m1: 200 > 100 -> 120, 120 > 150 false
        // m2: 120 + 50 = 170 > 150 -> 90
        let result = simulate(&inputs(0.0, 50, 80, 2, 150), &[100, 150]).expect("valid run");
        assert_eq!(result.balance_after, vec![120, 90]);
        assert_eq!(result.withdrawal_months, vec![1, 2]);
    }

    #[test]
    fn duplicate_goals_each_trigger_once() {
        let result = simulate(&inputs(0.0, 100, 10, 3, 0), &[150, 150]).expect("valid run");
        // m2: 200 > 150 -> 190 > 150 -> 180
        assert_eq!(result.balance_after, vec![100, 180, 280]);
        assert_eq!(result.withdrawal_months, vec![2, 2]);
    }

    #[test]
    fn crossed_goal_never_triggers_again() {
        let result = simulate(&inputs(0.0, 100, 10, 5, 0), &[50]).expect("valid run");
        assert_eq!(result.withdrawal_months, vec![1]);
        assert_eq!(result.balance_after, vec![90, 190, 290, 390, 490]);
    }

    #[test]
    fn caller_goals_are_left_untouched() {
        let goals = vec![80_000, 30_000, 50_000];
        let before = goals.clone();
        let result = simulate(&inputs(1.0, 1000, 5000, 120, 15_000), &goals).expect("valid run");
        assert_eq!(goals, before);
        assert_eq!(result.withdrawal_months.len(), 3);
    }

    #[test]
    fn zero_horizon_produces_empty_series() {
        let result = simulate(&inputs(1.0, 1000, 0, 0, 15_000), &[1]).expect("valid run");
        assert!(result.balance_after.is_empty());
        assert!(result.balance_before.is_empty());
        assert!(result.withdrawal_months.is_empty());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_series_lengths_and_withdrawal_months_are_consistent(
            rate_bp in 0u32..2_000,
            contribution in 0i64..10_000,
            withdrawal in 0i64..5_000,
            horizon in 1u32..240,
            initial in 0i64..1_000_000,
            goals in vec(1i64..2_000_000, 0..8)
        ) {
            let inputs = inputs(rate_bp as f64 / 100.0, contribution, withdrawal, horizon, initial);
            match simulate(&inputs, &goals) {
                Ok(result) => {
                    prop_assert_eq!(result.balance_after.len(), horizon as usize);
                    prop_assert_eq!(result.balance_before.len(), horizon as usize);
                    prop_assert!(result.withdrawal_months.len() <= goals.len());
                    prop_assert!(result.withdrawal_months.windows(2).all(|w| w[0] <= w[1]));
                    prop_assert!(result
                        .withdrawal_months
                        .iter()
                        .all(|&m| (1..=horizon).contains(&m)));
                    prop_assert_eq!(result.balance_before[0], initial);
                    for i in 1..result.balance_before.len() {
                        prop_assert_eq!(result.balance_before[i], result.balance_after[i - 1]);
                    }
                    prop_assert!(result.balance_after.iter().all(|&b| b >= 0));
                }
                Err(ProjectionError::InvalidWithdrawal { month, balance, amount }) => {
                    prop_assert!(amount > balance);
                    prop_assert!((1..=horizon).contains(&month));
                }
            }
        }

        #[test]
        fn prop_reruns_are_identical_and_goals_unchanged(
            rate_bp in 0u32..1_500,
            contribution in 0i64..5_000,
            withdrawal in 0i64..3_000,
            horizon in 1u32..120,
            initial in 0i64..200_000,
            goals in vec(1i64..500_000, 0..6)
        ) {
            let inputs = inputs(rate_bp as f64 / 100.0, contribution, withdrawal, horizon, initial);
            let original = goals.clone();
            let first = simulate(&inputs, &goals);
            let second = simulate(&inputs, &goals);
            prop_assert_eq!(first, second);
            prop_assert_eq!(goals, original);
        }

        #[test]
        fn prop_without_goals_balance_follows_truncated_compound_growth(
            rate_bp in 0u32..1_000,
            contribution in 0i64..5_000,
            horizon in 1u32..120,
            initial in 0i64..200_000
        ) {
            let rate = rate_bp as f64 / 100.0;
            let result = simulate(&inputs(rate, contribution, 1_000, horizon, initial), &[])
                .expect("no goals cannot fail");
            prop_assert!(result.withdrawal_months.is_empty());

            let mut expected = initial;
            for &actual in &result.balance_after {
                expected = (expected as f64 * (1.0 + rate / 100.0) + contribution as f64).trunc() as i64;
                prop_assert_eq!(actual, expected);
            }
        }

        #[test]
        fn prop_zero_withdrawal_never_fails_and_each_goal_fires_at_most_once(
            contribution in 1i64..5_000,
            horizon in 1u32..60,
            goals in vec(1i64..100_000, 0..10)
        ) {
            let result = simulate(&inputs(0.0, contribution, 0, horizon, 0), &goals)
                .expect("zero withdrawal cannot exceed balance");
            let final_balance = contribution * horizon as i64;
            let crossed = goals.iter().filter(|&&g| final_balance > g).count();
            prop_assert_eq!(result.withdrawal_months.len(), crossed);
        }
    }
}
