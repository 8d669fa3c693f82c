use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_GOALS: [i64; 3] = [30_000, 50_000, 80_000];

/// Withdrawal goals kept for the lifetime of the server process.
///
/// Simulations read a snapshot; the engine never sees the book itself.
#[derive(Debug, Clone)]
pub struct GoalBook {
    goals: Arc<Mutex<Vec<i64>>>,
}

impl Default for GoalBook {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalBook {
    pub fn new() -> Self {
        Self::with_goals(DEFAULT_GOALS.to_vec())
    }

    pub fn with_goals(goals: Vec<i64>) -> Self {
        Self {
            goals: Arc::new(Mutex::new(goals)),
        }
    }

    pub fn add(&self, goal: i64) {
        self.lock().push(goal);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Goals in insertion order, as the engine processes them.
    pub fn snapshot(&self) -> Vec<i64> {
        self.lock().clone()
    }

    pub fn sorted(&self) -> Vec<i64> {
        let mut goals = self.snapshot();
        goals.sort_unstable();
        goals
    }

    // Every critical section is a single Vec call, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<i64>> {
        self.goals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
