use std::time::Duration;

/// Capped exponential delay sequence.
///
/// Yields `initial`, then doubles each step until `cap`, then repeats `cap`
/// forever.
///
/// ```rust
/// use pagesmith_notify::BackoffSchedule;
/// use std::time::Duration;
///
/// let secs: Vec<u64> = BackoffSchedule::new(Duration::from_secs(1), Duration::from_secs(60))
///     .take(9)
///     .map(|d| d.as_secs())
///     .collect();
/// assert_eq!(secs, vec![1, 2, 4, 8, 16, 32, 60, 60, 60]);
/// ```
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    next: Duration,
    cap: Duration,
}

impl BackoffSchedule {
    #[must_use]
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            next: initial.min(cap),
            cap,
        }
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current.saturating_mul(2).min(self.cap);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_schedule() {
        let delays: Vec<Duration> =
            BackoffSchedule::new(Duration::from_secs(1), Duration::from_secs(60))
                .take(8)
                .collect();
        assert_eq!(
            delays,
            [1, 2, 4, 8, 16, 32, 60, 60].map(Duration::from_secs).to_vec()
        );
    }

    #[test]
    fn test_initial_above_cap_is_clamped() {
        let mut schedule = BackoffSchedule::new(Duration::from_secs(90), Duration::from_secs(60));
        assert_eq!(schedule.next(), Some(Duration::from_secs(60)));
        assert_eq!(schedule.next(), Some(Duration::from_secs(60)));
    }

    proptest! {
        #[test]
        fn prop_schedule_is_monotonic_and_capped(
            initial_ms in 1u64..10_000,
            cap_ms in 1u64..600_000,
            steps in 1usize..64,
        ) {
            let initial = Duration::from_millis(initial_ms);
            let cap = Duration::from_millis(cap_ms);
            let delays: Vec<Duration> = BackoffSchedule::new(initial, cap).take(steps).collect();

            prop_assert_eq!(delays[0], initial.min(cap));
            for pair in delays.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
                prop_assert!(pair[1] <= cap);
                prop_assert!(pair[1] == cap || pair[1] == pair[0] * 2);
            }
        }
    }
}
