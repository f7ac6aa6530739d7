//! Accumulated wall time per simulation phase

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTiming {
    pub total: Duration,
    pub calls: u64,
}

impl PhaseTiming {
    /// Mean wall time per call.
    pub fn mean(&self) -> Duration {
        if self.calls == 0 {
            return Duration::ZERO;
        }
        match u32::try_from(self.calls) {
            Ok(calls) => self.total / calls,
            // Past u32::MAX calls the quotient fits in u64 nanoseconds.
            Err(_) => Duration::from_nanos((self.total.as_nanos() / u128::from(self.calls)) as u64),
        }
    }
}

/// Phase names are few and fixed, so timings live in a small vector kept
/// in first-seen order rather than a map.
#[derive(Debug, Default)]
pub struct PhaseProfiler {
    phases: Vec<(&'static str, PhaseTiming)>,
}

impl PhaseProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_phase<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let timing = match self.phases.iter().position(|(phase, _)| *phase == name) {
            Some(index) => &mut self.phases[index].1,
            None => {
                self.phases.push((name, PhaseTiming::default()));
                let last = self.phases.len() - 1;
                &mut self.phases[last].1
            }
        };
        timing.total += elapsed;
        timing.calls += 1;
        result
    }

    pub fn timing(&self, name: &str) -> PhaseTiming {
        self.phases
            .iter()
            .find(|(phase, _)| *phase == name)
            .map(|(_, timing)| *timing)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, PhaseTiming)> + '_ {
        self.phases.iter().copied()
    }

    pub fn reset(&mut self) {
        self.phases.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_first_seen_order() {
        let mut profiler = PhaseProfiler::new();
        for _ in 0..3 {
            profiler.time_phase("pre_update", || ());
            profiler.time_phase("update", || ());
        }

        assert_eq!(profiler.timing("update").calls, 3);
        assert_eq!(profiler.timing("post_update"), PhaseTiming::default());
        let names: Vec<_> = profiler.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["pre_update", "update"]);

        profiler.reset();
        assert_eq!(profiler.iter().count(), 0);
    }

    #[test]
    fn mean_of_unused_phase_is_zero() {
        assert_eq!(PhaseTiming::default().mean(), Duration::ZERO);
        let timing = PhaseTiming {
            total: Duration::from_millis(30),
            calls: 3,
        };
        assert_eq!(timing.mean(), Duration::from_millis(10));
    }

    #[test]
    fn mean_survives_call_counts_past_u32() {
        let timing = PhaseTiming {
            total: Duration::from_secs(1 << 32),
            calls: 1 << 32,
        };
        assert_eq!(timing.mean(), Duration::from_secs(1));
    }
}
