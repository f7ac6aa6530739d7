//! Named event counters

use std::collections::BTreeMap;

/// Monotonic counters keyed by static names, iterated in name order.
#[derive(Debug, Default)]
pub struct Counter {
    counts: BTreeMap<&'static str, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: &'static str, value: u64) {
        *self.counts.entry(name).or_insert(0) += value;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.counts.iter().map(|(&name, &count)| (name, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_name() {
        let mut counter = Counter::new();
        counter.increment("pause");
        counter.add("pause", 2);
        counter.increment("stop");

        assert_eq!(counter.get("pause"), 3);
        assert_eq!(counter.get("missing"), 0);
        assert_eq!(
            counter.iter().collect::<Vec<_>>(),
            vec![("pause", 3), ("stop", 1)]
        );
    }
}
