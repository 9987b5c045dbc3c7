// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Named counter registry.
//!
//! Counters are `AtomicU64` behind `Arc`, so blocks increment without a
//! lock; the registry lock is taken only on first registration and on
//! snapshot. Sampling does not reset counters, values are cumulative.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

/// One exported sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Probe name, dot-separated (`subsystem.event`).
    pub name: String,
    /// Cumulative value.
    pub value: u64,
    /// Milliseconds since the Unix epoch at sampling time.
    pub timestamp_ms: u64,
}

/// Registry of named cumulative counters.
#[derive(Debug, Default)]
pub struct ProbeRegistry {
    counters: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
}

impl ProbeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter handle.
    ///
    /// The handle can be kept and incremented without touching the
    /// registry again.
    pub fn counter(&self, name: &str) -> Arc<AtomicU64> {
        if let Some(counter) = self.counters.read().get(name) {
            return counter.clone();
        }
        self.counters
            .write()
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }

    /// Add `n` to a counter by name.
    pub fn increment(&self, name: &str, n: u64) {
        self.counter(name).fetch_add(n, Ordering::Relaxed);
    }

    /// Bump the canonical counter of a recoverable fault.
    ///
    /// Fatal configuration and logon errors have no counter and are left
    /// to the caller.
    pub fn record_error(&self, error: &crate::Error) {
        if let Some(name) = crate::telemetry::counters::for_error(error) {
            self.increment(name, 1);
        }
    }

    /// Current value of a counter; zero when never registered.
    pub fn value(&self, name: &str) -> u64 {
        self.counters
            .read()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Snapshot every counter, in name order.
    pub fn sample_all(&self) -> Vec<Sample> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.counters
            .read()
            .iter()
            .map(|(name, counter)| Sample {
                name: name.clone(),
                value: counter.load(Ordering::Relaxed),
                timestamp_ms,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::counters;

    #[test]
    fn test_counter_starts_at_zero() {
        let registry = ProbeRegistry::new();
        assert_eq!(registry.value(counters::FIFO_FULL), 0);
    }

    #[test]
    fn test_increment_by_name_and_handle() {
        let registry = ProbeRegistry::new();
        registry.increment(counters::SLOT_COLLISION, 2);
        let handle = registry.counter(counters::SLOT_COLLISION);
        handle.fetch_add(3, Ordering::Relaxed);
        assert_eq!(registry.value(counters::SLOT_COLLISION), 5);
    }

    #[test]
    fn test_sample_all_sorted_and_cumulative() {
        let registry = ProbeRegistry::new();
        registry.increment(counters::BACKWARDS_SOF, 1);
        registry.increment(counters::FIFO_FULL, 4);

        let samples = registry.sample_all();
        let names: Vec<&str> = samples.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![counters::BACKWARDS_SOF, counters::FIFO_FULL]
        );
        // sampling twice does not reset
        assert_eq!(registry.sample_all()[1].value, 4);
    }

    #[test]
    fn test_record_error_maps_to_canonical_counter() {
        let registry = ProbeRegistry::new();
        registry.record_error(&crate::Error::FifoFull);
        registry.record_error(&crate::Error::OutOfSlots);
        registry.record_error(&crate::Error::OutOfSlots);
        assert_eq!(registry.value(counters::FIFO_FULL), 1);
        assert_eq!(registry.value(counters::OUT_OF_SLOTS), 2);

        // fatal init errors are not counted
        registry.record_error(&crate::Error::MissingParam("categories"));
        assert_eq!(registry.sample_all().len(), 2);
    }

    #[test]
    fn test_shared_handles_across_threads() {
        let registry = Arc::new(ProbeRegistry::new());
        let mut threads = Vec::new();
        for _ in 0..4 {
            let handle = registry.counter(counters::MAX_RETRANSMISSIONS);
            threads.push(std::thread::spawn(move || {
                for _ in 0..1_000 {
                    handle.fetch_add(1, Ordering::Relaxed);
                }
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(registry.value(counters::MAX_RETRANSMISSIONS), 4_000);
    }
}
