// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Monotonic superframe clock.
//!
//! One block advances the counter; every other block learns the superframe
//! number from the SoF events fanned out here. The counter never moves
//! backwards: duplicates are no-ops, stale numbers are counted and ignored.
//! A SoF is delivered only after the previous superframe's events were
//! handed to subscribers, which gives the ordering guarantee the allocator
//! relies on.

use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::telemetry::ProbeRegistry;
use crate::types::SfCount;
use crate::{Error, Result};

/// Counters exported by the clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockStats {
    /// SoF events fanned out.
    pub sof_emitted: u64,
    /// Duplicate SoF numbers ignored.
    pub duplicate_sof: u64,
    /// Backwards SoF numbers ignored.
    pub backwards_sof: u64,
}

/// Superframe counter with SoF fan-out.
pub struct SuperframeClock {
    current_sf: SfCount,
    started: bool,
    subscribers: Vec<Sender<SfCount>>,
    probes: Arc<ProbeRegistry>,
    stats: ClockStats,
}

impl SuperframeClock {
    /// Create a clock at superframe zero, not yet started.
    pub fn new() -> Self {
        Self {
            current_sf: 0,
            started: false,
            subscribers: Vec::new(),
            probes: Arc::new(ProbeRegistry::new()),
            stats: ClockStats::default(),
        }
    }

    /// Mirror timing faults on the node's probe counters.
    pub fn with_probes(mut self, probes: Arc<ProbeRegistry>) -> Self {
        self.probes = probes;
        self
    }

    /// Current superframe number.
    pub fn current_sf(&self) -> SfCount {
        self.current_sf
    }

    /// Counters snapshot.
    pub fn stats(&self) -> ClockStats {
        self.stats
    }

    /// Subscribe to SoF events; each subscriber gets its own FIFO channel.
    pub fn subscribe(&mut self) -> Receiver<SfCount> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Advance to the next superframe and fan out its SoF.
    pub fn tick(&mut self) -> SfCount {
        let sf = if self.started { self.current_sf + 1 } else { 0 };
        self.started = true;
        self.current_sf = sf;
        self.fan_out(sf);
        sf
    }

    /// Accept an external SoF (terminal side, carried by a SoF frame).
    ///
    /// Duplicates are no-ops; a number lower than the current one is an
    /// emulation fault, counted and ignored.
    pub fn on_sof(&mut self, sf: SfCount) -> Result<Option<SfCount>> {
        if self.started {
            if sf == self.current_sf {
                self.stats.duplicate_sof += 1;
                log::debug!("[SuperframeClock] duplicate SoF {} ignored", sf);
                return Ok(None);
            }
            if sf < self.current_sf {
                self.stats.backwards_sof += 1;
                let err = Error::BackwardsSof {
                    current: self.current_sf,
                    received: sf,
                };
                self.probes.record_error(&err);
                log::warn!("[SuperframeClock] {}, ignored", err);
                return Err(err);
            }
            if sf > self.current_sf + 1 {
                log::info!(
                    "[SuperframeClock] SoF jumped from {} to {} (lost SoF frames)",
                    self.current_sf,
                    sf
                );
            }
        }
        self.started = true;
        self.current_sf = sf;
        self.fan_out(sf);
        Ok(Some(sf))
    }

    fn fan_out(&mut self, sf: SfCount) {
        self.stats.sof_emitted += 1;
        self.subscribers.retain(|tx| tx.send(sf).is_ok());
    }
}

impl Default for SuperframeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_starts_at_zero() {
        let mut clock = SuperframeClock::new();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.current_sf(), 1);
    }

    #[test]
    fn test_subscribers_receive_every_sof() {
        let mut clock = SuperframeClock::new();
        let rx_a = clock.subscribe();
        let rx_b = clock.subscribe();
        clock.tick();
        clock.tick();
        assert_eq!(rx_a.try_recv().unwrap(), 0);
        assert_eq!(rx_a.try_recv().unwrap(), 1);
        assert_eq!(rx_b.try_recv().unwrap(), 0);
        assert_eq!(rx_b.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_sof_is_noop() {
        let mut clock = SuperframeClock::new();
        let rx = clock.subscribe();
        clock.on_sof(5).unwrap();
        assert_eq!(clock.on_sof(5).unwrap(), None);
        assert_eq!(clock.current_sf(), 5);
        assert_eq!(clock.stats().duplicate_sof, 1);
        // only one event reached the subscriber
        assert_eq!(rx.try_recv().unwrap(), 5);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_backwards_sof_ignored() {
        let mut clock = SuperframeClock::new();
        clock.on_sof(8).unwrap();
        let result = clock.on_sof(3);
        assert!(matches!(
            result,
            Err(Error::BackwardsSof {
                current: 8,
                received: 3
            })
        ));
        assert_eq!(clock.current_sf(), 8);
        assert_eq!(clock.stats().backwards_sof, 1);
    }

    #[test]
    fn test_backwards_sof_counted_on_probes() {
        use crate::telemetry::counters;

        let probes = Arc::new(ProbeRegistry::new());
        let mut clock = SuperframeClock::new().with_probes(probes.clone());
        clock.on_sof(8).unwrap();
        let _ = clock.on_sof(3);
        assert_eq!(probes.value(counters::BACKWARDS_SOF), 1);
    }

    #[test]
    fn test_sof_jump_accepted() {
        let mut clock = SuperframeClock::new();
        clock.on_sof(1).unwrap();
        // lost SoF frames: the counter follows the latest number
        assert_eq!(clock.on_sof(7).unwrap(), Some(7));
        assert_eq!(clock.current_sf(), 7);
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let mut clock = SuperframeClock::new();
        let rx = clock.subscribe();
        drop(rx);
        clock.tick();
        assert_eq!(clock.stats().sof_emitted, 1);
    }
}
