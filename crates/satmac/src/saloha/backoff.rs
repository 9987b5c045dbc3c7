// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Contention-window backoff for Slotted-Aloha terminals.
//!
//! Two algorithms over one state machine, selected at init:
//!
//! | Variant | on success | on failure |
//! |---------|------------|------------|
//! | BEB  | `cw = max(1, cw / multiple)` | `cw = min(cw * multiple, cw_max)` |
//! | EIED | `cw = min(cw * isqrt(multiple), cw_max)` | `cw = min(cw * multiple, cw_max)` |
//!
//! After every window update a delay is drawn uniformly from `[0, cw)`; the
//! terminal transmits again once that many superframes have elapsed.

use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::{BackoffKind, BackoffParams};

/// Backoff state machine; the owning terminal provides the PRNG.
#[derive(Debug, Clone)]
pub struct SlottedAlohaBackoff {
    kind: BackoffKind,
    cw: u16,
    cw_max: u16,
    multiple: u16,
    /// Superframes left before the next transmission window.
    delay: u16,
}

/// Integer square root, truncating.
fn isqrt(v: u16) -> u16 {
    (f64::from(v).sqrt()) as u16
}

impl SlottedAlohaBackoff {
    /// Create from configuration; starts ready with a minimal window.
    pub fn new(params: &BackoffParams) -> Self {
        Self {
            kind: params.kind,
            cw: 1,
            cw_max: params.cw_max.max(1),
            multiple: params.multiple.max(2),
            delay: 0,
        }
    }

    /// Current contention window.
    pub fn cw(&self) -> u16 {
        self.cw
    }

    /// Superframes left until the next transmission window.
    pub fn delay(&self) -> u16 {
        self.delay
    }

    /// True when the terminal may transmit this superframe.
    pub fn is_ready(&self) -> bool {
        self.delay == 0
    }

    /// Advance one superframe.
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
    }

    /// Record a successful transmission and redraw the delay.
    pub fn set_ok(&mut self, rng: &mut SmallRng) {
        self.cw = match self.kind {
            BackoffKind::Beb => (self.cw / self.multiple).max(1),
            BackoffKind::Eied => (self.cw.saturating_mul(isqrt(self.multiple)))
                .min(self.cw_max)
                .max(1),
        };
        self.set_random(rng);
    }

    /// Record a failed transmission and redraw the delay.
    pub fn set_nok(&mut self, rng: &mut SmallRng) {
        self.cw = self.cw.saturating_mul(self.multiple).min(self.cw_max).max(1);
        self.set_random(rng);
    }

    fn set_random(&mut self, rng: &mut SmallRng) {
        self.delay = rng.gen_range(0..self.cw);
    }
}
