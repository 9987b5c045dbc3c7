// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DAMA - Demand-Assigned Multiple Access
//!
//! Per-superframe allocation of return-link capacity across logged-on
//! terminals, constrained by the carrier plan and each terminal's MODCOD.
//!
//! ## Allocation order, per category and carriers group
//!
//! ```text
//! capacity reset (symbols -> packets at the carrier MODCOD)
//!   -> CRA     static reservations, granted unconditionally
//!   -> RBDC    fair-share of rate requests, fractional credit carry-over
//!   -> VBDC    volume requests served greedily, largest first
//!   -> FCA     leftover capacity sprinkled over terminals
//! ```
//!
//! The output is a [`TimePlan`]: per-terminal slot runs per carrier, which
//! the return scheduler turns into actual frames.

mod controller;
mod ttp;

pub use controller::{DamaController, DamaStats};
pub use ttp::{TimePlan, TtpEntry};
