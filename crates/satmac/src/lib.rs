// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # SATMAC - Return-Link MAC Core for Satellite Emulation
//!
//! A pure Rust implementation of the MAC-layer resource and framing subsystem
//! of a DVB-RCS2 return link (satellite terminal -> gateway), designed for
//! satellite system emulation testbeds.
//!
//! ## Architecture
//!
//! ```text
//! +----------------------------------------------------------------------+
//! |                           Gateway / NCC                              |
//! |  SuperframeClock --SoF--> ReturnScheduler --> DamaController --> TTP |
//! |                           SlottedAlohaNcc --> ACKs + decap bursts    |
//! +----------------------------------------------------------------------+
//! |                       Satellite Terminal (ST)                        |
//! |  DvbFifo (per QoS) --> SlottedAlohaTal --> replicas on random slots  |
//! |  SAC capacity requests (RBDC / VBDC) -----------------> uplink       |
//! +----------------------------------------------------------------------+
//! |                          Shared plumbing                             |
//! |  DvbFrame wire codec | ModcodTable + UnitConverter | probe counters  |
//! +----------------------------------------------------------------------+
//! ```
//!
//! Every superframe the clock fires a Start-of-Frame event; the scheduler
//! drains control frames into terminal contexts, runs the DAMA allocator
//! (RBDC fair-share, VBDC, FCA) against the carrier plan, and assembles
//! return frames from the FIFOs according to the resulting Terminal Time
//! Plan. In parallel, terminals holding random-access carriers transmit
//! Slotted-Aloha replicas; the gateway side resolves collisions and emits
//! ACKs before the next allocation round.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DamaController`] | Per-superframe RBDC/VBDC/FCA capacity allocation |
//! | [`ReturnScheduler`] | SoF-driven frame assembly against the time plan |
//! | [`SlottedAlohaTal`] / [`SlottedAlohaNcc`] | Random-access MAC, both ends |
//! | [`DvbFifo`] | Bounded MAC queue with per-period statistics |
//! | [`ModcodTable`] | MODCOD definitions and CNI-based lookup |
//! | [`DvbFrame`] | Tagged frame variant with a stable wire codec |
//!
//! ## Scope
//!
//! Encapsulation (GSE/RLE), UDP carrier transport, physical-layer plug-ins
//! and configuration file loading are external collaborators: the core
//! consumes them through the [`encap::PacketHandler`] capability and the
//! read-only structs in [`config`].

/// Carrier groups and terminal categories (return-link spectrum partition).
pub mod carrier;
/// Read-only configuration structs consumed by the core.
pub mod config;
/// DAMA controller: RBDC/VBDC/FCA allocation and the Terminal Time Plan.
pub mod dama;
/// Packet-handler capability consumed by the schedulers (encap boundary).
pub mod encap;
/// Block runtime: typed channels and one-thread-per-block message loops.
pub mod engine;
/// Bounded MAC FIFO with per-period statistics.
pub mod fifo;
/// MODCOD definitions, unit conversions and CNI simulation.
pub mod fmt;
/// DVB frame variants and the little-endian wire codec.
pub mod protocol;
/// Slotted-Aloha random access (terminal and gateway sides).
pub mod saloha;
/// Superframe clock and the return-link scheduler.
pub mod scheduler;
/// Named probe counters and sample export.
pub mod telemetry;
/// Per-terminal MAC state (requests, allocations, credit).
pub mod terminal;
/// Core scalar types and identifier conventions.
pub mod types;

pub use carrier::{AccessType, CarriersGroup, TerminalCategory};
pub use dama::{DamaController, TimePlan};
pub use fifo::{DvbFifo, FifoStats};
pub use fmt::{FmtSimulation, ModcodDef, ModcodTable, UnitConverter};
pub use protocol::{DvbFrame, FrameHeader};
pub use saloha::{SlottedAlohaNcc, SlottedAlohaTal};
pub use scheduler::{ReturnScheduler, SuperframeClock};
pub use terminal::TerminalContext;
pub use types::{CarrierId, Esn0Db, ModcodId, Qos, RateKbps, SfCount, SpotId, TalId};

use types::BaseId;

/// Errors returned by satmac operations.
///
/// Grouped by subsystem; configuration errors are fatal to block
/// initialization, everything else is recovered locally (drop or defer) and
/// mirrored by a named probe counter (see [`telemetry::counters`]).
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration (init-only, fatal to the block)
    // ========================================================================
    /// A required configuration parameter is absent.
    MissingParam(&'static str),
    /// A configuration parameter holds an unusable value.
    BadValue(String),
    /// MODCOD id absent from the definition table.
    UnknownModcod(ModcodId),

    // ========================================================================
    // Logon (request rejected, no state change)
    // ========================================================================
    /// A terminal with this id is already logged on.
    DuplicateTalId(TalId),
    /// The id is reserved for the NCC and cannot log on.
    TalIdIsNcc(TalId),
    /// Logon names a terminal category that does not exist.
    UnknownCategory(String),

    // ========================================================================
    // Allocation (logged and skipped for the current superframe)
    // ========================================================================
    /// Terminal cannot decode the MODCOD of its assigned carrier.
    ModcodMismatch { tal_id: TalId, modcod_id: ModcodId },
    /// Allocation would exceed the carrier's superframe capacity.
    CarrierOverflow(CarrierId),
    /// Request references a terminal with no logged-on context.
    UnknownTerminal(TalId),
    /// No MODCOD in the table is decodable at the given Es/N0.
    NoModcodAvailable(Esn0Db),

    // ========================================================================
    // Transport (packet dropped, counter incremented)
    // ========================================================================
    /// FIFO is at capacity; the element was tail-dropped.
    FifoFull,
    /// Frame buffer shorter than its declared layout.
    ShortFrame { expected: usize, got: usize },
    /// Message-type byte does not name a known frame variant.
    UnknownMessageType(u8),

    // ========================================================================
    // Slotted-Aloha
    // ========================================================================
    /// Packet exhausted its retransmission budget and was dropped.
    MaxRetransmissions { tal_id: TalId, base_id: BaseId },
    /// The superframe slot set cannot host the requested replicas.
    OutOfSlots,

    // ========================================================================
    // Timing (time advanced, best-effort drain)
    // ========================================================================
    /// Superframe processing exceeded its wall-clock budget before Emit.
    SuperframeOverrun(SfCount),
    /// SoF carries a number lower than the current superframe.
    BackwardsSof { current: SfCount, received: SfCount },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Configuration
            Error::MissingParam(name) => write!(f, "Missing configuration parameter: {}", name),
            Error::BadValue(msg) => write!(f, "Bad configuration value: {}", msg),
            Error::UnknownModcod(id) => write!(f, "Unknown MODCOD id: {}", id),
            // Logon
            Error::DuplicateTalId(tal_id) => write!(f, "Terminal {} is already logged on", tal_id),
            Error::TalIdIsNcc(tal_id) => {
                write!(f, "Terminal id {} is reserved for the NCC", tal_id)
            }
            Error::UnknownCategory(label) => write!(f, "Unknown terminal category: {}", label),
            // Allocation
            Error::ModcodMismatch { tal_id, modcod_id } => write!(
                f,
                "Terminal {} cannot decode carrier MODCOD {}",
                tal_id, modcod_id
            ),
            Error::CarrierOverflow(carrier_id) => {
                write!(f, "Allocation overflows carrier {}", carrier_id)
            }
            Error::UnknownTerminal(tal_id) => write!(f, "No context for terminal {}", tal_id),
            Error::NoModcodAvailable(esn0) => {
                write!(f, "No MODCOD decodable at Es/N0 {:.2} dB", esn0)
            }
            // Transport
            Error::FifoFull => write!(f, "FIFO full, element dropped"),
            Error::ShortFrame { expected, got } => {
                write!(f, "Frame too short: expected {} bytes, got {}", expected, got)
            }
            Error::UnknownMessageType(ty) => write!(f, "Unknown frame message type: {:#04x}", ty),
            // Slotted-Aloha
            Error::MaxRetransmissions { tal_id, base_id } => write!(
                f,
                "Packet ({}, {}) dropped after exhausting retransmissions",
                tal_id, base_id
            ),
            Error::OutOfSlots => write!(f, "Not enough free slots in the superframe"),
            // Timing
            Error::SuperframeOverrun(sf) => write!(f, "Superframe {} overran its budget", sf),
            Error::BackwardsSof { current, received } => write!(
                f,
                "Backwards SoF: received {} while at {}",
                received, current
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
