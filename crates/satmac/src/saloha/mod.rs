// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Slotted-Aloha random access.
//!
//! Contention-based return access for small or latency-sensitive traffic,
//! bypassing DAMA. Both ends live here:
//!
//! ```text
//! ST (SlottedAlohaTal)                      GW (SlottedAlohaNcc)
//!   |                                          |
//!   |-- replica (base=7, r=0, slot 12) ------->|  slot 12: clean
//!   |-- replica (base=7, r=1, slot 40) ---X--->|  slot 40: collision
//!   |                                          |  base 7 has a clean replica
//!   |<------------- ACK (tal, base=7) ---------|
//!   |  (timeout instead -> backoff, resend)    |
//! ```
//!
//! Replicas of one logical packet share `(tal_id, base_id)` and differ by
//! `replica_id`. A slot hosting more than one replica collides for all of
//! them; the terminal learns of total loss only by ACK timeout.

mod backoff;
mod ncc;
mod packet;
mod tal;

pub use backoff::SlottedAlohaBackoff;
pub use ncc::{NccSuperframeOutput, SlottedAlohaNcc};
pub use packet::SlottedAlohaPacket;
pub use tal::SlottedAlohaTal;
