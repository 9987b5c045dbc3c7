// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Messages exchanged between blocks.

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::protocol::DvbFrame;
use crate::types::{Qos, SfCount, TalId};

/// Kind tag for upward deliveries, as consumed by the upper block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Decapsulated network data.
    DecapData,
    /// Signalling (logon, SAC, TTP...).
    Sig,
    /// Link-up notification after a successful logon handshake.
    LinkUp,
}

/// One message between two blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMessage {
    /// A wire frame moving through the pipeline.
    Frame(DvbFrame),
    /// Encapsulated payload moving down toward the MAC.
    Encap {
        tal_id: TalId,
        qos: Qos,
        payload: Vec<u8>,
    },
    /// Decapsulated payload moving up toward IP.
    Decap { tal_id: TalId, payload: Vec<u8> },
    /// Superframe boundary.
    Sof(SfCount),
    /// The terminal's link is established.
    LinkUp { tal_id: TalId },
    /// Drain and stop.
    Shutdown,
}

/// Upward queue handed to a block's producers.
///
/// `enqueue` never blocks; the scheduler path must stay wait-free, so a
/// send to a closed queue is dropped and reported by the return value.
#[derive(Debug, Clone)]
pub struct UpwardQueue {
    tx: Sender<(MessageKind, BlockMessage)>,
}

impl UpwardQueue {
    /// Create a queue and its consuming end.
    pub fn new() -> (Self, Receiver<(MessageKind, BlockMessage)>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Enqueue a message; `false` when the consumer is gone.
    pub fn enqueue(&self, message: BlockMessage, kind: MessageKind) -> bool {
        self.tx.send((kind, message)).is_ok()
    }
}
