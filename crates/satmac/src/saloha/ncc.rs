// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Slotted-Aloha gateway side.
//!
//! Replica frames accumulate in a slot table while a superframe is open.
//! The next SoF closes it: slots hosting a single replica are clean, slots
//! hosting several collide for every replica on them. A logical packet with
//! at least one clean replica is delivered exactly once and acknowledged;
//! a packet whose replicas all collided is lost silently, the terminal
//! recovers by ACK timeout.
//!
//! ACKs for superframe `S` are returned to the caller before it starts the
//! allocation for `S+1`; the scheduler relies on that ordering.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::protocol::{DvbFrame, FrameBody, FrameHeader, SalohaDataBody};
use crate::telemetry::{counters, ProbeRegistry};
use crate::types::{BaseId, CarrierId, SfCount, SlotId, SpotId, TalId};
use crate::Result;

/// Counters exported by the gateway side.
#[derive(Debug, Clone, Copy, Default)]
pub struct NccStats {
    /// Replica frames ingested.
    pub replicas_received: u64,
    /// Slots that hosted more than one replica.
    pub slot_collisions: u64,
    /// Logical packets delivered upward.
    pub packets_received: u64,
    /// Logical packets lost with every replica collided.
    pub packets_lost: u64,
    /// Duplicate replicas discarded (same transmission seen twice).
    pub duplicates: u64,
}

/// Everything one closed superframe produced.
#[derive(Debug, Clone, Default)]
pub struct NccSuperframeOutput {
    /// ACK frames to transmit (one tuple per received logical packet).
    pub acks: Vec<DvbFrame>,
    /// Decapsulated payloads, in slot order, to hand upward.
    pub bursts: Vec<(TalId, Vec<u8>)>,
}

/// Slotted-Aloha receiver and collision resolver on the gateway.
pub struct SlottedAlohaNcc {
    spot_id: SpotId,
    /// Carrier tag ACK frames are routed on (control carrier).
    ack_carrier_id: CarrierId,
    /// Open superframe: replicas per slot.
    slots: BTreeMap<SlotId, Vec<SalohaDataBody>>,
    probes: Arc<ProbeRegistry>,
    stats: NccStats,
}

impl SlottedAlohaNcc {
    /// Create the receiver for one spot.
    pub fn new(spot_id: SpotId, ack_carrier_id: CarrierId) -> Self {
        Self {
            spot_id,
            ack_carrier_id,
            slots: BTreeMap::new(),
            probes: Arc::new(ProbeRegistry::new()),
            stats: NccStats::default(),
        }
    }

    /// Mirror collisions and decode faults on the node's probe counters.
    pub fn with_probes(mut self, probes: Arc<ProbeRegistry>) -> Self {
        self.probes = probes;
        self
    }

    /// Counters snapshot.
    pub fn stats(&self) -> NccStats {
        self.stats
    }

    /// Replicas currently buffered for the open superframe.
    pub fn buffered_replicas(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    /// Ingest a frame straight off the carrier transport.
    ///
    /// Undecodable bytes are dropped and counted; frame kinds other than
    /// Slotted-Aloha data are not this receiver's business and are ignored.
    pub fn on_wire_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let frame = match DvbFrame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.probes.record_error(&e);
                log::debug!("[SlottedAlohaNcc] undecodable frame dropped: {}", e);
                return Err(e);
            }
        };
        if let FrameBody::SalohaData(data) = frame.body {
            self.on_data_frame(data);
        }
        Ok(())
    }

    /// Ingest one replica of the open superframe.
    pub fn on_data_frame(&mut self, data: SalohaDataBody) {
        let replicas = self.slots.entry(data.slot_id).or_default();
        let duplicate = replicas.iter().any(|r| {
            r.tal_id == data.tal_id && r.base_id == data.base_id && r.replica_id == data.replica_id
        });
        if duplicate {
            self.stats.duplicates += 1;
            return;
        }
        self.stats.replicas_received += 1;
        replicas.push(data);
    }

    /// Drop buffered replicas of a terminal that logged off.
    pub fn terminal_gone(&mut self, tal_id: TalId) {
        for replicas in self.slots.values_mut() {
            replicas.retain(|r| r.tal_id != tal_id);
        }
        self.slots.retain(|_, replicas| !replicas.is_empty());
    }

    /// Close the open superframe: resolve replicas, emit ACKs and bursts.
    pub fn on_sof(&mut self, sf: SfCount) -> NccSuperframeOutput {
        let slots = std::mem::take(&mut self.slots);

        let mut received: Vec<(TalId, BaseId)> = Vec::new();
        let mut received_set: HashSet<(TalId, BaseId)> = HashSet::new();
        let mut seen: HashSet<(TalId, BaseId)> = HashSet::new();
        let mut bursts: Vec<(TalId, Vec<u8>)> = Vec::new();

        for (slot_id, replicas) in &slots {
            for replica in replicas {
                seen.insert((replica.tal_id, replica.base_id));
            }
            match replicas.as_slice() {
                [] => {}
                [clean] => {
                    let key = (clean.tal_id, clean.base_id);
                    // one delivery and one ACK per logical packet
                    if received_set.insert(key) {
                        received.push(key);
                        bursts.push((clean.tal_id, clean.payload.clone()));
                    }
                }
                colliding => {
                    self.stats.slot_collisions += 1;
                    self.probes.increment(counters::SLOT_COLLISION, 1);
                    log::debug!(
                        "[SlottedAlohaNcc] SF#{}: collision on slot {} ({} replicas)",
                        sf,
                        slot_id,
                        colliding.len()
                    );
                }
            }
        }

        let lost = seen.len() - received_set.len();
        self.stats.packets_received += received.len() as u64;
        self.stats.packets_lost += lost as u64;
        if lost > 0 {
            log::info!(
                "[SlottedAlohaNcc] SF#{}: {} packets received, {} lost to collisions",
                sf,
                received.len(),
                lost
            );
        }

        let acks = if received.is_empty() {
            Vec::new()
        } else {
            vec![DvbFrame::new(
                FrameHeader::new(self.ack_carrier_id, self.spot_id),
                FrameBody::SalohaAck { acks: received },
            )]
        };

        NccSuperframeOutput { acks, bursts }
    }
}
