// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Slotted-Aloha terminal side.
//!
//! Pending packets wait for a transmission window (backoff delay zero), are
//! replicated onto distinct random slots, and then sit in the wait-ACK set
//! until the gateway acknowledges them or the timeout expires. Timed-out
//! packets re-enter the schedule through the retransmission queue while
//! their budget lasts.
//!
//! Slot draws use a PRNG reseeded from `(seed, superframe)` so a run is
//! reproducible from its configuration seed alone.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::SalohaParams;
use crate::protocol::{DvbFrame, FrameBody, FrameHeader};
use crate::telemetry::ProbeRegistry;
use crate::types::{BaseId, CarrierId, Qos, SfCount, SlotId, SpotId, TalId};
use crate::Error;

use super::backoff::SlottedAlohaBackoff;
use super::packet::SlottedAlohaPacket;

/// Counters exported by the terminal side.
#[derive(Debug, Clone, Copy, Default)]
pub struct TalStats {
    /// Logical packets acknowledged.
    pub acked: u64,
    /// Packets dropped after exhausting their retransmission budget.
    pub dropped_max_retransmissions: u64,
    /// Packets deferred because the superframe ran out of slots.
    pub deferred_out_of_slots: u64,
    /// Replica frames emitted.
    pub replicas_sent: u64,
}

/// Slotted-Aloha transmitter of one terminal.
pub struct SlottedAlohaTal {
    tal_id: TalId,
    spot_id: SpotId,
    /// Carrier tag the replicas are routed on (data-out of the ST).
    carrier_id: CarrierId,
    params: SalohaParams,
    slots_per_superframe: SlotId,
    next_base_id: BaseId,
    /// Packets awaiting their first transmission, per QoS priority.
    pending: BTreeMap<Qos, VecDeque<SlottedAlohaPacket>>,
    /// Timed-out packets awaiting another attempt; scheduled before new ones.
    retransmissions: VecDeque<SlottedAlohaPacket>,
    /// Transmitted packets awaiting acknowledgement, by base id.
    wait_ack: HashMap<BaseId, SlottedAlohaPacket>,
    backoff: SlottedAlohaBackoff,
    rng: SmallRng,
    seed: u64,
    probes: Arc<ProbeRegistry>,
    stats: TalStats,
}

impl SlottedAlohaTal {
    /// Create the transmitter for one terminal.
    ///
    /// `slots_per_superframe` comes from the category's random-access
    /// carriers group.
    pub fn new(
        tal_id: TalId,
        spot_id: SpotId,
        carrier_id: CarrierId,
        slots_per_superframe: SlotId,
        params: SalohaParams,
        seed: u64,
    ) -> Self {
        Self {
            tal_id,
            spot_id,
            carrier_id,
            backoff: SlottedAlohaBackoff::new(&params.backoff),
            params,
            slots_per_superframe,
            next_base_id: 0,
            pending: BTreeMap::new(),
            retransmissions: VecDeque::new(),
            wait_ack: HashMap::new(),
            rng: SmallRng::seed_from_u64(seed),
            seed,
            probes: Arc::new(ProbeRegistry::new()),
            stats: TalStats::default(),
        }
    }

    /// Mirror drops and deferrals on the node's probe counters.
    pub fn with_probes(mut self, probes: Arc<ProbeRegistry>) -> Self {
        self.probes = probes;
        self
    }

    /// Terminal id this transmitter belongs to.
    pub fn tal_id(&self) -> TalId {
        self.tal_id
    }

    /// Counters snapshot.
    pub fn stats(&self) -> TalStats {
        self.stats
    }

    /// Packets waiting for a first transmission or a retry.
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum::<usize>() + self.retransmissions.len()
    }

    /// Packets transmitted and not yet acknowledged.
    pub fn wait_ack_count(&self) -> usize {
        self.wait_ack.len()
    }

    /// Accept an encapsulated packet from the upper block.
    ///
    /// Assigns the next monotonic base id and queues the packet on its QoS.
    pub fn on_encap_packet(&mut self, qos: Qos, payload: Vec<u8>) -> BaseId {
        let base_id = self.next_base_id;
        self.next_base_id += 1;
        self.pending
            .entry(qos)
            .or_default()
            .push_back(SlottedAlohaPacket {
                tal_id: self.tal_id,
                qos,
                base_id,
                nb_replicas: self.params.nb_replicas,
                timestamp_sf: 0,
                nb_retransmissions: 0,
                payload,
            });
        base_id
    }

    /// Superframe boundary: expire ACK waits, advance backoff, schedule.
    ///
    /// Returns the replica frames to transmit this superframe.
    pub fn on_sof(&mut self, sf: SfCount) -> Vec<DvbFrame> {
        self.expire_wait_ack(sf);
        self.backoff.tick();
        if self.backoff.is_ready() && self.pending_count() > 0 {
            self.schedule(sf)
        } else {
            Vec::new()
        }
    }

    /// Build this superframe's replica frames from the pending packets.
    ///
    /// Retransmissions go first, then new packets in QoS-priority order, up
    /// to `nb_max_packets` and the superframe slot budget. Packets that do
    /// not fit the slot set are deferred to the retransmission queue without
    /// consuming budget.
    pub fn schedule(&mut self, sf: SfCount) -> Vec<DvbFrame> {
        let replicas = usize::from(self.params.nb_replicas);
        let max_by_config = usize::from(self.params.nb_max_packets);
        let max_by_slots = usize::from(self.slots_per_superframe) / replicas;

        let mut batch = self.take_batch(max_by_config.min(max_by_slots));
        if max_by_slots < max_by_config {
            // the slot set, not the configuration, capped this batch
            let deferred = self
                .pending_count()
                .min(max_by_config.saturating_sub(batch.len()));
            if deferred > 0 {
                self.stats.deferred_out_of_slots += deferred as u64;
                self.probes.record_error(&Error::OutOfSlots);
                log::debug!(
                    "[SlottedAlohaTal] ST{}: SF#{} out of slots, {} packets deferred",
                    self.tal_id,
                    sf,
                    deferred
                );
            }
        }
        if batch.is_empty() {
            return Vec::new();
        }

        let slots = self.draw_slots(sf, batch.len() * replicas);
        let mut frames = Vec::with_capacity(batch.len() * replicas);
        let mut slot_it = slots.into_iter();
        for packet in &mut batch {
            packet.timestamp_sf = sf;
            for replica_id in 0..self.params.nb_replicas {
                // draw_slots returned exactly batch * replicas slots
                let slot_id = match slot_it.next() {
                    Some(s) => s,
                    None => break,
                };
                frames.push(DvbFrame::new(
                    FrameHeader::new(self.carrier_id, self.spot_id),
                    FrameBody::SalohaData(packet.replica_body(replica_id, slot_id)),
                ));
                self.stats.replicas_sent += 1;
            }
            self.wait_ack.insert(packet.base_id, packet.clone());
        }
        frames
    }

    /// Ingest a frame addressed to this terminal.
    ///
    /// Only Slotted-Aloha ACKs matter here; everything else is ignored.
    pub fn on_rcv_frame(&mut self, frame: &DvbFrame) {
        if let FrameBody::SalohaAck { acks } = &frame.body {
            for &(tal_id, base_id) in acks {
                if tal_id != self.tal_id {
                    continue;
                }
                if self.wait_ack.remove(&base_id).is_some() {
                    self.stats.acked += 1;
                    self.backoff.set_ok(&mut self.rng);
                    log::debug!(
                        "[SlottedAlohaTal] ST{}: packet {} acknowledged",
                        self.tal_id,
                        base_id
                    );
                }
            }
        }
    }

    /// Drop all pending state (logoff); returns how many packets died.
    pub fn clear(&mut self) -> usize {
        let count = self.pending_count() + self.wait_ack.len();
        self.pending.clear();
        self.retransmissions.clear();
        self.wait_ack.clear();
        count
    }

    /// Move timed-out wait-ACK packets to retransmission or drop them.
    fn expire_wait_ack(&mut self, sf: SfCount) {
        let timeout = SfCount::from(self.params.timeout_sf);
        let expired: Vec<BaseId> = self
            .wait_ack
            .iter()
            .filter(|(_, p)| sf.saturating_sub(p.timestamp_sf) >= timeout)
            .map(|(&base_id, _)| base_id)
            .collect();
        for base_id in expired {
            let mut packet = match self.wait_ack.remove(&base_id) {
                Some(p) => p,
                None => continue,
            };
            packet.nb_retransmissions += 1;
            if packet.nb_retransmissions <= self.params.nb_max_retransmissions {
                log::debug!(
                    "[SlottedAlohaTal] ST{}: packet {} timed out, retry {}/{}",
                    self.tal_id,
                    base_id,
                    packet.nb_retransmissions,
                    self.params.nb_max_retransmissions
                );
                self.retransmissions.push_back(packet);
                self.backoff.set_nok(&mut self.rng);
            } else {
                self.stats.dropped_max_retransmissions += 1;
                let err = Error::MaxRetransmissions {
                    tal_id: self.tal_id,
                    base_id,
                };
                self.probes.record_error(&err);
                log::warn!("[SlottedAlohaTal] {}", err);
            }
        }
    }

    /// Pull up to `max` packets: retransmissions first, then QoS order.
    fn take_batch(&mut self, max: usize) -> Vec<SlottedAlohaPacket> {
        let mut batch = Vec::new();
        while batch.len() < max {
            if let Some(packet) = self.retransmissions.pop_front() {
                batch.push(packet);
                continue;
            }
            let qos = match self
                .pending
                .iter()
                .find(|(_, queue)| !queue.is_empty())
                .map(|(&qos, _)| qos)
            {
                Some(qos) => qos,
                None => break,
            };
            if let Some(queue) = self.pending.get_mut(&qos) {
                if let Some(packet) = queue.pop_front() {
                    batch.push(packet);
                }
            }
        }
        batch
    }

    /// Draw `count` distinct slots from this superframe's slot set.
    ///
    /// Reseeded from `(seed, sf)` so two runs with the same configuration
    /// pick identical slots.
    fn draw_slots(&self, sf: SfCount, count: usize) -> Vec<SlotId> {
        let mut rng = SmallRng::seed_from_u64(self.seed ^ (u64::from(sf) << 20));
        let range = self.slots_per_superframe;
        let mut taken: HashSet<SlotId> = HashSet::with_capacity(count);
        let mut slots = Vec::with_capacity(count);
        while slots.len() < count {
            let slot = rng.gen_range(0..range);
            if taken.insert(slot) {
                slots.push(slot);
            }
        }
        slots
    }
}
