// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Slotted-Aloha packet identity.
//!
//! `(tal_id, base_id)` names the logical packet; replicas add `replica_id`.
//! The payload travels with every replica so any clean copy decodes alone.

use crate::protocol::SalohaDataBody;
use crate::types::{BaseId, Qos, SfCount, SlotId, TalId};

/// One Slotted-Aloha logical packet on the terminal side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlottedAlohaPacket {
    /// Originating terminal.
    pub tal_id: TalId,
    /// QoS priority the payload came from.
    pub qos: Qos,
    /// Monotonic identifier assigned by the terminal.
    pub base_id: BaseId,
    /// Replicas transmitted per attempt.
    pub nb_replicas: u8,
    /// Superframe of the last transmission attempt.
    pub timestamp_sf: SfCount,
    /// Transmission attempts already spent beyond the first.
    pub nb_retransmissions: u16,
    /// Encapsulated payload.
    pub payload: Vec<u8>,
}

impl SlottedAlohaPacket {
    /// Logical identity used by ACKs and replica resolution.
    pub fn packet_key(&self) -> (TalId, BaseId) {
        (self.tal_id, self.base_id)
    }

    /// Wire body for one replica of this packet on `slot_id`.
    pub fn replica_body(&self, replica_id: u8, slot_id: SlotId) -> SalohaDataBody {
        SalohaDataBody {
            tal_id: self.tal_id,
            base_id: self.base_id,
            replica_id,
            nb_replicas: self.nb_replicas,
            slot_id,
            payload: self.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_bodies_share_identity() {
        let pkt = SlottedAlohaPacket {
            tal_id: 3,
            qos: 1,
            base_id: 42,
            nb_replicas: 2,
            timestamp_sf: 7,
            nb_retransmissions: 0,
            payload: vec![1, 2, 3],
        };
        let a = pkt.replica_body(0, 10);
        let b = pkt.replica_body(1, 55);
        assert_eq!((a.tal_id, a.base_id), pkt.packet_key());
        assert_eq!((b.tal_id, b.base_id), pkt.packet_key());
        assert_ne!(a.replica_id, b.replica_id);
        assert_eq!(a.payload, b.payload);
    }
}
