// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability

//! Slotted-Aloha end-to-end tests: collisions, replica resolution, ACK
//! round-trip, retransmission budget.

use std::collections::HashMap;

use satmac::config::{BackoffKind, BackoffParams, SalohaParams};
use satmac::protocol::{FrameBody, SalohaDataBody};
use satmac::saloha::{SlottedAlohaNcc, SlottedAlohaTal};
use satmac::types::{BaseId, SfCount, SlotId, TalId};

fn params() -> SalohaParams {
    SalohaParams {
        nb_replicas: 2,
        timeout_sf: 2,
        nb_max_retransmissions: 3,
        nb_max_packets: 8,
        backoff: BackoffParams {
            kind: BackoffKind::Beb,
            cw_max: 1, // deterministic: zero delay, always ready
            multiple: 2,
        },
    }
}

fn replica(tal_id: TalId, base_id: BaseId, replica_id: u8, slot_id: SlotId) -> SalohaDataBody {
    SalohaDataBody {
        tal_id,
        base_id,
        replica_id,
        nb_replicas: 2,
        slot_id,
        payload: vec![tal_id as u8],
    }
}

#[test]
fn single_collision_resolved_by_second_replica() {
    let mut ncc = SlottedAlohaNcc::new(1, 2);

    // Slot 1 hosts both terminals' first replicas; ST-A's second replica
    // is alone on slot 3, ST-B's second collides again on slot 2.
    ncc.on_data_frame(replica(10, 0, 0, 1));
    ncc.on_data_frame(replica(20, 0, 0, 1));
    ncc.on_data_frame(replica(10, 0, 1, 3));
    ncc.on_data_frame(replica(20, 0, 1, 2));
    ncc.on_data_frame(replica(30, 0, 0, 2));

    let out = ncc.on_sof(1);

    // ST-A is received once, via slot 3, and acknowledged
    assert_eq!(out.bursts.len(), 1);
    assert_eq!(out.bursts[0].0, 10);
    match &out.acks[0].body {
        FrameBody::SalohaAck { acks } => assert_eq!(acks, &vec![(10, 0)]),
        other => panic!("unexpected body: {:?}", other),
    }
    // ST-B and ST-C are silently lost: no NAK exists
    let stats = ncc.stats();
    assert_eq!(stats.packets_received, 1);
    assert_eq!(stats.packets_lost, 2);
    assert_eq!(stats.slot_collisions, 2);
}

#[test]
fn ack_round_trip_clears_terminal_state() {
    let mut tal = SlottedAlohaTal::new(10, 1, 5, 200, params(), 42);
    let mut ncc = SlottedAlohaNcc::new(1, 2);

    tal.on_encap_packet(0, vec![0xA1]);
    tal.on_encap_packet(0, vec![0xA2]);
    let frames = tal.on_sof(1);
    assert_eq!(frames.len(), 4); // 2 packets x 2 replicas

    for frame in &frames {
        match &frame.body {
            FrameBody::SalohaData(data) => ncc.on_data_frame(data.clone()),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    // next superframe: the gateway resolves and acknowledges, the ACKs are
    // delivered before the terminal's own SoF handling times anything out
    let out = ncc.on_sof(2);
    assert_eq!(out.bursts.len(), 2);
    for ack in &out.acks {
        tal.on_rcv_frame(ack);
    }
    assert_eq!(tal.wait_ack_count(), 0);
    assert_eq!(tal.stats().acked, 2);

    // nothing left to retransmit
    assert!(tal.on_sof(3).is_empty());
    assert!(tal.on_sof(4).is_empty());
}

#[test]
fn every_burst_acked_exactly_once() {
    let mut tal = SlottedAlohaTal::new(7, 1, 5, 500, params(), 3);
    let mut ncc = SlottedAlohaNcc::new(1, 2);

    for i in 0..8 {
        tal.on_encap_packet(0, vec![i]);
    }
    let frames = tal.on_sof(1);
    for frame in &frames {
        if let FrameBody::SalohaData(data) = &frame.body {
            ncc.on_data_frame(data.clone());
        }
    }

    let out = ncc.on_sof(2);
    let mut ack_count: HashMap<(TalId, BaseId), u32> = HashMap::new();
    for ack in &out.acks {
        if let FrameBody::SalohaAck { acks } = &ack.body {
            for &key in acks {
                *ack_count.entry(key).or_insert(0) += 1;
            }
        }
    }
    // wide slot set, no self-collision: all 8 packets landed, each acked once
    assert_eq!(out.bursts.len(), 8);
    assert_eq!(ack_count.len(), 8);
    assert!(ack_count.values().all(|&n| n == 1));
}

#[test]
fn lost_packet_retransmits_until_budget_then_drops() {
    let mut tal = SlottedAlohaTal::new(10, 1, 5, 100, params(), 7);
    tal.on_encap_packet(0, vec![0xEE]);

    let mut transmissions: Vec<SfCount> = Vec::new();
    // never deliver any ACK: the terminal learns by timeout alone
    for sf in 1..40 {
        if !tal.on_sof(sf).is_empty() {
            transmissions.push(sf);
        }
    }

    // initial transmission + nb_max_retransmissions, never more
    assert_eq!(transmissions.len(), 4);
    assert_eq!(tal.stats().dropped_max_retransmissions, 1);
    assert_eq!(tal.wait_ack_count(), 0);
    assert_eq!(tal.pending_count(), 0);

    // attempts are spaced by at least the ACK timeout
    for pair in transmissions.windows(2) {
        assert!(pair[1] - pair[0] >= 2);
    }
}

#[test]
fn replicas_share_logical_identity() {
    let mut tal = SlottedAlohaTal::new(4, 1, 5, 50, params(), 11);
    tal.on_encap_packet(3, vec![1, 2, 3]);
    let frames = tal.on_sof(1);

    let mut slots = Vec::new();
    for frame in &frames {
        match &frame.body {
            FrameBody::SalohaData(data) => {
                assert_eq!(data.tal_id, 4);
                assert_eq!(data.base_id, 0);
                assert_eq!(data.payload, vec![1, 2, 3]);
                slots.push(data.slot_id);
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }
    slots.sort_unstable();
    slots.dedup();
    assert_eq!(slots.len(), 2, "replicas must occupy distinct slots");
}
