// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability

//! Terminal logoff while traffic is in flight.

use std::sync::Arc;

use satmac::carrier::AccessType;
use satmac::config::{
    BackoffKind, BackoffParams, CarrierParams, CarrierTags, CategoryParams, DamaParams,
    SalohaParams,
};
use satmac::encap::FixedLenHandler;
use satmac::fifo::FifoElement;
use satmac::fmt::{CniSource, FmtSimulation, ModcodTable, UnitConverter};
use satmac::protocol::FrameBody;
use satmac::saloha::{SlottedAlohaNcc, SlottedAlohaTal};
use satmac::scheduler::ReturnScheduler;
use satmac::DamaController;

fn saloha_params() -> SalohaParams {
    SalohaParams {
        nb_replicas: 2,
        timeout_sf: 2,
        nb_max_retransmissions: 3,
        nb_max_packets: 8,
        backoff: BackoffParams {
            kind: BackoffKind::Beb,
            cw_max: 1,
            multiple: 2,
        },
    }
}

fn scheduler() -> ReturnScheduler {
    let table = Arc::new(ModcodTable::default_rcs2());
    let converter = UnitConverter::new(table.clone(), 53);
    let dama = DamaController::new(
        1,
        converter.clone(),
        DamaParams {
            fca_kbps: 0,
            max_rbdc_kbps: 8_000,
            max_vbdc_pkt: 4_000,
        },
        &[CategoryParams {
            label: "Standard".into(),
            carriers: vec![CarrierParams {
                carriers_id: 0,
                symbol_rate_bauds: 1_000_000,
                carriers_count: 1,
                modcod_ids: vec![4, 5, 6, 7],
                ratio: 10,
                access_type: AccessType::Dama,
                slots_per_carrier: 0,
            }],
        }],
    )
    .unwrap();
    let fmt = FmtSimulation::new(table, CniSource::None, 5);
    ReturnScheduler::new(
        1,
        CarrierTags {
            logon: 1,
            ctrl: 2,
            data_in_st: 3,
            data_in_gw: 4,
            data_out_st: 5,
            data_out_gw: 6,
        },
        dama,
        fmt,
        Box::new(FixedLenHandler),
        converter,
        vec![0],
        100,
    )
}

#[test]
fn logoff_with_pending_aloha_packets() {
    let mut tal = SlottedAlohaTal::new(9, 1, 5, 200, saloha_params(), 21);
    let mut ncc = SlottedAlohaNcc::new(1, 2);

    // three packets transmitted, all awaiting ACK
    for i in 0..3 {
        tal.on_encap_packet(0, vec![i]);
    }
    let frames = tal.on_sof(1);
    assert_eq!(tal.wait_ack_count(), 3);
    for frame in &frames {
        if let FrameBody::SalohaData(data) = &frame.body {
            ncc.on_data_frame(data.clone());
        }
    }

    // the terminal disappears before any ACK comes back
    let cancelled = tal.clear();
    assert_eq!(cancelled, 3);
    ncc.terminal_gone(9);

    // gateway: nothing delivered, nothing acked for the gone terminal
    let out = ncc.on_sof(2);
    assert!(out.bursts.is_empty());
    assert!(out.acks.is_empty());

    // terminal: no retransmissions, not even after the timeout
    for sf in 2..10 {
        assert!(tal.on_sof(sf).is_empty(), "SF#{}", sf);
    }
    assert_eq!(tal.stats().dropped_max_retransmissions, 0);
}

#[test]
fn logoff_clears_fifo_and_context() {
    let mut sched = scheduler();
    sched.logon(9, "Standard", 6.7, 0, 8_000, 100).unwrap();

    let fifo = sched.fifo(9, 0).unwrap();
    for i in 0..3 {
        fifo.push(FifoElement {
            tal_id: 9,
            qos: 0,
            payload: vec![i; 8],
        })
        .unwrap();
    }

    assert!(sched.logoff(9));
    // queue flushed with a drop record, context gone
    assert_eq!(fifo.current_pkt(), 0);
    let stats = fifo.get_stats_context();
    assert_eq!(stats.drop_pkt, 3);
    assert!(sched.dama().terminal(9).is_none());

    // the next superframe allocates nothing for the departed terminal
    let out = sched.on_sof(0).unwrap();
    assert_eq!(out.ttp.slots_for(9), 0);

    // a second logoff is a no-op
    assert!(!sched.logoff(9));
}

#[test]
fn relogon_starts_clean() {
    let mut sched = scheduler();
    sched.logon(9, "Standard", 6.7, 0, 8_000, 100).unwrap();
    sched.on_sac(satmac::protocol::SacBody {
        tal_id: 9,
        rbdc_kbps: 500,
        vbdc_pkt: 40,
        cni_centibels: satmac::types::CNI_UNAVAILABLE,
    });
    sched.on_sof(0).unwrap();
    assert!(sched.logoff(9));

    sched.logon(9, "Standard", 6.7, 0, 8_000, 100).unwrap();
    let ctx = sched.dama().terminal(9).unwrap();
    assert_eq!(ctx.rbdc_request_kbps(), 0);
    assert_eq!(ctx.vbdc_request_pkt(), 0);
    assert_eq!(ctx.rbdc_credit_kbps(), 0.0);
}
