// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability

//! VBDC allocation integration tests.

use std::sync::Arc;

use satmac::carrier::AccessType;
use satmac::config::{CarrierParams, CategoryParams, DamaParams};
use satmac::fmt::{ModcodTable, UnitConverter};
use satmac::protocol::SacBody;
use satmac::types::{TalId, VolPkt, CNI_UNAVAILABLE};
use satmac::DamaController;

/// 1 kbit per packet, 1000 ms superframe: rates and packets read 1:1.
const TABLE: &str = "8 8PSK 2/3 2.0 8.0 500\n";

fn controller(carrier_pktpf: u64) -> DamaController {
    let table = Arc::new(ModcodTable::from_text(TABLE).unwrap());
    let converter = UnitConverter::new(table, 1_000);
    DamaController::new(
        1,
        converter,
        DamaParams {
            fca_kbps: 0,
            max_rbdc_kbps: 10_000,
            max_vbdc_pkt: 10_000,
        },
        &[CategoryParams {
            label: "Standard".into(),
            carriers: vec![CarrierParams {
                carriers_id: 0,
                symbol_rate_bauds: carrier_pktpf * 500,
                carriers_count: 1,
                modcod_ids: vec![8],
                ratio: 10,
                access_type: AccessType::Dama,
                slots_per_carrier: 0,
            }],
        }],
    )
    .unwrap()
}

fn vbdc(tal_id: TalId, volume_pkt: VolPkt) -> SacBody {
    SacBody {
        tal_id,
        rbdc_kbps: 0,
        vbdc_pkt: volume_pkt,
        cni_centibels: CNI_UNAVAILABLE,
    }
}

#[test]
fn vbdc_exhaustion_serves_largest_first() {
    // 90 pkt of capacity against requests of 100 and 60
    let mut ctrl = controller(90);
    ctrl.logon(1, "Standard", 8, 0, 10_000, 10_000).unwrap();
    ctrl.logon(2, "Standard", 8, 0, 10_000, 10_000).unwrap();
    ctrl.on_sac(&vbdc(1, 100)).unwrap();
    ctrl.on_sac(&vbdc(2, 60)).unwrap();

    ctrl.run_superframe(0).unwrap();
    assert_eq!(ctrl.terminal(1).unwrap().vbdc_alloc_pkt(), 90);
    assert_eq!(ctrl.terminal(2).unwrap().vbdc_alloc_pkt(), 0);
    assert_eq!(ctrl.carrier_remaining(0), 0);

    // the unserved volumes survive the superframe
    assert_eq!(ctrl.terminal(1).unwrap().vbdc_request_pkt(), 10);
    assert_eq!(ctrl.terminal(2).unwrap().vbdc_request_pkt(), 60);

    // and drain over the following superframes
    ctrl.run_superframe(1).unwrap();
    assert_eq!(ctrl.terminal(2).unwrap().vbdc_alloc_pkt(), 60);
    assert_eq!(ctrl.terminal(1).unwrap().vbdc_alloc_pkt(), 10);
    assert_eq!(ctrl.terminal(1).unwrap().vbdc_request_pkt(), 0);
    assert_eq!(ctrl.terminal(2).unwrap().vbdc_request_pkt(), 0);
}

#[test]
fn vbdc_requests_accumulate() {
    let mut ctrl = controller(1_000);
    ctrl.logon(1, "Standard", 8, 0, 10_000, 10_000).unwrap();
    ctrl.on_sac(&vbdc(1, 40)).unwrap();
    ctrl.on_sac(&vbdc(1, 25)).unwrap();

    ctrl.run_superframe(0).unwrap();
    // both volumes were outstanding and both are served at once
    assert_eq!(ctrl.terminal(1).unwrap().vbdc_alloc_pkt(), 65);
    assert_eq!(ctrl.terminal(1).unwrap().vbdc_request_pkt(), 0);
}

#[test]
fn vbdc_one_shot_not_resubmitted() {
    let mut ctrl = controller(1_000);
    ctrl.logon(1, "Standard", 8, 0, 10_000, 10_000).unwrap();
    ctrl.on_sac(&vbdc(1, 50)).unwrap();

    ctrl.run_superframe(0).unwrap();
    assert_eq!(ctrl.terminal(1).unwrap().vbdc_alloc_pkt(), 50);

    // a volume request does not stand like a rate request does
    ctrl.run_superframe(1).unwrap();
    assert_eq!(ctrl.terminal(1).unwrap().vbdc_alloc_pkt(), 0);
}

#[test]
fn rbdc_serves_before_vbdc() {
    let mut ctrl = controller(100);
    ctrl.logon(1, "Standard", 8, 0, 10_000, 10_000).unwrap();
    ctrl.logon(2, "Standard", 8, 0, 10_000, 10_000).unwrap();
    ctrl.on_sac(&SacBody {
        tal_id: 1,
        rbdc_kbps: 80,
        vbdc_pkt: 0,
        cni_centibels: CNI_UNAVAILABLE,
    })
    .unwrap();
    ctrl.on_sac(&vbdc(2, 50)).unwrap();

    ctrl.run_superframe(0).unwrap();
    // RBDC takes its 80 first; VBDC only sees the 20 left
    assert_eq!(ctrl.terminal(1).unwrap().rbdc_alloc_pktpf(), 80);
    assert_eq!(ctrl.terminal(2).unwrap().vbdc_alloc_pkt(), 20);
    assert_eq!(ctrl.terminal(2).unwrap().vbdc_request_pkt(), 30);
}
