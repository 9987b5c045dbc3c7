// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame types: common header, bodies, tagged variant.

use crate::dama::TtpEntry;
use crate::types::{
    BaseId, CarrierId, ModcodId, RateKbps, SfCount, SlotId, SpotId, TalId, VolPkt, CNI_UNAVAILABLE,
};

// ============================================================================
// Message type tags
// ============================================================================

/// Start of Frame (superframe boundary).
pub const MSG_TYPE_SOF: u8 = 0x01;
/// Common signalling channel frame.
pub const MSG_TYPE_CSC: u8 = 0x02;
/// Terminal logon request.
pub const MSG_TYPE_LOGON_REQ: u8 = 0x10;
/// Logon response.
pub const MSG_TYPE_LOGON_RESP: u8 = 0x11;
/// Satellite Access Control (capacity request).
pub const MSG_TYPE_SAC: u8 = 0x20;
/// Terminal Time Plan.
pub const MSG_TYPE_TTP: u8 = 0x21;
/// Return-link data frame.
pub const MSG_TYPE_DVB_RCS: u8 = 0x30;
/// Forward-link / SCPC baseband frame.
pub const MSG_TYPE_BB: u8 = 0x31;
/// Slotted-Aloha data frame.
pub const MSG_TYPE_SALOHA_DATA: u8 = 0x40;
/// Slotted-Aloha acknowledgement frame.
pub const MSG_TYPE_SALOHA_ACK: u8 = 0x41;

// ============================================================================
// Header
// ============================================================================

/// Common frame header.
///
/// `message_type` and `payload_length` are derived from the body at encode
/// time and are not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Emulated carrier the frame travels on.
    pub carrier_id: CarrierId,
    /// Spot the carrier belongs to.
    pub spot_id: SpotId,
    /// Optional CNI annotation in centibels; [`CNI_UNAVAILABLE`] when absent.
    pub cni_centibels: i16,
}

impl FrameHeader {
    /// Header with no CNI annotation.
    pub fn new(carrier_id: CarrierId, spot_id: SpotId) -> Self {
        Self {
            carrier_id,
            spot_id,
            cni_centibels: CNI_UNAVAILABLE,
        }
    }

    /// Header annotated with a CNI value in centibels.
    pub fn with_cni(carrier_id: CarrierId, spot_id: SpotId, cni_centibels: i16) -> Self {
        Self {
            carrier_id,
            spot_id,
            cni_centibels,
        }
    }
}

// ============================================================================
// Bodies
// ============================================================================

/// SAC body: one terminal's capacity requests plus its measured CNI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SacBody {
    pub tal_id: TalId,
    pub rbdc_kbps: RateKbps,
    pub vbdc_pkt: VolPkt,
    /// CNI measured by the terminal, centibels; `CNI_UNAVAILABLE` if none.
    pub cni_centibels: i16,
}

/// TTP body: the plan for one superframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtpBody {
    pub superframe: SfCount,
    pub entries: Vec<TtpEntry>,
}

/// Logon request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonReqBody {
    pub tal_id: TalId,
    pub cra_kbps: RateKbps,
    pub max_rbdc_kbps: RateKbps,
    pub max_vbdc_pkt: VolPkt,
    /// Requested terminal category.
    pub category: String,
}

/// Slotted-Aloha data body: one replica on one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalohaDataBody {
    pub tal_id: TalId,
    pub base_id: BaseId,
    pub replica_id: u8,
    pub nb_replicas: u8,
    pub slot_id: SlotId,
    pub payload: Vec<u8>,
}

/// Frame body, one variant per message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBody {
    /// Superframe boundary, carrying the superframe number.
    Sof(SfCount),
    /// Common signalling: terminal presence announcement.
    Csc { tal_id: TalId },
    /// Terminal logon request.
    LogonReq(LogonReqBody),
    /// Logon response addressed to one terminal.
    LogonResp { tal_id: TalId },
    /// Capacity request.
    Sac(SacBody),
    /// Terminal time plan.
    Ttp(TtpBody),
    /// Return-link data from one terminal.
    DvbRcs {
        tal_id: TalId,
        modcod_id: ModcodId,
        payload: Vec<u8>,
    },
    /// Forward-link / SCPC baseband frame.
    Bb {
        modcod_id: ModcodId,
        payload: Vec<u8>,
    },
    /// Slotted-Aloha replica.
    SalohaData(SalohaDataBody),
    /// Slotted-Aloha acknowledgements for received logical packets.
    SalohaAck { acks: Vec<(TalId, BaseId)> },
}

/// A complete frame: common header plus typed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvbFrame {
    pub header: FrameHeader,
    pub body: FrameBody,
}

impl DvbFrame {
    /// Assemble a frame from header and body.
    pub fn new(header: FrameHeader, body: FrameBody) -> Self {
        Self { header, body }
    }

    /// Wire message-type tag of this frame's body.
    pub fn message_type(&self) -> u8 {
        match &self.body {
            FrameBody::Sof(_) => MSG_TYPE_SOF,
            FrameBody::Csc { .. } => MSG_TYPE_CSC,
            FrameBody::LogonReq(_) => MSG_TYPE_LOGON_REQ,
            FrameBody::LogonResp { .. } => MSG_TYPE_LOGON_RESP,
            FrameBody::Sac(_) => MSG_TYPE_SAC,
            FrameBody::Ttp(_) => MSG_TYPE_TTP,
            FrameBody::DvbRcs { .. } => MSG_TYPE_DVB_RCS,
            FrameBody::Bb { .. } => MSG_TYPE_BB,
            FrameBody::SalohaData(_) => MSG_TYPE_SALOHA_DATA,
            FrameBody::SalohaAck { .. } => MSG_TYPE_SALOHA_ACK,
        }
    }
}
