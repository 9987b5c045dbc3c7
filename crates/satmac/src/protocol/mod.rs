// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DVB frame model and wire codec.
//!
//! The eight frame kinds exchanged between emulated nodes are one tagged
//! variant, [`DvbFrame`]; dispatch is an explicit `match`, never dynamic.
//! The byte layout is little-endian, self-consistent across nodes, and
//! deliberately not DVB bit-compliant: the emulation only needs stability,
//! not conformance.
//!
//! ## Wire layout
//!
//! ```text
//! +--------------+------------+--------------+------------------+----------------+
//! | message_type | carrier_id | spot_id(u16) | payload_len(u16) | cni_cb(i16)    |
//! +--------------+------------+--------------+------------------+----------------+
//! |                      body, layout per message type                           |
//! +------------------------------------------------------------------------------+
//! ```

mod frames;
mod wire;

pub use frames::{
    DvbFrame, FrameBody, FrameHeader, LogonReqBody, SacBody, SalohaDataBody, TtpBody,
    MSG_TYPE_BB, MSG_TYPE_CSC, MSG_TYPE_DVB_RCS, MSG_TYPE_LOGON_REQ, MSG_TYPE_LOGON_RESP,
    MSG_TYPE_SAC, MSG_TYPE_SALOHA_ACK, MSG_TYPE_SALOHA_DATA, MSG_TYPE_SOF, MSG_TYPE_TTP,
};
pub use wire::HEADER_LEN;
