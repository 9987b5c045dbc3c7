// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian wire codec for [`DvbFrame`].
//!
//! Layouts per message type, after the 8-byte common header:
//!
//! - SOF: `superframe(u32)`
//! - CSC / LOGON_RESP: `tal_id(u16)`
//! - LOGON_REQ: `tal_id(u16) cra(u32) max_rbdc(u32) max_vbdc(u32) label_len(u8) label`
//! - SAC: `tal_id(u16) rbdc_kbps(u32) vbdc_pkt(u32) cni_cb(i16)`
//! - TTP: `superframe(u32) count(u16)` then per entry
//!   `tal_id(u16) carrier_id(u8) first_slot(u16) nb_slots(u16) modcod(u8)`
//! - DVB_RCS: `tal_id(u16) modcod(u8)` + payload
//! - BB: `modcod(u8)` + payload
//! - SALOHA_DATA: `tal_id(u16) base_id(u64) replica(u8) nb_replicas(u8) slot(u16)` + payload
//! - SALOHA_ACK: repeated `tal_id(u16) base_id(u64)`

use crate::dama::TtpEntry;
use crate::types::{SlotId, TalId};
use crate::{Error, Result};

use super::frames::{
    DvbFrame, FrameBody, FrameHeader, LogonReqBody, SacBody, SalohaDataBody, TtpBody,
    MSG_TYPE_BB, MSG_TYPE_CSC, MSG_TYPE_DVB_RCS, MSG_TYPE_LOGON_REQ, MSG_TYPE_LOGON_RESP,
    MSG_TYPE_SAC, MSG_TYPE_SALOHA_ACK, MSG_TYPE_SALOHA_DATA, MSG_TYPE_SOF, MSG_TYPE_TTP,
};

/// Common header length in bytes.
pub const HEADER_LEN: usize = 8;

const TTP_ENTRY_LEN: usize = 8;
const SALOHA_DATA_PREFIX_LEN: usize = 14;
const SALOHA_ACK_ENTRY_LEN: usize = 10;

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_i16(buf: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn need(buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() < expected {
        return Err(Error::ShortFrame {
            expected,
            got: buf.len(),
        });
    }
    Ok(())
}

impl DvbFrame {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let body = self.encode_body();
        let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
        buf.push(self.message_type());
        buf.push(self.header.carrier_id);
        buf.extend_from_slice(&self.header.spot_id.to_le_bytes());
        buf.extend_from_slice(&(body.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.header.cni_centibels.to_le_bytes());
        buf.extend_from_slice(&body);
        buf
    }

    fn encode_body(&self) -> Vec<u8> {
        let mut b = Vec::new();
        match &self.body {
            FrameBody::Sof(sf) => b.extend_from_slice(&sf.to_le_bytes()),
            FrameBody::Csc { tal_id } | FrameBody::LogonResp { tal_id } => {
                b.extend_from_slice(&tal_id.to_le_bytes());
            }
            FrameBody::LogonReq(req) => {
                b.extend_from_slice(&req.tal_id.to_le_bytes());
                b.extend_from_slice(&req.cra_kbps.to_le_bytes());
                b.extend_from_slice(&req.max_rbdc_kbps.to_le_bytes());
                b.extend_from_slice(&req.max_vbdc_pkt.to_le_bytes());
                let label = req.category.as_bytes();
                b.push(label.len().min(255) as u8);
                b.extend_from_slice(&label[..label.len().min(255)]);
            }
            FrameBody::Sac(sac) => {
                b.extend_from_slice(&sac.tal_id.to_le_bytes());
                b.extend_from_slice(&sac.rbdc_kbps.to_le_bytes());
                b.extend_from_slice(&sac.vbdc_pkt.to_le_bytes());
                b.extend_from_slice(&sac.cni_centibels.to_le_bytes());
            }
            FrameBody::Ttp(ttp) => {
                b.extend_from_slice(&ttp.superframe.to_le_bytes());
                b.extend_from_slice(&(ttp.entries.len() as u16).to_le_bytes());
                for e in &ttp.entries {
                    b.extend_from_slice(&e.tal_id.to_le_bytes());
                    b.push(e.carrier_id);
                    b.extend_from_slice(&e.first_slot.to_le_bytes());
                    b.extend_from_slice(&e.nb_slots.to_le_bytes());
                    b.push(e.modcod_id);
                }
            }
            FrameBody::DvbRcs {
                tal_id,
                modcod_id,
                payload,
            } => {
                b.extend_from_slice(&tal_id.to_le_bytes());
                b.push(*modcod_id);
                b.extend_from_slice(payload);
            }
            FrameBody::Bb { modcod_id, payload } => {
                b.push(*modcod_id);
                b.extend_from_slice(payload);
            }
            FrameBody::SalohaData(data) => {
                b.extend_from_slice(&data.tal_id.to_le_bytes());
                b.extend_from_slice(&data.base_id.to_le_bytes());
                b.push(data.replica_id);
                b.push(data.nb_replicas);
                b.extend_from_slice(&data.slot_id.to_le_bytes());
                b.extend_from_slice(&data.payload);
            }
            FrameBody::SalohaAck { acks } => {
                for (tal_id, base_id) in acks {
                    b.extend_from_slice(&tal_id.to_le_bytes());
                    b.extend_from_slice(&base_id.to_le_bytes());
                }
            }
        }
        b
    }

    /// Decode a frame from wire bytes.
    ///
    /// Fails with [`Error::ShortFrame`] on truncation and
    /// [`Error::UnknownMessageType`] on an unrecognized tag; both map to a
    /// drop-and-count at the call site.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        need(buf, HEADER_LEN)?;
        let message_type = buf[0];
        let header = FrameHeader {
            carrier_id: buf[1],
            spot_id: read_u16(buf, 2),
            cni_centibels: read_i16(buf, 6),
        };
        let payload_len = read_u16(buf, 4) as usize;
        need(buf, HEADER_LEN + payload_len)?;
        let body = &buf[HEADER_LEN..HEADER_LEN + payload_len];

        let body = match message_type {
            MSG_TYPE_SOF => {
                need(body, 4)?;
                FrameBody::Sof(read_u32(body, 0))
            }
            MSG_TYPE_CSC => {
                need(body, 2)?;
                FrameBody::Csc {
                    tal_id: read_u16(body, 0),
                }
            }
            MSG_TYPE_LOGON_RESP => {
                need(body, 2)?;
                FrameBody::LogonResp {
                    tal_id: read_u16(body, 0),
                }
            }
            MSG_TYPE_LOGON_REQ => {
                need(body, 15)?;
                let label_len = body[14] as usize;
                need(body, 15 + label_len)?;
                FrameBody::LogonReq(LogonReqBody {
                    tal_id: read_u16(body, 0),
                    cra_kbps: read_u32(body, 2),
                    max_rbdc_kbps: read_u32(body, 6),
                    max_vbdc_pkt: read_u32(body, 10),
                    category: String::from_utf8_lossy(&body[15..15 + label_len]).into_owned(),
                })
            }
            MSG_TYPE_SAC => {
                need(body, 12)?;
                FrameBody::Sac(SacBody {
                    tal_id: read_u16(body, 0),
                    rbdc_kbps: read_u32(body, 2),
                    vbdc_pkt: read_u32(body, 6),
                    cni_centibels: read_i16(body, 10),
                })
            }
            MSG_TYPE_TTP => {
                need(body, 6)?;
                let superframe = read_u32(body, 0);
                let count = read_u16(body, 4) as usize;
                need(body, 6 + count * TTP_ENTRY_LEN)?;
                let mut entries = Vec::with_capacity(count);
                for i in 0..count {
                    let at = 6 + i * TTP_ENTRY_LEN;
                    entries.push(TtpEntry {
                        tal_id: read_u16(body, at),
                        carrier_id: body[at + 2],
                        first_slot: read_u16(body, at + 3),
                        nb_slots: read_u16(body, at + 5),
                        modcod_id: body[at + 7],
                    });
                }
                FrameBody::Ttp(TtpBody {
                    superframe,
                    entries,
                })
            }
            MSG_TYPE_DVB_RCS => {
                need(body, 3)?;
                FrameBody::DvbRcs {
                    tal_id: read_u16(body, 0),
                    modcod_id: body[2],
                    payload: body[3..].to_vec(),
                }
            }
            MSG_TYPE_BB => {
                need(body, 1)?;
                FrameBody::Bb {
                    modcod_id: body[0],
                    payload: body[1..].to_vec(),
                }
            }
            MSG_TYPE_SALOHA_DATA => {
                need(body, SALOHA_DATA_PREFIX_LEN)?;
                FrameBody::SalohaData(SalohaDataBody {
                    tal_id: read_u16(body, 0),
                    base_id: read_u64(body, 2),
                    replica_id: body[10],
                    nb_replicas: body[11],
                    slot_id: read_u16(body, 12) as SlotId,
                    payload: body[SALOHA_DATA_PREFIX_LEN..].to_vec(),
                })
            }
            MSG_TYPE_SALOHA_ACK => {
                if body.len() % SALOHA_ACK_ENTRY_LEN != 0 {
                    return Err(Error::ShortFrame {
                        expected: body.len().next_multiple_of(SALOHA_ACK_ENTRY_LEN),
                        got: body.len(),
                    });
                }
                let acks: Vec<(TalId, u64)> = body
                    .chunks_exact(SALOHA_ACK_ENTRY_LEN)
                    .map(|chunk| (read_u16(chunk, 0), read_u64(chunk, 2)))
                    .collect();
                FrameBody::SalohaAck { acks }
            }
            other => return Err(Error::UnknownMessageType(other)),
        };

        Ok(DvbFrame { header, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CNI_UNAVAILABLE;

    fn header() -> FrameHeader {
        FrameHeader::with_cni(2, 1, 850)
    }

    #[test]
    fn test_sof_layout() {
        let frame = DvbFrame::new(header(), FrameBody::Sof(0x0102_0304));
        let bytes = frame.encode();
        // header: type, carrier, spot(le), len(le), cni(le)
        assert_eq!(
            bytes,
            vec![0x01, 0x02, 0x01, 0x00, 0x04, 0x00, 0x52, 0x03, 0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(DvbFrame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_sac_layout() {
        let frame = DvbFrame::new(
            FrameHeader::new(3, 1),
            FrameBody::Sac(SacBody {
                tal_id: 7,
                rbdc_kbps: 500,
                vbdc_pkt: 60,
                cni_centibels: -120,
            }),
        );
        let bytes = frame.encode();
        assert_eq!(bytes.len(), HEADER_LEN + 12);
        assert_eq!(bytes[0], MSG_TYPE_SAC);
        let decoded = DvbFrame::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.header.cni_centibels, CNI_UNAVAILABLE);
    }

    #[test]
    fn test_ttp_with_entries() {
        let frame = DvbFrame::new(
            header(),
            FrameBody::Ttp(TtpBody {
                superframe: 12,
                entries: vec![
                    TtpEntry {
                        tal_id: 1,
                        carrier_id: 0,
                        first_slot: 0,
                        nb_slots: 10,
                        modcod_id: 7,
                    },
                    TtpEntry {
                        tal_id: 2,
                        carrier_id: 0,
                        first_slot: 10,
                        nb_slots: 4,
                        modcod_id: 5,
                    },
                ],
            }),
        );
        let decoded = DvbFrame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_saloha_data_carries_payload() {
        let frame = DvbFrame::new(
            header(),
            FrameBody::SalohaData(SalohaDataBody {
                tal_id: 4,
                base_id: 99,
                replica_id: 1,
                nb_replicas: 2,
                slot_id: 37,
                payload: vec![0xDE, 0xAD],
            }),
        );
        let bytes = frame.encode();
        assert_eq!(bytes.len(), HEADER_LEN + 14 + 2);
        assert_eq!(DvbFrame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_saloha_ack_repeats_tuples() {
        let frame = DvbFrame::new(
            header(),
            FrameBody::SalohaAck {
                acks: vec![(1, 10), (2, 20), (3, 30)],
            },
        );
        let bytes = frame.encode();
        assert_eq!(bytes.len(), HEADER_LEN + 3 * 10);
        assert_eq!(DvbFrame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_logon_req_label() {
        let frame = DvbFrame::new(
            FrameHeader::new(1, 1),
            FrameBody::LogonReq(LogonReqBody {
                tal_id: 9,
                cra_kbps: 100,
                max_rbdc_kbps: 2_000,
                max_vbdc_pkt: 800,
                category: "Premium".into(),
            }),
        );
        assert_eq!(DvbFrame::decode(&frame.encode()).unwrap(), frame);
    }

    #[test]
    fn test_decode_short_header() {
        assert!(matches!(
            DvbFrame::decode(&[0x01, 0x00, 0x00]),
            Err(Error::ShortFrame { .. })
        ));
    }

    #[test]
    fn test_decode_truncated_body() {
        let frame = DvbFrame::new(header(), FrameBody::Sof(5));
        let bytes = frame.encode();
        assert!(matches!(
            DvbFrame::decode(&bytes[..bytes.len() - 1]),
            Err(Error::ShortFrame { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_type() {
        let mut bytes = DvbFrame::new(header(), FrameBody::Sof(5)).encode();
        bytes[0] = 0x7F;
        assert!(matches!(
            DvbFrame::decode(&bytes),
            Err(Error::UnknownMessageType(0x7F))
        ));
    }

    #[test]
    fn test_dvb_rcs_payload_passthrough() {
        let frame = DvbFrame::new(
            header(),
            FrameBody::DvbRcs {
                tal_id: 3,
                modcod_id: 7,
                payload: vec![1, 2, 3, 4, 5],
            },
        );
        let decoded = DvbFrame::decode(&frame.encode()).unwrap();
        match decoded.body {
            FrameBody::DvbRcs { payload, .. } => assert_eq!(payload, vec![1, 2, 3, 4, 5]),
            other => panic!("unexpected body: {:?}", other),
        }
    }
}
