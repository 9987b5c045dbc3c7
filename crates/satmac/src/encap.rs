// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet-handler capability: the encapsulation boundary.
//!
//! The real encapsulation pipeline (GSE, RLE, ROHC) lives outside the MAC
//! core. The schedulers only need this narrow capability: fit a network
//! packet into a byte budget, possibly leaving a residue to re-queue, and
//! undo that on the receive side. The set of handlers is closed and chosen
//! at init.

use crate::types::TalId;

/// Result of encoding one packet against a byte budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Bytes to place in the frame.
    pub bytes: Vec<u8>,
    /// Unsent tail to push back at the head of the FIFO, if any.
    pub residue: Option<Vec<u8>>,
}

/// Capability interface the schedulers consume.
pub trait PacketHandler: Send {
    /// Handler name, for logs.
    fn name(&self) -> &str;

    /// Encode `packet` into at most `max_bytes` frame bytes.
    ///
    /// Returns `None` when the budget cannot hold even a minimal fragment;
    /// the caller keeps the packet queued.
    fn encode(&self, packet: &[u8], max_bytes: usize) -> Option<EncodedPacket>;

    /// Decode a frame payload back into network packets.
    fn decode(&self, bytes: &[u8]) -> Vec<Vec<u8>>;

    /// Source terminal of a decoded packet, when the format carries one.
    fn get_src(&self, packet: &[u8]) -> Option<TalId>;

    /// Opaque CNI header extension, when the format carries one.
    fn cni_extension(&self, packet: &[u8]) -> Option<u32>;
}

/// Length-prefixed handler used by the emulation defaults and tests.
///
/// Each encoded unit is `u16` length + bytes. Fragments are independent
/// units; reassembly is the upper layer's concern, like the real
/// encapsulation plug-ins.
#[derive(Debug, Default, Clone)]
pub struct FixedLenHandler;

/// Bytes of framing this handler adds per unit.
const LEN_PREFIX: usize = 2;

impl PacketHandler for FixedLenHandler {
    fn name(&self) -> &str {
        "fixedlen"
    }

    fn encode(&self, packet: &[u8], max_bytes: usize) -> Option<EncodedPacket> {
        if max_bytes <= LEN_PREFIX {
            return None;
        }
        let take = packet.len().min(max_bytes - LEN_PREFIX);
        let mut bytes = Vec::with_capacity(LEN_PREFIX + take);
        bytes.extend_from_slice(&(take as u16).to_le_bytes());
        bytes.extend_from_slice(&packet[..take]);
        let residue = if take < packet.len() {
            Some(packet[take..].to_vec())
        } else {
            None
        };
        Some(EncodedPacket { bytes, residue })
    }

    fn decode(&self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        let mut at = 0;
        while at + LEN_PREFIX <= bytes.len() {
            let len = u16::from_le_bytes([bytes[at], bytes[at + 1]]) as usize;
            at += LEN_PREFIX;
            if at + len > bytes.len() {
                log::debug!("[fixedlen] truncated unit at offset {}, dropped", at);
                break;
            }
            packets.push(bytes[at..at + len].to_vec());
            at += len;
        }
        packets
    }

    fn get_src(&self, _packet: &[u8]) -> Option<TalId> {
        None
    }

    fn cni_extension(&self, _packet: &[u8]) -> Option<u32> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_fits_whole_packet() {
        let handler = FixedLenHandler;
        let out = handler.encode(&[1, 2, 3], 100).unwrap();
        assert_eq!(out.bytes, vec![3, 0, 1, 2, 3]);
        assert!(out.residue.is_none());
    }

    #[test]
    fn test_encode_fragments_on_budget() {
        let handler = FixedLenHandler;
        let out = handler.encode(&[1, 2, 3, 4, 5], 4).unwrap();
        assert_eq!(out.bytes, vec![2, 0, 1, 2]);
        assert_eq!(out.residue, Some(vec![3, 4, 5]));
    }

    #[test]
    fn test_encode_budget_too_small() {
        let handler = FixedLenHandler;
        assert!(handler.encode(&[1], 2).is_none());
        assert!(handler.encode(&[1], 0).is_none());
    }

    #[test]
    fn test_decode_multiple_units() {
        let handler = FixedLenHandler;
        let mut bytes = handler.encode(&[1, 2], 100).unwrap().bytes;
        bytes.extend(handler.encode(&[3], 100).unwrap().bytes);
        assert_eq!(handler.decode(&bytes), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_decode_truncated_tail_dropped() {
        let handler = FixedLenHandler;
        let mut bytes = handler.encode(&[1, 2], 100).unwrap().bytes;
        bytes.extend_from_slice(&[9, 0, 1]); // claims 9 bytes, has 1
        assert_eq!(handler.decode(&bytes), vec![vec![1, 2]]);
    }
}
