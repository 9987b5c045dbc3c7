// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only configuration consumed by the MAC core.
//!
//! The host (configuration loader, project UI) builds these structs once and
//! hands them to block constructors; nothing in the core mutates them after
//! `validate()` has passed. File formats and parsing stay outside the core.
//!
//! Two levels, mirroring the rest of the crate:
//!
//! - **Static**: compile-time defaults and hard bounds (MODCOD id range,
//!   default timings).
//! - **Dynamic**: [`MacConfig`] assembled by the host per emulated node.

use crate::carrier::AccessType;
use crate::types::{CarrierId, ModcodId, Qos, RateKbps, SpotId, VolPkt};
use crate::{Error, Result};

// =======================================================================
// Static bounds and defaults
// =======================================================================

/// Lowest valid MODCOD identifier.
pub const MODCOD_ID_MIN: ModcodId = 1;

/// Highest valid MODCOD identifier.
pub const MODCOD_ID_MAX: ModcodId = 32;

/// Default superframe duration in milliseconds.
///
/// Matches the classic DVB-RCS 53 ms frame timing; hosts override it per
/// emulated system.
pub const DEFAULT_SUPERFRAME_DURATION_MS: u64 = 53;

/// Default number of frames per superframe.
pub const DEFAULT_FRAMES_PER_SUPERFRAME: u32 = 1;

/// Default MAC FIFO capacity in packets.
pub const DEFAULT_FIFO_CAPACITY_PKT: VolPkt = 1_000;

/// Default number of Slotted-Aloha replicas per logical packet.
pub const DEFAULT_SALOHA_REPLICAS: u8 = 2;

/// Default Slotted-Aloha ACK timeout, in superframes.
pub const DEFAULT_SALOHA_TIMEOUT_SF: u16 = 3;

/// Default maximum number of Slotted-Aloha retransmissions.
pub const DEFAULT_SALOHA_MAX_RETRANSMISSIONS: u16 = 3;

/// Default contention-window ceiling for the backoff algorithms.
pub const DEFAULT_BACKOFF_CW_MAX: u16 = 255;

/// Default contention-window multiple for the backoff algorithms.
pub const DEFAULT_BACKOFF_MULTIPLE: u16 = 2;

// =======================================================================
// Timing
// =======================================================================

/// Superframe timing parameters.
#[derive(Debug, Clone, Copy)]
pub struct SuperframeParams {
    /// Superframe duration in milliseconds.
    pub duration_ms: u64,
    /// Number of frames per superframe.
    pub frames_per_superframe: u32,
}

impl Default for SuperframeParams {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_SUPERFRAME_DURATION_MS,
            frames_per_superframe: DEFAULT_FRAMES_PER_SUPERFRAME,
        }
    }
}

// =======================================================================
// Carrier plan
// =======================================================================

/// One carriers group of the return-link plan.
#[derive(Debug, Clone)]
pub struct CarrierParams {
    /// Group identifier, unique inside the spot.
    pub carriers_id: CarrierId,
    /// Symbol rate of each carrier, in bauds.
    pub symbol_rate_bauds: u64,
    /// Number of identical carriers in the group.
    pub carriers_count: u32,
    /// MODCOD ids usable on these carriers, ordered low to high.
    pub modcod_ids: Vec<ModcodId>,
    /// Assignment weight relative to sibling groups.
    pub ratio: u32,
    /// Access class served by these carriers.
    pub access_type: AccessType,
    /// Time slots per carrier and superframe (random-access groups).
    pub slots_per_carrier: u16,
}

/// A terminal category: a label plus the carriers groups it owns.
#[derive(Debug, Clone)]
pub struct CategoryParams {
    /// Category label, referenced by logon requests.
    pub label: String,
    /// Carriers groups of this category.
    pub carriers: Vec<CarrierParams>,
}

// =======================================================================
// DAMA / Slotted-Aloha
// =======================================================================

/// DAMA controller parameters.
#[derive(Debug, Clone, Copy)]
pub struct DamaParams {
    /// Free capacity assignment rate per terminal; 0 disables FCA.
    pub fca_kbps: RateKbps,
    /// Upper bound on any terminal's standing RBDC request.
    pub max_rbdc_kbps: RateKbps,
    /// Upper bound on any terminal's outstanding VBDC volume.
    pub max_vbdc_pkt: VolPkt,
}

/// Backoff algorithm selector (closed set, chosen at init).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    /// Binary Exponential Backoff.
    Beb,
    /// Exponential Increase, Exponential Decrease.
    Eied,
}

/// Backoff state-machine parameters.
#[derive(Debug, Clone, Copy)]
pub struct BackoffParams {
    /// Algorithm variant.
    pub kind: BackoffKind,
    /// Contention-window ceiling.
    pub cw_max: u16,
    /// Window growth/shrink multiple.
    pub multiple: u16,
}

impl Default for BackoffParams {
    fn default() -> Self {
        Self {
            kind: BackoffKind::Beb,
            cw_max: DEFAULT_BACKOFF_CW_MAX,
            multiple: DEFAULT_BACKOFF_MULTIPLE,
        }
    }
}

/// Slotted-Aloha parameters, shared by both ends of the link.
#[derive(Debug, Clone, Copy)]
pub struct SalohaParams {
    /// Replicas transmitted per logical packet.
    pub nb_replicas: u8,
    /// Superframes to wait for an ACK before a retransmission.
    pub timeout_sf: u16,
    /// Retransmission budget; the first transmission is not counted.
    pub nb_max_retransmissions: u16,
    /// Cap on packets scheduled by a terminal in one superframe.
    pub nb_max_packets: u16,
    /// Backoff algorithm parameters.
    pub backoff: BackoffParams,
}

impl Default for SalohaParams {
    fn default() -> Self {
        Self {
            nb_replicas: DEFAULT_SALOHA_REPLICAS,
            timeout_sf: DEFAULT_SALOHA_TIMEOUT_SF,
            nb_max_retransmissions: DEFAULT_SALOHA_MAX_RETRANSMISSIONS,
            nb_max_packets: 16,
            backoff: BackoffParams::default(),
        }
    }
}

// =======================================================================
// Carrier id tags
// =======================================================================

/// Integer tags routing outgoing frames to the right emulated carrier.
#[derive(Debug, Clone, Copy)]
pub struct CarrierTags {
    /// Logon requests/responses.
    pub logon: CarrierId,
    /// Control frames (SoF, SAC, TTP).
    pub ctrl: CarrierId,
    /// Data received by the ST.
    pub data_in_st: CarrierId,
    /// Data received by the GW.
    pub data_in_gw: CarrierId,
    /// Data emitted by the ST.
    pub data_out_st: CarrierId,
    /// Data emitted by the GW.
    pub data_out_gw: CarrierId,
}

// =======================================================================
// Top-level node configuration
// =======================================================================

/// Complete MAC configuration for one emulated node and spot.
#[derive(Debug, Clone)]
pub struct MacConfig {
    /// Spot served by this node.
    pub spot_id: SpotId,
    /// Superframe timing.
    pub superframe: SuperframeParams,
    /// Return-link carrier plan, one entry per category.
    pub categories: Vec<CategoryParams>,
    /// DAMA parameters.
    pub dama: DamaParams,
    /// Slotted-Aloha parameters.
    pub saloha: SalohaParams,
    /// Carrier id tags for frame routing.
    pub tags: CarrierTags,
    /// MAC FIFO capacity, per QoS priority.
    pub fifo_capacity_pkt: VolPkt,
    /// QoS priorities served (one FIFO each), highest priority first.
    pub qos_priorities: Vec<Qos>,
    /// Seed for every PRNG owned by this node's blocks.
    pub seed: u64,
}

impl MacConfig {
    /// Check invariants that would otherwise surface as runtime faults.
    ///
    /// Called once by block constructors; configuration errors are the only
    /// fatal errors in the core.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::MissingParam("categories"));
        }
        if self.superframe.duration_ms == 0 {
            return Err(Error::BadValue("superframe duration must be > 0 ms".into()));
        }
        if self.superframe.frames_per_superframe == 0 {
            return Err(Error::BadValue("frames per superframe must be > 0".into()));
        }
        for category in &self.categories {
            if category.carriers.is_empty() {
                return Err(Error::BadValue(format!(
                    "category {} has no carriers group",
                    category.label
                )));
            }
            for carrier in &category.carriers {
                if carrier.modcod_ids.is_empty() {
                    return Err(Error::BadValue(format!(
                        "carrier {} has no MODCOD",
                        carrier.carriers_id
                    )));
                }
                for &id in &carrier.modcod_ids {
                    if !(MODCOD_ID_MIN..=MODCOD_ID_MAX).contains(&id) {
                        return Err(Error::UnknownModcod(id));
                    }
                }
                if carrier.carriers_count == 0 {
                    return Err(Error::BadValue(format!(
                        "carrier {} has count 0",
                        carrier.carriers_id
                    )));
                }
                if carrier.access_type == AccessType::Aloha && carrier.slots_per_carrier == 0 {
                    return Err(Error::BadValue(format!(
                        "random-access carrier {} has no slots",
                        carrier.carriers_id
                    )));
                }
            }
        }
        if self.saloha.nb_replicas == 0 {
            return Err(Error::BadValue("nb_replicas must be >= 1".into()));
        }
        if self.saloha.backoff.multiple < 2 {
            return Err(Error::BadValue("backoff multiple must be >= 2".into()));
        }
        if self.qos_priorities.is_empty() {
            return Err(Error::MissingParam("qos_priorities"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> MacConfig {
        MacConfig {
            spot_id: 1,
            superframe: SuperframeParams::default(),
            categories: vec![CategoryParams {
                label: "Standard".into(),
                carriers: vec![CarrierParams {
                    carriers_id: 0,
                    symbol_rate_bauds: 1_000_000,
                    carriers_count: 1,
                    modcod_ids: vec![7],
                    ratio: 10,
                    access_type: AccessType::Dama,
                    slots_per_carrier: 0,
                }],
            }],
            dama: DamaParams {
                fca_kbps: 0,
                max_rbdc_kbps: 8_000,
                max_vbdc_pkt: 4_000,
            },
            saloha: SalohaParams::default(),
            tags: CarrierTags {
                logon: 1,
                ctrl: 2,
                data_in_st: 3,
                data_in_gw: 4,
                data_out_st: 5,
                data_out_gw: 6,
            },
            fifo_capacity_pkt: DEFAULT_FIFO_CAPACITY_PKT,
            qos_priorities: vec![0, 1, 2],
            seed: 42,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_empty_categories_rejected() {
        let mut cfg = minimal_config();
        cfg.categories.clear();
        assert!(matches!(
            cfg.validate(),
            Err(Error::MissingParam("categories"))
        ));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut cfg = minimal_config();
        cfg.superframe.duration_ms = 0;
        assert!(matches!(cfg.validate(), Err(Error::BadValue(_))));
    }

    #[test]
    fn test_out_of_range_modcod_rejected() {
        let mut cfg = minimal_config();
        cfg.categories[0].carriers[0].modcod_ids = vec![0];
        assert!(matches!(cfg.validate(), Err(Error::UnknownModcod(0))));
    }

    #[test]
    fn test_aloha_carrier_needs_slots() {
        let mut cfg = minimal_config();
        cfg.categories[0].carriers[0].access_type = AccessType::Aloha;
        cfg.categories[0].carriers[0].slots_per_carrier = 0;
        assert!(matches!(cfg.validate(), Err(Error::BadValue(_))));
    }
}
