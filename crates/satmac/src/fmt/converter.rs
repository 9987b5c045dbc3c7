// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unit conversions between rates, volumes and symbols.
//!
//! DAMA computations run in packets-per-superframe while requests arrive in
//! kbit/s and carriers are dimensioned in symbols. All three meet here, for
//! one MODCOD at a time, so spectral efficiency is applied in exactly one
//! place.
//!
//! Integer results are floored; the fractional remainder matters to the
//! RBDC credit mechanism, so the `_exact` variants expose it.

use std::sync::Arc;

use crate::types::{ModcodId, RateKbps, RatePktPf, VolKb, VolPkt};
use crate::Result;

use super::ModcodTable;

/// Converter bound to a MODCOD table and a superframe duration.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    table: Arc<ModcodTable>,
    superframe_ms: u64,
}

impl UnitConverter {
    /// Create a converter for the given table and superframe duration.
    pub fn new(table: Arc<ModcodTable>, superframe_ms: u64) -> Self {
        Self {
            table,
            superframe_ms,
        }
    }

    /// Superframe duration this converter was built for, in milliseconds.
    pub fn superframe_ms(&self) -> u64 {
        self.superframe_ms
    }

    /// The MODCOD table behind this converter.
    pub fn table(&self) -> &ModcodTable {
        &self.table
    }

    /// Useful kilobits of one packet (one burst) of `modcod_id`.
    pub fn pkt_kbits_exact(&self, modcod_id: ModcodId) -> Result<f64> {
        Ok(self.table.def(modcod_id)?.burst_kbits())
    }

    /// Kilobits carried by `sym` symbols of `modcod_id`, floored.
    pub fn sym_to_kbits(&self, sym: u64, modcod_id: ModcodId) -> Result<VolKb> {
        let def = self.table.def(modcod_id)?;
        let kbits = sym as f64 * f64::from(def.spectral_efficiency) / 1_000.0;
        Ok(kbits as VolKb)
    }

    /// Kilobits carried by `pkt` whole packets of `modcod_id`, floored.
    pub fn pkt_to_kbits(&self, pkt: VolPkt, modcod_id: ModcodId) -> Result<VolKb> {
        let kbits = f64::from(pkt) * self.pkt_kbits_exact(modcod_id)?;
        Ok(kbits as VolKb)
    }

    /// Packets per superframe equivalent to `rate_kbps`, as a real number.
    pub fn kbps_to_pktpf_exact(&self, rate_kbps: f64, modcod_id: ModcodId) -> Result<f64> {
        let kbits_per_sf = rate_kbps * self.superframe_ms as f64 / 1_000.0;
        Ok(kbits_per_sf / self.pkt_kbits_exact(modcod_id)?)
    }

    /// Packets per superframe equivalent to `rate_kbps`, floored.
    pub fn kbps_to_pktpf(&self, rate_kbps: RateKbps, modcod_id: ModcodId) -> Result<RatePktPf> {
        Ok(self.kbps_to_pktpf_exact(f64::from(rate_kbps), modcod_id)? as RatePktPf)
    }

    /// Rate in kbit/s equivalent to `pktpf` packets per superframe, as a real.
    pub fn pktpf_to_kbps_exact(&self, pktpf: f64, modcod_id: ModcodId) -> Result<f64> {
        let kbits_per_sf = pktpf * self.pkt_kbits_exact(modcod_id)?;
        Ok(kbits_per_sf * 1_000.0 / self.superframe_ms as f64)
    }

    /// Rate in kbit/s equivalent to `pktpf` packets per superframe, floored.
    pub fn pktpf_to_kbps(&self, pktpf: RatePktPf, modcod_id: ModcodId) -> Result<RateKbps> {
        Ok(self.pktpf_to_kbps_exact(f64::from(pktpf), modcod_id)? as RateKbps)
    }

    /// Symbols a carrier emits during one superframe.
    pub fn sym_per_superframe(&self, symbol_rate_bauds: u64, carriers_count: u32) -> u64 {
        symbol_rate_bauds * self.superframe_ms / 1_000 * u64::from(carriers_count)
    }

    /// Whole packets of `modcod_id` a carrier can host per superframe.
    pub fn carrier_capacity_pktpf(
        &self,
        symbol_rate_bauds: u64,
        carriers_count: u32,
        modcod_id: ModcodId,
    ) -> Result<RatePktPf> {
        let sym = self.sym_per_superframe(symbol_rate_bauds, carriers_count);
        let def = self.table.def(modcod_id)?;
        Ok((sym / u64::from(def.burst_length_sym)) as RatePktPf)
    }
}
