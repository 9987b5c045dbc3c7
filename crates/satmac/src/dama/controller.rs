// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The return-link capacity allocator.
//!
//! Carrier capacity is counted in packets-per-superframe at the carrier's
//! DAMA MODCOD; terminal requests are converted with the terminal's current
//! input MODCOD, so a degraded terminal needs more packets for the same
//! rate. A terminal whose MODCOD the carrier does not list is excluded for
//! the superframe and keeps its requests.
//!
//! RBDC fair-share: when demand exceeds capacity every request is scaled by
//! the same factor, the integer part is granted and the fractional part
//! accumulates as a per-terminal credit. Once a terminal's credit exceeds
//! one packet's rate it converts into an extra packet, highest credit
//! first, while capacity remains. The credit never goes negative and never
//! exceeds one packet's worth.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::carrier::{AccessType, CarriersGroup, TerminalCategory};
use crate::config::{CategoryParams, DamaParams};
use crate::fmt::UnitConverter;
use crate::protocol::SacBody;
use crate::telemetry::ProbeRegistry;
use crate::terminal::TerminalContext;
use crate::types::{
    CarrierId, Esn0Db, ModcodId, RateKbps, RatePktPf, SfCount, SpotId, TalId, VolPkt,
    BROADCAST_TAL_ID, NCC_TAL_ID,
};
use crate::{Error, Result};

use super::ttp::TimePlan;

/// Counters exported by the controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct DamaStats {
    /// Superframes allocated.
    pub superframes: u64,
    /// Non-zero RBDC requests observed.
    pub rbdc_requests: u64,
    /// RBDC packets granted.
    pub rbdc_alloc_pktpf: u64,
    /// Non-zero VBDC requests observed.
    pub vbdc_requests: u64,
    /// VBDC packets granted.
    pub vbdc_alloc_pkt: u64,
    /// FCA packets granted.
    pub fca_alloc_pktpf: u64,
    /// Terminals excluded for a MODCOD the carrier does not list.
    pub modcod_mismatches: u64,
    /// SACs referencing unknown terminals.
    pub unknown_terminals: u64,
}

/// Per-superframe DAMA controller of one spot.
pub struct DamaController {
    spot_id: SpotId,
    converter: UnitConverter,
    params: DamaParams,
    /// Categories by label; BTreeMap keeps allocation order deterministic.
    categories: BTreeMap<String, TerminalCategory>,
    terminals: BTreeMap<TalId, TerminalContext>,
    /// Initial capacity per carrier for the current superframe.
    carrier_capacity: BTreeMap<CarrierId, RatePktPf>,
    current_sf: SfCount,
    probes: Arc<ProbeRegistry>,
    stats: DamaStats,
}

impl DamaController {
    /// Build a controller over the configured category plan.
    pub fn new(
        spot_id: SpotId,
        converter: UnitConverter,
        params: DamaParams,
        categories: &[CategoryParams],
    ) -> Result<Self> {
        if categories.is_empty() {
            return Err(Error::MissingParam("categories"));
        }
        let mut map = BTreeMap::new();
        for category_params in categories {
            map.insert(
                category_params.label.clone(),
                TerminalCategory::from_params(category_params),
            );
        }
        Ok(Self {
            spot_id,
            converter,
            params,
            categories: map,
            terminals: BTreeMap::new(),
            carrier_capacity: BTreeMap::new(),
            current_sf: 0,
            probes: Arc::new(ProbeRegistry::new()),
            stats: DamaStats::default(),
        })
    }

    /// Mirror allocation faults on the node's probe counters.
    pub fn set_probes(&mut self, probes: Arc<ProbeRegistry>) {
        self.probes = probes;
    }

    /// Spot this controller allocates for.
    pub fn spot_id(&self) -> SpotId {
        self.spot_id
    }

    /// Counters snapshot.
    pub fn stats(&self) -> DamaStats {
        self.stats
    }

    /// Context of a logged-on terminal.
    pub fn terminal(&self, tal_id: TalId) -> Option<&TerminalContext> {
        self.terminals.get(&tal_id)
    }

    /// Logged-on terminal count.
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    /// Initial capacity of a carrier for the current superframe, in pktpf.
    pub fn carrier_capacity(&self, carrier_id: CarrierId) -> RatePktPf {
        self.carrier_capacity.get(&carrier_id).copied().unwrap_or(0)
    }

    /// Unallocated residue of a carrier after the current superframe.
    pub fn carrier_remaining(&self, carrier_id: CarrierId) -> RatePktPf {
        for category in self.categories.values() {
            for group in category.groups() {
                if group.carriers_id() == carrier_id {
                    return group.remaining_capacity();
                }
            }
        }
        0
    }

    // ========================================================================
    // Logon / logoff
    // ========================================================================

    /// Log a terminal on and attach it to its category.
    pub fn logon(
        &mut self,
        tal_id: TalId,
        category_label: &str,
        initial_modcod_id: ModcodId,
        cra_kbps: RateKbps,
        max_rbdc_kbps: RateKbps,
        max_vbdc_pkt: VolPkt,
    ) -> Result<()> {
        if tal_id == NCC_TAL_ID || tal_id == BROADCAST_TAL_ID {
            return Err(Error::TalIdIsNcc(tal_id));
        }
        if self.terminals.contains_key(&tal_id) {
            return Err(Error::DuplicateTalId(tal_id));
        }
        let category = self
            .categories
            .get_mut(category_label)
            .ok_or_else(|| Error::UnknownCategory(category_label.to_owned()))?;

        // clamp the per-terminal maxima to the spot-wide configuration
        let max_rbdc_kbps = max_rbdc_kbps.min(self.params.max_rbdc_kbps);
        let max_vbdc_pkt = max_vbdc_pkt.min(self.params.max_vbdc_pkt);

        category.attach_terminal(tal_id);
        self.terminals.insert(
            tal_id,
            TerminalContext::new(
                tal_id,
                category_label,
                initial_modcod_id,
                cra_kbps,
                max_rbdc_kbps,
                max_vbdc_pkt,
            ),
        );
        log::info!(
            "[DamaCtrl] Spot {}: ST{} logged on, category {}, CRA {} kb/s",
            self.spot_id,
            tal_id,
            category_label,
            cra_kbps
        );
        Ok(())
    }

    /// Log a terminal off; its context and requests disappear.
    pub fn logoff(&mut self, tal_id: TalId) -> bool {
        let context = match self.terminals.remove(&tal_id) {
            Some(ctx) => ctx,
            None => return false,
        };
        if let Some(category) = self.categories.get_mut(context.category_label()) {
            category.detach_terminal(tal_id);
        }
        log::info!("[DamaCtrl] Spot {}: ST{} logged off", self.spot_id, tal_id);
        true
    }

    // ========================================================================
    // Request ingest
    // ========================================================================

    /// Ingest a SAC: replace the RBDC request, add the VBDC volume.
    ///
    /// Returns the CNI the terminal reported, for the FMT loop.
    pub fn on_sac(&mut self, sac: &SacBody) -> Result<Option<Esn0Db>> {
        let context = match self.terminals.get_mut(&sac.tal_id) {
            Some(ctx) => ctx,
            None => {
                self.stats.unknown_terminals += 1;
                let err = Error::UnknownTerminal(sac.tal_id);
                self.probes.record_error(&err);
                return Err(err);
            }
        };
        context.set_rbdc_request(sac.rbdc_kbps);
        if sac.vbdc_pkt > 0 {
            context.add_vbdc_request(sac.vbdc_pkt);
        }
        Ok(crate::types::cni_from_centibels(sac.cni_centibels))
    }

    /// Clamp a terminal's outstanding VBDC to its queued backlog.
    pub fn correct_vbdc(&mut self, tal_id: TalId, queued_pkt: VolPkt) {
        if let Some(ctx) = self.terminals.get_mut(&tal_id) {
            ctx.correct_vbdc_request(queued_pkt);
        }
    }

    /// Apply a MODCOD update from the CNI simulation.
    pub fn update_modcod(&mut self, tal_id: TalId, modcod_id: ModcodId) -> Result<()> {
        match self.terminals.get_mut(&tal_id) {
            Some(ctx) => {
                ctx.set_input_modcod_id(modcod_id);
                Ok(())
            }
            None => Err(Error::UnknownTerminal(tal_id)),
        }
    }

    /// Update the forward-link MODCOD from a terminal's CNI report.
    pub fn update_output_modcod(&mut self, tal_id: TalId, modcod_id: ModcodId) -> Result<()> {
        match self.terminals.get_mut(&tal_id) {
            Some(ctx) => {
                ctx.set_output_modcod_id(modcod_id);
                Ok(())
            }
            None => Err(Error::UnknownTerminal(tal_id)),
        }
    }

    /// Flag a terminal as SCPC: it keeps its dedicated carrier and is
    /// bypassed by DAMA from the next superframe on.
    pub fn set_scpc(&mut self, tal_id: TalId, scpc: bool) -> Result<()> {
        match self.terminals.get_mut(&tal_id) {
            Some(ctx) => {
                ctx.set_scpc(scpc);
                log::info!(
                    "[DamaCtrl] Spot {}: ST{} SCPC mode {}",
                    self.spot_id,
                    tal_id,
                    if scpc { "on" } else { "off" }
                );
                Ok(())
            }
            None => Err(Error::UnknownTerminal(tal_id)),
        }
    }

    /// SCPC terminals with their dedicated carrier dimensions.
    ///
    /// Each entry: terminal, its SCPC carrier, that carrier's packet
    /// capacity per superframe at the terminal's output MODCOD, and the
    /// MODCOD itself. Terminals whose category has no SCPC group are
    /// skipped.
    pub fn scpc_assignments(&self) -> Vec<(TalId, CarrierId, RatePktPf, ModcodId)> {
        let mut assignments = Vec::new();
        for context in self.terminals.values() {
            if !context.is_scpc() {
                continue;
            }
            let group = match self
                .categories
                .get(context.category_label())
                .and_then(|c| c.group_for_access(AccessType::Scpc))
            {
                Some(group) => group,
                None => {
                    log::warn!(
                        "[DamaCtrl] ST{} is SCPC but category {} has no SCPC carrier",
                        context.tal_id(),
                        context.category_label()
                    );
                    continue;
                }
            };
            let modcod_id = context.output_modcod_id();
            match self.converter.carrier_capacity_pktpf(
                group.symbol_rate_bauds(),
                group.carriers_count(),
                modcod_id,
            ) {
                Ok(capacity) => {
                    assignments.push((context.tal_id(), group.carriers_id(), capacity, modcod_id));
                }
                Err(e) => {
                    log::warn!("[DamaCtrl] ST{} SCPC capacity: {}", context.tal_id(), e);
                }
            }
        }
        assignments
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Run one superframe's allocation and emit the time plan.
    pub fn run_superframe(&mut self, sf: SfCount) -> Result<TimePlan> {
        self.current_sf = sf;
        self.stats.superframes += 1;

        for context in self.terminals.values_mut() {
            context.reset_allocations();
        }

        self.reset_capacity()?;

        let labels: Vec<String> = self.categories.keys().cloned().collect();
        let mut plan = TimePlan::new(sf);
        for label in labels {
            self.allocate_category(&label, &mut plan)?;
        }
        Ok(plan)
    }

    /// Step A: initialize every DAMA group's capacity from its dimensions.
    fn reset_capacity(&mut self) -> Result<()> {
        self.carrier_capacity.clear();
        for category in self.categories.values_mut() {
            for group in category.groups_mut() {
                if group.access_type() != AccessType::Dama {
                    continue;
                }
                let capacity = self.converter.carrier_capacity_pktpf(
                    group.symbol_rate_bauds(),
                    group.carriers_count(),
                    group.dama_modcod_id(),
                )?;
                group.set_remaining_capacity(capacity);
                self.carrier_capacity.insert(group.carriers_id(), capacity);
                log::debug!(
                    "[DamaCtrl] SF#{}: carrier {} capacity {} pkt per superframe",
                    self.current_sf,
                    group.carriers_id(),
                    capacity
                );
            }
        }
        Ok(())
    }

    fn allocate_category(&mut self, label: &str, plan: &mut TimePlan) -> Result<()> {
        let group_ids: Vec<CarrierId> = match self.categories.get(label) {
            Some(category) => category
                .groups()
                .iter()
                .filter(|g| g.access_type() == AccessType::Dama)
                .map(CarriersGroup::carriers_id)
                .collect(),
            None => return Ok(()),
        };

        for carrier_id in group_ids {
            let eligible = self.eligible_terminals(label, carrier_id);
            self.allocate_cra(label, carrier_id, &eligible)?;
            self.allocate_rbdc(label, carrier_id, &eligible)?;
            self.allocate_vbdc(label, carrier_id, &eligible)?;
            self.allocate_fca(label, carrier_id, &eligible)?;
            self.fill_plan(label, carrier_id, &eligible, plan)?;
        }
        Ok(())
    }

    /// Terminals of `label` usable on `carrier_id` this superframe.
    ///
    /// A terminal whose input MODCOD the carrier does not list is excluded
    /// and its requests stand for the next superframe.
    fn eligible_terminals(&mut self, label: &str, carrier_id: CarrierId) -> Vec<TalId> {
        let category = match self.categories.get(label) {
            Some(c) => c,
            None => return Vec::new(),
        };
        let group = match category
            .groups()
            .iter()
            .find(|g| g.carriers_id() == carrier_id)
        {
            Some(g) => g,
            None => return Vec::new(),
        };

        let mut eligible = Vec::new();
        for &tal_id in category.terminals() {
            let context = match self.terminals.get(&tal_id) {
                Some(ctx) => ctx,
                None => continue,
            };
            if context.is_scpc() {
                continue;
            }
            if group.supports_modcod(context.input_modcod_id()) {
                eligible.push(tal_id);
            } else {
                self.stats.modcod_mismatches += 1;
                let err = Error::ModcodMismatch {
                    tal_id,
                    modcod_id: context.input_modcod_id(),
                };
                self.probes.record_error(&err);
                log::warn!(
                    "[DamaCtrl] SF#{}: {} (carrier {}), skipped this superframe",
                    self.current_sf,
                    err,
                    carrier_id
                );
            }
        }
        eligible
    }

    /// CRA: static reservations come off the top, unconditionally.
    fn allocate_cra(&mut self, label: &str, carrier_id: CarrierId, eligible: &[TalId]) -> Result<()> {
        let mut remaining = self.group_remaining(label, carrier_id);
        for &tal_id in eligible {
            let (cra_kbps, modcod_id) = match self.terminals.get(&tal_id) {
                Some(ctx) => (ctx.cra_kbps(), ctx.input_modcod_id()),
                None => continue,
            };
            if cra_kbps == 0 {
                continue;
            }
            let cra_pktpf = self.converter.kbps_to_pktpf(cra_kbps, modcod_id)?;
            if cra_pktpf > remaining {
                log::warn!(
                    "[DamaCtrl] SF#{}: carrier {} cannot honor full CRA of ST{}",
                    self.current_sf,
                    carrier_id,
                    tal_id
                );
                remaining = 0;
            } else {
                remaining -= cra_pktpf;
            }
        }
        self.set_group_remaining(label, carrier_id, remaining);
        Ok(())
    }

    /// Step B: RBDC fair-share with fractional credit carry-over.
    fn allocate_rbdc(&mut self, label: &str, carrier_id: CarrierId, eligible: &[TalId]) -> Result<()> {
        let mut remaining = self.group_remaining(label, carrier_id);
        if remaining == 0 {
            log::info!(
                "[DamaCtrl] SF#{}: carrier {} skipping RBDC, no capacity",
                self.current_sf,
                carrier_id
            );
            return Ok(());
        }

        // collect integer requests, converted at each terminal's MODCOD
        let mut requests: Vec<(TalId, RatePktPf, ModcodId)> = Vec::new();
        let mut total_request_pktpf: u64 = 0;
        for &tal_id in eligible {
            let context = match self.terminals.get(&tal_id) {
                Some(ctx) => ctx,
                None => continue,
            };
            let modcod_id = context.input_modcod_id();
            let request_pktpf = self
                .converter
                .kbps_to_pktpf(context.rbdc_request_kbps(), modcod_id)?;
            if request_pktpf > 0 {
                self.stats.rbdc_requests += 1;
            }
            total_request_pktpf += u64::from(request_pktpf);
            requests.push((tal_id, request_pktpf, modcod_id));
        }
        if total_request_pktpf == 0 {
            return Ok(());
        }

        let fair_share = (total_request_pktpf as f64 / f64::from(remaining)).max(1.0);
        log::info!(
            "[DamaCtrl] SF#{}: carrier {} RBDC demand {} pkt, fair share {:.3}",
            self.current_sf,
            carrier_id,
            total_request_pktpf,
            fair_share
        );

        // first pass: integer part of the fair request
        for &(tal_id, request_pktpf, modcod_id) in &requests {
            let fair_rbdc = f64::from(request_pktpf) / fair_share;
            let alloc_pktpf = fair_rbdc.floor() as RatePktPf;
            let context = match self.terminals.get_mut(&tal_id) {
                Some(ctx) => ctx,
                None => continue,
            };
            context.set_rbdc_alloc(alloc_pktpf);
            remaining = remaining.saturating_sub(alloc_pktpf);
            self.stats.rbdc_alloc_pktpf += u64::from(alloc_pktpf);

            if fair_share > 1.0 {
                let residue_kbps = self
                    .converter
                    .pktpf_to_kbps_exact(fair_rbdc - f64::from(alloc_pktpf), modcod_id)?;
                if let Some(ctx) = self.terminals.get_mut(&tal_id) {
                    ctx.add_rbdc_credit(residue_kbps);
                }
            }
        }

        // second pass: convert accumulated credit into whole packets
        if fair_share > 1.0 {
            let mut by_credit: Vec<TalId> = requests.iter().map(|&(t, _, _)| t).collect();
            by_credit.sort_by(|&a, &b| {
                let (ca, cb) = match (self.terminals.get(&a), self.terminals.get(&b)) {
                    (Some(ca), Some(cb)) => (ca.rbdc_credit_kbps(), cb.rbdc_credit_kbps()),
                    _ => (0.0, 0.0),
                };
                cb.partial_cmp(&ca).unwrap_or(std::cmp::Ordering::Equal)
            });

            for tal_id in by_credit {
                if remaining == 0 {
                    break;
                }
                let (credit_kbps, modcod_id, alloc, max_rbdc_kbps) =
                    match self.terminals.get(&tal_id) {
                        Some(ctx) => (
                            ctx.rbdc_credit_kbps(),
                            ctx.input_modcod_id(),
                            ctx.rbdc_alloc_pktpf(),
                            ctx.max_rbdc_kbps(),
                        ),
                        None => continue,
                    };
                let slot_kbps = self.converter.pktpf_to_kbps_exact(1.0, modcod_id)?;
                if credit_kbps <= slot_kbps {
                    continue;
                }
                let max_rbdc_pktpf = self.converter.kbps_to_pktpf(max_rbdc_kbps, modcod_id)?;
                if max_rbdc_pktpf <= alloc + 1 {
                    continue;
                }
                if let Some(ctx) = self.terminals.get_mut(&tal_id) {
                    ctx.set_rbdc_alloc(alloc + 1);
                    ctx.add_rbdc_credit(-slot_kbps);
                    remaining -= 1;
                    self.stats.rbdc_alloc_pktpf += 1;
                    log::debug!(
                        "[DamaCtrl] SF#{}: ST{} credit converted into one packet",
                        self.current_sf,
                        tal_id
                    );
                }
            }

            // unconvertible excess is forfeit; the carry never exceeds one
            // packet's rate
            for &(tal_id, _, modcod_id) in &requests {
                let slot_kbps = self.converter.pktpf_to_kbps_exact(1.0, modcod_id)?;
                if let Some(ctx) = self.terminals.get_mut(&tal_id) {
                    let overflow = ctx.rbdc_credit_kbps() - slot_kbps;
                    if overflow > 0.0 {
                        ctx.add_rbdc_credit(-overflow);
                    }
                }
            }
        }

        self.set_group_remaining(label, carrier_id, remaining);
        Ok(())
    }

    /// Step C: VBDC served greedily, largest outstanding volume first.
    fn allocate_vbdc(&mut self, label: &str, carrier_id: CarrierId, eligible: &[TalId]) -> Result<()> {
        let mut remaining = self.group_remaining(label, carrier_id);
        if remaining == 0 {
            log::info!(
                "[DamaCtrl] SF#{}: carrier {} skipping VBDC, no capacity",
                self.current_sf,
                carrier_id
            );
            return Ok(());
        }

        let mut by_request: Vec<TalId> = eligible.to_vec();
        by_request.sort_by(|&a, &b| {
            let (ra, rb) = match (self.terminals.get(&a), self.terminals.get(&b)) {
                (Some(ca), Some(cb)) => (ca.vbdc_request_pkt(), cb.vbdc_request_pkt()),
                _ => (0, 0),
            };
            rb.cmp(&ra)
        });

        for tal_id in by_request {
            let request_pkt = match self.terminals.get(&tal_id) {
                Some(ctx) => ctx.vbdc_request_pkt(),
                None => continue,
            };
            if request_pkt == 0 {
                continue;
            }
            self.stats.vbdc_requests += 1;

            let granted = request_pkt.min(remaining);
            if let Some(ctx) = self.terminals.get_mut(&tal_id) {
                ctx.add_vbdc_alloc(granted);
            }
            remaining -= granted;
            self.stats.vbdc_alloc_pkt += u64::from(granted);
            if granted < request_pkt {
                log::info!(
                    "[DamaCtrl] SF#{}: ST{} VBDC partially served ({}/{} pkt), \
                     carrier {} exhausted",
                    self.current_sf,
                    tal_id,
                    granted,
                    request_pkt,
                    carrier_id
                );
                remaining = 0;
                break;
            }
        }

        self.set_group_remaining(label, carrier_id, remaining);
        Ok(())
    }

    /// Step D: distribute free capacity, smallest credit first.
    fn allocate_fca(&mut self, label: &str, carrier_id: CarrierId, eligible: &[TalId]) -> Result<()> {
        if self.params.fca_kbps == 0 {
            return Ok(());
        }
        let mut remaining = self.group_remaining(label, carrier_id);
        if remaining == 0 || eligible.is_empty() {
            return Ok(());
        }

        let mut by_credit: Vec<TalId> = eligible.to_vec();
        by_credit.sort_by(|&a, &b| {
            let (ca, cb) = match (self.terminals.get(&a), self.terminals.get(&b)) {
                (Some(ca), Some(cb)) => (ca.rbdc_credit_kbps(), cb.rbdc_credit_kbps()),
                _ => (0.0, 0.0),
            };
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        for tal_id in by_credit {
            if remaining == 0 {
                break;
            }
            let modcod_id = match self.terminals.get(&tal_id) {
                Some(ctx) => ctx.input_modcod_id(),
                None => continue,
            };
            let fca_pktpf = self.converter.kbps_to_pktpf(self.params.fca_kbps, modcod_id)?;
            let granted = fca_pktpf.min(remaining);
            if let Some(ctx) = self.terminals.get_mut(&tal_id) {
                ctx.set_fca_alloc(granted);
            }
            remaining -= granted;
            self.stats.fca_alloc_pktpf += u64::from(granted);
        }

        self.set_group_remaining(label, carrier_id, remaining);
        Ok(())
    }

    /// Turn allocations into time-plan slot runs.
    fn fill_plan(
        &mut self,
        _label: &str,
        carrier_id: CarrierId,
        eligible: &[TalId],
        plan: &mut TimePlan,
    ) -> Result<()> {
        for &tal_id in eligible {
            let (modcod_id, cra_kbps, dynamic_pktpf) = match self.terminals.get(&tal_id) {
                Some(ctx) => (
                    ctx.input_modcod_id(),
                    ctx.cra_kbps(),
                    ctx.total_alloc_pktpf(),
                ),
                None => continue,
            };
            let cra_pktpf = self.converter.kbps_to_pktpf(cra_kbps, modcod_id)?;
            if let Err(e) = plan.assign(tal_id, carrier_id, cra_pktpf + dynamic_pktpf, modcod_id) {
                // over-long slot run: drop this terminal's entry, keep the plan
                self.probes.record_error(&e);
                log::warn!(
                    "[DamaCtrl] SF#{}: ST{} not planned: {}",
                    self.current_sf,
                    tal_id,
                    e
                );
            }
        }
        Ok(())
    }

    fn group_remaining(&self, label: &str, carrier_id: CarrierId) -> RatePktPf {
        self.categories
            .get(label)
            .and_then(|c| {
                c.groups()
                    .iter()
                    .find(|g| g.carriers_id() == carrier_id)
                    .map(CarriersGroup::remaining_capacity)
            })
            .unwrap_or(0)
    }

    fn set_group_remaining(&mut self, label: &str, carrier_id: CarrierId, value: RatePktPf) {
        if let Some(category) = self.categories.get_mut(label) {
            if let Some(group) = category
                .groups_mut()
                .iter_mut()
                .find(|g| g.carriers_id() == carrier_id)
            {
                group.set_remaining_capacity(value);
            }
        }
    }
}
