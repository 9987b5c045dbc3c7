// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Return-link scheduler: SoF in, TTP plus data frames out.
//!
//! Each superframe walks four phases in order:
//!
//! 1. **CollectRequests** - drain buffered SACs into terminal contexts,
//!    advance the CNI simulation, refresh input MODCODs, correct stale
//!    VBDC requests against FIFO fill.
//! 2. **RunDama** - run the allocator, obtain the time plan.
//! 3. **BuildFrames** - pop packets from each served terminal's FIFOs in
//!    QoS order and fit them into the allocated byte budget through the
//!    packet handler; a partial head fragment goes back with `push_front`.
//! 4. **Emit** - hand the TTP and data frames to the caller, unless the
//!    wall-clock budget was overrun, in which case Emit is skipped and the
//!    next superframe proceeds normally.
//!
//! Slots a terminal could not fill are wasted, never reassigned; that keeps
//! the plan stable once published.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::CarrierTags;
use crate::dama::{DamaController, TimePlan};
use crate::encap::PacketHandler;
use crate::fifo::{ClearReason, DvbFifo, FifoElement};
use crate::fmt::{FmtSimulation, UnitConverter};
use crate::protocol::{DvbFrame, FrameBody, FrameHeader, SacBody, TtpBody};
use crate::telemetry::ProbeRegistry;
use crate::types::{Esn0Db, Qos, RateKbps, SfCount, SpotId, TalId, VolPkt};
use crate::{Error, Result};

/// Counters exported by the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    /// Superframes fully processed.
    pub superframes: u64,
    /// Data frames emitted.
    pub frames_emitted: u64,
    /// TTP entries whose slots could not be filled from the FIFOs.
    pub under_allocated: u64,
    /// Superframes whose Emit phase was skipped for wall-clock overrun.
    pub overruns: u64,
    /// Duplicate SoF numbers ignored.
    pub duplicate_sof: u64,
    /// Backwards SoF numbers ignored.
    pub backwards_sof: u64,
    /// SACs ingested.
    pub sacs_ingested: u64,
    /// SACs rejected (unknown terminal).
    pub bad_sacs: u64,
}

/// One superframe's output.
#[derive(Debug)]
pub struct SchedulerOutput {
    /// The plan that was allocated (also carried by the first frame).
    pub ttp: TimePlan,
    /// Frames to transmit: the TTP frame, then data frames.
    pub frames: Vec<DvbFrame>,
}

/// SoF-driven return-link scheduler of one spot.
pub struct ReturnScheduler {
    spot_id: SpotId,
    tags: CarrierTags,
    dama: DamaController,
    fmt: FmtSimulation,
    handler: Box<dyn PacketHandler>,
    converter: UnitConverter,
    /// Per-terminal FIFOs, highest QoS priority first.
    fifos: BTreeMap<TalId, Vec<Arc<DvbFifo>>>,
    qos_priorities: Vec<Qos>,
    fifo_capacity_pkt: VolPkt,
    pending_sacs: Vec<SacBody>,
    last_sf: Option<SfCount>,
    /// Wall-clock budget for one superframe; `None` disables the guard.
    emit_budget: Option<Duration>,
    /// Probe counters shared with the allocator and the FIFOs.
    probes: Arc<ProbeRegistry>,
    stats: SchedulerStats,
}

impl ReturnScheduler {
    /// Assemble the scheduler from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spot_id: SpotId,
        tags: CarrierTags,
        mut dama: DamaController,
        fmt: FmtSimulation,
        handler: Box<dyn PacketHandler>,
        converter: UnitConverter,
        qos_priorities: Vec<Qos>,
        fifo_capacity_pkt: VolPkt,
    ) -> Self {
        let probes = Arc::new(ProbeRegistry::new());
        dama.set_probes(probes.clone());
        Self {
            spot_id,
            tags,
            dama,
            fmt,
            handler,
            converter,
            fifos: BTreeMap::new(),
            qos_priorities,
            fifo_capacity_pkt,
            pending_sacs: Vec::new(),
            last_sf: None,
            emit_budget: None,
            probes,
            stats: SchedulerStats::default(),
        }
    }

    /// Assemble the scheduler of one node from its validated configuration.
    ///
    /// The wall-clock guard is armed with the configured superframe
    /// duration; the CNI source and the packet handler remain the host's
    /// choice.
    pub fn from_config(
        config: &crate::config::MacConfig,
        table: Arc<crate::fmt::ModcodTable>,
        source: crate::fmt::CniSource,
        handler: Box<dyn PacketHandler>,
    ) -> Result<Self> {
        config.validate()?;
        let converter = UnitConverter::new(table.clone(), config.superframe.duration_ms);
        let dama = DamaController::new(
            config.spot_id,
            converter.clone(),
            config.dama,
            &config.categories,
        )?;
        let fmt = FmtSimulation::new(table, source, config.seed);
        Ok(Self::new(
            config.spot_id,
            config.tags,
            dama,
            fmt,
            handler,
            converter,
            config.qos_priorities.clone(),
            config.fifo_capacity_pkt,
        )
        .with_emit_budget(Duration::from_millis(config.superframe.duration_ms)))
    }

    /// Enable the wall-clock guard on the Emit phase.
    pub fn with_emit_budget(mut self, budget: Duration) -> Self {
        self.emit_budget = Some(budget);
        self
    }

    /// Share an external probe registry; also rewires the allocator.
    ///
    /// FIFOs of terminals logged on afterwards count their drops there too.
    pub fn with_probes(mut self, probes: Arc<ProbeRegistry>) -> Self {
        self.dama.set_probes(probes.clone());
        self.probes = probes;
        self
    }

    /// The probe registry every fault of this node reports to.
    pub fn probes(&self) -> Arc<ProbeRegistry> {
        self.probes.clone()
    }

    /// Counters snapshot.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// The allocator, for inspection.
    pub fn dama(&self) -> &DamaController {
        &self.dama
    }

    /// A terminal's FIFO for one QoS priority.
    pub fn fifo(&self, tal_id: TalId, qos: Qos) -> Option<Arc<DvbFifo>> {
        self.fifos
            .get(&tal_id)?
            .iter()
            .find(|f| f.qos() == qos)
            .cloned()
    }

    // ========================================================================
    // Terminal lifecycle
    // ========================================================================

    /// Log a terminal on: allocator context, CNI state, one FIFO per QoS.
    pub fn logon(
        &mut self,
        tal_id: TalId,
        category_label: &str,
        esn0_db: Esn0Db,
        cra_kbps: RateKbps,
        max_rbdc_kbps: RateKbps,
        max_vbdc_pkt: VolPkt,
    ) -> Result<()> {
        self.fmt.register_terminal(tal_id, esn0_db);
        let modcod_id = match self.fmt.current_modcod(tal_id) {
            Some(id) => id,
            None => self.converter.table().most_robust_id(),
        };
        if let Err(e) = self.dama.logon(
            tal_id,
            category_label,
            modcod_id,
            cra_kbps,
            max_rbdc_kbps,
            max_vbdc_pkt,
        ) {
            self.fmt.deregister_terminal(tal_id);
            return Err(e);
        }
        let fifos = self
            .qos_priorities
            .iter()
            .map(|&qos| {
                Arc::new(
                    DvbFifo::new(
                        qos,
                        &format!("st{}_q{}", tal_id, qos),
                        self.fifo_capacity_pkt,
                    )
                    .with_probes(self.probes.clone()),
                )
            })
            .collect();
        self.fifos.insert(tal_id, fifos);
        Ok(())
    }

    /// Switch a terminal's SCPC mode (dedicated carrier, DAMA bypass).
    pub fn set_scpc(&mut self, tal_id: TalId, scpc: bool) -> Result<()> {
        self.dama.set_scpc(tal_id, scpc)
    }

    /// Log a terminal off: contexts vanish, FIFOs drain as `TerminalGone`.
    pub fn logoff(&mut self, tal_id: TalId) -> bool {
        if !self.dama.logoff(tal_id) {
            return false;
        }
        self.fmt.deregister_terminal(tal_id);
        if let Some(fifos) = self.fifos.remove(&tal_id) {
            for fifo in fifos {
                fifo.clear(ClearReason::TerminalGone);
            }
        }
        self.pending_sacs.retain(|sac| sac.tal_id != tal_id);
        true
    }

    // ========================================================================
    // Event ingest
    // ========================================================================

    /// Buffer a SAC; it takes effect at the next SoF.
    pub fn on_sac(&mut self, sac: SacBody) {
        self.pending_sacs.push(sac);
    }

    /// Ingest a control frame straight off the carrier transport.
    ///
    /// Undecodable bytes are dropped and counted; SACs are buffered for
    /// the next superframe, other frame kinds are not this block's
    /// business and are ignored.
    pub fn on_wire_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let frame = match DvbFrame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.probes.record_error(&e);
                log::debug!("[ReturnScheduler] undecodable frame dropped: {}", e);
                return Err(e);
            }
        };
        if let FrameBody::Sac(sac) = frame.body {
            self.on_sac(sac);
        }
        Ok(())
    }

    /// Process one superframe boundary.
    ///
    /// Duplicate SoF numbers are no-ops, stale numbers are counted and
    /// ignored; both return an empty output.
    pub fn on_sof(&mut self, sf: SfCount) -> Result<SchedulerOutput> {
        if let Some(last) = self.last_sf {
            if sf == last {
                self.stats.duplicate_sof += 1;
                log::debug!("[ReturnScheduler] duplicate SoF {} ignored", sf);
                return Ok(SchedulerOutput {
                    ttp: TimePlan::new(sf),
                    frames: Vec::new(),
                });
            }
            if sf < last {
                self.stats.backwards_sof += 1;
                let err = Error::BackwardsSof {
                    current: last,
                    received: sf,
                };
                self.probes.record_error(&err);
                log::warn!("[ReturnScheduler] {}, ignored", err);
                return Ok(SchedulerOutput {
                    ttp: TimePlan::new(sf),
                    frames: Vec::new(),
                });
            }
        }
        self.last_sf = Some(sf);
        let started = Instant::now();

        self.collect_requests();
        let ttp = self.dama.run_superframe(sf)?;
        let data_frames = self.build_frames(&ttp)?;

        self.stats.superframes += 1;

        if let Some(budget) = self.emit_budget {
            if started.elapsed() > budget {
                self.stats.overruns += 1;
                let err = Error::SuperframeOverrun(sf);
                self.probes.record_error(&err);
                log::warn!(
                    "[ReturnScheduler] {} ({} ms), Emit skipped",
                    err,
                    budget.as_millis()
                );
                return Ok(SchedulerOutput {
                    ttp,
                    frames: Vec::new(),
                });
            }
        }

        let mut frames = Vec::with_capacity(1 + data_frames.len());
        frames.push(DvbFrame::new(
            FrameHeader::new(self.tags.ctrl, self.spot_id),
            FrameBody::Ttp(TtpBody {
                superframe: sf,
                entries: ttp.entries().to_vec(),
            }),
        ));
        frames.extend(data_frames);
        self.stats.frames_emitted += frames.len() as u64 - 1;
        Ok(SchedulerOutput { ttp, frames })
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Phase 1: requests, CNI, MODCOD refresh, VBDC correction.
    fn collect_requests(&mut self) {
        for sac in std::mem::take(&mut self.pending_sacs) {
            match self.dama.on_sac(&sac) {
                Ok(reported_cni) => {
                    self.stats.sacs_ingested += 1;
                    if let Some(cni_db) = reported_cni {
                        self.fmt.require_cni(sac.tal_id, cni_db);
                        // the same report drives the forward-link MODCOD
                        if let Ok(modcod_id) = self.converter.table().best_id_for(cni_db) {
                            let _ = self.dama.update_output_modcod(sac.tal_id, modcod_id);
                        }
                    }
                }
                Err(e) => {
                    self.stats.bad_sacs += 1;
                    log::warn!("[ReturnScheduler] SAC rejected: {}", e);
                }
            }
        }

        self.fmt.tick();
        let tal_ids: Vec<TalId> = self.fifos.keys().copied().collect();
        for tal_id in tal_ids {
            if let Some(modcod_id) = self.fmt.current_modcod(tal_id) {
                let _ = self.dama.update_modcod(tal_id, modcod_id);
            }
            // a VBDC request with nothing queued behind it is stale
            let queued: VolPkt = self
                .fifos
                .get(&tal_id)
                .map(|fifos| fifos.iter().map(|f| f.current_pkt()).sum())
                .unwrap_or(0);
            if queued == 0 {
                self.dama.correct_vbdc(tal_id, 0);
            }
        }
    }

    /// Phase 3: turn the plan into data frames from FIFO contents.
    ///
    /// DAMA terminals fill their TTP slot runs into `DvbRcs` frames; SCPC
    /// terminals bypass the plan and fill their dedicated carrier into `Bb`
    /// frames at their forward-link MODCOD.
    fn build_frames(&mut self, ttp: &TimePlan) -> Result<Vec<DvbFrame>> {
        let mut frames = Vec::new();
        for entry in ttp.entries() {
            let fifos = match self.fifos.get(&entry.tal_id) {
                Some(fifos) => fifos.clone(),
                None => continue,
            };
            let slot_bytes =
                (self.converter.pkt_kbits_exact(entry.modcod_id)? * 1_000.0 / 8.0) as usize;
            let initial_budget = usize::from(entry.nb_slots) * slot_bytes;
            let (payload, budget_left) = self.fill_from_fifos(&fifos, initial_budget);

            if budget_left > 0 && payload.len() < initial_budget {
                let empty = fifos.iter().all(|f| f.current_pkt() == 0);
                if empty && budget_left == initial_budget {
                    // allocated slots with nothing to send at all
                    self.stats.under_allocated += 1;
                    log::debug!(
                        "[ReturnScheduler] ST{}: {} allocated slots wasted (FIFOs empty)",
                        entry.tal_id,
                        entry.nb_slots
                    );
                } else if empty {
                    self.stats.under_allocated += 1;
                }
            }

            if !payload.is_empty() {
                frames.push(DvbFrame::new(
                    FrameHeader::new(self.tags.data_out_st, self.spot_id),
                    FrameBody::DvbRcs {
                        tal_id: entry.tal_id,
                        modcod_id: entry.modcod_id,
                        payload,
                    },
                ));
            }
        }

        for (tal_id, carrier_id, capacity_pktpf, modcod_id) in self.dama.scpc_assignments() {
            let fifos = match self.fifos.get(&tal_id) {
                Some(fifos) => fifos.clone(),
                None => continue,
            };
            let slot_bytes = (self.converter.pkt_kbits_exact(modcod_id)? * 1_000.0 / 8.0) as usize;
            let budget = capacity_pktpf as usize * slot_bytes;
            let (payload, _) = self.fill_from_fifos(&fifos, budget);
            if !payload.is_empty() {
                frames.push(DvbFrame::new(
                    FrameHeader::new(carrier_id, self.spot_id),
                    FrameBody::Bb { modcod_id, payload },
                ));
            }
        }

        Ok(frames)
    }

    /// Pop from `fifos` in QoS order until `budget` is spent.
    ///
    /// A head fragment that does not fit goes back with `push_front`.
    /// Returns the assembled bytes and the unspent budget.
    fn fill_from_fifos(&mut self, fifos: &[Arc<DvbFifo>], mut budget: usize) -> (Vec<u8>, usize) {
        let mut payload = Vec::new();
        'fill: for fifo in fifos {
            while let Some(elem) = fifo.pop() {
                match self.handler.encode(&elem.payload, budget) {
                    None => {
                        // budget cannot hold even a minimal fragment
                        fifo.push_front(elem);
                        break 'fill;
                    }
                    Some(encoded) => {
                        budget -= encoded.bytes.len();
                        payload.extend_from_slice(&encoded.bytes);
                        if let Some(residue) = encoded.residue {
                            fifo.push_front(FifoElement {
                                tal_id: elem.tal_id,
                                qos: elem.qos,
                                payload: residue,
                            });
                        }
                    }
                }
            }
        }
        (payload, budget)
    }
}
