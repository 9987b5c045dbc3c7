// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-terminal CNI evolution and input MODCOD selection.
//!
//! Each tick (one per superframe) refreshes every registered terminal's
//! Es/N0 from the configured source, then selects the highest MODCOD the
//! terminal can decode. External CNI reports (typically carried by SAC
//! frames) override the source for one tick.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::types::{Esn0Db, ModcodId, TalId};
use crate::Error;

use super::ModcodTable;

/// Where terminal Es/N0 samples come from.
#[derive(Debug, Clone)]
pub enum CniSource {
    /// Es/N0 stays at its registration value.
    None,
    /// Pre-recorded rows, one per tick; the last row holds.
    File(Vec<Vec<(TalId, Esn0Db)>>),
    /// Uniform draw in `[lo, hi]` per terminal per tick.
    Random { lo: Esn0Db, hi: Esn0Db },
}

#[derive(Debug, Clone)]
struct TerminalFmt {
    esn0_db: Esn0Db,
    modcod_id: ModcodId,
}

/// CNI simulation: evolves Es/N0 and derives each terminal's input MODCOD.
pub struct FmtSimulation {
    table: Arc<ModcodTable>,
    source: CniSource,
    rng: SmallRng,
    row_index: usize,
    terminals: HashMap<TalId, TerminalFmt>,
    /// One-shot overrides applied at the next tick.
    overrides: HashMap<TalId, Esn0Db>,
}

impl FmtSimulation {
    /// Create a simulation over the given table and source.
    ///
    /// `seed` only matters for [`CniSource::Random`]; identical seeds and
    /// tick sequences reproduce identical MODCOD trajectories.
    pub fn new(table: Arc<ModcodTable>, source: CniSource, seed: u64) -> Self {
        Self {
            table,
            source,
            rng: SmallRng::seed_from_u64(seed),
            row_index: 0,
            terminals: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Register a terminal with its initial Es/N0.
    ///
    /// The initial MODCOD is selected immediately; a terminal below the
    /// table floor starts at the most robust MODCOD.
    pub fn register_terminal(&mut self, tal_id: TalId, esn0_db: Esn0Db) {
        let modcod_id = self.select_modcod(tal_id, esn0_db);
        self.terminals
            .insert(tal_id, TerminalFmt { esn0_db, modcod_id });
    }

    /// Forget a terminal (logoff).
    pub fn deregister_terminal(&mut self, tal_id: TalId) {
        self.terminals.remove(&tal_id);
        self.overrides.remove(&tal_id);
    }

    /// External CNI report; overrides the source at the next tick only.
    pub fn require_cni(&mut self, tal_id: TalId, cni_db: Esn0Db) {
        self.overrides.insert(tal_id, cni_db);
    }

    /// Advance one superframe: refresh Es/N0 and reselect MODCODs.
    pub fn tick(&mut self) {
        // Source samples first, overrides win afterwards.
        match &self.source {
            CniSource::None => {}
            CniSource::File(rows) => {
                if !rows.is_empty() {
                    let row = &rows[self.row_index.min(rows.len() - 1)];
                    for &(tal_id, esn0_db) in row {
                        if let Some(fmt) = self.terminals.get_mut(&tal_id) {
                            fmt.esn0_db = esn0_db;
                        }
                    }
                    self.row_index += 1;
                }
            }
            CniSource::Random { lo, hi } => {
                let (lo, hi) = (*lo, *hi);
                let samples: Vec<(TalId, Esn0Db)> = self
                    .terminals
                    .keys()
                    .map(|&tal_id| (tal_id, self.rng.gen_range(lo..=hi)))
                    .collect();
                for (tal_id, esn0_db) in samples {
                    if let Some(fmt) = self.terminals.get_mut(&tal_id) {
                        fmt.esn0_db = esn0_db;
                    }
                }
            }
        }

        for (tal_id, esn0_db) in std::mem::take(&mut self.overrides) {
            if let Some(fmt) = self.terminals.get_mut(&tal_id) {
                fmt.esn0_db = esn0_db;
            }
        }

        let updates: Vec<(TalId, Esn0Db)> = self
            .terminals
            .iter()
            .map(|(&tal_id, fmt)| (tal_id, fmt.esn0_db))
            .collect();
        for (tal_id, esn0_db) in updates {
            let modcod_id = self.select_modcod(tal_id, esn0_db);
            if let Some(fmt) = self.terminals.get_mut(&tal_id) {
                fmt.modcod_id = modcod_id;
            }
        }
    }

    /// Current input MODCOD of a terminal, if registered.
    pub fn current_modcod(&self, tal_id: TalId) -> Option<ModcodId> {
        self.terminals.get(&tal_id).map(|fmt| fmt.modcod_id)
    }

    /// Current Es/N0 of a terminal, if registered.
    pub fn current_esn0(&self, tal_id: TalId) -> Option<Esn0Db> {
        self.terminals.get(&tal_id).map(|fmt| fmt.esn0_db)
    }

    fn select_modcod(&self, tal_id: TalId, esn0_db: Esn0Db) -> ModcodId {
        match self.table.best_id_for(esn0_db) {
            Ok(id) => id,
            Err(Error::NoModcodAvailable(_)) => {
                log::warn!(
                    "[FmtSimulation] ST{}: Es/N0 {:.2} dB below table floor, \
                     keeping most robust MODCOD",
                    tal_id,
                    esn0_db
                );
                self.table.most_robust_id()
            }
            Err(_) => self.table.most_robust_id(),
        }
    }
}
