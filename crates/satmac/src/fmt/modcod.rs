// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MODCOD definition table.
//!
//! Loaded once at init from a text table (one MODCOD per line) and never
//! mutated afterwards. Lookup is by id for capacity conversions and by Es/N0
//! for link adaptation.
//!
//! Text format, `#` starts a comment:
//!
//! ```text
//! # id  modulation  coding  spectral_efficiency  required_esn0_db  burst_sym
//! 3     QPSK        1/2     0.98                 1.05              536
//! ```

use crate::config::{MODCOD_ID_MAX, MODCOD_ID_MIN};
use crate::types::{Esn0Db, ModcodId};
use crate::{Error, Result};

/// Supported modulation schemes for the return link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Bpsk,
    Qpsk,
    Psk8,
    Qam16,
}

impl Modulation {
    /// Bits carried per symbol before coding.
    pub fn bits_per_symbol(self) -> u32 {
        match self {
            Modulation::Bpsk => 1,
            Modulation::Qpsk => 2,
            Modulation::Psk8 => 3,
            Modulation::Qam16 => 4,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "BPSK" => Some(Modulation::Bpsk),
            "QPSK" => Some(Modulation::Qpsk),
            "8PSK" => Some(Modulation::Psk8),
            "16QAM" => Some(Modulation::Qam16),
            _ => None,
        }
    }
}

/// One immutable MODCOD definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ModcodDef {
    /// Identifier, unique and table-bounded.
    pub id: ModcodId,
    /// Modulation scheme.
    pub modulation: Modulation,
    /// Coding rate as printed in the table ("1/2", "3/4", ...).
    pub coding_rate: String,
    /// Useful bits per symbol after coding.
    pub spectral_efficiency: f32,
    /// Minimum Es/N0 required to decode, in dB.
    pub required_esn0_db: Esn0Db,
    /// Burst length in symbols (RCS2 fixed-size bursts).
    pub burst_length_sym: u32,
}

impl ModcodDef {
    /// Useful kilobits carried by one burst of this MODCOD.
    pub fn burst_kbits(&self) -> f64 {
        f64::from(self.burst_length_sym) * f64::from(self.spectral_efficiency) / 1_000.0
    }
}

/// Immutable table of MODCOD definitions, indexed by id.
#[derive(Debug, Clone)]
pub struct ModcodTable {
    defs: Vec<ModcodDef>,
}

impl ModcodTable {
    /// Parse a table from its text form.
    ///
    /// Fails on unknown modulations, out-of-range or duplicate ids, and on
    /// spectral efficiency not strictly increasing with id.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut defs: Vec<ModcodDef> = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 6 {
                return Err(Error::BadValue(format!(
                    "modcod table line {}: expected 6 fields, got {}",
                    line_no + 1,
                    fields.len()
                )));
            }

            let id: ModcodId = fields[0]
                .parse()
                .map_err(|_| Error::BadValue(format!("modcod id: {}", fields[0])))?;
            if !(MODCOD_ID_MIN..=MODCOD_ID_MAX).contains(&id) {
                return Err(Error::UnknownModcod(id));
            }
            if defs.iter().any(|d| d.id == id) {
                return Err(Error::BadValue(format!("duplicate modcod id {}", id)));
            }

            let modulation = Modulation::parse(fields[1])
                .ok_or_else(|| Error::BadValue(format!("modulation: {}", fields[1])))?;
            let spectral_efficiency: f32 = fields[3]
                .parse()
                .map_err(|_| Error::BadValue(format!("spectral efficiency: {}", fields[3])))?;
            let required_esn0_db: f32 = fields[4]
                .parse()
                .map_err(|_| Error::BadValue(format!("required Es/N0: {}", fields[4])))?;
            let burst_length_sym: u32 = fields[5]
                .parse()
                .map_err(|_| Error::BadValue(format!("burst length: {}", fields[5])))?;
            if spectral_efficiency <= 0.0 || burst_length_sym == 0 {
                return Err(Error::BadValue(format!(
                    "modcod {} has non-positive capacity",
                    id
                )));
            }

            defs.push(ModcodDef {
                id,
                modulation,
                coding_rate: fields[2].to_owned(),
                spectral_efficiency,
                required_esn0_db,
                burst_length_sym,
            });
        }

        if defs.is_empty() {
            return Err(Error::MissingParam("modcod table"));
        }

        defs.sort_by_key(|d| d.id);
        for pair in defs.windows(2) {
            if pair[1].spectral_efficiency <= pair[0].spectral_efficiency {
                return Err(Error::BadValue(format!(
                    "spectral efficiency not increasing between modcods {} and {}",
                    pair[0].id, pair[1].id
                )));
            }
        }

        Ok(Self { defs })
    }

    /// Reference RCS2 waveform table used by emulation defaults and tests.
    #[allow(clippy::expect_used)] // static table, verified by tests
    pub fn default_rcs2() -> Self {
        // Ids follow the RCS2 reference waveforms, 536-symbol bursts.
        let text = "\
# id  modulation  coding  efficiency  esn0   burst
3     QPSK        1/3     0.66        0.22   536
4     QPSK        1/2     0.98        2.34   536
5     QPSK        2/3     1.31        4.29   536
6     QPSK        3/4     1.47        5.36   536
7     QPSK        5/6     1.64        6.68   536
8     8PSK        2/3     1.97        8.08   536
9     8PSK        3/4     2.21        9.31   536
10    8PSK        5/6     2.46        10.82  536
11    16QAM       3/4     2.95        11.17  536
12    16QAM       5/6     3.28        12.56  536
";
        Self::from_text(text).expect("builtin RCS2 table is well-formed")
    }

    /// Look up a definition by id.
    pub fn def(&self, id: ModcodId) -> Result<&ModcodDef> {
        self.defs
            .iter()
            .find(|d| d.id == id)
            .ok_or(Error::UnknownModcod(id))
    }

    /// Highest id whose required Es/N0 does not exceed `esn0_db`.
    pub fn best_id_for(&self, esn0_db: Esn0Db) -> Result<ModcodId> {
        self.defs
            .iter()
            .filter(|d| d.required_esn0_db <= esn0_db)
            .max_by(|a, b| {
                a.spectral_efficiency
                    .partial_cmp(&b.spectral_efficiency)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|d| d.id)
            .ok_or(Error::NoModcodAvailable(esn0_db))
    }

    /// Lowest (most robust) id in the table.
    pub fn most_robust_id(&self) -> ModcodId {
        self.defs[0].id
    }

    /// All ids, ascending.
    pub fn ids(&self) -> impl Iterator<Item = ModcodId> + '_ {
        self.defs.iter().map(|d| d.id)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True when the table holds no definition (never after `from_text`).
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
