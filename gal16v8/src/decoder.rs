use unnamed_entity::{EntityId, EntityVec};

use crate::{
    DecodeError, MacrocellId,
    equation::{Equation, ProductTerm},
    family::{Family, GAL16V8, Mode},
    fuse::{Fuse, FuseMap},
    macrocell::Macrocell,
};

/// Operating mode as selected by the SYN and AC0 fuses.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DetectedMode {
    pub mode: Mode,
    /// Device name a compiler would use for this mode.
    pub label: &'static str,
    /// True if SYN and AC0 select no valid mode and `mode` is a guess.
    pub fallback: bool,
}

/// Per-macrocell configuration fuses.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CellConfig {
    /// XOR fuse intact: the output pin is inverted.
    pub active_low: bool,
    /// AC1 fuse intact: the output goes through the flip-flop.
    pub registered: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Inconsistency {
    /// SYN and AC0 both intact.
    InvalidModeCombination,
    /// AC1 intact on a cell while the device is not in registered mode.
    RegisteredOutsideRegisteredMode(MacrocellId),
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inconsistency::InvalidModeCombination => {
                write!(f, "SYN and AC0 both intact select no mode")
            }
            Inconsistency::RegisteredOutsideRegisteredMode(cell) => {
                write!(f, "macrocell {cell} is registered outside registered mode")
            }
        }
    }
}

/// Turns fuse maps into equations, using a fixed set of pin names.
#[derive(Debug, Clone)]
pub struct Decoder {
    family: &'static Family,
    pins: Vec<String>,
    /// Signal name sensed by each AND array column.
    row: Vec<String>,
}

impl Decoder {
    pub fn new<S: AsRef<str>>(pins: &[S]) -> Result<Self, DecodeError> {
        Self::with_family(&GAL16V8, pins)
    }

    pub fn with_family<S: AsRef<str>>(
        family: &'static Family,
        pins: &[S],
    ) -> Result<Self, DecodeError> {
        if pins.len() != family.pins {
            return Err(DecodeError::IncorrectPinCount {
                expected: family.pins,
                got: pins.len(),
            });
        }
        let pins: Vec<String> = pins.iter().map(|pin| pin.as_ref().to_string()).collect();
        let row = family
            .row
            .iter()
            .map(|col| format!("{}{}", col.prefix(), pins[col.pin]))
            .collect();
        Ok(Decoder { family, pins, row })
    }

    pub fn fuse_row(&self) -> &[String] {
        &self.row
    }

    /// Fails if the map does not cover every fuse the decoder reads.
    pub fn check_fuse_map(&self, fuses: &FuseMap) -> Result<(), DecodeError> {
        if fuses.len() < self.family.fuses {
            return Err(DecodeError::FuseMapTooShort {
                expected: self.family.fuses,
                got: fuses.len(),
            });
        }
        Ok(())
    }

    /// Reads SYN and AC0.  Both intact selects no mode; this falls back to complex mode.
    ///
    /// # Panics
    ///
    /// Panics if `fuses` is too short to hold the fuses read here.  A map that passes
    /// [`Decoder::check_fuse_map`] is long enough.
    pub fn detect_mode(&self, fuses: &FuseMap) -> DetectedMode {
        let syn = fuses.get(self.family.fuse_syn);
        let ac0 = fuses.get(self.family.fuse_ac0);
        let (mode, fallback) = match (syn, ac0) {
            (Fuse::Blown, Fuse::Intact) => (Mode::Simple, false),
            (Fuse::Blown, Fuse::Blown) => (Mode::Complex, false),
            (Fuse::Intact, Fuse::Blown) => (Mode::Registered, false),
            (Fuse::Intact, Fuse::Intact) => (Mode::Complex, true),
        };
        let label = if fallback {
            log::warn!("SYN and AC0 both intact, assuming {mode} mode");
            self.family.labels.fallback
        } else {
            self.family.label(mode)
        };
        log::debug!("device {label}, {mode} mode");
        DetectedMode {
            mode,
            label,
            fallback,
        }
    }

    pub fn cell_configs(&self, fuses: &FuseMap) -> EntityVec<MacrocellId, CellConfig> {
        (0..self.family.macrocells())
            .map(|idx| CellConfig {
                active_low: fuses.get(self.family.fuse_xor + idx).is_intact(),
                registered: fuses.get(self.family.fuse_ac1 + idx).is_intact(),
            })
            .collect()
    }

    /// The pin driven by a macrocell.  Macrocells are numbered from the top pin down.
    pub fn cell_pin(&self, cell: MacrocellId) -> &str {
        &self.pins[self.pins.len() - 1 - cell.to_idx()]
    }

    /// Lays out the product terms of the AND array.  Each output enable entry comes right
    /// before the data entry of its cell, and it takes one term from that cell's budget.
    ///
    /// # Panics
    ///
    /// Panics if `fuses` is too short to hold the fuses read here.  A map that passes
    /// [`Decoder::check_fuse_map`] is long enough.
    pub fn build_macrocells(&self, fuses: &FuseMap, mode: Mode) -> Vec<Macrocell> {
        let mut res = vec![];
        let configs = self.cell_configs(fuses);
        for (cell, cfg) in configs.iter() {
            let pin = self.cell_pin(cell);
            let prefix = if cfg.active_low { "!" } else { "" };
            let suffix = if cfg.registered { ".d" } else { "" };
            if cfg.registered && mode != Mode::Registered {
                log::warn!("macrocell {cell} ({pin}) is registered in {mode} mode");
            }
            let local_oe = match mode {
                Mode::Simple => false,
                Mode::Complex => true,
                Mode::Registered => !cfg.registered,
            };
            let mut or_terms = self.family.or_terms[cell.to_idx()];
            if local_oe {
                res.push(Macrocell::output_enable(cell, format!("{prefix}{pin}.oe")));
                or_terms -= 1;
            }
            res.push(Macrocell::new(cell, format!("{prefix}{pin}{suffix}"), or_terms));
        }
        log::debug!(
            "{n} macrocell entries: {names:?}",
            n = res.len(),
            names = Vec::from_iter(res.iter().map(|mc| &mc.name))
        );
        res
    }

    /// Decodes one row of the AND array.
    fn product_term(&self, row: impl Iterator<Item = Fuse>) -> ProductTerm {
        let mut signals = vec![];
        let mut prev = Fuse::Blown;
        for (idx, (fuse, name)) in row.zip(&self.row).enumerate() {
            if idx % 2 == 1 && fuse.is_intact() && prev.is_intact() {
                return ProductTerm::False;
            }
            if fuse.is_intact() {
                let name = name.strip_prefix("!!").unwrap_or(name);
                signals.push(name.to_string());
            }
            prev = fuse;
        }
        if signals.is_empty() {
            ProductTerm::True
        } else {
            ProductTerm::And(signals)
        }
    }

    /// Walks the AND array from fuse 0, giving each entry of `macrocells` its terms in order.
    ///
    /// # Panics
    ///
    /// Panics if `fuses` is too short to hold the fuses read here.  A map that passes
    /// [`Decoder::check_fuse_map`] is long enough.
    pub fn synthesize_equations(
        &self,
        fuses: &FuseMap,
        macrocells: &[Macrocell],
    ) -> Vec<Equation> {
        let width = self.row.len();
        let mut pos = 0;
        let mut next_term = || {
            let term = self.product_term(fuses.row(pos, width));
            pos += width;
            term
        };
        macrocells
            .iter()
            .map(|mc| {
                debug_assert!(mc.or_terms >= 1);
                let mut eq = Equation::new(mc.display_name(), next_term());
                for _ in 1..mc.or_terms {
                    eq.or(next_term());
                }
                eq
            })
            .collect()
    }

    /// Recovers one equation per macrocell entry, in AND array order.
    ///
    /// # Panics
    ///
    /// Panics if `fuses` is too short to hold the fuses read here.  A map that passes
    /// [`Decoder::check_fuse_map`] is long enough.
    pub fn decode(&self, fuses: &FuseMap) -> Vec<Equation> {
        let mode = self.detect_mode(fuses);
        let macrocells = self.build_macrocells(fuses, mode.mode);
        self.synthesize_equations(fuses, &macrocells)
    }

    /// Lists configuration problems that [`Decoder::decode`] silently works around.
    pub fn check_structure(&self, fuses: &FuseMap) -> Vec<Inconsistency> {
        let mut res = vec![];
        let detected = self.detect_mode(fuses);
        if detected.fallback {
            res.push(Inconsistency::InvalidModeCombination);
        }
        if detected.mode != Mode::Registered {
            for (cell, cfg) in self.cell_configs(fuses).iter() {
                if cfg.registered {
                    res.push(Inconsistency::RegisteredOutsideRegisteredMode(cell));
                }
            }
        }
        res
    }

    /// Like [`Decoder::check_structure`], but as an error.
    pub fn check_strict(&self, fuses: &FuseMap) -> Result<(), DecodeError> {
        let issues = self.check_structure(fuses);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::Structural(issues))
        }
    }

    /// The user electronic signature, byte 0 first.  The fuses hold the last byte first,
    /// each byte MSB first, with a blown fuse reading as 1.
    pub fn signature(&self, fuses: &FuseMap) -> Vec<u8> {
        let n = self.family.ues_bytes;
        (0..n)
            .map(|byte| {
                let start = self.family.fuse_ues + (n - 1 - byte) * 8;
                fuses
                    .row(start, 8)
                    .fold(0, |acc, fuse| acc << 1 | u8::from(fuse.is_blown()))
            })
            .collect()
    }
}
