//! Per-family layout constants: pin topology of the AND array and the location of the
//! configuration fuses.

/// One column of the AND array: the pin it senses, and whether it senses the complement.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FuseColumn {
    /// Index into the pin name list (not the package pin number).
    pub pin: usize,
    pub inverted: bool,
}

impl FuseColumn {
    const fn new(pin: usize, inverted: bool) -> Self {
        FuseColumn { pin, inverted }
    }

    pub fn prefix(self) -> &'static str {
        if self.inverted { "!" } else { "" }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Mode {
    Simple,
    Complex,
    Registered,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Simple => write!(f, "simple"),
            Mode::Complex => write!(f, "complex"),
            Mode::Registered => write!(f, "registered"),
        }
    }
}

/// Device names used by compilers for each operating mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ModeLabels {
    pub simple: &'static str,
    pub complex: &'static str,
    pub registered: &'static str,
    /// Used when SYN and AC0 select no valid mode.
    pub fallback: &'static str,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Family {
    pub name: &'static str,
    /// Number of named pins: everything except power and ground.
    pub pins: usize,
    /// Total fuse count, as given in the `QF` field.
    pub fuses: usize,
    /// AND array columns, in fuse order.  Columns come in true/complement pairs.
    pub row: &'static [FuseColumn],
    /// Product terms available to each macrocell, before any are taken for output enable.
    pub or_terms: &'static [usize],
    pub fuse_syn: usize,
    pub fuse_ac0: usize,
    /// First XOR fuse; one per macrocell.
    pub fuse_xor: usize,
    /// First AC1 fuse; one per macrocell.
    pub fuse_ac1: usize,
    /// First user electronic signature fuse.
    pub fuse_ues: usize,
    pub ues_bytes: usize,
    pub labels: ModeLabels,
}

impl Family {
    pub fn macrocells(&self) -> usize {
        self.or_terms.len()
    }

    pub fn label(&self, mode: Mode) -> &'static str {
        match mode {
            Mode::Simple => self.labels.simple,
            Mode::Complex => self.labels.complex,
            Mode::Registered => self.labels.registered,
        }
    }
}

const GAL16V8_ROW: [FuseColumn; 32] = [
    FuseColumn::new(1, false),
    FuseColumn::new(1, true),
    // pin 1: the register clock in registered mode
    FuseColumn::new(0, false),
    FuseColumn::new(0, true),
    FuseColumn::new(2, false),
    FuseColumn::new(2, true),
    FuseColumn::new(16, false),
    FuseColumn::new(16, true),
    FuseColumn::new(3, false),
    FuseColumn::new(3, true),
    FuseColumn::new(15, false),
    FuseColumn::new(15, true),
    FuseColumn::new(4, false),
    FuseColumn::new(4, true),
    FuseColumn::new(14, false),
    FuseColumn::new(14, true),
    FuseColumn::new(5, false),
    FuseColumn::new(5, true),
    FuseColumn::new(13, false),
    FuseColumn::new(13, true),
    FuseColumn::new(6, false),
    FuseColumn::new(6, true),
    FuseColumn::new(12, false),
    FuseColumn::new(12, true),
    FuseColumn::new(7, false),
    FuseColumn::new(7, true),
    FuseColumn::new(11, false),
    FuseColumn::new(11, true),
    FuseColumn::new(8, false),
    FuseColumn::new(8, true),
    // pin 11: the global /OE in registered mode
    FuseColumn::new(9, false),
    FuseColumn::new(9, true),
];

/// GAL16V8 and compatibles (ATF16V8B and friends).
///
/// Pin names 0..=8 are package pins 1..=9, names 9..=17 are package pins 11..=19.
/// Macrocell 0 drives pin 19, macrocell 7 drives pin 12.
pub const GAL16V8: Family = Family {
    name: "GAL16V8",
    pins: 18,
    fuses: 2194,
    row: &GAL16V8_ROW,
    or_terms: &[8, 8, 8, 8, 8, 8, 8, 8],
    fuse_syn: 2192,
    fuse_ac0: 2193,
    fuse_xor: 2048,
    fuse_ac1: 2120,
    fuse_ues: 2056,
    ues_bytes: 8,
    labels: ModeLabels {
        simple: "g16v8as",
        complex: "g16v8ma",
        registered: "g16v8ms",
        fallback: "g16v8a",
    },
};

#[cfg(test)]
mod tests {
    use super::GAL16V8;

    #[test]
    fn gal16v8_layout_is_consistent() {
        let fam = GAL16V8;
        assert_eq!(fam.row.len(), 32);
        assert_eq!(fam.macrocells(), 8);
        for pair in fam.row.chunks(2) {
            assert_eq!(pair[0].pin, pair[1].pin);
            assert!(!pair[0].inverted && pair[1].inverted);
            assert!(pair[0].pin < fam.pins);
        }
        // AND array, XOR, UES, AC1, PTD, SYN, AC0
        let and_fuses: usize = fam.or_terms.iter().sum::<usize>() * fam.row.len();
        assert_eq!(and_fuses, fam.fuse_xor);
        assert_eq!(fam.fuse_xor + fam.macrocells(), fam.fuse_ues);
        assert_eq!(fam.fuse_ues + fam.ues_bytes * 8, fam.fuse_ac1);
        assert_eq!(fam.fuse_ac0 + 1, fam.fuses);
    }
}
