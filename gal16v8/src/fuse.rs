use std::str::FromStr;

use bitvec::vec::BitVec;

use crate::DecodeError;

/// State of a single fuse.  In the AND array an intact fuse connects its input to the term.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Fuse {
    /// `0` in a fuse file.
    Intact,
    /// `1` in a fuse file.
    Blown,
}

impl Fuse {
    pub fn is_intact(self) -> bool {
        self == Fuse::Intact
    }

    pub fn is_blown(self) -> bool {
        self == Fuse::Blown
    }
}

impl From<bool> for Fuse {
    fn from(blown: bool) -> Self {
        if blown { Fuse::Blown } else { Fuse::Intact }
    }
}

/// A read-only fuse array.  Bits are stored as in a JED file: set means blown.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct FuseMap {
    bits: BitVec,
}

impl FuseMap {
    pub fn new(bits: BitVec) -> Self {
        FuseMap { bits }
    }

    /// A map of `len` fuses, all in the given state.
    pub fn filled(len: usize, fuse: Fuse) -> Self {
        FuseMap {
            bits: BitVec::repeat(fuse.is_blown(), len),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, idx: usize) -> Fuse {
        Fuse::from(self.bits[idx])
    }

    /// `len` consecutive fuses starting at `start`.
    pub fn row(&self, start: usize, len: usize) -> impl Iterator<Item = Fuse> + '_ {
        self.bits[start..start + len]
            .iter()
            .by_vals()
            .map(Fuse::from)
    }

    /// Returns a copy with a single fuse changed.
    pub fn with(mut self, idx: usize, fuse: Fuse) -> Self {
        self.bits.set(idx, fuse.is_blown());
        self
    }
}

impl FromStr for FuseMap {
    type Err = DecodeError;

    /// Parses a string of `0` and `1` characters.  Whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bits = BitVec::with_capacity(s.len());
        for (position, c) in s.chars().filter(|c| !c.is_whitespace()).enumerate() {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                _ => return Err(DecodeError::InvalidFuse { position, found: c }),
            }
        }
        Ok(FuseMap { bits })
    }
}

impl std::fmt::Display for FuseMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for bit in self.bits.iter().by_vals() {
            write!(f, "{}", u8::from(bit))?;
        }
        Ok(())
    }
}
