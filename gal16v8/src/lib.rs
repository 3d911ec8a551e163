//! Disassembler for GAL16V8 fuse maps: recovers the sum-of-products equations programmed
//! into the device.
//!
//! ```no_run
//! use galdis_gal16v8::{Decoder, FuseMap};
//!
//! let pins: Vec<String> = (1..=18).map(|i| i.to_string()).collect();
//! let decoder = Decoder::new(&pins)?;
//! let fuses: FuseMap = std::fs::read_to_string("fuses.txt")?.parse()?;
//! decoder.check_fuse_map(&fuses)?;
//! for eq in decoder.decode(&fuses) {
//!     println!("{eq}\n");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use unnamed_entity::entity_id;

pub mod decoder;
pub mod equation;
pub mod family;
pub mod fuse;
pub mod macrocell;
pub mod report;

pub use decoder::{CellConfig, Decoder, DetectedMode, Inconsistency};
pub use equation::{Equation, ProductTerm};
pub use family::{Family, GAL16V8, Mode};
pub use fuse::{Fuse, FuseMap};
pub use macrocell::Macrocell;
pub use report::Report;

entity_id! {
    pub id MacrocellId u8;
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    IncorrectPinCount { expected: usize, got: usize },
    FuseMapTooShort { expected: usize, got: usize },
    InvalidFuse { position: usize, found: char },
    Structural(Vec<Inconsistency>),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::IncorrectPinCount { expected, got } => {
                write!(f, "Incorrect number of pins: expected {expected}, got {got}")
            }
            DecodeError::FuseMapTooShort { expected, got } => {
                write!(f, "fuse map too short: expected {expected} fuses, got {got}")
            }
            DecodeError::InvalidFuse { position, found } => {
                write!(f, "invalid fuse state {found:?} at position {position}")
            }
            DecodeError::Structural(issues) => {
                write!(f, "inconsistent fuse configuration:")?;
                for issue in issues {
                    write!(f, "\n  {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DecodeError {}
