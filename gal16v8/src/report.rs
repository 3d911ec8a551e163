use jzon::JsonValue;
use unnamed_entity::{EntityId, EntityVec};

use crate::{
    MacrocellId,
    decoder::{CellConfig, Decoder, DetectedMode},
    equation::{Equation, ProductTerm},
    fuse::FuseMap,
    macrocell::Macrocell,
};

/// Everything recovered from one fuse map.
#[derive(Debug, Clone)]
pub struct Report {
    pub device: DetectedMode,
    pub signature: Vec<u8>,
    pub cells: EntityVec<MacrocellId, CellConfig>,
    pub macrocells: Vec<Macrocell>,
    pub equations: Vec<Equation>,
}

impl Report {
    /// The signature as text, if it is all printable ASCII once trailing NULs are removed.
    pub fn signature_text(&self) -> Option<String> {
        let end = self
            .signature
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |pos| pos + 1);
        let text = &self.signature[..end];
        if text.is_empty() || !text.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return None;
        }
        Some(text.iter().map(|&b| char::from(b)).collect())
    }

    pub fn signature_hex(&self) -> String {
        self.signature.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Decoder {
    pub fn report(&self, fuses: &FuseMap) -> Report {
        let device = self.detect_mode(fuses);
        let macrocells = self.build_macrocells(fuses, device.mode);
        let equations = self.synthesize_equations(fuses, &macrocells);
        Report {
            device,
            signature: self.signature(fuses),
            cells: self.cell_configs(fuses),
            macrocells,
            equations,
        }
    }
}

impl From<&ProductTerm> for JsonValue {
    fn from(term: &ProductTerm) -> Self {
        match term {
            ProductTerm::True => true.into(),
            ProductTerm::False => false.into(),
            ProductTerm::And(signals) => Vec::from_iter(signals.iter().map(String::as_str)).into(),
        }
    }
}

impl From<&Report> for JsonValue {
    fn from(report: &Report) -> Self {
        jzon::object! {
            device: report.device.label,
            mode: report.device.mode.to_string(),
            mode_fallback: report.device.fallback,
            signature: report.signature_hex(),
            signature_text: report.signature_text(),
            cells: Vec::from_iter(report.cells.iter().map(|(cell, cfg)| jzon::object! {
                cell: cell.to_idx(),
                active_low: cfg.active_low,
                registered: cfg.registered,
            })),
            macrocells: Vec::from_iter(report.macrocells.iter().map(|mc| jzon::object! {
                cell: mc.cell.to_idx(),
                name: mc.name.as_str(),
                or_terms: mc.or_terms,
                oe: mc.oe,
            })),
            equations: Vec::from_iter(report.equations.iter().map(|eq| jzon::object! {
                output: eq.output.as_str(),
                terms: Vec::from_iter(eq.terms().map(JsonValue::from)),
                text: eq.to_string(),
            })),
        }
    }
}
