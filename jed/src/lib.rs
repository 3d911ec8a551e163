//! Reading and writing of JESD3 fuse files, the interchange format used by PLD programmers.

use std::fmt::Write;
use std::path::Path;

use bitvec::vec::BitVec;

const STX: char = '\x02';
const ETX: char = '\x03';

/// The contents of a JESD3 file, as far as a PLD fuse map is concerned.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct JedFile {
    /// Free-form text between STX and the first `'*'`, usually the compiler banner.
    pub design_spec: String,
    /// `N` fields, without the leading `N`.
    pub notes: Vec<String>,
    /// The `QP` field, if present.
    pub pin_count: Option<usize>,
    /// The fuse array.  A set bit is a blown (`1`) fuse.  `None` if the file has no `QF` field.
    pub fuses: Option<BitVec>,
    /// The `G` field: true to prevent readout.
    pub security: Option<bool>,
    /// If true, no `C` field is written, and none was present when parsing.
    pub skip_fuse_checksum: bool,
    /// If true, the transmission checksum is written as `0000`.
    pub skip_etx_checksum: bool,
}

#[derive(Debug)]
pub enum JedError {
    StxMissing,
    EtxMissing,
    UnterminatedField,
    FuseCountDuplicated,
    FuseCountMissing,
    FuseDefaultAfterList,
    FuseUndefined(usize),
    FuseOverrun(usize),
    FuseChecksumMismatch { expected: u16, found: u16 },
    SecurityDuplicated,
    EtxChecksumMissing,
    EtxChecksumMismatch { expected: u16, found: u16 },
    InvalidField(String),
    IoError(std::io::Error),
}

impl From<std::io::Error> for JedError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl std::fmt::Display for JedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JedError::StxMissing => write!(f, "STX missing"),
            JedError::EtxMissing => write!(f, "ETX missing"),
            JedError::UnterminatedField => write!(f, "unterminated field before ETX"),
            JedError::FuseCountDuplicated => write!(f, "QF field duplicated"),
            JedError::FuseCountMissing => write!(f, "fuse data before QF field"),
            JedError::FuseDefaultAfterList => write!(f, "F field after fuse list"),
            JedError::FuseUndefined(pos) => {
                write!(f, "fuse {pos} has no value and no default was given")
            }
            JedError::FuseOverrun(pos) => write!(f, "fuse {pos} is past the end of the array"),
            JedError::FuseChecksumMismatch { expected, found } => write!(
                f,
                "fuse checksum mismatch: file says {expected:04X}, fuses sum to {found:04X}"
            ),
            JedError::SecurityDuplicated => write!(f, "G field duplicated"),
            JedError::EtxChecksumMissing => write!(f, "transmission checksum missing"),
            JedError::EtxChecksumMismatch { expected, found } => write!(
                f,
                "transmission checksum mismatch: file says {expected:04X}, data sums to {found:04X}"
            ),
            JedError::InvalidField(field) => write!(f, "invalid field {field:?}"),
            JedError::IoError(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for JedError {}

/// Fuse array under construction, tracking which fuses have been given a value.
struct FuseArray {
    fuses: BitVec,
    defined: BitVec,
    listed: bool,
}

impl FuseArray {
    fn new(len: usize) -> Self {
        FuseArray {
            fuses: BitVec::repeat(false, len),
            defined: BitVec::repeat(false, len),
            listed: false,
        }
    }

    fn set_default(&mut self, val: bool) -> Result<(), JedError> {
        if self.listed {
            return Err(JedError::FuseDefaultAfterList);
        }
        self.fuses.fill(val);
        self.defined.fill(true);
        Ok(())
    }

    fn set_list(&mut self, mut pos: usize, bits: &str) -> Result<(), JedError> {
        self.listed = true;
        for c in bits.chars() {
            let val = match c {
                '0' => false,
                '1' => true,
                c if c.is_ascii_whitespace() => continue,
                _ => return Err(JedError::InvalidField(format!("L{pos} {bits}"))),
            };
            if pos >= self.fuses.len() {
                return Err(JedError::FuseOverrun(pos));
            }
            self.fuses.set(pos, val);
            self.defined.set(pos, true);
            pos += 1;
        }
        Ok(())
    }

    fn finish(self) -> Result<BitVec, JedError> {
        if let Some(pos) = self.defined.first_zero() {
            return Err(JedError::FuseUndefined(pos));
        }
        Ok(self.fuses)
    }
}

fn parse_bool(field: &str, arg: &str) -> Result<bool, JedError> {
    match arg.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(JedError::InvalidField(field.to_string())),
    }
}

fn parse_num(field: &str, arg: &str) -> Result<usize, JedError> {
    arg.trim()
        .parse()
        .map_err(|_| JedError::InvalidField(field.to_string()))
}

/// Sum of all bytes from STX through ETX inclusive.
fn transmission_checksum(framed: &str) -> u16 {
    framed
        .bytes()
        .fold(0u16, |acc, byte| acc.wrapping_add(byte.into()))
}

impl JedFile {
    pub fn new() -> Self {
        JedFile::default()
    }

    pub fn with_design_spec(self, design_spec: impl Into<String>) -> Self {
        Self {
            design_spec: design_spec.into(),
            ..self
        }
    }

    pub fn with_fuses(self, fuses: BitVec) -> Self {
        Self {
            fuses: Some(fuses),
            ..self
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The value of the first `DEVICE` note, if any.
    pub fn device(&self) -> Option<&str> {
        self.notes.iter().find_map(|note| {
            let note = note.trim_start();
            note.strip_prefix("DEVICE")
                .filter(|dev| dev.is_empty() || dev.starts_with(char::is_whitespace))
                .map(|dev| dev.trim())
                .filter(|dev| !dev.is_empty())
        })
    }

    /// Computes the `C` field value: the fuses taken as little-endian 8-bit words, summed.
    pub fn fuse_checksum(&self) -> u16 {
        let Some(ref fuses) = self.fuses else {
            return 0;
        };
        fuses
            .iter_ones()
            .fold(0u16, |acc, i| acc.wrapping_add(1 << (i % 8)))
    }

    pub fn emit(&self) -> String {
        let mut out = String::new();
        write!(out, "{STX}{spec}*", spec = self.design_spec).unwrap();
        writeln!(out).unwrap();
        for note in &self.notes {
            writeln!(out, "N{note}*").unwrap();
        }
        if let Some(pins) = self.pin_count {
            writeln!(out, "QP{pins}*").unwrap();
        }
        if let Some(ref fuses) = self.fuses {
            writeln!(out, "QF{n}*", n = fuses.len()).unwrap();
            if let Some(security) = self.security {
                writeln!(out, "G{s}*", s = u32::from(security)).unwrap();
            }
            writeln!(out, "F0*").unwrap();
            // Rows of 32 fuses match the AND array width of the common 20-pin parts.
            for (row, chunk) in fuses.chunks(32).enumerate() {
                if chunk.not_any() {
                    continue;
                }
                write!(out, "L{pos:05} ", pos = row * 32).unwrap();
                for bit in chunk.iter().by_vals() {
                    write!(out, "{x}", x = u32::from(bit)).unwrap();
                }
                writeln!(out, "*").unwrap();
            }
            if !self.skip_fuse_checksum {
                writeln!(out, "C{checksum:04X}*", checksum = self.fuse_checksum()).unwrap();
            }
        } else if let Some(security) = self.security {
            writeln!(out, "G{s}*", s = u32::from(security)).unwrap();
        }
        write!(out, "{ETX}").unwrap();
        let checksum = if self.skip_etx_checksum {
            0
        } else {
            transmission_checksum(&out)
        };
        writeln!(out, "{checksum:04X}").unwrap();
        out
    }

    pub fn parse(jed: &str) -> Result<JedFile, JedError> {
        let stx = jed.find(STX).ok_or(JedError::StxMissing)?;
        let etx = jed[stx..].find(ETX).ok_or(JedError::EtxMissing)? + stx;
        let body = &jed[stx + 1..etx];

        let (design_spec, mut rest) = body.split_once('*').ok_or(JedError::UnterminatedField)?;
        let mut res = JedFile {
            design_spec: design_spec.to_string(),
            ..Default::default()
        };
        let mut array: Option<FuseArray> = None;
        let mut fuse_checksum = None;
        while let Some((field, tail)) = rest.split_once('*') {
            rest = tail;
            let field = field.trim_start();
            let Some(kind) = field.chars().next() else {
                continue;
            };
            let arg = &field[kind.len_utf8()..];
            match kind {
                'N' => res.notes.push(arg.to_string()),
                'Q' => {
                    if let Some(n) = arg.strip_prefix('F') {
                        if array.is_some() {
                            return Err(JedError::FuseCountDuplicated);
                        }
                        array = Some(FuseArray::new(parse_num(field, n)?));
                    } else if let Some(n) = arg.strip_prefix('P') {
                        res.pin_count = Some(parse_num(field, n)?);
                    } else {
                        log::debug!("skipping JED field {field:?}");
                    }
                }
                'F' => {
                    let array = array.as_mut().ok_or(JedError::FuseCountMissing)?;
                    array.set_default(parse_bool(field, arg)?)?;
                }
                'L' => {
                    let array = array.as_mut().ok_or(JedError::FuseCountMissing)?;
                    let split = arg
                        .find(|c: char| c.is_ascii_whitespace())
                        .ok_or_else(|| JedError::InvalidField(field.to_string()))?;
                    let pos = parse_num(field, &arg[..split])?;
                    array.set_list(pos, &arg[split..])?;
                }
                'C' => {
                    if array.is_none() {
                        return Err(JedError::FuseCountMissing);
                    }
                    let arg = arg.trim();
                    if arg.len() != 4 {
                        return Err(JedError::InvalidField(field.to_string()));
                    }
                    let sum = u16::from_str_radix(arg, 16)
                        .map_err(|_| JedError::InvalidField(field.to_string()))?;
                    fuse_checksum = Some(sum);
                }
                'G' => {
                    if res.security.is_some() {
                        return Err(JedError::SecurityDuplicated);
                    }
                    res.security = Some(parse_bool(field, arg)?);
                }
                _ => log::debug!("skipping JED field {kind:?}"),
            }
        }
        if !rest.trim().is_empty() {
            return Err(JedError::UnterminatedField);
        }

        if let Some(array) = array {
            res.fuses = Some(array.finish()?);
        }
        match fuse_checksum {
            Some(expected) => {
                let found = res.fuse_checksum();
                if expected != found {
                    return Err(JedError::FuseChecksumMismatch { expected, found });
                }
            }
            None => res.skip_fuse_checksum = true,
        }

        let expected = jed
            .get(etx + 1..etx + 5)
            .ok_or(JedError::EtxChecksumMissing)?;
        let expected = u16::from_str_radix(expected, 16)
            .map_err(|_| JedError::InvalidField(expected.to_string()))?;
        let found = transmission_checksum(&jed[stx..=etx]);
        if expected == 0 {
            res.skip_etx_checksum = true;
        } else if expected != found {
            return Err(JedError::EtxChecksumMismatch { expected, found });
        }
        Ok(res)
    }

    pub fn parse_from_file(fname: impl AsRef<Path>) -> Result<Self, JedError> {
        let jed = std::fs::read_to_string(fname)?;
        Self::parse(&jed)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bitvec::vec::BitVec;

    use super::{JedError, JedFile};

    fn frame(body: &str) -> String {
        format!("\x02{body}\x030000\n")
    }

    #[test]
    fn parse_defaults_and_lists() {
        let jed = frame(
            "GALasm 2.1*\nN DEVICE GAL16V8*\nQP20*\nQF64*\nF1*\nL0000 0110*\nL0032 00000000 1*\nV0001 0XXXXXXXXXN*\n",
        );
        let jed = JedFile::parse(&jed).unwrap();
        assert_eq!(jed.design_spec, "GALasm 2.1");
        assert_eq!(jed.device(), Some("GAL16V8"));
        assert_eq!(jed.pin_count, Some(20));
        assert!(jed.skip_fuse_checksum);
        assert!(jed.skip_etx_checksum);
        let fuses = jed.fuses.unwrap();
        assert_eq!(fuses.len(), 64);
        assert!(!fuses[0] && fuses[1] && fuses[2] && !fuses[3]);
        assert_eq!(fuses[32..40].count_ones(), 0);
        assert!(fuses[40]);
        assert_eq!(fuses[41..].count_zeros(), 0);
    }

    #[test]
    fn emitted_file_parses_back() {
        let mut fuses = BitVec::repeat(false, 2194);
        for i in [3, 100, 2048, 2192] {
            fuses.set(i, true);
        }
        let mut orig = JedFile::new()
            .with_design_spec("galdis")
            .with_note(" DEVICE g16v8as")
            .with_fuses(fuses);
        orig.pin_count = Some(20);
        orig.security = Some(true);
        let text = orig.emit();
        assert!(text.contains("\nQP20*\n"));
        assert!(text.contains("\nG1*\n"));
        let parsed = JedFile::parse(&text).unwrap();
        assert_eq!(parsed, orig);
        // fuse 3 and fuse 100 land on bits 3 and 4, fuses 2048 and 2192 on bit 0
        assert_eq!(parsed.fuse_checksum(), 8 + 16 + 1 + 1);

        orig.security = Some(false);
        let parsed = JedFile::parse(&orig.emit()).unwrap();
        assert_eq!(parsed.security, Some(false));
    }

    #[test]
    fn device_note_lookup() {
        let jed = JedFile::new()
            .with_note(" DEVICEID foo")
            .with_note(" DEVICE\tg16v8 ");
        assert_eq!(jed.device(), Some("g16v8"));
        assert_eq!(JedFile::new().with_note("DEVICEID foo").device(), None);
        assert_eq!(JedFile::new().with_note(" DEVICE").device(), None);
        assert_eq!(JedFile::new().with_note("PINS 20").device(), None);
    }

    #[test]
    fn checksum_errors() {
        let jed = frame("x*QF8*F0*L0 11*C0009*");
        assert_matches!(
            JedFile::parse(&jed),
            Err(JedError::FuseChecksumMismatch {
                expected: 9,
                found: 3
            })
        );
        let jed = "\x02x*QF8*F0*\x03FFFF\n";
        assert_matches!(
            JedFile::parse(jed),
            Err(JedError::EtxChecksumMismatch {
                expected: 0xffff,
                ..
            })
        );
        assert_matches!(
            JedFile::parse("\x02x*QF8*F0*\x03"),
            Err(JedError::EtxChecksumMissing)
        );
    }

    #[test]
    fn structural_errors() {
        assert_matches!(JedFile::parse("no framing"), Err(JedError::StxMissing));
        assert_matches!(JedFile::parse("\x02x*"), Err(JedError::EtxMissing));
        assert_matches!(
            JedFile::parse(&frame("x*L0 1*")),
            Err(JedError::FuseCountMissing)
        );
        assert_matches!(
            JedFile::parse(&frame("x*QF4*L0 1*F0*")),
            Err(JedError::FuseDefaultAfterList)
        );
        assert_matches!(
            JedFile::parse(&frame("x*QF4*L0 10*")),
            Err(JedError::FuseUndefined(2))
        );
        assert_matches!(
            JedFile::parse(&frame("x*QF4*F0*L2 111*")),
            Err(JedError::FuseOverrun(4))
        );
        assert_matches!(
            JedFile::parse(&frame("x*QF4*F0*G1*G0*")),
            Err(JedError::SecurityDuplicated)
        );
        assert_matches!(
            JedFile::parse(&frame("x*QF4*F0*L0 1")),
            Err(JedError::UnterminatedField)
        );
    }
}
