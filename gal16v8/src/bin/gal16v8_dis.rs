use std::{
    error::Error,
    fmt::Write,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use clap::{Arg, ArgAction, Command, value_parser};
use galdis_gal16v8::{Decoder, FuseMap, GAL16V8, Report};
use galdis_jed::JedFile;
use jzon::JsonValue;
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Package pin numbers, skipping ground (10) and power (20).
fn default_pins() -> Vec<String> {
    (1..=19)
        .filter(|&pin| pin != 10)
        .map(|pin| pin.to_string())
        .collect()
}

/// Pin names separated by whitespace or newlines; `#` starts a comment.
fn parse_pins(src: &str) -> Vec<String> {
    let mut pins = vec![];
    for mut line in src.lines() {
        if let Some(pos) = line.find('#') {
            line = &line[..pos];
        }
        pins.extend(line.split_ascii_whitespace().map(String::from));
    }
    pins
}

fn read_pins(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    Ok(parse_pins(&read_to_string(path)?))
}

fn render_text(report: &Report) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "; device {label} ({mode} mode{fallback})",
        label = report.device.label,
        mode = report.device.mode,
        fallback = if report.device.fallback {
            ", SYN/AC0 invalid"
        } else {
            ""
        },
    )
    .unwrap();
    write!(out, "; signature {hex}", hex = report.signature_hex()).unwrap();
    if let Some(text) = report.signature_text() {
        write!(out, " \"{text}\"").unwrap();
    }
    writeln!(out).unwrap();
    writeln!(out).unwrap();
    for eq in &report.equations {
        writeln!(out, "{eq}").unwrap();
        writeln!(out).unwrap();
    }
    out
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let m = Command::new("gal16v8_dis")
        .about("Recovers the equations programmed into a GAL16V8 from its JED file")
        .arg(
            Arg::new("jed")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("pins")
                .short('p')
                .long("pins")
                .help("file with the 18 signal pin names, in package order")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("refuse fuse maps with inconsistent configuration fuses")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count),
        )
        .get_matches();
    let arg_jed = m.get_one::<PathBuf>("jed").unwrap();
    let arg_pins = m.get_one::<PathBuf>("pins");
    let arg_output = m.get_one::<PathBuf>("output");
    let flag_json = m.get_flag("json");
    let flag_strict = m.get_flag("strict");
    let level = match m.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new().with_level(level).init()?;

    let pins = match arg_pins {
        Some(path) => read_pins(path)?,
        None => default_pins(),
    };
    let decoder = Decoder::new(&pins)?;

    let jed = JedFile::parse_from_file(arg_jed)?;
    if let Some(device) = jed.device() {
        if !device.to_ascii_lowercase().contains("16v8") {
            log::warn!("JED file is for {device}, decoding as {}", GAL16V8.name);
        }
    }
    let Some(bits) = jed.fuses else {
        return Err("JED file has no fuse data".into());
    };
    let fuses = FuseMap::new(bits);
    if fuses.len() != GAL16V8.fuses {
        log::info!(
            "JED file has {n} fuses, expected {expected}",
            n = fuses.len(),
            expected = GAL16V8.fuses
        );
    }
    decoder.check_fuse_map(&fuses)?;
    if flag_strict {
        decoder.check_strict(&fuses)?;
    }

    let report = decoder.report(&fuses);
    let out = if flag_json {
        JsonValue::from(&report).pretty(4) + "\n"
    } else {
        render_text(&report)
    };
    match arg_output {
        Some(path) => std::fs::write(path, out)?,
        None => print!("{out}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use galdis_gal16v8::{DecodeError, Decoder, Fuse, FuseMap, GAL16V8};

    use super::{default_pins, parse_pins, render_text};

    const PIN_FILE: &str = "\
# 74LS138-style decoder
clk  a0 a1
a2\t!cs1 cs2   # enables

!cs3 in8 in9
out19 !y7 !y6 !y5
  !y4 !y3 !y2 !y1 # outputs, top pin first

!y0
";

    #[test]
    fn default_pins_skip_power() {
        let pins = default_pins();
        assert_eq!(pins.len(), 18);
        assert_eq!(pins[8], "9");
        assert_eq!(pins[9], "11");
        assert_eq!(pins[17], "19");
    }

    #[test]
    fn pin_file_parsing() {
        let pins = parse_pins(PIN_FILE);
        assert_eq!(
            pins,
            [
                "clk", "a0", "a1", "a2", "!cs1", "cs2", "!cs3", "in8", "in9", "out19", "!y7",
                "!y6", "!y5", "!y4", "!y3", "!y2", "!y1", "!y0",
            ]
        );
        assert!(Decoder::new(&pins).is_ok());
        assert!(parse_pins("# only a comment\n\n   \n").is_empty());
    }

    #[test]
    fn short_pin_file_is_rejected() {
        let mut pins = parse_pins(PIN_FILE);
        pins.pop();
        assert_eq!(pins.len(), 17);
        assert_matches!(
            Decoder::new(&pins),
            Err(DecodeError::IncorrectPinCount {
                expected: 18,
                got: 17
            })
        );
    }

    #[test]
    fn text_rendering() {
        let decoder = Decoder::new(&default_pins()).unwrap();
        let fuses = FuseMap::filled(GAL16V8.fuses, Fuse::Blown)
            .with(GAL16V8.fuse_ac0, Fuse::Intact)
            .with(4, Fuse::Intact);
        let text = render_text(&decoder.report(&fuses));
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("; device g16v8as (simple mode)"));
        assert_eq!(lines.next(), Some("; signature ffffffffffffffff"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("19 = 3;"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("18 = 'b'1;"));
    }
}
