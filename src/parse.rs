use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

use crate::chip::{Chip, ChipInstance, Connection, Name};
use crate::error::HdlError;
use crate::store::ChipStore;

lazy_static! {
    static ref CHIP_HEADER: Regex = Regex::new(r"^CHIP\s+(\w+)").unwrap();
    static ref PART_LINE: Regex = Regex::new(r"^(\w+)(?:\s+(\w+))?\s*\((.*)\)").unwrap();
}

/// Policy for lines in the PARTS section that match nothing.
///
/// The default is the lenient behavior the language has always had: a
/// malformed part line is dropped (with a warning) and the rest of the
/// chip parses normally. Strict parsing turns the drop into an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub strict: bool,
}

/// Outcome of matching one line in the PARTS region.
enum PartParse {
    Part(ChipInstance),
    Malformed(String),
}

/// Parse one chip from HDL source text and register it into the store.
pub fn parse(store: &mut ChipStore, text: &str) -> Result<Arc<Chip>, HdlError> {
    parse_with(store, text, ParseOptions::default())
}

pub fn parse_file<P: AsRef<Path>>(store: &mut ChipStore, path: P) -> Result<Arc<Chip>, HdlError> {
    parse_file_with(store, path, ParseOptions::default())
}

pub fn parse_file_with<P: AsRef<Path>>(
    store: &mut ChipStore,
    path: P,
    options: ParseOptions,
) -> Result<Arc<Chip>, HdlError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|err| HdlError::Io(path.to_owned(), err.to_string()))?;
    parse_with(store, &text, options)
}

/// Single pass over the trimmed, non-blank, non-comment lines: the
/// first line must be the `CHIP <name>` header, the first `IN` and
/// `OUT` lines carry the pin lists, and everything between `PARTS:` and
/// the next `IN`/`OUT` line (or the end) is a part instance.
pub fn parse_with(
    store: &mut ChipStore,
    text: &str,
    options: ParseOptions,
) -> Result<Arc<Chip>, HdlError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_comment(line))
        .collect();

    let header = lines.first().copied().unwrap_or("");
    let caps = CHIP_HEADER
        .captures(header)
        .ok_or_else(|| HdlError::ChipHeader(header.to_string()))?;
    let name = caps[1].to_string();

    let inputs = pin_section(&lines, "IN");
    let outputs = pin_section(&lines, "OUT");
    let parts = parts_section(&lines, options)?;

    let chip = Chip::new(name, inputs, outputs, parts);
    Ok(store.register(chip))
}

fn is_comment(line: &str) -> bool {
    // Lines are already trimmed, so ` * ...` continuation lines and the
    // closing `*/` both fall under the leading-star check.
    line.starts_with("/**") || line.starts_with('*')
}

/// Pin names from the first line starting with the section keyword.
/// No such line means an empty pin list, which is legal.
fn pin_section(lines: &[&str], keyword: &str) -> Vec<Name> {
    for line in lines {
        if let Some(rest) = line.strip_prefix(keyword) {
            return rest
                .trim()
                .trim_end_matches(';')
                .split(',')
                .map(str::trim)
                .filter(|pin| !pin.is_empty())
                .map(String::from)
                .collect();
        }
    }
    vec![]
}

fn parts_section(lines: &[&str], options: ParseOptions) -> Result<Vec<ChipInstance>, HdlError> {
    let mut parts = vec![];
    let mut in_parts = false;

    for line in lines {
        if line.starts_with("PARTS:") {
            in_parts = true;
            continue;
        }
        if line.starts_with("IN") || line.starts_with("OUT") {
            in_parts = false;
            continue;
        }
        if !in_parts || *line == "{" || *line == "}" {
            continue;
        }
        match parse_part_line(line) {
            PartParse::Part(instance) => parts.push(instance),
            PartParse::Malformed(text) => {
                if options.strict {
                    return Err(HdlError::PartSyntax(text));
                }
                warn!("skipping malformed part line: {text}");
            }
        }
    }

    Ok(parts)
}

fn parse_part_line(line: &str) -> PartParse {
    let Some(caps) = PART_LINE.captures(line) else {
        return PartParse::Malformed(line.to_string());
    };
    let chip_name = caps[1].to_string();
    let instance_name = caps
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| chip_name.clone());
    let connections = parse_connections(&caps[3]);
    PartParse::Part(ChipInstance {
        chip_name,
        instance_name,
        connections,
    })
}

/// Connections are comma-separated `pin=signal` pairs. Fragments without
/// an `=` contribute nothing; the grammar has no nested expressions, so
/// a plain comma split is enough.
fn parse_connections(text: &str) -> Vec<Connection> {
    let mut connections = vec![];
    for fragment in text.split(',') {
        if let Some((pin, signal)) = fragment.split_once('=') {
            connections.push(Connection {
                pin: pin.trim().to_string(),
                signal: signal.trim().to_string(),
            });
        }
    }
    connections
}
