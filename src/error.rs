use crate::chip::Name;

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum HdlError {
    /// The first line of a chip source did not match `CHIP <name>`.
    ChipHeader(String),
    /// A PARTS line did not match `<Chip> [<instance>] (pin=signal, ...)`.
    /// Only raised under strict parsing; lenient parsing drops the line.
    PartSyntax(String),
    /// A chip name was neither registered nor resolvable from a file.
    UnknownChip(Name),
    /// A chip flagged as built-in has no entry in the primitive dispatch table.
    NoPrimitive(Name),
    Io(PathBuf, String),
    /// A test-vector file had a malformed header or row.
    VectorFormat { line: usize, message: String },
    /// Strict mode: a part read a signal that no part produces and that
    /// is not an input of the enclosing chip.
    UnboundSignal { chip: Name, signal: Name },
    /// Strict mode: a connection named a pin absent from the referenced
    /// chip's interface.
    NoSuchPin { chip: Name, pin: Name },
    /// Strict mode: the parts of a chip depend on each other cyclically.
    CombLoop { chip: Name, parts: Vec<Name> },
}

impl std::fmt::Display for HdlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HdlError::ChipHeader(line) => write!(f, "Invalid chip declaration: {line}"),
            HdlError::PartSyntax(line) => write!(f, "Invalid part line: {line}"),
            HdlError::UnknownChip(name) => write!(f, "Unknown chip: {name}"),
            HdlError::NoPrimitive(name) => write!(f, "No logic defined for built-in chip: {name}"),
            HdlError::Io(path, message) => write!(f, "{}: {message}", path.display()),
            HdlError::VectorFormat { line, message } => {
                write!(f, "Bad test vector at line {line}: {message}")
            }
            HdlError::UnboundSignal { chip, signal } => {
                write!(f, "In chip {chip}: signal {signal} is read but never produced")
            }
            HdlError::NoSuchPin { chip, pin } => {
                write!(f, "Chip {chip} has no pin named {pin}")
            }
            HdlError::CombLoop { chip, parts } => {
                write!(f, "In chip {chip}: parts form a combinational loop: {}", parts.join(", "))
            }
        }
    }
}

impl std::error::Error for HdlError {}
