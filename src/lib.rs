//! Parser and simulator for a minimal hardware description language of
//! combinational chips.
//!
//! Chips are built from four primitive gates (`Nand`, `Not`, `And`,
//! `Or`) and from other chips, wired together in a `PARTS` section.
//! [`parse()`] turns HDL source text into a [`Chip`] registered in a
//! [`ChipStore`]; [`Sim::simulate`] evaluates a chip for a set of input
//! bits, resolving nested chip instances recursively through the store.

pub mod chip;
pub mod depends;
pub mod error;
pub mod parse;
pub mod sim;
pub mod store;
pub mod testbench;

#[cfg(test)]
mod tests;

pub use chip::{Bit, Chip, ChipInstance, Connection, Direction, Name, Pin};
pub use error::HdlError;
pub use parse::{parse, parse_file, parse_file_with, parse_with, ParseOptions};
pub use sim::{EvalMode, Sim, SignalTable};
pub use store::ChipStore;
