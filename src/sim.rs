use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::chip::{Bit, Chip, ChipInstance, Name};
use crate::depends::Depends;
use crate::error::HdlError;
use crate::store::ChipStore;

/// Signal values local to one chip's simulation scope.
///
/// Each `simulate` invocation builds a fresh table from the values
/// explicitly routed to it; tables are never shared between sibling
/// recursive calls, so equal internal names in different chips cannot
/// collide.
pub type SignalTable = BTreeMap<Name, Bit>;

/// How a composite chip's parts are ordered for evaluation.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum EvalMode {
    /// Replay the parts exactly as declared. A part that reads a signal
    /// before anything has produced it sees 0, as the language has
    /// always behaved; correctness is the chip author's burden.
    #[default]
    Declaration,
    /// Order parts producer-before-consumer and fail fast on unbound
    /// reads, unknown pins, and combinational loops.
    Strict,
}

/// The simulation engine. Owns the definition store so that chip
/// references (including recursive ones for parts) can be resolved, and
/// files pulled in on demand, during evaluation.
pub struct Sim {
    store: ChipStore,
    mode: EvalMode,
}

impl Sim {
    pub fn new(store: ChipStore) -> Sim {
        Sim::with_mode(store, EvalMode::Declaration)
    }

    pub fn with_mode(store: ChipStore, mode: EvalMode) -> Sim {
        Sim { store, mode }
    }

    pub fn store(&self) -> &ChipStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChipStore {
        &mut self.store
    }

    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    /// Evaluate a chip for one set of input values.
    ///
    /// Inputs missing from the map read as 0. The result maps every
    /// declared output pin to its computed value, defaulting to 0 for
    /// outputs nothing drove.
    pub fn simulate(&mut self, chip_name: &str, inputs: &SignalTable) -> Result<SignalTable, HdlError> {
        let chip = self
            .store
            .lookup(chip_name)?
            .ok_or_else(|| HdlError::UnknownChip(chip_name.to_string()))?;

        if chip.is_builtin() {
            primitive(chip.name(), inputs)
        } else {
            self.simulate_composite(&chip, inputs.clone())
        }
    }

    fn simulate_composite(&mut self, chip: &Chip, mut signals: SignalTable) -> Result<SignalTable, HdlError> {
        let order = match self.mode {
            EvalMode::Declaration => (0..chip.parts().len()).collect(),
            EvalMode::Strict => self.part_order(chip)?,
        };

        for index in order {
            let part = &chip.parts()[index];
            debug!("{}: evaluating part {} ({})", chip.name(), part.instance_name, part.chip_name);
            self.simulate_part(chip, part, &mut signals)?;
        }

        Ok(chip
            .outputs()
            .iter()
            .map(|out| (out.clone(), signals.get(out).copied().unwrap_or(0)))
            .collect())
    }

    fn simulate_part(
        &mut self,
        enclosing: &Chip,
        part: &ChipInstance,
        signals: &mut SignalTable,
    ) -> Result<(), HdlError> {
        let chip_def = self
            .store
            .lookup(&part.chip_name)?
            .ok_or_else(|| HdlError::UnknownChip(part.chip_name.clone()))?;

        let mut part_inputs = SignalTable::new();
        for connection in &part.connections {
            let is_input = chip_def.is_input(&connection.pin);
            let is_output = chip_def.is_output(&connection.pin);
            if self.mode == EvalMode::Strict && !is_input && !is_output {
                return Err(HdlError::NoSuchPin {
                    chip: chip_def.name().to_string(),
                    pin: connection.pin.clone(),
                });
            }
            if !is_input {
                continue;
            }
            let value = match signals.get(&connection.signal).copied() {
                Some(value) => value,
                // A declared input of the enclosing chip that the caller
                // left out reads as 0 in both modes.
                None if self.mode == EvalMode::Strict && !enclosing.is_input(&connection.signal) => {
                    return Err(HdlError::UnboundSignal {
                        chip: enclosing.name().to_string(),
                        signal: connection.signal.clone(),
                    });
                }
                None => 0,
            };
            part_inputs.insert(connection.pin.clone(), value);
        }

        let part_outputs = self.simulate(&part.chip_name, &part_inputs)?;

        for connection in &part.connections {
            if chip_def.is_output(&connection.pin) {
                let value = part_outputs.get(&connection.pin).copied().unwrap_or(0);
                signals.insert(connection.signal.clone(), value);
            }
        }

        Ok(())
    }

    /// Strict mode: topologically order the parts so that every signal
    /// is produced before it is read. Signals that are inputs of the
    /// enclosing chip are bound before any part runs and contribute no
    /// edges.
    fn part_order(&mut self, chip: &Chip) -> Result<Vec<usize>, HdlError> {
        let mut defs: Vec<Arc<Chip>> = vec![];
        for part in chip.parts() {
            let def = self
                .store
                .lookup(&part.chip_name)?
                .ok_or_else(|| HdlError::UnknownChip(part.chip_name.clone()))?;
            defs.push(def);
        }

        let mut producers: BTreeMap<&str, usize> = BTreeMap::new();
        for (index, part) in chip.parts().iter().enumerate() {
            for connection in &part.connections {
                if defs[index].is_output(&connection.pin) {
                    producers.insert(&connection.signal, index);
                }
            }
        }

        let mut depends = Depends::new();
        for (index, part) in chip.parts().iter().enumerate() {
            depends.add(index);
            for connection in &part.connections {
                if !defs[index].is_input(&connection.pin) || chip.is_input(&connection.signal) {
                    continue;
                }
                if let Some(&producer) = producers.get(connection.signal.as_str()) {
                    depends.add_dependency(producer, index);
                }
            }
        }

        depends.sort().map_err(|cycle| HdlError::CombLoop {
            chip: chip.name().to_string(),
            parts: cycle
                .0
                .into_iter()
                .map(|index| chip.parts()[index].instance_name.clone())
                .collect(),
        })
    }
}

/// Truth functions for the four primitives, keyed by chip name. The
/// names must match the store's built-in registry exactly. Inputs
/// missing from the map read as 0.
fn primitive(name: &str, inputs: &SignalTable) -> Result<SignalTable, HdlError> {
    let read = |pin: &str| inputs.get(pin).copied().unwrap_or(0);
    let out = match name {
        "Nand" => {
            if read("a") == 1 && read("b") == 1 {
                0
            } else {
                1
            }
        }
        "And" => {
            if read("a") == 1 && read("b") == 1 {
                1
            } else {
                0
            }
        }
        "Or" => {
            if read("a") == 1 || read("b") == 1 {
                1
            } else {
                0
            }
        }
        "Not" => {
            if read("in") == 0 {
                1
            } else {
                0
            }
        }
        _ => return Err(HdlError::NoPrimitive(name.to_string())),
    };
    Ok(SignalTable::from([("out".to_string(), out)]))
}
