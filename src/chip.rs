pub type Name = String;

/// A single signal value. Only 0 and 1 are meaningful; the gates treat
/// anything other than 1 as 0.
pub type Bit = u8;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    Input,
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "IN"),
            Direction::Output => write!(f, "OUT"),
        }
    }
}

/// A named terminal on a chip's interface.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Pin {
    pub name: Name,
    pub direction: Direction,
}

impl Pin {
    pub fn input(name: &str) -> Pin {
        Pin {
            name: name.to_string(),
            direction: Direction::Input,
        }
    }

    pub fn output(name: &str) -> Pin {
        Pin {
            name: name.to_string(),
            direction: Direction::Output,
        }
    }
}

/// A binding between a pin local to an instantiated chip and a signal
/// name in the enclosing chip's signal table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Connection {
    /// Pin name on the instantiated chip.
    pub pin: Name,
    /// Signal name in the enclosing chip.
    pub signal: Name,
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.pin, self.signal)
    }
}

/// One use of a chip inside another chip's PARTS section.
///
/// The instance name defaults to the chip name when the source does not
/// give one. It is kept for listings and error messages only; evaluation
/// is driven entirely by the chip name and the connections.
#[derive(Debug, Clone)]
pub struct ChipInstance {
    pub chip_name: Name,
    pub instance_name: Name,
    pub connections: Vec<Connection>,
}

/// A chip definition: a name, ordered input and output pin names, and
/// either primitive logic (built-in) or a wiring of sub-chip instances.
///
/// Chips are constructed once (by the parser, or at store initialization
/// for the built-ins) and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Chip {
    name: Name,
    inputs: Vec<Name>,
    outputs: Vec<Name>,
    parts: Vec<ChipInstance>,
    builtin: bool,
}

impl Chip {
    pub fn new(name: Name, inputs: Vec<Name>, outputs: Vec<Name>, parts: Vec<ChipInstance>) -> Chip {
        Chip {
            name,
            inputs,
            outputs,
            parts,
            builtin: false,
        }
    }

    /// A built-in primitive. Its behavior comes from the simulator's
    /// dispatch table, keyed by the chip name; it has no parts.
    pub fn builtin(name: &str, pins: &[Pin]) -> Chip {
        let inputs = pins
            .iter()
            .filter(|pin| pin.direction == Direction::Input)
            .map(|pin| pin.name.clone())
            .collect();
        let outputs = pins
            .iter()
            .filter(|pin| pin.direction == Direction::Output)
            .map(|pin| pin.name.clone())
            .collect();
        Chip {
            name: name.to_string(),
            inputs,
            outputs,
            parts: vec![],
            builtin: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Name] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Name] {
        &self.outputs
    }

    pub fn parts(&self) -> &[ChipInstance] {
        &self.parts
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub fn is_input(&self, pin: &str) -> bool {
        self.inputs.iter().any(|name| name == pin)
    }

    pub fn is_output(&self, pin: &str) -> bool {
        self.outputs.iter().any(|name| name == pin)
    }

    /// The chip's interface as a flat pin list, inputs first.
    pub fn pins(&self) -> Vec<Pin> {
        let mut pins = vec![];
        for name in &self.inputs {
            pins.push(Pin::input(name));
        }
        for name in &self.outputs {
            pins.push(Pin::output(name));
        }
        pins
    }
}
