use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use log::warn;

use crate::chip::{Chip, Name, Pin};
use crate::error::HdlError;
use crate::parse::{self, ParseOptions};

/// File extension for chip sources resolved on demand.
pub const CHIP_FILE_EXT: &str = "hdl";

lazy_static! {
    /// The four primitive chips. The names here key the simulator's
    /// dispatch table; the two must stay in sync.
    static ref BUILTINS: Vec<Chip> = vec![
        Chip::builtin("Nand", &[Pin::input("a"), Pin::input("b"), Pin::output("out")]),
        Chip::builtin("Not", &[Pin::input("in"), Pin::output("out")]),
        Chip::builtin("And", &[Pin::input("a"), Pin::input("b"), Pin::output("out")]),
        Chip::builtin("Or", &[Pin::input("a"), Pin::input("b"), Pin::output("out")]),
    ];
}

/// The single source of truth mapping chip name to definition.
///
/// A store starts with the four built-ins registered and grows as chips
/// are parsed, either explicitly or on demand when [`ChipStore::lookup`]
/// finds a conventionally-named source file under the chips directory.
/// Registration is insert-or-overwrite; the last definition for a name
/// wins.
#[derive(Debug, Clone)]
pub struct ChipStore {
    chips: BTreeMap<Name, Arc<Chip>>,
    chips_dir: PathBuf,
    options: ParseOptions,
}

impl ChipStore {
    pub fn new() -> ChipStore {
        ChipStore::with_chips_dir("chips")
    }

    pub fn with_chips_dir<P: AsRef<Path>>(chips_dir: P) -> ChipStore {
        let mut chips = BTreeMap::new();
        for chip in BUILTINS.iter() {
            chips.insert(chip.name().to_string(), Arc::new(chip.clone()));
        }
        ChipStore {
            chips,
            chips_dir: chips_dir.as_ref().to_owned(),
            options: ParseOptions::default(),
        }
    }

    /// Parse options used for on-demand file parsing in [`ChipStore::lookup`].
    pub fn set_parse_options(&mut self, options: ParseOptions) {
        self.options = options;
    }

    pub fn register(&mut self, chip: Chip) -> Arc<Chip> {
        if self.chips.contains_key(chip.name()) {
            warn!("redefining chip {}", chip.name());
        }
        let chip = Arc::new(chip);
        self.chips.insert(chip.name().to_string(), chip.clone());
        chip
    }

    /// Look up a chip by name, parsing `<chips_dir>/<name>.hdl` if the
    /// name is not yet registered. A missing file is `Ok(None)`; a file
    /// that exists but cannot be read or parsed is an error.
    pub fn lookup(&mut self, name: &str) -> Result<Option<Arc<Chip>>, HdlError> {
        if let Some(chip) = self.chips.get(name) {
            return Ok(Some(chip.clone()));
        }
        let path = self.chip_file(name);
        if !path.is_file() {
            return Ok(None);
        }
        let options = self.options;
        let chip = parse::parse_file_with(self, &path, options)?;
        Ok(Some(chip))
    }

    /// The registered chip for a name, without touching the filesystem.
    pub fn get(&self, name: &str) -> Option<Arc<Chip>> {
        self.chips.get(name).cloned()
    }

    /// Whether the name is one of the four fixed primitives. This keeps
    /// answering from the fixed identifier set even if a user chip has
    /// since been registered under the same name.
    pub fn is_builtin(&self, name: &str) -> bool {
        BUILTINS.iter().any(|chip| chip.name() == name)
    }

    pub fn builtin_names() -> Vec<Name> {
        BUILTINS.iter().map(|chip| chip.name().to_string()).collect()
    }

    pub fn chips_dir(&self) -> &Path {
        &self.chips_dir
    }

    pub fn chip_file(&self, name: &str) -> PathBuf {
        self.chips_dir.join(format!("{name}.{CHIP_FILE_EXT}"))
    }

    /// All registered chip names, sorted.
    pub fn chip_names(&self) -> Vec<Name> {
        self.chips.keys().cloned().collect()
    }
}

impl Default for ChipStore {
    fn default() -> ChipStore {
        ChipStore::new()
    }
}
