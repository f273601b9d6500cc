use chipsim::testbench::{self, TestReport};
use chipsim::{ChipStore, EvalMode, ParseOptions, Sim};

use clap::{CommandFactory, Parser};

use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name of the chip to test.
    chip: Option<String>,

    /// Path to the test-vector file.
    test_file: Option<PathBuf>,

    /// List all available chips.
    #[arg(long)]
    list_chips: bool,

    /// Run tests for every chip with a conventionally-named test file.
    #[arg(long)]
    test_all: bool,

    /// Directory searched for <name>.hdl chip sources.
    #[arg(long, default_value = "chips")]
    chips_dir: PathBuf,

    /// Directory searched for <name>_test.tst vector files.
    #[arg(long, default_value = "tests")]
    tests_dir: PathBuf,

    /// Reject malformed part lines and evaluate parts in dependency
    /// order, failing on unbound signals, unknown pins, and loops.
    #[arg(long)]
    strict: bool,

    /// Print test reports as JSON.
    #[arg(long)]
    json: bool,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut store = ChipStore::with_chips_dir(&args.chips_dir);
    store.set_parse_options(ParseOptions { strict: args.strict });
    let mode = if args.strict { EvalMode::Strict } else { EvalMode::Declaration };

    if args.list_chips {
        list_chips(&store)?;
    } else if args.test_all {
        test_all(store, mode, &args)?;
    } else if let (Some(chip), Some(test_file)) = (&args.chip, &args.test_file) {
        let mut sim = Sim::with_mode(store, mode);
        println!("Testing {} with {}...", chip, test_file.display());
        let report = testbench::run_file(&mut sim, chip, test_file)?;
        emit_report(&report, args.json);
    } else {
        Args::command().print_help()?;
        std::process::exit(1);
    }

    Ok(())
}

fn list_chips(store: &ChipStore) -> anyhow::Result<()> {
    println!("Available chips:");
    println!("\nBuilt-in chips:");
    for name in ChipStore::builtin_names() {
        match store.get(&name) {
            Some(chip) => println!("  - {name} ({})", format_interface(&chip)),
            None => println!("  - {name}"),
        }
    }

    let hdl_files = discover_chips(store.chips_dir());
    if !store.chips_dir().is_dir() {
        println!("\nNo {} directory found", store.chips_dir().display());
    } else if hdl_files.is_empty() {
        println!("\nNo chip files found in {}", store.chips_dir().display());
    } else {
        println!("\nChips from files:");
        for name in hdl_files {
            println!("  - {name}");
        }
    }
    Ok(())
}

fn format_interface(chip: &chipsim::Chip) -> String {
    format!("{} -> {}", chip.inputs().join(", "), chip.outputs().join(", "))
}

/// Names of the `.hdl` files in the chips directory, sorted.
fn discover_chips(chips_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(chips_dir) else {
        return vec![];
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext == "hdl").unwrap_or(false))
        .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

/// Run every built-in chip, then every discovered chip, against its
/// conventionally-named vector file. Errors for one chip are printed
/// and the batch moves on.
fn test_all(store: ChipStore, mode: EvalMode, args: &Args) -> anyhow::Result<()> {
    println!("Running tests for all available chips...");

    let mut chips = ChipStore::builtin_names();
    chips.extend(discover_chips(store.chips_dir()));

    let mut sim = Sim::with_mode(store, mode);
    let mut reports: Vec<TestReport> = vec![];

    for chip in &chips {
        let test_file = args.tests_dir.join(format!("{}_test.tst", chip.to_lowercase()));
        if !test_file.is_file() {
            continue;
        }
        println!("\nTesting {chip}...");
        match testbench::run_file(&mut sim, chip, &test_file) {
            Ok(report) => {
                emit_report(&report, args.json);
                reports.push(report);
            }
            Err(err) => println!("Error testing {chip}: {err}"),
        }
    }

    let total: usize = reports.iter().map(|report| report.total()).sum();
    if total > 0 {
        let passed: usize = reports.iter().map(|report| report.passed).sum();
        let failed: usize = reports.iter().map(|report| report.failed).sum();

        println!("\n=== Overall Summary ===");
        println!("Total Tests: {total}");
        println!("Passed: {passed}");
        println!("Failed: {failed}");
        println!("Success Rate: {:.1}%", passed as f64 / total as f64 * 100.0);
    }
    Ok(())
}

fn emit_report(report: &TestReport, json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json()).unwrap_or_default());
    } else {
        report.print();
    }
}

fn init_logging(verbose: bool) {
    use chrono::{DateTime, Utc};

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            let now: DateTime<Utc> = Utc::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                now.format("%Y-%m-%dT%H:%M:%S%.fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .expect("logging already initialized");
}
