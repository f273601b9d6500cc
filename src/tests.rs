use super::*;
use crate::testbench;

use std::path::PathBuf;

/// A store that cannot resolve anything from disk, so tests only see
/// what they register themselves.
fn empty_store() -> ChipStore {
    ChipStore::with_chips_dir("no-such-dir")
}

fn sim() -> Sim {
    Sim::new(empty_store())
}

fn strict_sim() -> Sim {
    Sim::with_mode(empty_store(), EvalMode::Strict)
}

fn signals(pairs: &[(&str, Bit)]) -> SignalTable {
    pairs.iter().map(|(name, value)| (name.to_string(), *value)).collect()
}

#[test]
fn builtins_are_registered() {
    let mut store = empty_store();
    for name in ["Nand", "Not", "And", "Or"] {
        let chip = store.lookup(name).unwrap().expect(name);
        assert!(chip.is_builtin());
        assert!(store.is_builtin(name));
        assert_eq!(chip.outputs(), &["out".to_string()]);
    }
    assert!(!store.is_builtin("Xor"));

    let nand = store.lookup("Nand").unwrap().unwrap();
    assert_eq!(nand.inputs(), &["a".to_string(), "b".to_string()]);
    assert_eq!(nand.pins().len(), 3);
}

#[test]
fn every_builtin_has_primitive_logic() {
    let mut sim = sim();
    for name in ChipStore::builtin_names() {
        // A drifted dispatch table would surface here as NoPrimitive.
        sim.simulate(&name, &SignalTable::new()).unwrap();
    }
}

#[test]
fn primitive_truth_tables() {
    let mut sim = sim();
    for (a, b, and, or, nand) in [
        (0, 0, 0, 0, 1),
        (0, 1, 0, 1, 1),
        (1, 0, 0, 1, 1),
        (1, 1, 1, 1, 0),
    ] {
        let inputs = signals(&[("a", a), ("b", b)]);
        assert_eq!(sim.simulate("And", &inputs).unwrap()["out"], and);
        assert_eq!(sim.simulate("Or", &inputs).unwrap()["out"], or);
        assert_eq!(sim.simulate("Nand", &inputs).unwrap()["out"], nand);
    }
    assert_eq!(sim.simulate("Not", &signals(&[("in", 0)])).unwrap()["out"], 1);
    assert_eq!(sim.simulate("Not", &signals(&[("in", 1)])).unwrap()["out"], 0);
}

#[test]
fn de_morgan_consistency() {
    let mut sim = sim();
    for a in [0, 1] {
        for b in [0, 1] {
            let inputs = signals(&[("a", a), ("b", b)]);
            let and = sim.simulate("And", &inputs).unwrap()["out"];
            let nand = sim.simulate("Nand", &inputs).unwrap()["out"];
            assert_eq!(nand, 1 - and);

            // OR(a,b) == NOT(AND(NOT(a), NOT(b))) under this engine's own gates.
            let nota = sim.simulate("Not", &signals(&[("in", a)])).unwrap()["out"];
            let notb = sim.simulate("Not", &signals(&[("in", b)])).unwrap()["out"];
            let inner = sim.simulate("And", &signals(&[("a", nota), ("b", notb)])).unwrap()["out"];
            let with_de_morgan = sim.simulate("Not", &signals(&[("in", inner)])).unwrap()["out"];
            assert_eq!(sim.simulate("Or", &inputs).unwrap()["out"], with_de_morgan);
        }
    }
}

#[test]
fn missing_inputs_read_as_zero() {
    let mut sim = sim();
    assert_eq!(sim.simulate("And", &signals(&[("a", 1)])).unwrap()["out"], 0);
    assert_eq!(sim.simulate("Not", &SignalTable::new()).unwrap()["out"], 1);
}

#[test]
fn parse_simple_chip() {
    let mut store = empty_store();
    let chip = parse(&mut store, "
        CHIP TestChip {
            IN a, b;
            OUT out;

            PARTS:
            And(a=a, b=b, out=temp);
            Not(in=temp, out=out);
        }
    ").unwrap();

    assert_eq!(chip.name(), "TestChip");
    assert_eq!(chip.inputs(), &["a".to_string(), "b".to_string()]);
    assert_eq!(chip.outputs(), &["out".to_string()]);
    assert_eq!(chip.parts().len(), 2);
    assert!(!chip.is_builtin());

    let and = &chip.parts()[0];
    assert_eq!(and.chip_name, "And");
    assert_eq!(and.instance_name, "And");
    assert_eq!(and.connections.len(), 3);
    assert_eq!(and.connections[2], Connection { pin: "out".to_string(), signal: "temp".to_string() });

    // The parse registered the chip into the store.
    assert!(store.lookup("TestChip").unwrap().is_some());
}

#[test]
fn parse_strips_comments() {
    let mut store = empty_store();
    let chip = parse(&mut store, "
        /**
         * Exclusive-or, the long way.
         */
        CHIP Commented {
            IN a;
            OUT out;

            PARTS:
            Not(in=a, out=out);
        }
    ").unwrap();
    assert_eq!(chip.name(), "Commented");
    assert_eq!(chip.parts().len(), 1);
}

#[test]
fn bad_chip_header_is_an_error() {
    let mut store = empty_store();
    assert!(matches!(parse(&mut store, "WIDGET Foo {"), Err(HdlError::ChipHeader(_))));
    assert!(matches!(parse(&mut store, ""), Err(HdlError::ChipHeader(_))));
}

#[test]
fn missing_pin_sections_mean_empty_lists() {
    let mut store = empty_store();
    let chip = parse(&mut store, "CHIP Bare {\n}\n").unwrap();
    assert!(chip.inputs().is_empty());
    assert!(chip.outputs().is_empty());
    assert!(chip.parts().is_empty());
}

#[test]
fn malformed_part_lines_drop_or_reject_by_policy() {
    let text = "
        CHIP Sloppy {
            IN a;
            OUT out;

            PARTS:
            this is not a part
            Not(in=a, out=out);
        }
    ";

    let mut store = empty_store();
    let chip = parse(&mut store, text).unwrap();
    assert_eq!(chip.parts().len(), 1);

    let result = parse_with(&mut store, text, ParseOptions { strict: true });
    assert!(matches!(result, Err(HdlError::PartSyntax(_))));
}

#[test]
fn nand_built_from_and_and_not() {
    let mut sim = sim();
    parse(sim_store(&mut sim), "
        CHIP MyNand {
            IN a, b;
            OUT out;

            PARTS:
            And(a=a, b=b, out=temp);
            Not(in=temp, out=out);
        }
    ").unwrap();

    for (a, b, expected) in [(0, 0, 1), (0, 1, 1), (1, 0, 1), (1, 1, 0)] {
        let outputs = sim.simulate("MyNand", &signals(&[("a", a), ("b", b)])).unwrap();
        assert_eq!(outputs["out"], expected, "MyNand({a}, {b})");
    }
}

#[test]
fn xor_built_from_five_parts() {
    let mut sim = sim();
    parse(sim_store(&mut sim), "
        CHIP Xor {
            IN a, b;
            OUT out;

            PARTS:
            Not(in=a, out=nota);
            Not(in=b, out=notb);
            And(a=a, b=notb, out=w1);
            And(a=nota, b=b, out=w2);
            Or(a=w1, b=w2, out=out);
        }
    ").unwrap();

    for (a, b, expected) in [(0, 0, 0), (0, 1, 1), (1, 0, 1), (1, 1, 0)] {
        let outputs = sim.simulate("Xor", &signals(&[("a", a), ("b", b)])).unwrap();
        assert_eq!(outputs["out"], expected, "Xor({a}, {b})");
    }
}

#[test]
fn multi_output_chip_with_internal_signals() {
    let mut sim = sim();
    parse(sim_store(&mut sim), "
        CHIP ComplexChip {
            IN a, b, c;
            OUT out1, out2;

            PARTS:
            And(a=a, b=b, out=temp1);
            Or(a=temp1, b=c, out=out1);
            Not(in=a, out=out2);
        }
    ").unwrap();

    let outputs = sim
        .simulate("ComplexChip", &signals(&[("a", 1), ("b", 0), ("c", 1)]))
        .unwrap();
    assert_eq!(outputs["out1"], 1);
    assert_eq!(outputs["out2"], 0);
}

#[test]
fn parsing_and_simulating_is_deterministic() {
    let text = "
        CHIP Twice {
            IN a, b;
            OUT out;

            PARTS:
            And(a=a, b=b, out=temp);
            Not(in=temp, out=out);
        }
    ";
    let inputs = signals(&[("a", 1), ("b", 1)]);

    let mut sim = sim();
    parse(sim_store(&mut sim), text).unwrap();
    let first = sim.simulate("Twice", &inputs).unwrap();

    // Re-parsing replaces the definition (last write wins) and changes
    // nothing observable.
    parse(sim_store(&mut sim), text).unwrap();
    let second = sim.simulate("Twice", &inputs).unwrap();
    let third = sim.simulate("Twice", &inputs).unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn nested_chips_reusing_a_signal_name_do_not_interfere() {
    let mut sim = sim();
    // Inner uses `temp` internally to build a NAND.
    parse(sim_store(&mut sim), "
        CHIP Inner {
            IN a, b;
            OUT out;

            PARTS:
            And(a=a, b=b, out=temp);
            Not(in=temp, out=out);
        }
    ").unwrap();
    // Outer also names its own internal signal `temp`.
    parse(sim_store(&mut sim), "
        CHIP Outer {
            IN a, b;
            OUT out;

            PARTS:
            Inner(a=a, b=b, out=temp);
            Not(in=temp, out=out);
        }
    ").unwrap();

    // Outer == NOT(NAND) == AND, for every combination.
    for (a, b, expected) in [(0, 0, 0), (0, 1, 0), (1, 0, 0), (1, 1, 1)] {
        let outputs = sim.simulate("Outer", &signals(&[("a", a), ("b", b)])).unwrap();
        assert_eq!(outputs["out"], expected, "Outer({a}, {b})");
    }
}

#[test]
fn unknown_chip_is_an_error() {
    let mut sim = sim();
    let result = sim.simulate("Imaginary", &SignalTable::new());
    assert!(matches!(result, Err(HdlError::UnknownChip(name)) if name == "Imaginary"));

    // The same failure through a part reference.
    parse(sim_store(&mut sim), "
        CHIP UsesMissing {
            IN a;
            OUT out;

            PARTS:
            Missing(in=a, out=out);
        }
    ").unwrap();
    let result = sim.simulate("UsesMissing", &signals(&[("a", 1)]));
    assert!(matches!(result, Err(HdlError::UnknownChip(name)) if name == "Missing"));
}

#[test]
fn chip_with_no_parts_outputs_zeros() {
    let mut sim = sim();
    parse(sim_store(&mut sim), "
        CHIP Hollow {
            IN a, b;
            OUT out1, out2;
        }
    ").unwrap();

    let outputs = sim.simulate("Hollow", &signals(&[("a", 1), ("b", 1)])).unwrap();
    assert_eq!(outputs, signals(&[("out1", 0), ("out2", 0)]));
}

#[test]
fn chips_load_on_demand_from_files() {
    let chips_dir: PathBuf = [env!("CARGO_MANIFEST_DIR"), "chips"].iter().collect();
    let mut sim = Sim::new(ChipStore::with_chips_dir(chips_dir));

    for (a, b, expected) in [(0, 0, 0), (0, 1, 1), (1, 0, 1), (1, 1, 0)] {
        let outputs = sim.simulate("Xor", &signals(&[("a", a), ("b", b)])).unwrap();
        assert_eq!(outputs["out"], expected, "Xor({a}, {b})");
    }

    for (a, b, sel, expected) in [(0, 1, 0, 0), (0, 1, 1, 1), (1, 0, 0, 1), (1, 0, 1, 0)] {
        let outputs = sim
            .simulate("Mux", &signals(&[("a", a), ("b", b), ("sel", sel)]))
            .unwrap();
        assert_eq!(outputs["out"], expected, "Mux({a}, {b}, sel={sel})");
    }
}

#[test]
fn registering_over_a_builtin_name_wins_but_stays_flagged_builtin() {
    let mut store = empty_store();
    parse(&mut store, "
        CHIP And {
            IN a, b;
            OUT out;

            PARTS:
            Or(a=a, b=b, out=out);
        }
    ").unwrap();

    // Lookup sees the user chip; the fixed identifier set still claims
    // the name.
    let chip = store.lookup("And").unwrap().unwrap();
    assert!(!chip.is_builtin());
    assert!(store.is_builtin("And"));
}

#[test]
fn strict_mode_reorders_misdeclared_parts() {
    let text = "
        CHIP Backwards {
            IN a, b;
            OUT out;

            PARTS:
            Not(in=temp, out=out);
            And(a=a, b=b, out=temp);
        }
    ";
    let inputs = signals(&[("a", 1), ("b", 1)]);

    // Declaration order replays the author's mistake: Not reads temp
    // before And produces it, so it sees 0 and out is stuck at 1.
    let mut lenient = sim();
    parse(sim_store(&mut lenient), text).unwrap();
    assert_eq!(lenient.simulate("Backwards", &inputs).unwrap()["out"], 1);

    // Strict mode runs And first and computes NOT(AND(1,1)) = 0.
    let mut strict = strict_sim();
    parse(sim_store(&mut strict), text).unwrap();
    assert_eq!(strict.simulate("Backwards", &inputs).unwrap()["out"], 0);
}

#[test]
fn strict_mode_detects_combinational_loops() {
    let text = "
        CHIP Loopy {
            IN a;
            OUT out;

            PARTS:
            And(a=x, b=a, out=y);
            And(a=y, b=a, out=x);
            Or(a=x, b=y, out=out);
        }
    ";

    let mut strict = strict_sim();
    parse(sim_store(&mut strict), text).unwrap();
    let result = strict.simulate("Loopy", &signals(&[("a", 1)]));
    assert!(matches!(result, Err(HdlError::CombLoop { ref chip, .. }) if chip == "Loopy"));

    // Declaration order happily evaluates it with zero defaults.
    let mut lenient = sim();
    parse(sim_store(&mut lenient), text).unwrap();
    lenient.simulate("Loopy", &signals(&[("a", 1)])).unwrap();
}

#[test]
fn strict_mode_rejects_unbound_signals() {
    let text = "
        CHIP Ghostly {
            IN a;
            OUT out;

            PARTS:
            Not(in=ghost, out=out);
        }
    ";

    let mut strict = strict_sim();
    parse(sim_store(&mut strict), text).unwrap();
    let result = strict.simulate("Ghostly", &signals(&[("a", 1)]));
    assert!(matches!(result, Err(HdlError::UnboundSignal { ref signal, .. }) if signal == "ghost"));

    // An omitted chip input is not an unbound signal; it defaults to 0.
    let result = strict.simulate("Ghostly", &SignalTable::new());
    assert!(result.is_err());
    let mut strict_ok = strict_sim();
    parse(sim_store(&mut strict_ok), "
        CHIP PassThrough {
            IN a;
            OUT out;

            PARTS:
            Not(in=a, out=out);
        }
    ").unwrap();
    assert_eq!(strict_ok.simulate("PassThrough", &SignalTable::new()).unwrap()["out"], 1);
}

#[test]
fn strict_mode_rejects_unknown_pins() {
    let text = "
        CHIP Miswired {
            IN a;
            OUT out;

            PARTS:
            Not(input=a, out=out);
        }
    ";

    // Leniently, the bogus pin is ignored and Not's input defaults to 0.
    let mut lenient = sim();
    parse(sim_store(&mut lenient), text).unwrap();
    assert_eq!(lenient.simulate("Miswired", &signals(&[("a", 1)])).unwrap()["out"], 1);

    let mut strict = strict_sim();
    parse(sim_store(&mut strict), text).unwrap();
    let result = strict.simulate("Miswired", &signals(&[("a", 1)]));
    assert!(matches!(result, Err(HdlError::NoSuchPin { ref pin, .. }) if pin == "input"));
}

#[test]
fn vectors_parse_and_run() {
    let vectors = testbench::parse_vectors("a,b; out\n0,0; 0\n0,1; 0\n1,0; 0\n1,1; 1\n").unwrap();
    assert_eq!(vectors.len(), 4);
    assert_eq!(vectors[0].line, 2);
    assert_eq!(vectors[3].inputs, signals(&[("a", 1), ("b", 1)]));
    assert_eq!(vectors[3].expected, signals(&[("out", 1)]));

    let mut sim = sim();
    let report = testbench::run_vectors(&mut sim, "And", &vectors);
    assert_eq!(report.total(), 4);
    assert_eq!(report.passed, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.success_rate(), 100.0);
}

#[test]
fn vector_mismatches_are_reported_per_output() {
    let vectors = testbench::parse_vectors("a,b; out\n1,1; 0\n").unwrap();
    let mut sim = sim();
    let report = testbench::run_vectors(&mut sim, "Or", &vectors);

    assert_eq!(report.failed, 1);
    let case = &report.cases[0];
    assert!(!case.passed);
    assert_eq!(case.mismatches.len(), 1);
    assert_eq!(case.mismatches[0].output, "out");
    assert_eq!(case.mismatches[0].expected, 0);
    assert_eq!(case.mismatches[0].actual, 1);

    let json = report.to_json();
    assert_eq!(json["chip"], "Or");
    assert_eq!(json["failed"], 1);
}

#[test]
fn vector_count_mismatch_names_the_line() {
    let result = testbench::parse_vectors("a,b; out\n0,0; 0\n0,1,1; 0\n");
    match result {
        Err(HdlError::VectorFormat { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected a vector format error, got {other:?}"),
    }
}

#[test]
fn vector_header_and_value_errors() {
    assert!(matches!(
        testbench::parse_vectors("a,b out\n0,0 0\n"),
        Err(HdlError::VectorFormat { line: 1, .. })
    ));
    assert!(matches!(
        testbench::parse_vectors("a; out\nx; 0\n"),
        Err(HdlError::VectorFormat { line: 2, .. })
    ));
    assert!(matches!(
        testbench::parse_vectors("a; out\n"),
        Err(HdlError::VectorFormat { line: 1, .. })
    ));
}

#[test]
fn simulate_errors_fail_the_case_but_not_the_run() {
    let vectors = testbench::parse_vectors("a; out\n0; 1\n1; 0\n").unwrap();
    let mut sim = sim();
    let report = testbench::run_vectors(&mut sim, "NotThere", &vectors);

    assert_eq!(report.total(), 2);
    assert_eq!(report.failed, 2);
    assert!(report.cases.iter().all(|case| case.error.is_some()));
}

/// Borrow helper: tests register chips directly into a simulator's store.
fn sim_store(sim: &mut Sim) -> &mut ChipStore {
    sim.store_mut()
}
