use std::path::Path;

use log::info;
use serde_json::json;

use crate::chip::{Bit, Name};
use crate::error::HdlError;
use crate::sim::{Sim, SignalTable};

/// One row of a test-vector file: input values and the outputs they are
/// expected to produce, positionally matched against the header names.
#[derive(Debug, Clone)]
pub struct TestVector {
    pub line: usize,
    pub inputs: SignalTable,
    pub expected: SignalTable,
}

#[derive(Debug, Clone)]
pub struct Mismatch {
    pub output: Name,
    pub expected: Bit,
    pub actual: Bit,
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub line: usize,
    pub inputs: SignalTable,
    pub expected: SignalTable,
    pub actual: Option<SignalTable>,
    pub mismatches: Vec<Mismatch>,
    pub error: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone)]
pub struct TestReport {
    pub chip: Name,
    pub passed: usize,
    pub failed: usize,
    pub cases: Vec<CaseResult>,
}

/// Read a test-vector file.
///
/// The first line is `<input names>;<output names>`, both comma
/// separated; every following non-blank line is `<input values>;<expected
/// output values>` matched by position. Count mismatches and non-numeric
/// values are fatal for the file.
pub fn read_vectors<P: AsRef<Path>>(path: P) -> Result<Vec<TestVector>, HdlError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|err| HdlError::Io(path.to_owned(), err.to_string()))?;
    parse_vectors(&text)
}

pub fn parse_vectors(text: &str) -> Result<Vec<TestVector>, HdlError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < 2 {
        return Err(HdlError::VectorFormat {
            line: 1,
            message: "test file must have a header and at least one test case".to_string(),
        });
    }

    let header: Vec<&str> = lines[0].split(';').collect();
    if header.len() != 2 {
        return Err(HdlError::VectorFormat {
            line: 1,
            message: "header must be in the format 'inputs; outputs'".to_string(),
        });
    }
    let input_names: Vec<&str> = header[0].split(',').map(str::trim).collect();
    let output_names: Vec<&str> = header[1].split(',').map(str::trim).collect();

    let mut vectors = vec![];
    for (index, raw) in lines.iter().enumerate().skip(1) {
        let line = index + 1;
        let row = raw.trim();
        if row.is_empty() {
            continue;
        }

        let parts: Vec<&str> = row.split(';').collect();
        if parts.len() != 2 {
            return Err(HdlError::VectorFormat {
                line,
                message: format!("expected 'inputs; outputs', got {row:?}"),
            });
        }

        let input_values = parse_bits(parts[0], line)?;
        if input_values.len() != input_names.len() {
            return Err(HdlError::VectorFormat {
                line,
                message: format!(
                    "expected {} input value(s), got {}",
                    input_names.len(),
                    input_values.len()
                ),
            });
        }
        let expected_values = parse_bits(parts[1], line)?;
        if expected_values.len() != output_names.len() {
            return Err(HdlError::VectorFormat {
                line,
                message: format!(
                    "expected {} output value(s), got {}",
                    output_names.len(),
                    expected_values.len()
                ),
            });
        }

        vectors.push(TestVector {
            line,
            inputs: zip_signals(&input_names, &input_values),
            expected: zip_signals(&output_names, &expected_values),
        });
    }

    Ok(vectors)
}

fn parse_bits(text: &str, line: usize) -> Result<Vec<Bit>, HdlError> {
    text.split(',')
        .map(|value| {
            value.trim().parse::<Bit>().map_err(|_| HdlError::VectorFormat {
                line,
                message: format!("invalid bit value {:?}", value.trim()),
            })
        })
        .collect()
}

fn zip_signals(names: &[&str], values: &[Bit]) -> SignalTable {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

/// Run a chip against vectors from a file.
pub fn run_file<P: AsRef<Path>>(sim: &mut Sim, chip: &str, path: P) -> Result<TestReport, HdlError> {
    let vectors = read_vectors(path)?;
    Ok(run_vectors(sim, chip, &vectors))
}

/// Run every vector through the simulator. A simulate error fails that
/// case and is recorded on it; the remaining vectors still run.
pub fn run_vectors(sim: &mut Sim, chip: &str, vectors: &[TestVector]) -> TestReport {
    let mut cases = vec![];
    let mut passed = 0;
    let mut failed = 0;

    for vector in vectors {
        let case = run_case(sim, chip, vector);
        if case.passed {
            passed += 1;
        } else {
            failed += 1;
        }
        cases.push(case);
    }

    info!("{chip}: {passed} passed, {failed} failed");
    TestReport {
        chip: chip.to_string(),
        passed,
        failed,
        cases,
    }
}

fn run_case(sim: &mut Sim, chip: &str, vector: &TestVector) -> CaseResult {
    match sim.simulate(chip, &vector.inputs) {
        Ok(actual) => {
            let mut mismatches = vec![];
            for (output, expected) in &vector.expected {
                let value = actual.get(output).copied().unwrap_or(0);
                if value != *expected {
                    mismatches.push(Mismatch {
                        output: output.clone(),
                        expected: *expected,
                        actual: value,
                    });
                }
            }
            CaseResult {
                line: vector.line,
                inputs: vector.inputs.clone(),
                expected: vector.expected.clone(),
                actual: Some(actual),
                passed: mismatches.is_empty(),
                mismatches,
                error: None,
            }
        }
        Err(err) => CaseResult {
            line: vector.line,
            inputs: vector.inputs.clone(),
            expected: vector.expected.clone(),
            actual: None,
            mismatches: vec![],
            error: Some(err.to_string()),
            passed: false,
        },
    }
}

impl TestReport {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn success_rate(&self) -> f64 {
        if self.cases.is_empty() {
            return 100.0;
        }
        self.passed as f64 / self.cases.len() as f64 * 100.0
    }

    pub fn print(&self) {
        println!("\n=== Test Report for {} ===", self.chip);
        println!("Total Tests: {}", self.total());
        println!("Passed: {}", self.passed);
        println!("Failed: {}", self.failed);
        println!("Success Rate: {:.1}%", self.success_rate());

        if self.failed > 0 {
            println!("\n=== Failed Tests ===");
            for case in self.cases.iter().filter(|case| !case.passed) {
                println!("\nTest Case (Line {}):", case.line);
                println!("  Inputs: {}", format_signals(&case.inputs));
                println!("  Expected: {}", format_signals(&case.expected));
                if let Some(error) = &case.error {
                    println!("  Error: {error}");
                } else if let Some(actual) = &case.actual {
                    println!("  Actual: {}", format_signals(actual));
                    if !case.mismatches.is_empty() {
                        println!("  Mismatches:");
                        for m in &case.mismatches {
                            println!("    {}: expected {}, got {}", m.output, m.expected, m.actual);
                        }
                    }
                }
            }
        }

        println!("\n=== Summary ===");
        println!("{} out of {} tests passed", self.passed, self.total());
        if self.failed == 0 {
            println!("All tests passed!");
        } else {
            println!("{} test(s) failed", self.failed);
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "chip": self.chip,
            "total": self.total(),
            "passed": self.passed,
            "failed": self.failed,
            "success_rate": self.success_rate(),
            "cases": self.cases.iter().map(|case| {
                json!({
                    "line": case.line,
                    "inputs": case.inputs,
                    "expected": case.expected,
                    "actual": case.actual,
                    "mismatches": case.mismatches.iter().map(|m| {
                        json!({ "output": m.output, "expected": m.expected, "actual": m.actual })
                    }).collect::<Vec<_>>(),
                    "error": case.error,
                    "passed": case.passed,
                })
            }).collect::<Vec<_>>(),
        })
    }
}

fn format_signals(signals: &SignalTable) -> String {
    signals
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
