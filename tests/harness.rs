use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, ensure};

use pyscry::dispatch::Engine;
use pyscry::runtime::error::RuntimeError;
use pyscry::runtime::interp::Interpreter;
use pyscry::runtime::introspect;
use test_support::{Case, CaseClass, load_cases, normalize_output};

fn run_case_program(case: &Case) -> Result<String> {
    let engine = Rc::new(Engine::new());
    let mut interpreter = Interpreter::new(engine);
    introspect::install(&mut interpreter);
    interpreter.run_path(&case.program_path)
}

fn check_success(case: &Case) -> Result<()> {
    let stdout_file = case
        .spec
        .expected
        .stdout_file
        .as_deref()
        .with_context(|| format!("Missing stdout_file in {}", case.name))?;
    let expected = case.read_text(stdout_file)?;
    let output =
        run_case_program(case).with_context(|| format!("Program failed for {}", case.name))?;
    assert_eq!(
        normalize_output(&output),
        normalize_output(&expected),
        "Output mismatch for {}",
        case.name
    );
    Ok(())
}

fn check_failure(case: &Case) -> Result<()> {
    let expected_file = case
        .spec
        .expected
        .stderr_contains_file
        .as_deref()
        .with_context(|| format!("Missing stderr expectation file in {}", case.name))?;
    let expected_error = case.read_text(expected_file)?;
    let expected_error = expected_error.trim();
    let result = run_case_program(case);
    ensure!(result.is_err(), "Expected error for {}", case.name);
    let error = result.expect_err("result checked as err");

    // A frontend case must fail before execution starts.
    if matches!(case.spec.class, CaseClass::FrontendError) {
        let runtime = error
            .downcast_ref::<RuntimeError>()
            .with_context(|| format!("Unexpected error type for {}", case.name))?;
        ensure!(
            matches!(runtime, RuntimeError::Source { .. }),
            "Expected a frontend failure for {}, got: {runtime}",
            case.name
        );
    }

    let actual = error.to_string();
    ensure!(
        actual.contains(expected_error),
        "Expected error containing '{expected_error}' in {}, got '{actual}'",
        case.name
    );
    Ok(())
}

#[test]
fn runs_fixture_programs() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;
    for case in cases {
        match case.spec.class {
            CaseClass::RuntimeSuccess => check_success(&case)?,
            CaseClass::FrontendError | CaseClass::RuntimeError => check_failure(&case)?,
        }
    }
    Ok(())
}
