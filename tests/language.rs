use std::fs::{self};

use aplomb::{
    error::{Error, RuntimeError},
    interpreter::{evaluator::core::Interpreter, value::core::Value},
    run_source,
};
use walkdir::WalkDir;

/// Runs every script under `tests/scripts`, comparing what it displays with
/// its `⍝→` lines.
#[test]
fn script_examples_work() {
    let mut count = 0;

    for entry in
        WalkDir::new("tests/scripts").into_iter()
                                     .filter_map(Result::ok)
                                     .filter(|e| e.path().extension().is_some_and(|ext| ext == "apl"))
    {
        let path = entry.path();
        let content =
            fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {path:?}: {e}"));

        count += 1;
        let displayed = run_source(&content).unwrap_or_else(|e| panic!("Script {path:?} failed:\n{e}"));
        let displayed: Vec<String> = displayed.iter().flat_map(|s| s.lines()).map(str::to_string).collect();
        assert_eq!(displayed, expected_lines(&content), "unexpected output from {path:?}");
    }

    assert!(count > 0, "No scripts found in tests/scripts");
}

fn expected_lines(content: &str) -> Vec<String> {
    content.lines()
           .filter_map(|line| line.trim_start().strip_prefix("⍝→"))
           .map(|s| s.strip_prefix(' ').unwrap_or(s).to_string())
           .collect()
}

fn eval(src: &str) -> Result<Vec<Value>, Error> {
    let mut ip = Interpreter::new();
    let program = ip.parse(src)?;
    Ok(ip.eval_program(&program)?)
}

fn display(src: &str) -> String {
    match eval(src) {
        Ok(mut values) => values.pop().map(|v| v.to_string()).unwrap_or_default(),
        Err(e) => panic!("Script failed: {e}"),
    }
}

fn assert_success(src: &str) {
    if let Err(e) = eval(src) {
        panic!("Script failed: {e}");
    }
}

fn assert_failure(src: &str) {
    if eval(src).is_ok() {
        panic!("Script succeeded but was expected to fail")
    }
}

#[test]
fn reference_results() {
    assert_eq!(display("1+1"), "2");
    assert_eq!(display("⍳5"), "1 2 3 4 5");
    assert_eq!(display("2 3⍴⍳6"), "1 2 3\n4 5 6");
    assert_eq!(display("+/1 2 3"), "6");
    assert_eq!(display("{2×⍵}3"), "6");
    assert_eq!(display("1 2 3 +.× 4 5 6"), "32");
}

#[test]
fn assignment_then_use() {
    let values = eval("X←3⋄-X").unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].to_string(), "3");
    assert_eq!(values[1].to_string(), "¯3");
}

#[test]
fn binding_runs_right_to_left() {
    assert_eq!(display("2×3+4"), "14");
    assert_eq!(display("(2×3)+4"), "10");
    assert_eq!(display("-/⍳4"), "¯2");
    assert_eq!(display("⍴⍴2 3⍴⍳6"), "2");
}

#[test]
fn operator_chains() {
    assert_eq!(display("+/+/2 3⍴⍳6"), "21");
    assert_eq!(display("(2 2⍴1 1 0 1) +.× 2 2⍴1 0 1 1"), "2 1\n1 1");
    assert_eq!(display("×/¨(1 2)(3 4)"), "2 12");
    assert_eq!(display("sum←+/ ⋄ sum ⍳10"), "55");
}

#[test]
fn names_follow_the_case_convention() {
    assert_success("f←{⍵+1} ⋄ f 1");
    assert_success("X←⍳3 ⋄ X[2]←9");
    assert_failure("f←3");
    assert_failure("X←-");
}

#[test]
fn failures_are_reported_not_panics() {
    assert!(matches!(eval("1 2+1 2 3"), Err(Error::Runtime(RuntimeError::ShapeMismatch { .. }))));
    assert!(matches!(eval("(,5)+1 2 3"), Err(Error::Runtime(RuntimeError::ShapeMismatch { .. }))));
    assert!(matches!(eval("(1 2"), Err(Error::Parse(_))));
    assert!(matches!(eval("undefinedfn 3"), Err(Error::Runtime(RuntimeError::UnknownIdentifier { .. }))));
    assert_failure("+/\"ab\" \"cd\"");
}

#[test]
fn lines_are_joined_while_a_lambda_is_open() {
    let displayed = run_source("double←{\n  2×⍵\n}\ndouble 21").unwrap();
    assert_eq!(displayed, vec!["42".to_string()]);
}
