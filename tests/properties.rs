use aplomb::interpreter::{evaluator::core::Interpreter, value::number::format_integer};
use proptest::{prelude::*, test_runner::Config as ProptestConfig};

fn literal(values: &[i64]) -> String {
    values.iter().map(|&n| format_integer(n)).collect::<Vec<_>>().join(" ")
}

fn display(src: &str) -> String {
    let mut ip = Interpreter::new();
    let program = ip.parse(src).expect("source should parse");
    let values = ip.eval_program(&program).expect("source should evaluate");
    values.last().map(ToString::to_string).unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig {
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn reversing_twice_is_identity(values in proptest::collection::vec(-1_000i64..1_000, 1..32)) {
        let v = literal(&values);
        prop_assert_eq!(display(&format!("⌽⌽{v}")), display(&v));
    }

    #[test]
    fn plus_reduce_sums(values in proptest::collection::vec(-1_000i64..1_000, 1..32)) {
        let expected: i64 = values.iter().sum();
        prop_assert_eq!(display(&format!("+/{}", literal(&values))), format_integer(expected));
    }

    #[test]
    fn reshape_yields_the_requested_shape(
        shape in proptest::collection::vec(1i64..5, 1..4),
        values in proptest::collection::vec(0i64..100, 1..8)
    ) {
        let src = format!("⍴({})⍴{}", literal(&shape), literal(&values));
        prop_assert_eq!(display(&src), literal(&shape));
    }

    #[test]
    fn transposing_twice_is_identity(rows in 1i64..5, cols in 1i64..5) {
        let m = format!("({rows} {cols}⍴⍳{})", rows * cols);
        prop_assert_eq!(display(&format!("⍉⍉{m}")), display(&m));
    }

    #[test]
    fn take_and_drop_split_a_vector(values in proptest::collection::vec(-50i64..50, 1..16), cut in 0usize..16) {
        let n = cut.min(values.len());
        let v = literal(&values);
        prop_assert_eq!(display(&format!("({n}↑{v}),{n}↓{v}")), display(&v));
    }

    #[test]
    fn scanning_arbitrary_text_never_panics(line in "\\PC{0,24}") {
        let ip = Interpreter::new();
        let _ = ip.parse(&line);
    }
}
