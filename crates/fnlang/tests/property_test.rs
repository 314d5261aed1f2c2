use proptest::prelude::*;

use fnlang_core::Value;
use fnlang_eval::Interpreter;

fn fib_reference(n: u64) -> i64 {
    let (mut a, mut b) = (0i64, 1i64);
    for _ in 0..n {
        let next = a + b;
        a = b;
        b = next;
    }
    a
}

/// A literal leaf with no free symbols, so it evaluates to itself.
fn literal_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1000i64..1000).prop_map(|n| n.to_string()),
        "[a-zA-Z0-9 ]{0,12}".prop_map(|s| format!("\"{s}\"")),
        "[a-z][a-z0-9]{0,8}".prop_map(|s| format!(":{s}")),
        Just(":true".to_string()),
        Just(":nil".to_string()),
    ]
}

fn literal_form(depth: u32) -> impl Strategy<Value = String> {
    if depth == 0 {
        literal_leaf().boxed()
    } else {
        prop_oneof![
            literal_leaf(),
            prop::collection::vec(literal_form(depth - 1), 0..4)
                .prop_map(|items| format!("[{}]", items.join(" "))),
            prop::collection::vec(("[a-z][a-z0-9]{0,6}", literal_form(depth - 1)), 0..3)
                .prop_map(|pairs| {
                    let body: Vec<String> = pairs
                        .into_iter()
                        .map(|(k, v)| format!(":{k} {v}"))
                        .collect();
                    format!("{{{}}}", body.join(" "))
                }),
        ]
        .boxed()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn fib_matches_the_reference(n in 0u64..11) {
        let interp = Interpreter::new();
        let program = format!(
            "(defn fib [n] \
                (when (= n 0) 0 \
                      (= n 1) 1 \
                      :true (+ (fib (- n 1)) (fib (- n 2))))) \
             (fib {n})"
        );
        let values = interp.eval_str(&program).expect("eval");
        let results = values[0].as_list().expect("result list");
        prop_assert_eq!(&results[1], &Value::int(fib_reference(n)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn list_indexing_matches_the_host(
        items in prop::collection::vec(-100i64..100, 0..8),
        index in 0i64..10,
    ) {
        let literal: Vec<String> = items.iter().map(ToString::to_string).collect();
        let program = format!("([{}] {index})", literal.join(" "));
        let interp = Interpreter::new();
        let values = interp.eval_str(&program).expect("eval");
        let results = values[0].as_list().expect("result list");

        let expected = items
            .get(index as usize)
            .map(|n| Value::int(*n))
            .unwrap_or_else(Value::nil);
        prop_assert_eq!(&results[0], &expected);
    }

    #[test]
    fn assert_holds_for_every_value_against_itself(form in literal_form(2)) {
        let program = format!("(assert {form} {form})");
        let interp = Interpreter::new();
        let values = interp.eval_str(&program).expect("eval");
        let results = values[0].as_list().expect("result list");
        prop_assert_eq!(&results[0], &Value::truth(true));
    }

    #[test]
    fn sequencing_matches_individual_evaluation(
        forms in prop::collection::vec(literal_form(1), 1..4),
    ) {
        let interp = Interpreter::new();
        let combined = interp.eval_str(&forms.join(" ")).expect("eval");
        let combined = combined[0].as_list().expect("result list").to_vec();

        let mut individual = Vec::new();
        for form in &forms {
            let values = interp.eval_str(form).expect("eval");
            individual.extend(values[0].as_list().expect("result list").to_vec());
        }
        prop_assert_eq!(combined, individual);
    }
}
