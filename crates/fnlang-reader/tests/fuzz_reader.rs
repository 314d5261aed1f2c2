use proptest::prelude::*;

use fnlang_reader::parse;

proptest! {
    #[test]
    fn reader_never_panics(input in "\\PC*") {
        // Any arbitrary string should produce Ok or Err, never panic
        let _ = parse(&input);
    }
}

fn fn_leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1000i64..1000).prop_map(|n| n.to_string()),
        (-100.0f64..100.0).prop_map(|f| format!("{f:.2}")),
        "[a-zA-Z0-9 _]{0,20}".prop_map(|s| format!("\"{s}\"")),
        "[a-z][a-z0-9?!-]{0,10}",
        "[a-z][a-z0-9-]{0,10}".prop_map(|s| format!(":{s}")),
        Just(":true".to_string()),
        Just(":false".to_string()),
        Just(":nil".to_string()),
    ]
}

fn fn_form(depth: u32) -> impl Strategy<Value = String> {
    if depth == 0 {
        fn_leaf().boxed()
    } else {
        prop_oneof![
            fn_leaf(),
            prop::collection::vec(fn_form(depth - 1), 0..5)
                .prop_map(|items| format!("({})", items.join(" "))),
            prop::collection::vec(fn_form(depth - 1), 0..5)
                .prop_map(|items| format!("[{}]", items.join(" "))),
            prop::collection::vec(fn_form(depth - 1), 0..5)
                .prop_map(|items| format!("{{{}}}", items.join(" "))),
        ]
        .boxed()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn valid_programs_parse_ok(form in fn_form(3)) {
        parse(&form).unwrap_or_else(|e| {
            panic!("failed to parse generated form: {form:?}\nerror: {e}")
        });
    }

    #[test]
    fn multiple_forms_parse(forms in prop::collection::vec(fn_form(2), 1..5)) {
        let input = forms.join(" ");
        let root = parse(&input).unwrap_or_else(|e| {
            panic!("failed to parse: {input:?}\nerror: {e}")
        });
        assert!(!root.children().is_empty(), "no forms from: {input:?}");
    }
}

proptest! {
    #[test]
    fn delimiter_soup_never_panics(
        input in prop::collection::vec(
            prop_oneof![
                Just("("),
                Just(")"),
                Just("["),
                Just("]"),
                Just("{"),
                Just("}"),
                Just(" "),
                Just("1"),
                Just(":a"),
                Just("foo"),
            ],
            0..50
        ).prop_map(|v| v.join(""))
    ) {
        let _ = parse(&input);
    }

    #[test]
    fn string_escapes_never_panic(
        content in prop::collection::vec(
            prop_oneof![
                Just("a".to_string()),
                Just("\\n".to_string()),
                Just("\\t".to_string()),
                Just("\\\\".to_string()),
                Just("\\\"".to_string()),
                Just(" ".to_string()),
                Just("\\z".to_string()),  // unknown escape
            ],
            0..20
        ).prop_map(|v| format!("\"{}\"", v.join("")))
    ) {
        let _ = parse(&content);
    }

    #[test]
    fn numeric_strings_never_panic(
        input in prop_oneof![
            "-?[0-9]{1,20}",
            "-?[0-9]{1,10}\\.[0-9]{1,10}",
            "-?[0-9]{1,25}",                     // potential overflow
        ]
    ) {
        let _ = parse(&input);
    }
}
