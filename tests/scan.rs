// tests/scan.rs
use rxlex::{Grammar, ScanError, Scanner, Token, TokenId, TokenMap};
use serde_json::json;

fn scanner(json: &str, input: &str) -> Scanner {
    let g = Grammar::from_json_str(json).expect("grammar json");
    rxlex::compile_and_load(&g, Some(input), None).expect("compile")
}

fn lit(name: &str) -> Token {
    Token::Literal(name.to_string())
}

#[test]
fn digits_scan_to_a_mapped_number() {
    let g = Grammar::from_json_str(
        r#"{"macros": {"DIGIT": "[0-9]"}, "rules": [["{DIGIT}+", "return 'NUMBER'"]]}"#,
    )
    .unwrap();
    let tokens: TokenMap = [("NUMBER", 5i64)].into_iter().collect();
    let mut s = rxlex::compile_and_load(&g, Some("123"), Some(&tokens)).unwrap();

    assert_eq!(s.lex().unwrap(), Token::Mapped(TokenId::Number(5)));
    assert_eq!(s.yytext(), "123");
    assert_eq!(s.yyleng(), 3);
    assert_eq!(s.yylloc().first_column, 0);
    assert_eq!(s.yylloc().last_column, 3);
    assert_eq!(s.lex().unwrap(), Token::Eof);
    assert_eq!(s.lex().unwrap(), Token::Eof);
}

#[test]
fn longest_match_then_earliest_rule() {
    let mut s = scanner(
        r#"{"rules": [["\\s+", ""], ["if", "return 'IF'"], ["[a-z]+", "return 'ID'"]]}"#,
        "if iffy",
    );
    assert_eq!(s.lex().unwrap(), lit("IF"));
    assert_eq!(s.lex().unwrap(), lit("ID"));
    assert_eq!(s.yytext(), "iffy");
    assert_eq!(s.lex().unwrap(), Token::Eof);
}

#[test]
fn string_condition_switching() {
    let mut s = scanner(
        r#"{
            "startConditions": {"STR": 1},
            "rules": [
                ["\\s+", ""],
                ["[a-z]+", "return 'WORD'"],
                ["\"", "this.begin('STR')"],
                [["STR"], "[^\"]+", "return 'STRING'"],
                [["STR"], "\"", "this.popState()"]
            ]
        }"#,
        r#"say "hi there" now"#,
    );

    assert_eq!(s.lex().unwrap(), lit("WORD"));
    assert_eq!(s.lex().unwrap(), lit("STRING"));
    assert_eq!(s.yytext(), "hi there");
    assert_eq!(s.top_state(0), "STR");
    assert_eq!(s.state_stack_size(), 2);
    assert_eq!(s.lex().unwrap(), lit("WORD"));
    assert_eq!(s.yytext(), "now");
    assert_eq!(s.top_state(0), "INITIAL");
    assert_eq!(s.lex().unwrap(), Token::Eof);
}

#[test]
fn unrecognized_text_reports_line_and_context() {
    let mut s = scanner(
        r#"{"rules": [["[a-z]+", "return 'W'"], ["\\n", ""]]}"#,
        "ab\ncd?x",
    );
    assert_eq!(s.lex().unwrap(), lit("W"));
    assert_eq!(s.lex().unwrap(), lit("W"));

    let err = s.lex().unwrap_err();
    assert_eq!(
        err,
        ScanError::Unrecognized {
            line: 2,
            context: "abcd?x\n----^".into(),
        }
    );
    assert_eq!(
        err.to_string(),
        "Lexical error on line 2. Unrecognized text.\nabcd?x\n----^"
    );
}

#[test]
fn long_context_is_elided() {
    let input = format!("{}!{}", "a".repeat(30), "b".repeat(30));
    let mut s = scanner(r#"{"rules": [["a+", ""], ["b+", ""]]}"#, &input);
    let Err(ScanError::Unrecognized { context, .. }) = s.lex() else {
        panic!("expected a lexical error");
    };
    // Only the past side is elided; the upcoming side is a plain 20-char window.
    let expected = format!(
        "...{}!{}\n{}^",
        "a".repeat(20),
        "b".repeat(19),
        "-".repeat(23)
    );
    assert_eq!(context, expected);
}

#[test]
fn context_starts_at_a_pending_match() {
    let input = format!("{}!", "a".repeat(30));
    let mut s = scanner(r#"{"rules": [["a+", "this.more()"]]}"#, &input);
    let Err(ScanError::Unrecognized { line, context }) = s.lex() else {
        panic!("expected a lexical error");
    };
    assert_eq!(line, 1);
    assert_eq!(context, format!("{}...\n^", "a".repeat(20)));
}

#[test]
fn more_keeps_the_previous_text() {
    let mut s = scanner(r#"{"rules": [["a", "this.more()"], ["b", "return 'AB'"]]}"#, "ab");
    assert_eq!(s.lex().unwrap(), lit("AB"));
    assert_eq!(s.yytext(), "ab");
    assert_eq!(s.yyleng(), 2);
}

#[test]
fn less_hands_text_back() {
    let mut s = scanner(
        r#"{"rules": [["abc", "this.less(1); return 'A'"], ["bc", "return 'BC'"]]}"#,
        "abc",
    );
    assert_eq!(s.lex().unwrap(), lit("A"));
    assert_eq!(s.yytext(), "a");
    assert_eq!(s.remaining(), "bc");
    assert_eq!(s.lex().unwrap(), lit("BC"));
    assert_eq!(s.lex().unwrap(), Token::Eof);
}

#[test]
fn trimmed_yytext() {
    let mut s = scanner(
        r#"{"rules": [["\"[^\"]*\"", "yytext = yytext.substr(1, yyleng-2); return 'STRING'"]]}"#,
        r#""hey""#,
    );
    assert_eq!(s.lex().unwrap(), lit("STRING"));
    assert_eq!(s.yytext(), "hey");
    assert_eq!(s.yyleng(), 3);
}

#[test]
fn locations_and_ranges_follow_line_breaks() {
    let mut s = scanner(
        r#"{"options": {"ranges": true}, "rules": [["[a-z]+", "return 'W'"], ["\\s+", ""]]}"#,
        "ab\n  cd",
    );

    s.lex().unwrap();
    let loc = *s.yylloc();
    assert_eq!((loc.first_line, loc.last_line), (1, 1));
    assert_eq!((loc.first_column, loc.last_column), (0, 2));
    assert_eq!(loc.range, Some((0, 2)));

    s.lex().unwrap();
    let loc = *s.yylloc();
    assert_eq!((loc.first_line, loc.last_line), (2, 2));
    assert_eq!((loc.first_column, loc.last_column), (2, 4));
    assert_eq!(loc.range, Some((5, 7)));
    assert_eq!(s.yylineno(), 1);
}

#[test]
fn end_of_input_rule_fires_once() {
    let mut s = scanner(r#"{"rules": [["$", "return 'END'"], ["a", "return 'A'"]]}"#, "a");
    assert_eq!(s.lex().unwrap(), lit("A"));
    assert_eq!(s.lex().unwrap(), lit("END"));
    assert_eq!(s.lex().unwrap(), Token::Eof);
    assert_eq!(s.lex().unwrap(), Token::Eof);
}

#[test]
fn empty_match_without_progress_is_an_error() {
    let mut s = scanner(r#"{"rules": [["x*", ""]]}"#, "y");
    assert_eq!(s.lex().unwrap_err(), ScanError::EmptyMatch { rule: 0 });
}

#[test]
fn flex_echoes_unmatched_characters() {
    let mut s = scanner(r#"{"options": {"flex": true}, "rules": [["a", "return 'A'"]]}"#, "xay");
    assert_eq!(s.tokenize().unwrap(), vec![lit("A")]);
    assert_eq!(s.echoed(), "xy");
}

#[test]
fn condition_stack_bounds() {
    let mut s = scanner(r#"{"startConditions": {"S": 0}, "rules": [["a", ""]]}"#, "");
    assert_eq!(
        s.begin("NOPE"),
        Err(ScanError::UnknownCondition {
            state: "NOPE".into()
        })
    );
    assert_eq!(s.pop_state(), None);
    assert_eq!(s.state_stack_size(), 1);

    s.begin("S").unwrap();
    assert_eq!(s.top_state(0), "S");
    assert_eq!(s.top_state(1), "INITIAL");
    assert_eq!(s.top_state(5), "INITIAL");
    assert_eq!(s.pop_state().as_deref(), Some("S"));
}

#[test]
fn action_entering_unknown_condition_fails() {
    let mut s = scanner(r#"{"rules": [["a", "this.begin('NOPE')"]]}"#, "a");
    assert_eq!(
        s.lex().unwrap_err(),
        ScanError::UnknownCondition {
            state: "NOPE".into()
        }
    );
}

#[test]
fn bound_callbacks_see_scanner_values() {
    let mut s = scanner(
        r#"{"rules": [["\\s+", ""], ["[0-9]+", "return 'NUM'"]]}"#,
        "4 20",
    );
    assert!(!s.bind_action(9, |_| None));
    assert!(s.bind_action(1, |scope| {
        let n: i64 = scope.yytext.parse().ok()?;
        let total = scope.yy.get("sum").and_then(|v| v.as_i64()).unwrap_or(0) + n;
        scope.yy.insert("sum".into(), json!(total));
        Some(Token::Mapped(TokenId::Number(n * 10)))
    }));

    let tokens: Vec<Token> = s.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Mapped(TokenId::Number(40)),
            Token::Mapped(TokenId::Number(200)),
        ]
    );
    assert_eq!(s.shared().get("sum"), Some(&json!(24)));
}

#[test]
fn callbacks_stand_in_for_conditional_actions() {
    let json = r#"{"rules": [["\\s+", ""], ["[0-9]+", "if (yyleng > 3) return 'BIG'; return 'NUM'"]]}"#;

    // Interpreted, the condition is skipped.
    let mut s = scanner(json, "12 12345");
    assert_eq!(s.tokenize().unwrap(), vec![lit("NUM"), lit("NUM")]);

    let mut s = scanner(json, "12 12345");
    s.bind_action(1, |scope| {
        Some(lit(if scope.yyleng > 3 { "BIG" } else { "NUM" }))
    });
    assert_eq!(s.tokenize().unwrap(), vec![lit("NUM"), lit("BIG")]);
}

#[test]
fn callbacks_can_switch_conditions() {
    let mut s = scanner(
        r#"{
            "startConditions": {"C": 1},
            "rules": [
                ["/\\*", ""],
                [["C"], "\\*/", ""],
                [["C"], "[^*]+", ""],
                ["[a-z]+", "return 'W'"]
            ]
        }"#,
        "a/* x */b",
    );
    s.bind_action(0, |scope| {
        scope.begin("C");
        None
    });
    s.bind_action(1, |scope| {
        scope.pop_state();
        None
    });

    assert_eq!(s.tokenize().unwrap(), vec![lit("W"), lit("W")]);
    assert_eq!(s.yytext(), "b");
}

#[test]
fn iterator_stops_after_an_error() {
    let mut s = scanner(r#"{"rules": [["a", "return 'A'"]]}"#, "a?a");
    assert_eq!(s.next(), Some(Ok(lit("A"))));
    assert!(matches!(s.next(), Some(Err(ScanError::Unrecognized { .. }))));
    assert_eq!(s.next(), None);
}

#[test]
fn set_input_starts_over() {
    let mut s = scanner(r#"{"rules": [["[a-z]+", "return 'W'"], ["\\n", ""]]}"#, "a\nb");
    s.tokenize().unwrap();
    assert_eq!(s.yylineno(), 1);

    s.set_input("zz");
    assert_eq!(s.yylineno(), 0);
    assert_eq!(s.lex().unwrap(), lit("W"));
    assert_eq!(s.matched(), "zz");
}
