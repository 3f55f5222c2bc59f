// tests/emit.rs
use std::fs;

use expect_test::expect;
use rxlex::{
    CompiledLexerSpec, EmitError, Error, Grammar, ModuleEmitter, ModuleType, Skeleton, TokenMap,
};

fn calc_spec() -> CompiledLexerSpec {
    let g = Grammar::from_json_str(
        r#"{
            "options": {"case-insensitive": true, "moduleName": "calc"},
            "startConditions": {"C": 1},
            "rules": [
                ["[0-9]+", "return 'NUMBER'"],
                ["a/b", "return yytext"],
                [["C"], "x", "this.popState()"]
            ],
            "actionInclude": "var depth = 0;",
            "moduleInclude": "calc.extra = 1;"
        }"#,
    )
    .unwrap();
    let tokens: TokenMap = [("NUMBER", 5i64)].into_iter().collect();
    rxlex::compile(&g, Some(&tokens)).unwrap()
}

/// Line of the emitted text starting with `prefix`.
fn line<'a>(text: &'a str, prefix: &str) -> &'a str {
    text.lines()
        .find(|l| l.starts_with(prefix))
        .unwrap_or_else(|| panic!("no line starting with {prefix:?}"))
}

fn header() -> String {
    format!("/* generated by rxlex {} */", env!("CARGO_PKG_VERSION"))
}

#[test]
fn tables_are_spliced_into_the_skeleton() {
    let text = rxlex::emit(&calc_spec(), ModuleType::Bare).unwrap();

    expect![[r#"options: {"case-insensitive":true,"moduleName":"calc"},"#]]
        .assert_eq(line(&text, "options:"));
    expect![[r#"rules: [/^(?:[0-9]+)/i,/^(?:a\/b)/i,/^(?:x)/i],"#]]
        .assert_eq(line(&text, "rules:"));
    expect![[r#"conditions: {"C":{"rules":[2],"inclusive":false},"INITIAL":{"rules":[0,1],"inclusive":true}}"#]]
        .assert_eq(line(&text, "conditions:"));
    assert!(text.contains("var depth = 0;\nvar YYSTATE = YY_START;"));
    assert!(!text.contains("{{"));
}

#[test]
fn dispatch_arms_follow_rule_order() {
    assert_eq!(
        calc_spec().action_dispatch,
        "    case 0:return 5\n      break;\n    \
         case 1:return yy_.yytext\n      break;\n    \
         case 2:this.popState()\n      break;"
    );
}

#[test]
fn bare_unit_invokes_itself() {
    let text = rxlex::emit(&calc_spec(), ModuleType::Bare).unwrap();
    assert!(text.starts_with(&format!("({}function(){{\nvar lexer = {{", header())));
    assert!(text.ends_with("return lexer;;\ncalc.extra = 1;\n})();"));
}

#[test]
fn sync_import_exports_lexer_and_lex() {
    let text = rxlex::emit(&calc_spec(), ModuleType::SyncImport).unwrap();
    assert!(text.starts_with(&format!("var calc = ({}function(){{", header())));

    let tail = &text[text.rfind("})();").unwrap()..];
    expect![[r#"
        })();
        exports.lexer = calc;
        exports.lex = function () { return calc.lex.apply(calc, arguments); };"#]]
    .assert_eq(tail);
}

#[test]
fn async_define_wraps_the_unit() {
    let text = rxlex::emit(&calc_spec(), ModuleType::AsyncDefine).unwrap();
    assert!(text.starts_with(&format!("define([], {}function(){{", header())));
    assert!(text.ends_with("\n});"));
}

#[test]
fn generate_uses_the_grammar_module_type() {
    let g = Grammar::from_json_str(
        r#"{"options": {"moduleType": "amd"}, "rules": [["a", "return 'A'"]]}"#,
    )
    .unwrap();
    let text = rxlex::generate(&g, None).unwrap();
    assert!(text.starts_with("define([], "));

    let g = Grammar::from_json_str(r#"{"rules": [["a", "return 'A'"]]}"#).unwrap();
    let text = rxlex::generate(&g, None).unwrap();
    assert!(text.starts_with(&format!("({}", header())));
    assert!(text.ends_with("})();"));
}

#[test]
fn no_module_include_means_no_trailer() {
    let g = Grammar::from_json_str(r#"{"rules": [["a", ""]]}"#).unwrap();
    let spec = rxlex::compile(&g, None).unwrap();
    let unit = ModuleEmitter::default().render_unit(&spec).unwrap();
    assert!(unit.ends_with("return lexer;\n}"));
}

#[test]
fn incomplete_skeleton_is_rejected() {
    let emitter = ModuleEmitter::new(Skeleton::new(
        "{{OPTIONS}} {{RULES}} {{CONDITIONS}} {{ACTION_INCLUDE}}",
    ));
    match emitter.emit(&calc_spec(), ModuleType::Bare) {
        Err(EmitError::MissingPlaceholder(name)) => assert_eq!(name, "STATE_ACTIONS"),
        other => panic!("expected a missing placeholder, got {other:?}"),
    }
    let err = emitter.skeleton().validate().unwrap_err();
    assert_eq!(
        Error::from(err).to_string(),
        r#"placeholder "{{STATE_ACTIONS}}" not found in skeleton"#
    );
}

#[test]
fn custom_skeleton_from_a_directory() {
    let dir = std::env::temp_dir().join(format!("rxlex-skeleton-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("lexer"),
        "// {{OPTIONS}}\n// {{RULES}}\n// {{CONDITIONS}}\n{{ACTION_INCLUDE}}\n{{STATE_ACTIONS}}\n\n",
    )
    .unwrap();

    let skeleton = Skeleton::from_dir(&dir).unwrap();
    let unit = ModuleEmitter::new(skeleton).render_unit(&calc_spec()).unwrap();
    fs::remove_dir_all(&dir).ok();

    assert!(unit.contains("// [/^(?:[0-9]+)/i,"));
    assert!(unit.contains("var depth = 0;\n    case 0:return 5"));
    assert!(unit.ends_with("      break;;\ncalc.extra = 1;\n}"));
}

#[test]
fn missing_skeleton_directory() {
    let err = Skeleton::from_dir(std::path::Path::new("/nonexistent/rxlex")).unwrap_err();
    assert!(matches!(err, EmitError::Io { .. }));
}
