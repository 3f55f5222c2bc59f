// src/lexer/tables/build.rs
use std::{borrow::Cow, time::Instant};

use super::{
    CompileConfig, CompiledLexerSpec,
    actions::{build_actions, dispatch_text},
    conditions::resolve_conditions,
    macros::expand_macros,
    rules::compile_rules,
    tokens::TokenMap,
};
use crate::{error::CompileError, grammar::{Grammar, RuleDef}};

/// Catch-all appended by the `flex` option: echo one unmatched character.
pub const FLEX_ECHO_PATTERN: &str = ".";
pub const FLEX_ECHO_ACTION: &str = "console.log(yytext);";

pub fn compile(
    grammar: &Grammar,
    tokens: Option<&TokenMap>,
) -> Result<CompiledLexerSpec, CompileError> {
    compile_with(grammar, tokens, &CompileConfig::default())
}

pub fn compile_with(
    grammar: &Grammar,
    tokens: Option<&TokenMap>,
    config: &CompileConfig,
) -> Result<CompiledLexerSpec, CompileError> {
    let t0 = Instant::now();
    let options = &grammar.options;

    // The synthetic rule goes in before anything is compiled so it gets the
    // next index and ordinary implicit membership.
    let rules: Cow<'_, [RuleDef]> = if options.flex {
        let mut rules = grammar.rules.clone();
        rules.push(RuleDef::new(FLEX_ECHO_PATTERN, FLEX_ECHO_ACTION));
        Cow::Owned(rules)
    } else {
        Cow::Borrowed(&grammar.rules)
    };

    let macros = expand_macros(&grammar.macros, config)?;
    let compiled = compile_rules(&rules, &macros, options.case_insensitive)?;
    let conditions = resolve_conditions(&grammar.start_conditions, &rules)?;
    let actions = build_actions(&rules, tokens);
    let action_dispatch = dispatch_text(&actions);

    log::debug!(
        "[tables] {} rules, {} macros, {} conditions in {} µs",
        compiled.len(),
        macros.len(),
        conditions.len(),
        t0.elapsed().as_micros()
    );

    let spec = CompiledLexerSpec {
        rules: compiled,
        conditions,
        actions,
        action_dispatch,
        options: options.clone(),
        action_include: grammar.action_include.clone(),
        module_include: grammar
            .module_include
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string(),
    };
    debug_assert!(spec.is_consistent());
    Ok(spec)
}
