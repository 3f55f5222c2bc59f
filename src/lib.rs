// src/lib.rs
//! Compiles a declarative lexical grammar (macros, pattern rules, start
//! conditions, actions, options) into a [`CompiledLexerSpec`], then either
//! renders it as a self-contained scanner module or runs it in-process.
//!
//! ```no_run
//! use rxlex::{Grammar, ModuleType, TokenMap};
//!
//! let grammar = Grammar::from_json_str(
//!     r#"{"macros": {"D": "[0-9]"}, "rules": [["{D}+", "return 'NUMBER'"], ["\\s+", ""]]}"#,
//! )?;
//! let tokens: TokenMap = [("NUMBER", 5i64)].into_iter().collect();
//!
//! let spec = rxlex::compile(&grammar, Some(&tokens))?;
//! let text = rxlex::emit(&spec, ModuleType::SyncImport)?;
//!
//! let mut scanner = rxlex::compile_and_load(&grammar, Some("1 22"), Some(&tokens))?;
//! while !scanner.lex()?.is_eof() {}
//! # Ok::<(), rxlex::Error>(())
//! ```

pub mod error;
pub mod grammar;
pub mod lexer;

pub use error::{CompileError, EmitError, Error, GrammarError, Result, ScanError};
pub use grammar::{Grammar, GrammarParser, JsonGrammar, ModuleType, Options, RuleDef};
pub use lexer::{
    emit::{ModuleEmitter, Skeleton},
    scanner::Scanner,
    tables::{CompileConfig, CompiledLexerSpec, Token, TokenId, TokenMap},
};

/// Grammar -> compiled spec (macro expansion, rule compilation, condition
/// resolution, action table).
pub fn compile(grammar: &Grammar, tokens: Option<&TokenMap>) -> Result<CompiledLexerSpec> {
    Ok(lexer::tables::compile(grammar, tokens)?)
}

/// Compiled spec -> source text in the requested wrapping convention.
pub fn emit(spec: &CompiledLexerSpec, convention: ModuleType) -> Result<String> {
    Ok(lexer::emit::emit(spec, convention)?)
}

/// Compile, then emit with the convention recorded in the grammar's options.
pub fn generate(grammar: &Grammar, tokens: Option<&TokenMap>) -> Result<String> {
    let spec = compile(grammar, tokens)?;
    emit(&spec, spec.options.module_type())
}

/// Compile into a live, in-process scanner, primed with `input` if given.
pub fn compile_and_load(
    grammar: &Grammar,
    input: Option<&str>,
    tokens: Option<&TokenMap>,
) -> Result<Scanner> {
    let spec = compile(grammar, tokens)?;
    let mut scanner = Scanner::new(spec);
    if let Some(input) = input {
        scanner.set_input(input);
    }
    Ok(scanner)
}

/// Same as [`compile`], for grammar text that still needs parsing.
pub fn compile_source(
    source: &str,
    parser: &dyn GrammarParser,
    tokens: Option<&TokenMap>,
) -> Result<CompiledLexerSpec> {
    let grammar = Grammar::parse_with(source, parser)?;
    compile(&grammar, tokens)
}
