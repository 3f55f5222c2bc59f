// src/error.rs
//! Error kinds for every stage of the pipeline. Any error aborts the whole
//! compilation; there is no partially compiled spec.

use thiserror::Error;

/// Problems with the structured grammar value itself.
#[derive(Error, Debug)]
pub enum GrammarError {
    /// A rule entry has the wrong shape (e.g. a state list with no pattern/action).
    #[error("malformed rule #{index}: {reason}")]
    MalformedRule { index: usize, reason: String },

    #[error("failed to parse grammar JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Failures while turning a grammar into a [`CompiledLexerSpec`].
///
/// [`CompiledLexerSpec`]: crate::lexer::tables::CompiledLexerSpec
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error("rule #{rule} references undeclared start condition `{state}`")]
    UndeclaredState { rule: usize, state: String },

    #[error("cyclic macro reference: {}", cycle.join(" -> "))]
    MacroCycle { cycle: Vec<String> },

    #[error("macro expansion did not settle after {passes} passes")]
    ExpansionLimit { passes: usize },

    #[error("rule #{rule} pattern `{pattern}` does not compile: {source}")]
    InvalidPattern {
        rule: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Emission failures. A missing placeholder means the skeleton is corrupt or
/// mismatched, not that the grammar is wrong.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("placeholder \"{{{{{0}}}}}\" not found in skeleton")]
    MissingPlaceholder(&'static str),

    #[error("failed to read skeleton {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime failures of the interpreting scanner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Lexical error on line {line}. Unrecognized text.\n{context}")]
    Unrecognized { line: usize, context: String },

    #[error("unknown start condition `{state}`")]
    UnknownCondition { state: String },

    #[error("rule #{rule} matched the empty string without producing a token or changing state")]
    EmptyMatch { rule: usize },
}

/// Umbrella error for the top-level `compile`/`generate`/`compile_and_load` operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
