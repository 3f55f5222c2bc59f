// src/lexer/tables/mod.rs
pub mod actions;
pub mod build;
pub mod conditions;
pub mod io;
pub mod macros;
pub mod rules;
pub mod tokens;

use serde::{Deserialize, Serialize};

pub use actions::{ActionEntry, Stmt};
pub use build::{compile, compile_with};
pub use conditions::{ConditionTable, INITIAL, StartCondition};
pub use io::{load_spec_json_bytes, save_spec_json};
pub use macros::{MacroTable, expand_macros};
pub use rules::CompiledRule;
pub use tokens::{EOF_SENTINEL, Token, TokenId, TokenMap};

use crate::grammar::Options;

/// Limits for the compilation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileConfig {
    /// Upper bound on macro expansion passes. Cycles are rejected before
    /// this matters; the cap only bites on absurdly deep macro chains.
    pub max_macro_passes: usize,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            max_macro_passes: 64,
        }
    }
}

/// Fully resolved scanner description. `rules[i]` and `actions[i]` always
/// describe the same source rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledLexerSpec {
    pub rules: Vec<CompiledRule>,
    pub conditions: ConditionTable,
    pub actions: Vec<ActionEntry>,
    /// `case` arms of the emitted action switch.
    pub action_dispatch: String,
    pub options: Options,
    #[serde(default)]
    pub action_include: Option<String>,
    #[serde(default)]
    pub module_include: String,
}

impl CompiledLexerSpec {
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn condition(&self, name: &str) -> Option<&StartCondition> {
        self.conditions.get(name)
    }

    /// Rule indices live in `name`, in priority order.
    pub fn rules_for(&self, name: &str) -> &[usize] {
        self.conditions
            .get(name)
            .map(|c| c.rules.as_slice())
            .unwrap_or_default()
    }

    /// Checks the end-to-end index parity between rules, actions and conditions.
    pub fn is_consistent(&self) -> bool {
        self.rules.len() == self.actions.len()
            && self
                .rules
                .iter()
                .zip(&self.actions)
                .enumerate()
                .all(|(i, (r, a))| r.index == i && a.rule_index == i)
            && self
                .conditions
                .values()
                .all(|c| c.rules.iter().all(|&i| i < self.rules.len()))
    }
}
