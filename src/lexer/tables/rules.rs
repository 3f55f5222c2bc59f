// src/lexer/tables/rules.rs
//! Rule patterns -> ordered, anchored matchers.
//!
//! Output order is input order. That order is the tie-break at scan time:
//! among rules producing the longest match, the earliest one wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use super::macros::{MacroTable, escape_unresolved, substitute, unresolved_references};
use crate::{
    error::CompileError,
    grammar::{RuleDef, RulePattern},
};

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledRule {
    /// Position in the original rule list; joins with conditions and actions.
    pub index: usize,
    /// Macro-expanded pattern body, not anchored and without flags.
    pub pattern: String,
    pub case_insensitive: bool,
    /// Anchored matcher. Its source carries the flags, so it round-trips.
    #[serde_as(as = "DisplayFromStr")]
    pub matcher: Regex,
    /// True when the grammar supplied a ready-made matcher.
    #[serde(default)]
    pub prebuilt: bool,
    /// Anchored copy of a prebuilt matcher, so scanning never searches ahead.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchored: Option<Regex>,
}

impl CompiledRule {
    /// Length of the match at the very start of `rest`, if any.
    #[inline]
    pub fn match_len(&self, rest: &str) -> Option<usize> {
        self.anchored
            .as_ref()
            .unwrap_or(&self.matcher)
            .find(rest)
            .filter(|m| m.start() == 0)
            .map(|m| m.end())
    }
}

pub fn anchored_source(pattern: &str, case_insensitive: bool) -> String {
    let flags = if case_insensitive { "(?i)" } else { "" };
    format!("{flags}^(?:{pattern})")
}

pub fn compile_rule(
    index: usize,
    rule: &RuleDef,
    macros: &MacroTable,
    case_insensitive: bool,
) -> Result<CompiledRule, CompileError> {
    match &rule.pattern {
        RulePattern::Compiled(re) => {
            let anchored = Regex::new(&anchored_source(re.as_str(), false)).map_err(|source| {
                CompileError::InvalidPattern {
                    rule: index,
                    pattern: re.as_str().to_string(),
                    source,
                }
            })?;
            Ok(CompiledRule {
                index,
                pattern: re.as_str().to_string(),
                case_insensitive: false,
                matcher: re.clone(),
                prebuilt: true,
                anchored: Some(anchored),
            })
        }
        RulePattern::Source(text) => {
            let pattern = substitute(text, macros, None);
            for missing in unresolved_references(&pattern) {
                log::warn!("[rules] rule #{index} references undefined macro `{missing}`");
            }
            let source = anchored_source(&escape_unresolved(&pattern), case_insensitive);
            let matcher = Regex::new(&source).map_err(
                |source| CompileError::InvalidPattern {
                    rule: index,
                    pattern: pattern.clone(),
                    source,
                },
            )?;
            Ok(CompiledRule {
                index,
                pattern,
                case_insensitive,
                matcher,
                prebuilt: false,
                anchored: None,
            })
        }
    }
}

/// `macros` must already be expanded to its fixed point.
pub fn compile_rules(
    rules: &[RuleDef],
    macros: &MacroTable,
    case_insensitive: bool,
) -> Result<Vec<CompiledRule>, CompileError> {
    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| compile_rule(i, rule, macros, case_insensitive))
        .collect()
}
