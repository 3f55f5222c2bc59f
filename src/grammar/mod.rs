// src/grammar/mod.rs
//! Structured grammar value consumed by the compilation pipeline.
//!
//! Parsing the textual grammar language is somebody else's job: anything that
//! implements [`GrammarParser`] can hand us a [`Grammar`]. The JSON form
//! produced by the usual grammar-syntax parser is supported out of the box via
//! [`JsonGrammar`].

mod options;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

pub use options::{ModuleType, Options};

use crate::error::GrammarError;

/// Marker that puts a rule into every declared start condition.
pub const WILDCARD_STATE: &str = "*";

/// Which start conditions a rule belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateSelector {
    /// No state list: the rule joins every inclusive condition.
    Implicit,
    /// `<*>`: the rule joins every declared condition.
    All,
    /// Only the named conditions, regardless of inclusivity.
    Explicit(Vec<String>),
}

impl StateSelector {
    /// Mirrors how the grammar parser encodes state lists: an empty list is the
    /// same as no list, and a leading `*` wins over anything after it.
    pub fn from_names(names: Vec<String>) -> Self {
        match names.first().map(String::as_str) {
            None => StateSelector::Implicit,
            Some(WILDCARD_STATE) => StateSelector::All,
            Some(_) => StateSelector::Explicit(names),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RulePattern {
    /// Pattern text that may still contain `{macro}` placeholders.
    Source(String),
    /// An already built matcher; used as-is.
    Compiled(Regex),
}

impl From<&str> for RulePattern {
    fn from(s: &str) -> Self {
        RulePattern::Source(s.to_string())
    }
}

impl From<String> for RulePattern {
    fn from(s: String) -> Self {
        RulePattern::Source(s)
    }
}

impl From<Regex> for RulePattern {
    fn from(re: Regex) -> Self {
        RulePattern::Compiled(re)
    }
}

#[derive(Debug, Clone)]
pub struct RuleDef {
    pub states: StateSelector,
    pub pattern: RulePattern,
    pub action: String,
}

impl RuleDef {
    pub fn new(pattern: impl Into<RulePattern>, action: impl Into<String>) -> Self {
        Self {
            states: StateSelector::Implicit,
            pattern: pattern.into(),
            action: action.into(),
        }
    }

    pub fn in_states<S: Into<String>>(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.states = StateSelector::from_names(states.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub rules: Vec<RuleDef>,
    /// Macro name -> raw pattern text, in declaration order.
    pub macros: IndexMap<String, String>,
    /// Start condition name -> exclusive flag, in declaration order.
    pub start_conditions: IndexMap<String, bool>,
    pub options: Options,
    pub action_include: Option<String>,
    pub module_include: Option<String>,
}

impl Grammar {
    pub fn from_json_str(text: &str) -> Result<Self, GrammarError> {
        JsonGrammar.parse(text)
    }

    pub fn from_json_value(value: Value) -> Result<Self, GrammarError> {
        let raw: RawGrammar = serde_json::from_value(value)?;
        raw.try_into()
    }

    pub fn parse_with(text: &str, parser: &dyn GrammarParser) -> Result<Self, GrammarError> {
        parser.parse(text)
    }
}

/// Seam for the external grammar-syntax parser.
pub trait GrammarParser {
    fn parse(&self, source: &str) -> Result<Grammar, GrammarError>;
}

/// Accepts the JSON encoding of the structured grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGrammar;

impl GrammarParser for JsonGrammar {
    fn parse(&self, source: &str) -> Result<Grammar, GrammarError> {
        let raw: RawGrammar = serde_json::from_str(source)?;
        raw.try_into()
    }
}

// -------------------- wire form --------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum ExclusiveFlag {
    Bool(bool),
    Int(i64),
}

impl From<ExclusiveFlag> for bool {
    fn from(f: ExclusiveFlag) -> Self {
        match f {
            ExclusiveFlag::Bool(b) => b,
            ExclusiveFlag::Int(i) => i != 0,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawGrammar {
    rules: Vec<Vec<Value>>,
    macros: IndexMap<String, String>,
    start_conditions: IndexMap<String, ExclusiveFlag>,
    options: Options,
    action_include: Option<String>,
    module_include: Option<String>,
}

impl TryFrom<RawGrammar> for Grammar {
    type Error = GrammarError;

    fn try_from(raw: RawGrammar) -> Result<Self, GrammarError> {
        let rules = raw
            .rules
            .into_iter()
            .enumerate()
            .map(|(index, entry)| rule_from_values(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Grammar {
            rules,
            macros: raw.macros,
            start_conditions: raw
                .start_conditions
                .into_iter()
                .map(|(name, flag)| (name, flag.into()))
                .collect(),
            options: raw.options,
            action_include: raw.action_include,
            module_include: raw.module_include,
        })
    }
}

fn rule_from_values(index: usize, mut entry: Vec<Value>) -> Result<RuleDef, GrammarError> {
    let malformed = |reason: &str| GrammarError::MalformedRule {
        index,
        reason: reason.to_string(),
    };

    let states = match entry.first() {
        Some(Value::Array(_)) => {
            let Value::Array(names) = entry.remove(0) else {
                return Err(malformed("state list is not an array"));
            };
            let names = names
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    _ => Err(malformed("state names must be strings")),
                })
                .collect::<Result<Vec<_>, _>>()?;
            StateSelector::from_names(names)
        }
        _ => StateSelector::Implicit,
    };

    if entry.len() != 2 {
        return Err(malformed(&format!(
            "expected a pattern and an action, found {} element(s)",
            entry.len()
        )));
    }
    let action = match entry.pop() {
        Some(Value::String(s)) => s,
        _ => return Err(malformed("action must be a string")),
    };
    let pattern = match entry.pop() {
        Some(Value::String(s)) => RulePattern::Source(s),
        _ => return Err(malformed("pattern must be a string")),
    };

    Ok(RuleDef {
        states,
        pattern,
        action,
    })
}
