// src/lexer/tables/conditions.rs
//! Start condition table: which rules are live in which lexical state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::CompileError,
    grammar::{RuleDef, StateSelector},
};

pub const INITIAL: &str = "INITIAL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCondition {
    /// Rule indices in ascending order, no duplicates.
    pub rules: Vec<usize>,
    pub inclusive: bool,
}

impl StartCondition {
    fn new(inclusive: bool) -> Self {
        Self {
            rules: Vec::new(),
            inclusive,
        }
    }

    fn add(&mut self, rule: usize) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }
}

/// Condition name -> condition, declaration order with `INITIAL` last unless
/// the grammar declared it itself.
pub type ConditionTable = IndexMap<String, StartCondition>;

/// `declared` maps each condition name to its *exclusive* flag.
pub fn resolve_conditions(
    declared: &IndexMap<String, bool>,
    rules: &[RuleDef],
) -> Result<ConditionTable, CompileError> {
    let mut table: ConditionTable = declared
        .iter()
        .map(|(name, &exclusive)| (name.clone(), StartCondition::new(!exclusive)))
        .collect();
    table.insert(INITIAL.to_string(), StartCondition::new(true));

    for (i, rule) in rules.iter().enumerate() {
        match &rule.states {
            StateSelector::Implicit => {
                for cond in table.values_mut().filter(|c| c.inclusive) {
                    cond.add(i);
                }
            }
            StateSelector::All => {
                for cond in table.values_mut() {
                    cond.add(i);
                }
            }
            StateSelector::Explicit(names) => {
                for name in names {
                    let cond = table
                        .get_mut(name)
                        .ok_or_else(|| CompileError::UndeclaredState {
                            rule: i,
                            state: name.clone(),
                        })?;
                    cond.add(i);
                }
            }
        }
    }

    log::debug!(
        "[conditions] {}",
        table
            .iter()
            .map(|(name, c)| format!("{name}={:?}", c.rules))
            .collect::<Vec<_>>()
            .join(" ")
    );
    Ok(table)
}
