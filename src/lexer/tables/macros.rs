// src/lexer/tables/macros.rs
//! Macro expansion to a fixed point.
//!
//! Every `{name}` placeholder is replaced by the parenthesized text of the
//! macro it names. Each pass builds a fresh table from the previous one and
//! the loop stops on the first pass that changes nothing. Cyclic references
//! are rejected up front, and a pass cap backs that up.

use std::{borrow::Cow, sync::LazyLock};

use hashbrown::HashMap;
use indexmap::IndexMap;
use regex::{Captures, Regex};

use super::CompileConfig;
use crate::error::CompileError;

/// Macro name -> pattern text, in declaration order.
pub type MacroTable = IndexMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_-]*)\}").expect("static regex"));

#[inline]
fn placeholder(name: &str) -> String {
    format!("{{{name}}}")
}

/// Replaces placeholders of every macro in `macros` (except `skip`) with the
/// parenthesized macro text. One sweep over the table, in insertion order.
pub fn substitute(text: &str, macros: &MacroTable, skip: Option<&str>) -> String {
    let mut out = text.to_string();
    for (name, body) in macros {
        if skip == Some(name.as_str()) {
            continue;
        }
        let needle = placeholder(name);
        if out.contains(&needle) {
            out = out.replace(&needle, &format!("({body})"));
        }
    }
    out
}

#[inline]
fn is_escaped(text: &str, at: usize) -> bool {
    text[..at].ends_with('\\')
}

/// Identifier-shaped placeholders left in `text`. After a full substitution
/// these can only name macros that do not exist.
pub fn unresolved_references(text: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(text)
        .filter(|c| c.get(0).is_some_and(|m| !is_escaped(text, m.start())))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Leftover `{name}` placeholders as literal braces (`\{name\}`), which is
/// how the emitted JavaScript reads them.
pub fn escape_unresolved(text: &str) -> Cow<'_, str> {
    PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        let Some(m) = caps.get(0) else {
            return String::new();
        };
        if is_escaped(text, m.start()) {
            m.as_str().to_string()
        } else {
            format!("\\{{{}\\}}", &caps[1])
        }
    })
}

pub fn expand_macros(
    macros: &MacroTable,
    config: &CompileConfig,
) -> Result<MacroTable, CompileError> {
    if macros.is_empty() {
        return Ok(MacroTable::new());
    }
    if let Some(cycle) = find_cycle(macros) {
        return Err(CompileError::MacroCycle { cycle });
    }

    let mut current = macros.clone();
    for pass in 1..=config.max_macro_passes {
        let mut changed = false;
        let next: MacroTable = current
            .iter()
            .map(|(name, text)| {
                let expanded = substitute(text, &current, Some(name));
                changed |= expanded != *text;
                (name.clone(), expanded)
            })
            .collect();

        if !changed {
            log::debug!("[macros] fixed point after {pass} pass(es)");
            for (name, text) in &next {
                for missing in unresolved_references(text) {
                    log::warn!("[macros] `{name}` references undefined macro `{missing}`");
                }
            }
            return Ok(next);
        }
        current = next;
    }

    Err(CompileError::ExpansionLimit {
        passes: config.max_macro_passes,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search over the "mentions" graph. Returns the first cycle found
/// as a path that starts and ends with the same macro name.
fn find_cycle(macros: &MacroTable) -> Option<Vec<String>> {
    let edges: HashMap<&str, Vec<&str>> = macros
        .iter()
        .map(|(name, text)| {
            let refs = macros
                .keys()
                .filter(|other| text.contains(&placeholder(other)))
                .map(String::as_str)
                .collect();
            (name.as_str(), refs)
        })
        .collect();

    fn visit<'m>(
        node: &'m str,
        edges: &HashMap<&'m str, Vec<&'m str>>,
        marks: &mut HashMap<&'m str, Mark>,
        path: &mut Vec<&'m str>,
    ) -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(node.to_string());
                return Some(cycle);
            }
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        path.push(node);
        for &next in edges.get(node).map(Vec::as_slice).unwrap_or_default() {
            if let Some(cycle) = visit(next, edges, marks, path) {
                return Some(cycle);
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut path = Vec::new();
    macros
        .keys()
        .find_map(|name| visit(name, &edges, &mut marks, &mut path))
}
