// src/lexer/emit/mod.rs
//! Renders a compiled spec as loadable source text.
//!
//! A skeleton carries five `{{NAME}}` placeholders. All of them are checked
//! before anything is substituted, and each is replaced exactly once, at its
//! first occurrence in the skeleton. Values are spliced in a single pass over
//! the skeleton, so a value that happens to contain placeholder text is never
//! rescanned.

use std::{fmt, fs, path::Path};

use crate::{
    error::EmitError,
    grammar::ModuleType,
    lexer::tables::{CompiledLexerSpec, CompiledRule},
};

const JAVASCRIPT_SKELETON: &str = include_str!("../../../templates/javascript/lexer");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Options,
    Rules,
    Conditions,
    ActionInclude,
    StateActions,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::Options,
        Placeholder::Rules,
        Placeholder::Conditions,
        Placeholder::ActionInclude,
        Placeholder::StateActions,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Placeholder::Options => "OPTIONS",
            Placeholder::Rules => "RULES",
            Placeholder::Conditions => "CONDITIONS",
            Placeholder::ActionInclude => "ACTION_INCLUDE",
            Placeholder::StateActions => "STATE_ACTIONS",
        }
    }

    pub fn marker(self) -> String {
        format!("{{{{{}}}}}", self.key())
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Fixed scanner text for one target platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    text: String,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::javascript()
    }
}

impl Skeleton {
    pub fn javascript() -> Self {
        Self::new(JAVASCRIPT_SKELETON)
    }

    /// Trailing whitespace is dropped so the unit closes cleanly.
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: text.as_ref().trim_end().to_string(),
        }
    }

    /// Reads `<dir>/lexer`, the same layout as the built-in skeleton.
    pub fn from_dir(dir: &Path) -> Result<Self, EmitError> {
        let path = dir.join("lexer");
        let text = fs::read_to_string(&path).map_err(|source| EmitError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn validate(&self) -> Result<(), EmitError> {
        match Placeholder::ALL
            .into_iter()
            .find(|p| !self.text.contains(&p.marker()))
        {
            Some(missing) => Err(EmitError::MissingPlaceholder(missing.key())),
            None => Ok(()),
        }
    }

    /// Fills every placeholder. `value` is asked once per placeholder.
    pub fn render(&self, mut value: impl FnMut(Placeholder) -> String) -> Result<String, EmitError> {
        self.validate()?;

        let mut spots: Vec<(usize, Placeholder)> = Placeholder::ALL
            .into_iter()
            .filter_map(|p| self.text.find(&p.marker()).map(|at| (at, p)))
            .collect();
        spots.sort_unstable_by_key(|&(at, _)| at);

        let mut out = String::with_capacity(self.text.len() * 2);
        let mut cursor = 0;
        for (at, p) in spots {
            out.push_str(&self.text[cursor..at]);
            out.push_str(&value(p));
            cursor = at + p.marker().len();
        }
        out.push_str(&self.text[cursor..]);
        Ok(out)
    }
}

pub fn header() -> String {
    format!("/* generated by rxlex {} */", env!("CARGO_PKG_VERSION"))
}

/// Pattern body as the inside of a `/.../` literal.
fn js_regex_body(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut escaped = false;
    for c in pattern.chars() {
        match c {
            '/' if !escaped => out.push_str("\\/"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
        escaped = c == '\\' && !escaped;
    }
    out
}

pub fn js_regex_literal(rule: &CompiledRule) -> String {
    if rule.prebuilt {
        return format!("/{}/", js_regex_body(&rule.pattern));
    }
    let flags = if rule.case_insensitive { "i" } else { "" };
    format!("/^(?:{})/{flags}", js_regex_body(&rule.pattern))
}

#[derive(Debug, Clone, Default)]
pub struct ModuleEmitter {
    skeleton: Skeleton,
}

impl ModuleEmitter {
    pub fn new(skeleton: Skeleton) -> Self {
        Self { skeleton }
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    fn placeholder_value(spec: &CompiledLexerSpec, p: Placeholder) -> String {
        match p {
            Placeholder::Options => {
                serde_json::to_string(&spec.options).unwrap_or_else(|_| "{}".to_string())
            }
            Placeholder::Rules => format!(
                "[{}]",
                spec.rules
                    .iter()
                    .map(js_regex_literal)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            Placeholder::Conditions => {
                serde_json::to_string(&spec.conditions).unwrap_or_else(|_| "{}".to_string())
            }
            Placeholder::ActionInclude => spec.action_include.clone().unwrap_or_default(),
            Placeholder::StateActions => spec.action_dispatch.clone(),
        }
    }

    /// `/* header */function(){ <skeleton>;<moduleInclude> }`
    pub fn render_unit(&self, spec: &CompiledLexerSpec) -> Result<String, EmitError> {
        let body = self
            .skeleton
            .render(|p| Self::placeholder_value(spec, p))?;

        let mut out = header();
        out.push_str("function(){\n");
        out.push_str(&body);
        if !spec.module_include.is_empty() {
            out.push_str(";\n");
            out.push_str(&spec.module_include);
        }
        out.push_str("\n}");
        Ok(out)
    }

    pub fn emit(&self, spec: &CompiledLexerSpec, convention: ModuleType) -> Result<String, EmitError> {
        let unit = self.render_unit(spec)?;
        let name = spec.options.module_name();
        let text = match convention {
            ModuleType::Bare => format!("({unit})();"),
            ModuleType::SyncImport => format!(
                "var {name} = ({unit})();\n\
                 exports.lexer = {name};\n\
                 exports.lex = function () {{ return {name}.lex.apply({name}, arguments); }};"
            ),
            ModuleType::AsyncDefine => format!("define([], {unit});"),
        };
        log::debug!(
            "[emit] {} unit `{name}`: {} bytes",
            convention,
            text.len()
        );
        Ok(text)
    }
}

pub fn emit(spec: &CompiledLexerSpec, convention: ModuleType) -> Result<String, EmitError> {
    ModuleEmitter::default().emit(spec, convention)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tables::EOF_SENTINEL;

    #[test]
    fn markers() {
        assert_eq!(Placeholder::StateActions.marker(), "{{STATE_ACTIONS}}");
    }

    #[test]
    fn builtin_skeleton_is_complete() {
        let sk = Skeleton::javascript();
        assert!(sk.validate().is_ok());
        assert!(sk.text().contains(&format!("EOF: {EOF_SENTINEL},")));
    }

    #[test]
    fn missing_placeholder_is_named() {
        let sk = Skeleton::new("{{OPTIONS}} {{RULES}} {{CONDITIONS}} {{STATE_ACTIONS}}");
        match sk.validate() {
            Err(EmitError::MissingPlaceholder(name)) => assert_eq!(name, "ACTION_INCLUDE"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn values_are_not_rescanned() {
        let sk = Skeleton::new("{{RULES}}|{{OPTIONS}}|{{CONDITIONS}}|{{ACTION_INCLUDE}}|{{STATE_ACTIONS}}");
        let out = sk
            .render(|p| match p {
                Placeholder::Rules => "{{OPTIONS}}".to_string(),
                other => other.key().to_lowercase(),
            })
            .unwrap();
        assert_eq!(out, "{{OPTIONS}}|options|conditions|action_include|state_actions");
    }

    #[test]
    fn slashes_are_escaped_in_literals() {
        assert_eq!(js_regex_body("a/b"), "a\\/b");
        assert_eq!(js_regex_body("a\\/b"), "a\\/b");
        assert_eq!(js_regex_body("a\\\\/b"), "a\\\\\\/b");
    }
}
