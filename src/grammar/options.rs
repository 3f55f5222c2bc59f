// src/grammar/options.rs
use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_MODULE_NAME: &str = "lexer";

/// Wrapping convention for emitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModuleType {
    /// Self-invoking unit, evaluates straight to a scanner object.
    #[default]
    Bare,
    /// `var NAME = ...; exports.lexer = NAME; exports.lex = ...`
    SyncImport,
    /// `define([], function(){ ... });`
    AsyncDefine,
}

impl ModuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::Bare => "js",
            ModuleType::SyncImport => "commonjs",
            ModuleType::AsyncDefine => "amd",
        }
    }
}

impl FromStr for ModuleType {
    type Err = Infallible;

    // Unknown conventions fall back to the bare unit.
    fn from_str(s: &str) -> Result<Self, Infallible> {
        Ok(match s {
            "commonjs" | "sync-import" => ModuleType::SyncImport,
            "amd" | "async-define" => ModuleType::AsyncDefine,
            _ => ModuleType::Bare,
        })
    }
}

impl From<String> for ModuleType {
    fn from(s: String) -> Self {
        let Ok(t) = s.parse();
        t
    }
}

impl From<ModuleType> for String {
    fn from(t: ModuleType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Global grammar options. Keys nobody here understands are kept in `extra`
/// and forwarded into the emitted unit untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    #[serde(rename = "case-insensitive", skip_serializing_if = "is_false")]
    pub case_insensitive: bool,

    /// Append a catch-all rule echoing unmatched text.
    #[serde(skip_serializing_if = "is_false")]
    pub flex: bool,

    /// Track byte ranges in the location record.
    #[serde(skip_serializing_if = "is_false")]
    pub ranges: bool,

    #[serde(rename = "moduleType", skip_serializing_if = "Option::is_none")]
    pub module_type: Option<ModuleType>,

    #[serde(rename = "moduleName", skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Options {
    pub fn module_type(&self) -> ModuleType {
        self.module_type.unwrap_or_default()
    }

    pub fn module_name(&self) -> &str {
        self.module_name.as_deref().unwrap_or(DEFAULT_MODULE_NAME)
    }
}
