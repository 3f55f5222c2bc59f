// src/lexer/tables/tokens.rs
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier a parser generator assigned to a token name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenId {
    Number(i64),
    Name(String),
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenId::Number(n) => write!(f, "{n}"),
            TokenId::Name(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TokenId {
    fn from(n: i64) -> Self {
        TokenId::Number(n)
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        TokenId::Name(s.to_string())
    }
}

/// Token name -> identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenMap(IndexMap<String, TokenId>);

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from a parser generator's terminal table, which is keyed
    /// the other way round (id -> name).
    pub fn from_terminals<I, K>(terminals: I) -> Self
    where
        I: IntoIterator<Item = (K, String)>,
        K: Into<TokenId>,
    {
        Self(
            terminals
                .into_iter()
                .map(|(id, name)| (name, id.into()))
                .collect(),
        )
    }

    /// Accepts either `{"NAME": id}` or a terminal table `{"<id>": "NAME"}`.
    pub fn from_json_value(value: Value) -> Result<Self, serde_json::Error> {
        if let Value::Object(map) = &value {
            let terminals = !map.is_empty()
                && map
                    .iter()
                    .all(|(k, v)| k.parse::<i64>().is_ok() && v.is_string());
            if terminals {
                return Ok(Self::from_terminals(map.iter().filter_map(|(k, v)| {
                    Some((k.parse::<i64>().ok()?, v.as_str()?.to_string()))
                })));
            }
        }
        serde_json::from_value(value)
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<TokenId>) {
        self.0.insert(name.into(), id.into());
    }

    pub fn get(&self, name: &str) -> Option<&TokenId> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, I: Into<TokenId>> FromIterator<(N, I)> for TokenMap {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, i)| (n.into(), i.into()))
                .collect(),
        )
    }
}

/// What a scanner hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// Name resolved through the token map.
    Mapped(TokenId),
    /// Unmapped name (or matched text) returned as a literal.
    Literal(String),
    /// End of input. Returned forever once reached.
    Eof,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Mapped(id) => write!(f, "{id}"),
            Token::Literal(s) => write!(f, "'{s}'"),
            Token::Eof => f.write_str("EOF"),
        }
    }
}

/// Emitted-text value of the end-of-input sentinel.
pub const EOF_SENTINEL: u32 = 1;
