// src/lexer/tables/actions.rs
//! Per-rule action table.
//!
//! Every action is kept in two forms:
//!  - `body`: text for the emitted dispatch, with `return '<NAME>'` rewritten
//!    through the token map and the scanner variables qualified as `yy_.*`;
//!  - `program`: the statements the interpreting scanner runs, with token
//!    names resolved the same way.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::tokens::{Token, TokenId, TokenMap};
use crate::grammar::RuleDef;

/// Scanner-internal names that action text reads through `yy_`.
pub const SCANNER_VARIABLES: [&str; 5] = ["yytext", "yyleng", "yylineno", "yylloc", "yy"];

/// Receiver the emitted dispatch function binds the scanner to.
pub const SCANNER_RECEIVER: &str = "yy_";

static FUNCTION_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*function\s*\(\s*\)\s*\{").expect("static regex"));
static FUNCTION_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}\s*$").expect("static regex"));
static TOKEN_RETURN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"return '([^']+)'").expect("static regex"));
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    // `yy` is last so it never shadows the longer names.
    Regex::new(&format!(r"\b({})\b", SCANNER_VARIABLES.join("|"))).expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    /// `return 'NAME'` / `return 42` / `return IDENT`.
    Return(Token),
    /// `return yytext`
    ReturnText,
    /// `return;`: stop without producing a token.
    Stop,
    /// `this.begin('S')` / `this.pushState('S')`
    Begin(String),
    /// `this.popState()`
    PopState,
    /// `this.more()`
    More,
    /// `this.less(n)`
    Less(usize),
    /// `console.log(yytext)`
    Echo,
    /// `yytext = yytext.substr(a, yyleng - b)` or `yytext.slice(a, -b)`
    Trim { start: usize, end: usize },
    /// Anything else. Kept for the emitted text; a no-op when interpreted.
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub rule_index: usize,
    pub body: String,
    pub program: Vec<Stmt>,
}

impl ActionEntry {
    /// Statements the in-process scanner skips. Non-empty means the scanner
    /// behaves differently from the emitted unit unless a callback is bound.
    pub fn opaque_statements(&self) -> impl Iterator<Item = &str> {
        self.program.iter().filter_map(|stmt| match stmt {
            Stmt::Opaque(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Accepts actions written as `function () { ... }` and keeps only the body.
pub fn unwrap_function_form(action: &str) -> &str {
    match FUNCTION_HEAD.find(action) {
        Some(head) => {
            let rest = &action[head.end()..];
            match FUNCTION_TAIL.find(rest) {
                Some(tail) => &rest[..tail.start()],
                None => rest,
            }
        }
        None => action,
    }
}

/// `return 'NAME'` -> `return <id>`, or `return 'NAME'` again when the map has
/// no entry for it. Nothing else in the body is touched.
pub fn rewrite_token_returns(body: &str, tokens: &TokenMap) -> String {
    TOKEN_RETURN
        .replace_all(body, |caps: &Captures<'_>| {
            let name = &caps[1];
            match tokens.get(name) {
                Some(id) => format!("return {id}"),
                None => format!("return '{name}'"),
            }
        })
        .into_owned()
}

#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Qualifies standalone scanner variables with the receiver. Occurrences that
/// are part of a longer identifier or a property access are left alone.
pub fn qualify_variables(body: &str) -> String {
    VARIABLE
        .replace_all(body, |caps: &Captures<'_>| {
            let Some(m) = caps.get(0) else {
                return String::new();
            };
            let before = body[..m.start()].chars().next_back();
            let after = body[m.end()..].chars().next();
            let attached = before.is_some_and(|c| is_ident_char(c) || c == '.')
                || after.is_some_and(|c| c == '$');
            if attached {
                m.as_str().to_string()
            } else {
                format!("{SCANNER_RECEIVER}.{}", m.as_str())
            }
        })
        .into_owned()
}

// -------------------- statement program --------------------

/// Splits action text into top-level statements. Comments are dropped,
/// string literals and bracketed groups are kept whole.
fn split_statements(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                cur.push(c);
                while let Some(d) = chars.next() {
                    cur.push(d);
                    if d == '\\' {
                        if let Some(e) = chars.next() {
                            cur.push(e);
                        }
                    } else if d == c {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for d in chars.by_ref() {
                    if prev == '*' && d == '/' {
                        break;
                    }
                    prev = d;
                }
                cur.push(' ');
            }
            '/' if chars.peek() == Some(&'/') => {
                for d in chars.by_ref() {
                    if d == '\n' {
                        break;
                    }
                }
                if depth == 0 {
                    out.push(std::mem::take(&mut cur));
                }
            }
            '(' | '[' | '{' => {
                depth += 1;
                cur.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                cur.push(c);
                // A closed block ends its statement.
                if c == '}' && depth == 0 {
                    out.push(std::mem::take(&mut cur));
                }
            }
            ';' | '\n' if depth == 0 => out.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    out.push(cur);

    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

static RE_RETURN_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^return\s*'([^']+)'$").expect("static regex"));
static RE_RETURN_DOUBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^return\s*"([^"]+)"$"#).expect("static regex"));
static RE_RETURN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^return\s+(-?\d+)$").expect("static regex"));
static RE_RETURN_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^return\s+([A-Za-z_$][\w$]*)$").expect("static regex"));
static RE_BEGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^this\.(?:begin|pushState)\(\s*['"]([^'"]+)['"]\s*\)$"#).expect("static regex")
});
static RE_POP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^this\.popState\(\s*\)$").expect("static regex"));
static RE_MORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^this\.more\(\s*\)$").expect("static regex"));
static RE_LESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^this\.less\(\s*(\d+)\s*\)$").expect("static regex"));
static RE_ECHO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^console\.log\(\s*yytext\s*\)$").expect("static regex"));
static RE_TRIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^yytext\s*=\s*yytext\.(?:substr\(\s*(\d+)\s*,\s*yyleng\s*-\s*(\d+)\s*\)|slice\(\s*(\d+)\s*,\s*-\s*(\d+)\s*\))$",
    )
    .expect("static regex")
});

fn resolve_token(name: &str, tokens: Option<&TokenMap>) -> Token {
    match tokens.and_then(|t| t.get(name)) {
        Some(id) => Token::Mapped(id.clone()),
        None => Token::Literal(name.to_string()),
    }
}

fn parse_stmt(stmt: &str, tokens: Option<&TokenMap>) -> Stmt {
    if stmt == "return" {
        return Stmt::Stop;
    }
    if let Some(c) = RE_RETURN_SINGLE.captures(stmt) {
        return Stmt::Return(resolve_token(&c[1], tokens));
    }
    if let Some(c) = RE_RETURN_DOUBLE.captures(stmt) {
        return Stmt::Return(Token::Literal(c[1].to_string()));
    }
    if let Some(n) = RE_RETURN_NUMBER
        .captures(stmt)
        .and_then(|c| c[1].parse::<i64>().ok())
    {
        return Stmt::Return(Token::Mapped(TokenId::Number(n)));
    }
    if let Some(c) = RE_RETURN_IDENT.captures(stmt) {
        return match &c[1] {
            "yytext" => Stmt::ReturnText,
            ident => Stmt::Return(Token::Mapped(TokenId::Name(ident.to_string()))),
        };
    }
    if let Some(c) = RE_BEGIN.captures(stmt) {
        return Stmt::Begin(c[1].to_string());
    }
    if RE_POP.is_match(stmt) {
        return Stmt::PopState;
    }
    if RE_MORE.is_match(stmt) {
        return Stmt::More;
    }
    if let Some(n) = RE_LESS
        .captures(stmt)
        .and_then(|c| c[1].parse::<usize>().ok())
    {
        return Stmt::Less(n);
    }
    if RE_ECHO.is_match(stmt) {
        return Stmt::Echo;
    }
    if let Some(c) = RE_TRIM.captures(stmt) {
        let num = |i: usize| {
            c.get(i)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(0)
        };
        // substr(a, yyleng - b) keeps yyleng - b chars from a, so it drops
        // b - a from the end; slice(a, -b) drops b.
        return if c.get(1).is_some() {
            Stmt::Trim {
                start: num(1),
                end: num(2).saturating_sub(num(1)),
            }
        } else {
            Stmt::Trim {
                start: num(3),
                end: num(4),
            }
        };
    }
    Stmt::Opaque(stmt.to_string())
}

pub fn parse_program(body: &str, tokens: Option<&TokenMap>) -> Vec<Stmt> {
    let trimmed = body.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);
    split_statements(inner)
        .iter()
        .map(|s| parse_stmt(s, tokens))
        .collect()
}

pub fn build_action(index: usize, action: &str, tokens: Option<&TokenMap>) -> ActionEntry {
    let raw = unwrap_function_form(action);
    let program = parse_program(raw, tokens);
    let body = match tokens {
        Some(map) => rewrite_token_returns(raw, map),
        None => raw.to_string(),
    };
    let entry = ActionEntry {
        rule_index: index,
        body: qualify_variables(&body),
        program,
    };
    for text in entry.opaque_statements() {
        log::warn!(
            "[actions] rule #{index}: `{text}` is emitted but not interpreted; \
             use Scanner::bind_action({index}, ..) to run it in-process"
        );
    }
    entry
}

/// One entry per rule, in rule order.
pub fn build_actions(rules: &[RuleDef], tokens: Option<&TokenMap>) -> Vec<ActionEntry> {
    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| build_action(i, &rule.action, tokens))
        .collect()
}

/// `case <i>:<body>` arms for the emitted `switch`.
pub fn dispatch_text(actions: &[ActionEntry]) -> String {
    actions
        .iter()
        .map(|a| format!("    case {}:{}\n      break;", a.rule_index, a.body))
        .collect::<Vec<_>>()
        .join("\n")
}
