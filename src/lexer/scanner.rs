// src/lexer/scanner.rs
// Data-driven scanner: walks a compiled spec directly instead of evaluating
// emitted text. Behaves like the emitted unit, so it doubles as the oracle
// for what the generated code should produce.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::ScanError,
    lexer::tables::{CompiledLexerSpec, INITIAL, Stmt, Token},
};

/// Shared state object handed to every action (`yy`).
pub type SharedState = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub first_line: usize,
    pub last_line: usize,
    pub first_column: usize,
    pub last_column: usize,
    /// Byte offsets into the input; tracked with the `ranges` option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(usize, usize)>,
}

impl Location {
    fn start(ranges: bool) -> Self {
        Self {
            first_line: 1,
            last_line: 1,
            first_column: 0,
            last_column: 0,
            range: ranges.then_some((0, 0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Begin(String),
    PopState,
    More,
    Less(usize),
    Echo,
}

/// What a bound action sees. The five scanner values are plain named fields;
/// state changes go through the methods and take effect once the action returns.
pub struct ActionScope<'a> {
    pub yytext: &'a mut String,
    /// Length of `yytext` in characters.
    pub yyleng: usize,
    /// Zero-based count of line terminators consumed so far.
    pub yylineno: usize,
    pub yylloc: &'a Location,
    pub yy: &'a mut SharedState,
    pub rule: usize,
    pub condition: &'a str,
    directives: Vec<Directive>,
}

impl ActionScope<'_> {
    pub fn begin(&mut self, condition: impl Into<String>) {
        self.directives.push(Directive::Begin(condition.into()));
    }

    pub fn pop_state(&mut self) {
        self.directives.push(Directive::PopState);
    }

    pub fn more(&mut self) {
        self.directives.push(Directive::More);
    }

    pub fn less(&mut self, n: usize) {
        self.directives.push(Directive::Less(n));
    }

    pub fn echo(&mut self) {
        self.directives.push(Directive::Echo);
    }
}

/// Rust stand-in for a rule's action text.
pub type ActionFn = Box<dyn FnMut(&mut ActionScope<'_>) -> Option<Token>>;

pub struct Scanner {
    spec: CompiledLexerSpec,
    bound: Vec<Option<ActionFn>>,

    input: String,
    pos: usize,
    done: bool,
    more: bool,
    /// Byte length of the most recent rule match.
    last_match: usize,
    /// Bytes consumed since the last step that started afresh (grows under `more`).
    pending: usize,

    yytext: String,
    yyleng: usize,
    yylineno: usize,
    yylloc: Location,
    yy: SharedState,
    condition_stack: Vec<String>,
    echoed: String,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("rules", &self.spec.rules.len())
            .field("pos", &self.pos)
            .field("done", &self.done)
            .field("yytext", &self.yytext)
            .field("yylineno", &self.yylineno)
            .field("condition_stack", &self.condition_stack)
            .finish()
    }
}

#[inline]
fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn count_line_breaks(text: &str) -> usize {
    let mut n = 0;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                n += 1;
            }
            '\n' => n += 1,
            _ => {}
        }
    }
    n
}

impl Scanner {
    pub fn new(spec: CompiledLexerSpec) -> Self {
        let bound = spec.rules.iter().map(|_| None).collect();
        let ranges = spec.options.ranges;
        Self {
            spec,
            bound,
            input: String::new(),
            pos: 0,
            done: false,
            more: false,
            last_match: 0,
            pending: 0,
            yytext: String::new(),
            yyleng: 0,
            yylineno: 0,
            yylloc: Location::start(ranges),
            yy: SharedState::new(),
            condition_stack: vec![INITIAL.to_string()],
            echoed: String::new(),
        }
    }

    pub fn spec(&self) -> &CompiledLexerSpec {
        &self.spec
    }

    /// Replaces the interpreted action of `rule` with a Rust callback.
    /// Returns false if there is no such rule.
    pub fn bind_action<F>(&mut self, rule: usize, action: F) -> bool
    where
        F: FnMut(&mut ActionScope<'_>) -> Option<Token> + 'static,
    {
        match self.bound.get_mut(rule) {
            Some(slot) => {
                *slot = Some(Box::new(action));
                true
            }
            None => false,
        }
    }

    /// Resets all scanning state and starts over on `input`.
    pub fn set_input(&mut self, input: impl Into<String>) -> &mut Self {
        self.input = input.into();
        self.pos = 0;
        self.done = false;
        self.more = false;
        self.last_match = 0;
        self.pending = 0;
        self.yytext.clear();
        self.yyleng = 0;
        self.yylineno = 0;
        self.yylloc = Location::start(self.spec.options.ranges);
        self.condition_stack = vec![INITIAL.to_string()];
        self.echoed.clear();
        self
    }

    pub fn set_shared(&mut self, yy: SharedState) -> &mut Self {
        self.yy = yy;
        self
    }

    pub fn shared(&self) -> &SharedState {
        &self.yy
    }

    pub fn yytext(&self) -> &str {
        &self.yytext
    }

    pub fn yyleng(&self) -> usize {
        self.yyleng
    }

    pub fn yylineno(&self) -> usize {
        self.yylineno
    }

    pub fn yylloc(&self) -> &Location {
        &self.yylloc
    }

    /// Text consumed so far.
    pub fn matched(&self) -> &str {
        &self.input[..self.pos]
    }

    pub fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }

    /// Text written by echo actions (the `flex` catch-all among them).
    pub fn echoed(&self) -> &str {
        &self.echoed
    }

    pub fn take_echoed(&mut self) -> String {
        std::mem::take(&mut self.echoed)
    }

    pub fn begin(&mut self, condition: impl Into<String>) -> Result<(), ScanError> {
        let condition = condition.into();
        if !self.spec.conditions.contains_key(&condition) {
            return Err(ScanError::UnknownCondition { state: condition });
        }
        self.condition_stack.push(condition);
        Ok(())
    }

    /// Never pops the bottom entry.
    pub fn pop_state(&mut self) -> Option<String> {
        if self.condition_stack.len() > 1 {
            self.condition_stack.pop()
        } else {
            None
        }
    }

    /// `n` entries below the top; `INITIAL` past the bottom.
    pub fn top_state(&self, n: usize) -> &str {
        self.condition_stack
            .len()
            .checked_sub(1 + n)
            .and_then(|i| self.condition_stack.get(i))
            .map_or(INITIAL, String::as_str)
    }

    pub fn state_stack_size(&self) -> usize {
        self.condition_stack.len()
    }

    fn current_condition(&self) -> &str {
        self.top_state(0)
    }

    /// Up to 20 characters before the current match, then the match itself
    /// padded with upcoming input to 20 characters, then a caret under the
    /// start of the match. `...` marks elided text on either side.
    fn show_position(&self) -> String {
        let start = self.pos - self.pending;
        let past = &self.input[..start];
        let skip = past.chars().count().saturating_sub(20);
        let past_tail: String = past.chars().skip(skip).filter(|&c| c != '\n').collect();
        let past_view = if skip > 0 {
            format!("...{past_tail}")
        } else {
            past_tail
        };

        let mut next = self.input[start..self.pos].to_string();
        let taken = next.chars().count();
        if taken < 20 {
            next.extend(self.input[self.pos..].chars().take(20 - taken));
        }
        let mut upcoming: String = next.chars().take(20).collect();
        if next.chars().count() > 20 {
            upcoming.push_str("...");
        }
        let upcoming: String = upcoming.chars().filter(|&c| c != '\n').collect();

        let caret = "-".repeat(past_view.chars().count());
        format!("{past_view}{upcoming}\n{caret}^")
    }

    /// Longest match at the current position among the rules live in the
    /// current condition; the earliest rule wins ties.
    fn best_match(&self) -> Result<Option<(usize, usize)>, ScanError> {
        let condition = self.current_condition();
        let Some(cond) = self.spec.conditions.get(condition) else {
            return Err(ScanError::UnknownCondition {
                state: condition.to_string(),
            });
        };
        let rest = &self.input[self.pos..];
        let mut best: Option<(usize, usize)> = None;
        for &rule in &cond.rules {
            let Some(len) = self.spec.rules.get(rule).and_then(|r| r.match_len(rest)) else {
                continue;
            };
            if best.is_none_or(|(_, l)| len > l) {
                best = Some((rule, len));
            }
        }
        Ok(best)
    }

    fn consume(&mut self, len: usize) {
        let text = &self.input[self.pos..self.pos + len];
        let breaks = count_line_breaks(text);
        self.yylineno += breaks;

        let last_column = if breaks > 0 {
            let tail = text
                .rfind(['\n', '\r'])
                .map_or(text, |i| &text[i + 1..]);
            tail.chars().count()
        } else {
            self.yylloc.last_column + text.chars().count()
        };
        self.yylloc = Location {
            first_line: self.yylloc.last_line,
            last_line: self.yylineno + 1,
            first_column: self.yylloc.last_column,
            last_column,
            range: self
                .spec
                .options
                .ranges
                .then_some((self.pos, self.pos + len)),
        };

        self.yytext.push_str(text);
        self.yyleng = self.yytext.chars().count();
        self.pos += len;
        self.pending += len;
        self.last_match = len;
        self.more = false;
    }

    /// Runs the action of `rule`. Returns the token, if any, and the state
    /// changes it asked for.
    fn run_action(&mut self, rule: usize) -> (Option<Token>, Vec<Directive>) {
        let condition = self.top_state(0).to_string();
        if let Some(Some(callback)) = self.bound.get_mut(rule) {
            let mut scope = ActionScope {
                yytext: &mut self.yytext,
                yyleng: self.yyleng,
                yylineno: self.yylineno,
                yylloc: &self.yylloc,
                yy: &mut self.yy,
                rule,
                condition: &condition,
                directives: Vec::new(),
            };
            let token = callback(&mut scope);
            return (token, scope.directives);
        }

        let Some(entry) = self.spec.actions.get(rule) else {
            return (None, Vec::new());
        };
        let mut directives = Vec::new();
        for stmt in &entry.program {
            match stmt {
                Stmt::Return(token) => return (Some(token.clone()), directives),
                Stmt::ReturnText => return (Some(Token::Literal(self.yytext.clone())), directives),
                Stmt::Stop => break,
                Stmt::Begin(name) => directives.push(Directive::Begin(name.clone())),
                Stmt::PopState => directives.push(Directive::PopState),
                Stmt::More => directives.push(Directive::More),
                Stmt::Less(n) => directives.push(Directive::Less(*n)),
                Stmt::Echo => directives.push(Directive::Echo),
                Stmt::Trim { start, end } => {
                    let count = self.yyleng.saturating_sub(start + end);
                    self.yytext = self.yytext.chars().skip(*start).take(count).collect();
                    self.yyleng = self.yytext.chars().count();
                }
                Stmt::Opaque(text) => {
                    log::trace!("[scan] rule #{rule}: skipping uninterpreted `{text}`");
                }
            }
        }
        (None, directives)
    }

    fn apply(&mut self, rule: usize, directives: Vec<Directive>) -> Result<(), ScanError> {
        for d in directives {
            match d {
                Directive::Begin(name) => {
                    log::trace!("[scan] rule #{rule} enters {name}");
                    self.begin(name)?;
                }
                Directive::PopState => {
                    self.pop_state();
                }
                Directive::More => self.more = true,
                Directive::Less(n) => {
                    let start = self.pos - self.last_match;
                    let matched = &self.input[start..self.pos];
                    let keep = matched
                        .char_indices()
                        .nth(n)
                        .map_or(matched.len(), |(i, _)| i);
                    let back = matched.len() - keep;
                    self.pos -= back;
                    self.pending = self.pending.saturating_sub(back);
                    self.last_match = keep;
                    let cut = floor_char_boundary(&self.yytext, self.yytext.len().saturating_sub(back));
                    self.yytext.truncate(cut);
                    self.yyleng = self.yytext.chars().count();
                    if self.pos < self.input.len() {
                        self.done = false;
                    }
                }
                Directive::Echo => self.echoed.push_str(&self.yytext),
            }
        }
        Ok(())
    }

    /// One matching step. `Ok(None)` means a rule fired without producing a
    /// token; [`Scanner::lex`] keeps going in that case.
    pub fn next_step(&mut self) -> Result<Option<Token>, ScanError> {
        if self.done {
            return Ok(Some(Token::Eof));
        }
        if self.pos == self.input.len() {
            self.done = true;
        }
        if !self.more {
            self.yytext.clear();
            self.yyleng = 0;
            self.pending = 0;
        }

        let Some((rule, len)) = self.best_match()? else {
            if self.pos == self.input.len() {
                return Ok(Some(Token::Eof));
            }
            return Err(ScanError::Unrecognized {
                line: self.yylineno + 1,
                context: self.show_position(),
            });
        };

        let stack_before = self.condition_stack.clone();
        self.consume(len);
        log::trace!("[scan] rule #{rule} matched {:?}", self.yytext);

        let (token, directives) = self.run_action(rule);
        self.apply(rule, directives)?;
        if self.done && self.pos < self.input.len() {
            self.done = false;
        }

        if len == 0 && token.is_none() && !self.done && stack_before == self.condition_stack {
            return Err(ScanError::EmptyMatch { rule });
        }
        Ok(token)
    }

    /// Next token, or [`Token::Eof`] once the input is exhausted.
    pub fn lex(&mut self) -> Result<Token, ScanError> {
        loop {
            if let Some(token) = self.next_step()? {
                return Ok(token);
            }
        }
    }

    /// All tokens up to (not including) end of input.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ScanError> {
        let mut out = Vec::new();
        loop {
            match self.lex()? {
                Token::Eof => return Ok(out),
                token => out.push(token),
            }
        }
    }
}

impl Iterator for Scanner {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(Token::Eof) => None,
            Err(e) => {
                // Stop after the first error.
                self.done = true;
                self.pos = self.input.len();
                Some(Err(e))
            }
            other => Some(other),
        }
    }
}
