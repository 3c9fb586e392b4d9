/// Cuts a token stream into statement windows
///
/// Each window is the bounded run of tokens the classifier looks at for one
/// statement, together with every token the block tracker has to see while
/// that statement is consumed. Comments that trail code are split off into
/// their own windows and follow the statement they were attached to.

use std::collections::VecDeque;

use crate::translator::dialect::Dialect;
use crate::translator::token::{join_tokens, Token, TokenKind};

/// How a window ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// `;` at the top level, included in the window
    Semicolon,
    /// End of a VB.NET or Python logical line
    LineEnd,
    /// A block-opening token (`{`, `begin`, `try`) consumed after the window
    BlockOpen(String),
    /// A closing token (`}`, `end`) that forms the window by itself
    BlockClose,
    /// A Delphi section keyword such as `var` or `private`
    Section,
    /// The window contains its own opener (`case x of`, `TFoo = class`)
    Inline,
    /// A C# property accessor list `{ get; set; }` closed the window
    GroupEnd,
    /// Cut short by a closing token that belongs to the next window
    Flush,
    /// A standalone comment
    Comment,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Significant tokens, without the block-opening terminator
    pub tokens: Vec<Token>,
    /// Every token consumed for this window, in the order the tracker sees them
    pub feed: Vec<Token>,
    pub terminator: Terminator,
    pub line: usize,
}

impl Window {
    /// A window over `tokens` whose feed is the tokens themselves
    pub fn from_tokens(tokens: Vec<Token>, terminator: Terminator) -> Self {
        let line = tokens.first().map_or(0, |t| t.line);
        Window {
            feed: tokens.clone(),
            tokens,
            terminator,
            line,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn text(&self) -> String {
        match self.tokens.as_slice() {
            [only] if only.kind == TokenKind::Comment => only.text.clone(),
            tokens => join_tokens(tokens),
        }
    }

    /// Text of the consumed block opener, if the window ended with one
    pub fn opener(&self) -> Option<&str> {
        match &self.terminator {
            Terminator::BlockOpen(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Statement(Window),
    /// A Python Indent/Dedent token at the start of a line
    Layout(Token),
}

const DELPHI_SECTIONS: &[&str] = &[
    "type", "var", "const", "interface", "implementation", "initialization", "finalization",
    "private", "public", "protected", "published", "strict", "repeat", "except", "finally",
    "label", "resourcestring", "threadvar",
];

const DELPHI_ROUTINES: &[&str] = &["procedure", "function", "constructor", "destructor"];

const DELPHI_DIRECTIVES: &[&str] = &[
    "override", "overload", "virtual", "dynamic", "abstract", "reintroduce", "static", "inline",
    "stdcall", "cdecl", "register", "pascal", "safecall", "forward", "external", "message",
    "final", "deprecated", "platform", "assembler",
];

const CSHARP_ACCESSORS: &[&str] = &["get", "set", "init", "add", "remove"];
const CSHARP_ACCESSOR_MODIFIERS: &[&str] = &["private", "protected", "internal", "public"];

#[derive(Default)]
struct Builder {
    tokens: Vec<Token>,
    feed: Vec<Token>,
    deferred: Vec<Token>,
}

impl Builder {
    fn push(&mut self, token: &Token) {
        self.tokens.push(token.clone());
        self.feed.push(token.clone());
    }

    fn defer(&mut self, token: &Token) {
        self.deferred.push(token.clone());
        self.feed.push(token.clone());
    }
}

pub struct Segmenter<'a> {
    tokens: &'a [Token],
    pos: usize,
    dialect: Dialect,
    pending: VecDeque<Segment>,
    done: bool,
}

impl<'a> Segmenter<'a> {
    pub fn new(tokens: &'a [Token], dialect: Dialect) -> Self {
        Segmenter {
            tokens,
            pos: 0,
            dialect,
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn finish(&mut self, builder: Builder, terminator: Terminator) -> Segment {
        let line = builder
            .tokens
            .first()
            .or_else(|| builder.feed.first())
            .map_or(0, |t| t.line);

        for comment in builder.deferred {
            self.pending.push_back(Segment::Statement(Window::from_tokens(
                vec![comment],
                Terminator::Comment,
            )));
        }

        Segment::Statement(Window {
            tokens: builder.tokens,
            feed: builder.feed,
            terminator,
            line,
        })
    }

    fn finish_eof(&mut self, mut builder: Builder) -> Segment {
        if let Some(eof) = self.tokens.get(self.pos) {
            builder.feed.push(eof.clone());
        }
        self.pos = self.tokens.len();
        self.done = true;
        self.finish(builder, Terminator::Eof)
    }

    fn comment_window(&mut self, token: &Token) -> Segment {
        self.pos += 1;
        Segment::Statement(Window::from_tokens(vec![token.clone()], Terminator::Comment))
    }

    /// Index of the next token that is not a newline or comment, from `from`
    fn next_significant(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| {
            !matches!(self.tokens[i].kind, TokenKind::Newline | TokenKind::Comment)
        })
    }

    fn next_significant_token(&self, from: usize) -> Option<&'a Token> {
        self.next_significant(from).map(|i| &self.tokens[i])
    }

    /// One window per logical line (VB.NET, Python)
    fn next_line(&mut self) -> Segment {
        let mut b = Builder::default();
        loop {
            let Some(tok) = self.tokens.get(self.pos) else {
                return self.finish_eof(b);
            };
            match tok.kind {
                TokenKind::Eof => return self.finish_eof(b),
                TokenKind::Newline => {
                    b.feed.push(tok.clone());
                    self.pos += 1;
                    return self.finish(b, Terminator::LineEnd);
                }
                TokenKind::Indent | TokenKind::Dedent if b.feed.is_empty() => {
                    self.pos += 1;
                    return Segment::Layout(tok.clone());
                }
                TokenKind::Comment if !b.tokens.is_empty() => b.defer(tok),
                _ => b.push(tok),
            }
            self.pos += 1;
        }
    }

    /// C# windows: statements end at `;`, `{` or `}`
    fn next_brace(&mut self) -> Segment {
        let mut b = Builder::default();
        let mut paren = 0usize;
        let mut inline = 0usize;
        let mut accessor_group = false;

        loop {
            let Some(tok) = self.tokens.get(self.pos) else {
                return self.finish_eof(b);
            };
            match tok.kind {
                TokenKind::Eof => return self.finish_eof(b),
                TokenKind::Newline => {
                    self.pos += 1;
                    continue;
                }
                TokenKind::Comment => {
                    if b.tokens.is_empty() && paren == 0 && inline == 0 {
                        return self.comment_window(tok);
                    }
                    b.defer(tok);
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            if tok.is_op("(") || tok.is_op("[") {
                paren += 1;
            } else if tok.is_op(")") || tok.is_op("]") {
                paren = paren.saturating_sub(1);
            } else if tok.is_op("{") {
                if inline > 0 || paren > 0 {
                    inline += 1;
                } else if self.is_accessor_list(self.pos) {
                    inline = 1;
                    accessor_group = true;
                } else if opens_expression(&b.tokens) {
                    inline = 1;
                } else {
                    b.feed.push(tok.clone());
                    self.pos += 1;
                    return self.finish(b, Terminator::BlockOpen("{".to_string()));
                }
            } else if tok.is_op("}") {
                if inline > 0 {
                    inline -= 1;
                    b.push(tok);
                    self.pos += 1;
                    let ends_property = inline == 0
                        && paren == 0
                        && accessor_group
                        && !self.next_significant_token(self.pos).map_or(false, |t| t.is_op("="));
                    if ends_property {
                        return self.finish(b, Terminator::GroupEnd);
                    }
                    continue;
                } else if paren == 0 {
                    if !b.tokens.is_empty() {
                        return self.finish(b, Terminator::Flush);
                    }
                    b.push(tok);
                    self.pos += 1;
                    // `};` closes the block and the statement together
                    if self.tokens.get(self.pos).map_or(false, |t| t.is_op(";")) {
                        b.push(&self.tokens[self.pos]);
                        self.pos += 1;
                    }
                    return self.finish(b, Terminator::BlockClose);
                }
            } else if tok.is_op(";") && paren == 0 && inline == 0 {
                b.push(tok);
                self.pos += 1;
                return self.finish(b, Terminator::Semicolon);
            }

            b.push(tok);
            self.pos += 1;
        }
    }

    /// `{ get; set; }` and friends: the brace at `at` opens an accessor list
    fn is_accessor_list(&self, at: usize) -> bool {
        let mut i = at + 1;
        while let Some(idx) = self.next_significant(i) {
            let t = &self.tokens[idx];
            if t.is_word() && CSHARP_ACCESSOR_MODIFIERS.contains(&t.text.as_str()) {
                i = idx + 1;
                continue;
            }
            if !(t.is_word() && CSHARP_ACCESSORS.contains(&t.text.as_str())) {
                return false;
            }
            return self
                .next_significant_token(idx + 1)
                .map_or(false, |n| n.is_op(";") || n.is_op("{") || n.is_op("=>"));
        }
        false
    }

    /// Delphi windows: statements end at `;`, block keywords or `end`
    fn next_delphi(&mut self) -> Segment {
        let mut b = Builder::default();
        let mut paren = 0usize;

        loop {
            let Some(tok) = self.tokens.get(self.pos) else {
                return self.finish_eof(b);
            };
            match tok.kind {
                TokenKind::Eof => return self.finish_eof(b),
                TokenKind::Newline => {
                    self.pos += 1;
                    continue;
                }
                TokenKind::Comment => {
                    if b.tokens.is_empty() && paren == 0 {
                        return self.comment_window(tok);
                    }
                    b.defer(tok);
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }

            if paren == 0 && tok.kind == TokenKind::Keyword {
                let word = tok.text.to_ascii_lowercase();

                if b.tokens.is_empty() && DELPHI_SECTIONS.contains(&word.as_str()) {
                    b.push(tok);
                    self.pos += 1;
                    if word == "strict" {
                        if let Some(next) = self.tokens.get(self.pos) {
                            if next.is_word() {
                                b.push(next);
                                self.pos += 1;
                            }
                        }
                    }
                    return self.finish(b, Terminator::Section);
                }

                match word.as_str() {
                    "begin" | "try" | "asm" => {
                        b.feed.push(tok.clone());
                        self.pos += 1;
                        return self.finish(b, Terminator::BlockOpen(tok.text.clone()));
                    }
                    "end" | "end." => {
                        if !b.tokens.is_empty() {
                            return self.finish(b, Terminator::Flush);
                        }
                        b.push(tok);
                        self.pos += 1;
                        if word == "end" {
                            if let Some(next) = self.tokens.get(self.pos) {
                                if next.is_op(";") || next.is_op(".") {
                                    b.push(next);
                                    self.pos += 1;
                                }
                            }
                        }
                        return self.finish(b, Terminator::BlockClose);
                    }
                    "of" if first_word_is(&b.tokens, "case") => {
                        b.push(tok);
                        self.pos += 1;
                        return self.finish(b, Terminator::Inline);
                    }
                    "class" | "interface" | "record" if opens_type_body(&b.tokens, &word) => {
                        b.push(tok);
                        self.pos += 1;
                        if let Some(segment) = self.finish_type_header(&mut b) {
                            return segment;
                        }
                        continue;
                    }
                    _ => {}
                }
            }

            if tok.is_op("(") || tok.is_op("[") {
                paren += 1;
            } else if tok.is_op(")") || tok.is_op("]") {
                paren = paren.saturating_sub(1);
            } else if tok.is_op(";") && paren == 0 {
                b.push(tok);
                self.pos += 1;
                if is_routine_header(&b.tokens) {
                    return self.finish_routine_header(b);
                }
                return self.finish(b, Terminator::Semicolon);
            }

            b.push(tok);
            self.pos += 1;
        }
    }

    /// After `TFoo = class`: decide whether the type body starts here.
    /// Forward declarations (`class;`, `class of`, `class(TBase);`) keep going
    /// to their semicolon.
    fn finish_type_header(&mut self, b: &mut Builder) -> Option<Segment> {
        let next = self.next_significant(self.pos)?;
        let tok = &self.tokens[next];
        if tok.is_op(";") || (tok.is_word() && tok.text.eq_ignore_ascii_case("of")) {
            return None;
        }

        if tok.is_op("(") {
            let mut depth = 0usize;
            while let Some(t) = self.tokens.get(self.pos) {
                if t.kind == TokenKind::Eof {
                    break;
                }
                self.pos += 1;
                if t.kind == TokenKind::Comment {
                    b.defer(t);
                    continue;
                }
                if t.kind != TokenKind::Newline {
                    b.push(t);
                }
                if t.is_op("(") {
                    depth += 1;
                } else if t.is_op(")") {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
            }
            if self.next_significant_token(self.pos).map_or(false, |t| t.is_op(";")) {
                return None;
            }
        }

        Some(self.finish(std::mem::take(b), Terminator::Inline))
    }

    /// A routine header just ended with `;`. Absorb trailing directives and,
    /// when the body follows, its local sections and `begin`.
    fn finish_routine_header(&mut self, mut b: Builder) -> Segment {
        let mut is_forward = false;

        while let Some(idx) = self.next_significant(self.pos) {
            let t = &self.tokens[idx];
            let word = t.text.to_ascii_lowercase();
            if !(t.is_word() && DELPHI_DIRECTIVES.contains(&word.as_str())) {
                break;
            }
            is_forward |= word == "forward" || word == "external";
            for t in &self.tokens[self.pos..idx] {
                if t.kind == TokenKind::Comment {
                    b.defer(t);
                }
            }
            self.pos = idx;
            while let Some(t) = self.tokens.get(self.pos) {
                if t.kind == TokenKind::Eof {
                    break;
                }
                self.pos += 1;
                if t.kind == TokenKind::Comment {
                    b.defer(t);
                } else if t.kind != TokenKind::Newline {
                    b.push(t);
                }
                if t.is_op(";") {
                    break;
                }
            }
        }

        if is_forward {
            return self.finish(b, Terminator::Semicolon);
        }

        let Some(body_start) = self.find_routine_begin(self.pos) else {
            return self.finish(b, Terminator::Semicolon);
        };

        let sections = &self.tokens[self.pos..body_start];
        b.feed.push(self.tokens[body_start].clone());
        let opener = self.tokens[body_start].text.clone();
        self.pos = body_start + 1;

        let segment = self.finish(b, Terminator::BlockOpen(opener));
        for window in split_sections(sections) {
            self.pending.push_back(Segment::Statement(window));
        }
        segment
    }

    /// Index of the `begin` that starts a routine body at `from`, skipping
    /// local `var`/`const`/`type`/`label` sections
    fn find_routine_begin(&self, from: usize) -> Option<usize> {
        let first = self.next_significant(from)?;
        let tok = &self.tokens[first];
        if tok.kind != TokenKind::Keyword {
            return None;
        }
        let word = tok.text.to_ascii_lowercase();
        if word == "begin" {
            return Some(first);
        }
        if !matches!(word.as_str(), "var" | "const" | "type" | "label") {
            return None;
        }

        let mut paren = 0usize;
        for (i, t) in self.tokens.iter().enumerate().skip(first) {
            if t.is_op("(") {
                paren += 1;
            } else if t.is_op(")") {
                paren = paren.saturating_sub(1);
            }
            if paren > 0 || t.kind != TokenKind::Keyword {
                if t.kind == TokenKind::Eof {
                    return None;
                }
                continue;
            }
            match t.text.to_ascii_lowercase().as_str() {
                "begin" => return Some(i),
                "end" | "end." | "implementation" | "procedure" | "function" | "constructor"
                | "destructor" | "class" | "record" => return None,
                _ => {}
            }
        }
        None
    }
}

impl<'a> Iterator for Segmenter<'a> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if let Some(segment) = self.pending.pop_front() {
            return Some(segment);
        }
        if self.done {
            return None;
        }
        let segment = match self.dialect {
            Dialect::CSharp => self.next_brace(),
            Dialect::Delphi => self.next_delphi(),
            Dialect::VBNet | Dialect::Python => self.next_line(),
        };
        Some(segment)
    }
}

fn first_word_is(tokens: &[Token], word: &str) -> bool {
    tokens
        .first()
        .map_or(false, |t| t.is_word() && t.text.eq_ignore_ascii_case(word))
}

/// `= class`, `= interface`, `= record`, `= packed record`
fn opens_type_body(tokens: &[Token], word: &str) -> bool {
    match tokens.last() {
        Some(prev) if prev.is_op("=") => true,
        Some(prev) if word == "record" => prev.text.eq_ignore_ascii_case("packed"),
        _ => false,
    }
}

fn is_routine_header(tokens: &[Token]) -> bool {
    let mut words = tokens.iter().filter(|t| t.is_word());
    let first = match words.next() {
        Some(t) if t.text.eq_ignore_ascii_case("class") => words.next(),
        other => other,
    };
    first.map_or(false, |t| {
        DELPHI_ROUTINES.contains(&t.text.to_ascii_lowercase().as_str())
    })
}

/// A `{` after these opens an expression (initializer, lambda body, switch
/// expression) rather than a statement block
fn opens_expression(tokens: &[Token]) -> bool {
    let mut paren = 0usize;
    for (i, t) in tokens.iter().enumerate() {
        if t.is_op("(") || t.is_op("[") {
            paren += 1;
        } else if t.is_op(")") || t.is_op("]") {
            paren = paren.saturating_sub(1);
        } else if paren == 0 {
            if t.is_op("=") || t.is_op("=>") {
                return true;
            }
            if t.kind == TokenKind::Keyword && matches!(t.text.as_str(), "new" | "return") {
                return true;
            }
            if i > 0 && t.kind == TokenKind::Keyword && t.text == "switch" {
                return true;
            }
            if i > 0 && t.kind == TokenKind::Identifier && t.text == "with" {
                return true;
            }
        }
    }
    false
}

/// Split the local declaration sections of a Delphi routine into windows
fn split_sections(tokens: &[Token]) -> Vec<Window> {
    let mut windows = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut paren = 0usize;

    for t in tokens {
        match t.kind {
            TokenKind::Newline => continue,
            TokenKind::Comment => {
                windows.push(Window::from_tokens(vec![t.clone()], Terminator::Comment));
                continue;
            }
            _ => {}
        }
        if current.is_empty()
            && t.kind == TokenKind::Keyword
            && matches!(t.text.to_ascii_lowercase().as_str(), "var" | "const" | "type" | "label")
        {
            windows.push(Window::from_tokens(vec![t.clone()], Terminator::Section));
            continue;
        }
        if t.is_op("(") {
            paren += 1;
        } else if t.is_op(")") {
            paren = paren.saturating_sub(1);
        }
        current.push(t.clone());
        if t.is_op(";") && paren == 0 {
            windows.push(Window::from_tokens(std::mem::take(&mut current), Terminator::Semicolon));
        }
    }
    if !current.is_empty() {
        windows.push(Window::from_tokens(current, Terminator::Semicolon));
    }
    windows
}
