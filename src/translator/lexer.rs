/// Lexer for the supported dialects
///
/// Produces a flat token stream in one pass. Comments and string literals are
/// always lexed as single tokens so that nothing downstream can mistake their
/// contents for code. Characters the lexer does not recognise become
/// single-character operators.

use crate::translator::dialect::Dialect;
use crate::translator::error::LexError;
use crate::translator::token::{Token, TokenKind};

/// Tokenize `source` according to the rules of `dialect`
pub fn tokenize(source: &str, dialect: Dialect) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, dialect).run()
}

const CSHARP_OPS: &[&str] = &[
    "??=", "<<=", ">>=", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "=>", "??", "?.", "::", "->",
];
const VB_OPS: &[&str] = &["<>", "<=", ">=", ":=", "&=", "+=", "-=", "*=", "/=", "<<", ">>"];
const PYTHON_OPS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "==", "!=", "<=", ">=", "**", "//", "->", "+=", "-=", "*=", "/=",
    "%=", ":=", "<<", ">>",
];
const DELPHI_OPS: &[&str] = &[":=", "<>", "<=", ">=", "..", "+=", "-="];

const PYTHON_STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

struct Lexer {
    dialect: Dialect,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
    spaced: bool,
    line_has_code: bool,
    // Python only
    bracket_depth: usize,
    at_line_start: bool,
    indent: String,
}

impl Lexer {
    fn new(source: &str, dialect: Dialect) -> Self {
        Lexer {
            dialect,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            spaced: false,
            line_has_code: false,
            bracket_depth: 0,
            at_line_start: true,
            indent: String::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            if self.dialect.uses_indentation() && self.at_line_start {
                self.at_line_start = false;
                self.lex_indentation();
            }

            let Some(c) = self.peek() else { break };
            match c {
                '\n' => self.lex_newline(),
                '\r' | '\u{feff}' => self.pos += 1,
                c if c.is_whitespace() => {
                    self.pos += 1;
                    self.spaced = true;
                }
                c => self.lex_token(c)?,
            }
        }

        if self.dialect.uses_indentation() && !self.indent.is_empty() {
            self.push(TokenKind::Dedent, String::new(), self.line);
        }
        self.push(TokenKind::Eof, String::new(), self.line);

        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// Consume one character, counting lines
    fn advance(&mut self) {
        if self.peek() == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn text_from(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn push(&mut self, kind: TokenKind, text: String, line: usize) {
        self.tokens.push(Token::new(kind, text, line, self.spaced));
        self.spaced = false;
        if !matches!(kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent) {
            self.line_has_code = true;
        }
    }

    fn lex_newline(&mut self) {
        let line = self.line;
        self.advance();
        self.line_has_code = false;

        if self.dialect.uses_indentation() && self.bracket_depth > 0 {
            // Implicit line joining inside brackets
            self.spaced = true;
            return;
        }

        self.spaced = false;
        self.push(TokenKind::Newline, "\n".to_string(), line);
        self.line_has_code = false;
        if self.dialect.uses_indentation() {
            self.at_line_start = true;
        }
    }

    /// Emit Indent/Dedent for a Python line whose leading whitespace differs
    /// from the previous code line. Blank and comment-only lines are ignored.
    fn lex_indentation(&mut self) {
        let start = self.pos;
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\x0c')) {
            self.pos += 1;
        }
        let ws: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '\x0c')
            .collect();

        if matches!(self.peek(), None | Some('\n') | Some('\r') | Some('#')) {
            return;
        }

        if ws != self.indent {
            let kind = if ws.len() < self.indent.len() {
                TokenKind::Dedent
            } else {
                TokenKind::Indent
            };
            self.push(kind, ws.clone(), self.line);
            self.indent = ws;
        }
    }

    fn lex_token(&mut self, c: char) -> Result<(), LexError> {
        let next = self.peek_at(1);

        match self.dialect {
            Dialect::CSharp => match (c, next) {
                ('/', Some('/')) => return Ok(self.lex_line_comment()),
                ('/', Some('*')) => return self.lex_block_comment("/*", "*/"),
                ('#', _) if !self.line_has_code => return Ok(self.lex_line_comment()),
                ('"', _) => return self.lex_escaped_string(0, '"'),
                ('\'', _) => return self.lex_escaped_string(0, '\''),
                ('@', Some('"')) => return self.lex_doubled_string(1, '"', true),
                ('$', Some('"')) => return self.lex_escaped_string(1, '"'),
                ('$', Some('@')) | ('@', Some('$')) if self.peek_at(2) == Some('"') => {
                    return self.lex_doubled_string(2, '"', true)
                }
                _ => {}
            },
            Dialect::VBNet => match c {
                '\'' | '\u{2018}' | '\u{2019}' => return Ok(self.lex_line_comment()),
                '"' => return self.lex_doubled_string(0, '"', false),
                _ => {}
            },
            Dialect::Python => match c {
                '#' => return Ok(self.lex_line_comment()),
                '"' | '\'' => return self.lex_python_string(self.pos, 0),
                '\\' if matches!(next, Some('\n') | Some('\r')) => {
                    // Explicit line continuation
                    self.pos += 1;
                    while self.peek() == Some('\r') {
                        self.pos += 1;
                    }
                    self.advance();
                    self.spaced = true;
                    return Ok(());
                }
                _ => {}
            },
            Dialect::Delphi => match (c, next) {
                ('/', Some('/')) => return Ok(self.lex_line_comment()),
                ('{', _) => return self.lex_block_comment("{", "}"),
                ('(', Some('*')) => return self.lex_block_comment("(*", "*)"),
                ('\'', _) => return self.lex_doubled_string(0, '\'', false),
                ('#', Some(d)) if d.is_ascii_digit() || d == '$' => {
                    let start = self.pos;
                    self.pos += 2;
                    while self.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
                        self.pos += 1;
                    }
                    let line = self.line;
                    let text = self.text_from(start);
                    self.push(TokenKind::StringLiteral, text, line);
                    return Ok(());
                }
                ('$', Some(d)) if d.is_ascii_hexdigit() => {
                    let start = self.pos;
                    self.pos += 1;
                    while self.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
                        self.pos += 1;
                    }
                    let line = self.line;
                    let text = self.text_from(start);
                    self.push(TokenKind::Number, text, line);
                    return Ok(());
                }
                _ => {}
            },
        }

        if c.is_alphabetic() || c == '_' {
            self.lex_word()
        } else if c.is_ascii_digit() {
            self.lex_number();
            Ok(())
        } else {
            self.lex_operator(c);
            Ok(())
        }
    }

    fn lex_line_comment(&mut self) {
        let start = self.pos;
        let line = self.line;
        while !matches!(self.peek(), None | Some('\n')) {
            self.pos += 1;
        }
        let text = self.text_from(start).trim_end().to_string();
        self.push(TokenKind::Comment, text, line);
    }

    fn lex_block_comment(&mut self, open: &str, close: &str) -> Result<(), LexError> {
        let start = self.pos;
        let line = self.line;
        self.pos += open.chars().count();

        loop {
            if self.starts_with(close) {
                self.pos += close.chars().count();
                break;
            }
            if self.peek().is_none() {
                return Err(LexError::new(line, "unterminated block comment"));
            }
            self.advance();
        }

        let text = self.text_from(start);
        self.push(TokenKind::Comment, text, line);
        Ok(())
    }

    /// String whose quote can be escaped with a backslash
    fn lex_escaped_string(&mut self, prefix_len: usize, quote: char) -> Result<(), LexError> {
        let start = self.pos;
        let line = self.line;
        self.pos += prefix_len + 1;

        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.unterminated(line, quote)),
                Some('\\') => {
                    self.pos += 1;
                    if self.peek().is_some() {
                        self.advance();
                    }
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }

        let text = self.text_from(start);
        self.push(TokenKind::StringLiteral, text, line);
        Ok(())
    }

    /// String whose quote is escaped by doubling it
    fn lex_doubled_string(
        &mut self,
        prefix_len: usize,
        quote: char,
        multiline: bool,
    ) -> Result<(), LexError> {
        let start = self.pos;
        let line = self.line;
        self.pos += prefix_len + 1;

        loop {
            match self.peek() {
                None => return Err(self.unterminated(line, quote)),
                Some('\n') if !multiline => return Err(self.unterminated(line, quote)),
                Some(c) if c == quote => {
                    if self.peek_at(1) == Some(quote) {
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        break;
                    }
                }
                Some(_) => self.advance(),
            }
        }

        let text = self.text_from(start);
        self.push(TokenKind::StringLiteral, text, line);
        Ok(())
    }

    /// Python string starting at `start`, whose first `prefix_len` characters
    /// are a prefix such as `r` or `f`
    fn lex_python_string(&mut self, start: usize, prefix_len: usize) -> Result<(), LexError> {
        let line = self.line;
        self.pos = start + prefix_len;
        let quote = self.peek().unwrap_or('"');
        let triple: String = std::iter::repeat(quote).take(3).collect();

        if self.starts_with(&triple) {
            self.pos += 3;
            loop {
                if self.starts_with(&triple) {
                    self.pos += 3;
                    break;
                }
                match self.peek() {
                    None => {
                        return Err(LexError::new(line, "unterminated triple-quoted string"))
                    }
                    Some('\\') => {
                        self.pos += 1;
                        if self.peek().is_some() {
                            self.advance();
                        }
                    }
                    Some(_) => self.advance(),
                }
            }
        } else {
            self.pos += 1;
            loop {
                match self.peek() {
                    None | Some('\n') => return Err(self.unterminated(line, quote)),
                    Some('\\') => {
                        self.pos += 1;
                        if self.peek().is_some() {
                            self.advance();
                        }
                    }
                    Some(c) if c == quote => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => self.pos += 1,
                }
            }
        }

        let text = self.text_from(start);
        self.push(TokenKind::StringLiteral, text, line);
        Ok(())
    }

    fn unterminated(&self, line: usize, quote: char) -> LexError {
        if quote == '\'' && self.dialect == Dialect::CSharp {
            LexError::new(line, "unterminated character literal")
        } else {
            LexError::new(line, "unterminated string literal")
        }
    }

    fn lex_word(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let line = self.line;
        while self
            .peek()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let mut word = self.text_from(start);

        match self.dialect {
            Dialect::VBNet if word == "_" && self.rest_of_line_is_blank() => {
                // ` _` line continuation: swallow the line break
                while !matches!(self.peek(), None | Some('\n')) {
                    self.pos += 1;
                }
                if self.peek().is_some() {
                    self.advance();
                }
                self.spaced = true;
                return Ok(());
            }
            Dialect::VBNet
                if word.eq_ignore_ascii_case("rem")
                    && self.peek().map_or(true, |c| c.is_whitespace()) =>
            {
                self.pos = start;
                self.lex_line_comment();
                return Ok(());
            }
            Dialect::Python
                if PYTHON_STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str())
                    && matches!(self.peek(), Some('"') | Some('\'')) =>
            {
                return self.lex_python_string(start, word.chars().count());
            }
            Dialect::Delphi
                if word.eq_ignore_ascii_case("end")
                    && self.peek() == Some('.')
                    && self.peek_at(1) != Some('.') =>
            {
                self.pos += 1;
                word.push('.');
            }
            _ => {}
        }

        let kind = if self.dialect.is_keyword(&word) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.push(kind, word, line);
        Ok(())
    }

    fn rest_of_line_is_blank(&self) -> bool {
        self.chars[self.pos..]
            .iter()
            .take_while(|c| **c != '\n')
            .all(|c| c.is_whitespace())
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let line = self.line;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else if c == '.' && self.peek_at(1).map_or(false, |d| d.is_ascii_digit()) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.text_from(start);
        self.push(TokenKind::Number, text, line);
    }

    fn lex_operator(&mut self, c: char) {
        let line = self.line;
        let ops = match self.dialect {
            Dialect::CSharp => CSHARP_OPS,
            Dialect::VBNet => VB_OPS,
            Dialect::Python => PYTHON_OPS,
            Dialect::Delphi => DELPHI_OPS,
        };

        if let Some(op) = ops.iter().find(|op| self.starts_with(op)) {
            self.pos += op.len();
            self.push(TokenKind::Operator, op.to_string(), line);
            return;
        }

        if self.dialect.uses_indentation() {
            match c {
                '(' | '[' | '{' => self.bracket_depth += 1,
                ')' | ']' | '}' => self.bracket_depth = self.bracket_depth.saturating_sub(1),
                _ => {}
            }
        }

        self.pos += 1;
        self.push(TokenKind::Operator, c.to_string(), line);
    }
}
