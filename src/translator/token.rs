/// Tokens produced by the lexer

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Number,
    Operator,
    StringLiteral,
    Comment,
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    /// Whitespace separated this token from the previous one
    pub spaced: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, spaced: bool) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            spaced,
        }
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    /// Identifier or keyword, the two kinds a word can lex as
    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword)
    }

    /// Tokens that carry no code: comments, line structure and end of input
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Comment
                | TokenKind::Newline
                | TokenKind::Indent
                | TokenKind::Dedent
                | TokenKind::Eof
        )
    }
}

/// Reassemble source-like text from a run of tokens, keeping a single space
/// wherever the source had whitespace
pub fn join_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.is_trivia() {
            continue;
        }
        if token.spaced && !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}
