/// Expression and type spelling across dialects
///
/// Conditions, print arguments and type names are stored on statements in a
/// neutral spelling: C# operators, literals and primitive type names. The
/// emitter re-spells them for the target. Anything that is not a known
/// operator, literal or primitive passes through untouched.

use crate::translator::dialect::Dialect;
use crate::translator::lexer::tokenize;
use crate::translator::token::{Token, TokenKind};

/// Output fragment and whether whitespace precedes it
struct Piece {
    text: String,
    spaced: bool,
}

#[derive(Default)]
struct Pieces {
    items: Vec<Piece>,
    /// Spacing override for the next piece
    next_spacing: Option<bool>,
}

impl Pieces {
    fn push(&mut self, text: impl Into<String>, spaced: bool) {
        let spaced = self.next_spacing.take().unwrap_or(spaced);
        self.items.push(Piece {
            text: text.into(),
            spaced,
        });
    }

    fn glue_next(&mut self) {
        self.next_spacing = Some(false);
    }

    fn space_next(&mut self) {
        self.next_spacing = Some(true);
    }

    fn join(&self) -> String {
        let mut out = String::new();
        for piece in &self.items {
            if piece.spaced && !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&piece.text);
        }
        out
    }
}

// Expressions

/// Neutral spelling of an expression written in `source`
pub fn neutral_expr(tokens: &[Token], source: Dialect) -> String {
    let tokens: Vec<&Token> = tokens.iter().filter(|t| !t.is_trivia()).collect();
    let mut out = Pieces::default();
    let mut i = 0;

    while i < tokens.len() {
        let t = tokens[i];
        match t.kind {
            TokenKind::StringLiteral => out.push(neutral_string(&t.text, source), t.spaced),
            TokenKind::Operator => out.push(neutral_op(&t.text, source), t.spaced),
            TokenKind::Identifier | TokenKind::Keyword => {
                let lower = t.text.to_ascii_lowercase();
                let next_is_not = tokens
                    .get(i + 1)
                    .map_or(false, |n| n.text.eq_ignore_ascii_case("not"));
                if source == Dialect::Python && lower == "is" && next_is_not {
                    out.push("!=", t.spaced);
                    i += 1;
                } else {
                    match neutral_word(&t.text, source) {
                        Some("!") => {
                            out.push("!", t.spaced);
                            out.glue_next();
                        }
                        Some(word) => out.push(word, t.spaced),
                        None => out.push(t.text.clone(), t.spaced),
                    }
                }
            }
            _ => out.push(t.text.clone(), t.spaced),
        }
        i += 1;
    }
    out.join()
}

/// Spell a neutral expression for `target`
pub fn render_expr(neutral: &str, target: Dialect) -> String {
    if target == Dialect::CSharp {
        return neutral.to_string();
    }
    let Some(tokens) = neutral_tokens(neutral) else {
        return neutral.to_string();
    };

    let mut out = Pieces::default();
    for t in tokens.iter().filter(|t| !t.is_trivia()) {
        match t.kind {
            TokenKind::StringLiteral => out.push(render_string(&t.text, target), t.spaced),
            TokenKind::Operator => match render_op(&t.text, target) {
                Some((word, true)) => {
                    // prefix `!` keeps its own spacing, binary words are spaced
                    out.push(word, t.spaced || t.text != "!");
                    out.space_next();
                }
                Some((symbol, false)) => out.push(symbol, t.spaced),
                None => out.push(t.text.clone(), t.spaced),
            },
            TokenKind::Identifier | TokenKind::Keyword => {
                let word = render_word(&t.text, target).unwrap_or(t.text.as_str());
                out.push(word.to_string(), t.spaced);
            }
            _ => out.push(t.text.clone(), t.spaced),
        }
    }
    out.join()
}

/// Lex a neutral fragment. `None` when it does not survive as plain C#
/// tokens, for example a Delphi `#13` that would lex as a directive.
fn neutral_tokens(neutral: &str) -> Option<Vec<Token>> {
    let tokens = tokenize(neutral, Dialect::CSharp).ok()?;
    if tokens.iter().any(|t| t.kind == TokenKind::Comment) {
        return None;
    }
    Some(tokens)
}

fn neutral_op(op: &str, source: Dialect) -> String {
    let mapped = match (source, op) {
        (Dialect::VBNet | Dialect::Delphi, "=") => "==",
        (Dialect::VBNet | Dialect::Delphi, "<>") => "!=",
        (Dialect::VBNet, "&") => "+",
        (Dialect::VBNet, "\\") => "/",
        _ => op,
    };
    mapped.to_string()
}

fn neutral_word(word: &str, source: Dialect) -> Option<&'static str> {
    let lower = word.to_ascii_lowercase();
    match source {
        Dialect::CSharp => None,
        Dialect::VBNet => match lower.as_str() {
            "andalso" | "and" => Some("&&"),
            "orelse" | "or" => Some("||"),
            "not" => Some("!"),
            "mod" => Some("%"),
            "xor" => Some("^"),
            "is" => Some("=="),
            "isnot" => Some("!="),
            "true" => Some("true"),
            "false" => Some("false"),
            "nothing" => Some("null"),
            "me" => Some("this"),
            _ => None,
        },
        // Python is case-sensitive: `none` is an ordinary name
        Dialect::Python => match word {
            "and" => Some("&&"),
            "or" => Some("||"),
            "not" => Some("!"),
            "is" => Some("=="),
            "True" => Some("true"),
            "False" => Some("false"),
            "None" => Some("null"),
            "self" => Some("this"),
            _ => None,
        },
        Dialect::Delphi => match lower.as_str() {
            "and" => Some("&&"),
            "or" => Some("||"),
            "not" => Some("!"),
            "mod" => Some("%"),
            "div" => Some("/"),
            "xor" => Some("^"),
            "nil" => Some("null"),
            "true" => Some("true"),
            "false" => Some("false"),
            "self" => Some("this"),
            _ => None,
        },
    }
}

/// Replacement for a neutral operator, and whether it is spelled as a word
fn render_op(op: &str, target: Dialect) -> Option<(&'static str, bool)> {
    let word = match (target, op) {
        (Dialect::VBNet, "&&") => Some("AndAlso"),
        (Dialect::VBNet, "||") => Some("OrElse"),
        (Dialect::VBNet, "!") => Some("Not"),
        (Dialect::VBNet, "%") => Some("Mod"),
        (Dialect::Python, "&&") => Some("and"),
        (Dialect::Python, "||") => Some("or"),
        (Dialect::Python, "!") => Some("not"),
        (Dialect::Delphi, "&&") => Some("and"),
        (Dialect::Delphi, "||") => Some("or"),
        (Dialect::Delphi, "!") => Some("not"),
        (Dialect::Delphi, "%") => Some("mod"),
        _ => None,
    };
    if let Some(word) = word {
        return Some((word, true));
    }
    match (target, op) {
        (Dialect::VBNet | Dialect::Delphi, "==") => Some(("=", false)),
        (Dialect::VBNet | Dialect::Delphi, "!=") => Some(("<>", false)),
        _ => None,
    }
}

fn render_word(word: &str, target: Dialect) -> Option<&'static str> {
    match (target, word) {
        (Dialect::VBNet, "true") => Some("True"),
        (Dialect::VBNet, "false") => Some("False"),
        (Dialect::VBNet, "null") => Some("Nothing"),
        (Dialect::VBNet, "this") => Some("Me"),
        (Dialect::Python, "true") => Some("True"),
        (Dialect::Python, "false") => Some("False"),
        (Dialect::Python, "null") => Some("None"),
        (Dialect::Python, "this") => Some("self"),
        (Dialect::Delphi, "true") => Some("True"),
        (Dialect::Delphi, "false") => Some("False"),
        (Dialect::Delphi, "null") => Some("nil"),
        (Dialect::Delphi, "this") => Some("Self"),
        _ => None,
    }
}

// String literals

fn escape_c(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Undo the escapes that have a doubled-quote equivalent. Other backslash
/// sequences stay as written.
fn unescape_c(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next @ ('\\' | '"' | '\'')) => {
                    out.push(next);
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

fn strip_quotes(text: &str, prefix: usize) -> Option<&str> {
    if text.len() < prefix + 2 {
        return None;
    }
    text.get(prefix..text.len() - 1)?.get(1..)
}

fn neutral_string(text: &str, source: Dialect) -> String {
    let converted = match source {
        Dialect::CSharp if text.starts_with("@\"") => {
            strip_quotes(text, 1).map(|inner| escape_c(&inner.replace("\"\"", "\"")))
        }
        Dialect::VBNet if text.starts_with('"') => {
            strip_quotes(text, 0).map(|inner| escape_c(&inner.replace("\"\"", "\"")))
        }
        Dialect::Delphi if text.starts_with('\'') => {
            strip_quotes(text, 0).map(|inner| escape_c(&inner.replace("''", "'")))
        }
        Dialect::Python if text.starts_with('\'') && !text.starts_with("'''") => {
            strip_quotes(text, 0).map(|inner| escape_c(&unescape_c(inner)))
        }
        _ => None,
    };
    converted.unwrap_or_else(|| text.to_string())
}

fn render_string(text: &str, target: Dialect) -> String {
    let converted = match target {
        Dialect::VBNet if text.starts_with('"') => {
            strip_quotes(text, 0)
                .map(|inner| format!("\"{}\"", unescape_c(inner).replace('"', "\"\"")))
        }
        Dialect::VBNet if text.starts_with('\'') => {
            strip_quotes(text, 0)
                .map(|inner| format!("\"{}\"c", unescape_c(inner).replace('"', "\"\"")))
        }
        Dialect::Delphi if text.starts_with('"') => {
            strip_quotes(text, 0)
                .map(|inner| format!("'{}'", unescape_c(inner).replace('\'', "''")))
        }
        _ => None,
    };
    converted.unwrap_or_else(|| text.to_string())
}

// Types

const VB_TYPES: &[(&str, &str)] = &[
    ("Integer", "int"),
    ("Long", "long"),
    ("Short", "short"),
    ("Byte", "byte"),
    ("Boolean", "bool"),
    ("String", "string"),
    ("Double", "double"),
    ("Single", "float"),
    ("Decimal", "decimal"),
    ("Char", "char"),
    ("Object", "object"),
    ("Date", "DateTime"),
    ("UInteger", "uint"),
];

const PYTHON_TYPES: &[(&str, &str)] = &[
    ("int", "int"),
    ("str", "string"),
    ("bool", "bool"),
    ("float", "double"),
    ("object", "object"),
    ("None", "void"),
];

const DELPHI_TYPES: &[(&str, &str)] = &[
    ("Integer", "int"),
    ("Int64", "long"),
    ("SmallInt", "short"),
    ("Byte", "byte"),
    ("Boolean", "bool"),
    ("string", "string"),
    ("Double", "double"),
    ("Single", "float"),
    ("Currency", "decimal"),
    ("Char", "char"),
    ("TObject", "object"),
    ("Cardinal", "uint"),
];

/// Extra spellings accepted from a source but never produced for a target
const PYTHON_EXTRA: &[(&str, &str)] = &[("long", "long"), ("char", "char"), ("decimal", "decimal")];
const DELPHI_EXTRA: &[(&str, &str)] = &[("Extended", "double"), ("Real", "double")];

fn type_table(dialect: Dialect) -> &'static [(&'static str, &'static str)] {
    match dialect {
        Dialect::CSharp => &[],
        Dialect::VBNet => VB_TYPES,
        Dialect::Python => PYTHON_TYPES,
        Dialect::Delphi => DELPHI_TYPES,
    }
}

fn neutral_type_word(word: &str, source: Dialect) -> Option<&'static str> {
    let extra: &[(&str, &str)] = match source {
        Dialect::Python => PYTHON_EXTRA,
        Dialect::Delphi => DELPHI_EXTRA,
        _ => &[],
    };
    type_table(source)
        .iter()
        .chain(extra)
        .find(|(spelled, _)| {
            if source.case_insensitive() {
                spelled.eq_ignore_ascii_case(word)
            } else {
                *spelled == word
            }
        })
        .map(|(_, neutral)| *neutral)
}

fn render_type_word(neutral: &str, target: Dialect) -> Option<&'static str> {
    let fallback: &[(&str, &str)] = match target {
        Dialect::Python => &[
            ("long", "int"),
            ("short", "int"),
            ("byte", "int"),
            ("uint", "int"),
            ("char", "str"),
            ("decimal", "float"),
            ("float", "float"),
        ],
        _ => &[],
    };
    type_table(target)
        .iter()
        .find(|(_, n)| *n == neutral)
        .map(|(spelled, _)| *spelled)
        .or_else(|| fallback.iter().find(|(n, _)| *n == neutral).map(|(_, s)| *s))
}

/// Neutral spelling of a type written in `source`
pub fn neutral_type(tokens: &[Token], source: Dialect) -> String {
    let tokens: Vec<&Token> = tokens.iter().filter(|t| !t.is_trivia()).collect();
    let mut out = Pieces::default();
    let mut generic_parens = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let t = tokens[i];
        let next = tokens.get(i + 1);
        match source {
            // `array of T` becomes `T[]`
            Dialect::Delphi if t.text.eq_ignore_ascii_case("array")
                && next.map_or(false, |n| n.text.eq_ignore_ascii_case("of")) =>
            {
                let element = neutral_type(
                    &tokens[i + 2..].iter().map(|t| (*t).clone()).collect::<Vec<_>>(),
                    source,
                );
                out.push(format!("{}[]", element), t.spaced);
                break;
            }
            Dialect::VBNet if t.is_op("(") => {
                let is_generic = next.map_or(false, |n| n.text.eq_ignore_ascii_case("of"));
                if is_generic {
                    out.push("<", false);
                    out.glue_next();
                    generic_parens.push(true);
                    i += 2;
                    continue;
                }
                if next.map_or(false, |n| n.is_op(")")) {
                    out.push("[]", false);
                    i += 2;
                    continue;
                }
                generic_parens.push(false);
                out.push("(", t.spaced);
            }
            Dialect::VBNet if t.is_op(")") => {
                let closer = if generic_parens.pop() == Some(true) { ">" } else { ")" };
                out.push(closer, false);
            }
            Dialect::Python if t.is_op("[") => out.push("<", false),
            Dialect::Python if t.is_op("]") => out.push(">", false),
            _ if t.is_word() => {
                let word = neutral_type_word(&t.text, source).unwrap_or(t.text.as_str());
                out.push(word.to_string(), t.spaced);
            }
            _ => out.push(t.text.clone(), t.spaced),
        }
        i += 1;
    }
    out.join()
}

/// Spell a neutral type for `target`
pub fn render_type(neutral: &str, target: Dialect) -> String {
    if target == Dialect::CSharp {
        return neutral.to_string();
    }
    if let Some(element) = neutral.strip_suffix("[]") {
        let element = render_type(element, target);
        return match target {
            Dialect::VBNet => format!("{}()", element),
            Dialect::Python => format!("list[{}]", element),
            _ => format!("array of {}", element),
        };
    }
    let Some(tokens) = neutral_tokens(neutral) else {
        return neutral.to_string();
    };

    let mut out = Pieces::default();
    for t in tokens.iter().filter(|t| !t.is_trivia()) {
        match (target, t.text.as_str()) {
            (Dialect::VBNet, "<") => {
                out.push("(Of", false);
                out.space_next();
            }
            (Dialect::VBNet, ">") => out.push(")", false),
            (Dialect::Python, "<") => out.push("[", false),
            (Dialect::Python, ">") => out.push("]", false),
            _ if t.is_word() => {
                let word = render_type_word(&t.text, target).unwrap_or(t.text.as_str());
                out.push(word.to_string(), t.spaced);
            }
            _ => out.push(t.text.clone(), t.spaced),
        }
    }
    out.join()
}
