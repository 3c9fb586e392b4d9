/// Statement classification
///
/// Every window is matched against an ordered table of rules, one per
/// statement kind. The first rule that recognizes the window wins; anything
/// no rule recognizes is kept verbatim as `Raw`. Rules are written so that at
/// most one of them can match a given window.

use crate::translator::ast::{
    encode_params, Param, StatementKind, StatementNode, ARGUMENT_EXPR, CONDITION_EXPR, NAME,
    INITIALIZER, OPENER, PARAMS, RETURNS_VOID, RETURN_TYPE, TEXT, TYPE,
};
use crate::translator::blocks::{VB_END_TARGETS, VB_MODIFIERS};
use crate::translator::dialect::Dialect;
use crate::translator::expr::{neutral_expr, neutral_type};
use crate::translator::segment::{Terminator, Window};
use crate::translator::token::{Token, TokenKind};

type Rule = fn(&Window, Dialect) -> Option<StatementNode>;

const RULES: &[(StatementKind, Rule)] = &[
    (StatementKind::Comment, comment),
    (StatementKind::BlockEnd, block_end),
    (StatementKind::ElseBranch, else_branch),
    (StatementKind::IfStart, if_start),
    (StatementKind::ClassDecl, class_decl),
    (StatementKind::MethodDecl, method_decl),
    (StatementKind::PropertyDecl, property_decl),
    (StatementKind::PrintCall, print_call),
];

const CSHARP_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "virtual", "override", "abstract",
    "sealed", "async", "extern", "unsafe", "partial", "readonly",
];

const CSHARP_TYPE_KEYWORDS: &[&str] = &[
    "bool", "byte", "char", "decimal", "double", "float", "int", "long", "object", "sbyte",
    "short", "string", "uint", "ulong", "ushort", "void",
];

const CSHARP_PARAM_MODIFIERS: &[&str] = &["this", "ref", "out", "in", "params", "scoped"];
const CSHARP_ACCESSOR_WORDS: &[&str] = &["get", "set", "init", "private", "protected", "internal"];

const DELPHI_ROUTINES: &[&str] = &["procedure", "function", "constructor", "destructor"];
const DELPHI_PROPERTY_SPECIFIERS: &[&str] =
    &["read", "write", "default", "nodefault", "stored", "index", "implements"];

/// Classify one window of `dialect` source
pub fn classify(window: &Window, dialect: Dialect) -> StatementNode {
    RULES
        .iter()
        .find_map(|(_, rule)| rule(window, dialect))
        .unwrap_or_else(|| raw(window))
}

/// Kinds of every rule that recognizes `window`
pub fn matching_kinds(window: &Window, dialect: Dialect) -> Vec<StatementKind> {
    RULES
        .iter()
        .filter(|(_, rule)| rule(window, dialect).is_some())
        .map(|(kind, _)| *kind)
        .collect()
}

fn raw(window: &Window) -> StatementNode {
    let text = window.text();
    match window.opener() {
        // `try`, `asm` with nothing before them are the statement itself
        Some(opener)
            if text.is_empty() && !(opener == "{" || opener.eq_ignore_ascii_case("begin")) =>
        {
            StatementNode::raw(window.line, opener)
        }
        Some(opener) => StatementNode::raw(window.line, text).with_attr(OPENER, opener),
        None => StatementNode::raw(window.line, text),
    }
}

fn node(kind: StatementKind, window: &Window) -> StatementNode {
    StatementNode::new(kind, window.line, window.text())
}

// Token helpers

fn is_kw(token: Option<&Token>, keyword: &str, dialect: Dialect) -> bool {
    token.map_or(false, |t| t.is_word() && dialect.keyword_eq(&t.text, keyword))
}

fn is_op(token: Option<&Token>, op: &str) -> bool {
    token.map_or(false, |t| t.is_op(op))
}

fn lower(token: &Token) -> String {
    token.text.to_ascii_lowercase()
}

/// Index of the bracket closing the one at `open`
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let close = match tokens.get(open)?.text.as_str() {
        "(" => ")",
        "[" => "]",
        "{" => "}",
        _ => return None,
    };
    let open_text = tokens[open].text.as_str();
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        if t.is_op(open_text) {
            depth += 1;
        } else if t.is_op(close) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Inner tokens when `tokens` is exactly one parenthesized group
fn parenthesized(tokens: &[Token]) -> Option<&[Token]> {
    if !is_op(tokens.first(), "(") {
        return None;
    }
    let close = matching_close(tokens, 0)?;
    (close == tokens.len() - 1).then(|| &tokens[1..close])
}

/// Split on `sep` outside any brackets or generic angle brackets
fn split_top_level<'a>(tokens: &'a [Token], sep: &str) -> Vec<&'a [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, t) in tokens.iter().enumerate() {
        match t.text.as_str() {
            "(" | "[" | "{" | "<" if t.kind == TokenKind::Operator => depth += 1,
            ")" | "]" | "}" | ">" if t.kind == TokenKind::Operator => depth -= 1,
            ">>" if t.kind == TokenKind::Operator => depth -= 2,
            _ if depth <= 0 && t.is_op(sep) => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

fn strip_semicolon(tokens: &[Token]) -> &[Token] {
    match tokens.split_last() {
        Some((last, rest)) if last.is_op(";") => rest,
        _ => tokens,
    }
}

fn strip_colon(tokens: &[Token]) -> Option<&[Token]> {
    match tokens.split_last() {
        Some((last, rest)) if last.is_op(":") => Some(rest),
        _ => None,
    }
}

fn skip_csharp_attributes(tokens: &[Token], mut i: usize) -> usize {
    while is_op(tokens.get(i), "[") {
        match matching_close(tokens, i) {
            Some(close) => i = close + 1,
            None => break,
        }
    }
    i
}

fn skip_words(tokens: &[Token], mut i: usize, words: &[&str]) -> usize {
    while tokens
        .get(i)
        .map_or(false, |t| t.is_word() && words.contains(&lower(t).as_str()))
    {
        i += 1;
    }
    i
}

/// End of a C# type starting at `i`: name, dotted parts, generic arguments,
/// nullable marker and array ranks
fn csharp_type_end(tokens: &[Token], i: usize) -> Option<usize> {
    let first = tokens.get(i)?;
    let is_type_word = first.kind == TokenKind::Identifier
        || (first.kind == TokenKind::Keyword
            && CSHARP_TYPE_KEYWORDS.contains(&first.text.as_str()));
    if !is_type_word {
        return None;
    }

    let mut j = i + 1;
    while is_op(tokens.get(j), ".")
        && tokens.get(j + 1).map_or(false, |t| t.kind == TokenKind::Identifier)
    {
        j += 2;
    }
    if is_op(tokens.get(j), "<") {
        let mut depth = 0i32;
        loop {
            let t = tokens.get(j)?;
            if t.kind == TokenKind::Operator {
                depth += t.text.matches('<').count() as i32;
                depth -= t.text.matches('>').count() as i32;
            }
            j += 1;
            if depth <= 0 {
                break;
            }
        }
    }
    if is_op(tokens.get(j), "?") {
        j += 1;
    }
    while is_op(tokens.get(j), "[") {
        j = matching_close(tokens, j)? + 1;
    }
    Some(j)
}

fn is_void(ty: &str) -> bool {
    ty == "void"
}

fn method_node(
    window: &Window,
    name: &str,
    params: Vec<Param>,
    return_type: Option<String>,
) -> StatementNode {
    let mut node = node(StatementKind::MethodDecl, window)
        .with_attr(NAME, name)
        .with_attr(PARAMS, encode_params(&params));
    match return_type.filter(|ty| !is_void(ty)) {
        Some(ty) => {
            node = node
                .with_attr(RETURNS_VOID, "false")
                .with_attr(RETURN_TYPE, ty);
        }
        None => node = node.with_attr(RETURNS_VOID, "true"),
    }
    node
}

// Comment

fn comment(window: &Window, dialect: Dialect) -> Option<StatementNode> {
    let [token] = window.tokens.as_slice() else {
        return None;
    };
    if token.kind != TokenKind::Comment {
        return None;
    }
    Some(node(StatementKind::Comment, window).with_attr(TEXT, comment_text(&token.text, dialect)))
}

/// Comment body without its markers. Block comments keep their line breaks.
pub fn comment_text(raw: &str, dialect: Dialect) -> String {
    let body = match dialect {
        Dialect::CSharp => raw
            .strip_prefix("//")
            .map(|b| b.trim_start_matches('/'))
            .or_else(|| raw.strip_prefix("/*").map(|b| b.strip_suffix("*/").unwrap_or(b)))
            .unwrap_or(raw),
        Dialect::VBNet => {
            let quote = raw.chars().next().filter(|c| matches!(c, '\'' | '\u{2018}' | '\u{2019}'));
            match quote {
                Some(q) => &raw[q.len_utf8()..],
                None if raw.get(..3).map_or(false, |p| p.eq_ignore_ascii_case("rem")) => &raw[3..],
                None => raw,
            }
        }
        Dialect::Python => raw.strip_prefix('#').unwrap_or(raw),
        Dialect::Delphi => raw
            .strip_prefix("//")
            .or_else(|| raw.strip_prefix("(*").map(|b| b.strip_suffix("*)").unwrap_or(b)))
            .or_else(|| raw.strip_prefix('{').map(|b| b.strip_suffix('}').unwrap_or(b)))
            .unwrap_or(raw),
    };

    let lines: Vec<&str> = body
        .lines()
        .map(|line| {
            let line = line.trim();
            match line.strip_prefix('*') {
                Some(rest) if !line.starts_with("*/") => rest.trim_start(),
                _ => line,
            }
        })
        .collect();
    let first = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let last = lines.iter().rposition(|l| !l.is_empty()).map_or(first, |i| i + 1);
    lines[first..last.max(first)].join("\n")
}

// BlockEnd

fn block_end(window: &Window, dialect: Dialect) -> Option<StatementNode> {
    let closes = match dialect {
        Dialect::CSharp | Dialect::Delphi => window.terminator == Terminator::BlockClose,
        Dialect::VBNet => {
            let first = window.tokens.first().map(lower);
            let second = window.tokens.get(1).map(lower);
            match first.as_deref() {
                Some("end") => second.map_or(false, |s| VB_END_TARGETS.contains(&s.as_str())),
                Some("next") | Some("loop") | Some("wend") => true,
                _ => false,
            }
        }
        Dialect::Python => false,
    };
    closes.then(|| StatementNode::block_end(window.line, window.text()))
}

// ElseBranch

fn else_branch(window: &Window, dialect: Dialect) -> Option<StatementNode> {
    let t = &window.tokens;
    let condition: Option<&[Token]> = match dialect {
        Dialect::CSharp => {
            if window.opener() != Some("{") || !is_kw(t.first(), "else", dialect) {
                return None;
            }
            if t.len() == 1 {
                None
            } else if is_kw(t.get(1), "if", dialect) {
                Some(parenthesized(&t[2..])?)
            } else {
                return None;
            }
        }
        Dialect::VBNet => {
            if is_kw(t.first(), "else", dialect) && t.len() == 1 {
                None
            } else if is_kw(t.first(), "elseif", dialect)
                && is_kw(t.last(), "then", dialect)
                && t.len() > 2
            {
                Some(&t[1..t.len() - 1])
            } else if is_kw(t.first(), "else", dialect)
                && is_kw(t.get(1), "if", dialect)
                && is_kw(t.last(), "then", dialect)
                && t.len() > 3
            {
                Some(&t[2..t.len() - 1])
            } else {
                return None;
            }
        }
        Dialect::Python => {
            let body = strip_colon(t)?;
            if is_kw(body.first(), "else", dialect) && body.len() == 1 {
                None
            } else if is_kw(body.first(), "elif", dialect) && body.len() > 1 {
                Some(&body[1..])
            } else {
                return None;
            }
        }
        Dialect::Delphi => {
            if window.opener().map_or(true, |o| !o.eq_ignore_ascii_case("begin"))
                || !is_kw(t.first(), "else", dialect)
            {
                return None;
            }
            if t.len() == 1 {
                None
            } else if is_kw(t.get(1), "if", dialect)
                && is_kw(t.last(), "then", dialect)
                && t.len() > 3
            {
                Some(&t[2..t.len() - 1])
            } else {
                return None;
            }
        }
    };

    let mut node = node(StatementKind::ElseBranch, window);
    if let Some(condition) = condition {
        node = node.with_attr(CONDITION_EXPR, neutral_expr(condition, dialect));
    }
    Some(node)
}

// IfStart

fn if_start(window: &Window, dialect: Dialect) -> Option<StatementNode> {
    let t = &window.tokens;
    if !is_kw(t.first(), "if", dialect) {
        return None;
    }
    let condition = match dialect {
        Dialect::CSharp => {
            if window.opener() != Some("{") {
                return None;
            }
            parenthesized(&t[1..])?
        }
        Dialect::VBNet => {
            if !is_kw(t.last(), "then", dialect) || t.len() < 3 {
                return None;
            }
            &t[1..t.len() - 1]
        }
        Dialect::Python => {
            let body = strip_colon(t)?;
            if body.len() < 2 {
                return None;
            }
            &body[1..]
        }
        Dialect::Delphi => {
            if window.opener().map_or(true, |o| !o.eq_ignore_ascii_case("begin"))
                || !is_kw(t.last(), "then", dialect)
                || t.len() < 3
            {
                return None;
            }
            &t[1..t.len() - 1]
        }
    };
    Some(
        node(StatementKind::IfStart, window)
            .with_attr(CONDITION_EXPR, neutral_expr(condition, dialect)),
    )
}

// ClassDecl

fn class_decl(window: &Window, dialect: Dialect) -> Option<StatementNode> {
    let t = &window.tokens;
    let name = match dialect {
        Dialect::CSharp => {
            if window.opener() != Some("{") {
                return None;
            }
            let i = skip_csharp_attributes(t, 0);
            let i = skip_words(t, i, CSHARP_MODIFIERS);
            if !is_kw(t.get(i), "class", dialect) {
                return None;
            }
            t.get(i + 1).filter(|n| n.kind == TokenKind::Identifier)?
        }
        Dialect::VBNet => {
            let i = skip_words(t, 0, VB_MODIFIERS);
            if !is_kw(t.get(i), "class", dialect) {
                return None;
            }
            t.get(i + 1).filter(|n| n.is_word())?
        }
        Dialect::Python => {
            strip_colon(t)?;
            if !is_kw(t.first(), "class", dialect) {
                return None;
            }
            t.get(1).filter(|n| n.kind == TokenKind::Identifier)?
        }
        Dialect::Delphi => {
            if window.terminator != Terminator::Inline || !is_op(t.get(1), "=") {
                return None;
            }
            let i = skip_words(t, 2, &["packed"]);
            if !is_kw(t.get(i), "class", dialect) {
                return None;
            }
            t.first().filter(|n| n.kind == TokenKind::Identifier)?
        }
    };
    Some(node(StatementKind::ClassDecl, window).with_attr(NAME, name.text.clone()))
}

// MethodDecl

fn method_decl(window: &Window, dialect: Dialect) -> Option<StatementNode> {
    match dialect {
        Dialect::CSharp => csharp_method(window),
        Dialect::VBNet => vb_method(window),
        Dialect::Python => python_method(window),
        Dialect::Delphi => delphi_method(window),
    }
}

fn csharp_method(window: &Window) -> Option<StatementNode> {
    let has_body = window.opener() == Some("{");
    if !has_body && window.terminator != Terminator::Semicolon {
        return None;
    }
    let t = strip_semicolon(&window.tokens);
    let start = skip_csharp_attributes(t, 0);
    let i = skip_words(t, start, CSHARP_MODIFIERS);
    let has_modifiers = i > start;

    // Constructors have no return type
    let (name_at, return_type) = if has_modifiers
        && t.get(i).map_or(false, |n| n.kind == TokenKind::Identifier)
        && is_op(t.get(i + 1), "(")
    {
        (i, None)
    } else {
        let type_end = csharp_type_end(t, i)?;
        (type_end, Some(neutral_type(&t[i..type_end], Dialect::CSharp)))
    };

    let name = t.get(name_at).filter(|n| n.kind == TokenKind::Identifier)?;
    let mut open = name_at + 1;
    if is_op(t.get(open), "<") {
        open = csharp_type_end(t, name_at)?;
    }
    if !is_op(t.get(open), "(") {
        return None;
    }
    let close = matching_close(t, open)?;

    // Expression bodies and field initializers are not declarations
    if t[close + 1..].iter().any(|x| x.is_op("=>") || x.is_op("=")) {
        return None;
    }
    if !has_body && !has_modifiers && return_type.as_deref() != Some("void") {
        return None;
    }

    let params = split_top_level(&t[open + 1..close], ",")
        .into_iter()
        .filter_map(csharp_param)
        .collect();
    Some(method_node(window, &name.text, params, return_type))
}

fn csharp_param(tokens: &[Token]) -> Option<Param> {
    let i = skip_csharp_attributes(tokens, 0);
    let i = skip_words(tokens, i, CSHARP_PARAM_MODIFIERS);
    let decl = &tokens[i..];
    let end = decl.iter().position(|t| t.is_op("=")).unwrap_or(decl.len());
    let decl = &decl[..end];
    let (name, ty) = decl.split_last()?;
    if !name.is_word() {
        return None;
    }
    let ty = (!ty.is_empty()).then(|| neutral_type(ty, Dialect::CSharp));
    Some(Param::new(name.text.clone(), ty))
}

fn vb_method(window: &Window) -> Option<StatementNode> {
    let dialect = Dialect::VBNet;
    let t = &window.tokens;
    let i = skip_words(t, 0, VB_MODIFIERS);
    let is_function = is_kw(t.get(i), "function", dialect);
    if !is_function && !is_kw(t.get(i), "sub", dialect) {
        return None;
    }
    let name = t.get(i + 1).filter(|n| n.is_word())?;

    let mut params = Vec::new();
    let mut rest = i + 2;
    if is_op(t.get(rest), "(") {
        let close = matching_close(t, rest)?;
        params = split_top_level(&t[rest + 1..close], ",")
            .into_iter()
            .filter_map(vb_param)
            .collect();
        rest = close + 1;
    }

    let return_type = if is_function {
        let ty = if is_kw(t.get(rest), "as", dialect) {
            let end = t[rest + 1..]
                .iter()
                .position(|x| {
                    is_kw(Some(x), "handles", dialect) || is_kw(Some(x), "implements", dialect)
                })
                .map_or(t.len(), |p| rest + 1 + p);
            neutral_type(&t[rest + 1..end], dialect)
        } else {
            "object".to_string()
        };
        Some(ty)
    } else {
        None
    };
    Some(method_node(window, &name.text, params, return_type))
}

fn vb_param(tokens: &[Token]) -> Option<Param> {
    let dialect = Dialect::VBNet;
    let i = skip_words(tokens, 0, &["byval", "byref", "optional", "paramarray"]);
    let name = tokens.get(i).filter(|t| t.is_word())?;
    let as_at = tokens.iter().position(|t| is_kw(Some(t), "as", dialect));
    let ty = as_at.map(|a| {
        let end = tokens.iter().position(|t| t.is_op("=")).unwrap_or(tokens.len());
        neutral_type(&tokens[a + 1..end.max(a + 1)], dialect)
    });
    Some(Param::new(name.text.clone(), ty))
}

fn python_method(window: &Window) -> Option<StatementNode> {
    let dialect = Dialect::Python;
    let t = strip_colon(&window.tokens)?;
    let i = usize::from(is_kw(t.first(), "async", dialect));
    if !is_kw(t.get(i), "def", dialect) {
        return None;
    }
    let name = t.get(i + 1).filter(|n| n.kind == TokenKind::Identifier)?;
    if !is_op(t.get(i + 2), "(") {
        return None;
    }
    let close = matching_close(t, i + 2)?;

    let mut params: Vec<Param> = split_top_level(&t[i + 3..close], ",")
        .into_iter()
        .filter_map(python_param)
        .collect();
    if params
        .first()
        .map_or(false, |p| p.name == "self" || p.name == "cls")
    {
        params.remove(0);
    }

    let return_type = if is_op(t.get(close + 1), "->") {
        Some(neutral_type(&t[close + 2..], dialect))
    } else if close + 1 == t.len() {
        None
    } else {
        return None;
    };
    Some(method_node(window, &name.text, params, return_type))
}

fn python_param(tokens: &[Token]) -> Option<Param> {
    let start = tokens
        .iter()
        .position(|t| !(t.is_op("*") || t.is_op("**")))?;
    let name = tokens.get(start).filter(|t| t.kind == TokenKind::Identifier)?;
    let ty = if is_op(tokens.get(start + 1), ":") {
        let end = tokens.iter().position(|t| t.is_op("=")).unwrap_or(tokens.len());
        Some(neutral_type(&tokens[start + 2..end.max(start + 2)], Dialect::Python))
    } else {
        None
    };
    Some(Param::new(name.text.clone(), ty))
}

fn delphi_method(window: &Window) -> Option<StatementNode> {
    let dialect = Dialect::Delphi;
    let opens = window
        .opener()
        .map_or(false, |o| o.eq_ignore_ascii_case("begin"));
    if !opens && window.terminator != Terminator::Semicolon {
        return None;
    }
    let t = &window.tokens;
    let i = usize::from(is_kw(t.first(), "class", dialect));
    let routine = t.get(i).map(lower)?;
    if !DELPHI_ROUTINES.contains(&routine.as_str()) {
        return None;
    }

    // `TFoo.Bar`: the name is the last dotted segment
    let mut j = i + 1;
    let mut name = t.get(j).filter(|n| n.is_word())?;
    while is_op(t.get(j + 1), ".") {
        j += 2;
        name = t.get(j).filter(|n| n.is_word())?;
    }
    j += 1;

    let mut params = Vec::new();
    if is_op(t.get(j), "(") {
        let close = matching_close(t, j)?;
        params = split_top_level(&t[j + 1..close], ";")
            .into_iter()
            .flat_map(delphi_param_group)
            .collect();
        j = close + 1;
    }

    let return_type = if routine == "function" {
        if !is_op(t.get(j), ":") {
            return None;
        }
        let end = t[j..].iter().position(|x| x.is_op(";")).map_or(t.len(), |p| j + p);
        Some(neutral_type(&t[j + 1..end], dialect))
    } else {
        None
    };
    Some(method_node(window, &name.text, params, return_type))
}

/// `const a, b: Integer = 0` declares two parameters
fn delphi_param_group(tokens: &[Token]) -> Vec<Param> {
    let i = skip_words(tokens, 0, &["const", "var", "out", "constref"]);
    let group = &tokens[i..];
    let colon = group.iter().position(|t| t.is_op(":"));
    let ty = colon.map(|c| {
        let end = group.iter().position(|t| t.is_op("=")).unwrap_or(group.len());
        neutral_type(&group[c + 1..end.max(c + 1)], Dialect::Delphi)
    });
    group[..colon.unwrap_or(group.len())]
        .iter()
        .filter(|t| t.is_word())
        .map(|t| Param::new(t.text.clone(), ty.clone()))
        .collect()
}

// PropertyDecl

fn property_decl(window: &Window, dialect: Dialect) -> Option<StatementNode> {
    let t = &window.tokens;
    let mut initializer: Option<&[Token]> = None;
    let (name, ty) = match dialect {
        Dialect::CSharp => {
            if !matches!(window.terminator, Terminator::GroupEnd | Terminator::Semicolon) {
                return None;
            }
            let i = skip_csharp_attributes(t, 0);
            let i = skip_words(t, i, CSHARP_MODIFIERS);
            let type_end = csharp_type_end(t, i)?;
            let name = t.get(type_end).filter(|n| n.kind == TokenKind::Identifier)?;
            let open = type_end + 1;
            if !is_op(t.get(open), "{") {
                return None;
            }
            let close = matching_close(t, open)?;
            let plain_accessors = t[open + 1..close].iter().all(|x| {
                x.is_op(";") || (x.is_word() && CSHARP_ACCESSOR_WORDS.contains(&x.text.as_str()))
            });
            if !plain_accessors {
                return None;
            }
            if is_op(t.get(close + 1), "=") {
                initializer = Some(&t[close + 2..]);
            } else if close + 1 != t.len() && !is_op(t.get(close + 1), ";") {
                return None;
            }
            (name, neutral_type(&t[i..type_end], dialect))
        }
        Dialect::VBNet => {
            let i = skip_words(t, 0, VB_MODIFIERS);
            // Expanded properties carry Get/Set blocks and stay verbatim
            let expanded = t[..i]
                .iter()
                .any(|m| matches!(lower(m).as_str(), "readonly" | "writeonly"));
            if expanded || !is_kw(t.get(i), "property", dialect) {
                return None;
            }
            let name = t.get(i + 1).filter(|n| n.is_word())?;
            let ty = if is_kw(t.get(i + 2), "as", dialect) {
                let start = skip_words(t, i + 3, &["new"]);
                let end = t.iter().position(|x| x.is_op("=")).unwrap_or(t.len());
                initializer = t.get(end + 1..);
                neutral_type(&t[start..end.max(start)], dialect)
            } else if t.len() == i + 2 {
                "object".to_string()
            } else {
                return None;
            };
            (name, ty)
        }
        Dialect::Python => {
            let name = t.first().filter(|n| n.kind == TokenKind::Identifier)?;
            if !is_op(t.get(1), ":") || t.len() < 3 || is_op(t.last(), ":") {
                return None;
            }
            let end = t.iter().position(|x| x.is_op("=")).unwrap_or(t.len());
            if end <= 2 {
                return None;
            }
            initializer = t.get(end + 1..);
            (name, neutral_type(&t[2..end], dialect))
        }
        Dialect::Delphi => {
            if !is_kw(t.first(), "property", dialect) {
                return None;
            }
            let name = t.get(1).filter(|n| n.is_word())?;
            if !is_op(t.get(2), ":") {
                return None;
            }
            let end = t[3..]
                .iter()
                .position(|x| {
                    x.is_op(";")
                        || (x.is_word() && DELPHI_PROPERTY_SPECIFIERS.contains(&lower(x).as_str()))
                })
                .map_or(t.len(), |p| p + 3);
            if end == 3 {
                return None;
            }
            (name, neutral_type(&t[3..end], dialect))
        }
    };
    let mut node = node(StatementKind::PropertyDecl, window)
        .with_attr(NAME, name.text.clone())
        .with_attr(TYPE, ty);
    if let Some(init) = initializer.map(strip_semicolon).filter(|i| !i.is_empty()) {
        node = node.with_attr(INITIALIZER, neutral_expr(init, dialect));
    }
    Some(node)
}

// PrintCall

fn print_call(window: &Window, dialect: Dialect) -> Option<StatementNode> {
    let t = &window.tokens;
    let args: &[Token] = match dialect {
        Dialect::CSharp | Dialect::VBNet => {
            let t = if dialect == Dialect::CSharp {
                if window.terminator != Terminator::Semicolon {
                    return None;
                }
                strip_semicolon(t)
            } else {
                t.as_slice()
            };
            let i = if is_kw(t.first(), "System", dialect) && is_op(t.get(1), ".") { 2 } else { 0 };
            if !is_kw(t.get(i), "Console", dialect)
                || !is_op(t.get(i + 1), ".")
                || !is_kw(t.get(i + 2), "WriteLine", dialect)
            {
                return None;
            }
            if t.len() == i + 3 && dialect == Dialect::VBNet {
                &[]
            } else {
                parenthesized(&t[i + 3..])?
            }
        }
        Dialect::Python => {
            if !is_kw(t.first(), "print", dialect) {
                return None;
            }
            parenthesized(&t[1..])?
        }
        Dialect::Delphi => {
            let t = strip_semicolon(t);
            if !is_kw(t.first(), "writeln", dialect) {
                return None;
            }
            if t.len() == 1 {
                &[]
            } else {
                parenthesized(&t[1..])?
            }
        }
    };
    Some(node(StatementKind::PrintCall, window).with_attr(ARGUMENT_EXPR, neutral_expr(args, dialect)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::lexer::tokenize;
    use crate::translator::segment::{Segment, Segmenter};

    fn statements(source: &str, dialect: Dialect) -> Vec<StatementNode> {
        let tokens = tokenize(source, dialect).unwrap();
        Segmenter::new(&tokens, dialect)
            .filter_map(|s| match s {
                Segment::Statement(w) if !w.is_empty() || w.opener().is_some() => {
                    Some(classify(&w, dialect))
                }
                _ => None,
            })
            .collect()
    }

    fn first(source: &str, dialect: Dialect) -> StatementNode {
        statements(source, dialect).remove(0)
    }

    #[test]
    fn test_class_declarations() {
        let cases = [
            ("public class Foo { }", Dialect::CSharp),
            ("[Serializable] public sealed class Foo : Base { }", Dialect::CSharp),
            ("Public Class Foo\nEnd Class", Dialect::VBNet),
            ("class Foo(Base):\n    pass", Dialect::Python),
            ("type\n  Foo = class(TObject)\n  end;", Dialect::Delphi),
        ];
        for (source, dialect) in cases {
            let node = statements(source, dialect)
                .into_iter()
                .find(|n| n.kind() == StatementKind::ClassDecl)
                .unwrap_or_else(|| panic!("no class in {:?}", source));
            assert_eq!(node.attr(NAME), Some("Foo"), "{}", source);
        }
    }

    #[test]
    fn test_delphi_forward_class_is_raw() {
        let kinds: Vec<_> = statements("type\n  TFoo = class;", Dialect::Delphi)
            .iter()
            .map(StatementNode::kind)
            .collect();
        assert_eq!(kinds, vec![StatementKind::Raw, StatementKind::Raw]);
    }

    #[test]
    fn test_csharp_methods() {
        let node = first("public static int Add(int a, List<string> b = null) { }", Dialect::CSharp);
        assert_eq!(node.kind(), StatementKind::MethodDecl);
        assert_eq!(node.attr(NAME), Some("Add"));
        assert!(!node.returns_void());
        assert_eq!(node.attr(RETURN_TYPE), Some("int"));
        assert_eq!(
            node.params(),
            vec![
                Param::new("a", Some("int".to_string())),
                Param::new("b", Some("List<string>".to_string())),
            ]
        );

        let ctor = first("public Foo(int x) : base(x) { }", Dialect::CSharp);
        assert_eq!(ctor.kind(), StatementKind::MethodDecl);
        assert!(ctor.returns_void());

        let interface_member = first("void Bar();", Dialect::CSharp);
        assert_eq!(interface_member.kind(), StatementKind::MethodDecl);
    }

    #[test]
    fn test_csharp_statements_that_look_like_methods_are_raw() {
        for source in [
            "var x = Foo();",
            "return Bar(1);",
            "Foo(x);",
            "new Widget();",
            "public int Twice(int x) => x * 2;",
            "await Task.Delay(10);",
        ] {
            assert_eq!(first(source, Dialect::CSharp).kind(), StatementKind::Raw, "{}", source);
        }
    }

    #[test]
    fn test_vb_methods() {
        let sub = first("Public Sub Bar(ByVal x As Integer, Optional y As String = \"\")", Dialect::VBNet);
        assert_eq!(sub.kind(), StatementKind::MethodDecl);
        assert!(sub.returns_void());
        assert_eq!(
            sub.params(),
            vec![
                Param::new("x", Some("int".to_string())),
                Param::new("y", Some("string".to_string())),
            ]
        );

        let func = first("Private Function Total() As Double", Dialect::VBNet);
        assert_eq!(func.attr(RETURN_TYPE), Some("double"));
    }

    #[test]
    fn test_python_methods_drop_self() {
        let node = first("def area(self, scale: float = 1.0) -> float:\n    pass", Dialect::Python);
        assert_eq!(node.kind(), StatementKind::MethodDecl);
        assert_eq!(node.params(), vec![Param::new("scale", Some("double".to_string()))]);
        assert_eq!(node.attr(RETURN_TYPE), Some("double"));

        let none = first("async def run() -> None:\n    pass", Dialect::Python);
        assert!(none.returns_void());
    }

    #[test]
    fn test_delphi_methods() {
        let node = first(
            "function TCalc.Add(const a, b: Integer; var c: string): Integer;\nbegin\nend;",
            Dialect::Delphi,
        );
        assert_eq!(node.kind(), StatementKind::MethodDecl);
        assert_eq!(node.attr(NAME), Some("Add"));
        assert_eq!(node.attr(RETURN_TYPE), Some("int"));
        assert_eq!(node.params().len(), 3);
        assert_eq!(node.params()[1], Param::new("b", Some("int".to_string())));

        let decl = first("procedure Bar; virtual;", Dialect::Delphi);
        assert_eq!(decl.kind(), StatementKind::MethodDecl);
        assert!(decl.returns_void());
    }

    #[test]
    fn test_properties() {
        let cs = first("public int Count { get; private set; }", Dialect::CSharp);
        assert_eq!(cs.kind(), StatementKind::PropertyDecl);
        assert_eq!(cs.attr(TYPE), Some("int"));

        let computed = first("public int Count { get { return n; } }", Dialect::CSharp);
        assert_eq!(computed.kind(), StatementKind::Raw);

        let vb = first("Public Property Name As String", Dialect::VBNet);
        assert_eq!(vb.attr(TYPE), Some("string"));
        let expanded = first("Public ReadOnly Property Name As String", Dialect::VBNet);
        assert_eq!(expanded.kind(), StatementKind::Raw);

        let py = first("count: int = 0", Dialect::Python);
        assert_eq!(py.kind(), StatementKind::PropertyDecl);
        assert_eq!(py.attr(NAME), Some("count"));
        assert_eq!(py.attr(INITIALIZER), Some("0"));

        let init = first("public bool Enabled { get; set; } = true;", Dialect::CSharp);
        assert_eq!(init.kind(), StatementKind::PropertyDecl);
        assert_eq!(init.attr(INITIALIZER), Some("true"));

        let pas = first("property Count: Integer read FCount write FCount;", Dialect::Delphi);
        assert_eq!(pas.attr(TYPE), Some("int"));
    }

    #[test]
    fn test_print_calls() {
        let cases = [
            ("Console.WriteLine(\"x\");", Dialect::CSharp, "\"x\""),
            ("System.Console.WriteLine(a + b);", Dialect::CSharp, "a + b"),
            ("Console.WriteLine(\"x\")", Dialect::VBNet, "\"x\""),
            ("print('x')", Dialect::Python, "\"x\""),
            ("WriteLn('x');", Dialect::Delphi, "\"x\""),
            ("Writeln;", Dialect::Delphi, ""),
        ];
        for (source, dialect, arg) in cases {
            let node = first(source, dialect);
            assert_eq!(node.kind(), StatementKind::PrintCall, "{}", source);
            assert_eq!(node.attr(ARGUMENT_EXPR), Some(arg), "{}", source);
        }
        assert_eq!(first("print(a)(b)", Dialect::Python).kind(), StatementKind::Raw);
    }

    #[test]
    fn test_conditionals() {
        let cs = statements("if (x > 1) { } else if (y) { } else { }", Dialect::CSharp);
        let kinds: Vec<_> = cs.iter().map(StatementNode::kind).collect();
        assert_eq!(
            kinds,
            vec![
                StatementKind::IfStart,
                StatementKind::BlockEnd,
                StatementKind::ElseBranch,
                StatementKind::BlockEnd,
                StatementKind::ElseBranch,
                StatementKind::BlockEnd,
            ]
        );
        assert_eq!(cs[0].attr(CONDITION_EXPR), Some("x > 1"));
        assert_eq!(cs[2].attr(CONDITION_EXPR), Some("y"));
        assert_eq!(cs[4].attr(CONDITION_EXPR), None);

        let vb = first("If a = 1 AndAlso b Then", Dialect::VBNet);
        assert_eq!(vb.attr(CONDITION_EXPR), Some("a == 1 && b"));
        assert_eq!(first("ElseIf c Then", Dialect::VBNet).kind(), StatementKind::ElseBranch);
        assert_eq!(first("If x Then Foo()", Dialect::VBNet).kind(), StatementKind::Raw);

        let py = first("elif not done:\n    pass", Dialect::Python);
        assert_eq!(py.kind(), StatementKind::ElseBranch);
        assert_eq!(py.attr(CONDITION_EXPR), Some("!done"));

        let pas = first("if x <> 0 then\nbegin\nend;", Dialect::Delphi);
        assert_eq!(pas.attr(CONDITION_EXPR), Some("x != 0"));
        assert_eq!(first("if x then Foo;", Dialect::Delphi).kind(), StatementKind::Raw);
    }

    #[test]
    fn test_block_ends() {
        assert_eq!(first("End Sub", Dialect::VBNet).kind(), StatementKind::BlockEnd);
        assert_eq!(first("Loop While x", Dialect::VBNet).kind(), StatementKind::BlockEnd);
        assert_eq!(first("End", Dialect::VBNet).kind(), StatementKind::Raw);
        assert_eq!(first("end.", Dialect::Delphi).kind(), StatementKind::BlockEnd);
    }

    #[test]
    fn test_comment_text() {
        assert_eq!(comment_text("// hello", Dialect::CSharp), "hello");
        assert_eq!(comment_text("/* a\n * b\n */", Dialect::CSharp), "a\nb");
        assert_eq!(comment_text("REM note", Dialect::VBNet), "note");
        assert_eq!(comment_text("' note", Dialect::VBNet), "note");
        assert_eq!(comment_text("{ note }", Dialect::Delphi), "note");
        assert_eq!(comment_text("(* note *)", Dialect::Delphi), "note");
        assert_eq!(comment_text("#", Dialect::Python), "");
    }

    #[test]
    fn test_raw_keeps_opener() {
        let node = first("while (x) { }", Dialect::CSharp);
        assert_eq!(node.kind(), StatementKind::Raw);
        assert_eq!(node.attr(TEXT), Some("while (x)"));
        assert_eq!(node.attr(OPENER), Some("{"));

        let node = first("try\n  Foo;\nfinally\nend;", Dialect::Delphi);
        assert_eq!(node.attr(TEXT), Some("try"));
        assert_eq!(node.attr(OPENER), None);
    }

    #[test]
    fn test_rules_are_mutually_exclusive() {
        let corpus = [
            ("public class A { public int X { get; set; } public void B(int y) { if (y > 0) { Console.WriteLine(y); } else { } } }", Dialect::CSharp),
            ("Public Class A\n    Public Property X As Integer\n    Public Sub B(y As Integer)\n        If y > 0 Then\n            Console.WriteLine(y)\n        Else\n        End If\n    End Sub\nEnd Class\n", Dialect::VBNet),
            ("class A:\n    x: int = 0\n    def b(self, y):\n        if y > 0:\n            print(y)\n        else:\n            pass\n", Dialect::Python),
            ("type\n  A = class\n    property X: Integer read FX;\n    procedure B(y: Integer);\n  end;\nprocedure A.B(y: Integer);\nbegin\n  if y > 0 then\n  begin\n    WriteLn(y);\n  end\n  else\n  begin\n  end;\nend;", Dialect::Delphi),
        ];
        for (source, dialect) in corpus {
            let tokens = tokenize(source, dialect).unwrap();
            for segment in Segmenter::new(&tokens, dialect) {
                if let Segment::Statement(window) = segment {
                    let kinds = matching_kinds(&window, dialect);
                    assert!(kinds.len() <= 1, "{:?} matched {:?}", window.text(), kinds);
                }
            }
        }
    }
}
