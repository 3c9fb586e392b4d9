/// Target-side rendering of classified statements
///
/// `emit` is a table keyed by statement kind and target dialect. It only
/// needs the node and a small context: the indent, the frame a `BlockEnd`
/// closes, and whether an else branch follows.

use crate::translator::ast::{
    StatementKind, StatementNode, ARGUMENT_EXPR, CONDITION_EXPR, INITIALIZER, NAME, OPENER,
    RETURN_TYPE, TEXT, TYPE,
};
use crate::translator::dialect::Dialect;
use crate::translator::expr::{render_expr, render_type};

const UNTYPED: &str = "object";

const OPENER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "friend", "static", "shared", "partial",
    "sealed", "abstract", "readonly", "unsafe", "async",
];

/// An open block on the target side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: StatementKind,
    pub returns_void: bool,
    /// First significant word of a raw opener (`for`, `while`, `try`)
    pub opener_word: Option<String>,
    /// Something other than a comment was emitted inside the block
    pub has_body: bool,
}

impl Frame {
    pub fn for_node(node: &StatementNode) -> Self {
        let opener_word = match node.kind() {
            StatementKind::Raw => first_word(node.attr_or_empty(TEXT)),
            _ => None,
        };
        Frame {
            kind: node.kind(),
            returns_void: node.returns_void(),
            opener_word,
            has_body: false,
        }
    }
}

fn first_word(text: &str) -> Option<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .find(|w| !OPENER_MODIFIERS.contains(&w.as_str()))
}

#[derive(Debug, Clone)]
pub struct EmitContext<'a> {
    pub source: Dialect,
    pub indent: usize,
    pub indent_width: usize,
    /// The innermost open block is a class body
    pub in_class: bool,
    /// For a `BlockEnd`: the frame it closes
    pub closing: Option<&'a Frame>,
    /// The next statement continues the closed `if` as an else branch
    pub next_is_else: bool,
    pub python_self_param: bool,
}

impl<'a> EmitContext<'a> {
    pub fn new(source: Dialect, indent_width: usize) -> Self {
        EmitContext {
            source,
            indent: 0,
            indent_width,
            in_class: false,
            closing: None,
            next_is_else: false,
            python_self_param: false,
        }
    }

    fn pad(&self) -> String {
        " ".repeat(self.indent * self.indent_width)
    }
}

/// Lines produced for one statement, indented
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Emitted {
    pub lines: Vec<String>,
    /// The statement has no rendering in the target; `lines` is a placeholder
    pub unsupported: bool,
}

/// Render `node` for `target`
pub fn emit(node: &StatementNode, target: Dialect, ctx: &EmitContext) -> Emitted {
    let lines = match node.kind() {
        StatementKind::ClassDecl => Some(class_decl(node, target)),
        StatementKind::MethodDecl => Some(method_decl(node, target, ctx)),
        StatementKind::PropertyDecl => property_decl(node, target, ctx),
        StatementKind::PrintCall => Some(print_call(node, target)),
        StatementKind::IfStart => Some(if_start(node, target)),
        StatementKind::ElseBranch => Some(else_branch(node, target)),
        StatementKind::BlockEnd => block_end(node, target, ctx),
        StatementKind::Comment => Some(comment(node, target, ctx)),
        StatementKind::Raw => Some(raw(node, target, ctx)),
    };

    let pad = ctx.pad();
    match lines {
        Some(lines) => Emitted {
            lines: lines.into_iter().map(|l| format!("{}{}", pad, l)).collect(),
            unsupported: false,
        },
        None => Emitted {
            lines: placeholder(node, target)
                .into_iter()
                .map(|l| format!("{}{}", pad, l))
                .collect(),
            unsupported: true,
        },
    }
}

/// `// UNSUPPORTED: PropertyDecl` followed by the statement as written
fn placeholder(node: &StatementNode, target: Dialect) -> Vec<String> {
    let marker = target.comment_marker();
    let mut lines = vec![format!("{} UNSUPPORTED: {}", marker, node.kind())];
    if let Some(source) = node.source_text().lines().next().filter(|l| !l.trim().is_empty()) {
        lines.push(format!("{} {}", marker, source.trim()));
    }
    lines
}

fn ty(neutral: Option<&str>, target: Dialect) -> String {
    render_type(neutral.unwrap_or(UNTYPED), target)
}

fn class_decl(node: &StatementNode, target: Dialect) -> Vec<String> {
    let name = node.attr_or_empty(NAME);
    let opens = node.opens_block();
    match target {
        Dialect::CSharp if opens => vec![format!("public class {} {{", name)],
        Dialect::CSharp => vec![format!("public class {} {{ }}", name)],
        Dialect::VBNet if opens => vec![format!("Public Class {}", name)],
        Dialect::VBNet => vec![format!("Public Class {}", name), "End Class".to_string()],
        Dialect::Python if opens => vec![format!("class {}:", name)],
        Dialect::Python => vec![format!("class {}: pass", name)],
        Dialect::Delphi if opens => vec![format!("{} = class", name)],
        Dialect::Delphi => vec![format!("{} = class end;", name)],
    }
}

fn method_decl(node: &StatementNode, target: Dialect, ctx: &EmitContext) -> Vec<String> {
    let name = node.attr_or_empty(NAME);
    let params = node.params();
    let return_type = (!node.returns_void()).then(|| node.attr(RETURN_TYPE));
    let opens = node.opens_block();

    match target {
        Dialect::CSharp => {
            let params = params
                .iter()
                .map(|p| format!("{} {}", ty(p.ty.as_deref(), target), p.name))
                .collect::<Vec<_>>()
                .join(", ");
            let ret = match return_type {
                Some(rt) => ty(rt, target),
                None => "void".to_string(),
            };
            let end = if opens { " {" } else { ";" };
            vec![format!("public {} {}({}){}", ret, name, params, end)]
        }
        Dialect::VBNet => {
            let params = params
                .iter()
                .map(|p| match &p.ty {
                    Some(t) => format!("{} As {}", p.name, render_type(t, target)),
                    None => p.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            match return_type {
                Some(rt) => vec![format!(
                    "Public Function {}({}) As {}",
                    name,
                    params,
                    ty(rt, target)
                )],
                None => vec![format!("Public Sub {}({})", name, params)],
            }
        }
        Dialect::Python => {
            let mut names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
            if ctx.in_class && ctx.python_self_param {
                names.insert(0, "self".to_string());
            }
            let ret = return_type
                .map(|rt| format!(" -> {}", ty(rt, target)))
                .unwrap_or_default();
            let end = if opens { ":" } else { ": ..." };
            vec![format!("def {}({}){}{}", name, names.join(", "), ret, end)]
        }
        Dialect::Delphi => {
            let params = params
                .iter()
                .map(|p| format!("{}: {}", p.name, ty(p.ty.as_deref(), target)))
                .collect::<Vec<_>>()
                .join("; ");
            let params = if params.is_empty() {
                String::new()
            } else {
                format!("({})", params)
            };
            let header = match return_type {
                Some(rt) => format!("function {}{}: {};", name, params, ty(rt, target)),
                None => format!("procedure {}{};", name, params),
            };
            if opens {
                vec![header, "begin".to_string()]
            } else {
                vec![header]
            }
        }
    }
}

fn property_decl(node: &StatementNode, target: Dialect, ctx: &EmitContext) -> Option<Vec<String>> {
    if !ctx.in_class && target != Dialect::Python {
        return None;
    }
    let name = node.attr_or_empty(NAME);
    let prop_type = ty(node.attr(TYPE), target);
    let init = node.attr(INITIALIZER).map(|i| render_expr(i, target));

    let line = match (target, init) {
        (Dialect::CSharp, Some(init)) => {
            format!("public {} {} {{ get; set; }} = {};", prop_type, name, init)
        }
        (Dialect::CSharp, None) => format!("public {} {} {{ get; set; }}", prop_type, name),
        (Dialect::VBNet, Some(init)) => {
            format!("Public Property {} As {} = {}", name, prop_type, init)
        }
        (Dialect::VBNet, None) => format!("Public Property {} As {}", name, prop_type),
        (Dialect::Python, Some(init)) => format!("{}: {} = {}", name, prop_type, init),
        (Dialect::Python, None) => format!("{}: {}", name, prop_type),
        // Delphi properties have no initializer
        (Dialect::Delphi, _) => {
            format!("property {}: {} read F{} write F{};", name, prop_type, name, name)
        }
    };
    Some(vec![line])
}

fn print_call(node: &StatementNode, target: Dialect) -> Vec<String> {
    let arg = render_expr(node.attr_or_empty(ARGUMENT_EXPR), target);
    let line = match target {
        Dialect::CSharp => format!("Console.WriteLine({});", arg),
        Dialect::VBNet => format!("Console.WriteLine({})", arg),
        Dialect::Python => format!("print({})", arg),
        Dialect::Delphi if arg.is_empty() => "WriteLn;".to_string(),
        Dialect::Delphi => format!("WriteLn({});", arg),
    };
    vec![line]
}

fn if_start(node: &StatementNode, target: Dialect) -> Vec<String> {
    let cond = render_expr(node.attr_or_empty(CONDITION_EXPR), target);
    match target {
        Dialect::CSharp => vec![format!("if ({}) {{", cond)],
        Dialect::VBNet => vec![format!("If {} Then", cond)],
        Dialect::Python => vec![format!("if {}:", cond)],
        Dialect::Delphi => vec![format!("if {} then", cond), "begin".to_string()],
    }
}

fn else_branch(node: &StatementNode, target: Dialect) -> Vec<String> {
    let cond = node.attr(CONDITION_EXPR).map(|c| render_expr(c, target));
    match (target, cond) {
        (Dialect::CSharp, Some(c)) => vec![format!("else if ({}) {{", c)],
        (Dialect::CSharp, None) => vec!["else {".to_string()],
        (Dialect::VBNet, Some(c)) => vec![format!("ElseIf {} Then", c)],
        (Dialect::VBNet, None) => vec!["Else".to_string()],
        (Dialect::Python, Some(c)) => vec![format!("elif {}:", c)],
        (Dialect::Python, None) => vec!["else:".to_string()],
        (Dialect::Delphi, Some(c)) => {
            vec![format!("else if {} then", c), "begin".to_string()]
        }
        (Dialect::Delphi, None) => vec!["else".to_string(), "begin".to_string()],
    }
}

fn block_end(node: &StatementNode, target: Dialect, ctx: &EmitContext) -> Option<Vec<String>> {
    let frame = ctx.closing;
    let kind = frame.map(|f| f.kind);
    let continues_if = ctx.next_is_else
        && matches!(kind, Some(StatementKind::IfStart | StatementKind::ElseBranch));
    let source_text = node.source_text().trim();

    // Raw blocks closed in their own dialect keep the closer as written
    if target == ctx.source && kind == Some(StatementKind::Raw) && !source_text.is_empty() {
        return Some(vec![source_text.to_string()]);
    }

    match target {
        Dialect::CSharp => Some(vec!["}".to_string()]),
        // An empty suite is a syntax error
        Dialect::Python => match frame {
            Some(f) if !f.has_body => {
                Some(vec![format!("{}pass", " ".repeat(ctx.indent_width))])
            }
            _ => Some(Vec::new()),
        },
        Dialect::Delphi if continues_if => Some(vec!["end".to_string()]),
        Dialect::Delphi => Some(vec!["end;".to_string()]),
        Dialect::VBNet if continues_if => Some(Vec::new()),
        Dialect::VBNet => {
            let frame = frame?;
            let closer = match frame.kind {
                StatementKind::ClassDecl => "End Class",
                StatementKind::MethodDecl if frame.returns_void => "End Sub",
                StatementKind::MethodDecl => "End Function",
                StatementKind::IfStart | StatementKind::ElseBranch => "End If",
                StatementKind::PropertyDecl => "End Property",
                _ => vb_closer(frame.opener_word.as_deref()?)?,
            };
            Some(vec![closer.to_string()])
        }
    }
}

/// VB.NET closer for a block opened by `word` in any dialect
fn vb_closer(word: &str) -> Option<&'static str> {
    let closer = match word {
        "for" | "foreach" => "Next",
        "while" => "End While",
        "do" => "Loop",
        "select" | "switch" | "case" => "End Select",
        "try" => "End Try",
        "with" => "End With",
        "using" => "End Using",
        "synclock" | "lock" => "End SyncLock",
        "namespace" => "End Namespace",
        "module" => "End Module",
        "struct" | "structure" => "End Structure",
        "enum" => "End Enum",
        "interface" => "End Interface",
        "get" => "End Get",
        "set" => "End Set",
        "operator" => "End Operator",
        "sub" => "End Sub",
        "function" => "End Function",
        "property" => "End Property",
        "if" => "End If",
        "class" => "End Class",
        _ => return None,
    };
    Some(closer)
}

fn comment(node: &StatementNode, target: Dialect, ctx: &EmitContext) -> Vec<String> {
    if target == ctx.source {
        return block_comment_lines(node.source_text());
    }
    let marker = target.comment_marker();
    let text = node.attr_or_empty(TEXT);
    if text.is_empty() {
        return vec![marker.to_string()];
    }
    text.lines()
        .map(|line| {
            if line.is_empty() {
                marker.to_string()
            } else {
                format!("{} {}", marker, line)
            }
        })
        .collect()
}

/// Lines of a comment kept as written. Continuation lines lose their common
/// indentation so the caller's indent applies to every line.
fn block_comment_lines(text: &str) -> Vec<String> {
    let mut lines = text.lines();
    let Some(first) = lines.next() else {
        return vec![String::new()];
    };
    let rest: Vec<&str> = lines.collect();
    let filled = || rest.iter().filter(|l| !l.trim().is_empty());
    let common = filled()
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    // ` * ` continuation stars line up under the opening `/*`
    let lead = if filled().count() > 0 && filled().all(|l| l.trim_start().starts_with('*')) {
        " "
    } else {
        ""
    };

    let mut out = vec![first.trim_end().to_string()];
    out.extend(rest.iter().map(|l| {
        if l.trim().is_empty() {
            String::new()
        } else {
            format!("{}{}", lead, l.get(common..).unwrap_or(l.trim_start()).trim_end())
        }
    }));
    out
}

fn raw(node: &StatementNode, target: Dialect, ctx: &EmitContext) -> Vec<String> {
    let text = node.attr_or_empty(TEXT);
    if !node.opens_block() {
        return if text.is_empty() { Vec::new() } else { vec![text.to_string()] };
    }

    let mut lines = Vec::new();
    if target == ctx.source {
        match (target, node.attr(OPENER)) {
            (Dialect::CSharp, Some(opener)) if text.is_empty() => lines.push(opener.to_string()),
            (Dialect::CSharp, Some(opener)) => lines.push(format!("{} {}", text, opener)),
            (_, opener) => {
                if !text.is_empty() {
                    lines.push(text.to_string());
                }
                lines.extend(opener.map(str::to_string));
            }
        }
        return lines;
    }

    let base = match ctx.source {
        Dialect::Python => text.strip_suffix(':').unwrap_or(text).trim_end(),
        _ => text,
    };
    match target {
        Dialect::CSharp if base.is_empty() => lines.push("{".to_string()),
        Dialect::CSharp => lines.push(format!("{} {{", base)),
        Dialect::VBNet => {
            if !base.is_empty() {
                lines.push(base.to_string());
            }
        }
        Dialect::Python => {
            if !base.is_empty() {
                lines.push(format!("{}:", base));
            }
        }
        Dialect::Delphi => {
            if !base.is_empty() {
                lines.push(base.to_string());
            }
            lines.push("begin".to_string());
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::ast::{encode_params, Param, PARAMS, RETURNS_VOID};

    fn ctx(source: Dialect) -> EmitContext<'static> {
        EmitContext::new(source, 4)
    }

    fn method(name: &str, params: &[Param], ret: Option<&str>) -> StatementNode {
        let mut node = StatementNode::new(StatementKind::MethodDecl, 1, "")
            .with_attr(NAME, name)
            .with_attr(PARAMS, encode_params(params))
            .opening(true);
        node = match ret {
            Some(rt) => node.with_attr(RETURNS_VOID, "false").with_attr(RETURN_TYPE, rt),
            None => node.with_attr(RETURNS_VOID, "true"),
        };
        node
    }

    #[test]
    fn test_method_headers() {
        let node = method("Bar", &[], None);
        let source = ctx(Dialect::CSharp);
        assert_eq!(emit(&node, Dialect::Python, &source).lines, vec!["def Bar():"]);
        assert_eq!(emit(&node, Dialect::VBNet, &source).lines, vec!["Public Sub Bar()"]);
        assert_eq!(emit(&node, Dialect::CSharp, &source).lines, vec!["public void Bar() {"]);
        assert_eq!(emit(&node, Dialect::Delphi, &source).lines, vec!["procedure Bar;", "begin"]);

        let node = method("Add", &[Param::new("a", Some("int".into())), Param::new("b", None)], Some("int"));
        assert_eq!(
            emit(&node, Dialect::VBNet, &source).lines,
            vec!["Public Function Add(a As Integer, b) As Integer"]
        );
        assert_eq!(
            emit(&node, Dialect::CSharp, &source).lines,
            vec!["public int Add(int a, object b) {"]
        );
        assert_eq!(
            emit(&node, Dialect::Delphi, &source).lines[0],
            "function Add(a: Integer; b: TObject): Integer;"
        );
        assert_eq!(emit(&node, Dialect::Python, &source).lines, vec!["def Add(a, b) -> int:"]);
    }

    #[test]
    fn test_python_self_param() {
        let node = method("Bar", &[], None);
        let mut context = ctx(Dialect::CSharp);
        context.in_class = true;
        context.python_self_param = true;
        assert_eq!(emit(&node, Dialect::Python, &context).lines, vec!["def Bar(self):"]);
    }

    #[test]
    fn test_indentation() {
        let node = StatementNode::new(StatementKind::PrintCall, 1, "").with_attr(ARGUMENT_EXPR, "\"x\"");
        let mut context = ctx(Dialect::CSharp);
        context.indent = 2;
        assert_eq!(emit(&node, Dialect::Python, &context).lines, vec!["        print(\"x\")"]);
        context.indent_width = 2;
        assert_eq!(emit(&node, Dialect::Delphi, &context).lines, vec!["    WriteLn('x');"]);
    }

    #[test]
    fn test_property_outside_class_is_unsupported() {
        let node = StatementNode::new(StatementKind::PropertyDecl, 4, "count: int = 0")
            .with_attr(NAME, "count")
            .with_attr(TYPE, "int");
        let out = emit(&node, Dialect::CSharp, &ctx(Dialect::Python));
        assert!(out.unsupported);
        assert_eq!(out.lines, vec!["// UNSUPPORTED: PropertyDecl", "// count: int = 0"]);

        let mut context = ctx(Dialect::Python);
        context.in_class = true;
        let out = emit(&node, Dialect::VBNet, &context);
        assert!(!out.unsupported);
        assert_eq!(out.lines, vec!["Public Property count As Integer"]);
    }

    #[test]
    fn test_vb_block_ends_follow_the_frame() {
        let end = StatementNode::block_end(9, "");
        let cases = [
            (StatementKind::ClassDecl, true, None, "End Class"),
            (StatementKind::MethodDecl, false, None, "End Function"),
            (StatementKind::IfStart, true, None, "End If"),
            (StatementKind::Raw, true, Some("foreach"), "Next"),
            (StatementKind::Raw, true, Some("while"), "End While"),
        ];
        for (kind, returns_void, word, expected) in cases {
            let frame = Frame {
                kind,
                returns_void,
                opener_word: word.map(str::to_string),
                has_body: true,
            };
            let mut context = ctx(Dialect::CSharp);
            context.closing = Some(&frame);
            assert_eq!(emit(&end, Dialect::VBNet, &context).lines, vec![expected]);
        }

        let frame = Frame {
            kind: StatementKind::Raw,
            returns_void: true,
            opener_word: Some("unsafe".to_string()),
            has_body: true,
        };
        let mut context = ctx(Dialect::CSharp);
        context.closing = Some(&frame);
        let out = emit(&end, Dialect::VBNet, &context);
        assert!(out.unsupported);
        assert_eq!(out.lines, vec!["' UNSUPPORTED: BlockEnd"]);
    }

    #[test]
    fn test_block_end_before_else() {
        let end = StatementNode::block_end(3, "}");
        let frame = Frame {
            kind: StatementKind::IfStart,
            returns_void: true,
            opener_word: None,
            has_body: true,
        };
        let mut context = ctx(Dialect::CSharp);
        context.closing = Some(&frame);
        context.next_is_else = true;
        assert!(emit(&end, Dialect::VBNet, &context).lines.is_empty());
        assert_eq!(emit(&end, Dialect::Delphi, &context).lines, vec!["end"]);
        assert_eq!(emit(&end, Dialect::CSharp, &context).lines, vec!["}"]);
        assert!(emit(&end, Dialect::Python, &context).lines.is_empty());
    }

    #[test]
    fn test_raw_openers() {
        let node = StatementNode::raw(1, "for x in items:").opening(true);
        let source = ctx(Dialect::Python);
        assert_eq!(emit(&node, Dialect::CSharp, &source).lines, vec!["for x in items {"]);
        assert_eq!(emit(&node, Dialect::Python, &source).lines, vec!["for x in items:"]);
        assert_eq!(emit(&node, Dialect::Delphi, &source).lines, vec!["for x in items", "begin"]);

        let node = StatementNode::raw(1, "while (x)").with_attr(OPENER, "{").opening(true);
        assert_eq!(emit(&node, Dialect::CSharp, &ctx(Dialect::CSharp)).lines, vec!["while (x) {"]);

        assert_eq!(Frame::for_node(&StatementNode::raw(1, "public enum Color").opening(true)).opener_word.as_deref(), Some("enum"));
    }

    #[test]
    fn test_comments() {
        let node = StatementNode::new(StatementKind::Comment, 1, "/* a\n   b */").with_attr(TEXT, "a\nb");
        assert_eq!(emit(&node, Dialect::Python, &ctx(Dialect::CSharp)).lines, vec!["# a", "# b"]);
        assert_eq!(emit(&node, Dialect::CSharp, &ctx(Dialect::CSharp)).lines, vec!["/* a", "b */"]);
    }

    #[test]
    fn test_block_comment_keeps_indent_on_every_line() {
        let node = StatementNode::new(StatementKind::Comment, 2, "/**\n         * a\n         */")
            .with_attr(TEXT, "a");
        let mut context = ctx(Dialect::CSharp);
        context.indent = 1;
        assert_eq!(
            emit(&node, Dialect::CSharp, &context).lines,
            vec!["    /**", "     * a", "     */"]
        );

        let node = StatementNode::new(StatementKind::Comment, 2, "{ first\n      second }")
            .with_attr(TEXT, "first\nsecond");
        let mut context = ctx(Dialect::Delphi);
        context.indent = 2;
        assert_eq!(
            emit(&node, Dialect::Delphi, &context).lines,
            vec!["        { first", "        second }"]
        );
    }
}
