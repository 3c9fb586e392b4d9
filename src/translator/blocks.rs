/// Block tracking: turns dialect-specific block delimiters into a
/// dialect-neutral nesting depth.
///
/// Brace and Delphi blocks change depth token by token. VB.NET blocks are
/// decided once a whole line has been seen, so depth changes arrive on the
/// line's Newline. Python depth is read off the leading whitespace carried by
/// Indent/Dedent tokens, measured in the file's indent unit.

use crate::translator::dialect::Dialect;
use crate::translator::error::BlockStructureError;
use crate::translator::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndentUnit {
    ch: char,
    width: usize,
}

pub(crate) const VB_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "friend", "shared", "overrides", "overridable",
    "mustinherit", "notinheritable", "partial", "static", "readonly", "writeonly", "shadows",
    "overloads", "async", "iterator", "default", "notoverridable", "mustoverride", "widening",
    "narrowing",
];

const VB_OPENERS: &[&str] = &[
    "class", "module", "structure", "interface", "namespace", "enum", "select", "try", "with",
    "using", "synclock", "while", "for", "do",
];

pub(crate) const VB_END_TARGETS: &[&str] = &[
    "sub", "function", "class", "module", "structure", "interface", "namespace", "enum", "if",
    "select", "try", "with", "using", "synclock", "while", "property", "get", "set", "operator",
    "event",
];

#[derive(Debug, Clone)]
pub struct BlockTracker {
    dialect: Dialect,
    unit: Option<IndentUnit>,
    prev: Option<String>,
    /// Inside `= class(...)` heritage, where `;` still makes it a forward declaration
    type_header: bool,
    /// Depths of the open Delphi record bodies
    records: Vec<usize>,
    vb_line: Vec<String>,
    vb_stack: Vec<String>,
    vb_after_property: bool,
}

impl BlockTracker {
    pub fn new(dialect: Dialect) -> Self {
        BlockTracker {
            dialect,
            unit: None,
            prev: None,
            type_header: false,
            records: Vec::new(),
            vb_line: Vec::new(),
            vb_stack: Vec::new(),
            vb_after_property: false,
        }
    }

    /// Next depth after `token`, given the current `depth`
    pub fn advance(&mut self, depth: usize, token: &Token) -> Result<usize, BlockStructureError> {
        match self.dialect {
            Dialect::CSharp => {
                if token.is_op("{") {
                    Ok(depth + 1)
                } else if token.is_op("}") {
                    close(depth, token.line)
                } else {
                    Ok(depth)
                }
            }
            Dialect::Delphi => self.advance_delphi(depth, token),
            Dialect::VBNet => self.advance_vb(depth, token),
            Dialect::Python => match token.kind {
                TokenKind::Indent | TokenKind::Dedent => self.indent_depth(&token.text, token.line),
                _ => Ok(depth),
            },
        }
    }

    fn advance_delphi(
        &mut self,
        depth: usize,
        token: &Token,
    ) -> Result<usize, BlockStructureError> {
        if token.is_trivia() {
            return Ok(depth);
        }

        let word = token.text.to_ascii_lowercase();
        let prev = self.prev.replace(word.clone());
        let prev = prev.as_deref();

        if self.type_header {
            // `TFoo = class;`, `EFoo = class(Exception);` and `TMeta = class of TFoo`
            if token.is_op(";") || word == "of" {
                self.type_header = false;
                return self.close_delphi(depth, token.line);
            }
            let heritage = token.kind == TokenKind::Identifier
                || ["(", ")", ",", ".", "<", ">"].iter().any(|op| token.is_op(op));
            if heritage {
                return Ok(depth);
            }
            self.type_header = false;
        }

        if token.kind != TokenKind::Keyword {
            return Ok(depth);
        }

        match word.as_str() {
            // A variant part shares the record's `end`
            "case" if self.records.last() == Some(&depth) => Ok(depth),
            "begin" | "try" | "case" | "asm" => Ok(depth + 1),
            "class" | "interface" if prev == Some("=") => self.open_type(depth),
            "record" if matches!(prev, Some("=") | Some("packed")) => {
                self.records.push(depth + 1);
                self.open_type(depth)
            }
            "end" => self.close_delphi(depth, token.line),
            "end." => {
                if self.records.last() == Some(&depth) {
                    self.records.pop();
                }
                Ok(depth.saturating_sub(1))
            }
            _ => Ok(depth),
        }
    }

    fn open_type(&mut self, depth: usize) -> Result<usize, BlockStructureError> {
        self.type_header = true;
        Ok(depth + 1)
    }

    fn close_delphi(&mut self, depth: usize, line: usize) -> Result<usize, BlockStructureError> {
        if self.records.last() == Some(&depth) {
            self.records.pop();
        }
        close(depth, line)
    }

    fn advance_vb(&mut self, depth: usize, token: &Token) -> Result<usize, BlockStructureError> {
        match token.kind {
            TokenKind::Newline | TokenKind::Eof => self.finish_vb_line(depth, token.line),
            TokenKind::Comment | TokenKind::Indent | TokenKind::Dedent => Ok(depth),
            _ => {
                self.vb_line.push(token.text.to_ascii_lowercase());
                Ok(depth)
            }
        }
    }

    fn finish_vb_line(&mut self, depth: usize, line: usize) -> Result<usize, BlockStructureError> {
        let words = std::mem::take(&mut self.vb_line);
        if words.is_empty() {
            return Ok(depth);
        }
        let after_property = std::mem::replace(&mut self.vb_after_property, false);

        let start = words
            .iter()
            .position(|w| !VB_MODIFIERS.contains(&w.as_str()))
            .unwrap_or(words.len());
        let modifiers = &words[..start];
        let first = words.get(start).map(String::as_str).unwrap_or("");
        let second = words.get(start + 1).map(String::as_str);
        let in_interface = self.vb_stack.last().map(String::as_str) == Some("interface");

        match first {
            "end" if second.map_or(false, |s| VB_END_TARGETS.contains(&s)) => {
                return self.vb_close(line);
            }
            "next" | "loop" | "wend" => return self.vb_close(line),
            _ => {}
        }

        let abstract_member = in_interface || modifiers.iter().any(|m| m == "mustoverride");
        match first {
            "sub" | "function" | "operator" if !abstract_member => {
                self.vb_stack.push(first.to_string());
            }
            "property" if !abstract_member => self.vb_after_property = true,
            "get" | "set" => {
                if after_property {
                    self.vb_stack.push("property".to_string());
                }
                self.vb_stack.push(first.to_string());
            }
            "if" if words.last().map(String::as_str) == Some("then") => {
                self.vb_stack.push("if".to_string());
            }
            w if VB_OPENERS.contains(&w) => self.vb_stack.push(w.to_string()),
            _ => {}
        }

        Ok(self.vb_stack.len())
    }

    fn vb_close(&mut self, line: usize) -> Result<usize, BlockStructureError> {
        match self.vb_stack.pop() {
            Some(_) => Ok(self.vb_stack.len()),
            None => Err(BlockStructureError::CloseAtZero { line }),
        }
    }

    /// Depth of a Python line from its leading whitespace
    fn indent_depth(&mut self, ws: &str, line: usize) -> Result<usize, BlockStructureError> {
        if ws.is_empty() {
            return Ok(0);
        }

        let has_tab = ws.contains('\t');
        let has_space = ws.contains(' ');
        if has_tab && has_space {
            return Err(BlockStructureError::MixedIndentation { line });
        }
        let ch = if has_tab { '\t' } else { ' ' };
        let width = ws.chars().count();

        let unit = *self.unit.get_or_insert(IndentUnit { ch, width });
        if unit.ch != ch {
            return Err(BlockStructureError::MixedIndentation { line });
        }
        if width % unit.width != 0 {
            return Err(BlockStructureError::InconsistentIndent {
                line,
                width,
                unit: unit.width,
            });
        }

        Ok(width / unit.width)
    }
}

fn close(depth: usize, line: usize) -> Result<usize, BlockStructureError> {
    depth
        .checked_sub(1)
        .ok_or(BlockStructureError::CloseAtZero { line })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::lexer::tokenize;

    /// Run every token through a fresh tracker, returning the depth after each
    fn depths(source: &str, dialect: Dialect) -> Result<Vec<usize>, BlockStructureError> {
        let tokens = tokenize(source, dialect).unwrap();
        let mut tracker = BlockTracker::new(dialect);
        let mut depth = 0;
        let mut out = Vec::new();
        for token in &tokens {
            depth = tracker.advance(depth, token)?;
            out.push(depth);
        }
        Ok(out)
    }

    fn final_depth(source: &str, dialect: Dialect) -> Result<usize, BlockStructureError> {
        depths(source, dialect).map(|d| d.last().copied().unwrap_or(0))
    }

    #[test]
    fn test_csharp_braces() {
        let d = depths("class A { void B() { } }", Dialect::CSharp).unwrap();
        assert_eq!(d.iter().max(), Some(&2));
        assert_eq!(d.last(), Some(&0));
    }

    #[test]
    fn test_csharp_close_at_zero_is_an_error() {
        let err = final_depth("}", Dialect::CSharp).unwrap_err();
        assert_eq!(err, BlockStructureError::CloseAtZero { line: 1 });
    }

    #[test]
    fn test_csharp_string_braces_do_not_count() {
        assert_eq!(final_depth("var s = \"{{{\";", Dialect::CSharp), Ok(0));
    }

    #[test]
    fn test_delphi_begin_end() {
        let source = "procedure Foo;\nbegin\n  if x then\n  begin\n  end;\nend;";
        let d = depths(source, Dialect::Delphi).unwrap();
        assert_eq!(d.iter().max(), Some(&2));
        assert_eq!(d.last(), Some(&0));
    }

    #[test]
    fn test_delphi_class_declarations() {
        let source = "type\n  TFwd = class;\n  TMeta = class of TFoo;\n  EBad = class(Exception);\n  TFoo = class(TObject)\n    FX: Integer;\n    procedure Bar;\n  end;";
        let d = depths(source, Dialect::Delphi).unwrap();
        assert_eq!(d.iter().max(), Some(&1));
        assert_eq!(d.last(), Some(&0));
    }

    #[test]
    fn test_delphi_variant_record_case_shares_end() {
        let source = "type\n  TShape = record\n    case Kind: Integer of\n      0: (Radius: Double);\n      1: (Width, Height: Double);\n  end;\nprocedure Foo;\nbegin\n  case x of\n    1: Bar;\n  end;\nend;";
        let d = depths(source, Dialect::Delphi).unwrap();
        assert_eq!(d.iter().max(), Some(&2));
        assert_eq!(d.last(), Some(&0));

        let fields_first = "type\n  TPoint = packed record\n    X: Integer;\n    case Boolean of\n      True: (Y: Integer);\n  end;";
        assert_eq!(final_depth(fields_first, Dialect::Delphi), Ok(0));
    }

    #[test]
    fn test_delphi_unit_terminator() {
        assert_eq!(final_depth("unit A; interface implementation end.", Dialect::Delphi), Ok(0));
        assert_eq!(final_depth("begin WriteLn; end.", Dialect::Delphi), Ok(0));
    }

    #[test]
    fn test_vb_line_level_blocks() {
        let source = "Public Class Foo\n    Public Sub Bar()\n        If x Then\n        End If\n        If y Then Baz()\n    End Sub\nEnd Class\n";
        let d = depths(source, Dialect::VBNet).unwrap();
        assert_eq!(d.iter().max(), Some(&3));
        assert_eq!(d.last(), Some(&0));
    }

    #[test]
    fn test_vb_loops_and_exit() {
        let source = "For i = 1 To 3\n    Exit For\nNext\nDo\nLoop\nWhile x\nEnd While";
        assert_eq!(final_depth(source, Dialect::VBNet), Ok(0));
    }

    #[test]
    fn test_vb_interface_members_do_not_open() {
        let source = "Interface IFoo\n    Sub Bar()\n    Function Baz() As Integer\nEnd Interface";
        assert_eq!(final_depth(source, Dialect::VBNet), Ok(0));
    }

    #[test]
    fn test_vb_expanded_property() {
        let source = "ReadOnly Property X As Integer\n    Get\n        Return 1\n    End Get\nEnd Property\nProperty Y As Integer\n";
        let d = depths(source, Dialect::VBNet).unwrap();
        assert_eq!(d.iter().max(), Some(&2));
        assert_eq!(d.last(), Some(&0));
    }

    #[test]
    fn test_vb_unmatched_end_is_an_error() {
        let err = final_depth("End Sub\n", Dialect::VBNet).unwrap_err();
        assert_eq!(err, BlockStructureError::CloseAtZero { line: 1 });
    }

    #[test]
    fn test_python_indent_unit() {
        let source = "def f():\n  if x:\n    y()\n  z()\n";
        let d = depths(source, Dialect::Python).unwrap();
        assert_eq!(d.iter().max(), Some(&2));
        assert_eq!(d.last(), Some(&0));
    }

    #[test]
    fn test_python_mixed_indentation() {
        let err = final_depth("if a:\n    b()\nif c:\n\td()\n", Dialect::Python).unwrap_err();
        assert_eq!(err, BlockStructureError::MixedIndentation { line: 4 });
    }

    #[test]
    fn test_python_inconsistent_indentation() {
        let err = final_depth("if a:\n    b()\n      c()\n", Dialect::Python).unwrap_err();
        assert_eq!(
            err,
            BlockStructureError::InconsistentIndent { line: 3, width: 6, unit: 4 }
        );
    }
}
