/// Dialect-neutral statement representation

use std::collections::BTreeMap;
use std::fmt;

use crate::translator::dialect::Dialect;

pub const NAME: &str = "name";
pub const RETURNS_VOID: &str = "returnsVoid";
pub const RETURN_TYPE: &str = "returnType";
pub const PARAMS: &str = "params";
pub const TYPE: &str = "type";
/// Initial value of a property or field, as a neutral expression
pub const INITIALIZER: &str = "initializer";
pub const ARGUMENT_EXPR: &str = "argumentExpr";
pub const CONDITION_EXPR: &str = "conditionExpr";
pub const TEXT: &str = "text";
/// Block-opening token consumed after a raw statement (`{`, `begin`)
pub const OPENER: &str = "opener";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    ClassDecl,
    MethodDecl,
    PropertyDecl,
    PrintCall,
    IfStart,
    ElseBranch,
    BlockEnd,
    Comment,
    Raw,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::ClassDecl => "ClassDecl",
            StatementKind::MethodDecl => "MethodDecl",
            StatementKind::PropertyDecl => "PropertyDecl",
            StatementKind::PrintCall => "PrintCall",
            StatementKind::IfStart => "IfStart",
            StatementKind::ElseBranch => "ElseBranch",
            StatementKind::BlockEnd => "BlockEnd",
            StatementKind::Comment => "Comment",
            StatementKind::Raw => "Raw",
        };
        f.write_str(name)
    }
}

/// One classified statement. Built once by the classifier, read once by the
/// emitter; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementNode {
    kind: StatementKind,
    attributes: BTreeMap<String, String>,
    source_depth: usize,
    opens_block: bool,
    line: usize,
    source_text: String,
}

impl StatementNode {
    pub fn new(kind: StatementKind, line: usize, source_text: impl Into<String>) -> Self {
        StatementNode {
            kind,
            attributes: BTreeMap::new(),
            source_depth: 0,
            opens_block: false,
            line,
            source_text: source_text.into(),
        }
    }

    /// Raw passthrough carrying its literal text
    pub fn raw(line: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        StatementNode::new(StatementKind::Raw, line, text.clone()).with_attr(TEXT, text)
    }

    pub fn block_end(line: usize, source_text: impl Into<String>) -> Self {
        StatementNode::new(StatementKind::BlockEnd, line, source_text)
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn at_depth(mut self, depth: usize) -> Self {
        self.source_depth = depth;
        self
    }

    pub fn opening(mut self, opens_block: bool) -> Self {
        self.opens_block = opens_block;
        self
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value, or an empty string when absent
    pub fn attr_or_empty(&self, name: &str) -> &str {
        self.attr(name).unwrap_or("")
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn source_depth(&self) -> usize {
        self.source_depth
    }

    pub fn opens_block(&self) -> bool {
        self.opens_block
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn returns_void(&self) -> bool {
        self.attr(RETURNS_VOID) != Some("false")
    }

    pub fn params(&self) -> Vec<Param> {
        self.attr(PARAMS).map(decode_params).unwrap_or_default()
    }
}

/// A method parameter in source spelling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Option<String>) -> Self {
        Param {
            name: name.into(),
            ty,
        }
    }
}

/// Pack parameters into a single attribute value: `a: int; b: string`
pub fn encode_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| match &p.ty {
            Some(ty) => format!("{}: {}", p.name, ty),
            None => p.name.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn decode_params(encoded: &str) -> Vec<Param> {
    encoded
        .split("; ")
        .filter(|s| !s.trim().is_empty())
        .map(|entry| match entry.split_once(": ") {
            Some((name, ty)) => Param::new(name.trim(), Some(ty.trim().to_string())),
            None => Param::new(entry.trim(), None),
        })
        .collect()
}

/// Statements of one file, owned by the driver for the length of a translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    pub source: Dialect,
    pub target: Dialect,
    pub statements: Vec<StatementNode>,
}

impl TranslationUnit {
    pub fn new(source: Dialect, target: Dialect) -> Self {
        TranslationUnit {
            source,
            target,
            statements: Vec::new(),
        }
    }

    pub fn kinds(&self) -> Vec<StatementKind> {
        self.statements.iter().map(StatementNode::kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_encoding() {
        let params = vec![
            Param::new("map", Some("Dictionary<string, int>".to_string())),
            Param::new("x", None),
        ];
        let encoded = encode_params(&params);
        assert_eq!(encoded, "map: Dictionary<string, int>; x");
        assert_eq!(decode_params(&encoded), params);
        assert!(decode_params("").is_empty());
    }

    #[test]
    fn test_node_builder() {
        let node = StatementNode::new(StatementKind::MethodDecl, 3, "void Bar()")
            .with_attr(NAME, "Bar")
            .with_attr(RETURNS_VOID, "true")
            .at_depth(1)
            .opening(true);
        assert_eq!(node.kind(), StatementKind::MethodDecl);
        assert_eq!(node.attr(NAME), Some("Bar"));
        assert!(node.returns_void());
        assert_eq!(node.source_depth(), 1);
        assert!(node.opens_block());
        assert_eq!(node.line(), 3);
    }
}
