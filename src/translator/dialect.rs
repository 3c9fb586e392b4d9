/// Source and target language surface forms

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Dialect {
    CSharp,
    VBNet,
    Python,
    Delphi,
}

impl Dialect {
    pub const ALL: [Dialect; 4] =
        [Dialect::CSharp, Dialect::VBNet, Dialect::Python, Dialect::Delphi];

    /// Display name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::CSharp => "C#",
            Dialect::VBNet => "VB.NET",
            Dialect::Python => "Python",
            Dialect::Delphi => "Delphi",
        }
    }

    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::CSharp => "cs",
            Dialect::VBNet => "vb",
            Dialect::Python => "py",
            Dialect::Delphi => "pas",
        }
    }

    /// Short uppercase tag used for default output directories (`src_PY`)
    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::CSharp => "CS",
            Dialect::VBNet => "VB",
            Dialect::Python => "PY",
            Dialect::Delphi => "PAS",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Dialect::CSharp => &["cs", "csharp", "c#"],
            Dialect::VBNet => &["vb", "vbnet", "vb.net"],
            Dialect::Python => &["py", "python"],
            Dialect::Delphi => &["pas", "delphi", "pascal"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Dialect> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "cs" => Some(Dialect::CSharp),
            "vb" => Some(Dialect::VBNet),
            "py" => Some(Dialect::Python),
            "pas" | "dpr" => Some(Dialect::Delphi),
            _ => None,
        }
    }

    /// Marker that starts a line comment
    pub fn comment_marker(&self) -> &'static str {
        match self {
            Dialect::CSharp | Dialect::Delphi => "//",
            Dialect::VBNet => "'",
            Dialect::Python => "#",
        }
    }

    pub fn case_insensitive(&self) -> bool {
        matches!(self, Dialect::VBNet | Dialect::Delphi)
    }

    /// Blocks are delimited by indentation rather than markers
    pub fn uses_indentation(&self) -> bool {
        matches!(self, Dialect::Python)
    }

    /// A statement ends at the end of its line
    pub fn line_oriented(&self) -> bool {
        matches!(self, Dialect::VBNet | Dialect::Python)
    }

    /// `Else`/`ElseIf` continue the enclosing block in place instead of
    /// closing one block and opening another
    pub fn continues_in_place(&self) -> bool {
        matches!(self, Dialect::VBNet)
    }

    /// Compare a lexeme against a keyword using the dialect's case rules
    pub fn keyword_eq(&self, text: &str, keyword: &str) -> bool {
        if self.case_insensitive() {
            text.eq_ignore_ascii_case(keyword)
        } else {
            text == keyword
        }
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        let keywords: &[&str] = match self {
            Dialect::CSharp => CSHARP_KEYWORDS,
            Dialect::VBNet => VB_KEYWORDS,
            Dialect::Python => PYTHON_KEYWORDS,
            Dialect::Delphi => DELPHI_KEYWORDS,
        };
        if self.case_insensitive() {
            keywords.iter().any(|k| k.eq_ignore_ascii_case(word))
        } else {
            keywords.contains(&word)
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Dialect::ALL
            .into_iter()
            .find(|d| d.aliases().contains(&lower.as_str()))
            .ok_or_else(|| {
                format!(
                    "unknown dialect '{}' (expected one of: cs, vb, py, pas)",
                    s
                )
            })
    }
}

impl TryFrom<String> for Dialect {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "base", "bool", "break", "byte", "case", "catch", "char",
    "checked", "class", "const", "continue", "decimal", "default", "delegate", "do", "double",
    "else", "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "get", "goto", "if", "implicit", "in", "init", "int", "interface", "internal", "is",
    "lock", "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "partial", "private", "protected", "public", "readonly", "record", "ref", "return", "sbyte",
    "sealed", "set", "short", "sizeof", "stackalloc", "static", "string", "struct", "switch",
    "this", "throw", "true", "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort",
    "using", "var", "virtual", "void", "volatile", "while", "yield",
];

const VB_KEYWORDS: &[&str] = &[
    "AddHandler", "AndAlso", "And", "As", "Boolean", "ByRef", "ByVal", "Call", "Case", "Catch",
    "Class", "Const", "Date", "Declare", "Default", "Dim", "Do", "Double", "Each", "Else",
    "ElseIf", "End", "Enum", "Event", "Exit", "False", "Finally", "For", "Friend", "Function",
    "Get", "Handles", "If", "Implements", "Imports", "In", "Inherits", "Integer", "Interface",
    "Is", "IsNot", "Let", "Long", "Loop", "Me", "Mod", "Module", "MustInherit", "MustOverride",
    "MyBase", "Namespace", "Narrowing", "New", "Next", "Not", "Nothing", "NotInheritable",
    "NotOverridable", "Object", "Of", "Operator", "Optional", "Or", "OrElse", "Overloads",
    "Overridable", "Overrides", "ParamArray", "Partial", "Private", "Property", "Protected",
    "Public", "ReadOnly", "ReDim", "Return", "Select", "Set", "Shadows", "Shared", "Single",
    "Static", "Step", "Stop", "String", "Structure", "Sub", "SyncLock", "Then", "Throw", "To",
    "True", "Try", "Until", "Using", "Wend", "When", "While", "Widening", "With", "WriteOnly",
    "Xor", "Async", "Iterator",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const DELPHI_KEYWORDS: &[&str] = &[
    "and", "array", "as", "asm", "begin", "case", "class", "const", "constructor", "destructor",
    "div", "do", "downto", "else", "end", "end.", "except", "exports", "file", "finalization",
    "finally", "for", "function", "goto", "if", "implementation", "in", "inherited",
    "initialization", "inline", "interface", "is", "label", "library", "mod", "nil", "not",
    "object", "of", "or", "out", "packed", "private", "procedure", "program", "property",
    "protected", "public", "published", "raise", "record", "repeat", "resourcestring", "set",
    "shl", "shr", "strict", "string", "then", "threadvar", "to", "try", "type", "unit", "until",
    "uses", "var", "while", "with", "xor", "true", "false", "override", "virtual", "abstract",
    "overload", "reintroduce", "static",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("cs".parse::<Dialect>(), Ok(Dialect::CSharp));
        assert_eq!("C#".parse::<Dialect>(), Ok(Dialect::CSharp));
        assert_eq!("VB.NET".parse::<Dialect>(), Ok(Dialect::VBNet));
        assert_eq!("python".parse::<Dialect>(), Ok(Dialect::Python));
        assert_eq!("Pascal".parse::<Dialect>(), Ok(Dialect::Delphi));
        assert!("cobol".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_extensions() {
        for dialect in Dialect::ALL {
            assert_eq!(Dialect::from_extension(dialect.extension()), Some(dialect));
        }
        assert_eq!(Dialect::from_extension(".CS"), Some(Dialect::CSharp));
        assert_eq!(Dialect::from_extension("txt"), None);
    }

    #[test]
    fn test_keyword_case_rules() {
        assert!(Dialect::VBNet.is_keyword("end"));
        assert!(Dialect::VBNet.is_keyword("END"));
        assert!(Dialect::Delphi.is_keyword("BEGIN"));
        assert!(Dialect::CSharp.is_keyword("class"));
        assert!(!Dialect::CSharp.is_keyword("Class"));
        assert!(!Dialect::Python.is_keyword("print"));
    }
}
