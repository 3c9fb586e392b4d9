/// Structural translator between C#, VB.NET, Python and Delphi
pub mod ast;
pub mod blocks;
pub mod classifier;
pub mod dialect;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod expr;
pub mod lexer;
pub mod segment;
pub mod token;

pub use crate::translator::dialect::Dialect;
pub use crate::translator::driver::{
    Driver, DriverState, Leniency, TranslateOptions, Translation, TranslationFailure,
};
pub use crate::translator::error::{BlockStructureError, LexError, TranslateError, Warning};

/// Translate one file's text from `options.source` to `options.target`
pub fn translate(
    source: &str,
    options: &TranslateOptions,
) -> Result<Translation, TranslationFailure> {
    let mut driver = Driver::new(options.clone());
    driver.translate(source)
}

/// Lex `source` and validate its block structure without classifying or
/// emitting. Returns the depth still open at end of input.
pub fn check(source: &str, dialect: Dialect) -> Result<usize, TranslateError> {
    let tokens = lexer::tokenize(source, dialect)?;
    let mut tracker = blocks::BlockTracker::new(dialect);
    let mut depth = 0;
    for token in &tokens {
        depth = tracker.advance(depth, token)?;
    }
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_translate() {
        let source = r#"System.Console.WriteLine("Hello, World!");"#;
        let options = TranslateOptions::new(Dialect::CSharp, Dialect::Python);
        let result = translate(source, &options);
        assert!(result.is_ok(), "Translation failed: {:?}", result.err());

        let python = result.unwrap();
        assert_eq!(python.output, "print(\"Hello, World!\")\n");
        assert!(python.warnings.is_empty());
    }

    #[test]
    fn test_check_reports_open_depth() {
        assert_eq!(check("class A { void B() { } }", Dialect::CSharp), Ok(0));
        assert_eq!(check("Public Class A\n", Dialect::VBNet), Ok(1));
        assert!(matches!(
            check("x = \"open", Dialect::Python),
            Err(TranslateError::Lex(_))
        ));
        assert!(matches!(
            check("end;", Dialect::Delphi),
            Err(TranslateError::BlockStructure(BlockStructureError::CloseAtZero { .. }))
        ));
    }
}
