/// Translation driver
///
/// Runs one file through the pipeline in two passes. The structure pass lexes
/// the source, cuts it into windows, tracks block depth and classifies each
/// window into the translation unit, synthesizing block ends where a dialect
/// closes blocks implicitly. The emit pass walks the unit with a stack of
/// target-side frames and renders every statement.

use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::translator::ast::{StatementKind, StatementNode, TranslationUnit, TEXT};
use crate::translator::blocks::BlockTracker;
use crate::translator::classifier::classify;
use crate::translator::dialect::Dialect;
use crate::translator::emitter::{emit, EmitContext, Frame};
use crate::translator::error::{BlockStructureError, TranslateError, Warning};
use crate::translator::lexer::tokenize;
use crate::translator::segment::{Segment, Segmenter, Window};
use crate::translator::token::Token;

/// What to do with warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leniency {
    /// Emit placeholders and keep going
    #[default]
    Lenient,
    /// Fail the file on the first warning
    Strict,
}

impl FromStr for Leniency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(Leniency::Lenient),
            "strict" => Ok(Leniency::Strict),
            other => Err(format!("unknown leniency '{}' (expected lenient or strict)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateOptions {
    pub source: Dialect,
    pub target: Dialect,
    pub leniency: Leniency,
    /// Spaces per nesting level in the output
    pub indent_width: usize,
    /// Give Python methods inside a class an explicit `self`
    pub python_self_param: bool,
}

impl TranslateOptions {
    pub fn new(source: Dialect, target: Dialect) -> Self {
        TranslateOptions {
            source,
            target,
            leniency: Leniency::Lenient,
            indent_width: 4,
            python_self_param: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Lexing,
    Emitting,
    Done,
    Failed,
}

/// A successful translation
#[derive(Debug, Clone)]
pub struct Translation {
    pub output: String,
    pub warnings: Vec<Warning>,
    pub unit: TranslationUnit,
}

/// A failed translation, with whatever output was produced before the error
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct TranslationFailure {
    pub error: TranslateError,
    pub partial_output: String,
}

pub struct Driver {
    options: TranslateOptions,
    state: DriverState,
}

impl Driver {
    pub fn new(options: TranslateOptions) -> Self {
        Driver {
            options,
            state: DriverState::Idle,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn translate(&mut self, source_text: &str) -> Result<Translation, TranslationFailure> {
        let (source, target) = (self.options.source, self.options.target);
        debug!(%source, %target, bytes = source_text.len(), "translating");

        self.state = DriverState::Lexing;
        let tokens = match tokenize(source_text, source) {
            Ok(tokens) => tokens,
            Err(e) => {
                return Err(self.fail(e.into(), String::new()));
            }
        };
        debug!(tokens = tokens.len(), "lexed");

        self.state = DriverState::Emitting;
        let mut pass = StructurePass::new(source);
        let structure = pass.run(&tokens);
        let unit = TranslationUnit {
            source,
            target,
            statements: pass.statements,
        };
        let (output, mut warnings) = emit_unit(&unit, &self.options);

        if let Err(e) = structure {
            return Err(self.fail(e.into(), output));
        }
        debug!(statements = unit.statements.len(), "emitted");

        if pass.depth != 0 {
            warnings.push(Warning::BlockStructure(BlockStructureError::UnclosedAtEof {
                depth: pass.depth,
            }));
        }

        if self.options.leniency == Leniency::Strict {
            if let Some(warning) = warnings.first().cloned() {
                return Err(self.fail(TranslateError::Strict(warning), output));
            }
        }

        self.state = DriverState::Done;
        Ok(Translation {
            output,
            warnings,
            unit,
        })
    }

    fn fail(&mut self, error: TranslateError, partial_output: String) -> TranslationFailure {
        debug!(%error, "translation failed");
        self.state = DriverState::Failed;
        TranslationFailure {
            error,
            partial_output,
        }
    }
}

/// Builds the translation unit from the token stream
struct StructurePass {
    dialect: Dialect,
    tracker: BlockTracker,
    /// Depth reported by the block tracker
    depth: usize,
    /// Blocks opened by statements already in the unit
    open: usize,
    statements: Vec<StatementNode>,
}

impl StructurePass {
    fn new(dialect: Dialect) -> Self {
        StructurePass {
            dialect,
            tracker: BlockTracker::new(dialect),
            depth: 0,
            open: 0,
            statements: Vec::new(),
        }
    }

    fn run(&mut self, tokens: &[Token]) -> Result<(), BlockStructureError> {
        let mut last_line = 1;
        for segment in Segmenter::new(tokens, self.dialect) {
            match segment {
                Segment::Layout(token) => {
                    self.depth = self.tracker.advance(self.depth, &token)?;
                    last_line = token.line;
                    self.reconcile(token.line);
                }
                Segment::Statement(window) => {
                    last_line = window.line.max(last_line);
                    if self.dialect.uses_indentation() {
                        self.indented_statement(window)?;
                    } else {
                        self.delimited_statement(window)?;
                    }
                }
            }
        }
        if self.dialect.uses_indentation() {
            self.reconcile(last_line);
        }
        Ok(())
    }

    /// Python: openers end in `:`, blocks close when the indentation drops
    fn indented_statement(&mut self, window: Window) -> Result<(), BlockStructureError> {
        for token in &window.feed {
            self.depth = self.tracker.advance(self.depth, token)?;
        }
        if window.is_empty() {
            return Ok(());
        }

        let node = classify(&window, self.dialect);
        // Comment lines carry no indentation and stay in the current block
        if node.kind() == StatementKind::Comment {
            self.statements.push(node.at_depth(self.open));
            return Ok(());
        }

        self.reconcile(window.line);
        let opens = window.tokens.last().map_or(false, |t| t.is_op(":"));
        self.statements.push(node.at_depth(self.open).opening(opens));
        if opens {
            self.open += 1;
        }
        Ok(())
    }

    /// Close statements the indentation left, and open implicit blocks for
    /// indentation no statement asked for
    fn reconcile(&mut self, line: usize) {
        while self.open > self.depth {
            self.open -= 1;
            self.statements
                .push(StatementNode::block_end(line, "").at_depth(self.open));
        }
        while self.open < self.depth {
            self.statements
                .push(StatementNode::raw(line, "").at_depth(self.open).opening(true));
            self.open += 1;
        }
    }

    /// Brace, keyword and line-delimited dialects: the tracker decides
    fn delimited_statement(&mut self, window: Window) -> Result<(), BlockStructureError> {
        let before = self.depth;
        for token in &window.feed {
            self.depth = self.tracker.advance(self.depth, token)?;
        }
        let after = self.depth;
        self.open = after;

        if window.is_empty() && window.opener().is_none() {
            return Ok(());
        }
        let node = classify(&window, self.dialect);
        let line = node.line();

        match node.kind() {
            StatementKind::BlockEnd if after < before => {
                self.statements.push(node.at_depth(before - 1));
                for level in (after..before - 1).rev() {
                    self.statements.push(StatementNode::block_end(line, "").at_depth(level));
                }
            }
            // Closes nothing, like Delphi's `end.` after the last block
            StatementKind::BlockEnd => {
                let raw = StatementNode::raw(line, node.source_text()).at_depth(before);
                self.statements.push(raw.opening(after > before));
            }
            // VB.NET `Else` closes the `If` part and opens its own block in place
            StatementKind::ElseBranch if self.dialect.continues_in_place() => {
                let depth = before
                    .checked_sub(1)
                    .ok_or(BlockStructureError::CloseAtZero { line })?;
                self.statements.push(StatementNode::block_end(line, "").at_depth(depth));
                self.statements.push(node.at_depth(depth).opening(true));
            }
            _ => {
                // A line that opens two blocks, like a VB property's first
                // accessor, owes one frame to an earlier statement
                for level in before..after.saturating_sub(1) {
                    self.statements
                        .push(StatementNode::raw(line, "").at_depth(level).opening(true));
                }
                let depth = if after > before { after - 1 } else { before };
                self.statements.push(node.at_depth(depth).opening(after > before));
                for level in (after..before).rev() {
                    self.statements.push(StatementNode::block_end(line, "").at_depth(level));
                }
            }
        }
        Ok(())
    }
}

/// Emit pass: render the unit with a stack of target-side frames
fn emit_unit(unit: &TranslationUnit, options: &TranslateOptions) -> (String, Vec<Warning>) {
    let mut frames: Vec<Frame> = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut warnings = Vec::new();

    for (i, node) in unit.statements.iter().enumerate() {
        let next_is_else = unit.statements[i + 1..]
            .iter()
            .find(|n| n.kind() != StatementKind::Comment)
            .map_or(false, |n| continues_if(n, unit.target));
        let closing = if node.kind() == StatementKind::BlockEnd {
            frames.pop()
        } else {
            None
        };

        let ctx = EmitContext {
            source: unit.source,
            indent: frames.len(),
            indent_width: options.indent_width,
            in_class: frames
                .last()
                .map_or(false, |f| f.kind == StatementKind::ClassDecl),
            closing: closing.as_ref(),
            next_is_else,
            python_self_param: options.python_self_param,
        };

        let emitted = emit(node, unit.target, &ctx);
        if emitted.unsupported {
            debug!(kind = %node.kind(), line = node.line(), "unsupported construct");
            warnings.push(Warning::UnsupportedConstruct {
                kind: node.kind(),
                line: node.line(),
            });
        }
        let is_body = !matches!(node.kind(), StatementKind::BlockEnd | StatementKind::Comment)
            && !emitted.unsupported
            && (node.opens_block() || !emitted.lines.is_empty());
        if is_body {
            if let Some(parent) = frames.last_mut() {
                parent.has_body = true;
            }
        }
        lines.extend(emitted.lines);

        if node.opens_block() {
            frames.push(Frame::for_node(node));
        }
    }

    let mut output = lines.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    (output, warnings)
}

/// `node` carries on the `if` whose block just closed
fn continues_if(node: &StatementNode, target: Dialect) -> bool {
    match node.kind() {
        StatementKind::ElseBranch => true,
        // Delphi `end else b;` keeps a single-statement else as a raw line
        StatementKind::Raw => {
            target == Dialect::Delphi
                && node
                    .attr_or_empty(TEXT)
                    .split_whitespace()
                    .next()
                    .map_or(false, |w| w.eq_ignore_ascii_case("else"))
        }
        _ => false,
    }
}
