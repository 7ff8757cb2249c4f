//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics point at the offending byte with a caret underneath the quoted
//! source line. Internal invariant failures carry no location; they mean the
//! parser drove the code generator into a state the grammar cannot produce.

use std::fmt;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Quoted source line plus a caret line pointing at one byte of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMarker {
  expr_line: String,
  marker: String,
}

impl SourceMarker {
  pub fn new(expr: &str, loc: usize) -> Self {
    let expr_line = format!("'{expr}'");
    let safe_loc = loc.min(expr.len());
    let char_offset = expr[..safe_loc].chars().count() + 1; // account for opening quote
    let marker = format!("{}^", " ".repeat(char_offset));
    Self { expr_line, marker }
  }
}

impl fmt::Display for SourceMarker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}\n{}", self.expr_line, self.marker)
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{at} {message}"))]
  Syntax { at: SourceMarker, message: String },

  #[snafu(display("{at} undefined variable '{name}'"))]
  UndefinedVariable { at: SourceMarker, name: String },

  #[snafu(display("{at} division by zero"))]
  DivisionByZero { at: SourceMarker },

  #[snafu(display("internal error: {needed} pending operand(s) required, stack depth is {depth}"))]
  StackUnderflow { needed: usize, depth: usize },

  #[snafu(display("internal error: statement ended with stack depth {depth}, expected {expected}"))]
  UnbalancedStatement { depth: usize, expected: usize },

  #[snafu(display("internal error: expected {expected} on top of the parse stack"))]
  ParseStack { expected: &'static str },
}

impl CompileError {
  /// Construct a syntax error anchored at a specific byte offset in the source.
  pub fn at(expr: &str, loc: usize, message: impl Into<String>) -> Self {
    SyntaxSnafu {
      at: SourceMarker::new(expr, loc),
      message,
    }
    .build()
  }

  /// Internal errors indicate a parser/code generator bug rather than bad input.
  pub fn is_internal(&self) -> bool {
    matches!(
      self,
      Self::StackUnderflow { .. } | Self::UnbalancedStatement { .. } | Self::ParseStack { .. }
    )
  }
}
