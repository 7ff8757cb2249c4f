//! Lexical analysis: turns the raw input string into a stream of tokens.
//!
//! The tokenizer knows nothing about semantics beyond recognising operators,
//! names and integer literals. `:=` is matched before any single-character
//! punctuator. Characters it does not recognise are recorded as diagnostics and
//! skipped one at a time; scanning always runs to the end of the input.

use std::fmt;

use tracing::warn;

use crate::error::SourceMarker;

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Num,
  Ident,
  Add,
  Sub,
  Mul,
  Div,
  LParen,
  RParen,
  Semi,
  Assign,
  Eof,
}

impl TokenKind {
  fn punctuator(c: u8) -> Option<Self> {
    let kind = match c {
      b'+' => Self::Add,
      b'-' => Self::Sub,
      b'*' => Self::Mul,
      b'/' => Self::Div,
      b'(' => Self::LParen,
      b')' => Self::RParen,
      b';' => Self::Semi,
      _ => return None,
    };
    Some(kind)
  }
}

/// Thin wrapper for lexical information needed by later stages.
///
/// `value` is set for `Num` tokens whose digits fit in an `i64`; an
/// out-of-range literal keeps `None` and is rejected by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the scanning loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

/// A character the tokenizer skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexDiagnostic {
  pub loc: usize,
  pub ch: char,
  at: SourceMarker,
}

impl fmt::Display for LexDiagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} skipping unexpected character '{}'", self.at, self.ch)
  }
}

/// Lazy scanner over a source string.
///
/// Yields tokens in order, then a single `Eof` token, then nothing. Cloning or
/// calling [`Lexer::reset`] restarts the scan from the first byte.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
  source: &'a str,
  pos: usize,
  finished: bool,
  diagnostics: Vec<LexDiagnostic>,
}

impl<'a> Lexer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      pos: 0,
      finished: false,
      diagnostics: Vec::new(),
    }
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  pub fn reset(&mut self) {
    self.pos = 0;
    self.finished = false;
    self.diagnostics.clear();
  }

  /// Characters skipped so far.
  pub fn diagnostics(&self) -> &[LexDiagnostic] {
    &self.diagnostics
  }

  pub fn take_diagnostics(&mut self) -> Vec<LexDiagnostic> {
    std::mem::take(&mut self.diagnostics)
  }

  fn scan_while(&mut self, pred: impl Fn(u8) -> bool) {
    let source = self.source;
    let bytes = source.as_bytes();
    while self.pos < bytes.len() && pred(bytes[self.pos]) {
      self.pos += 1;
    }
  }

  fn skip_unexpected(&mut self) {
    let Some(ch) = self.source[self.pos..].chars().next() else {
      return;
    };
    warn!(loc = self.pos, %ch, "skipping unexpected character");
    self.diagnostics.push(LexDiagnostic {
      loc: self.pos,
      ch,
      at: SourceMarker::new(self.source, self.pos),
    });
    self.pos += ch.len_utf8();
  }
}

impl Iterator for Lexer<'_> {
  type Item = Token;

  fn next(&mut self) -> Option<Token> {
    if self.finished {
      return None;
    }

    let source = self.source;
    let bytes = source.as_bytes();
    while self.pos < bytes.len() {
      let start = self.pos;
      let c = bytes[start];

      if c.is_ascii_whitespace() {
        self.pos += 1;
        continue;
      }

      if c.is_ascii_digit() {
        self.scan_while(|b| b.is_ascii_digit());
        let value = source[start..self.pos].parse::<i64>().ok();
        return Some(Token::new(TokenKind::Num, start, self.pos - start, value));
      }

      if c.is_ascii_alphabetic() || c == b'_' {
        self.scan_while(|b| b.is_ascii_alphanumeric() || b == b'_');
        return Some(Token::new(TokenKind::Ident, start, self.pos - start, None));
      }

      if source[start..].starts_with(":=") {
        self.pos += 2;
        return Some(Token::new(TokenKind::Assign, start, 2, None));
      }

      if let Some(kind) = TokenKind::punctuator(c) {
        self.pos += 1;
        return Some(Token::new(kind, start, 1, None));
      }

      self.skip_unexpected();
    }

    self.finished = true;
    Some(Token::new(TokenKind::Eof, source.len(), 0, None))
  }
}

/// Lex the whole input into a vector terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> (Vec<Token>, Vec<LexDiagnostic>) {
  let mut lexer = Lexer::new(input);
  let tokens = lexer.by_ref().collect();
  (tokens, lexer.take_diagnostics())
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token, source: &str) -> String {
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    _ => token_text(token, source).to_string(),
  }
}
