//! Bottom-up shift-reduce parser that drives code generation directly.
//!
//! Grammar:
//!
//! ```text
//! program    := (statement ';')*
//! statement  := NAME ':=' expression | expression | ε
//! expression := expression ('+'|'-') term | term
//! term       := term ('*'|'/') factor | factor
//! factor     := '(' expression ')' | NUMBER | NAME
//! ```
//!
//! The parser reads one token of lookahead and never backtracks. No tree is
//! kept: the parse stack holds terminals and the compile-time value of each
//! reduced nonterminal, and every reduction immediately fires its semantic
//! action on the [`Context`]. After `statement ';'` is reduced the stack is
//! empty again.

use std::fmt;

use tracing::{debug, trace};

use crate::context::Context;
use crate::error::{CompileError, CompileResult, ParseStackSnafu};
use crate::tokenizer::{Lexer, Token, TokenKind, describe_token, token_text};

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  pub fn from_token(kind: TokenKind) -> Option<Self> {
    match kind {
      TokenKind::Add => Some(Self::Add),
      TokenKind::Sub => Some(Self::Sub),
      TokenKind::Mul => Some(Self::Mul),
      TokenKind::Div => Some(Self::Div),
      _ => None,
    }
  }

  /// Binding strength; higher binds tighter. Every level is left-associative.
  pub fn precedence(self) -> u8 {
    match self {
      Self::Add | Self::Sub => 1,
      Self::Mul | Self::Div => 2,
    }
  }
}

/// Grammar rules, one per reduction the parser can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production {
  /// `program := program statement ';'`
  Program,
  /// `statement := NAME ':=' expression`
  StmtAssign,
  /// `statement := expression`
  StmtExpr,
  /// `statement := ε`
  StmtEmpty,
  /// `expression := expression ('+'|'-') term`
  ExprBinary(BinaryOp),
  /// `expression := term`
  ExprTerm,
  /// `term := term ('*'|'/') factor`
  TermBinary(BinaryOp),
  /// `term := factor`
  TermFactor,
  /// `factor := '(' expression ')'`
  FactorGroup,
  /// `factor := NUMBER`
  FactorNum,
  /// `factor := NAME`
  FactorName,
}

impl fmt::Display for Production {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let op = |op: &BinaryOp| match op {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
    };
    match self {
      Self::Program => f.write_str("program -> program statement ;"),
      Self::StmtAssign => f.write_str("statement -> NAME := expression"),
      Self::StmtExpr => f.write_str("statement -> expression"),
      Self::StmtEmpty => f.write_str("statement -> <empty>"),
      Self::ExprBinary(o) => write!(f, "expression -> expression {} term", op(o)),
      Self::ExprTerm => f.write_str("expression -> term"),
      Self::TermBinary(o) => write!(f, "term -> term {} factor", op(o)),
      Self::TermFactor => f.write_str("term -> factor"),
      Self::FactorGroup => f.write_str("factor -> ( expression )"),
      Self::FactorNum => f.write_str("factor -> NUMBER"),
      Self::FactorName => f.write_str("factor -> NAME"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
  Shift,
  Reduce(Production),
  Accept,
}

/// Compile-time value of a reduced phrase and where it starts. The value is
/// `None` once it no longer fits in an `i64`.
#[derive(Debug, Clone, Copy)]
struct Attr {
  value: Option<i64>,
  loc: usize,
}

#[derive(Debug, Clone)]
enum Symbol {
  Token(Token),
  Stmt(Option<i64>),
  Expr(Attr),
  Term(Attr),
  Factor(Attr),
}

impl Symbol {
  fn is_token(&self, kind: TokenKind) -> bool {
    matches!(self, Symbol::Token(token) if token.kind == kind)
  }
}

/// Parse the whole token stream, firing semantic actions on `ctx`.
///
/// Returns the number of statements reduced, empty ones included. Skipped
/// characters stay recorded on the lexer.
pub fn parse(lexer: &mut Lexer<'_>, ctx: &mut Context<'_>) -> CompileResult<usize> {
  let mut parser = Parser::new(lexer, ctx);
  parser.run()?;
  Ok(parser.statements)
}

struct Parser<'p, 'a, 'c> {
  lexer: &'p mut Lexer<'a>,
  ctx: &'p mut Context<'c>,
  source: &'a str,
  lookahead: Token,
  stack: Vec<Symbol>,
  statements: usize,
}

impl<'p, 'a, 'c> Parser<'p, 'a, 'c> {
  fn new(lexer: &'p mut Lexer<'a>, ctx: &'p mut Context<'c>) -> Self {
    let source = lexer.source();
    let lookahead = next_token(lexer);
    Self {
      lexer,
      ctx,
      source,
      lookahead,
      stack: Vec::new(),
      statements: 0,
    }
  }

  fn run(&mut self) -> CompileResult<()> {
    loop {
      match self.action()? {
        Action::Shift => self.shift(),
        Action::Reduce(production) => self.reduce(production)?,
        Action::Accept => return Ok(()),
      }
    }
  }

  fn shift(&mut self) {
    let token = std::mem::replace(&mut self.lookahead, next_token(self.lexer));
    trace!(token = token_text(&token, self.source), "shift");
    self.stack.push(Symbol::Token(token));
  }

  /// Pick the next move from the top of the stack and the lookahead.
  fn action(&self) -> CompileResult<Action> {
    let la = self.lookahead.kind;
    let Some(top) = self.stack.last() else {
      return match la {
        TokenKind::Eof => Ok(Action::Accept),
        TokenKind::Semi => Ok(Action::Reduce(Production::StmtEmpty)),
        TokenKind::Num | TokenKind::Ident | TokenKind::LParen => Ok(Action::Shift),
        _ => Err(self.unexpected()),
      };
    };

    match top {
      Symbol::Token(token) => match token.kind {
        TokenKind::Ident if la == TokenKind::Assign && self.stack.len() == 1 => Ok(Action::Shift),
        TokenKind::Num | TokenKind::Ident | TokenKind::RParen if !follows_factor(la) => {
          Err(self.unexpected())
        }
        TokenKind::Num => Ok(Action::Reduce(Production::FactorNum)),
        TokenKind::Ident => Ok(Action::Reduce(Production::FactorName)),
        TokenKind::RParen => Ok(Action::Reduce(Production::FactorGroup)),
        TokenKind::Semi => Ok(Action::Reduce(Production::Program)),
        _ => match la {
          TokenKind::Num | TokenKind::Ident | TokenKind::LParen => Ok(Action::Shift),
          _ => Err(self.expected_operand()),
        },
      },
      Symbol::Stmt(_) => match la {
        TokenKind::Semi => Ok(Action::Shift),
        _ => Err(self.expected(";")),
      },
      Symbol::Factor(_) => match self.pending_operator(TokenKind::Mul, TokenKind::Div) {
        Some(op) => Ok(Action::Reduce(Production::TermBinary(op))),
        None => Ok(Action::Reduce(Production::TermFactor)),
      },
      Symbol::Term(_) => {
        let pending = self.pending_operator(TokenKind::Add, TokenKind::Sub);
        let reducing = pending.unwrap_or(BinaryOp::Add).precedence();
        if let Some(op) = BinaryOp::from_token(la)
          && op.precedence() > reducing
        {
          return Ok(Action::Shift);
        }
        match pending {
          Some(op) => Ok(Action::Reduce(Production::ExprBinary(op))),
          None => Ok(Action::Reduce(Production::ExprTerm)),
        }
      }
      Symbol::Expr(_) => self.after_expression(la),
    }
  }

  fn after_expression(&self, la: TokenKind) -> CompileResult<Action> {
    let below = self.stack.len().checked_sub(2).map(|idx| &self.stack[idx]);
    let in_group = below.is_some_and(|sym| sym.is_token(TokenKind::LParen));
    match la {
      TokenKind::Add | TokenKind::Sub => Ok(Action::Shift),
      TokenKind::RParen if in_group => Ok(Action::Shift),
      _ if in_group => Err(self.expected(")")),
      TokenKind::Semi if self.stack.len() == 1 => Ok(Action::Reduce(Production::StmtExpr)),
      TokenKind::Semi if self.stack.len() == 3 && self.stack[1].is_token(TokenKind::Assign) => {
        Ok(Action::Reduce(Production::StmtAssign))
      }
      _ => Err(self.unexpected()),
    }
  }

  /// Operator sitting just below the top of the stack, if it is one of `a`/`b`.
  fn pending_operator(&self, a: TokenKind, b: TokenKind) -> Option<BinaryOp> {
    let idx = self.stack.len().checked_sub(2)?;
    match &self.stack[idx] {
      Symbol::Token(token) if token.kind == a || token.kind == b => BinaryOp::from_token(token.kind),
      _ => None,
    }
  }

  fn reduce(&mut self, production: Production) -> CompileResult<()> {
    trace!(rule = %production, "reduce");
    let symbol = match production {
      Production::Program => {
        self.pop_token()?;
        let value = self.pop_stmt()?;
        self.statements += 1;
        debug!(statement = self.statements, ?value, "statement compiled");
        return Ok(());
      }
      Production::StmtAssign => {
        let expr = self.pop_expr()?;
        self.pop_token()?;
        let name = self.pop_token()?;
        self.ctx.assign(token_text(&name, self.source), expr.value)?;
        Symbol::Stmt(None)
      }
      Production::StmtExpr => {
        let expr = self.pop_expr()?;
        self.ctx.finish_statement()?;
        Symbol::Stmt(expr.value)
      }
      Production::StmtEmpty => {
        self.ctx.empty_statement()?;
        Symbol::Stmt(None)
      }
      Production::ExprBinary(op) => {
        let rhs = self.pop_term()?;
        let op_token = self.pop_token()?;
        let lhs = self.pop_expr()?;
        let value = self.ctx.binary_op(op, lhs.value, rhs.value, op_token.loc)?;
        Symbol::Expr(Attr {
          value,
          loc: lhs.loc,
        })
      }
      Production::ExprTerm => Symbol::Expr(self.pop_term()?),
      Production::TermBinary(op) => {
        let rhs = self.pop_factor()?;
        let op_token = self.pop_token()?;
        let lhs = self.pop_term()?;
        let value = self.ctx.binary_op(op, lhs.value, rhs.value, op_token.loc)?;
        Symbol::Term(Attr {
          value,
          loc: lhs.loc,
        })
      }
      Production::TermFactor => Symbol::Term(self.pop_factor()?),
      Production::FactorGroup => {
        self.pop_token()?;
        let inner = self.pop_expr()?;
        let open = self.pop_token()?;
        Symbol::Factor(Attr {
          value: inner.value,
          loc: open.loc,
        })
      }
      Production::FactorNum => {
        let token = self.pop_token()?;
        let value = token.value.ok_or_else(|| {
          CompileError::at(self.source, token.loc, "integer literal out of range")
        })?;
        Symbol::Factor(Attr {
          value: self.ctx.push_literal(value),
          loc: token.loc,
        })
      }
      Production::FactorName => {
        let token = self.pop_token()?;
        let value = self.ctx.read(token_text(&token, self.source), token.loc)?;
        Symbol::Factor(Attr {
          value,
          loc: token.loc,
        })
      }
    };
    self.stack.push(symbol);
    Ok(())
  }

  fn pop_token(&mut self) -> CompileResult<Token> {
    match self.stack.pop() {
      Some(Symbol::Token(token)) => Ok(token),
      _ => ParseStackSnafu { expected: "a token" }.fail(),
    }
  }

  fn pop_stmt(&mut self) -> CompileResult<Option<i64>> {
    match self.stack.pop() {
      Some(Symbol::Stmt(value)) => Ok(value),
      _ => ParseStackSnafu {
        expected: "a statement",
      }
      .fail(),
    }
  }

  fn pop_expr(&mut self) -> CompileResult<Attr> {
    match self.stack.pop() {
      Some(Symbol::Expr(attr)) => Ok(attr),
      _ => ParseStackSnafu {
        expected: "an expression",
      }
      .fail(),
    }
  }

  fn pop_term(&mut self) -> CompileResult<Attr> {
    match self.stack.pop() {
      Some(Symbol::Term(attr)) => Ok(attr),
      _ => ParseStackSnafu { expected: "a term" }.fail(),
    }
  }

  fn pop_factor(&mut self) -> CompileResult<Attr> {
    match self.stack.pop() {
      Some(Symbol::Factor(attr)) => Ok(attr),
      _ => ParseStackSnafu { expected: "a factor" }.fail(),
    }
  }

  fn got(&self) -> String {
    describe_token(&self.lookahead, self.source)
  }

  fn unexpected(&self) -> CompileError {
    CompileError::at(
      self.source,
      self.lookahead.loc,
      format!("unexpected token \"{}\"", self.got()),
    )
  }

  fn expected(&self, what: &str) -> CompileError {
    CompileError::at(
      self.source,
      self.lookahead.loc,
      format!("expected \"{what}\", but got \"{}\"", self.got()),
    )
  }

  fn expected_operand(&self) -> CompileError {
    CompileError::at(
      self.source,
      self.lookahead.loc,
      format!("expected a number, name or \"(\", but got \"{}\"", self.got()),
    )
  }
}

fn next_token(lexer: &mut Lexer<'_>) -> Token {
  let source = lexer.source();
  lexer
    .next()
    .unwrap_or_else(|| Token::new(TokenKind::Eof, source.len(), 0, None))
}

/// Tokens that may follow a complete factor.
fn follows_factor(kind: TokenKind) -> bool {
  matches!(
    kind,
    TokenKind::Add
      | TokenKind::Sub
      | TokenKind::Mul
      | TokenKind::Div
      | TokenKind::RParen
      | TokenKind::Semi
  )
}
