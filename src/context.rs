//! Per-run compiler state and the semantic actions the parser fires.
//!
//! A [`Context`] owns everything one compilation touches: the symbol and value
//! tables, the operand-stack bookkeeping and the instruction list. Each action
//! performs the validation half (compile-time value, definedness) and the
//! emission half of a reduction; the two meet only through the tables and the
//! [`Environment`].

use snafu::{OptionExt, ensure};
use tracing::trace;

use crate::codegen::{Assembly, Emitter};
use crate::error::{
  CompileResult, DivisionByZeroSnafu, SourceMarker, StackUnderflowSnafu, UnbalancedStatementSnafu,
  UndefinedVariableSnafu,
};
use crate::eval;
use crate::parser::BinaryOp;
use crate::symtab::{SymbolTable, ValueTable};

/// Emission-time counters.
///
/// `stack_depth` counts values pushed by generated code and not yet popped; it
/// is zero between statements.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
  pub stack_depth: usize,
  pub variable_count: usize,
}

/// Options that shape the generated function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
  /// Global label the function is emitted under.
  pub entry_symbol: String,
}

impl Default for CompileOptions {
  fn default() -> Self {
    Self {
      entry_symbol: "_main".to_string(),
    }
  }
}

pub struct Context<'a> {
  source: &'a str,
  symbols: SymbolTable,
  values: ValueTable,
  env: Environment,
  emitter: Emitter,
}

impl<'a> Context<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      symbols: SymbolTable::new(),
      values: ValueTable::new(),
      env: Environment::default(),
      emitter: Emitter::new(),
    }
  }

  pub fn env(&self) -> Environment {
    self.env
  }

  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  pub fn values(&self) -> &ValueTable {
    &self.values
  }

  pub fn emitter(&self) -> &Emitter {
    &self.emitter
  }

  fn require_depth(&self, needed: usize) -> CompileResult<()> {
    let depth = self.env.stack_depth;
    ensure!(depth >= needed, StackUnderflowSnafu { needed, depth });
    Ok(())
  }

  fn require_balance(&self, expected: usize) -> CompileResult<()> {
    let depth = self.env.stack_depth;
    ensure!(depth == expected, UnbalancedStatementSnafu { depth, expected });
    Ok(())
  }

  /// `factor := NUMBER`
  pub fn push_literal(&mut self, value: i64) -> Option<i64> {
    self.emitter.push_literal(value);
    self.env.stack_depth += 1;
    Some(value)
  }

  /// `factor := NAME`; the name must have been assigned earlier in the program.
  pub fn read(&mut self, name: &str, loc: usize) -> CompileResult<Option<i64>> {
    let slot = self
      .symbols
      .slot(name)
      .filter(|_| self.values.contains(name))
      .context(UndefinedVariableSnafu {
        at: SourceMarker::new(self.source, loc),
        name,
      })?;
    self.emitter.push_slot(slot);
    self.env.stack_depth += 1;
    Ok(self.values.get(name))
  }

  /// Combine the two topmost pending values. `loc` points at the operator.
  pub fn binary_op(
    &mut self,
    op: BinaryOp,
    lhs: Option<i64>,
    rhs: Option<i64>,
    loc: usize,
  ) -> CompileResult<Option<i64>> {
    self.require_depth(2)?;
    let value = eval::binary(op, lhs, rhs).map_err(|_| {
      DivisionByZeroSnafu {
        at: SourceMarker::new(self.source, loc),
      }
      .build()
    })?;
    self.emitter.binary(op);
    self.env.stack_depth -= 1;
    Ok(value)
  }

  /// `statement := NAME ':=' expression`
  pub fn assign(&mut self, name: &str, value: Option<i64>) -> CompileResult<()> {
    self.require_depth(1)?;
    let known = self.symbols.len();
    let slot = self.symbols.bind(name);
    if self.symbols.len() > known {
      self.env.variable_count += 1;
      trace!(name, slot, "allocated slot");
    }
    self.values.set(name, value);
    self.emitter.pop_into_slot(slot);
    self.env.stack_depth -= 1;
    self.require_balance(0)
  }

  /// `statement := expression`; the value is popped and dropped.
  pub fn finish_statement(&mut self) -> CompileResult<()> {
    self.require_balance(1)?;
    self.emitter.discard();
    self.env.stack_depth -= 1;
    Ok(())
  }

  /// `statement := ε`
  pub fn empty_statement(&self) -> CompileResult<()> {
    self.require_balance(0)
  }

  /// Wrap the emitted body in the function preamble and epilogue.
  pub fn finish(self, options: &CompileOptions) -> CompileResult<(Assembly, SymbolTable)> {
    self.require_balance(0)?;
    let assembly = self
      .emitter
      .finish(&options.entry_symbol, self.env.variable_count);
    Ok((assembly, self.symbols))
  }
}
