//! Code generation: emit 32-bit AT&T x86 assembly for a stack machine.
//!
//! Every expression leaves exactly one value on the hardware stack; binary
//! operators pop two and push one. Variables live in the current frame at
//! `-4 * slot(%ebp)`. Instructions are appended while parsing, then
//! [`Emitter::finish`] wraps them in the function preamble and epilogue and
//! hands back an immutable [`Assembly`] that can only be rendered.

use std::fmt;
use std::ops::Range;

use tracing::trace;

use crate::parser::BinaryOp;

/// Bytes reserved per variable slot.
pub const SLOT_SIZE: usize = 4;

const EAX: &str = "%eax";
const EBX: &str = "%ebx";
const EBP: &str = "%ebp";
const ESP: &str = "%esp";

/// One line of output: a mnemonic with an optional operand string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
  pub mnemonic: String,
  pub operand: Option<String>,
}

impl Instruction {
  pub fn new(mnemonic: impl Into<String>, operand: impl Into<String>) -> Self {
    Self {
      mnemonic: mnemonic.into(),
      operand: Some(operand.into()),
    }
  }

  pub fn bare(mnemonic: impl Into<String>) -> Self {
    Self {
      mnemonic: mnemonic.into(),
      operand: None,
    }
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.operand {
      Some(operand) => write!(f, "{} {}", self.mnemonic, operand),
      None => f.write_str(&self.mnemonic),
    }
  }
}

/// Frame address of a 1-based variable slot.
pub fn frame_slot(slot: usize) -> String {
  format!("-{}({EBP})", SLOT_SIZE * slot)
}

fn immediate(value: i64) -> String {
  format!("${value}")
}

fn arith_mnemonic(op: BinaryOp) -> &'static str {
  match op {
    BinaryOp::Add => "addl",
    BinaryOp::Sub => "subl",
    BinaryOp::Mul => "imull",
    BinaryOp::Div => "idivl",
  }
}

/// Append-only instruction list for the function body.
#[derive(Debug, Default)]
pub struct Emitter {
  body: Vec<Instruction>,
}

impl Emitter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Body emitted so far.
  pub fn body(&self) -> &[Instruction] {
    &self.body
  }

  fn emit(&mut self, inst: Instruction) {
    trace!(%inst, "emit");
    self.body.push(inst);
  }

  pub fn push_literal(&mut self, value: i64) {
    self.emit(Instruction::new("pushl", immediate(value)));
  }

  pub fn push_slot(&mut self, slot: usize) {
    self.emit(Instruction::new("pushl", frame_slot(slot)));
  }

  pub fn pop_into_slot(&mut self, slot: usize) {
    self.emit(Instruction::new("pop", frame_slot(slot)));
  }

  /// Pop the right operand into `%ebx`, the left into `%eax`, combine into
  /// `%eax` and push it.
  pub fn binary(&mut self, op: BinaryOp) {
    self.emit(Instruction::new("popl", EBX));
    self.emit(Instruction::new("popl", EAX));
    match op {
      BinaryOp::Div => {
        // idivl divides %edx:%eax, so sign-extend the dividend first.
        self.emit(Instruction::bare("cltd"));
        self.emit(Instruction::new(arith_mnemonic(op), EBX));
      }
      _ => self.emit(Instruction::new(
        arith_mnemonic(op),
        format!("{EBX}, {EAX}"),
      )),
    }
    self.emit(Instruction::new("pushl", EAX));
  }

  /// Drop the value of an expression statement.
  pub fn discard(&mut self) {
    self.emit(Instruction::new("popl", EAX));
  }

  /// Put the preamble in front of the body and the epilogue behind it.
  pub fn finish(self, entry_symbol: &str, variable_count: usize) -> Assembly {
    let mut instructions = preamble(entry_symbol, variable_count);
    let start = instructions.len();
    instructions.extend(self.body);
    let body = start..instructions.len();
    instructions.extend(epilogue());
    Assembly {
      instructions,
      body,
      reserved_bytes: SLOT_SIZE * variable_count,
    }
  }
}

fn preamble(entry_symbol: &str, variable_count: usize) -> Vec<Instruction> {
  vec![
    Instruction::new(".globl", entry_symbol),
    Instruction::bare(format!("{entry_symbol}:")),
    Instruction::new("pushl", EBP),
    Instruction::new("movl", format!("{ESP}, {EBP}")),
    Instruction::new("subl", format!("${}, {ESP}", SLOT_SIZE * variable_count)),
  ]
}

fn epilogue() -> Vec<Instruction> {
  vec![Instruction::bare("leave"), Instruction::bare("ret")]
}

/// Complete function, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
  instructions: Vec<Instruction>,
  body: Range<usize>,
  reserved_bytes: usize,
}

impl Assembly {
  pub fn instructions(&self) -> &[Instruction] {
    &self.instructions
  }

  /// Instructions between the preamble and the epilogue.
  pub fn body(&self) -> &[Instruction] {
    &self.instructions[self.body.clone()]
  }

  /// Size of the local-variable area set up by the preamble.
  pub fn reserved_bytes(&self) -> usize {
    self.reserved_bytes
  }

  /// One instruction per line, no trailing newline.
  pub fn render(&self) -> String {
    self
      .instructions
      .iter()
      .map(Instruction::to_string)
      .collect::<Vec<_>>()
      .join("\n")
  }
}
