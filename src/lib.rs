//! Crate root: wires together the compilation pipeline.
//!
//! The compiler is a single forward pass:
//! - `tokenizer` scans the source lazily, skipping characters it does not know.
//! - `parser` runs a shift-reduce parse and fires a semantic action per reduction.
//! - `context` owns the per-run state those actions mutate.
//! - `symtab` and `eval` track variable slots and compile-time values.
//! - `codegen` builds the instruction list and renders AT&T assembly.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod codegen;
pub mod context;
pub mod error;
pub mod eval;
pub mod parser;
pub mod symtab;
pub mod tokenizer;

use tracing::debug;

pub use codegen::{Assembly, Instruction};
pub use context::CompileOptions;
pub use error::{CompileError, CompileResult};
pub use symtab::SymbolTable;
pub use tokenizer::LexDiagnostic;

/// Everything one successful run produces.
#[derive(Debug, Clone)]
pub struct Compilation {
  pub assembly: Assembly,
  pub symbols: SymbolTable,
  pub diagnostics: Vec<LexDiagnostic>,
  pub statements: usize,
}

/// Compile a program. Any error aborts the run; nothing partial is returned.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult<Compilation> {
  let mut lexer = tokenizer::Lexer::new(source);
  let mut ctx = context::Context::new(source);
  let statements = parser::parse(&mut lexer, &mut ctx)?;
  let (assembly, symbols) = ctx.finish(options)?;
  debug!(
    statements,
    variables = symbols.len(),
    instructions = assembly.instructions().len(),
    "compiled"
  );
  Ok(Compilation {
    assembly,
    symbols,
    diagnostics: lexer.take_diagnostics(),
    statements,
  })
}

/// Compile a source string into AT&T assembly with the default options.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  compile(source, &CompileOptions::default()).map(|compilation| compilation.assembly.render())
}
