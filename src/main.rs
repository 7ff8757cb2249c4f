use std::env;
use std::io::{self, BufRead};
use std::process;

use rexprc::{CompileOptions, compile};
use tracing::{Level, error};

fn read_stdin_line() -> io::Result<String> {
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn main() {
  tracing_subscriber::fmt()
    .with_max_level(Level::WARN)
    .with_writer(io::stderr)
    .without_time()
    .init();

  let args: Vec<String> = env::args().collect();
  let program = args.first().map(String::as_str).unwrap_or("rexprc");

  let source = match args.len() {
    1 => match read_stdin_line() {
      Ok(line) => line,
      Err(err) => {
        eprintln!("{program}: failed to read standard input: {err}");
        process::exit(1);
      }
    },
    2 => args[1].clone(),
    _ => {
      eprintln!("usage: {program} [<program>]");
      process::exit(1);
    }
  };

  match compile(&source, &CompileOptions::default()) {
    Ok(compilation) => println!("{}", compilation.assembly.render()),
    Err(err) if err.is_internal() => {
      error!(%err, "compiler bug");
      process::exit(2);
    }
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}
