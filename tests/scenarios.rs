use rexprc::{CompileError, CompileOptions, Compilation, compile, generate_assembly};

fn compile_ok(source: &str) -> Compilation {
  match compile(source, &CompileOptions::default()) {
    Ok(compilation) => compilation,
    Err(err) => panic!("{source:?} failed to compile:\n{err}"),
  }
}

fn body(compilation: &Compilation) -> Vec<String> {
  compilation
    .assembly
    .body()
    .iter()
    .map(ToString::to_string)
    .collect()
}

#[test]
fn assignment_of_a_sum() {
  let out = compile_ok("x := 3 + 4;");
  let symbols: Vec<_> = out.symbols.iter().collect();
  assert_eq!(symbols, [("x", 1)]);
  assert_eq!(out.assembly.reserved_bytes(), 4);
  assert_eq!(
    body(&out),
    [
      "pushl $3",
      "pushl $4",
      "popl %ebx",
      "popl %eax",
      "addl %ebx, %eax",
      "pushl %eax",
      "pop -4(%ebp)",
    ]
  );
}

#[test]
fn full_output_text() {
  let asm = generate_assembly("x := 3 + 4;").unwrap();
  let expected = "\
.globl _main
_main:
pushl %ebp
movl %esp, %ebp
subl $4, %esp
pushl $3
pushl $4
popl %ebx
popl %eax
addl %ebx, %eax
pushl %eax
pop -4(%ebp)
leave
ret";
  assert_eq!(asm, expected);
}

#[test]
fn two_variables_and_a_bare_read() {
  let out = compile_ok("x := 2; y := x * 3; y;");
  let symbols: Vec<_> = out.symbols.iter().collect();
  assert_eq!(symbols, [("x", 1), ("y", 2)]);
  assert_eq!(out.assembly.reserved_bytes(), 8);
  assert_eq!(out.statements, 3);

  let body = body(&out);
  assert_eq!(
    body[body.len() - 2..],
    ["pushl -8(%ebp)".to_string(), "popl %eax".to_string()]
  );
  assert_eq!(
    body.iter().filter(|line| line.starts_with("pop ")).count(),
    2
  );
}

#[test]
fn read_before_assignment_aborts() {
  let err = compile("y;", &CompileOptions::default()).unwrap_err();
  assert!(matches!(err, CompileError::UndefinedVariable { ref name, .. } if name == "y"));
  assert_eq!(err.to_string(), "'y;'\n ^ undefined variable 'y'");
}

#[test]
fn undefined_read_fails_anywhere_in_the_program() {
  for source in ["a := 1; b := a + c;", "a := (1 + b);", "1; 2; q;"] {
    let err = compile(source, &CompileOptions::default()).unwrap_err();
    assert!(
      matches!(err, CompileError::UndefinedVariable { .. }),
      "{source}: {err}"
    );
  }
}

#[test]
fn parentheses_override_precedence() {
  let out = compile_ok("(1 + 2) * (3 - 1);");
  let ops: Vec<_> = body(&out)
    .into_iter()
    .filter(|line| !line.starts_with("popl %e") && line != "pushl %eax")
    .collect();
  assert_eq!(
    ops,
    [
      "pushl $1",
      "pushl $2",
      "addl %ebx, %eax",
      "pushl $3",
      "pushl $1",
      "subl %ebx, %eax",
      "imull %ebx, %eax",
    ]
  );
  assert_eq!(body(&out).last().map(String::as_str), Some("popl %eax"));
}

#[test]
fn ungrouped_expression_has_a_different_shape() {
  let grouped = body(&compile_ok("(1 + 2) * (3 - 1);"));
  let flat = body(&compile_ok("1 + 2 * 3 - 1;"));
  assert_ne!(grouped, flat);
  assert_eq!(flat[0..3], ["pushl $1", "pushl $2", "pushl $3"]);
}

#[test]
fn unknown_character_is_skipped() {
  let out = compile_ok("x := 3 @+ 4;");
  assert_eq!(out.diagnostics.len(), 1);
  assert_eq!(out.diagnostics[0].ch, '@');
  assert_eq!(body(&out), body(&compile_ok("x := 3 + 4;")));
}

#[test]
fn compiling_twice_is_byte_identical() {
  let source = "a := 5; b := a * (a - 2); a := b / 3; a + b;";
  let first = generate_assembly(source).unwrap();
  let second = generate_assembly(source).unwrap();
  assert_eq!(first, second);
}

#[test]
fn reserved_bytes_track_distinct_variables() {
  for (source, variables) in [
    ("", 0),
    ("1;", 0),
    ("a := 1;", 1),
    ("a := 1; a := a + 1; a := a * 2;", 1),
    ("a := 1; b := 2; c := a + b; b := c;", 3),
  ] {
    let out = compile_ok(source);
    assert_eq!(out.symbols.len(), variables, "{source}");
    assert_eq!(out.assembly.reserved_bytes(), 4 * variables, "{source}");
    let expected = format!("subl ${}, %esp", 4 * variables);
    assert_eq!(out.assembly.instructions()[4].to_string(), expected);
  }
}

#[test]
fn empty_program_is_just_the_frame() {
  let asm = generate_assembly("").unwrap();
  assert_eq!(
    asm,
    ".globl _main\n_main:\npushl %ebp\nmovl %esp, %ebp\nsubl $0, %esp\nleave\nret"
  );
}

#[test]
fn syntax_error_produces_no_output() {
  let err = generate_assembly("x := (1 + ;").unwrap_err();
  assert!(matches!(err, CompileError::Syntax { .. }));
  assert!(!err.is_internal());
}

#[test]
fn constant_division_by_zero_aborts() {
  let err = generate_assembly("z := 0; 5 / z;").unwrap_err();
  assert!(matches!(err, CompileError::DivisionByZero { .. }));
}

#[test]
fn overflowing_constants_do_not_fake_a_zero_divisor() {
  // 2^64 wraps to 0 in an i64; the real divisor is non-zero.
  let out = compile_ok("a := 65536 * 65536 * 65536 * 65536; 1 / a;");
  assert_eq!(out.statements, 2);
  assert_eq!(out.symbols.len(), 1);
  let body = body(&out);
  assert!(body.contains(&"idivl %ebx".to_string()));
  assert_eq!(body.last().map(String::as_str), Some("popl %eax"));
}

#[test]
fn values_built_on_an_overflow_stay_unknown() {
  let out = compile_ok("a := 9223372036854775807 + 1; b := a - a; c := 7 / b;");
  assert_eq!(out.symbols.len(), 3);
  assert!(generate_assembly("a := 9223372036854775807 + 1; b := a; 1 / 0;").is_err());
}

#[test]
fn custom_entry_symbol() {
  let options = CompileOptions {
    entry_symbol: "main".to_string(),
  };
  let out = compile("1;", &options).unwrap();
  let text = out.assembly.render();
  assert!(text.starts_with(".globl main\nmain:\n"));
}
