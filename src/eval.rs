//! Compile-time evaluation of reductions.
//!
//! Every expression in the language is built from literals and previously
//! assigned names, so its value is normally known while parsing. The value is
//! tracked only to check that names are assigned before they are read and to
//! reject a division by a constant zero; it never reaches the emitted program.
//! A result that does not fit in an `i64` becomes unknown (`None`) and stays
//! unknown through every phrase built on it. `/` floors toward negative
//! infinity.

use crate::parser::BinaryOp;

/// The divisor is known to be exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivideByZero;

/// Combine two operand values. Unknown operands give an unknown result.
pub fn binary(op: BinaryOp, lhs: Option<i64>, rhs: Option<i64>) -> Result<Option<i64>, DivideByZero> {
  if op == BinaryOp::Div && rhs == Some(0) {
    return Err(DivideByZero);
  }
  let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
    return Ok(None);
  };
  let value = match op {
    BinaryOp::Add => lhs.checked_add(rhs),
    BinaryOp::Sub => lhs.checked_sub(rhs),
    BinaryOp::Mul => lhs.checked_mul(rhs),
    BinaryOp::Div => floor_div(lhs, rhs),
  };
  Ok(value)
}

fn floor_div(lhs: i64, rhs: i64) -> Option<i64> {
  let quotient = lhs.checked_div(rhs)?;
  let remainder = lhs.checked_rem(rhs)?;
  if remainder != 0 && (remainder < 0) != (rhs < 0) {
    quotient.checked_sub(1)
  } else {
    Some(quotient)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn known(op: BinaryOp, lhs: i64, rhs: i64) -> Option<i64> {
    binary(op, Some(lhs), Some(rhs)).unwrap()
  }

  #[test]
  fn arithmetic() {
    assert_eq!(known(BinaryOp::Add, 3, 4), Some(7));
    assert_eq!(known(BinaryOp::Sub, 3, 4), Some(-1));
    assert_eq!(known(BinaryOp::Mul, -3, 4), Some(-12));
    assert_eq!(known(BinaryOp::Div, 7, 2), Some(3));
  }

  #[test]
  fn division_floors() {
    assert_eq!(known(BinaryOp::Div, -7, 2), Some(-4));
    assert_eq!(known(BinaryOp::Div, 7, -2), Some(-4));
    assert_eq!(known(BinaryOp::Div, -7, -2), Some(3));
    assert_eq!(known(BinaryOp::Div, -8, 2), Some(-4));
  }

  #[test]
  fn division_by_zero_is_rejected() {
    assert_eq!(binary(BinaryOp::Div, Some(1), Some(0)), Err(DivideByZero));
    assert_eq!(binary(BinaryOp::Div, None, Some(0)), Err(DivideByZero));
  }

  #[test]
  fn overflow_makes_the_value_unknown() {
    assert_eq!(known(BinaryOp::Add, i64::MAX, 1), None);
    assert_eq!(known(BinaryOp::Sub, i64::MIN, 1), None);
    assert_eq!(known(BinaryOp::Mul, 1 << 32, 1 << 32), None);
    assert_eq!(known(BinaryOp::Div, i64::MIN, -1), None);
  }

  #[test]
  fn unknown_operands_propagate() {
    assert_eq!(binary(BinaryOp::Add, None, Some(1)), Ok(None));
    assert_eq!(binary(BinaryOp::Mul, Some(0), None), Ok(None));
    assert_eq!(binary(BinaryOp::Div, Some(1), None), Ok(None));
  }
}
