//! Per-run name bookkeeping.
//!
//! [`SymbolTable`] hands out dense 1-based frame slots in first-assignment
//! order and never reuses or renumbers them. [`ValueTable`] shadows the last
//! compile-time value of each assigned name and is what decides whether a read
//! is legal. A name can be assigned yet have no known value when its
//! right-hand side overflowed an `i64`.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
  slots: HashMap<String, usize>,
  names: Vec<String>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn slot(&self, name: &str) -> Option<usize> {
    self.slots.get(name).copied()
  }

  /// Return the slot bound to `name`, allocating the next one on first use.
  pub fn bind(&mut self, name: &str) -> usize {
    if let Some(slot) = self.slot(name) {
      return slot;
    }
    self.names.push(name.to_string());
    let slot = self.names.len();
    self.slots.insert(name.to_string(), slot);
    slot
  }

  /// Number of distinct names bound so far.
  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// Names paired with their slots, in allocation order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
    self
      .names
      .iter()
      .enumerate()
      .map(|(idx, name)| (name.as_str(), idx + 1))
  }
}

#[derive(Debug, Default, Clone)]
pub struct ValueTable {
  values: HashMap<String, Option<i64>>,
}

impl ValueTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> Option<i64> {
    self.values.get(name).copied().flatten()
  }

  pub fn set(&mut self, name: &str, value: Option<i64>) {
    self.values.insert(name.to_string(), value);
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }
}
