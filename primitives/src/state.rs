use {
  crate::{encoding, Address},
  std::collections::{btree_map, BTreeMap},
};

/// A single value stored by a contract, as the ledger types it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
  Uint(u64),
  Bytes(Vec<u8>),
}

/// Which partition of a contract's storage a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
  /// Contract-wide values.
  Global,

  /// Values the contract keeps for one opted-in account.
  Local(Address),
}

/// Result of a typed lookup in contract state.
///
/// Distinguishes a value that is missing from one that is there but
/// cannot be read as the requested type, so that callers never mistake
/// corrupted data for a zero or a `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
  Present(T),
  Malformed(String),
  Absent,
}

impl<T> Field<T> {
  pub fn is_present(&self) -> bool {
    matches!(self, Self::Present(_))
  }

  pub fn is_absent(&self) -> bool {
    matches!(self, Self::Absent)
  }

  pub fn map<U>(self, op: impl FnOnce(T) -> U) -> Field<U> {
    match self {
      Self::Present(v) => Field::Present(op(v)),
      Self::Malformed(reason) => Field::Malformed(reason),
      Self::Absent => Field::Absent,
    }
  }

  /// Missing values fall back to `default`, malformed ones are an error.
  pub fn or_default_value(self, default: T) -> Result<T, String> {
    match self {
      Self::Present(v) => Ok(v),
      Self::Absent => Ok(default),
      Self::Malformed(reason) => Err(reason),
    }
  }

  /// Both missing and malformed values are an error.
  pub fn required(self) -> Result<T, String> {
    match self {
      Self::Present(v) => Ok(v),
      Self::Absent => Err("value is missing".into()),
      Self::Malformed(reason) => Err(reason),
    }
  }
}

/// Decoded snapshot of one partition of a contract's key/value storage.
///
/// Read-only once fetched; keys are the UTF-8 forms of the stored keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractState {
  app_id: u64,
  scope: StateScope,
  values: BTreeMap<String, StateValue>,
}

impl ContractState {
  pub fn new(app_id: u64, scope: StateScope) -> Self {
    Self {
      app_id,
      scope,
      values: BTreeMap::new(),
    }
  }

  pub fn app_id(&self) -> u64 {
    self.app_id
  }

  pub fn scope(&self) -> StateScope {
    self.scope
  }

  pub fn insert(&mut self, key: impl Into<String>, value: StateValue) {
    self.values.insert(key.into(), value);
  }

  pub fn remove(&mut self, key: &str) -> Option<StateValue> {
    self.values.remove(key)
  }

  pub fn get(&self, key: &str) -> Option<&StateValue> {
    self.values.get(key)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn iter(&self) -> btree_map::Iter<'_, String, StateValue> {
    self.values.iter()
  }

  pub fn uint(&self, key: &str) -> Field<u64> {
    match self.values.get(key) {
      None => Field::Absent,
      Some(StateValue::Uint(v)) => Field::Present(*v),
      Some(StateValue::Bytes(_)) => {
        Field::Malformed(format!("{key}: expected integer, found bytes"))
      }
    }
  }

  /// Flags are integers restricted to 0 or 1.
  pub fn flag(&self, key: &str) -> Field<bool> {
    match self.uint(key) {
      Field::Present(0) => Field::Present(false),
      Field::Present(1) => Field::Present(true),
      Field::Present(other) => {
        Field::Malformed(format!("{key}: flag has value {other}"))
      }
      Field::Malformed(reason) => Field::Malformed(reason),
      Field::Absent => Field::Absent,
    }
  }

  pub fn bytes(&self, key: &str) -> Field<&[u8]> {
    match self.values.get(key) {
      None => Field::Absent,
      Some(StateValue::Bytes(v)) => Field::Present(v.as_slice()),
      Some(StateValue::Uint(_)) => {
        Field::Malformed(format!("{key}: expected bytes, found integer"))
      }
    }
  }

  pub fn text(&self, key: &str) -> Field<String> {
    match self.bytes(key) {
      Field::Present(raw) => match encoding::decode_text(raw) {
        Ok(text) => Field::Present(text),
        Err(e) => Field::Malformed(format!("{key}: {e}")),
      },
      Field::Malformed(reason) => Field::Malformed(reason),
      Field::Absent => Field::Absent,
    }
  }

  pub fn address(&self, key: &str) -> Field<Address> {
    match self.bytes(key) {
      Field::Present(raw) => match encoding::decode_address(raw) {
        Ok(address) => Field::Present(address),
        Err(e) => Field::Malformed(format!("{key}: {e}")),
      },
      Field::Malformed(reason) => Field::Malformed(reason),
      Field::Absent => Field::Absent,
    }
  }
}

impl<'a> IntoIterator for &'a ContractState {
  type IntoIter = btree_map::Iter<'a, String, StateValue>;
  type Item = (&'a String, &'a StateValue);

  fn into_iter(self) -> Self::IntoIter {
    self.values.iter()
  }
}
