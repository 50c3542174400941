//! Typed layout of contract storage.
//!
//! Contracts store entities under keys of the form `<kind>_<id>_<field>`
//! next to a counter holding the number of ids handed out so far. Each
//! domain declares its entity layout once as an [`EntitySchema`] and
//! decoding walks that table, never parsing keys ad hoc.

use {
  crate::{Error, Result},
  std::collections::HashMap,
  tessera_primitives::{Address, ContractState, Field},
  tracing::warn,
};

/// How a field is stored and what happens when it is missing.
///
/// A value that is present but cannot be read as its class is always a
/// decode error. Missing values are read as zero, `false` or an empty
/// string, except for addresses which contracts write at creation and
/// whose absence therefore means corrupted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
  Uint,
  Flag,
  Text,
  Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: &'static str,
  pub class: FieldClass,
}

impl FieldSpec {
  pub const fn uint(name: &'static str) -> Self {
    Self {
      name,
      class: FieldClass::Uint,
    }
  }

  pub const fn flag(name: &'static str) -> Self {
    Self {
      name,
      class: FieldClass::Flag,
    }
  }

  pub const fn text(name: &'static str) -> Self {
    Self {
      name,
      class: FieldClass::Text,
    }
  }

  pub const fn address(name: &'static str) -> Self {
    Self {
      name,
      class: FieldClass::Address,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  Uint(u64),
  Flag(bool),
  Text(String),
  Address(Address),
}

/// Layout of one entity kind in a contract's global state.
#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
  pub kind: &'static str,

  /// Global key holding the number of entities created so far. Ids run
  /// from zero up to, not including, this count.
  pub counter: &'static str,

  /// The entity exists only if this field is present.
  pub defining: &'static str,

  pub fields: &'static [FieldSpec],
}

impl EntitySchema {
  pub fn key(&self, id: u64, field: &str) -> String {
    format!("{}_{id}_{field}", self.kind)
  }

  /// Number of entities created so far.
  pub fn count(&self, state: &ContractState) -> Result<u64> {
    state
      .uint(self.counter)
      .or_default_value(0)
      .map_err(|reason| Error::decode(self.counter, reason))
  }

  /// Decodes entity `id`, or `None` when its defining field is missing.
  pub fn decode(&self, state: &ContractState, id: u64) -> Result<Option<RawEntity>> {
    if state.get(&self.key(id, self.defining)).is_none() {
      return Ok(None);
    }

    let entity = format!("{} {id}", self.kind);
    let mut values = HashMap::with_capacity(self.fields.len());
    for spec in self.fields {
      let key = self.key(id, spec.name);
      let value = match spec.class {
        FieldClass::Uint => state.uint(&key).or_default_value(0).map(FieldValue::Uint),
        FieldClass::Flag => {
          state.flag(&key).or_default_value(false).map(FieldValue::Flag)
        }
        FieldClass::Text => state
          .text(&key)
          .or_default_value(String::new())
          .map(FieldValue::Text),
        FieldClass::Address => state.address(&key).required().map(FieldValue::Address),
      }
      .map_err(|reason| Error::decode(&entity, format!("{key}: {reason}")))?;
      values.insert(spec.name, value);
    }

    Ok(Some(RawEntity {
      kind: self.kind,
      id,
      values,
    }))
  }

  /// Decodes every entity that exists.
  ///
  /// Entities that fail to decode are skipped with a warning so a single
  /// corrupted record does not hide the rest.
  pub fn decode_all(&self, state: &ContractState) -> Result<Vec<RawEntity>> {
    let count = self.count(state)?;
    let mut out = Vec::new();
    for id in 0..count {
      match self.decode(state, id) {
        Ok(Some(entity)) => out.push(entity),
        Ok(None) => {}
        Err(e) => warn!("skipping {} {id}: {e}", self.kind),
      }
    }
    Ok(out)
  }
}

/// Decoded fields of one entity, keyed by field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntity {
  kind: &'static str,
  id: u64,
  values: HashMap<&'static str, FieldValue>,
}

impl RawEntity {
  pub fn kind(&self) -> &'static str {
    self.kind
  }

  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn get(&self, name: &str) -> Option<&FieldValue> {
    self.values.get(name)
  }

  // Accessors below fall back to the zero value for names the schema
  // does not declare, which only happens on a mismatched schema.

  pub fn uint(&self, name: &str) -> u64 {
    match self.values.get(name) {
      Some(FieldValue::Uint(v)) => *v,
      _ => 0,
    }
  }

  pub fn flag(&self, name: &str) -> bool {
    matches!(self.values.get(name), Some(FieldValue::Flag(true)))
  }

  pub fn text(&self, name: &str) -> String {
    match self.values.get(name) {
      Some(FieldValue::Text(v)) => v.clone(),
      _ => String::new(),
    }
  }

  pub fn address(&self, name: &str) -> Address {
    match self.values.get(name) {
      Some(FieldValue::Address(v)) => *v,
      _ => Address::ZERO,
    }
  }
}

/// Local state key of a per-entity value, `<prefix>_<id>`.
pub fn local_key(prefix: &str, id: u64) -> String {
  format!("{prefix}_{id}")
}

/// Entity ids present in local state under `<prefix>_<id>` keys.
pub fn local_ids<'a>(
  state: &'a ContractState,
  prefix: &'a str,
) -> impl Iterator<Item = u64> + 'a {
  state.iter().filter_map(move |(key, _)| {
    key
      .strip_prefix(prefix)
      .and_then(|rest| rest.strip_prefix('_'))
      .and_then(|id| id.parse().ok())
  })
}

/// Typed local lookup with the lenient missing-value policy.
pub fn local_uint(state: &ContractState, key: &str) -> Result<u64> {
  lenient(state.uint(key), 0, key)
}

pub fn local_flag(state: &ContractState, key: &str) -> Result<bool> {
  lenient(state.flag(key), false, key)
}

fn lenient<T>(field: Field<T>, default: T, key: &str) -> Result<T> {
  field
    .or_default_value(default)
    .map_err(|reason| Error::decode(key, reason))
}
