use {
  serde::{
    de::{SeqAccess, Visitor},
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
  },
  std::{fmt::Debug, ops::Deref},
};

/// Owned byte string that serializes as a msgpack `bin`.
///
/// serde encodes a plain `Vec<u8>` as an array of integers, which the
/// ledger does not accept for application arguments, notes and
/// signatures.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Deref for Bytes {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl From<Vec<u8>> for Bytes {
  fn from(value: Vec<u8>) -> Self {
    Self(value)
  }
}

impl From<&[u8]> for Bytes {
  fn from(value: &[u8]) -> Self {
    Self(value.to_vec())
  }
}

impl Debug for Bytes {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match std::str::from_utf8(&self.0) {
      Ok(text) if !text.is_empty() => write!(f, "{text:?}"),
      _ => write!(f, "0x{}", data_encoding::HEXLOWER.encode(&self.0)),
    }
  }
}

impl Serialize for Bytes {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bytes(&self.0)
  }
}

impl<'de> Deserialize<'de> for Bytes {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_bytes(ByteVisitor).map(Self)
  }
}

/// Accepts both `bin` and array-of-u8 encodings.
pub(crate) struct ByteVisitor;

impl<'de> Visitor<'de> for ByteVisitor {
  type Value = Vec<u8>;

  fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.write_str("a byte string")
  }

  fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
    Ok(v.to_vec())
  }

  fn visit_byte_buf<E: serde::de::Error>(
    self,
    v: Vec<u8>,
  ) -> Result<Self::Value, E> {
    Ok(v)
  }

  fn visit_seq<A: SeqAccess<'de>>(
    self,
    mut seq: A,
  ) -> Result<Self::Value, A::Error> {
    let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
    while let Some(byte) = seq.next_element::<u8>()? {
      out.push(byte);
    }
    Ok(out)
  }
}
