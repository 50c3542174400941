use {
  crate::bytes::ByteVisitor,
  data_encoding::BASE32_NOPAD,
  serde::{Deserialize, Deserializer, Serialize, Serializer},
  sha2::{Digest as _, Sha512_256},
  std::fmt::{Debug, Display},
};

/// SHA-512/256 over the concatenation of all parts.
///
/// Every hash in the ledger family is domain separated by a short
/// ascii prefix ("TX", "TG", "appID") passed as the first part.
pub fn sha512_256(parts: &[&[u8]]) -> [u8; 32] {
  let mut hasher = Sha512_256::new();
  for part in parts {
    hasher.update(part);
  }
  hasher.finalize().into()
}

/// A 32-byte hash value, used for genesis hashes and group identifiers.
///
/// On the wire it is always a msgpack `bin`, never an array of integers.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
  pub const fn new(bytes: [u8; 32]) -> Self {
    Self(bytes)
  }

  pub fn is_zero(&self) -> bool {
    self.0 == [0u8; 32]
  }

  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }
}

impl From<[u8; 32]> for Digest {
  fn from(bytes: [u8; 32]) -> Self {
    Self(bytes)
  }
}

impl AsRef<[u8]> for Digest {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Display for Digest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", BASE32_NOPAD.encode(&self.0))
  }
}

impl Debug for Digest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "digest({self})")
  }
}

impl Serialize for Digest {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bytes(&self.0)
  }
}

impl<'de> Deserialize<'de> for Digest {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let bytes = deserializer.deserialize_bytes(ByteVisitor)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
      serde::de::Error::invalid_length(b.len(), &"32 bytes")
    })?;
    Ok(Self(bytes))
  }
}

#[cfg(test)]
mod tests {
  use super::sha512_256;

  #[test]
  fn parts_are_concatenated() {
    assert_eq!(sha512_256(&[b"TX", b"abc"]), sha512_256(&[b"TXabc"]));
    assert_ne!(sha512_256(&[b"TX"]), sha512_256(&[b"TG"]));
  }
}
