use {
  crate::{bytes::ByteVisitor, digest::sha512_256},
  data_encoding::BASE32_NOPAD,
  ed25519_dalek::PublicKey,
  serde::{Deserialize, Deserializer, Serialize, Serializer},
  std::{
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
  },
  thiserror::Error,
};

const CHECKSUM_LEN: usize = 4;
const ENCODED_LEN: usize = 58;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("Address must be {ENCODED_LEN} characters long, got {0}")]
  InvalidLength(usize),

  #[error("Address is not valid base32: {0}")]
  InvalidEncoding(String),

  #[error("Address checksum mismatch")]
  InvalidChecksum,
}

/// Represents an address of an account on the ledger.
///
/// The same address could either represent a user wallet that has a
/// corresponding ed25519 private key (externally owned) or the escrow
/// account of a deployed application, which has no private key and is
/// spendable only by the application's own logic.
///
/// The textual form is the base32 (no padding) encoding of the public key
/// followed by the last four bytes of its SHA-512/256 hash, which lets
/// clients reject mistyped recipients before anything is signed.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
  pub const ZERO: Address = Address([0u8; 32]);

  pub const fn new(bytes: [u8; 32]) -> Self {
    Self(bytes)
  }

  /// Escrow account controlled by an application.
  ///
  /// The same app id always yields the same address, so payments meant
  /// for a contract can be addressed without asking the node.
  pub fn for_application(app_id: u64) -> Self {
    Self(sha512_256(&[b"appID", &app_id.to_be_bytes()]))
  }

  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }

  pub fn is_zero(&self) -> bool {
    *self == Self::ZERO
  }

  fn checksum(&self) -> [u8; CHECKSUM_LEN] {
    let hash = sha512_256(&[&self.0]);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[32 - CHECKSUM_LEN..]);
    out
  }
}

impl AsRef<[u8]> for Address {
  fn as_ref(&self) -> &[u8] {
    &self.0
  }
}

impl Deref for Address {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut raw = [0u8; 32 + CHECKSUM_LEN];
    raw[..32].copy_from_slice(&self.0);
    raw[32..].copy_from_slice(&self.checksum());
    write!(f, "{}", BASE32_NOPAD.encode(&raw))
  }
}

impl Debug for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "address({self})")
  }
}

impl From<Address> for String {
  fn from(addr: Address) -> Self {
    addr.to_string()
  }
}

impl FromStr for Address {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.len() != ENCODED_LEN {
      return Err(Error::InvalidLength(s.len()));
    }

    let raw = BASE32_NOPAD
      .decode(s.as_bytes())
      .map_err(|e| Error::InvalidEncoding(e.to_string()))?;

    if raw.len() != 32 + CHECKSUM_LEN {
      return Err(Error::InvalidLength(s.len()));
    }

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&raw[..32]);
    let address = Self(bytes);

    if address.checksum()[..] != raw[32..] {
      return Err(Error::InvalidChecksum);
    }
    Ok(address)
  }
}

impl TryFrom<&str> for Address {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self, Self::Error> {
    FromStr::from_str(value)
  }
}

impl From<PublicKey> for Address {
  fn from(p: PublicKey) -> Self {
    Self(*p.as_bytes())
  }
}

impl From<&PublicKey> for Address {
  fn from(p: &PublicKey) -> Self {
    Self(*p.as_bytes())
  }
}

impl From<[u8; 32]> for Address {
  fn from(bytes: [u8; 32]) -> Self {
    Self(bytes)
  }
}

impl Serialize for Address {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bytes(&self.0)
  }
}

impl<'de> Deserialize<'de> for Address {
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
  use {super::Error, crate::Address};

  #[test]
  fn text_form_roundtrip() -> anyhow::Result<()> {
    let address = Address::new([7u8; 32]);
    let text = address.to_string();
    assert_eq!(text.len(), 58);
    assert_eq!(text.parse::<Address>()?, address);
    Ok(())
  }

  #[test]
  fn zero_address_has_well_known_form() -> anyhow::Result<()> {
    assert_eq!(
      Address::ZERO.to_string(),
      "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"
    );
    assert_eq!(
      "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"
        .parse::<Address>()?,
      Address::ZERO
    );
    Ok(())
  }

  #[test]
  fn rejects_corrupted_checksum() {
    let mut text = Address::new([9u8; 32]).to_string();
    let last = text.pop().unwrap();
    text.push(if last == 'A' { 'B' } else { 'A' });
    assert!(matches!(
      text.parse::<Address>(),
      Err(Error::InvalidChecksum) | Err(Error::InvalidEncoding(_))
    ));
  }

  #[test]
  fn rejects_wrong_length() {
    assert_eq!("ABC".parse::<Address>(), Err(Error::InvalidLength(3)));
  }

  #[test]
  fn application_escrow_is_stable() {
    assert_eq!(Address::for_application(42), Address::for_application(42));
    assert_ne!(Address::for_application(42), Address::for_application(43));
  }
}
