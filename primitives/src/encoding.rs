use {crate::Address, thiserror::Error};

/// Width of an encoded integer argument or state value.
pub const UINT_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("Expected {expected} bytes, got {actual}")]
  InvalidLength { expected: usize, actual: usize },

  #[error("Byte string is not valid UTF-8")]
  InvalidUtf8,
}

/// A single application call argument before encoding.
///
/// Contracts read integers as 8-byte big-endian words and text as raw
/// UTF-8 bytes. Text fields have a per-contract maximum length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppArg<'a> {
  /// Method selector, always the first argument.
  Method(&'a str),
  Uint(u64),
  Bool(bool),
  Text(&'a str, usize),
  Address(&'a Address),
}

impl AppArg<'_> {
  pub fn encode(&self) -> Vec<u8> {
    match self {
      Self::Method(name) => name.as_bytes().to_vec(),
      Self::Uint(value) => encode_uint(*value),
      Self::Bool(value) => encode_uint(*value as u64),
      Self::Text(text, max_len) => encode_text(text, *max_len),
      Self::Address(address) => address.as_bytes().to_vec(),
    }
  }
}

pub fn encode_uint(value: u64) -> Vec<u8> {
  value.to_be_bytes().to_vec()
}

pub fn decode_uint(bytes: &[u8]) -> Result<u64, Error> {
  let word: [u8; UINT_WIDTH] =
    bytes.try_into().map_err(|_| Error::InvalidLength {
      expected: UINT_WIDTH,
      actual: bytes.len(),
    })?;
  Ok(u64::from_be_bytes(word))
}

/// Encodes text, silently cutting it to at most `max_len` bytes.
///
/// The cut never splits a multi-byte character, so the result always
/// decodes back into valid UTF-8.
pub fn encode_text(text: &str, max_len: usize) -> Vec<u8> {
  truncate_utf8(text, max_len).as_bytes().to_vec()
}

pub fn decode_text(bytes: &[u8]) -> Result<String, Error> {
  String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8)
}

/// Longest prefix of `text` that fits in `max_len` bytes.
pub fn truncate_utf8(text: &str, max_len: usize) -> &str {
  if text.len() <= max_len {
    return text;
  }
  let mut end = max_len;
  while !text.is_char_boundary(end) {
    end -= 1;
  }
  &text[..end]
}

pub fn decode_fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], Error> {
  bytes.try_into().map_err(|_| Error::InvalidLength {
    expected: N,
    actual: bytes.len(),
  })
}

pub fn decode_address(bytes: &[u8]) -> Result<Address, Error> {
  decode_fixed::<32>(bytes).map(Address::new)
}
