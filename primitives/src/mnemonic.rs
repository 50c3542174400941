//! 25-word mnemonic encoding of a 32-byte ed25519 seed.
//!
//! The first 24 words carry the seed as little-endian 11-bit groups taken
//! from the BIP-39 English word list. The 25th word is a checksum: the
//! first 11 bits of the SHA-512/256 hash of the seed.

use {crate::digest::sha512_256, bip39::Language, thiserror::Error};

pub const WORD_COUNT: usize = 25;
const DATA_WORDS: usize = WORD_COUNT - 1;
const BITS_PER_WORD: u32 = 11;
const WORD_MASK: u32 = (1 << BITS_PER_WORD) - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("Mnemonic must have {WORD_COUNT} words, got {0}")]
  WordCount(usize),

  #[error("Unknown mnemonic word '{0}'")]
  UnknownWord(String),

  #[error("Mnemonic does not encode a 32 byte seed")]
  NonZeroPadding,

  #[error("Mnemonic checksum mismatch")]
  InvalidChecksum,
}

/// Encodes a seed as a 25 word phrase separated by single spaces.
pub fn from_seed(seed: &[u8; 32]) -> String {
  let words = Language::English.word_list();
  let checksum = checksum_index(seed);
  to_u11(seed)
    .into_iter()
    .chain(std::iter::once(checksum))
    .map(|index| words[index as usize])
    .collect::<Vec<_>>()
    .join(" ")
}

/// Recovers the seed from a phrase produced by [`from_seed`].
///
/// Words are matched case-insensitively and any whitespace between them
/// is accepted.
pub fn to_seed(phrase: &str) -> Result<[u8; 32], Error> {
  let words: Vec<String> = phrase
    .split_whitespace()
    .map(|w| w.to_ascii_lowercase())
    .collect();

  if words.len() != WORD_COUNT {
    return Err(Error::WordCount(words.len()));
  }

  let list = Language::English.word_list();
  let indices = words
    .iter()
    .map(|word| {
      list
        .binary_search(&word.as_str())
        .map(|i| i as u32)
        .map_err(|_| Error::UnknownWord(word.clone()))
    })
    .collect::<Result<Vec<_>, _>>()?;

  // 24 words * 11 bits = 264 bits = 33 bytes, the last one is padding.
  let bytes = to_bytes(&indices[..DATA_WORDS]);
  if bytes.len() != 33 || bytes[32] != 0 {
    return Err(Error::NonZeroPadding);
  }

  let mut seed = [0u8; 32];
  seed.copy_from_slice(&bytes[..32]);

  if checksum_index(&seed) != indices[DATA_WORDS] {
    return Err(Error::InvalidChecksum);
  }
  Ok(seed)
}

fn checksum_index(seed: &[u8; 32]) -> u32 {
  let hash = sha512_256(&[seed]);
  to_u11(&hash[..2])[0]
}

fn to_u11(bytes: &[u8]) -> Vec<u32> {
  let mut buffer = 0u32;
  let mut bits = 0u32;
  let mut out = Vec::with_capacity(bytes.len() * 8 / 11 + 1);
  for byte in bytes {
    buffer |= (*byte as u32) << bits;
    bits += 8;
    if bits >= BITS_PER_WORD {
      out.push(buffer & WORD_MASK);
      buffer >>= BITS_PER_WORD;
      bits -= BITS_PER_WORD;
    }
  }
  if bits != 0 {
    out.push(buffer & WORD_MASK);
  }
  out
}

fn to_bytes(indices: &[u32]) -> Vec<u8> {
  let mut buffer = 0u32;
  let mut bits = 0u32;
  let mut out = Vec::with_capacity(indices.len() * 11 / 8 + 1);
  for index in indices {
    buffer |= index << bits;
    bits += BITS_PER_WORD;
    while bits >= 8 {
      out.push((buffer & 0xff) as u8);
      buffer >>= 8;
      bits -= 8;
    }
  }
  if bits != 0 {
    out.push((buffer & 0xff) as u8);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn phrase_has_25_words() {
    let phrase = from_seed(&[1u8; 32]);
    assert_eq!(phrase.split(' ').count(), WORD_COUNT);
  }

  #[test]
  fn seed_roundtrip() -> anyhow::Result<()> {
    for seed in [[0u8; 32], [0xffu8; 32], rand::random::<[u8; 32]>()] {
      assert_eq!(to_seed(&from_seed(&seed))?, seed);
    }
    Ok(())
  }

  #[test]
  fn zero_seed_known_phrase() {
    // 24 data words of index 0 followed by the checksum word
    let phrase = from_seed(&[0u8; 32]);
    let words: Vec<_> = phrase.split(' ').collect();
    assert!(words[..24].iter().all(|w| *w == "abandon"));
  }

  #[test]
  fn accepts_mixed_case_and_spacing() -> anyhow::Result<()> {
    let seed = [42u8; 32];
    let phrase = from_seed(&seed).to_uppercase().replace(' ', "  \n");
    assert_eq!(to_seed(&phrase)?, seed);
    Ok(())
  }

  #[test]
  fn rejects_bad_phrases() {
    let phrase = from_seed(&[3u8; 32]);
    let mut words: Vec<String> = phrase.split(' ').map(String::from).collect();

    assert_eq!(to_seed("abandon abandon"), Err(Error::WordCount(2)));

    let mut unknown = words.clone();
    unknown[4] = "notaword".into();
    assert_eq!(
      to_seed(&unknown.join(" ")),
      Err(Error::UnknownWord("notaword".into()))
    );

    // swap the checksum word for a different valid word
    let replacement = if words[24] == "zoo" { "abandon" } else { "zoo" };
    words[24] = replacement.into();
    assert_eq!(to_seed(&words.join(" ")), Err(Error::InvalidChecksum));
  }
}
