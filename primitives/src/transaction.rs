use {
  crate::{bytes::Bytes, digest::sha512_256, Address, Digest},
  data_encoding::BASE32_NOPAD,
  ed25519_dalek::{Keypair, PublicKey, Signature, Signer, Verifier},
  serde::{Deserialize, Deserializer, Serialize, Serializer},
  std::{
    fmt::{Debug, Display},
    str::FromStr,
  },
  thiserror::Error,
};

/// Domain separation prefix for transaction ids and signatures.
const TX_PREFIX: &[u8] = b"TX";

#[derive(Debug, Error)]
pub enum Error {
  #[error("Transaction encoding failed: {0}")]
  Encoding(#[from] rmp_serde::encode::Error),

  #[error("Transaction decoding failed: {0}")]
  Decoding(#[from] rmp_serde::decode::Error),

  #[error("Invalid transaction id: {0}")]
  InvalidId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
  Payment,
  ApplicationCall,
}

impl TransactionType {
  fn wire(self) -> &'static str {
    match self {
      Self::Payment => "pay",
      Self::ApplicationCall => "appl",
    }
  }
}

impl Serialize for TransactionType {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.wire())
  }
}

impl<'de> Deserialize<'de> for TransactionType {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    match String::deserialize(deserializer)?.as_str() {
      "pay" => Ok(Self::Payment),
      "appl" => Ok(Self::ApplicationCall),
      other => Err(serde::de::Error::custom(format!(
        "unsupported transaction type {other}"
      ))),
    }
  }
}

/// What happens to the sender's participation in an application after
/// the call is approved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OnComplete {
  #[default]
  NoOp,
  OptIn,
  CloseOut,
  ClearState,
  UpdateApplication,
  DeleteApplication,
}

impl OnComplete {
  pub fn is_noop(&self) -> bool {
    *self == Self::NoOp
  }

  fn wire(self) -> u64 {
    match self {
      Self::NoOp => 0,
      Self::OptIn => 1,
      Self::CloseOut => 2,
      Self::ClearState => 3,
      Self::UpdateApplication => 4,
      Self::DeleteApplication => 5,
    }
  }
}

impl Serialize for OnComplete {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(self.wire())
  }
}

impl<'de> Deserialize<'de> for OnComplete {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Ok(match u64::deserialize(deserializer)? {
      0 => Self::NoOp,
      1 => Self::OptIn,
      2 => Self::CloseOut,
      3 => Self::ClearState,
      4 => Self::UpdateApplication,
      5 => Self::DeleteApplication,
      other => {
        return Err(serde::de::Error::custom(format!(
          "unknown on-completion value {other}"
        )))
      }
    })
  }
}

fn is_zero(value: &u64) -> bool {
  *value == 0
}

/// An unsigned transaction skeleton.
///
/// Fields are declared in the lexicographic order of their wire names
/// and empty values are omitted, so that msgpack map encoding of this
/// struct is the canonical form the ledger hashes and verifies. Do not
/// reorder fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
  /// Payment amount in micro units.
  #[serde(rename = "amt", default, skip_serializing_if = "is_zero")]
  pub amount: u64,

  /// Application call arguments.
  #[serde(rename = "apaa", default, skip_serializing_if = "Vec::is_empty")]
  pub app_args: Vec<Bytes>,

  #[serde(rename = "apan", default, skip_serializing_if = "OnComplete::is_noop")]
  pub on_complete: OnComplete,

  /// Foreign accounts the application may read or pay.
  #[serde(rename = "apat", default, skip_serializing_if = "Vec::is_empty")]
  pub accounts: Vec<Address>,

  #[serde(rename = "apid", default, skip_serializing_if = "is_zero")]
  pub app_id: u64,

  #[serde(default, skip_serializing_if = "is_zero")]
  pub fee: u64,

  #[serde(rename = "fv", default, skip_serializing_if = "is_zero")]
  pub first_valid: u64,

  #[serde(rename = "gen", default, skip_serializing_if = "String::is_empty")]
  pub genesis_id: String,

  #[serde(rename = "gh", default, skip_serializing_if = "Digest::is_zero")]
  pub genesis_hash: Digest,

  #[serde(rename = "grp", default, skip_serializing_if = "Option::is_none")]
  pub group: Option<Digest>,

  #[serde(rename = "lv", default, skip_serializing_if = "is_zero")]
  pub last_valid: u64,

  #[serde(default, skip_serializing_if = "Bytes::is_empty")]
  pub note: Bytes,

  #[serde(rename = "rcv", default, skip_serializing_if = "Option::is_none")]
  pub receiver: Option<Address>,

  #[serde(rename = "snd")]
  pub sender: Address,

  #[serde(rename = "type")]
  pub kind: TransactionType,
}

impl Transaction {
  /// Canonical msgpack encoding.
  pub fn encode(&self) -> Result<Vec<u8>, Error> {
    Ok(rmp_serde::to_vec_named(self)?)
  }

  pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
    Ok(rmp_serde::from_slice(bytes)?)
  }

  /// The exact byte string that gets hashed into the id and signed.
  pub fn bytes_to_sign(&self) -> Result<Vec<u8>, Error> {
    let mut out = TX_PREFIX.to_vec();
    out.extend(self.encode()?);
    Ok(out)
  }

  pub fn id(&self) -> Result<TransactionId, Error> {
    Ok(TransactionId(sha512_256(&[&self.bytes_to_sign()?])))
  }

  /// Signs the transaction with the given keypair.
  ///
  /// ed25519 signatures are deterministic, the same keypair and the same
  /// skeleton always produce byte-identical output.
  pub fn sign(&self, keypair: &Keypair) -> Result<SignedTransaction, Error> {
    let signature = keypair.sign(&self.bytes_to_sign()?);
    Ok(SignedTransaction {
      signature: Bytes(signature.to_bytes().to_vec()),
      transaction: self.clone(),
    })
  }
}

/// Hash identifying a transaction on the ledger.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }
}

impl From<TransactionId> for Digest {
  fn from(id: TransactionId) -> Self {
    Digest::new(id.0)
  }
}

impl Display for TransactionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", BASE32_NOPAD.encode(&self.0))
  }
}

impl Debug for TransactionId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "txid({self})")
  }
}

impl FromStr for TransactionId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let raw = BASE32_NOPAD
      .decode(s.trim().as_bytes())
      .map_err(|e| Error::InvalidId(e.to_string()))?;
    let bytes: [u8; 32] = raw
      .try_into()
      .map_err(|_| Error::InvalidId(format!("{s} is not 32 bytes")))?;
    Ok(Self(bytes))
  }
}

impl Serialize for TransactionId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_string())
  }
}

impl<'de> Deserialize<'de> for TransactionId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    String::deserialize(deserializer)?
      .parse()
      .map_err(serde::de::Error::custom)
  }
}

/// A transaction together with its sender's signature.
///
/// Only exists between signing and submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
  #[serde(rename = "sig")]
  signature: Bytes,

  #[serde(rename = "txn")]
  transaction: Transaction,
}

impl SignedTransaction {
  pub fn transaction(&self) -> &Transaction {
    &self.transaction
  }

  pub fn signature(&self) -> &[u8] {
    &self.signature
  }

  pub fn id(&self) -> Result<TransactionId, Error> {
    self.transaction.id()
  }

  /// Wire bytes as accepted by the node's submission endpoint.
  pub fn encode(&self) -> Result<Vec<u8>, Error> {
    Ok(rmp_serde::to_vec_named(self)?)
  }

  pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
    Ok(rmp_serde::from_slice(bytes)?)
  }

  /// Checks the signature against the sender address.
  pub fn verify(&self) -> bool {
    let Ok(public) = PublicKey::from_bytes(self.transaction.sender.as_bytes())
    else {
      return false;
    };
    let Ok(signature) = Signature::try_from(&self.signature[..]) else {
      return false;
    };
    match self.transaction.bytes_to_sign() {
      Ok(message) => public.verify(&message, &signature).is_ok(),
      Err(_) => false,
    }
  }
}
