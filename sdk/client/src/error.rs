use {
  tessera_primitives::{
    AddressError,
    GroupError,
    MnemonicError,
    TransactionError,
    TransactionId,
  },
  thiserror::Error,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("No wallet loaded, create or import one first")]
  NoWallet,

  #[error("Network error: {0}")]
  Network(Box<dyn std::error::Error + Send + Sync>),

  #[error("Transaction {tx_id} was not confirmed within {rounds} rounds")]
  ConfirmationTimeout { tx_id: TransactionId, rounds: u64 },

  #[error("Transaction rejected by the ledger: {0}")]
  Rejected(String),

  #[error("Malformed on-chain state for {entity}: {reason}")]
  Decode { entity: String, reason: String },

  #[error("Invalid argument: {0}")]
  Validation(String),

  #[error("Invalid mnemonic: {0}")]
  Mnemonic(#[from] MnemonicError),

  #[error("Wallet storage error: {0}")]
  Storage(#[from] sled::Error),

  #[error("Wallet record encoding error: {0}")]
  RecordEncoding(#[from] rmp_serde::encode::Error),

  #[error("Wallet record is corrupt: {0}")]
  CorruptRecord(#[from] rmp_serde::decode::Error),

  #[error(transparent)]
  Transaction(#[from] TransactionError),

  #[error(transparent)]
  Group(#[from] GroupError),
}

impl Error {
  pub fn network(message: impl Into<String>) -> Self {
    Self::Network(message.into().into())
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn decode(entity: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::Decode {
      entity: entity.into(),
      reason: reason.into(),
    }
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Self::Network(Box::new(e))
  }
}

/// Caller supplied addresses that do not parse are argument errors.
impl From<AddressError> for Error {
  fn from(e: AddressError) -> Self {
    Self::Validation(format!("malformed address: {e}"))
  }
}

/// Skeletons violating call limits were built from caller input.
impl From<crate::builder::Error> for Error {
  fn from(e: crate::builder::Error) -> Self {
    match e {
      crate::builder::Error::Group(e) => Self::Group(e),
      other => Self::Validation(other.to_string()),
    }
  }
}
