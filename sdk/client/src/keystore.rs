use {
  crate::{storage::WalletStorage, Error, Result},
  ed25519_dalek::{Keypair, PublicKey, SecretKey},
  parking_lot::RwLock,
  rand::RngCore,
  serde::{Deserialize, Serialize},
  tessera_primitives::{
    mnemonic,
    Address,
    SignedTransaction,
    Transaction,
    TransactionGroup,
  },
  time::OffsetDateTime,
  tracing::info,
};

/// The wallet of this installation.
///
/// Holds the recovery phrase rather than a derived key, signing keys are
/// derived on demand and dropped as soon as the signature is produced.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub address: Address,
  pub mnemonic: String,
  #[serde(with = "time::serde::timestamp")]
  pub created_at: OffsetDateTime,
}

impl std::fmt::Debug for Account {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Account")
      .field("address", &self.address)
      .field("mnemonic", &"[redacted]")
      .field("created_at", &self.created_at)
      .finish()
  }
}

fn keypair_from_seed(seed: &[u8; 32]) -> Result<Keypair> {
  let secret = SecretKey::from_bytes(seed)
    .map_err(|e| Error::validation(format!("invalid secret key: {e}")))?;
  let public = PublicKey::from(&secret);
  Ok(Keypair { secret, public })
}

/// Owns the single wallet account of an installation and signs on its
/// behalf.
///
/// Persistence is the only durable side effect. Every operation that
/// needs an account fails with [`Error::NoWallet`] until [`KeyStore::create`]
/// or [`KeyStore::import`] succeeded or [`KeyStore::load`] found a record.
pub struct KeyStore {
  storage: Box<dyn WalletStorage>,
  account: RwLock<Option<Account>>,
}

impl KeyStore {
  pub fn new(storage: impl WalletStorage + 'static) -> Self {
    Self {
      storage: Box::new(storage),
      account: RwLock::new(None),
    }
  }

  /// Generates a fresh keypair, persists it and returns its address and
  /// recovery phrase.
  pub fn create(&self) -> Result<(Address, String)> {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    let phrase = mnemonic::from_seed(&seed);
    let address = self.install(&seed, phrase.clone())?;
    info!("created wallet {address}");
    Ok((address, phrase))
  }

  /// Recovers the keypair encoded by a recovery phrase and persists it.
  ///
  /// The same phrase always yields the same address.
  pub fn import(&self, phrase: &str) -> Result<Address> {
    let seed = mnemonic::to_seed(phrase)?;
    let normalized = mnemonic::from_seed(&seed);
    let address = self.install(&seed, normalized)?;
    info!("imported wallet {address}");
    Ok(address)
  }

  fn install(&self, seed: &[u8; 32], phrase: String) -> Result<Address> {
    let keypair = keypair_from_seed(seed)?;
    let account = Account {
      address: Address::from(keypair.public),
      mnemonic: phrase,
      created_at: OffsetDateTime::now_utc(),
    };
    self.storage.save(&account)?;
    let address = account.address;
    *self.account.write() = Some(account);
    Ok(address)
  }

  /// Loads the persisted account, if any, and makes it current.
  pub fn load(&self) -> Result<Option<Account>> {
    let loaded = self.storage.load()?;
    if let Some(account) = &loaded {
      info!("loaded wallet {}", account.address);
    }
    *self.account.write() = loaded.clone();
    Ok(loaded)
  }

  /// Forgets the account both in memory and on disk.
  pub fn clear(&self) -> Result<()> {
    self.storage.clear()?;
    if let Some(account) = self.account.write().take() {
      info!("disconnected wallet {}", account.address);
    }
    Ok(())
  }

  pub fn account(&self) -> Option<Account> {
    self.account.read().clone()
  }

  pub fn address(&self) -> Result<Address> {
    self
      .account
      .read()
      .as_ref()
      .map(|a| a.address)
      .ok_or(Error::NoWallet)
  }

  /// Signs one transaction skeleton with the loaded account.
  pub fn sign(&self, transaction: &Transaction) -> Result<SignedTransaction> {
    let keypair = self.keypair()?;
    Self::sign_with(&keypair, transaction)
  }

  /// Signs every member of a group, preserving the group order.
  pub fn sign_group(
    &self,
    group: &TransactionGroup,
  ) -> Result<Vec<SignedTransaction>> {
    let keypair = self.keypair()?;
    group
      .iter()
      .map(|tx| Self::sign_with(&keypair, tx))
      .collect()
  }

  fn sign_with(
    keypair: &Keypair,
    transaction: &Transaction,
  ) -> Result<SignedTransaction> {
    if transaction.sender != Address::from(keypair.public) {
      return Err(Error::validation(format!(
        "transaction sender {} is not the loaded wallet",
        transaction.sender
      )));
    }
    Ok(transaction.sign(keypair)?)
  }

  // derived per call and dropped by the caller right after signing.
  fn keypair(&self) -> Result<Keypair> {
    let guard = self.account.read();
    let account = guard.as_ref().ok_or(Error::NoWallet)?;
    let seed = mnemonic::to_seed(&account.mnemonic)?;
    keypair_from_seed(&seed)
  }
}

#[cfg(test)]
mod tests {
  use {
    super::*,
    crate::storage::InMemoryWalletStorage,
    tessera_primitives::{Bytes, Digest, OnComplete, TransactionType},
  };

  fn payment(sender: Address) -> Transaction {
    Transaction {
      amount: 1_000,
      app_args: vec![],
      on_complete: OnComplete::NoOp,
      accounts: vec![],
      app_id: 0,
      fee: 1_000,
      first_valid: 1,
      genesis_id: "sandnet-v1".into(),
      genesis_hash: Digest::new([3u8; 32]),
      group: None,
      last_valid: 1_001,
      note: Bytes::default(),
      receiver: Some(Address::new([8u8; 32])),
      sender,
      kind: TransactionType::Payment,
    }
  }

  #[test]
  fn create_then_import_recovers_address() -> anyhow::Result<()> {
    let store = KeyStore::new(InMemoryWalletStorage::default());
    let (address, phrase) = store.create()?;
    assert_eq!(phrase.split_whitespace().count(), 25);

    let fresh = KeyStore::new(InMemoryWalletStorage::default());
    assert_eq!(fresh.import(&phrase)?, address);
    assert_eq!(fresh.address()?, address);
    Ok(())
  }

  #[test]
  fn operations_require_wallet() {
    let store = KeyStore::new(InMemoryWalletStorage::default());
    assert!(matches!(store.address(), Err(Error::NoWallet)));
    assert!(matches!(
      store.sign(&payment(Address::ZERO)),
      Err(Error::NoWallet)
    ));
  }

  #[test]
  fn signing_is_deterministic() -> anyhow::Result<()> {
    let store = KeyStore::new(InMemoryWalletStorage::default());
    let (address, _) = store.create()?;
    let tx = payment(address);
    assert_eq!(store.sign(&tx)?.encode()?, store.sign(&tx)?.encode()?);
    assert!(store.sign(&tx)?.verify());
    Ok(())
  }

  #[test]
  fn refuses_foreign_sender() -> anyhow::Result<()> {
    let store = KeyStore::new(InMemoryWalletStorage::default());
    store.create()?;
    assert!(matches!(
      store.sign(&payment(Address::new([1u8; 32]))),
      Err(Error::Validation(_))
    ));
    Ok(())
  }

  #[test]
  fn load_and_clear() -> anyhow::Result<()> {
    let store = KeyStore::new(InMemoryWalletStorage::default());
    assert!(store.load()?.is_none());
    let (address, _) = store.create()?;

    assert_eq!(store.load()?.map(|a| a.address), Some(address));

    store.clear()?;
    assert!(store.account().is_none());
    assert!(store.load()?.is_none());
    Ok(())
  }

  #[test]
  fn debug_output_hides_phrase() -> anyhow::Result<()> {
    let store = KeyStore::new(InMemoryWalletStorage::default());
    let (_, phrase) = store.create()?;
    let printed = format!("{:?}", store.account());
    assert!(!printed.contains(&phrase));
    Ok(())
  }
}
