use {
  crate::{keystore::Account, Result},
  parking_lot::Mutex,
  rmp_serde::{from_slice, to_vec_named},
  std::path::Path,
};

/// Fixed key under which the single wallet record is stored.
const WALLET_KEY: &str = "tessera/wallet";

/// Durable storage of the one wallet record of an installation.
pub trait WalletStorage: Send + Sync {
  fn load(&self) -> Result<Option<Account>>;
  fn save(&self, account: &Account) -> Result<()>;
  fn clear(&self) -> Result<()>;
}

/// Wallet record persisted in a sled tree.
pub struct OnDiskWalletStorage {
  tree: sled::Tree,
}

impl OnDiskWalletStorage {
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let db = sled::open(path)?;
    Ok(Self {
      tree: db.open_tree("wallet")?,
    })
  }
}

impl WalletStorage for OnDiskWalletStorage {
  fn load(&self) -> Result<Option<Account>> {
    match self.tree.get(WALLET_KEY)? {
      Some(bytes) => Ok(Some(from_slice(&bytes)?)),
      None => Ok(None),
    }
  }

  fn save(&self, account: &Account) -> Result<()> {
    self.tree.insert(WALLET_KEY, to_vec_named(account)?)?;
    self.tree.flush()?;
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self.tree.remove(WALLET_KEY)?;
    self.tree.flush()?;
    Ok(())
  }
}

/// Ephemeral storage, lost when dropped.
#[derive(Default)]
pub struct InMemoryWalletStorage {
  slot: Mutex<Option<Vec<u8>>>,
}

impl WalletStorage for InMemoryWalletStorage {
  fn load(&self) -> Result<Option<Account>> {
    match self.slot.lock().as_deref() {
      Some(bytes) => Ok(Some(from_slice(bytes)?)),
      None => Ok(None),
    }
  }

  fn save(&self, account: &Account) -> Result<()> {
    *self.slot.lock() = Some(to_vec_named(account)?);
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self.slot.lock().take();
    Ok(())
  }
}
