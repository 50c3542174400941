mod algod;
mod memory;

pub use {
  algod::AlgodGateway,
  memory::{InMemoryLedger, LedgerState, SubmitHook},
};
use {
  crate::{Error, Result},
  async_trait::async_trait,
  tessera_primitives::{
    Address,
    ContractState,
    Digest,
    SignedTransaction,
    TransactionId,
  },
  tracing::{debug, info, warn},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHolding {
  pub asset_id: u64,
  pub amount: u64,
  pub frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
  pub address: Address,
  /// Balance in micro units.
  pub balance: u64,
  /// Balance the account must keep to stay open.
  pub min_balance: u64,
  pub assets: Vec<AssetHolding>,
  pub opted_in_apps: Vec<u64>,
}

impl AccountInfo {
  pub fn empty(address: Address) -> Self {
    Self {
      address,
      balance: 0,
      min_balance: 0,
      assets: vec![],
      opted_in_apps: vec![],
    }
  }

  /// Amount that can be spent without dropping below the minimum balance.
  pub fn spendable(&self) -> u64 {
    self.balance.saturating_sub(self.min_balance)
  }
}

/// Network parameters every transaction must be finalized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedParams {
  /// Fee per byte suggested by the node, often zero when uncongested.
  pub fee: u64,
  pub min_fee: u64,
  pub first_valid: u64,
  pub last_valid: u64,
  pub genesis_id: String,
  pub genesis_hash: Digest,
}

/// What the node currently knows about a submitted transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingTransaction {
  pub confirmed_round: Option<u64>,
  /// Id of the application created by this transaction, if any.
  pub application_index: Option<u64>,
  /// Non empty when the node dropped the transaction from its pool.
  pub pool_error: String,
}

/// Proof that a transaction made it into a finalized round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
  pub tx_id: TransactionId,
  pub round: u64,
  pub application_index: Option<u64>,
}

/// Read and write access to a remote ledger node.
///
/// Transport failures are returned as [`Error::Network`] without retries,
/// retry policy belongs to callers.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
  async fn account_info(&self, address: &Address) -> Result<AccountInfo>;

  /// Global state of an application.
  async fn application_state(&self, app_id: u64) -> Result<ContractState>;

  /// Local state an application keeps for one account. Empty when the
  /// account has not opted in.
  async fn local_state(
    &self,
    app_id: u64,
    address: &Address,
  ) -> Result<ContractState>;

  async fn suggested_params(&self) -> Result<SuggestedParams>;

  /// Submits already concatenated signed transaction bytes.
  async fn submit_raw(&self, blob: Vec<u8>) -> Result<TransactionId>;

  async fn pending_transaction(
    &self,
    tx_id: &TransactionId,
  ) -> Result<PendingTransaction>;

  /// Last round the node has seen.
  async fn status(&self) -> Result<u64>;

  /// Returns once a round after `round` is available, with the new last
  /// round.
  async fn wait_for_round_after(&self, round: u64) -> Result<u64>;

  /// Submits one signed transaction or a whole signed group.
  ///
  /// Group members are concatenated in the given order, which must be
  /// the order the group was built in or the ledger rejects it. Returns
  /// the id of the first transaction.
  async fn submit(&self, signed: &[SignedTransaction]) -> Result<TransactionId> {
    let first = signed
      .first()
      .ok_or_else(|| Error::validation("nothing to submit"))?;
    let expected = first.id()?;

    let mut blob = Vec::new();
    for tx in signed {
      blob.extend(tx.encode()?);
    }

    let tx_id = self.submit_raw(blob).await?;
    if tx_id != expected {
      warn!("node returned id {tx_id}, expected {expected}");
    }
    info!("submitted {tx_id} ({} transactions)", signed.len());
    Ok(tx_id)
  }

  /// Polls the node once per round until the transaction is confirmed.
  ///
  /// Fails with [`Error::ConfirmationTimeout`] when `max_rounds` rounds
  /// pass without confirmation and with [`Error::Rejected`] when the node
  /// reports a pool error.
  async fn await_confirmation(
    &self,
    tx_id: &TransactionId,
    max_rounds: u64,
  ) -> Result<Confirmation> {
    let start = self.status().await?;
    let deadline = start.saturating_add(max_rounds);
    let mut round = start;

    // checked at least once, even with a zero budget
    loop {
      let pending = self.pending_transaction(tx_id).await?;
      if let Some(confirmed) = pending.confirmed_round.filter(|r| *r > 0) {
        info!("{tx_id} confirmed in round {confirmed}");
        return Ok(Confirmation {
          tx_id: *tx_id,
          round: confirmed,
          application_index: pending.application_index,
        });
      }

      if !pending.pool_error.is_empty() {
        return Err(Error::Rejected(pending.pool_error));
      }

      if round >= deadline {
        break;
      }

      debug!("{tx_id} pending at round {round}");
      round = self
        .wait_for_round_after(round)
        .await?
        .max(round.saturating_add(1));
    }

    warn!("{tx_id} not confirmed after {max_rounds} rounds");
    Err(Error::ConfirmationTimeout {
      tx_id: *tx_id,
      rounds: max_rounds,
    })
  }

  async fn is_opted_in(&self, address: &Address, app_id: u64) -> Result<bool> {
    Ok(
      self
        .account_info(address)
        .await?
        .opted_in_apps
        .contains(&app_id),
    )
  }
}
