use {
  super::{AccountInfo, LedgerGateway, PendingTransaction, SuggestedParams},
  crate::{Error, Result},
  async_trait::async_trait,
  dashmap::DashMap,
  parking_lot::{Mutex, RwLock},
  std::{
    collections::HashMap,
    io::Cursor,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
  },
  tessera_primitives::{
    compute_group_id,
    Address,
    ContractState,
    Digest,
    OnComplete,
    SignedTransaction,
    StateScope,
    StateValue,
    TransactionId,
    TransactionType,
  },
  tracing::{debug, info},
};

const MIN_FEE: u64 = 1000;

/// Invoked with every accepted submission, after signatures, group ids and
/// fees were checked and payments applied. Used to emulate the effect of
/// contract calls. Returning an error rejects the whole submission.
pub type SubmitHook = Box<
  dyn Fn(&mut LedgerState, &[SignedTransaction]) -> std::result::Result<(), String>
    + Send
    + Sync,
>;

/// Accounts and application storage of the in-memory ledger.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
  round: u64,
  accounts: HashMap<Address, AccountInfo>,
  globals: HashMap<u64, ContractState>,
  locals: HashMap<(u64, Address), ContractState>,
}

impl LedgerState {
  pub fn round(&self) -> u64 {
    self.round
  }

  pub fn account(&self, address: &Address) -> AccountInfo {
    self
      .accounts
      .get(address)
      .cloned()
      .unwrap_or_else(|| AccountInfo::empty(*address))
  }

  pub fn account_mut(&mut self, address: &Address) -> &mut AccountInfo {
    self
      .accounts
      .entry(*address)
      .or_insert_with(|| AccountInfo::empty(*address))
  }

  pub fn global(&self, app_id: u64) -> ContractState {
    self
      .globals
      .get(&app_id)
      .cloned()
      .unwrap_or_else(|| ContractState::new(app_id, StateScope::Global))
  }

  pub fn global_mut(&mut self, app_id: u64) -> &mut ContractState {
    self
      .globals
      .entry(app_id)
      .or_insert_with(|| ContractState::new(app_id, StateScope::Global))
  }

  pub fn local(&self, app_id: u64, address: &Address) -> ContractState {
    self
      .locals
      .get(&(app_id, *address))
      .cloned()
      .unwrap_or_else(|| ContractState::new(app_id, StateScope::Local(*address)))
  }

  pub fn local_mut(
    &mut self,
    app_id: u64,
    address: &Address,
  ) -> &mut ContractState {
    self
      .locals
      .entry((app_id, *address))
      .or_insert_with(|| ContractState::new(app_id, StateScope::Local(*address)))
  }

  /// Adds `delta` to an integer in global state, creating it at zero.
  pub fn add_global_uint(&mut self, app_id: u64, key: &str, delta: u64) {
    let state = self.global_mut(app_id);
    let current = match state.get(key) {
      Some(StateValue::Uint(v)) => *v,
      _ => 0,
    };
    state.insert(key, StateValue::Uint(current + delta));
  }

  fn debit(&mut self, address: &Address, amount: u64) -> std::result::Result<(), String> {
    let account = self.account_mut(address);
    account.balance = account
      .balance
      .checked_sub(amount)
      .ok_or_else(|| format!("overspend by {address}"))?;
    Ok(())
  }

  fn opt_in(&mut self, address: &Address, app_id: u64) {
    let account = self.account_mut(address);
    if !account.opted_in_apps.contains(&app_id) {
      account.opted_in_apps.push(app_id);
    }
    self.local_mut(app_id, address);
  }

  fn close_out(&mut self, address: &Address, app_id: u64) {
    self.account_mut(address).opted_in_apps.retain(|id| *id != app_id);
    self.locals.remove(&(app_id, *address));
  }

  /// Built-in ledger rules: fees, payments and opt-in bookkeeping.
  fn apply(&mut self, txs: &[SignedTransaction]) -> std::result::Result<(), String> {
    for stx in txs {
      let tx = stx.transaction();
      self.debit(&tx.sender, tx.fee)?;
      match tx.kind {
        TransactionType::Payment => {
          let receiver = tx.receiver.unwrap_or(Address::ZERO);
          self.debit(&tx.sender, tx.amount)?;
          self.account_mut(&receiver).balance += tx.amount;
        }
        TransactionType::ApplicationCall => match tx.on_complete {
          OnComplete::OptIn => self.opt_in(&tx.sender, tx.app_id),
          OnComplete::CloseOut | OnComplete::ClearState => {
            self.close_out(&tx.sender, tx.app_id)
          }
          _ => {}
        },
      }
    }
    Ok(())
  }
}

/// A single-process ledger that follows the submission rules of a real
/// node closely enough to exercise clients against it: signatures,
/// group ids, fees, validity windows and balances are all checked, and
/// transactions confirm one round after submission.
pub struct InMemoryLedger {
  state: Mutex<LedgerState>,
  pending: DashMap<TransactionId, PendingTransaction>,
  submissions: Mutex<Vec<Vec<SignedTransaction>>>,
  hooks: RwLock<Vec<SubmitHook>>,
  poll_interval: Duration,
  confirming: AtomicBool,
  offline: AtomicBool,
}

impl Default for InMemoryLedger {
  fn default() -> Self {
    Self::new(Duration::from_millis(1))
  }
}

impl InMemoryLedger {
  pub const GENESIS_ID: &'static str = "sandnet-v1";
  pub const GENESIS_HASH: Digest = Digest::new([0x5a; 32]);

  pub fn new(poll_interval: Duration) -> Self {
    Self {
      state: Mutex::new(LedgerState {
        round: 1,
        ..Default::default()
      }),
      pending: DashMap::new(),
      submissions: Mutex::new(vec![]),
      hooks: RwLock::new(vec![]),
      poll_interval,
      confirming: AtomicBool::new(true),
      offline: AtomicBool::new(false),
    }
  }

  pub fn fund(&self, address: &Address, amount: u64) {
    self.state.lock().account_mut(address).balance += amount;
  }

  pub fn set_global(&self, app_id: u64, key: &str, value: StateValue) {
    self.state.lock().global_mut(app_id).insert(key, value);
  }

  pub fn set_local(
    &self,
    app_id: u64,
    address: &Address,
    key: &str,
    value: StateValue,
  ) {
    let mut state = self.state.lock();
    state.opt_in(address, app_id);
    state.local_mut(app_id, address).insert(key, value);
  }

  /// Runs `op` with exclusive access to the ledger state.
  pub fn with_state<T>(&self, op: impl FnOnce(&mut LedgerState) -> T) -> T {
    op(&mut self.state.lock())
  }

  pub fn on_submit<F>(&self, hook: F)
  where
    F: Fn(&mut LedgerState, &[SignedTransaction]) -> std::result::Result<(), String>
      + Send
      + Sync
      + 'static,
  {
    self.hooks.write().push(Box::new(hook));
  }

  /// When disabled, accepted transactions stay pending forever.
  pub fn set_confirming(&self, confirming: bool) {
    self.confirming.store(confirming, Ordering::Release);
  }

  /// When enabled, every call fails with a network error.
  pub fn set_offline(&self, offline: bool) {
    self.offline.store(offline, Ordering::Release);
  }

  /// Every accepted submission, in arrival order.
  pub fn submissions(&self) -> Vec<Vec<SignedTransaction>> {
    self.submissions.lock().clone()
  }

  pub fn round(&self) -> u64 {
    self.state.lock().round
  }

  fn ensure_online(&self) -> Result<()> {
    match self.offline.load(Ordering::Acquire) {
      true => Err(Error::network("ledger node unreachable")),
      false => Ok(()),
    }
  }

  fn check(
    &self,
    txs: &[SignedTransaction],
    round: u64,
  ) -> std::result::Result<(), String> {
    let mut fees = 0u64;
    for (index, stx) in txs.iter().enumerate() {
      let tx = stx.transaction();
      if !stx.verify() {
        return Err(format!("transaction {index}: invalid signature"));
      }
      if tx.genesis_hash != Self::GENESIS_HASH {
        return Err(format!("transaction {index}: wrong genesis hash"));
      }
      if round < tx.first_valid || round > tx.last_valid {
        return Err(format!("transaction {index}: outside validity window"));
      }
      if tx.group != txs[0].transaction().group {
        return Err("group members disagree on group id".into());
      }
      fees += tx.fee;
    }

    if fees < MIN_FEE * txs.len() as u64 {
      return Err(format!("fees of {fees} below minimum"));
    }

    let stamped = txs[0].transaction().group;
    if txs.len() > 1 && stamped.is_none() {
      return Err("multiple transactions submitted without a group id".into());
    }

    if let Some(group) = stamped {
      let ungrouped: Vec<_> = txs
        .iter()
        .map(|stx| {
          let mut tx = stx.transaction().clone();
          tx.group = None;
          tx
        })
        .collect();
      match compute_group_id(&ungrouped) {
        Ok(expected) if expected == group => {}
        Ok(_) => return Err("incomplete or reordered group".into()),
        Err(e) => return Err(e.to_string()),
      }
    }
    Ok(())
  }
}

fn split_blob(blob: &[u8]) -> Result<Vec<SignedTransaction>> {
  let mut cursor = Cursor::new(blob);
  let mut out = vec![];
  while (cursor.position() as usize) < blob.len() {
    let stx: SignedTransaction = rmp_serde::decode::from_read(&mut cursor)
      .map_err(|e| Error::Rejected(format!("malformed submission: {e}")))?;
    out.push(stx);
  }
  Ok(out)
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
  async fn account_info(&self, address: &Address) -> Result<AccountInfo> {
    self.ensure_online()?;
    Ok(self.state.lock().account(address))
  }

  async fn application_state(&self, app_id: u64) -> Result<ContractState> {
    self.ensure_online()?;
    Ok(self.state.lock().global(app_id))
  }

  async fn local_state(
    &self,
    app_id: u64,
    address: &Address,
  ) -> Result<ContractState> {
    self.ensure_online()?;
    Ok(self.state.lock().local(app_id, address))
  }

  async fn suggested_params(&self) -> Result<SuggestedParams> {
    self.ensure_online()?;
    let round = self.state.lock().round;
    Ok(SuggestedParams {
      fee: 0,
      min_fee: MIN_FEE,
      first_valid: round,
      last_valid: round + 1000,
      genesis_id: Self::GENESIS_ID.into(),
      genesis_hash: Self::GENESIS_HASH,
    })
  }

  async fn submit_raw(&self, blob: Vec<u8>) -> Result<TransactionId> {
    self.ensure_online()?;
    let txs = split_blob(&blob)?;
    if txs.is_empty() {
      return Err(Error::Rejected("empty submission".into()));
    }

    let mut state = self.state.lock();
    let round = state.round;
    self.check(&txs, round).map_err(Error::Rejected)?;

    // effects apply to a scratch copy so that a failure anywhere in the
    // group leaves the ledger untouched.
    let mut scratch = state.clone();
    scratch.apply(&txs).map_err(Error::Rejected)?;
    for hook in self.hooks.read().iter() {
      hook(&mut scratch, &txs).map_err(Error::Rejected)?;
    }
    *state = scratch;
    drop(state);

    let confirmed_round = match self.confirming.load(Ordering::Acquire) {
      true => Some(round + 1),
      false => None,
    };
    for stx in &txs {
      self.pending.insert(stx.id()?, PendingTransaction {
        confirmed_round,
        application_index: None,
        pool_error: String::new(),
      });
    }

    let first = txs[0].id()?;
    info!("accepted {first} with {} transactions", txs.len());
    self.submissions.lock().push(txs);
    Ok(first)
  }

  async fn pending_transaction(
    &self,
    tx_id: &TransactionId,
  ) -> Result<PendingTransaction> {
    self.ensure_online()?;
    let round = self.state.lock().round;
    let mut pending = self
      .pending
      .get(tx_id)
      .map(|p| p.clone())
      .ok_or_else(|| Error::network(format!("transaction {tx_id} not found")))?;

    // not visible before its round has been produced
    if pending.confirmed_round.map_or(false, |r| r > round) {
      pending.confirmed_round = None;
    }
    Ok(pending)
  }

  async fn status(&self) -> Result<u64> {
    self.ensure_online()?;
    Ok(self.state.lock().round)
  }

  async fn wait_for_round_after(&self, round: u64) -> Result<u64> {
    self.ensure_online()?;
    tokio::time::sleep(self.poll_interval).await;
    let mut state = self.state.lock();
    if state.round <= round {
      state.round = round + 1;
    }
    debug!("ledger advanced to round {}", state.round);
    Ok(state.round)
  }
}
