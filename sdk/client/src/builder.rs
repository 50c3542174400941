use {
  crate::gateway::SuggestedParams,
  tessera_primitives::{
    Address,
    AppArg,
    Bytes,
    OnComplete,
    Transaction,
    TransactionGroup,
    TransactionType,
  },
  thiserror::Error,
};

/// Most application arguments a single call may carry.
pub const MAX_APP_ARGS: usize = 16;

/// Most total bytes across all application arguments of one call.
pub const MAX_APP_ARGS_LEN: usize = 2048;

/// Most foreign accounts a single call may reference.
pub const MAX_ACCOUNT_REFS: usize = 4;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Application call carries {0} arguments, at most {MAX_APP_ARGS} allowed")]
  TooManyArgs(usize),

  #[error("Application arguments total {0} bytes, at most {MAX_APP_ARGS_LEN} allowed")]
  ArgsTooLong(usize),

  #[error("Application call references {0} accounts, at most {MAX_ACCOUNT_REFS} allowed")]
  TooManyAccounts(usize),

  #[error("Payment receiver must not be the sender")]
  SelfPayment,

  #[error(transparent)]
  Group(#[from] tessera_primitives::GroupError),
}

/// Everything an application call needs besides the transaction header.
///
/// The first argument is always the method selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCall {
  args: Vec<Vec<u8>>,
  accounts: Vec<Address>,
  on_complete: OnComplete,
  inner_transactions: u64,
}

impl AppCall {
  pub fn new(method: &str) -> Self {
    Self {
      args: vec![AppArg::Method(method).encode()],
      accounts: vec![],
      on_complete: OnComplete::NoOp,
      inner_transactions: 0,
    }
  }

  pub fn arg(mut self, arg: AppArg<'_>) -> Self {
    self.args.push(arg.encode());
    self
  }

  /// References an account the contract reads from or pays out to.
  pub fn account(mut self, address: Address) -> Self {
    self.accounts.push(address);
    self
  }

  pub fn on_complete(mut self, on_complete: OnComplete) -> Self {
    self.on_complete = on_complete;
    self
  }

  /// Number of inner transactions the contract issues while handling the
  /// call. Their fees are pooled onto the outer call.
  pub fn inner(mut self, count: u64) -> Self {
    self.inner_transactions = count;
    self
  }

  fn validate(&self) -> Result<(), Error> {
    if self.args.len() > MAX_APP_ARGS {
      return Err(Error::TooManyArgs(self.args.len()));
    }

    let total: usize = self.args.iter().map(Vec::len).sum();
    if total > MAX_APP_ARGS_LEN {
      return Err(Error::ArgsTooLong(total));
    }

    if self.accounts.len() > MAX_ACCOUNT_REFS {
      return Err(Error::TooManyAccounts(self.accounts.len()));
    }
    Ok(())
  }
}

/// Builds finalized transaction skeletons from one snapshot of network
/// parameters.
///
/// Every skeleton leaves this type with its fee and validity window set,
/// so skeletons from the same builder can be grouped right away. Nothing
/// here touches the network or a key.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
  params: SuggestedParams,
}

impl TransactionBuilder {
  pub fn new(params: SuggestedParams) -> Self {
    Self { params }
  }

  pub fn params(&self) -> &SuggestedParams {
    &self.params
  }

  fn flat_fee(&self) -> u64 {
    self.params.fee.max(self.params.min_fee)
  }

  fn header(&self, sender: Address, kind: TransactionType) -> Transaction {
    Transaction {
      amount: 0,
      app_args: vec![],
      on_complete: OnComplete::NoOp,
      accounts: vec![],
      app_id: 0,
      fee: self.flat_fee(),
      first_valid: self.params.first_valid,
      genesis_id: self.params.genesis_id.clone(),
      genesis_hash: self.params.genesis_hash,
      group: None,
      last_valid: self.params.last_valid,
      note: Bytes::default(),
      receiver: None,
      sender,
      kind,
    }
  }

  /// Registers `sender` with an application so it can hold local state.
  pub fn opt_in(&self, sender: Address, app_id: u64) -> Transaction {
    Transaction {
      app_id,
      on_complete: OnComplete::OptIn,
      ..self.header(sender, TransactionType::ApplicationCall)
    }
  }

  pub fn app_call(
    &self,
    sender: Address,
    app_id: u64,
    call: AppCall,
  ) -> Result<Transaction, Error> {
    call.validate()?;
    Ok(Transaction {
      app_id,
      app_args: call.args.into_iter().map(Bytes).collect(),
      accounts: call.accounts,
      on_complete: call.on_complete,
      fee: self.flat_fee() * (1 + call.inner_transactions),
      ..self.header(sender, TransactionType::ApplicationCall)
    })
  }

  pub fn payment(
    &self,
    from: Address,
    to: Address,
    amount: u64,
  ) -> Result<Transaction, Error> {
    if from == to {
      return Err(Error::SelfPayment);
    }
    Ok(Transaction {
      amount,
      receiver: Some(to),
      ..self.header(from, TransactionType::Payment)
    })
  }

  /// Payment into the escrow account of an application.
  pub fn deposit(
    &self,
    from: Address,
    app_id: u64,
    amount: u64,
  ) -> Result<Transaction, Error> {
    self.payment(from, Address::for_application(app_id), amount)
  }

  /// Binds finalized skeletons into one atomic group.
  ///
  /// The returned group keeps the given order, which is the order members
  /// must be signed and submitted in.
  pub fn group(
    &self,
    transactions: Vec<Transaction>,
  ) -> Result<TransactionGroup, Error> {
    Ok(TransactionGroup::new(transactions)?)
  }
}
