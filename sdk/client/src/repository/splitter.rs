use {
  super::{
    check_positive,
    check_text,
    ContractRepository,
    Submitter,
    TransactionResult,
    LONG_TEXT_MAX,
  },
  crate::{
    builder::AppCall,
    schema::{local_uint, EntitySchema, FieldSpec, RawEntity},
    Error,
    Result,
  },
  std::collections::HashSet,
  tessera_primitives::{Address, AppArg},
  tracing::info,
};

pub const EXPENSE: EntitySchema = EntitySchema {
  kind: "expense",
  counter: "expense_count",
  defining: "description",
  fields: &[
    FieldSpec::text("description"),
    FieldSpec::address("payer"),
    FieldSpec::uint("amount"),
    FieldSpec::uint("participants"),
    FieldSpec::flag("settled"),
    FieldSpec::uint("created"),
  ],
};

/// Most participants an expense can be split between. Each one is passed
/// as an account reference of the call.
pub const MAX_PARTICIPANTS: usize = crate::builder::MAX_ACCOUNT_REFS;

const OWED: &str = "owed";
const OWING: &str = "owing";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
  pub id: u64,
  pub description: String,
  pub payer: Address,
  pub amount: u64,
  /// Number of accounts the amount is split between.
  pub participants: u64,
  pub settled: bool,
  pub created: u64,
}

impl Expense {
  fn from_raw(raw: &RawEntity) -> Self {
    Self {
      id: raw.id(),
      description: raw.text("description"),
      payer: raw.address("payer"),
      amount: raw.uint("amount"),
      participants: raw.uint("participants"),
      settled: raw.flag("settled"),
      created: raw.uint("created"),
    }
  }

  /// What each participant owes the payer, rounded down.
  pub fn share(&self) -> u64 {
    self.amount / self.participants.max(1)
  }
}

/// Running totals the contract keeps for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserBalance {
  /// What others owe this account.
  pub owed: u64,
  /// What this account owes others.
  pub owing: u64,
}

impl UserBalance {
  /// Positive when the account is owed more than it owes.
  pub fn net(&self) -> i128 {
    self.owed as i128 - self.owing as i128
  }
}

/// Shared expenses between small groups of accounts.
pub struct SplitterRepository {
  app_id: u64,
  submitter: Submitter,
}

impl ContractRepository for SplitterRepository {
  fn app_id(&self) -> u64 {
    self.app_id
  }

  fn submitter(&self) -> &Submitter {
    &self.submitter
  }
}

impl SplitterRepository {
  pub fn new(app_id: u64, submitter: Submitter) -> Self {
    Self { app_id, submitter }
  }

  /// Records that the loaded wallet paid `amount` on behalf of
  /// `participants`.
  pub async fn add_expense(
    &self,
    description: &str,
    amount: u64,
    participants: &[Address],
  ) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    check_text("description", description, LONG_TEXT_MAX)?;
    check_positive("amount", amount)?;

    if participants.is_empty() || participants.len() > MAX_PARTICIPANTS {
      return Err(Error::validation(format!(
        "an expense needs between 1 and {MAX_PARTICIPANTS} participants"
      )));
    }

    let unique: HashSet<_> = participants.iter().collect();
    if unique.len() != participants.len() {
      return Err(Error::validation("participants must be distinct"));
    }

    let builder = self.submitter.builder().await?;
    let call = participants.iter().fold(
      AppCall::new("add_expense")
        .arg(AppArg::Text(description, LONG_TEXT_MAX))
        .arg(AppArg::Uint(amount))
        .arg(AppArg::Uint(participants.len() as u64)),
      |call, participant| call.account(*participant),
    );
    let call = builder.app_call(sender, self.app_id, call)?;

    info!(
      "adding expense of {amount} split between {} participants",
      participants.len()
    );
    self.submitter.send(call, self.app_id).await
  }

  /// Pays `payee` directly, grouped with the call that books the payment
  /// against the expense.
  pub async fn settle(
    &self,
    expense_id: u64,
    payee: &Address,
    amount: u64,
  ) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    check_positive("amount", amount)?;

    let builder = self.submitter.builder().await?;
    let payment = builder.payment(sender, *payee, amount)?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("settle")
        .arg(AppArg::Uint(expense_id))
        .account(*payee),
    )?;

    info!("settling {amount} of expense {expense_id} with {payee}");
    let group = builder.group(vec![payment, call])?;
    self.submitter.send_group(group, self.app_id).await
  }

  pub async fn get_expense(&self, expense_id: u64) -> Result<Option<Expense>> {
    let state = self.global_state().await?;
    Ok(EXPENSE.decode(&state, expense_id)?.map(|raw| Expense::from_raw(&raw)))
  }

  pub async fn get_expenses(&self) -> Result<Vec<Expense>> {
    let state = self.global_state().await?;
    Ok(EXPENSE.decode_all(&state)?.iter().map(Expense::from_raw).collect())
  }

  /// Expenses paid by `address`.
  pub async fn get_user_expenses(&self, address: &Address) -> Result<Vec<Expense>> {
    let mut expenses = self.get_expenses().await?;
    expenses.retain(|e| e.payer == *address);
    Ok(expenses)
  }

  pub async fn get_user_balance(&self, address: &Address) -> Result<UserBalance> {
    let state = self.local_state(address).await?;
    Ok(UserBalance {
      owed: local_uint(&state, OWED)?,
      owing: local_uint(&state, OWING)?,
    })
  }
}
