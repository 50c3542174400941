use {
  super::{Store, ViewState},
  crate::{
    repository::{
      ContractRepository,
      Expense,
      SplitterRepository,
      TransactionResult,
      UserBalance,
    },
    Result,
  },
  std::sync::Arc,
  tessera_primitives::Address,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitterView {
  pub expenses: Vec<Expense>,
  /// Balance of the loaded wallet.
  pub balance: Option<UserBalance>,
}

pub struct SplitterStore {
  repository: Arc<SplitterRepository>,
  store: Store<SplitterView>,
}

impl SplitterStore {
  pub fn new(repository: Arc<SplitterRepository>) -> Self {
    Self {
      repository,
      store: Store::default(),
    }
  }

  pub fn repository(&self) -> &Arc<SplitterRepository> {
    &self.repository
  }

  pub fn snapshot(&self) -> ViewState<SplitterView> {
    self.store.snapshot()
  }

  pub async fn fetch_expenses(&self) {
    self
      .store
      .refresh("expenses", self.repository.get_expenses(), |view, expenses| {
        view.expenses = expenses
      })
      .await;
  }

  pub async fn fetch_balance(&self) {
    let read = async {
      let address = self.repository.submitter().sender()?;
      self.repository.get_user_balance(&address).await
    };
    self
      .store
      .refresh("balance", read, |view, balance| view.balance = Some(balance))
      .await;
  }

  pub async fn opt_in(&self) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard.run(self.repository.opt_in()).await?;
    self.fetch_balance().await;
    Ok(result)
  }

  pub async fn add_expense(
    &self,
    description: &str,
    amount: u64,
    participants: &[Address],
  ) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(self.repository.add_expense(description, amount, participants))
      .await?;
    self.fetch_expenses().await;
    self.fetch_balance().await;
    Ok(result)
  }

  pub async fn settle(
    &self,
    expense_id: u64,
    payee: &Address,
    amount: u64,
  ) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(self.repository.settle(expense_id, payee, amount))
      .await?;
    self.fetch_expenses().await;
    self.fetch_balance().await;
    Ok(result)
  }
}
