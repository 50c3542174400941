use {
  super::{upsert_or_remove, Store, ViewState},
  crate::{
    repository::{
      ContractRepository,
      Proposal,
      TransactionResult,
      TreasuryInfo,
      TreasuryRepository,
    },
    Result,
  },
  std::sync::Arc,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreasuryView {
  pub proposals: Vec<Proposal>,
  pub info: Option<TreasuryInfo>,
  /// Whether the loaded wallet is a member.
  pub is_member: bool,
}

pub struct TreasuryStore {
  repository: Arc<TreasuryRepository>,
  store: Store<TreasuryView>,
}

impl TreasuryStore {
  pub fn new(repository: Arc<TreasuryRepository>) -> Self {
    Self {
      repository,
      store: Store::default(),
    }
  }

  pub fn repository(&self) -> &Arc<TreasuryRepository> {
    &self.repository
  }

  pub fn snapshot(&self) -> ViewState<TreasuryView> {
    self.store.snapshot()
  }

  pub async fn fetch_proposals(&self) {
    self
      .store
      .refresh(
        "proposals",
        self.repository.get_active_proposals(),
        |view, proposals| view.proposals = proposals,
      )
      .await;
  }

  /// Closed proposals drop out of the cached list.
  pub async fn fetch_proposal(&self, proposal_id: u64) {
    self
      .store
      .refresh(
        "proposal",
        self.repository.get_proposal(proposal_id),
        |view, proposal| {
          let proposal = proposal.filter(|p| p.status.is_open());
          upsert_or_remove(&mut view.proposals, proposal_id, proposal)
        },
      )
      .await;
  }

  pub async fn fetch_treasury_info(&self) {
    self
      .store
      .refresh("treasury", self.repository.get_treasury_info(), |view, info| {
        view.info = Some(info)
      })
      .await;
  }

  pub async fn fetch_membership(&self) {
    let read = async {
      let address = self.repository.submitter().sender()?;
      self.repository.is_member(&address).await
    };
    self
      .store
      .refresh("membership", read, |view, member| view.is_member = member)
      .await;
  }

  pub async fn deposit(&self, amount: u64) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard.run(self.repository.deposit(amount)).await?;
    self.fetch_treasury_info().await;
    Ok(result)
  }

  pub async fn join(&self) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard.run(self.repository.join()).await?;
    self.fetch_membership().await;
    self.fetch_treasury_info().await;
    Ok(result)
  }

  pub async fn create_proposal(
    &self,
    title: &str,
    description: &str,
    recipient: &str,
    amount: u64,
  ) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(
        self
          .repository
          .create_proposal(title, description, recipient, amount),
      )
      .await?;
    self.fetch_proposals().await;
    self.fetch_treasury_info().await;
    Ok(result)
  }

  pub async fn approve_proposal(&self, proposal_id: u64) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(self.repository.approve_proposal(proposal_id))
      .await?;
    self.fetch_proposal(proposal_id).await;
    self.fetch_treasury_info().await;
    Ok(result)
  }

  pub async fn execute_proposal(&self, proposal_id: u64) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(self.repository.execute_proposal(proposal_id))
      .await?;
    self.fetch_proposal(proposal_id).await;
    self.fetch_treasury_info().await;
    Ok(result)
  }
}
