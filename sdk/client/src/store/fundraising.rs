use {
  super::{upsert_or_remove, Store, ViewState},
  crate::{
    repository::{
      Campaign,
      ContractRepository,
      Donation,
      FundraisingRepository,
      TransactionResult,
    },
    Result,
  },
  std::sync::Arc,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundraisingView {
  pub campaigns: Vec<Campaign>,
  /// Campaigns created by the loaded wallet.
  pub user_campaigns: Vec<Campaign>,
  /// Donations made by the loaded wallet.
  pub donations: Vec<Donation>,
}

pub struct FundraisingStore {
  repository: Arc<FundraisingRepository>,
  store: Store<FundraisingView>,
}

impl FundraisingStore {
  pub fn new(repository: Arc<FundraisingRepository>) -> Self {
    Self {
      repository,
      store: Store::default(),
    }
  }

  pub fn repository(&self) -> &Arc<FundraisingRepository> {
    &self.repository
  }

  pub fn snapshot(&self) -> ViewState<FundraisingView> {
    self.store.snapshot()
  }

  pub async fn fetch_campaigns(&self) {
    self
      .store
      .refresh("campaigns", self.repository.get_campaigns(), |view, all| {
        view.campaigns = all
      })
      .await;
  }

  pub async fn fetch_campaign(&self, campaign_id: u64) {
    self
      .store
      .refresh(
        "campaign",
        self.repository.get_campaign(campaign_id),
        |view, campaign| upsert_or_remove(&mut view.campaigns, campaign_id, campaign),
      )
      .await;
  }

  pub async fn fetch_user_campaigns(&self) {
    let read = async {
      let address = self.repository.submitter().sender()?;
      self.repository.get_user_campaigns(&address).await
    };
    self
      .store
      .refresh("user campaigns", read, |view, mine| view.user_campaigns = mine)
      .await;
  }

  pub async fn fetch_user_donations(&self) {
    let read = async {
      let address = self.repository.submitter().sender()?;
      self.repository.get_user_donations(&address).await
    };
    self
      .store
      .refresh("donations", read, |view, donations| view.donations = donations)
      .await;
  }

  pub async fn opt_in(&self) -> Result<TransactionResult> {
    let guard = self.store.begin();
    guard.run(self.repository.opt_in()).await
  }

  pub async fn create_campaign(
    &self,
    title: &str,
    description: &str,
    goal: u64,
    duration_secs: u64,
  ) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(
        self
          .repository
          .create_campaign(title, description, goal, duration_secs),
      )
      .await?;
    self.fetch_campaigns().await;
    self.fetch_user_campaigns().await;
    Ok(result)
  }

  pub async fn donate(
    &self,
    campaign_id: u64,
    amount: u64,
    anonymous: bool,
  ) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(self.repository.donate(campaign_id, amount, anonymous))
      .await?;
    self.fetch_campaign(campaign_id).await;
    self.fetch_user_donations().await;
    Ok(result)
  }

  pub async fn claim_funds(&self, campaign_id: u64) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard.run(self.repository.claim_funds(campaign_id)).await?;
    self.fetch_campaign(campaign_id).await;
    Ok(result)
  }

  pub async fn refund(&self, campaign_id: u64) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard.run(self.repository.refund(campaign_id)).await?;
    self.fetch_campaign(campaign_id).await;
    self.fetch_user_donations().await;
    Ok(result)
  }

  pub async fn cancel_campaign(&self, campaign_id: u64) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(self.repository.cancel_campaign(campaign_id))
      .await?;
    self.fetch_campaign(campaign_id).await;
    Ok(result)
  }
}
