use {
  super::{
    check_optional_text,
    check_positive,
    check_text,
    unix_now,
    ContractRepository,
    Submitter,
    TransactionResult,
    LONG_TEXT_MAX,
    SHORT_TEXT_MAX,
  },
  crate::{
    builder::AppCall,
    schema::{local_ids, local_key, local_uint, EntitySchema, FieldSpec, RawEntity},
    Error,
    Result,
  },
  tessera_primitives::{Address, AppArg},
  tracing::{info, warn},
};

pub const CAMPAIGN: EntitySchema = EntitySchema {
  kind: "campaign",
  counter: "campaign_count",
  defining: "title",
  fields: &[
    FieldSpec::text("title"),
    FieldSpec::text("description"),
    FieldSpec::address("creator"),
    FieldSpec::uint("goal"),
    FieldSpec::uint("raised"),
    FieldSpec::uint("deadline"),
    FieldSpec::uint("donors"),
    FieldSpec::flag("cancelled"),
    FieldSpec::flag("claimed"),
  ],
};

const DONATED: &str = "donated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
  Active,
  Successful,
  Failed,
  Cancelled,
}

impl CampaignStatus {
  /// Status as the contract evaluates it at time `now`.
  ///
  /// Cancellation wins over everything, a reached goal wins over an
  /// expired deadline.
  pub fn derive(
    cancelled: bool,
    raised: u64,
    goal: u64,
    deadline: u64,
    now: u64,
  ) -> Self {
    if cancelled {
      Self::Cancelled
    } else if raised >= goal {
      Self::Successful
    } else if now > deadline {
      Self::Failed
    } else {
      Self::Active
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
  pub id: u64,
  pub title: String,
  pub description: String,
  pub creator: Address,
  /// Target amount in micro units.
  pub goal: u64,
  pub raised: u64,
  /// Unix timestamp after which donations close.
  pub deadline: u64,
  pub donors: u64,
  pub cancelled: bool,
  pub claimed: bool,
  pub status: CampaignStatus,
}

impl Campaign {
  fn from_raw(raw: &RawEntity, now: u64) -> Self {
    let (cancelled, raised, goal, deadline) = (
      raw.flag("cancelled"),
      raw.uint("raised"),
      raw.uint("goal"),
      raw.uint("deadline"),
    );
    Self {
      id: raw.id(),
      title: raw.text("title"),
      description: raw.text("description"),
      creator: raw.address("creator"),
      goal,
      raised,
      deadline,
      donors: raw.uint("donors"),
      cancelled,
      claimed: raw.flag("claimed"),
      status: CampaignStatus::derive(cancelled, raised, goal, deadline, now),
    }
  }

  /// Fraction of the goal raised so far, in percent, capped at 100.
  pub fn progress(&self) -> u64 {
    match self.goal {
      0 => 100,
      goal => (self.raised.saturating_mul(100) / goal).min(100),
    }
  }
}

/// What one account gave to one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Donation {
  pub campaign_id: u64,
  pub amount: u64,
}

/// Escrowed fundraising campaigns with refunds when a goal is missed.
pub struct FundraisingRepository {
  app_id: u64,
  submitter: Submitter,
}

impl ContractRepository for FundraisingRepository {
  fn app_id(&self) -> u64 {
    self.app_id
  }

  fn submitter(&self) -> &Submitter {
    &self.submitter
  }
}

impl FundraisingRepository {
  pub fn new(app_id: u64, submitter: Submitter) -> Self {
    Self { app_id, submitter }
  }

  pub async fn create_campaign(
    &self,
    title: &str,
    description: &str,
    goal: u64,
    duration_secs: u64,
  ) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    check_text("title", title, SHORT_TEXT_MAX)?;
    check_optional_text("description", description, LONG_TEXT_MAX)?;
    check_positive("goal", goal)?;
    check_positive("duration", duration_secs)?;

    let deadline = unix_now()
      .checked_add(duration_secs)
      .ok_or_else(|| Error::validation("duration too long"))?;
    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("create_campaign")
        .arg(AppArg::Text(title, SHORT_TEXT_MAX))
        .arg(AppArg::Text(description, LONG_TEXT_MAX))
        .arg(AppArg::Uint(goal))
        .arg(AppArg::Uint(deadline)),
    )?;

    info!("creating campaign '{title}' with goal {goal} until {deadline}");
    self.submitter.send(call, self.app_id).await
  }

  /// Pays `amount` into the campaign escrow together with the call that
  /// books it. Either both land or neither does.
  pub async fn donate(
    &self,
    campaign_id: u64,
    amount: u64,
    anonymous: bool,
  ) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    check_positive("donation", amount)?;

    let builder = self.submitter.builder().await?;
    let payment = builder.deposit(sender, self.app_id, amount)?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("donate")
        .arg(AppArg::Uint(campaign_id))
        .arg(AppArg::Bool(anonymous)),
    )?;

    info!("donating {amount} to campaign {campaign_id}");
    let group = builder.group(vec![payment, call])?;
    self.submitter.send_group(group, self.app_id).await
  }

  /// Creator withdraws a successful campaign. The escrow pays out in an
  /// inner transaction.
  pub async fn claim_funds(&self, campaign_id: u64) -> Result<TransactionResult> {
    self.payout_call("claim", campaign_id).await
  }

  /// Donor takes back their donation from a failed or cancelled campaign.
  pub async fn refund(&self, campaign_id: u64) -> Result<TransactionResult> {
    self.payout_call("refund", campaign_id).await
  }

  pub async fn cancel_campaign(&self, campaign_id: u64) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("cancel").arg(AppArg::Uint(campaign_id)),
    )?;
    self.submitter.send(call, self.app_id).await
  }

  async fn payout_call(
    &self,
    method: &str,
    campaign_id: u64,
  ) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new(method).arg(AppArg::Uint(campaign_id)).inner(1),
    )?;
    self.submitter.send(call, self.app_id).await
  }

  pub async fn get_campaign(&self, campaign_id: u64) -> Result<Option<Campaign>> {
    let state = self.global_state().await?;
    let now = unix_now();
    Ok(
      CAMPAIGN
        .decode(&state, campaign_id)?
        .map(|raw| Campaign::from_raw(&raw, now)),
    )
  }

  pub async fn get_campaigns(&self) -> Result<Vec<Campaign>> {
    let state = self.global_state().await?;
    let now = unix_now();
    Ok(
      CAMPAIGN
        .decode_all(&state)?
        .iter()
        .map(|raw| Campaign::from_raw(raw, now))
        .collect(),
    )
  }

  pub async fn get_active_campaigns(&self) -> Result<Vec<Campaign>> {
    let mut campaigns = self.get_campaigns().await?;
    campaigns.retain(|c| c.status == CampaignStatus::Active);
    Ok(campaigns)
  }

  /// Campaigns created by `address`.
  pub async fn get_user_campaigns(&self, address: &Address) -> Result<Vec<Campaign>> {
    let mut campaigns = self.get_campaigns().await?;
    campaigns.retain(|c| c.creator == *address);
    Ok(campaigns)
  }

  /// Non-zero donations `address` has on record, ordered by campaign.
  pub async fn get_user_donations(&self, address: &Address) -> Result<Vec<Donation>> {
    let state = self.local_state(address).await?;
    let mut donations = vec![];
    for campaign_id in local_ids(&state, DONATED) {
      match local_uint(&state, &local_key(DONATED, campaign_id)) {
        Ok(0) => {}
        Ok(amount) => donations.push(Donation {
          campaign_id,
          amount,
        }),
        Err(e) => warn!("skipping donation record: {e}"),
      }
    }
    donations.sort_by_key(|d| d.campaign_id);
    Ok(donations)
  }
}
