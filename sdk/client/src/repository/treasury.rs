use {
  super::{
    check_optional_text,
    check_positive,
    check_text,
    parse_address,
    ContractRepository,
    Submitter,
    TransactionResult,
    LONG_TEXT_MAX,
    SHORT_TEXT_MAX,
  },
  crate::{
    builder::AppCall,
    schema::{local_flag, local_key, EntitySchema, FieldSpec, RawEntity},
    Error,
    Result,
  },
  tessera_primitives::{Address, AppArg, ContractState, OnComplete},
  tracing::info,
};

pub const PROPOSAL: EntitySchema = EntitySchema {
  kind: "proposal",
  counter: "proposal_count",
  defining: "title",
  fields: &[
    FieldSpec::text("title"),
    FieldSpec::text("description"),
    FieldSpec::address("proposer"),
    FieldSpec::address("recipient"),
    FieldSpec::uint("amount"),
    FieldSpec::uint("approvals"),
    FieldSpec::uint("created"),
    FieldSpec::flag("executed"),
    FieldSpec::flag("rejected"),
  ],
};

const MEMBER_COUNT: &str = "member_count";
const THRESHOLD: &str = "threshold";
const MEMBER: &str = "member";
const APPROVED: &str = "approved";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
  Pending,
  Approved,
  Executed,
  Rejected,
}

impl ProposalStatus {
  /// A threshold of zero means the treasury is not configured yet and
  /// nothing can be approved.
  pub fn derive(
    executed: bool,
    rejected: bool,
    approvals: u64,
    threshold: u64,
  ) -> Self {
    if executed {
      Self::Executed
    } else if rejected {
      Self::Rejected
    } else if threshold > 0 && approvals >= threshold {
      Self::Approved
    } else {
      Self::Pending
    }
  }

  /// Whether the proposal can still change state.
  pub fn is_open(&self) -> bool {
    matches!(self, Self::Pending | Self::Approved)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
  pub id: u64,
  pub title: String,
  pub description: String,
  pub proposer: Address,
  pub recipient: Address,
  pub amount: u64,
  pub approvals: u64,
  /// Unix timestamp of creation.
  pub created: u64,
  pub executed: bool,
  pub rejected: bool,
  pub status: ProposalStatus,
}

impl Proposal {
  fn from_raw(raw: &RawEntity, threshold: u64) -> Self {
    let (executed, rejected, approvals) = (
      raw.flag("executed"),
      raw.flag("rejected"),
      raw.uint("approvals"),
    );
    Self {
      id: raw.id(),
      title: raw.text("title"),
      description: raw.text("description"),
      proposer: raw.address("proposer"),
      recipient: raw.address("recipient"),
      amount: raw.uint("amount"),
      approvals,
      created: raw.uint("created"),
      executed,
      rejected,
      status: ProposalStatus::derive(executed, rejected, approvals, threshold),
    }
  }
}

/// Aggregate view of the treasury.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryInfo {
  /// Escrow balance in micro units.
  pub balance: u64,
  /// Approvals a proposal needs before it can be executed.
  pub threshold: u64,
  pub member_count: u64,
  pub proposal_count: u64,
}

/// Multi-member treasury paying out proposals once enough members
/// approved them.
pub struct TreasuryRepository {
  app_id: u64,
  submitter: Submitter,
}

impl ContractRepository for TreasuryRepository {
  fn app_id(&self) -> u64 {
    self.app_id
  }

  fn submitter(&self) -> &Submitter {
    &self.submitter
  }
}

fn threshold(state: &ContractState) -> Result<u64> {
  state
    .uint(THRESHOLD)
    .or_default_value(0)
    .map_err(|reason| Error::decode(THRESHOLD, reason))
}

impl TreasuryRepository {
  pub fn new(app_id: u64, submitter: Submitter) -> Self {
    Self { app_id, submitter }
  }

  pub async fn deposit(&self, amount: u64) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    check_positive("deposit", amount)?;

    let builder = self.submitter.builder().await?;
    let payment = builder.deposit(sender, self.app_id, amount)?;
    let call = builder.app_call(sender, self.app_id, AppCall::new("deposit"))?;

    info!("depositing {amount} into the treasury");
    let group = builder.group(vec![payment, call])?;
    self.submitter.send_group(group, self.app_id).await
  }

  /// Opts in and registers as a member in a single call.
  pub async fn join(&self) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("join").on_complete(OnComplete::OptIn),
    )?;
    self.submitter.send(call, self.app_id).await
  }

  pub async fn create_proposal(
    &self,
    title: &str,
    description: &str,
    recipient: &str,
    amount: u64,
  ) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    check_text("title", title, SHORT_TEXT_MAX)?;
    check_optional_text("description", description, LONG_TEXT_MAX)?;
    let recipient = parse_address("recipient", recipient)?;
    check_positive("amount", amount)?;

    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("propose")
        .arg(AppArg::Text(title, SHORT_TEXT_MAX))
        .arg(AppArg::Text(description, LONG_TEXT_MAX))
        .arg(AppArg::Address(&recipient))
        .arg(AppArg::Uint(amount)),
    )?;

    info!("proposing {amount} to {recipient}");
    self.submitter.send(call, self.app_id).await
  }

  pub async fn approve_proposal(&self, proposal_id: u64) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("approve").arg(AppArg::Uint(proposal_id)),
    )?;
    self.submitter.send(call, self.app_id).await
  }

  /// Pays out an approved proposal from escrow to its recipient.
  pub async fn execute_proposal(&self, proposal_id: u64) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    let proposal = self.get_proposal(proposal_id).await?.ok_or_else(|| {
      Error::validation(format!("proposal {proposal_id} does not exist"))
    })?;

    if proposal.status != ProposalStatus::Approved {
      return Err(Error::validation(format!(
        "proposal {proposal_id} cannot be executed ({:?})",
        proposal.status
      )));
    }

    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("execute")
        .arg(AppArg::Uint(proposal_id))
        .account(proposal.recipient)
        .inner(1),
    )?;
    self.submitter.send(call, self.app_id).await
  }

  pub async fn get_proposal(&self, proposal_id: u64) -> Result<Option<Proposal>> {
    let state = self.global_state().await?;
    let threshold = threshold(&state)?;
    Ok(
      PROPOSAL
        .decode(&state, proposal_id)?
        .map(|raw| Proposal::from_raw(&raw, threshold)),
    )
  }

  pub async fn get_proposals(&self) -> Result<Vec<Proposal>> {
    let state = self.global_state().await?;
    let threshold = threshold(&state)?;
    Ok(
      PROPOSAL
        .decode_all(&state)?
        .iter()
        .map(|raw| Proposal::from_raw(raw, threshold))
        .collect(),
    )
  }

  pub async fn get_active_proposals(&self) -> Result<Vec<Proposal>> {
    let mut proposals = self.get_proposals().await?;
    proposals.retain(|p| p.status.is_open());
    Ok(proposals)
  }

  pub async fn get_treasury_info(&self) -> Result<TreasuryInfo> {
    let escrow = Address::for_application(self.app_id);
    let gateway = self.submitter.gateway();
    let (state, account) = futures::try_join!(
      gateway.application_state(self.app_id),
      gateway.account_info(&escrow)
    )?;

    let uint = |key: &str| {
      state
        .uint(key)
        .or_default_value(0)
        .map_err(|reason| Error::decode(key, reason))
    };

    Ok(TreasuryInfo {
      balance: account.balance,
      threshold: uint(THRESHOLD)?,
      member_count: uint(MEMBER_COUNT)?,
      proposal_count: PROPOSAL.count(&state)?,
    })
  }

  pub async fn is_member(&self, address: &Address) -> Result<bool> {
    local_flag(&self.local_state(address).await?, MEMBER)
  }

  pub async fn has_approved(&self, address: &Address, proposal_id: u64) -> Result<bool> {
    local_flag(
      &self.local_state(address).await?,
      &local_key(APPROVED, proposal_id),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_precedence() {
    use ProposalStatus::*;
    assert_eq!(ProposalStatus::derive(true, true, 5, 2), Executed);
    assert_eq!(ProposalStatus::derive(false, true, 5, 2), Rejected);
    assert_eq!(ProposalStatus::derive(false, false, 2, 2), Approved);
    assert_eq!(ProposalStatus::derive(false, false, 1, 2), Pending);
  }

  #[test]
  fn unconfigured_threshold_never_approves() {
    assert_eq!(
      ProposalStatus::derive(false, false, 0, 0),
      ProposalStatus::Pending
    );
    assert_eq!(
      ProposalStatus::derive(false, false, 3, 0),
      ProposalStatus::Pending
    );
  }

  #[test]
  fn open_statuses() {
    assert!(ProposalStatus::Pending.is_open());
    assert!(ProposalStatus::Approved.is_open());
    assert!(!ProposalStatus::Executed.is_open());
    assert!(!ProposalStatus::Rejected.is_open());
  }
}
