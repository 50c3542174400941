mod fundraising;
mod splitter;
mod tickets;
mod treasury;

pub use {
  fundraising::{
    Campaign,
    CampaignStatus,
    Donation,
    FundraisingRepository,
    CAMPAIGN,
  },
  splitter::{Expense, SplitterRepository, UserBalance, EXPENSE, MAX_PARTICIPANTS},
  tickets::{Event, EventStatus, Ticket, TicketRepository, EVENT},
  treasury::{
    Proposal,
    ProposalStatus,
    TreasuryInfo,
    TreasuryRepository,
    PROPOSAL,
  },
};
use {
  crate::{
    builder::TransactionBuilder,
    gateway::LedgerGateway,
    keystore::KeyStore,
    Error,
    Result,
  },
  async_trait::async_trait,
  std::sync::Arc,
  tessera_primitives::{
    Address,
    ContractState,
    SignedTransaction,
    Transaction,
    TransactionGroup,
    TransactionId,
  },
  time::OffsetDateTime,
};

/// Byte limit of short text fields such as names, titles and venues.
pub const SHORT_TEXT_MAX: usize = 32;

/// Byte limit of description fields.
pub const LONG_TEXT_MAX: usize = 64;

/// Outcome of a confirmed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
  /// Id of the first transaction submitted.
  pub tx_id: TransactionId,
  pub confirmed: bool,
  pub confirmed_round: Option<u64>,
  /// Application the write was addressed to.
  pub app_id: Option<u64>,
}

/// The write pipeline shared by all repositories: sign with the loaded
/// account, submit, then wait for confirmation.
#[derive(Clone)]
pub struct Submitter {
  keystore: Arc<KeyStore>,
  gateway: Arc<dyn LedgerGateway>,
  max_rounds: u64,
}

impl Submitter {
  pub fn new(
    keystore: Arc<KeyStore>,
    gateway: Arc<dyn LedgerGateway>,
    max_rounds: u64,
  ) -> Self {
    Self {
      keystore,
      gateway,
      max_rounds,
    }
  }

  pub fn gateway(&self) -> &Arc<dyn LedgerGateway> {
    &self.gateway
  }

  /// Address of the loaded wallet. Writes call this first so that a
  /// missing wallet fails before any network round trip.
  pub fn sender(&self) -> Result<Address> {
    self.keystore.address()
  }

  /// A builder over freshly fetched network parameters.
  pub async fn builder(&self) -> Result<TransactionBuilder> {
    Ok(TransactionBuilder::new(
      self.gateway.suggested_params().await?,
    ))
  }

  pub async fn send(
    &self,
    transaction: Transaction,
    app_id: u64,
  ) -> Result<TransactionResult> {
    let signed = self.keystore.sign(&transaction)?;
    self.submit(vec![signed], app_id).await
  }

  pub async fn send_group(
    &self,
    group: TransactionGroup,
    app_id: u64,
  ) -> Result<TransactionResult> {
    let signed = self.keystore.sign_group(&group)?;
    self.submit(signed, app_id).await
  }

  async fn submit(
    &self,
    signed: Vec<SignedTransaction>,
    app_id: u64,
  ) -> Result<TransactionResult> {
    let tx_id = self.gateway.submit(&signed).await?;
    let confirmation = self
      .gateway
      .await_confirmation(&tx_id, self.max_rounds)
      .await?;

    Ok(TransactionResult {
      tx_id,
      confirmed: true,
      confirmed_round: Some(confirmation.round),
      app_id: confirmation.application_index.or(Some(app_id)),
    })
  }
}

/// Operations every contract domain supports.
#[async_trait]
pub trait ContractRepository: Send + Sync {
  fn app_id(&self) -> u64;

  fn submitter(&self) -> &Submitter;

  /// Registers the loaded wallet with the contract.
  async fn opt_in(&self) -> Result<TransactionResult> {
    let submitter = self.submitter();
    let sender = submitter.sender()?;
    let builder = submitter.builder().await?;
    submitter
      .send(builder.opt_in(sender, self.app_id()), self.app_id())
      .await
  }

  async fn has_opted_in(&self, address: &Address) -> Result<bool> {
    self
      .submitter()
      .gateway()
      .is_opted_in(address, self.app_id())
      .await
  }

  async fn global_state(&self) -> Result<ContractState> {
    self
      .submitter()
      .gateway()
      .application_state(self.app_id())
      .await
  }

  async fn local_state(&self, address: &Address) -> Result<ContractState> {
    self
      .submitter()
      .gateway()
      .local_state(self.app_id(), address)
      .await
  }
}

/// Rejects text the contract would otherwise silently cut short.
pub(crate) fn check_text(field: &str, text: &str, max_len: usize) -> Result<()> {
  if text.trim().is_empty() {
    return Err(Error::validation(format!("{field} must not be empty")));
  }
  if text.len() > max_len {
    return Err(Error::validation(format!(
      "{field} is {} bytes long, at most {max_len} allowed",
      text.len()
    )));
  }
  Ok(())
}

/// Like [`check_text`] but accepts an empty value.
pub(crate) fn check_optional_text(
  field: &str,
  text: &str,
  max_len: usize,
) -> Result<()> {
  match text.is_empty() {
    true => Ok(()),
    false => check_text(field, text, max_len),
  }
}

pub(crate) fn check_positive(field: &str, value: u64) -> Result<()> {
  match value {
    0 => Err(Error::validation(format!("{field} must be greater than zero"))),
    _ => Ok(()),
  }
}

/// Caller supplied recipient in its text form.
pub(crate) fn parse_address(field: &str, text: &str) -> Result<Address> {
  text
    .trim()
    .parse()
    .map_err(|e| Error::validation(format!("{field}: {e}")))
}

/// Seconds since the unix epoch, the clock contracts compare against.
pub fn unix_now() -> u64 {
  OffsetDateTime::now_utc().unix_timestamp().max(0) as u64
}
