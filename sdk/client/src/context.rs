use {
  crate::{
    gateway::{AlgodGateway, LedgerGateway},
    keystore::KeyStore,
    repository::{
      FundraisingRepository,
      SplitterRepository,
      Submitter,
      TicketRepository,
      TreasuryRepository,
    },
    storage::{OnDiskWalletStorage, WalletStorage},
    store::{FundraisingStore, SplitterStore, TicketStore, TreasuryStore},
    Config,
    Result,
  },
  std::sync::Arc,
  tracing::info,
};

/// Owner of every long lived service of the client.
///
/// Built once at startup and handed to whatever drives the stores. Tests
/// build it over an in-memory ledger and wallet storage.
pub struct AppContext {
  pub config: Config,
  pub keystore: Arc<KeyStore>,
  pub gateway: Arc<dyn LedgerGateway>,

  pub fundraising: FundraisingStore,
  pub tickets: TicketStore,
  pub treasury: TreasuryStore,
  pub splitter: SplitterStore,
}

impl AppContext {
  /// Wires all services and loads a previously persisted wallet, if any.
  pub fn new(
    config: Config,
    gateway: Arc<dyn LedgerGateway>,
    storage: impl WalletStorage + 'static,
  ) -> Result<Self> {
    let keystore = Arc::new(KeyStore::new(storage));
    if keystore.load()?.is_none() {
      info!("no wallet found, create or import one");
    }

    let submitter = Submitter::new(
      keystore.clone(),
      gateway.clone(),
      config.max_confirmation_rounds,
    );
    let ids = config.app_ids;

    Ok(Self {
      fundraising: FundraisingStore::new(Arc::new(FundraisingRepository::new(
        ids.fundraising,
        submitter.clone(),
      ))),
      tickets: TicketStore::new(Arc::new(TicketRepository::new(
        ids.tickets,
        submitter.clone(),
      ))),
      treasury: TreasuryStore::new(Arc::new(TreasuryRepository::new(
        ids.treasury,
        submitter.clone(),
      ))),
      splitter: SplitterStore::new(Arc::new(SplitterRepository::new(
        ids.splitter,
        submitter,
      ))),
      config,
      keystore,
      gateway,
    })
  }

  /// Talks to the configured algod node and keeps the wallet on disk.
  pub fn connect(config: Config) -> Result<Self> {
    let gateway = AlgodGateway::new(&config.algod_url, &config.algod_token)
      .with_poll_interval(config.poll_interval);
    let storage = OnDiskWalletStorage::open(&config.wallet_path)?;
    info!("connecting to {}", config.algod_url);
    Self::new(config, Arc::new(gateway), storage)
  }

  pub fn fundraising(&self) -> &Arc<FundraisingRepository> {
    self.fundraising.repository()
  }

  pub fn tickets(&self) -> &Arc<TicketRepository> {
    self.tickets.repository()
  }

  pub fn treasury(&self) -> &Arc<TreasuryRepository> {
    self.treasury.repository()
  }

  pub fn splitter(&self) -> &Arc<SplitterRepository> {
    self.splitter.repository()
  }
}
