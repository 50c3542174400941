#![allow(dead_code)]

pub mod contracts;

use {
  std::{sync::Arc, time::Duration},
  tessera_client::{AppContext, AppIds, Config, InMemoryLedger, InMemoryWalletStorage},
  tessera_primitives::{Address, StateValue},
};

pub const APPS: AppIds = AppIds {
  splitter: 1001,
  treasury: 1002,
  tickets: 1003,
  fundraising: 1004,
};

/// Starting balance of every test wallet.
pub const FUNDING: u64 = 100_000_000;

pub const MAX_ROUNDS: u64 = 5;

/// An application context over an in-memory ledger running emulated
/// contracts.
pub struct Harness {
  pub ledger: Arc<InMemoryLedger>,
  pub context: AppContext,
}

impl Harness {
  pub fn new() -> anyhow::Result<Self> {
    init_tracing();
    let ledger = Arc::new(InMemoryLedger::new(Duration::from_millis(1)));
    contracts::install_all(&ledger, APPS);

    let config = Config {
      app_ids: APPS,
      max_confirmation_rounds: MAX_ROUNDS,
      poll_interval: Duration::from_millis(1),
      ..Config::default()
    };
    let context =
      AppContext::new(config, ledger.clone(), InMemoryWalletStorage::default())?;
    Ok(Self { ledger, context })
  }

  /// Creates a wallet and funds it.
  pub fn with_wallet() -> anyhow::Result<(Self, Address)> {
    let harness = Self::new()?;
    let (address, _) = harness.context.keystore.create()?;
    harness.ledger.fund(&address, FUNDING);
    Ok((harness, address))
  }

  pub fn balance(&self, address: &Address) -> u64 {
    self.ledger.with_state(|state| state.account(address).balance)
  }
}

/// Installs a log subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

/// Writes a campaign straight into contract storage.
pub fn seed_campaign(
  ledger: &InMemoryLedger,
  id: u64,
  title: &str,
  creator: &Address,
  goal: u64,
  raised: u64,
  deadline: u64,
) {
  let app = APPS.fundraising;
  let count = ledger.with_state(|state| match state.global(app).get("campaign_count") {
    Some(StateValue::Uint(v)) => *v,
    _ => 0,
  });

  let key = |field: &str| format!("campaign_{id}_{field}");
  ledger.set_global(app, "campaign_count", StateValue::Uint(count.max(id + 1)));
  ledger.set_global(app, &key("title"), StateValue::Bytes(title.as_bytes().to_vec()));
  ledger.set_global(app, &key("creator"), StateValue::Bytes(creator.as_bytes().to_vec()));
  ledger.set_global(app, &key("goal"), StateValue::Uint(goal));
  ledger.set_global(app, &key("raised"), StateValue::Uint(raised));
  ledger.set_global(app, &key("deadline"), StateValue::Uint(deadline));
}

/// Writes an event straight into contract storage.
pub fn seed_event(
  ledger: &InMemoryLedger,
  id: u64,
  name: &str,
  organizer: &Address,
  date: u64,
  capacity: u64,
  sold: u64,
) {
  let app = APPS.tickets;
  let count = ledger.with_state(|state| match state.global(app).get("event_count") {
    Some(StateValue::Uint(v)) => *v,
    _ => 0,
  });

  let key = |field: &str| format!("event_{id}_{field}");
  ledger.set_global(app, "event_count", StateValue::Uint(count.max(id + 1)));
  ledger.set_global(app, &key("name"), StateValue::Bytes(name.as_bytes().to_vec()));
  ledger.set_global(app, &key("venue"), StateValue::Bytes(b"Hall".to_vec()));
  ledger.set_global(app, &key("organizer"), StateValue::Bytes(organizer.as_bytes().to_vec()));
  ledger.set_global(app, &key("date"), StateValue::Uint(date));
  ledger.set_global(app, &key("price"), StateValue::Uint(0));
  ledger.set_global(app, &key("capacity"), StateValue::Uint(capacity));
  ledger.set_global(app, &key("sold"), StateValue::Uint(sold));
}

/// Seconds from now.
pub fn in_secs(secs: u64) -> u64 {
  tessera_client::repository::unix_now() + secs
}
