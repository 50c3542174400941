use {
  clap::{Parser, Subcommand},
  humantime::Duration,
  std::{fmt, path::PathBuf},
  tessera_client::{AppIds, Config},
};

/// Tessera Wallet
///
/// Manages a local Algorand wallet and drives the splitter, treasury,
/// tickets and fundraising contracts from the command line.
#[derive(Parser)]
pub struct SystemSettings {
  /// Base url of the algod REST endpoint
  #[clap(long,
    env = "TESSERA_ALGOD_URL",
    default_value = "https://testnet-api.algonode.cloud",
    value_name = "URL")]
  algod_url: String,

  /// API token sent to algod, empty for public nodes
  #[clap(long,
    env = "TESSERA_ALGOD_TOKEN",
    default_value = "",
    hide_default_value = true,
    value_name = "TOKEN")]
  algod_token: String,

  /// Directory of the on-disk wallet database
  #[clap(long, short,
    default_value = ".tessera/wallet",
    value_name = "PATH")]
  wallet: PathBuf,

  /// Rounds to wait for a confirmation before giving up
  #[clap(long, short = 'r',
    default_value = "10",
    value_name = "ROUNDS")]
  max_rounds: u64,

  /// Delay between confirmation polls
  #[clap(long, short = 't',
    value_name = "DURATION",
    default_value = "1s")]
  poll_interval: Duration,

  /// Overrides the splitter application id
  #[clap(long, value_name = "APP_ID")]
  splitter_app: Option<u64>,

  /// Overrides the treasury application id
  #[clap(long, value_name = "APP_ID")]
  treasury_app: Option<u64>,

  /// Overrides the tickets application id
  #[clap(long, value_name = "APP_ID")]
  tickets_app: Option<u64>,

  /// Overrides the fundraising application id
  #[clap(long, value_name = "APP_ID")]
  fundraising_app: Option<u64>,

  #[clap(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Creates, imports, shows or removes the local wallet
  #[clap(subcommand)]
  Wallet(WalletCommand),

  /// Prints balance and application opt-ins of the wallet
  Account,

  /// Lists fundraising campaigns
  Campaigns {
    /// Only campaigns created by this wallet
    #[clap(long)]
    mine: bool,
  },

  /// Donates microalgos to a campaign
  Donate {
    campaign: u64,
    amount: u64,
    #[clap(long)]
    anonymous: bool,
  },

  /// Lists upcoming events and the tickets held by this wallet
  Events,

  /// Buys one ticket for an event
  BuyTicket { event: u64 },

  /// Lists open treasury proposals
  Proposals,

  /// Approves a treasury proposal
  Approve { proposal: u64 },

  /// Lists shared expenses
  Expenses,

  /// Prints what this wallet owes and is owed in the splitter
  Balance,
}

#[derive(Subcommand)]
pub enum WalletCommand {
  /// Generates a new account and prints its recovery phrase
  Create,

  /// Restores an account from its 25 word recovery phrase
  Import {
    #[clap(num_args = 25, value_name = "WORD")]
    words: Vec<String>,
  },

  /// Prints the address of the loaded account
  Show,

  /// Forgets the loaded account
  Clear,
}

const REDACTED: &str = "<redacted>";

// logged at startup, keep secrets out
impl fmt::Debug for SystemSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let token = if self.algod_token.is_empty() { "" } else { REDACTED };
    f.debug_struct("SystemSettings")
      .field("algod_url", &self.algod_url)
      .field("algod_token", &token)
      .field("wallet", &self.wallet)
      .field("max_rounds", &self.max_rounds)
      .field("poll_interval", &self.poll_interval)
      .field("splitter_app", &self.splitter_app)
      .field("treasury_app", &self.treasury_app)
      .field("tickets_app", &self.tickets_app)
      .field("fundraising_app", &self.fundraising_app)
      .field("command", &self.command)
      .finish()
  }
}

impl fmt::Debug for WalletCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Create => f.write_str("Create"),
      Self::Import { words } => f
        .debug_struct("Import")
        .field("words", &format_args!("<{} words redacted>", words.len()))
        .finish(),
      Self::Show => f.write_str("Show"),
      Self::Clear => f.write_str("Clear"),
    }
  }
}

impl SystemSettings {
  pub fn command(&self) -> &Command {
    &self.command
  }

  pub fn config(&self) -> Config {
    let defaults = AppIds::default();
    Config {
      algod_url: self.algod_url.clone(),
      algod_token: self.algod_token.clone(),
      app_ids: AppIds {
        splitter: self.splitter_app.unwrap_or(defaults.splitter),
        treasury: self.treasury_app.unwrap_or(defaults.treasury),
        tickets: self.tickets_app.unwrap_or(defaults.tickets),
        fundraising: self.fundraising_app.unwrap_or(defaults.fundraising),
      },
      max_confirmation_rounds: self.max_rounds,
      poll_interval: self.poll_interval.into(),
      wallet_path: self.wallet.clone(),
      ..Config::default()
    }
  }
}
