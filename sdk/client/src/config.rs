use std::{path::PathBuf, time::Duration};

/// Parses a decimal application id at compile time.
const fn parse_app_id(value: Option<&str>, default: u64) -> u64 {
  let digits = match value {
    Some(v) => v.as_bytes(),
    None => return default,
  };
  let mut out = 0u64;
  let mut i = 0;
  while i < digits.len() {
    let d = digits[i];
    assert!(d >= b'0' && d <= b'9', "application ids must be decimal");
    out = out * 10 + (d - b'0') as u64;
    i += 1;
  }
  out
}

pub const SPLITTER_APP_ID: u64 =
  parse_app_id(option_env!("TESSERA_SPLITTER_APP_ID"), 745_368_903);
pub const TREASURY_APP_ID: u64 =
  parse_app_id(option_env!("TESSERA_TREASURY_APP_ID"), 745_369_428);
pub const TICKETS_APP_ID: u64 =
  parse_app_id(option_env!("TESSERA_TICKETS_APP_ID"), 745_370_117);
pub const FUNDRAISING_APP_ID: u64 =
  parse_app_id(option_env!("TESSERA_FUNDRAISING_APP_ID"), 745_371_562);

/// Ids of the four deployed contracts this client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppIds {
  pub splitter: u64,
  pub treasury: u64,
  pub tickets: u64,
  pub fundraising: u64,
}

impl Default for AppIds {
  fn default() -> Self {
    Self {
      splitter: SPLITTER_APP_ID,
      treasury: TREASURY_APP_ID,
      tickets: TICKETS_APP_ID,
      fundraising: FUNDRAISING_APP_ID,
    }
  }
}

/// Client wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
  /// Base url of the algod REST endpoint.
  pub algod_url: String,

  /// Value of the `X-Algo-API-Token` header, empty for public nodes.
  pub algod_token: String,

  /// Indexer endpoint for historical queries. Not used when writing.
  pub indexer_url: Option<String>,

  pub app_ids: AppIds,

  /// How many rounds to wait for a submitted transaction before giving
  /// up with a confirmation timeout.
  pub max_confirmation_rounds: u64,

  /// Delay between confirmation polls on gateways that cannot block
  /// until the next round.
  pub poll_interval: Duration,

  /// Directory of the on-disk wallet database.
  pub wallet_path: PathBuf,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      algod_url: "https://testnet-api.algonode.cloud".into(),
      algod_token: String::new(),
      indexer_url: Some("https://testnet-idx.algonode.cloud".into()),
      app_ids: AppIds::default(),
      max_confirmation_rounds: 10,
      poll_interval: Duration::from_secs(1),
      wallet_path: PathBuf::from(".tessera/wallet"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::parse_app_id;

  #[test]
  fn app_id_parsing() {
    assert_eq!(parse_app_id(None, 5), 5);
    assert_eq!(parse_app_id(Some("745368903"), 5), 745_368_903);
  }
}
