use {
  super::{
    AccountInfo,
    AssetHolding,
    LedgerGateway,
    PendingTransaction,
    SuggestedParams,
  },
  crate::{Error, Result},
  async_trait::async_trait,
  base64::{engine::general_purpose::STANDARD, Engine as _},
  reqwest::{header::CONTENT_TYPE, Client, RequestBuilder, StatusCode},
  serde::{de::DeserializeOwned, Deserialize},
  serde_json::Value,
  std::time::Duration,
  tessera_primitives::{
    Address,
    ContractState,
    Digest,
    StateScope,
    StateValue,
    TransactionId,
  },
  tracing::{debug, warn},
};

const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// Rounds a transaction stays valid after the current round.
const VALIDITY_WINDOW: u64 = 1000;

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AccountResponse {
  amount: u64,
  #[serde(default)]
  min_balance: u64,
  #[serde(default)]
  assets: Vec<AssetResponse>,
  #[serde(default)]
  apps_local_state: Vec<AppLocalStateResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AssetResponse {
  asset_id: u64,
  amount: u64,
  #[serde(default)]
  is_frozen: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AppLocalStateResponse {
  id: u64,
  #[serde(default)]
  key_value: Vec<Value>,
}

#[derive(Deserialize)]
struct ApplicationResponse {
  params: ApplicationParams,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ApplicationParams {
  #[serde(default)]
  global_state: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AccountApplicationResponse {
  app_local_state: Option<AppLocalStateResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ParamsResponse {
  fee: u64,
  min_fee: u64,
  last_round: u64,
  genesis_id: String,
  genesis_hash: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
  #[serde(rename = "txId")]
  tx_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PendingResponse {
  confirmed_round: Option<u64>,
  application_index: Option<u64>,
  #[serde(default)]
  pool_error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct StatusResponse {
  last_round: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
  message: String,
}

/// Gateway backed by the algod v2 REST API.
pub struct AlgodGateway {
  client: Client,
  base_url: String,
  token: String,
  poll_interval: Duration,
}

impl AlgodGateway {
  pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
      token: token.into(),
      poll_interval: Duration::from_secs(1),
    }
  }

  /// Pause between polls when a node answers a round wait without a new
  /// round, as rate limited public nodes do.
  pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
    self.poll_interval = poll_interval;
    self
  }

  fn get(&self, path: &str) -> RequestBuilder {
    self
      .client
      .get(format!("{}{path}", self.base_url))
      .header(TOKEN_HEADER, &self.token)
  }

  async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    debug!("GET {path}");
    Ok(self.get(path).send().await?.error_for_status()?.json().await?)
  }
}

#[async_trait]
impl LedgerGateway for AlgodGateway {
  async fn account_info(&self, address: &Address) -> Result<AccountInfo> {
    let response: AccountResponse =
      self.fetch(&format!("/v2/accounts/{address}")).await?;
    Ok(AccountInfo {
      address: *address,
      balance: response.amount,
      min_balance: response.min_balance,
      assets: response
        .assets
        .into_iter()
        .map(|a| AssetHolding {
          asset_id: a.asset_id,
          amount: a.amount,
          frozen: a.is_frozen,
        })
        .collect(),
      opted_in_apps: response.apps_local_state.iter().map(|s| s.id).collect(),
    })
  }

  async fn application_state(&self, app_id: u64) -> Result<ContractState> {
    let response: ApplicationResponse =
      self.fetch(&format!("/v2/applications/{app_id}")).await?;
    Ok(decode_state(
      app_id,
      StateScope::Global,
      &response.params.global_state,
    ))
  }

  async fn local_state(
    &self,
    app_id: u64,
    address: &Address,
  ) -> Result<ContractState> {
    let response = self
      .get(&format!("/v2/accounts/{address}/applications/{app_id}"))
      .send()
      .await?;

    // the node answers 404 for accounts that never opted in
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(ContractState::new(app_id, StateScope::Local(*address)));
    }

    let response: AccountApplicationResponse =
      response.error_for_status()?.json().await?;
    let entries = response
      .app_local_state
      .map(|s| s.key_value)
      .unwrap_or_default();
    Ok(decode_state(app_id, StateScope::Local(*address), &entries))
  }

  async fn suggested_params(&self) -> Result<SuggestedParams> {
    let response: ParamsResponse = self.fetch("/v2/transactions/params").await?;
    let genesis_hash: [u8; 32] = STANDARD
      .decode(&response.genesis_hash)
      .ok()
      .and_then(|bytes| bytes.try_into().ok())
      .ok_or_else(|| Error::network("node returned a malformed genesis hash"))?;

    Ok(SuggestedParams {
      fee: response.fee,
      min_fee: response.min_fee,
      first_valid: response.last_round,
      last_valid: response.last_round + VALIDITY_WINDOW,
      genesis_id: response.genesis_id,
      genesis_hash: Digest::new(genesis_hash),
    })
  }

  async fn submit_raw(&self, blob: Vec<u8>) -> Result<TransactionId> {
    let response = self
      .client
      .post(format!("{}/v2/transactions", self.base_url))
      .header(TOKEN_HEADER, &self.token)
      .header(CONTENT_TYPE, "application/x-binary")
      .body(blob)
      .send()
      .await?;

    // the node explains rejected submissions in the body of a 400
    if response.status() == StatusCode::BAD_REQUEST {
      let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(e) => e.to_string(),
      };
      return Err(Error::Rejected(message));
    }

    let response: SubmitResponse = response.error_for_status()?.json().await?;
    response
      .tx_id
      .parse()
      .map_err(|e| Error::network(format!("node returned bad tx id: {e}")))
  }

  async fn pending_transaction(
    &self,
    tx_id: &TransactionId,
  ) -> Result<PendingTransaction> {
    let response: PendingResponse = self
      .fetch(&format!("/v2/transactions/pending/{tx_id}"))
      .await?;
    Ok(PendingTransaction {
      confirmed_round: response.confirmed_round,
      application_index: response.application_index,
      pool_error: response.pool_error,
    })
  }

  async fn status(&self) -> Result<u64> {
    let response: StatusResponse = self.fetch("/v2/status").await?;
    Ok(response.last_round)
  }

  async fn wait_for_round_after(&self, round: u64) -> Result<u64> {
    let response: StatusResponse = self
      .fetch(&format!("/v2/status/wait-for-block-after/{round}"))
      .await?;
    if response.last_round <= round {
      tokio::time::sleep(self.poll_interval).await;
    }
    Ok(response.last_round)
  }
}

/// Decodes a REST key/value list, skipping entries that cannot be read.
fn decode_state(
  app_id: u64,
  scope: StateScope,
  entries: &[Value],
) -> ContractState {
  let mut state = ContractState::new(app_id, scope);
  for entry in entries {
    match decode_entry(entry) {
      Ok((key, value)) => state.insert(key, value),
      Err(reason) => warn!("app {app_id}: skipping state entry {entry}: {reason}"),
    }
  }
  state
}

/// Keys and values come base64 encoded and typed by current nodes. Older
/// and proxied nodes have been seen to send plain keys, untyped values
/// and integers as strings, so each step falls back to the alternate
/// form before giving up.
fn decode_entry(entry: &Value) -> std::result::Result<(String, StateValue), String> {
  let raw_key = entry
    .get("key")
    .and_then(Value::as_str)
    .ok_or("missing key")?;

  let key = STANDARD
    .decode(raw_key)
    .ok()
    .and_then(|bytes| String::from_utf8(bytes).ok())
    .unwrap_or_else(|| raw_key.to_string());

  let value = entry.get("value").ok_or("missing value")?;
  let uint = value.get("uint").and_then(decode_uint);
  let bytes = value.get("bytes").and_then(Value::as_str).map(decode_bytes);

  let decoded = match value.get("type").and_then(Value::as_u64) {
    Some(1) => bytes.map(StateValue::Bytes),
    Some(2) => uint.map(StateValue::Uint),
    _ => match (uint, bytes) {
      (Some(n), Some(b)) if n == 0 && !b.is_empty() => Some(StateValue::Bytes(b)),
      (Some(n), _) => Some(StateValue::Uint(n)),
      (None, Some(b)) => Some(StateValue::Bytes(b)),
      (None, None) => None,
    },
  };

  decoded
    .map(|v| (key, v))
    .ok_or_else(|| "value has no readable payload".to_string())
}

fn decode_uint(value: &Value) -> Option<u64> {
  value
    .as_u64()
    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn decode_bytes(raw: &str) -> Vec<u8> {
  STANDARD
    .decode(raw)
    .unwrap_or_else(|_| raw.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
  use {super::*, serde_json::json};

  #[test]
  fn decodes_typed_entries() {
    let entries = vec![
      json!({"key": "Y2FtcGFpZ25fY291bnQ=", "value": {"type": 2, "uint": 4, "bytes": ""}}),
      json!({"key": "dGl0bGU=", "value": {"type": 1, "bytes": "V2F0ZXI=", "uint": 0}}),
    ];
    let state = decode_state(1, StateScope::Global, &entries);
    assert_eq!(state.get("campaign_count"), Some(&StateValue::Uint(4)));
    assert_eq!(state.get("title"), Some(&StateValue::Bytes(b"Water".to_vec())));
  }

  #[test]
  fn falls_back_to_alternate_encodings() {
    let entries = vec![
      // plain key, integer sent as a string, no type tag
      json!({"key": "campaign_0_goal", "value": {"uint": "5000000"}}),
      // untyped bytes that are not base64
      json!({"key": "note", "value": {"bytes": "hello world!"}}),
    ];
    let state = decode_state(1, StateScope::Global, &entries);
    assert_eq!(state.get("campaign_0_goal"), Some(&StateValue::Uint(5_000_000)));
    assert_eq!(
      state.get("note"),
      Some(&StateValue::Bytes(b"hello world!".to_vec()))
    );
  }

  #[test]
  fn skips_malformed_entries_only() {
    let entries = vec![
      json!({"value": {"type": 2, "uint": 1}}),
      json!({"key": "dGl0bGU=", "value": {"type": 2}}),
      json!({"key": "Y291bnQ=", "value": {"type": 2, "uint": 9}}),
    ];
    let state = decode_state(1, StateScope::Global, &entries);
    assert_eq!(state.len(), 1);
    assert_eq!(state.get("count"), Some(&StateValue::Uint(9)));
  }
}
