use {
  crate::{digest::sha512_256, transaction, Digest, Transaction},
  serde::Serialize,
  thiserror::Error,
};

/// Largest number of transactions the ledger accepts in one atomic group.
pub const MAX_GROUP_SIZE: usize = 16;

/// Domain separation prefix for group identifiers.
const TG_PREFIX: &[u8] = b"TG";

#[derive(Debug, Error)]
pub enum Error {
  #[error("Cannot group an empty set of transactions")]
  Empty,

  #[error("Group of {0} transactions exceeds the limit of {MAX_GROUP_SIZE}")]
  TooLarge(usize),

  #[error("Transaction at position {0} already belongs to a group")]
  AlreadyGrouped(usize),

  #[error(transparent)]
  Transaction(#[from] transaction::Error),
}

#[derive(Serialize)]
struct TxGroup {
  #[serde(rename = "txlist")]
  transactions: Vec<Digest>,
}

/// Computes the group identifier of an ordered set of finalized,
/// not-yet-grouped transactions.
///
/// The identifier commits to every member and to their order. Changing
/// a fee, a validity window or the position of any member after this
/// call produces a different identifier.
pub fn compute_group_id(transactions: &[Transaction]) -> Result<Digest, Error> {
  if transactions.is_empty() {
    return Err(Error::Empty);
  }

  if transactions.len() > MAX_GROUP_SIZE {
    return Err(Error::TooLarge(transactions.len()));
  }

  let mut ids = Vec::with_capacity(transactions.len());
  for (index, tx) in transactions.iter().enumerate() {
    if tx.group.is_some() {
      return Err(Error::AlreadyGrouped(index));
    }
    ids.push(Digest::from(tx.id()?));
  }

  let encoded = rmp_serde::to_vec_named(&TxGroup { transactions: ids })
    .map_err(transaction::Error::from)?;
  Ok(Digest::new(sha512_256(&[TG_PREFIX, &encoded])))
}

/// An ordered set of transactions bound by a shared group identifier.
///
/// The ledger commits all members or none. Members must be signed and
/// submitted in exactly the order they are stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionGroup {
  id: Digest,
  transactions: Vec<Transaction>,
}

impl TransactionGroup {
  /// Stamps the group identifier onto every member.
  pub fn new(mut transactions: Vec<Transaction>) -> Result<Self, Error> {
    let id = compute_group_id(&transactions)?;
    for tx in transactions.iter_mut() {
      tx.group = Some(id);
    }
    Ok(Self { id, transactions })
  }

  pub fn id(&self) -> &Digest {
    &self.id
  }

  pub fn len(&self) -> usize {
    self.transactions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.transactions.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
    self.transactions.iter()
  }

  pub fn transactions(&self) -> &[Transaction] {
    &self.transactions
  }

  pub fn into_transactions(self) -> Vec<Transaction> {
    self.transactions
  }
}

#[cfg(test)]
mod tests {
  use {
    super::*,
    crate::{Address, Bytes, OnComplete, TransactionType},
  };

  fn call(app_id: u64, fee: u64) -> Transaction {
    Transaction {
      amount: 0,
      app_args: vec![Bytes(b"noop".to_vec())],
      on_complete: OnComplete::NoOp,
      accounts: vec![],
      app_id,
      fee,
      first_valid: 10,
      genesis_id: "sandnet-v1".into(),
      genesis_hash: Digest::new([9u8; 32]),
      group: None,
      last_valid: 1010,
      note: Bytes::default(),
      receiver: None,
      sender: Address::new([1u8; 32]),
      kind: TransactionType::ApplicationCall,
    }
  }

  #[test]
  fn every_member_carries_the_same_id() -> anyhow::Result<()> {
    for size in 1..=MAX_GROUP_SIZE {
      let txs: Vec<_> = (0..size as u64).map(|i| call(i + 1, 1000)).collect();
      let group = TransactionGroup::new(txs.clone())?;
      assert_eq!(group.len(), size);
      for (original, member) in txs.iter().zip(group.iter()) {
        assert_eq!(member.group, Some(*group.id()));
        assert_eq!(member.app_id, original.app_id);
      }
    }
    Ok(())
  }

  #[test]
  fn id_depends_on_order_and_params() -> anyhow::Result<()> {
    let a = call(1, 1000);
    let b = call(2, 1000);

    let forward = compute_group_id(&[a.clone(), b.clone()])?;
    let reversed = compute_group_id(&[b.clone(), a.clone()])?;
    assert_ne!(forward, reversed);

    let mut repriced = b;
    repriced.fee = 2000;
    assert_ne!(forward, compute_group_id(&[a, repriced])?);
    Ok(())
  }

  #[test]
  fn id_is_deterministic() -> anyhow::Result<()> {
    let txs = vec![call(1, 1000), call(2, 1000)];
    assert_eq!(compute_group_id(&txs)?, compute_group_id(&txs)?);
    Ok(())
  }

  #[test]
  fn rejects_invalid_sets() -> anyhow::Result<()> {
    assert!(matches!(compute_group_id(&[]), Err(Error::Empty)));

    let oversized: Vec<_> = (0..17).map(|i| call(i + 1, 1000)).collect();
    assert!(matches!(
      compute_group_id(&oversized),
      Err(Error::TooLarge(17))
    ));

    let grouped = TransactionGroup::new(vec![call(1, 1000)])?;
    let mut regroup = grouped.into_transactions();
    regroup.push(call(2, 1000));
    assert!(matches!(
      TransactionGroup::new(regroup),
      Err(Error::AlreadyGrouped(0))
    ));
    Ok(())
  }
}
