//! Cached view state fed to user interfaces.
//!
//! Write actions surface every failure to their caller after recording
//! it. Refresh actions never fail: errors are logged, the previous cache
//! stays in place and the next refresh gets another chance.

mod fundraising;
mod splitter;
mod tickets;
mod treasury;

pub use {
  fundraising::{FundraisingStore, FundraisingView},
  splitter::{SplitterStore, SplitterView},
  tickets::{TicketStore, TicketView},
  treasury::{TreasuryStore, TreasuryView},
};
use {
  crate::{
    repository::{Campaign, Event, Expense, Proposal, TransactionResult},
    Result,
  },
  parking_lot::RwLock,
  std::future::Future,
  tracing::{error, warn},
};

/// Snapshot of one store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState<T> {
  pub data: T,
  /// Most recent successful write.
  pub last_transaction: Option<TransactionResult>,
  /// Whether any write is in flight.
  pub loading: bool,
  /// Message of the last failed write, cleared when a new write starts.
  pub error: Option<String>,
  /// Message of the last failed refresh. Not shown to users.
  pub refresh_error: Option<String>,
}

struct Inner<T> {
  view: ViewState<T>,
  in_flight: usize,
}

/// Shared state machinery behind every domain store.
pub struct Store<T> {
  inner: RwLock<Inner<T>>,
}

impl<T: Default> Default for Store<T> {
  fn default() -> Self {
    Self {
      inner: RwLock::new(Inner {
        view: ViewState::default(),
        in_flight: 0,
      }),
    }
  }
}

impl<T: Clone> Store<T> {
  pub fn snapshot(&self) -> ViewState<T> {
    self.inner.read().view.clone()
  }
}

impl<T> Store<T> {
  /// Marks a write as started. Loading is reset when the returned guard
  /// goes out of scope, however the write ends.
  pub fn begin(&self) -> LoadingGuard<'_, T> {
    let mut inner = self.inner.write();
    inner.in_flight += 1;
    inner.view.loading = true;
    inner.view.error = None;
    LoadingGuard { store: self }
  }

  /// Updates the cached data.
  pub fn update(&self, op: impl FnOnce(&mut T)) {
    op(&mut self.inner.write().view.data);
  }

  /// Runs a read and applies its result to the cache. Failures are
  /// logged and recorded but never returned.
  pub async fn refresh<R, F>(
    &self,
    what: &str,
    read: F,
    apply: impl FnOnce(&mut T, R),
  ) -> bool
  where
    F: Future<Output = Result<R>>,
  {
    match read.await {
      Ok(value) => {
        let mut inner = self.inner.write();
        apply(&mut inner.view.data, value);
        inner.view.refresh_error = None;
        true
      }
      Err(e) => {
        warn!("refreshing {what} failed: {e}");
        self.inner.write().view.refresh_error = Some(e.to_string());
        false
      }
    }
  }
}

/// Keeps `loading` set while a write is in flight.
pub struct LoadingGuard<'a, T> {
  store: &'a Store<T>,
}

impl<T> LoadingGuard<'_, T> {
  /// Awaits the write and records its outcome.
  pub async fn run<F>(&self, write: F) -> Result<TransactionResult>
  where
    F: Future<Output = Result<TransactionResult>>,
  {
    let outcome = write.await;
    let mut inner = self.store.inner.write();
    match &outcome {
      Ok(result) => inner.view.last_transaction = Some(result.clone()),
      Err(e) => {
        error!("write failed: {e}");
        inner.view.error = Some(e.to_string());
      }
    }
    outcome
  }
}

impl<T> Drop for LoadingGuard<'_, T> {
  fn drop(&mut self) {
    let mut inner = self.store.inner.write();
    inner.in_flight = inner.in_flight.saturating_sub(1);
    inner.view.loading = inner.in_flight > 0;
  }
}

/// Entities cached by id.
pub trait Keyed {
  fn key(&self) -> u64;
}

impl Keyed for Campaign {
  fn key(&self) -> u64 {
    self.id
  }
}

impl Keyed for Event {
  fn key(&self) -> u64 {
    self.id
  }
}

impl Keyed for Proposal {
  fn key(&self) -> u64 {
    self.id
  }
}

impl Keyed for Expense {
  fn key(&self) -> u64 {
    self.id
  }
}

/// Replaces the cached entity with the same id or appends a new one.
pub fn upsert<T: Keyed>(items: &mut Vec<T>, item: T) {
  match items.iter_mut().find(|i| i.key() == item.key()) {
    Some(slot) => *slot = item,
    None => items.push(item),
  }
}

/// Applies a single-entity read: refreshed when found, dropped from the
/// cache when it no longer exists.
pub fn upsert_or_remove<T: Keyed>(items: &mut Vec<T>, key: u64, item: Option<T>) {
  match item {
    Some(item) => upsert(items, item),
    None => items.retain(|i| i.key() != key),
  }
}

#[cfg(test)]
mod tests {
  use {super::*, crate::Error};

  #[derive(Debug, Clone, PartialEq, Eq)]
  struct Item(u64, &'static str);

  impl Keyed for Item {
    fn key(&self) -> u64 {
      self.0
    }
  }

  fn result() -> TransactionResult {
    TransactionResult {
      tx_id: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
        .parse()
        .expect("valid id"),
      confirmed: true,
      confirmed_round: Some(3),
      app_id: Some(1),
    }
  }

  #[test]
  fn upsert_replaces_or_appends() {
    let mut items = vec![Item(1, "a"), Item(2, "b")];
    upsert(&mut items, Item(2, "c"));
    upsert(&mut items, Item(3, "d"));
    assert_eq!(items, vec![Item(1, "a"), Item(2, "c"), Item(3, "d")]);

    upsert_or_remove(&mut items, 1, None);
    assert_eq!(items, vec![Item(2, "c"), Item(3, "d")]);
  }

  #[tokio::test]
  async fn guard_resets_loading_on_success() -> anyhow::Result<()> {
    let store = Store::<Vec<Item>>::default();
    {
      let guard = store.begin();
      assert!(store.snapshot().loading);
      guard.run(async { Ok(result()) }).await?;
    }

    let view = store.snapshot();
    assert!(!view.loading);
    assert_eq!(view.last_transaction, Some(result()));
    assert_eq!(view.error, None);
    Ok(())
  }

  #[tokio::test]
  async fn guard_records_failure() {
    let store = Store::<Vec<Item>>::default();
    let outcome = {
      let guard = store.begin();
      guard.run(async { Err(Error::NoWallet) }).await
    };

    assert!(matches!(outcome, Err(Error::NoWallet)));
    let view = store.snapshot();
    assert!(!view.loading);
    assert!(view.error.is_some());
    assert_eq!(view.last_transaction, None);
  }

  #[tokio::test]
  async fn loading_stays_set_while_writes_overlap() {
    let store = Store::<Vec<Item>>::default();
    let first = store.begin();
    let second = store.begin();
    drop(first);
    assert!(store.snapshot().loading);
    drop(second);
    assert!(!store.snapshot().loading);
  }

  #[tokio::test]
  async fn refresh_failure_keeps_cache() {
    let store = Store::<Vec<Item>>::default();
    store.update(|items| items.push(Item(1, "kept")));

    let ok = store
      .refresh(
        "items",
        async { Err::<Vec<Item>, _>(Error::network("down")) },
        |items, fresh| *items = fresh,
      )
      .await;

    assert!(!ok);
    let view = store.snapshot();
    assert_eq!(view.data, vec![Item(1, "kept")]);
    assert_eq!(view.error, None);
    assert!(view.refresh_error.is_some());
  }
}
