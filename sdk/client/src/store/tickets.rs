use {
  super::{upsert_or_remove, Store, ViewState},
  crate::{
    repository::{
      unix_now,
      ContractRepository,
      Event,
      Ticket,
      TicketRepository,
      TransactionResult,
    },
    Result,
  },
  std::sync::Arc,
  tessera_primitives::Address,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketView {
  pub events: Vec<Event>,
  /// Tickets held by the loaded wallet.
  pub tickets: Vec<Ticket>,
}

pub struct TicketStore {
  repository: Arc<TicketRepository>,
  store: Store<TicketView>,
}

impl TicketStore {
  pub fn new(repository: Arc<TicketRepository>) -> Self {
    Self {
      repository,
      store: Store::default(),
    }
  }

  pub fn repository(&self) -> &Arc<TicketRepository> {
    &self.repository
  }

  pub fn snapshot(&self) -> ViewState<TicketView> {
    self.store.snapshot()
  }

  pub async fn fetch_events(&self) {
    self
      .store
      .refresh("events", self.repository.get_upcoming_events(), |view, events| {
        view.events = events
      })
      .await;
  }

  /// Refreshes one cached event. Events that are no longer upcoming
  /// leave the list, the same as on a full fetch.
  pub async fn fetch_event(&self, event_id: u64) {
    self
      .store
      .refresh("event", self.repository.get_event(event_id), |view, event| {
        let now = unix_now();
        let event = event.filter(|e| e.is_upcoming(now));
        upsert_or_remove(&mut view.events, event_id, event)
      })
      .await;
  }

  pub async fn fetch_user_tickets(&self) {
    let read = async {
      let address = self.repository.submitter().sender()?;
      self.repository.get_user_tickets(&address).await
    };
    self
      .store
      .refresh("tickets", read, |view, tickets| view.tickets = tickets)
      .await;
  }

  pub async fn opt_in(&self) -> Result<TransactionResult> {
    let guard = self.store.begin();
    guard.run(self.repository.opt_in()).await
  }

  pub async fn create_event(
    &self,
    name: &str,
    venue: &str,
    date: u64,
    price: u64,
    capacity: u64,
  ) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(
        self
          .repository
          .create_event(name, venue, date, price, capacity),
      )
      .await?;
    self.fetch_events().await;
    Ok(result)
  }

  pub async fn purchase_ticket(&self, event_id: u64) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(self.repository.purchase_ticket(event_id))
      .await?;
    self.fetch_event(event_id).await;
    self.fetch_user_tickets().await;
    Ok(result)
  }

  pub async fn check_in(
    &self,
    event_id: u64,
    attendee: &Address,
  ) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard
      .run(self.repository.check_in(event_id, attendee))
      .await?;
    self.fetch_event(event_id).await;
    self.fetch_user_tickets().await;
    Ok(result)
  }

  pub async fn cancel_event(&self, event_id: u64) -> Result<TransactionResult> {
    let guard = self.store.begin();
    let result = guard.run(self.repository.cancel_event(event_id)).await?;
    self.fetch_event(event_id).await;
    self.fetch_user_tickets().await;
    Ok(result)
  }
}
