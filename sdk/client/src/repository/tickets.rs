use {
  super::{
    check_positive,
    check_text,
    unix_now,
    ContractRepository,
    Submitter,
    TransactionResult,
    SHORT_TEXT_MAX,
  },
  crate::{
    builder::AppCall,
    schema::{
      local_flag,
      local_ids,
      local_key,
      local_uint,
      EntitySchema,
      FieldSpec,
      RawEntity,
    },
    Error,
    Result,
  },
  tessera_primitives::{Address, AppArg},
  tracing::{info, warn},
};

pub const EVENT: EntitySchema = EntitySchema {
  kind: "event",
  counter: "event_count",
  defining: "name",
  fields: &[
    FieldSpec::text("name"),
    FieldSpec::text("venue"),
    FieldSpec::address("organizer"),
    FieldSpec::uint("date"),
    FieldSpec::uint("price"),
    FieldSpec::uint("capacity"),
    FieldSpec::uint("sold"),
    FieldSpec::flag("cancelled"),
  ],
};

const TICKET: &str = "ticket";
const CHECKED: &str = "checked";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
  OnSale,
  SoldOut,
  Past,
  Cancelled,
}

impl EventStatus {
  pub fn derive(
    cancelled: bool,
    sold: u64,
    capacity: u64,
    date: u64,
    now: u64,
  ) -> Self {
    if cancelled {
      Self::Cancelled
    } else if sold >= capacity {
      Self::SoldOut
    } else if now > date {
      Self::Past
    } else {
      Self::OnSale
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
  pub id: u64,
  pub name: String,
  pub venue: String,
  pub organizer: Address,
  /// Unix timestamp of the event.
  pub date: u64,
  /// Ticket price in micro units.
  pub price: u64,
  pub capacity: u64,
  pub sold: u64,
  pub cancelled: bool,
  pub status: EventStatus,
}

impl Event {
  fn from_raw(raw: &RawEntity, now: u64) -> Self {
    let (cancelled, sold, capacity, date) = (
      raw.flag("cancelled"),
      raw.uint("sold"),
      raw.uint("capacity"),
      raw.uint("date"),
    );
    Self {
      id: raw.id(),
      name: raw.text("name"),
      venue: raw.text("venue"),
      organizer: raw.address("organizer"),
      date,
      price: raw.uint("price"),
      capacity,
      sold,
      cancelled,
      status: EventStatus::derive(cancelled, sold, capacity, date, now),
    }
  }

  pub fn remaining(&self) -> u64 {
    self.capacity.saturating_sub(self.sold)
  }

  /// Not cancelled and not yet started at `now`, sold out or not.
  pub fn is_upcoming(&self, now: u64) -> bool {
    !self.cancelled && self.date >= now
  }
}

/// A soulbound ticket held by one account.
///
/// Tickets live in the holder's local state and the contract offers no
/// way to move them to another account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
  pub event_id: u64,
  /// 1-based position in the order of purchase.
  pub number: u64,
  pub checked_in: bool,
}

/// Non-transferable event tickets.
pub struct TicketRepository {
  app_id: u64,
  submitter: Submitter,
}

impl ContractRepository for TicketRepository {
  fn app_id(&self) -> u64 {
    self.app_id
  }

  fn submitter(&self) -> &Submitter {
    &self.submitter
  }
}

impl TicketRepository {
  pub fn new(app_id: u64, submitter: Submitter) -> Self {
    Self { app_id, submitter }
  }

  pub async fn create_event(
    &self,
    name: &str,
    venue: &str,
    date: u64,
    price: u64,
    capacity: u64,
  ) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    check_text("name", name, SHORT_TEXT_MAX)?;
    check_text("venue", venue, SHORT_TEXT_MAX)?;
    check_positive("capacity", capacity)?;
    if date <= unix_now() {
      return Err(Error::validation("event date must be in the future"));
    }

    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("create_event")
        .arg(AppArg::Text(name, SHORT_TEXT_MAX))
        .arg(AppArg::Text(venue, SHORT_TEXT_MAX))
        .arg(AppArg::Uint(date))
        .arg(AppArg::Uint(price))
        .arg(AppArg::Uint(capacity)),
    )?;

    info!("creating event '{name}' at '{venue}' for {capacity} guests");
    self.submitter.send(call, self.app_id).await
  }

  /// Pays the current ticket price into escrow grouped with the purchase
  /// call.
  pub async fn purchase_ticket(&self, event_id: u64) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    let event = self
      .get_event(event_id)
      .await?
      .ok_or_else(|| Error::validation(format!("event {event_id} does not exist")))?;

    if event.status != EventStatus::OnSale {
      return Err(Error::validation(format!(
        "event {event_id} is not on sale ({:?})",
        event.status
      )));
    }

    let builder = self.submitter.builder().await?;
    let payment = builder.deposit(sender, self.app_id, event.price)?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("buy").arg(AppArg::Uint(event_id)),
    )?;

    info!("buying ticket for event {event_id} at {}", event.price);
    let group = builder.group(vec![payment, call])?;
    self.submitter.send_group(group, self.app_id).await
  }

  /// Organizer marks the ticket of `attendee` as used.
  pub async fn check_in(
    &self,
    event_id: u64,
    attendee: &Address,
  ) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("check_in")
        .arg(AppArg::Uint(event_id))
        .account(*attendee),
    )?;
    self.submitter.send(call, self.app_id).await
  }

  pub async fn cancel_event(&self, event_id: u64) -> Result<TransactionResult> {
    let sender = self.submitter.sender()?;
    let builder = self.submitter.builder().await?;
    let call = builder.app_call(
      sender,
      self.app_id,
      AppCall::new("cancel_event").arg(AppArg::Uint(event_id)),
    )?;
    self.submitter.send(call, self.app_id).await
  }

  pub async fn get_event(&self, event_id: u64) -> Result<Option<Event>> {
    let state = self.global_state().await?;
    let now = unix_now();
    Ok(
      EVENT
        .decode(&state, event_id)?
        .map(|raw| Event::from_raw(&raw, now)),
    )
  }

  pub async fn get_events(&self) -> Result<Vec<Event>> {
    let state = self.global_state().await?;
    let now = unix_now();
    Ok(
      EVENT
        .decode_all(&state)?
        .iter()
        .map(|raw| Event::from_raw(raw, now))
        .collect(),
    )
  }

  /// Events that have not happened and were not cancelled, soonest first.
  pub async fn get_upcoming_events(&self) -> Result<Vec<Event>> {
    let mut events = self.get_events().await?;
    let now = unix_now();
    events.retain(|e| e.is_upcoming(now));
    events.sort_by_key(|e| e.date);
    Ok(events)
  }

  pub async fn get_user_tickets(&self, address: &Address) -> Result<Vec<Ticket>> {
    let state = self.local_state(address).await?;
    let mut tickets = vec![];
    for event_id in local_ids(&state, TICKET) {
      let ticket = local_uint(&state, &local_key(TICKET, event_id)).and_then(|number| {
        Ok(Ticket {
          event_id,
          number,
          checked_in: local_flag(&state, &local_key(CHECKED, event_id))?,
        })
      });
      match ticket {
        Ok(ticket) if ticket.number > 0 => tickets.push(ticket),
        Ok(_) => {}
        Err(e) => warn!("skipping ticket record: {e}"),
      }
    }
    tickets.sort_by_key(|t| t.event_id);
    Ok(tickets)
  }
}
