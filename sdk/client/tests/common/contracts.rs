//! Minimal emulations of the four deployed contracts, installed as
//! submission hooks on the in-memory ledger. They keep the same storage
//! layout as the real contracts so repositories decode their state
//! unchanged.

use {
  tessera_client::{gateway::LedgerState, AppIds, InMemoryLedger},
  tessera_primitives::{
    encoding::decode_uint,
    Address,
    ContractState,
    SignedTransaction,
    StateValue,
    Transaction,
    TransactionType,
  },
};

type Outcome = Result<(), String>;

/// The application call to `app_id` in a submission, if any.
fn call_to(txs: &[SignedTransaction], app_id: u64) -> Option<&Transaction> {
  txs.iter().map(|stx| stx.transaction()).find(|tx| {
    tx.kind == TransactionType::ApplicationCall && tx.app_id == app_id
  })
}

fn method(tx: &Transaction) -> &[u8] {
  tx.app_args.first().map(|a| &a[..]).unwrap_or_default()
}

fn arg(tx: &Transaction, index: usize) -> Result<&[u8], String> {
  tx.app_args
    .get(index)
    .map(|a| &a[..])
    .ok_or_else(|| format!("missing argument {index}"))
}

fn arg_uint(tx: &Transaction, index: usize) -> Result<u64, String> {
  decode_uint(arg(tx, index)?).map_err(|e| e.to_string())
}

/// Total paid into the escrow of `app_id` by this submission.
fn paid_to_escrow(txs: &[SignedTransaction], app_id: u64) -> u64 {
  let escrow = Address::for_application(app_id);
  txs
    .iter()
    .map(|stx| stx.transaction())
    .filter(|tx| tx.kind == TransactionType::Payment && tx.receiver == Some(escrow))
    .map(|tx| tx.amount)
    .sum()
}

fn uint(state: &ContractState, key: &str) -> u64 {
  match state.get(key) {
    Some(StateValue::Uint(v)) => *v,
    _ => 0,
  }
}

fn put(state: &mut ContractState, key: &str, value: u64) {
  state.insert(key, StateValue::Uint(value));
}

fn put_bytes(state: &mut ContractState, key: &str, value: &[u8]) {
  state.insert(key, StateValue::Bytes(value.to_vec()));
}

fn add(state: &mut ContractState, key: &str, delta: u64) {
  let value = uint(state, key) + delta;
  put(state, key, value);
}

fn sub(state: &mut ContractState, key: &str, delta: u64) {
  let value = uint(state, key).saturating_sub(delta);
  put(state, key, value);
}

/// Hands out the next id of an entity kind.
fn next_id(state: &mut ContractState, counter: &str) -> u64 {
  let id = uint(state, counter);
  put(state, counter, id + 1);
  id
}

fn exists(state: &ContractState, kind: &str, id: u64, defining: &str) -> Outcome {
  match state.get(&format!("{kind}_{id}_{defining}")) {
    Some(_) => Ok(()),
    None => Err(format!("{kind} {id} does not exist")),
  }
}

fn pay_out(ledger: &mut LedgerState, app_id: u64, to: &Address, amount: u64) -> Outcome {
  let escrow = ledger.account_mut(&Address::for_application(app_id));
  escrow.balance = escrow
    .balance
    .checked_sub(amount)
    .ok_or("escrow balance too low")?;
  ledger.account_mut(to).balance += amount;
  Ok(())
}

pub fn install_all(ledger: &InMemoryLedger, apps: AppIds) {
  install_fundraising(ledger, apps.fundraising);
  install_tickets(ledger, apps.tickets);
  install_treasury(ledger, apps.treasury);
  install_splitter(ledger, apps.splitter);
}

pub fn install_fundraising(ledger: &InMemoryLedger, app_id: u64) {
  ledger.on_submit(move |ledger, txs| {
    let Some(call) = call_to(txs, app_id) else {
      return Ok(());
    };
    let sender = call.sender;
    let paid = paid_to_escrow(txs, app_id);

    match method(call) {
      b"create_campaign" => {
        let global = ledger.global_mut(app_id);
        let id = next_id(global, "campaign_count");
        put_bytes(global, &format!("campaign_{id}_title"), arg(call, 1)?);
        put_bytes(global, &format!("campaign_{id}_description"), arg(call, 2)?);
        put_bytes(global, &format!("campaign_{id}_creator"), sender.as_bytes());
        put(global, &format!("campaign_{id}_goal"), arg_uint(call, 3)?);
        put(global, &format!("campaign_{id}_deadline"), arg_uint(call, 4)?);
        put(global, &format!("campaign_{id}_raised"), 0);
      }
      b"donate" => {
        let id = arg_uint(call, 1)?;
        if paid == 0 {
          return Err("donation without payment".into());
        }
        let global = ledger.global_mut(app_id);
        exists(global, "campaign", id, "title")?;
        let raised = format!("campaign_{id}_raised");
        let donors = format!("campaign_{id}_donors");
        add(global, &raised, paid);
        add(global, &donors, 1);

        let local = ledger.local_mut(app_id, &sender);
        let donated = format!("donated_{id}");
        add(local, &donated, paid);
      }
      b"claim" => {
        let id = arg_uint(call, 1)?;
        let global = ledger.global_mut(app_id);
        exists(global, "campaign", id, "title")?;
        let raised = uint(global, &format!("campaign_{id}_raised"));
        put(global, &format!("campaign_{id}_claimed"), 1);
        pay_out(ledger, app_id, &sender, raised)?;
      }
      b"refund" => {
        let id = arg_uint(call, 1)?;
        let local = ledger.local_mut(app_id, &sender);
        let donated = uint(local, &format!("donated_{id}"));
        put(local, &format!("donated_{id}"), 0);

        let global = ledger.global_mut(app_id);
        let raised = format!("campaign_{id}_raised");
        sub(global, &raised, donated);
        pay_out(ledger, app_id, &sender, donated)?;
      }
      b"cancel" => {
        let id = arg_uint(call, 1)?;
        let global = ledger.global_mut(app_id);
        exists(global, "campaign", id, "title")?;
        put(global, &format!("campaign_{id}_cancelled"), 1);
      }
      _ => {}
    }
    Ok(())
  });
}

pub fn install_tickets(ledger: &InMemoryLedger, app_id: u64) {
  ledger.on_submit(move |ledger, txs| {
    let Some(call) = call_to(txs, app_id) else {
      return Ok(());
    };
    let sender = call.sender;
    let paid = paid_to_escrow(txs, app_id);

    match method(call) {
      b"create_event" => {
        let global = ledger.global_mut(app_id);
        let id = next_id(global, "event_count");
        put_bytes(global, &format!("event_{id}_name"), arg(call, 1)?);
        put_bytes(global, &format!("event_{id}_venue"), arg(call, 2)?);
        put_bytes(global, &format!("event_{id}_organizer"), sender.as_bytes());
        put(global, &format!("event_{id}_date"), arg_uint(call, 3)?);
        put(global, &format!("event_{id}_price"), arg_uint(call, 4)?);
        put(global, &format!("event_{id}_capacity"), arg_uint(call, 5)?);
      }
      b"buy" => {
        let id = arg_uint(call, 1)?;
        let global = ledger.global_mut(app_id);
        exists(global, "event", id, "name")?;
        if paid < uint(global, &format!("event_{id}_price")) {
          return Err("ticket underpaid".into());
        }
        let sold_key = format!("event_{id}_sold");
        let sold = uint(global, &sold_key) + 1;
        if sold > uint(global, &format!("event_{id}_capacity")) {
          return Err("sold out".into());
        }
        put(global, &sold_key, sold);
        put(ledger.local_mut(app_id, &sender), &format!("ticket_{id}"), sold);
      }
      b"check_in" => {
        let id = arg_uint(call, 1)?;
        let attendee = *call.accounts.first().ok_or("attendee missing")?;
        let local = ledger.local_mut(app_id, &attendee);
        if uint(local, &format!("ticket_{id}")) == 0 {
          return Err("attendee holds no ticket".into());
        }
        put(local, &format!("checked_{id}"), 1);
      }
      b"cancel_event" => {
        let id = arg_uint(call, 1)?;
        put(ledger.global_mut(app_id), &format!("event_{id}_cancelled"), 1);
      }
      _ => {}
    }
    Ok(())
  });
}

pub fn install_treasury(ledger: &InMemoryLedger, app_id: u64) {
  ledger.on_submit(move |ledger, txs| {
    let Some(call) = call_to(txs, app_id) else {
      return Ok(());
    };
    let sender = call.sender;

    match method(call) {
      b"join" => {
        put(ledger.local_mut(app_id, &sender), "member", 1);
        let global = ledger.global_mut(app_id);
        add(global, "member_count", 1);
        if uint(global, "threshold") == 0 {
          put(global, "threshold", 1);
        }
      }
      b"deposit" => {
        if paid_to_escrow(txs, app_id) == 0 {
          return Err("deposit without payment".into());
        }
      }
      b"propose" => {
        let global = ledger.global_mut(app_id);
        let id = next_id(global, "proposal_count");
        put_bytes(global, &format!("proposal_{id}_title"), arg(call, 1)?);
        put_bytes(global, &format!("proposal_{id}_description"), arg(call, 2)?);
        put_bytes(global, &format!("proposal_{id}_proposer"), sender.as_bytes());
        put_bytes(global, &format!("proposal_{id}_recipient"), arg(call, 3)?);
        put(global, &format!("proposal_{id}_amount"), arg_uint(call, 4)?);
      }
      b"approve" => {
        let id = arg_uint(call, 1)?;
        let local = ledger.local_mut(app_id, &sender);
        if uint(local, "member") != 1 {
          return Err("not a member".into());
        }
        put(local, &format!("approved_{id}"), 1);

        let global = ledger.global_mut(app_id);
        exists(global, "proposal", id, "title")?;
        let approvals = format!("proposal_{id}_approvals");
        add(global, &approvals, 1);
      }
      b"execute" => {
        let id = arg_uint(call, 1)?;
        let recipient = *call.accounts.first().ok_or("recipient missing")?;
        let global = ledger.global_mut(app_id);
        let amount = uint(global, &format!("proposal_{id}_amount"));
        put(global, &format!("proposal_{id}_executed"), 1);
        pay_out(ledger, app_id, &recipient, amount)?;
      }
      _ => {}
    }
    Ok(())
  });
}

pub fn install_splitter(ledger: &InMemoryLedger, app_id: u64) {
  ledger.on_submit(move |ledger, txs| {
    let Some(call) = call_to(txs, app_id) else {
      return Ok(());
    };
    let sender = call.sender;

    match method(call) {
      b"add_expense" => {
        let amount = arg_uint(call, 2)?;
        let count = arg_uint(call, 3)?;
        let share = amount / count.max(1);

        let global = ledger.global_mut(app_id);
        let id = next_id(global, "expense_count");
        put_bytes(global, &format!("expense_{id}_description"), arg(call, 1)?);
        put_bytes(global, &format!("expense_{id}_payer"), sender.as_bytes());
        put(global, &format!("expense_{id}_amount"), amount);
        put(global, &format!("expense_{id}_participants"), count);

        let payer = ledger.local_mut(app_id, &sender);
        add(payer, "owed", share * count);
        for participant in &call.accounts {
          let local = ledger.local_mut(app_id, participant);
          add(local, "owing", share);
        }
      }
      b"settle" => {
        let id = arg_uint(call, 1)?;
        let payee = *call.accounts.first().ok_or("payee missing")?;
        let paid: u64 = txs
          .iter()
          .map(|stx| stx.transaction())
          .filter(|tx| tx.kind == TransactionType::Payment && tx.receiver == Some(payee))
          .map(|tx| tx.amount)
          .sum();
        exists(ledger.global_mut(app_id), "expense", id, "description")?;

        let local = ledger.local_mut(app_id, &sender);
        sub(local, "owing", paid);
        let local = ledger.local_mut(app_id, &payee);
        sub(local, "owed", paid);
      }
      _ => {}
    }
    Ok(())
  });
}
