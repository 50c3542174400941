use {
  clap::Parser,
  settings::{Command, SystemSettings, WalletCommand},
  tessera_client::{AppContext, Error},
  tracing::{info, warn},
  tracing_subscriber::EnvFilter,
};

mod settings;

const MICROALGOS: f64 = 1_000_000.0;

fn algos(amount: u64) -> String {
  format!("{:.6} ALGO", amount as f64 / MICROALGOS)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let settings = SystemSettings::parse();
  info!("startup settings: {settings:#?}");

  let context = AppContext::connect(settings.config())?;
  match run(&context, settings.command()).await {
    Err(Error::NoWallet) => {
      warn!("no wallet loaded, run `tessera wallet create` or `tessera wallet import`");
      Ok(())
    }
    other => Ok(other?),
  }
}

async fn run(context: &AppContext, command: &Command) -> Result<(), Error> {
  match command {
    Command::Wallet(command) => wallet(context, command),
    Command::Account => {
      let address = context.keystore.address()?;
      let info = context.gateway.account_info(&address).await?;
      info!("account {address}");
      info!("balance {} (minimum {})", algos(info.balance), algos(info.min_balance));
      let ids = context.config.app_ids;
      for (name, app_id) in [
        ("splitter", ids.splitter),
        ("treasury", ids.treasury),
        ("tickets", ids.tickets),
        ("fundraising", ids.fundraising),
      ] {
        let opted = info.opted_in_apps.contains(&app_id);
        info!("{name} ({app_id}) opted in: {opted}");
      }
      Ok(())
    }
    Command::Campaigns { mine } => {
      let store = &context.fundraising;
      if *mine {
        store.fetch_user_campaigns().await;
      } else {
        store.fetch_campaigns().await;
      }
      let view = store.snapshot();
      if let Some(e) = &view.refresh_error {
        warn!("could not load campaigns: {e}");
      }
      let campaigns = if *mine {
        &view.data.user_campaigns
      } else {
        &view.data.campaigns
      };
      for c in campaigns {
        info!(
          "#{} {} [{:?}] {} of {} ({}%), {} donors",
          c.id,
          c.title,
          c.status,
          algos(c.raised),
          algos(c.goal),
          c.progress(),
          c.donors
        );
      }
      Ok(())
    }
    Command::Donate {
      campaign,
      amount,
      anonymous,
    } => {
      let result = context
        .fundraising
        .donate(*campaign, *amount, *anonymous)
        .await?;
      info!("donated {} in {}", algos(*amount), result.tx_id);
      Ok(())
    }
    Command::Events => {
      let store = &context.tickets;
      store.fetch_events().await;
      store.fetch_user_tickets().await;
      let view = store.snapshot();
      if let Some(e) = &view.refresh_error {
        warn!("could not load events: {e}");
      }
      for e in &view.data.events {
        info!(
          "#{} {} at {} [{:?}] {} each, {} left",
          e.id,
          e.name,
          e.venue,
          e.status,
          algos(e.price),
          e.remaining()
        );
      }
      for t in &view.data.tickets {
        info!(
          "ticket {} for event #{} (checked in: {})",
          t.number, t.event_id, t.checked_in
        );
      }
      Ok(())
    }
    Command::BuyTicket { event } => {
      let result = context.tickets.purchase_ticket(*event).await?;
      info!("bought ticket for event #{event} in {}", result.tx_id);
      Ok(())
    }
    Command::Proposals => {
      let store = &context.treasury;
      store.fetch_treasury_info().await;
      store.fetch_proposals().await;
      let view = store.snapshot();
      if let Some(e) = &view.refresh_error {
        warn!("could not load proposals: {e}");
      }
      if let Some(treasury) = &view.data.info {
        info!(
          "treasury holds {}, {} members, {} approvals needed",
          algos(treasury.balance),
          treasury.member_count,
          treasury.threshold
        );
      }
      for p in &view.data.proposals {
        info!(
          "#{} {} [{:?}] {} to {}, {} approvals",
          p.id,
          p.title,
          p.status,
          algos(p.amount),
          p.recipient,
          p.approvals
        );
      }
      Ok(())
    }
    Command::Approve { proposal } => {
      let result = context.treasury.approve_proposal(*proposal).await?;
      info!("approved proposal #{proposal} in {}", result.tx_id);
      Ok(())
    }
    Command::Expenses => {
      let store = &context.splitter;
      store.fetch_expenses().await;
      let view = store.snapshot();
      if let Some(e) = &view.refresh_error {
        warn!("could not load expenses: {e}");
      }
      for e in &view.data.expenses {
        info!(
          "#{} {} paid by {}: {} split {} ways (settled: {})",
          e.id,
          e.description,
          e.payer,
          algos(e.amount),
          e.participants,
          e.settled
        );
      }
      Ok(())
    }
    Command::Balance => {
      let address = context.keystore.address()?;
      let balance = context.splitter().get_user_balance(&address).await?;
      info!(
        "owed {}, owing {}, net {} microalgos",
        algos(balance.owed),
        algos(balance.owing),
        balance.net()
      );
      Ok(())
    }
  }
}

fn wallet(context: &AppContext, command: &WalletCommand) -> Result<(), Error> {
  let keystore = &context.keystore;
  match command {
    WalletCommand::Create => {
      let (address, phrase) = keystore.create()?;
      info!("created account {address}");
      // printed, never logged
      println!("{phrase}");
      info!("write down the 25 words above, they are the only backup");
    }
    WalletCommand::Import { words } => {
      let address = keystore.import(&words.join(" "))?;
      info!("imported account {address}");
    }
    WalletCommand::Show => {
      let account = keystore.account().ok_or(Error::NoWallet)?;
      info!("account {} created {}", account.address, account.created_at);
    }
    WalletCommand::Clear => {
      keystore.clear()?;
      info!("wallet removed");
    }
  }
  Ok(())
}
