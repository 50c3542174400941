mod common;

use {
  common::{in_secs, seed_campaign, Harness, APPS, MAX_ROUNDS},
  tessera_client::{
    repository::CampaignStatus,
    ContractRepository,
    Error,
  },
  tessera_primitives::{Address, OnComplete, TransactionType},
};

#[tokio::test]
async fn donation_is_grouped_and_refetched() -> anyhow::Result<()> {
  let (harness, donor) = Harness::with_wallet()?;
  let creator = Address::new([9; 32]);
  seed_campaign(&harness.ledger, 3, "Clean water", &creator, 50_000_000, 1_000_000, in_secs(3600));

  let store = &harness.context.fundraising;
  store.fetch_campaign(3).await;
  assert_eq!(store.snapshot().data.campaigns[0].raised, 1_000_000);

  let result = store.donate(3, 5_000_000, false).await?;
  assert!(result.confirmed);
  assert_eq!(result.app_id, Some(APPS.fundraising));

  let view = store.snapshot();
  assert!(!view.loading);
  assert_eq!(view.error, None);
  assert_eq!(view.last_transaction, Some(result.clone()));
  assert_eq!(view.data.campaigns.len(), 1);
  assert_eq!(view.data.campaigns[0].id, 3);
  assert_eq!(view.data.campaigns[0].raised, 6_000_000);
  assert_eq!(view.data.campaigns[0].donors, 1);
  assert_eq!(view.data.donations.len(), 1);
  assert_eq!(view.data.donations[0].campaign_id, 3);
  assert_eq!(view.data.donations[0].amount, 5_000_000);

  // payment first, then the bookkeeping call, one group id on both
  let submissions = harness.ledger.submissions();
  assert_eq!(submissions.len(), 1);
  let group = &submissions[0];
  assert_eq!(group.len(), 2);
  assert_eq!(group[0].transaction().kind, TransactionType::Payment);
  assert_eq!(
    group[0].transaction().receiver,
    Some(Address::for_application(APPS.fundraising))
  );
  assert_eq!(group[1].transaction().kind, TransactionType::ApplicationCall);
  assert!(group[0].transaction().group.is_some());
  assert_eq!(group[0].transaction().group, group[1].transaction().group);
  assert_eq!(result.tx_id, group[0].id()?);

  assert_eq!(
    harness.balance(&Address::for_application(APPS.fundraising)),
    5_000_000
  );
  assert_eq!(harness.balance(&donor), common::FUNDING - 5_000_000 - 2_000);
  Ok(())
}

#[tokio::test]
async fn writes_without_wallet_fail_cleanly() -> anyhow::Result<()> {
  let harness = Harness::new()?;
  let creator = Address::new([9; 32]);
  seed_campaign(&harness.ledger, 0, "Books", &creator, 10, 0, in_secs(3600));

  let store = &harness.context.fundraising;
  store.fetch_campaigns().await;
  let before = store.snapshot();

  let outcome = store.donate(0, 5, false).await;
  assert!(matches!(outcome, Err(Error::NoWallet)));
  assert!(matches!(store.refund(0).await, Err(Error::NoWallet)));
  assert!(matches!(store.opt_in().await, Err(Error::NoWallet)));

  let after = store.snapshot();
  assert!(!after.loading);
  assert!(after.error.is_some());
  assert_eq!(after.data, before.data);
  assert_eq!(after.last_transaction, None);
  assert!(harness.ledger.submissions().is_empty());
  Ok(())
}

#[tokio::test]
async fn confirmation_timeout_leaves_cache_untouched() -> anyhow::Result<()> {
  let (harness, _) = Harness::with_wallet()?;
  let creator = Address::new([9; 32]);
  seed_campaign(&harness.ledger, 0, "Books", &creator, 10_000_000, 0, in_secs(3600));

  let store = &harness.context.fundraising;
  store.fetch_campaigns().await;
  let before = store.snapshot().data;

  harness.ledger.set_confirming(false);
  let outcome = store.donate(0, 1_000_000, true).await;
  match outcome {
    Err(Error::ConfirmationTimeout { rounds, .. }) => assert_eq!(rounds, MAX_ROUNDS),
    other => panic!("expected a confirmation timeout, got {other:?}"),
  }

  let view = store.snapshot();
  assert!(!view.loading);
  assert!(view
    .error
    .as_deref()
    .is_some_and(|e| e.contains("not confirmed")));
  assert_eq!(view.data, before);
  Ok(())
}

#[tokio::test]
async fn reads_are_idempotent() -> anyhow::Result<()> {
  let harness = Harness::new()?;
  let creator = Address::new([9; 32]);
  seed_campaign(&harness.ledger, 0, "Books", &creator, 10, 3, in_secs(3600));
  seed_campaign(&harness.ledger, 1, "Bikes", &creator, 10, 10, in_secs(3600));

  let repository = harness.context.fundraising();
  let first = repository.get_campaign(1).await?;
  let second = repository.get_campaign(1).await?;
  assert!(first.is_some());
  assert_eq!(first, second);

  assert_eq!(repository.get_campaigns().await?, repository.get_campaigns().await?);
  assert_eq!(repository.get_campaign(7).await?, None);
  Ok(())
}

#[tokio::test]
async fn status_follows_the_clock() -> anyhow::Result<()> {
  let harness = Harness::new()?;
  let creator = Address::new([9; 32]);
  seed_campaign(&harness.ledger, 0, "Open", &creator, 10, 3, in_secs(3600));
  seed_campaign(&harness.ledger, 1, "Expired", &creator, 10, 3, in_secs(0) - 60);
  seed_campaign(&harness.ledger, 2, "Funded", &creator, 10, 10, in_secs(0) - 60);

  let repository = harness.context.fundraising();
  let statuses: Vec<_> = repository
    .get_campaigns()
    .await?
    .into_iter()
    .map(|c| c.status)
    .collect();
  assert_eq!(statuses, vec![
    CampaignStatus::Active,
    CampaignStatus::Failed,
    CampaignStatus::Successful,
  ]);

  let active = repository.get_active_campaigns().await?;
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].title, "Open");

  let mine = repository.get_user_campaigns(&creator).await?;
  assert_eq!(mine.len(), 3);
  assert!(repository.get_user_campaigns(&Address::ZERO).await?.is_empty());
  Ok(())
}

#[tokio::test]
async fn create_then_refund_flow() -> anyhow::Result<()> {
  let (harness, me) = Harness::with_wallet()?;
  let store = &harness.context.fundraising;

  store
    .create_campaign("Garden", "Seeds for the school garden", 20_000_000, 3600)
    .await?;
  let view = store.snapshot();
  assert_eq!(view.data.campaigns.len(), 1);
  assert_eq!(view.data.user_campaigns.len(), 1);
  assert_eq!(view.data.campaigns[0].creator, me);
  assert_eq!(view.data.campaigns[0].status, CampaignStatus::Active);

  store.donate(0, 2_000_000, false).await?;
  store.cancel_campaign(0).await?;
  assert_eq!(
    store.snapshot().data.campaigns[0].status,
    CampaignStatus::Cancelled
  );

  // refund pays out of escrow through one inner transaction
  let before = harness.balance(&me);
  store.refund(0).await?;
  assert_eq!(harness.balance(&me), before + 2_000_000 - 2_000);

  let last = harness.ledger.submissions().pop().expect("refund submitted");
  assert_eq!(last.len(), 1);
  assert_eq!(last[0].transaction().fee, 2_000);
  assert!(store.snapshot().data.donations.is_empty());
  Ok(())
}

#[tokio::test]
async fn over_long_title_is_rejected_before_building() -> anyhow::Result<()> {
  let (harness, _) = Harness::with_wallet()?;
  let store = &harness.context.fundraising;

  let outcome = store
    .create_campaign(&"t".repeat(33), "", 1_000, 3600)
    .await;
  assert!(matches!(outcome, Err(Error::Validation(_))));
  assert!(harness.ledger.submissions().is_empty());
  Ok(())
}

#[tokio::test]
async fn opt_in_registers_account() -> anyhow::Result<()> {
  let (harness, me) = Harness::with_wallet()?;
  let repository = harness.context.fundraising();
  assert!(!repository.has_opted_in(&me).await?);

  repository.opt_in().await?;
  assert!(repository.has_opted_in(&me).await?);

  let submitted = harness.ledger.submissions();
  assert_eq!(submitted[0][0].transaction().on_complete, OnComplete::OptIn);
  Ok(())
}

#[tokio::test]
async fn refresh_failures_are_swallowed() -> anyhow::Result<()> {
  let harness = Harness::new()?;
  let creator = Address::new([9; 32]);
  seed_campaign(&harness.ledger, 0, "Books", &creator, 10, 0, in_secs(3600));

  let store = &harness.context.fundraising;
  store.fetch_campaigns().await;
  let cached = store.snapshot().data;

  harness.ledger.set_offline(true);
  store.fetch_campaigns().await;
  store.fetch_campaign(0).await;

  let view = store.snapshot();
  assert_eq!(view.data, cached);
  assert_eq!(view.error, None);
  assert!(view.refresh_error.is_some());
  Ok(())
}

#[tokio::test]
async fn unbounded_duration_is_rejected() -> anyhow::Result<()> {
  let (harness, _) = Harness::with_wallet()?;
  let outcome = harness
    .context
    .fundraising
    .create_campaign("Forever", "", 1_000, u64::MAX)
    .await;
  assert!(matches!(outcome, Err(Error::Validation(_))));
  assert!(harness.ledger.submissions().is_empty());
  Ok(())
}
