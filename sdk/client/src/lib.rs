mod config;
mod context;
mod error;
mod keystore;
mod storage;

pub mod builder;
pub mod gateway;
pub mod repository;
pub mod schema;
pub mod store;

pub use {
  builder::{AppCall, TransactionBuilder},
  config::{AppIds, Config},
  context::AppContext,
  error::{Error, Result},
  gateway::{AlgodGateway, InMemoryLedger, LedgerGateway},
  keystore::{Account, KeyStore},
  repository::{ContractRepository, TransactionResult},
  storage::{InMemoryWalletStorage, OnDiskWalletStorage, WalletStorage},
};
