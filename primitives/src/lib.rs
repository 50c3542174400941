mod address;
mod bytes;
mod digest;
mod group;
mod state;
mod transaction;

pub mod encoding;
pub mod mnemonic;

pub use {
  address::{Address, Error as AddressError},
  bytes::Bytes,
  digest::{sha512_256, Digest},
  encoding::AppArg,
  group::{compute_group_id, Error as GroupError, TransactionGroup, MAX_GROUP_SIZE},
  mnemonic::Error as MnemonicError,
  state::{ContractState, Field, StateScope, StateValue},
  transaction::{
    Error as TransactionError,
    OnComplete,
    SignedTransaction,
    Transaction,
    TransactionId,
    TransactionType,
  },
};
