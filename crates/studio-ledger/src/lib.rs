//! Inventory and crafting ledger for the Studio.
//!
//! Owners hold materials; materials move between owners by transfer; two
//! material entries are consumed to craft a wand. This crate provides:
//! - The `Owner` / `Material` / `Wand` data model with consistency checks
//! - `EntityCodec`, the tagged JSON document format stored per owner
//! - `LedgerEngine`, which runs each operation as one atomic
//!   read-modify-write against any `KeyValueStore`
//! - `KeyLocks`, striped per-owner locks serializing concurrent updates
//! - `Dispatcher`, routing named string-argument calls to the engine

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod locks;
pub mod records;
pub mod validation;

pub use codec::{DocType, EntityCodec, Record};
pub use config::EngineConfig;
pub use dispatch::{Dispatcher, Invocation, FUNCTIONS};
pub use engine::{LedgerEngine, TransferReceipt};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use locks::{KeyGuard, KeyLocks};
pub use records::{Material, Owner, Wand, WAND_MATERIAL_COUNT, WAND_QUANTITY};
