//! Storage driver, key-value backends and the layered DAO.
//!
//! The [`Store`] trait is the thin ordered key-value interface external
//! backends plug into. The [`DataCache`] sits on top of a store and gives
//! the execution layers a typed view with a stacked write cache: every
//! mutating path speculatively writes into a nested layer that is merged on
//! success and dropped on fault, and the root layer flushes to one atomic
//! batch when a block commits.

mod data_cache;
mod error;
pub mod keys;
mod memory_store;
mod rocksdb_store;
mod store;

pub use data_cache::DataCache;
pub use error::{PersistenceError, PersistenceResult};
pub use memory_store::MemoryStore;
pub use rocksdb_store::RocksDbStore;
pub use store::{BatchOp, Store, StoreBatch};
