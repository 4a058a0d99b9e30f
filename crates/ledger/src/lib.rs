//! The node core: blockchain orchestrator, memory pool and state-root
//! aggregation service.
//!
//! External collaborators (P2P transport, RPC server) interact through
//! [`Blockchain`]'s entry points, the broadcast channels of
//! [`BlockchainEvents`] and the relay callback of [`StateRootService`].

mod blockchain;
mod error;
mod events;
mod header_cache;
mod mempool;
mod state_root;
mod verify_result;
pub mod witness;

pub use blockchain::Blockchain;
pub use error::{LedgerError, LedgerResult};
pub use events::BlockchainEvents;
pub use header_cache::HeaderCache;
pub use mempool::{Feer, Mempool, ResendCallback};
pub use state_root::{RelayCallback, StateRootService};
pub use verify_result::VerifyResult;
