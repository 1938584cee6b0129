//! Infrastructure layer: account persistence and background workers.

pub mod accounts;
pub mod workers;

pub use accounts::{Account, AccountError, AccountStore, InMemoryAccountStore, NewAccount, PostgresAccountStore};
pub use workers::{RevocationSweeper, SweeperHandle};
