//! Background workers.

pub mod revocation_sweeper;

pub use revocation_sweeper::{RevocationSweeper, SweeperHandle};
