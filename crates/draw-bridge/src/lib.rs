//! Draw Bridge - in-process ledger for the Minimal Draw client
//!
//! Stands in for the chain the client talks to:
//! - Simulated lottery contract with the real contract's read/write surface
//! - Keeper automation settling ended rounds on its own schedule
//! - Wallet and gateway adapters implementing the draw-core traits

pub mod contract;
pub mod keeper;
pub mod wallet;

pub use contract::{ContractConfig, ContractError, DrawResult, SimulatedContract};
pub use keeper::{Keeper, KeeperHandle};
pub use wallet::{LedgerGateway, SimulatedWallet};
