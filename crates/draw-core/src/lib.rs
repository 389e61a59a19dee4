//! Draw Core - client-side round synchronization for the Minimal Draw lottery
//!
//! This crate keeps a local view of a contract-backed lottery in step with
//! the contract, which can only be polled:
//! - Round state store with whole-record updates
//! - 1Hz countdown to the end of the sale window
//! - Delayed winner reconciliation once a round closes
//! - Ticket purchase flow and session bootstrap

pub mod clock;
pub mod countdown;
pub mod error;
pub mod gateway;
pub mod purchase;
pub mod round_state;
pub mod session;
pub mod settlement;
pub mod view;

#[cfg(test)]
mod tests;

pub use clock::{Clock, SystemClock, TokioClock};
pub use countdown::CountdownClock;
pub use error::{DrawError, GatewayError};
pub use gateway::{ContractGateway, Wallet};
pub use purchase::TicketPurchaseFlow;
pub use round_state::{RoundState, RoundStore, RoundUpdate, UpdateCause};
pub use session::{LotterySession, SessionConfig};
pub use settlement::{SettlementWatcher, WatcherPhase, SETTLEMENT_DELAY};
pub use view::{Panel, TicketView, ViewModel};

/// Countdown tick period (1Hz)
pub const TICK_PERIOD: std::time::Duration = std::time::Duration::from_secs(1);
