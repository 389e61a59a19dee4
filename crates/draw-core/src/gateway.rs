//! Contract Gateway - typed facade over the external lottery contract
//!
//! The gateway is the only source of ground truth. Reads may run
//! concurrently and never touch local state; callers decide how results are
//! merged into the [`RoundStore`](crate::round_state::RoundStore).

use crate::error::GatewayError;
use async_trait::async_trait;
use draw_types::{Address, Stake, TransactionReceipt};
use std::sync::Arc;

/// Read and write surface of the lottery contract
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Admin account fixed at contract deployment
    async fn admin(&self) -> Result<Address, GatewayError>;

    /// Address of the account signing for this session
    async fn signer_address(&self) -> Result<Address, GatewayError>;

    /// End of the current round's sale window, 0 before the first sale
    async fn round_end_time(&self) -> Result<u64, GatewayError>;

    /// Winner of the last settled round
    async fn winner(&self) -> Result<Address, GatewayError>;

    /// Buy a ticket with the given stake
    ///
    /// Returns only once the transaction is confirmed, so a successful result
    /// always precedes any local bookkeeping of the purchase.
    async fn purchase_ticket(&self, stake: Stake) -> Result<TransactionReceipt, GatewayError>;
}

/// Wallet collaborator that hands out ledger sessions
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Establish a session, `None` when no account is connected
    async fn establish_session(&self) -> Option<Arc<dyn ContractGateway>>;
}
